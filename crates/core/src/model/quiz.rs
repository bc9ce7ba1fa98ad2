use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("a question needs at least two options, got {len}")]
    TooFewOptions { len: usize },

    #[error("correct answer index {index} is out of range for {options} options")]
    CorrectAnswerOutOfRange { index: usize, options: usize },

    #[error("question text cannot be empty")]
    EmptyText,
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single multiple-choice quiz question.
///
/// Options are presented in the order given; `correct_answer` indexes into
/// them. The explanation is shown after the answer is revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    id: u32,
    text: String,
    options: Vec<String>,
    correct_answer: usize,
    explanation: String,
}

impl Question {
    /// Creates a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the text is blank, fewer than two options
    /// are given, or the correct index does not point at an option.
    pub fn new(
        id: u32,
        text: impl Into<String>,
        options: Vec<String>,
        correct_answer: usize,
        explanation: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions { len: options.len() });
        }
        if correct_answer >= options.len() {
            return Err(QuestionError::CorrectAnswerOutOfRange {
                index: correct_answer,
                options: options.len(),
            });
        }

        Ok(Self {
            id,
            text,
            options,
            correct_answer,
            explanation: explanation.into(),
        })
    }

    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> usize {
        self.correct_answer
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.correct_answer
    }
}

//
// ─── PASS THRESHOLD ────────────────────────────────────────────────────────────
//

/// Minimum number of correct answers needed to pass a quiz of
/// `question_count` questions: 70% of the questions, rounded up.
#[must_use]
pub fn passing_score(question_count: usize) -> usize {
    (question_count * 7).div_ceil(10)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn options(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("option {i}")).collect()
    }

    #[test]
    fn valid_question_constructs() {
        let q = Question::new(1, "What is BTP?", options(4), 2, "Because.").unwrap();
        assert!(q.is_correct(2));
        assert!(!q.is_correct(0));
    }

    #[test]
    fn correct_index_must_point_at_an_option() {
        let err = Question::new(1, "Q", options(3), 3, "E").unwrap_err();
        assert_eq!(
            err,
            QuestionError::CorrectAnswerOutOfRange {
                index: 3,
                options: 3
            }
        );
    }

    #[test]
    fn single_option_questions_are_rejected() {
        let err = Question::new(1, "Q", options(1), 0, "E").unwrap_err();
        assert_eq!(err, QuestionError::TooFewOptions { len: 1 });
    }

    #[test]
    fn passing_score_rounds_up() {
        // ceil(0.7 * 3) = 3: a three-question quiz demands a perfect score.
        assert_eq!(passing_score(3), 3);
        assert_eq!(passing_score(4), 3);
        assert_eq!(passing_score(5), 4);
        assert_eq!(passing_score(10), 7);
        assert_eq!(passing_score(1), 1);
        assert_eq!(passing_score(0), 0);
    }
}
