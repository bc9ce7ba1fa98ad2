use portal_core::model::{Question, TutorialId, passing_score};

use super::report::{AnswerFeedback, QuizReport};
use crate::error::QuizError;

type CompletionHook = Box<dyn FnMut(TutorialId) + Send>;

/// State machine for one quiz attempt.
///
/// Questions are presented strictly in the order given at construction.
/// Each question goes through select → submit → next; the attempt ends in
/// the finished state, where the 70% pass threshold is applied. A passing
/// attempt invokes the completion hook exactly once; a failing attempt has
/// no side effects and can be retried indefinitely.
pub struct QuizEngine {
    tutorial_id: TutorialId,
    questions: Vec<Question>,
    current: usize,
    selected: Option<usize>,
    answered: bool,
    score: usize,
    finished: bool,
    completion_reported: bool,
    on_pass: Option<CompletionHook>,
}

impl QuizEngine {
    /// Creates an engine positioned at the first question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Empty` if no questions are provided.
    pub fn new(tutorial_id: TutorialId, questions: Vec<Question>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::Empty);
        }
        Ok(Self {
            tutorial_id,
            questions,
            current: 0,
            selected: None,
            answered: false,
            score: 0,
            finished: false,
            completion_reported: false,
            on_pass: None,
        })
    }

    /// Installs the hook invoked once per passing attempt.
    ///
    /// The hook is responsible for marking the tutorial complete; the engine
    /// itself never touches progress state.
    #[must_use]
    pub fn with_completion(mut self, hook: impl FnMut(TutorialId) + Send + 'static) -> Self {
        self.on_pass = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn tutorial_id(&self) -> TutorialId {
        self.tutorial_id
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// 1-based number of the question currently presented.
    #[must_use]
    pub fn question_number(&self) -> usize {
        (self.current + 1).min(self.questions.len())
    }

    #[must_use]
    pub fn score(&self) -> usize {
        self.score
    }

    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.answered
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The question currently presented, or `None` once finished.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.finished {
            return None;
        }
        self.questions.get(self.current)
    }

    /// Selects an option for the current question.
    ///
    /// Ignored once the question is answered (options are locked after the
    /// reveal), once the quiz is finished, or when the index does not point
    /// at an option. A stray double click must not corrupt the attempt.
    pub fn select_option(&mut self, option: usize) {
        if self.finished || self.answered {
            return;
        }
        let Some(question) = self.questions.get(self.current) else {
            return;
        };
        if option < question.options().len() {
            self.selected = Some(option);
        }
    }

    /// Submits the selected option, locking it and scoring the question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Finished` after the last question,
    /// `QuizError::AlreadyAnswered` on double submission, and
    /// `QuizError::NothingSelected` when no option is selected.
    pub fn submit_answer(&mut self) -> Result<AnswerFeedback, QuizError> {
        if self.finished {
            return Err(QuizError::Finished);
        }
        if self.answered {
            return Err(QuizError::AlreadyAnswered);
        }
        let Some(selected) = self.selected else {
            return Err(QuizError::NothingSelected);
        };
        let question = &self.questions[self.current];

        self.answered = true;
        let correct = question.is_correct(selected);
        if correct {
            self.score += 1;
        }

        Ok(AnswerFeedback {
            correct,
            correct_answer: question.correct_answer(),
            explanation: question.explanation().to_string(),
        })
    }

    /// Advances past an answered question, finishing the attempt after the
    /// last one.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Finished` if the attempt is over and
    /// `QuizError::NotAnswered` if the current question was not submitted.
    pub fn next(&mut self) -> Result<(), QuizError> {
        if self.finished {
            return Err(QuizError::Finished);
        }
        if !self.answered {
            return Err(QuizError::NotAnswered);
        }

        self.current += 1;
        self.selected = None;
        self.answered = false;

        if self.current >= self.questions.len() {
            self.finished = true;
            self.report_completion();
        }
        Ok(())
    }

    /// Restarts the attempt from the first question.
    ///
    /// Only ephemeral state resets; completions already reported are not
    /// undone. A fresh pass on the retried attempt reports again; progress
    /// marking is idempotent downstream.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotFinished` while the attempt is still running.
    pub fn retry(&mut self) -> Result<(), QuizError> {
        if !self.finished {
            return Err(QuizError::NotFinished);
        }
        self.current = 0;
        self.selected = None;
        self.answered = false;
        self.score = 0;
        self.finished = false;
        self.completion_reported = false;
        Ok(())
    }

    /// The attempt outcome, available only once finished.
    #[must_use]
    pub fn report(&self) -> Option<QuizReport> {
        if !self.finished {
            return None;
        }
        let threshold = passing_score(self.questions.len());
        Some(QuizReport {
            score: self.score,
            total: self.questions.len(),
            threshold,
            passed: self.score >= threshold,
        })
    }

    fn report_completion(&mut self) {
        if self.completion_reported {
            return;
        }
        let passed = self.score >= passing_score(self.questions.len());
        if !passed {
            return;
        }
        self.completion_reported = true;
        if let Some(hook) = self.on_pass.as_mut() {
            hook(self.tutorial_id);
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
