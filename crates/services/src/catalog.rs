use std::collections::HashMap;

use portal_core::model::{Question, TutorialId};

/// Difficulty rating shown on tutorial cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

/// Metadata for one tutorial.
#[derive(Debug, Clone)]
pub struct Tutorial {
    pub id: TutorialId,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub duration_minutes: u32,
    pub category: String,
    pub tags: Vec<String>,
}

/// Seeded tutorial metadata plus the per-tutorial quiz question sets.
///
/// Content authoring is out of scope; this fixed set exists so progress
/// percentages and quizzes have something real to run against. Not every
/// tutorial carries a quiz.
pub struct TutorialCatalog {
    tutorials: Vec<Tutorial>,
    quizzes: HashMap<TutorialId, Vec<Question>>,
}

impl TutorialCatalog {
    #[must_use]
    pub fn tutorials(&self) -> &[Tutorial] {
        &self.tutorials
    }

    /// Number of tutorials, used as the denominator for progress percentages.
    #[must_use]
    pub fn total(&self) -> usize {
        self.tutorials.len()
    }

    #[must_use]
    pub fn get(&self, id: TutorialId) -> Option<&Tutorial> {
        self.tutorials.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn quiz_for(&self, id: TutorialId) -> Option<&[Question]> {
        self.quizzes.get(&id).map(Vec::as_slice)
    }

    /// Builds the built-in catalog.
    #[must_use]
    pub fn seeded() -> Self {
        let tutorials = vec![
            tutorial(
                1,
                "Platform Foundations",
                "How accounts, entitlements, and service instances fit together on the platform.",
                Difficulty::Beginner,
                15,
                "Fundamentals",
                &["accounts", "services", "setup"],
            ),
            tutorial(
                2,
                "Working with Language Models",
                "Prompting, sampling parameters, and choosing a model behind the unified API.",
                Difficulty::Beginner,
                20,
                "Generative AI",
                &["llm", "prompting", "api"],
            ),
            tutorial(
                3,
                "Deploying Your First Model",
                "Package a model, create a serving endpoint, and call it from an application.",
                Difficulty::Intermediate,
                25,
                "Operations",
                &["deployment", "serving", "endpoints"],
            ),
            tutorial(
                4,
                "Retrieval-Augmented Generation",
                "Ground model answers in your own documents with embeddings and a vector store.",
                Difficulty::Intermediate,
                30,
                "Generative AI",
                &["rag", "embeddings", "search"],
            ),
            tutorial(
                5,
                "Agents and Tool Calling",
                "Let a model plan multi-step work and call functions you expose to it.",
                Difficulty::Advanced,
                30,
                "Generative AI",
                &["agents", "tools", "orchestration"],
            ),
            tutorial(
                6,
                "Observability and Cost Control",
                "Token accounting, tracing model calls, and keeping spend predictable.",
                Difficulty::Advanced,
                20,
                "Operations",
                &["monitoring", "cost", "tracing"],
            ),
        ];

        let mut quizzes = HashMap::new();
        quizzes.insert(
            TutorialId::new(1),
            vec![
                question(
                    1,
                    "What does a platform account represent?",
                    &[
                        "A single running application",
                        "Your organization's contract and top-level container",
                        "A database table",
                        "A user's password vault",
                    ],
                    1,
                    "The account is the top-level container that holds projects and entitlements.",
                ),
                question(
                    2,
                    "Which resource grants a project the right to use an AI service?",
                    &[
                        "An entitlement",
                        "A firewall rule",
                        "A storage bucket",
                        "A DNS record",
                    ],
                    0,
                    "Entitlements assign service quotas from the account down to individual projects.",
                ),
                question(
                    3,
                    "How long does a trial environment typically stay active?",
                    &[
                        "Seven days",
                        "Thirty days, renewable",
                        "One year",
                        "Indefinitely",
                    ],
                    1,
                    "Trial environments expire after thirty days but can be extended while in use.",
                ),
            ],
        );
        quizzes.insert(
            TutorialId::new(2),
            vec![
                question(
                    1,
                    "What is the point of a unified model API?",
                    &[
                        "It trains models from scratch",
                        "It gives one interface across different model providers",
                        "It replaces the database",
                        "It only generates images",
                    ],
                    1,
                    "One API surface hides provider differences so models stay swappable.",
                ),
                question(
                    2,
                    "Which parameter controls randomness in sampling?",
                    &["Max tokens", "Temperature", "Frequency penalty", "Stop sequence"],
                    1,
                    "Higher temperature flattens the token distribution and increases variety.",
                ),
                question(
                    3,
                    "What does a system prompt do?",
                    &[
                        "Sets standing instructions for the model's behavior",
                        "Limits billing",
                        "Selects the GPU type",
                        "Encrypts the conversation",
                    ],
                    0,
                    "The system prompt frames every later turn of the conversation.",
                ),
            ],
        );
        quizzes.insert(
            TutorialId::new(3),
            vec![
                question(
                    1,
                    "What artifact does a serving endpoint expose?",
                    &[
                        "A training dataset",
                        "An inference API for a deployed model",
                        "A source repository",
                        "A billing report",
                    ],
                    1,
                    "Endpoints wrap a deployed model behind a stable inference URL.",
                ),
                question(
                    2,
                    "Why pin a model version in production?",
                    &[
                        "Versions are free",
                        "So behavior stays stable when the default model changes",
                        "To disable logging",
                        "To increase the context window",
                    ],
                    1,
                    "Pinning prevents silent behavior changes when providers roll defaults forward.",
                ),
                question(
                    3,
                    "What is a canary deployment?",
                    &[
                        "Serving all traffic from the new version at once",
                        "Routing a small share of traffic to the new version first",
                        "A backup of the model weights",
                        "A kind of prompt template",
                    ],
                    1,
                    "A canary takes a slice of real traffic so regressions surface early and small.",
                ),
            ],
        );

        Self { tutorials, quizzes }
    }
}

fn tutorial(
    id: u32,
    title: &str,
    description: &str,
    difficulty: Difficulty,
    duration_minutes: u32,
    category: &str,
    tags: &[&str],
) -> Tutorial {
    Tutorial {
        id: TutorialId::new(id),
        title: title.to_string(),
        description: description.to_string(),
        difficulty,
        duration_minutes,
        category: category.to_string(),
        tags: tags.iter().map(ToString::to_string).collect(),
    }
}

fn question(id: u32, text: &str, options: &[&str], correct: usize, explanation: &str) -> Question {
    Question::new(
        id,
        text,
        options.iter().map(ToString::to_string).collect(),
        correct,
        explanation,
    )
    .expect("seeded question is valid")
}
