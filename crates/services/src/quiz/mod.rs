//! Quiz attempt state machine.
//!
//! One engine instance drives one tutorial's quiz. All state here is
//! ephemeral: nothing persists until a passing attempt reports completion
//! through the injected hook.

mod engine;
mod report;

pub use engine::QuizEngine;
pub use report::{AnswerFeedback, QuizReport};
