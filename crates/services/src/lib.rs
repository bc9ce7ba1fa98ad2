#![forbid(unsafe_code)]

pub mod catalog;
pub mod credential_service;
pub mod error;
pub mod portal_service;
pub mod progress_service;
pub mod quiz;
pub mod session_service;

pub use portal_core::Clock;

pub use catalog::{Difficulty, Tutorial, TutorialCatalog};
pub use credential_service::CredentialService;
pub use error::{AuthError, PortalError, QuizError};
pub use portal_service::PortalServices;
pub use progress_service::{ProgressScope, ProgressService};
pub use quiz::{AnswerFeedback, QuizEngine, QuizReport};
pub use session_service::SessionManager;
