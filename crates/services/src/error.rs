//! Shared error types for the services crate.

use thiserror::Error;

use portal_core::model::UserError;
use storage::repository::StorageError;

/// Credential and account errors returned to the caller (typically a form).
///
/// Storage and network failures are absorbed by the progress layer and never
/// surface here; the variants below are the only errors the UI is expected
/// to display.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("an account with this email already exists")]
    DuplicateEmail,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid or unknown reset token")]
    InvalidToken,

    #[error("reset token has expired")]
    TokenExpired,

    #[error("user not found")]
    UserNotFound,

    #[error("current password is incorrect")]
    IncorrectPassword,

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    User(#[from] UserError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the quiz engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz has no questions")]
    Empty,

    #[error("no option selected")]
    NothingSelected,

    #[error("current question was already answered")]
    AlreadyAnswered,

    #[error("current question has not been answered yet")]
    NotAnswered,

    #[error("quiz is already finished")]
    Finished,

    #[error("quiz is still in progress")]
    NotFinished,
}

/// Errors emitted while driving the portal facade.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PortalError {
    #[error("tutorial {0} has no quiz")]
    NoQuiz(portal_core::model::TutorialId),

    #[error(transparent)]
    Quiz(#[from] QuizError),
}
