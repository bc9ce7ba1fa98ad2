use thiserror::Error;

use crate::model::{QuestionError, UserError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Question(#[from] QuestionError),
}
