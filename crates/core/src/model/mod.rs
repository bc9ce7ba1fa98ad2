mod ids;
mod progress;
mod quiz;
mod session;
mod user;

pub use ids::{ParseIdError, TutorialId, UserId};
pub use progress::Progress;
pub use quiz::{Question, QuestionError, passing_score};
pub use session::Session;
pub use user::{
    RESET_TOKEN_VALIDITY_SECS, ResetToken, User, UserError, UserRole, normalize_email,
};
