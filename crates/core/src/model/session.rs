use serde::{Deserialize, Serialize};

use crate::model::ids::UserId;
use crate::model::user::{User, UserRole};

/// The persisted current-session record.
///
/// A trimmed projection of `User` so the app can identify the current user
/// without re-authenticating. Never carries password material. The `is_demo`
/// flag is retained because progress persistence is routed by it after a
/// restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub is_demo: bool,
}

impl Session {
    /// Builds the session projection for a freshly authenticated user.
    #[must_use]
    pub fn for_user(user: &User) -> Self {
        Self {
            user_id: user.id().clone(),
            email: user.email().to_string(),
            name: user.name().to_string(),
            role: user.role(),
            avatar: user.avatar().map(str::to_string),
            is_demo: user.is_demo(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn session_projects_user_without_password() {
        let user = User::new(
            UserId::new("u-9"),
            "Demo@Sap.com",
            "Demo",
            UserRole::User,
            "$argon2id$stub",
            fixed_now(),
        )
        .unwrap()
        .with_demo_flag();

        let session = Session::for_user(&user);
        assert_eq!(session.user_id, UserId::new("u-9"));
        assert_eq!(session.email, "demo@sap.com");
        assert_eq!(session.role, UserRole::User);
        assert!(session.is_demo);

        let json = serde_json::to_string(&session).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("passwordHash"));
    }
}
