use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

use crate::model::ids::UserId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("email cannot be empty")]
    EmptyEmail,

    #[error("name cannot be empty")]
    EmptyName,

    #[error("avatar is not a valid URL: {raw}")]
    InvalidAvatarUrl { raw: String },

    #[error("unknown role: {raw}")]
    UnknownRole { raw: String },
}

//
// ─── ROLE ──────────────────────────────────────────────────────────────────────
//

/// Closed set of account roles.
///
/// Role-gated behavior must match on this exhaustively; there is no
/// free-form role string anywhere in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
    Engineer,
    Analyst,
}

impl UserRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
            UserRole::Engineer => "engineer",
            UserRole::Analyst => "analyst",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            "engineer" => Ok(Self::Engineer),
            "analyst" => Ok(Self::Analyst),
            other => Err(UserError::UnknownRole {
                raw: other.to_string(),
            }),
        }
    }
}

//
// ─── RESET TOKEN ───────────────────────────────────────────────────────────────
//

/// How long a password-reset token stays valid after issuance.
pub const RESET_TOKEN_VALIDITY_SECS: i64 = 3600;

/// Single-use password-reset token attached to a user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl ResetToken {
    /// Creates a token valid for one hour from `issued_at`.
    #[must_use]
    pub fn new(token: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at: issued_at + Duration::seconds(RESET_TOKEN_VALIDITY_SECS),
        }
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Constant-shape comparison against a candidate token string.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.token == candidate
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

//
// ─── USER ──────────────────────────────────────────────────────────────────────
//

/// Normalizes an email for storage and comparison.
///
/// Uniqueness is case-insensitive, so every email is trimmed and lowercased
/// before it is stored or compared.
#[must_use]
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A user account record.
///
/// Passwords are stored as argon2 PHC strings, never in clear text. Demo
/// accounts are functionally identical to registered ones except for the
/// `is_demo` flag, which routes progress persistence to local storage.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: UserId,
    email: String,
    name: String,
    role: UserRole,
    password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    avatar: Option<String>,
    #[serde(default)]
    is_demo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reset_token: Option<ResetToken>,
    created_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user record with a normalized email.
    ///
    /// # Errors
    ///
    /// Returns `UserError::EmptyEmail` or `UserError::EmptyName` if either
    /// field is blank after trimming.
    pub fn new(
        id: UserId,
        email: &str,
        name: &str,
        role: UserRole,
        password_hash: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, UserError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(UserError::EmptyEmail);
        }
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(UserError::EmptyName);
        }

        Ok(Self {
            id,
            email,
            name,
            role,
            password_hash: password_hash.into(),
            avatar: None,
            is_demo: false,
            reset_token: None,
            created_at,
        })
    }

    /// Marks this record as a seeded demo account.
    #[must_use]
    pub fn with_demo_flag(mut self) -> Self {
        self.is_demo = true;
        self
    }

    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn role(&self) -> UserRole {
        self.role
    }

    #[must_use]
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    #[must_use]
    pub fn avatar(&self) -> Option<&str> {
        self.avatar.as_deref()
    }

    #[must_use]
    pub fn is_demo(&self) -> bool {
        self.is_demo
    }

    #[must_use]
    pub fn reset_token(&self) -> Option<&ResetToken> {
        self.reset_token.as_ref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Case-insensitive email comparison.
    #[must_use]
    pub fn email_matches(&self, candidate: &str) -> bool {
        self.email == normalize_email(candidate)
    }

    /// Renames the account.
    ///
    /// # Errors
    ///
    /// Returns `UserError::EmptyName` if the new name is blank.
    pub fn set_name(&mut self, name: &str) -> Result<(), UserError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(UserError::EmptyName);
        }
        self.name = name.to_string();
        Ok(())
    }

    /// Sets or clears the avatar.
    ///
    /// # Errors
    ///
    /// Returns `UserError::InvalidAvatarUrl` if the value does not parse as
    /// an absolute URL.
    pub fn set_avatar(&mut self, avatar: Option<&str>) -> Result<(), UserError> {
        match avatar {
            None => {
                self.avatar = None;
                Ok(())
            }
            Some(raw) => {
                Url::parse(raw).map_err(|_| UserError::InvalidAvatarUrl {
                    raw: raw.to_string(),
                })?;
                self.avatar = Some(raw.to_string());
                Ok(())
            }
        }
    }

    /// Replaces the stored password hash.
    pub fn set_password_hash(&mut self, password_hash: impl Into<String>) {
        self.password_hash = password_hash.into();
    }

    /// Attaches a fresh reset token, replacing any outstanding one.
    pub fn issue_reset_token(&mut self, token: ResetToken) {
        self.reset_token = Some(token);
    }

    /// Clears the outstanding reset token, if any.
    pub fn clear_reset_token(&mut self) {
        self.reset_token = None;
    }
}

// Password hashes stay out of debug output.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("is_demo", &self.is_demo)
            .field("has_reset_token", &self.reset_token.is_some())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn build_user(email: &str) -> User {
        User::new(
            UserId::new("u-1"),
            email,
            "Ann",
            UserRole::User,
            "$argon2id$stub",
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn email_is_normalized_on_construction() {
        let user = build_user("  Ann@Example.COM ");
        assert_eq!(user.email(), "ann@example.com");
    }

    #[test]
    fn email_matches_is_case_insensitive() {
        let user = build_user("a@x.com");
        assert!(user.email_matches("A@X.COM"));
        assert!(user.email_matches("  a@x.com "));
        assert!(!user.email_matches("b@x.com"));
    }

    #[test]
    fn blank_fields_are_rejected() {
        let err = User::new(
            UserId::new("u-1"),
            "   ",
            "Ann",
            UserRole::User,
            "h",
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, UserError::EmptyEmail);

        let err = User::new(
            UserId::new("u-1"),
            "a@x.com",
            "  ",
            UserRole::User,
            "h",
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, UserError::EmptyName);
    }

    #[test]
    fn avatar_must_be_a_url() {
        let mut user = build_user("a@x.com");
        assert!(user.set_avatar(Some("not a url")).is_err());
        user.set_avatar(Some("https://example.com/a.png")).unwrap();
        assert_eq!(user.avatar(), Some("https://example.com/a.png"));
        user.set_avatar(None).unwrap();
        assert_eq!(user.avatar(), None);
    }

    #[test]
    fn reset_token_expires_after_an_hour() {
        let issued = fixed_now();
        let token = ResetToken::new("abc123", issued);
        assert!(!token.is_expired(issued));
        assert!(!token.is_expired(issued + Duration::seconds(RESET_TOKEN_VALIDITY_SECS)));
        assert!(token.is_expired(issued + Duration::seconds(RESET_TOKEN_VALIDITY_SECS + 1)));
    }

    #[test]
    fn role_round_trips_through_strings() {
        for role in [
            UserRole::Admin,
            UserRole::User,
            UserRole::Engineer,
            UserRole::Analyst,
        ] {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn debug_output_omits_password_hash() {
        let user = build_user("a@x.com");
        let rendered = format!("{user:?}");
        assert!(!rendered.contains("argon2"));
    }
}
