use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core},
};
use rand::{Rng, distr::Alphanumeric};

use portal_core::Clock;
use portal_core::model::{ResetToken, User, UserId, UserRole};
use storage::repository::UserRepository;

use crate::error::AuthError;

/// Length of generated password-reset tokens.
const RESET_TOKEN_LEN: usize = 32;

/// Accounts seeded on first use so the portal is explorable without
/// registration. Same guarantees as registered accounts, except the demo
/// flag routes their progress to local-only storage.
const DEMO_ACCOUNTS: &[(&str, &str, &str, &str, UserRole)] = &[
    (
        "demo-admin",
        "admin@portal.dev",
        "admin123",
        "Admin",
        UserRole::Admin,
    ),
    (
        "demo-user",
        "demo@portal.dev",
        "demo123",
        "Demo",
        UserRole::User,
    ),
];

/// Manages the user collection: demo seeding, registration, password checks,
/// reset tokens, and profile updates.
///
/// Every mutation persists the full collection in a single `save_all` call,
/// so a record is never left partially written.
#[derive(Clone)]
pub struct CredentialService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
}

impl CredentialService {
    #[must_use]
    pub fn new(clock: Clock, users: Arc<dyn UserRepository>) -> Self {
        Self { clock, users }
    }

    /// Loads the user collection, seeding the demo accounts on first use.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the collection cannot be read or the
    /// seed cannot be persisted.
    pub async fn load_users(&self) -> Result<Vec<User>, AuthError> {
        let users = self.users.load_all().await?;
        if !users.is_empty() {
            return Ok(users);
        }

        let now = self.clock.now();
        let mut seeded = Vec::with_capacity(DEMO_ACCOUNTS.len());
        for &(id, email, password, name, role) in DEMO_ACCOUNTS {
            let hash = hash_password(password)?;
            let user = User::new(UserId::new(id), email, name, role, hash, now)?.with_demo_flag();
            seeded.push(user);
        }
        self.users.save_all(&seeded).await?;
        Ok(seeded)
    }

    /// Registers a new account with role `user` and a fresh ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::DuplicateEmail` when an existing record matches
    /// the email case-insensitively, or validation/storage errors.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, AuthError> {
        let mut users = self.load_users().await?;
        if users.iter().any(|u| u.email_matches(email)) {
            return Err(AuthError::DuplicateEmail);
        }

        let hash = hash_password(password)?;
        let user = User::new(
            UserId::generate(),
            email,
            name,
            UserRole::User,
            hash,
            self.clock.now(),
        )?;
        users.push(user.clone());
        self.users.save_all(&users).await?;
        Ok(user)
    }

    /// Checks an email/password pair against the collection.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` when no case-insensitive email
    /// match exists or the password does not verify.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let users = self.load_users().await?;
        let Some(user) = users.iter().find(|u| u.email_matches(email)) else {
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, user.password_hash()) {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user.clone())
    }

    /// Issues a single-use reset token valid for one hour.
    ///
    /// Always reports success so callers cannot probe which emails are
    /// registered; the token is `None` when the email is unknown.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` only for persistence failures.
    pub async fn request_password_reset(&self, email: &str) -> Result<Option<String>, AuthError> {
        let mut users = self.load_users().await?;
        let Some(user) = users.iter_mut().find(|u| u.email_matches(email)) else {
            return Ok(None);
        };

        let token = generate_reset_token();
        user.issue_reset_token(ResetToken::new(token.clone(), self.clock.now()));
        self.users.save_all(&users).await?;
        Ok(Some(token))
    }

    /// Consumes a reset token and overwrites the password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if no record holds the token and
    /// `AuthError::TokenExpired` if it is past its validity window; in both
    /// cases the password is left unchanged.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        let mut users = self.load_users().await?;
        let now = self.clock.now();

        let Some(user) = users
            .iter_mut()
            .find(|u| u.reset_token().is_some_and(|t| t.matches(token)))
        else {
            return Err(AuthError::InvalidToken);
        };

        let expired = user.reset_token().is_some_and(|t| t.is_expired(now));
        if expired {
            return Err(AuthError::TokenExpired);
        }

        let hash = hash_password(new_password)?;
        user.set_password_hash(hash);
        user.clear_reset_token();
        self.users.save_all(&users).await?;
        Ok(())
    }

    /// Updates name and/or avatar; fields left as `None` are unchanged.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` for an unknown ID, or validation
    /// errors for a blank name / malformed avatar URL.
    pub async fn update_profile(
        &self,
        user_id: &UserId,
        name: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<User, AuthError> {
        let mut users = self.load_users().await?;
        let Some(user) = users.iter_mut().find(|u| u.id() == user_id) else {
            return Err(AuthError::UserNotFound);
        };

        if let Some(name) = name {
            user.set_name(name)?;
        }
        if let Some(avatar) = avatar {
            user.set_avatar(Some(avatar))?;
        }
        let updated = user.clone();
        self.users.save_all(&users).await?;
        Ok(updated)
    }

    /// Replaces the password after verifying the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` for an unknown ID and
    /// `AuthError::IncorrectPassword` when the current password does not
    /// verify.
    pub async fn change_password(
        &self,
        user_id: &UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let mut users = self.load_users().await?;
        let Some(user) = users.iter_mut().find(|u| u.id() == user_id) else {
            return Err(AuthError::UserNotFound);
        };
        if !verify_password(current_password, user.password_hash()) {
            return Err(AuthError::IncorrectPassword);
        }

        let hash = hash_password(new_password)?;
        user.set_password_hash(hash);
        self.users.save_all(&users).await?;
        Ok(())
    }
}

//
// ─── PASSWORD HASHING ──────────────────────────────────────────────────────────
//

/// Hash a password with argon2id, producing a PHC-format string.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut rand_core::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored PHC-format hash.
///
/// An unparsable hash verifies as false rather than erroring; a corrupt
/// record reads as bad credentials, not a crash.
fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

fn generate_reset_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LEN)
        .map(char::from)
        .collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
