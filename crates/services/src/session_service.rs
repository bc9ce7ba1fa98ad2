use portal_core::model::Session;
use storage::SafeStorage;
use tracing::debug;

/// Key holding the single current-session record.
const SESSION_KEY: &str = "portal_session";

/// Tracks the current user via one persisted session record.
///
/// There is no multi-session model: writing a new session replaces the old
/// one, and `clear` is safe to call any number of times.
#[derive(Clone)]
pub struct SessionManager {
    kv: SafeStorage,
}

impl SessionManager {
    #[must_use]
    pub fn new(kv: SafeStorage) -> Self {
        Self { kv }
    }

    /// Persists `session` as the current session.
    pub fn set_current(&self, session: &Session) {
        match serde_json::to_string(session) {
            Ok(json) => self.kv.set(SESSION_KEY, &json),
            Err(err) => debug!(%err, "failed to encode session record"),
        }
    }

    /// Reads the current session.
    ///
    /// Absent or unparsable state reads as "no session", never as an error.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        let raw = self.kv.get(SESSION_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(err) => {
                debug!(%err, "corrupt session record treated as signed out");
                None
            }
        }
    }

    /// Clears the current session unconditionally. Idempotent.
    pub fn clear(&self) {
        self.kv.remove(SESSION_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::model::{User, UserId, UserRole};
    use portal_core::time::fixed_now;

    fn build_session() -> Session {
        let user = User::new(
            UserId::new("u-1"),
            "a@x.com",
            "Ann",
            UserRole::User,
            "$argon2id$stub",
            fixed_now(),
        )
        .unwrap();
        Session::for_user(&user)
    }

    #[test]
    fn login_then_logout_round_trip() {
        let manager = SessionManager::new(SafeStorage::in_memory());
        assert_eq!(manager.current(), None);

        let session = build_session();
        manager.set_current(&session);
        assert_eq!(manager.current(), Some(session));

        manager.clear();
        assert_eq!(manager.current(), None);
    }

    #[test]
    fn clearing_without_a_session_is_safe() {
        let manager = SessionManager::new(SafeStorage::in_memory());
        manager.clear();
        manager.clear();
        assert_eq!(manager.current(), None);
    }

    #[test]
    fn corrupt_record_reads_as_signed_out() {
        let kv = SafeStorage::in_memory();
        kv.set(SESSION_KEY, "{definitely not json");
        let manager = SessionManager::new(kv);
        assert_eq!(manager.current(), None);
    }

    #[test]
    fn new_login_replaces_the_previous_session() {
        let manager = SessionManager::new(SafeStorage::in_memory());
        let first = build_session();
        manager.set_current(&first);

        let mut second = first.clone();
        second.user_id = UserId::new("u-2");
        second.email = "b@x.com".to_string();
        manager.set_current(&second);

        assert_eq!(manager.current(), Some(second));
    }
}
