use async_trait::async_trait;
use portal_core::model::{Progress, User, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::kv::SafeStorage;

/// Errors surfaced by storage adapters.
///
/// These never reach the UI layer: services absorb them into defaults and
/// log the absorbed failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Key holding the full user collection.
pub const USERS_KEY: &str = "portal_users";

/// Key prefix for per-user progress records.
pub const PROGRESS_KEY_PREFIX: &str = "progress_";

/// Key for the shared anonymous progress record.
pub const ANONYMOUS_PROGRESS_KEY: &str = "portal_progress";

/// Whose progress record a repository call refers to: a signed-in user's, or
/// the single shared record owned by the unauthenticated browser context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProgressOwner {
    Anonymous,
    User(UserId),
}

impl ProgressOwner {
    #[must_use]
    pub fn storage_key(&self) -> String {
        match self {
            ProgressOwner::Anonymous => ANONYMOUS_PROGRESS_KEY.to_string(),
            ProgressOwner::User(id) => format!("{PROGRESS_KEY_PREFIX}{id}"),
        }
    }
}

/// Repository contract for the user collection.
///
/// The collection is always read and written whole so a single call persists
/// one full record atomically.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Load the full user collection; empty if nothing was ever persisted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the stored collection cannot be decoded.
    async fn load_all(&self) -> Result<Vec<User>, StorageError>;

    /// Persist the full user collection in one write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the collection cannot be stored.
    async fn save_all(&self, users: &[User]) -> Result<(), StorageError>;
}

/// Repository contract for progress records.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the progress record for `owner`, defaulting to an empty record
    /// when none exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for decode or transport failures.
    async fn get_progress(&self, owner: &ProgressOwner) -> Result<Progress, StorageError>;

    /// Persist the full progress record for `owner` in one write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for encode or transport failures.
    async fn save_progress(
        &self,
        owner: &ProgressOwner,
        progress: &Progress,
    ) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    users: Arc<Mutex<Vec<User>>>,
    progress: Arc<Mutex<HashMap<ProgressOwner, Progress>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn load_all(&self) -> Result<Vec<User>, StorageError> {
        let guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save_all(&self, users: &[User]) -> Result<(), StorageError> {
        let mut guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = users.to_vec();
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(&self, owner: &ProgressOwner) -> Result<Progress, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(owner).cloned().unwrap_or_default())
    }

    async fn save_progress(
        &self,
        owner: &ProgressOwner,
        progress: &Progress,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(owner.clone(), progress.clone());
        Ok(())
    }
}

//
// ─── KEY/VALUE BACKED ──────────────────────────────────────────────────────────
//

/// User collection persisted as one JSON document in the key/value store.
#[derive(Clone)]
pub struct KvUserRepository {
    kv: SafeStorage,
}

impl KvUserRepository {
    #[must_use]
    pub fn new(kv: SafeStorage) -> Self {
        Self { kv }
    }
}

#[async_trait]
impl UserRepository for KvUserRepository {
    async fn load_all(&self) -> Result<Vec<User>, StorageError> {
        match self.kv.get(USERS_KEY) {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| StorageError::Serialization(e.to_string())),
        }
    }

    async fn save_all(&self, users: &[User]) -> Result<(), StorageError> {
        let json = serde_json::to_string(users)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.kv.set(USERS_KEY, &json);
        Ok(())
    }
}

/// Progress records persisted per owner in the key/value store.
///
/// This is the backend for demo accounts and anonymous browsing; registered
/// accounts go through the remote repository instead.
#[derive(Clone)]
pub struct LocalProgressRepository {
    kv: SafeStorage,
}

impl LocalProgressRepository {
    #[must_use]
    pub fn new(kv: SafeStorage) -> Self {
        Self { kv }
    }
}

#[async_trait]
impl ProgressRepository for LocalProgressRepository {
    async fn get_progress(&self, owner: &ProgressOwner) -> Result<Progress, StorageError> {
        match self.kv.get(&owner.storage_key()) {
            None => Ok(Progress::default()),
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| StorageError::Serialization(e.to_string())),
        }
    }

    async fn save_progress(
        &self,
        owner: &ProgressOwner,
        progress: &Progress,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(progress)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.kv.set(&owner.storage_key(), &json);
        Ok(())
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Bundles the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub local_progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    /// In-memory backends, for tests and prototyping.
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let users: Arc<dyn UserRepository> = Arc::new(repo.clone());
        let local_progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self {
            users,
            local_progress,
        }
    }

    /// Backends persisted through the given key/value store.
    #[must_use]
    pub fn local(kv: &SafeStorage) -> Self {
        Self {
            users: Arc::new(KvUserRepository::new(kv.clone())),
            local_progress: Arc::new(LocalProgressRepository::new(kv.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::model::{TutorialId, UserRole};
    use portal_core::time::fixed_now;

    fn build_user(id: &str, email: &str) -> User {
        User::new(
            UserId::new(id),
            email,
            "Test",
            UserRole::User,
            "$argon2id$stub",
            fixed_now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn kv_user_repository_round_trips_the_collection() {
        let kv = SafeStorage::in_memory();
        let repo = KvUserRepository::new(kv.clone());

        assert!(repo.load_all().await.unwrap().is_empty());

        let users = vec![build_user("u-1", "a@x.com"), build_user("u-2", "b@x.com")];
        repo.save_all(&users).await.unwrap();

        let loaded = repo.load_all().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].email(), "a@x.com");
    }

    #[tokio::test]
    async fn local_progress_defaults_to_empty_and_keys_by_owner() {
        let kv = SafeStorage::in_memory();
        let repo = LocalProgressRepository::new(kv.clone());

        let anon = ProgressOwner::Anonymous;
        let demo = ProgressOwner::User(UserId::new("demo-user"));

        assert_eq!(repo.get_progress(&anon).await.unwrap(), Progress::default());

        let mut progress = Progress::default();
        progress.mark_completed(TutorialId::new(2));
        repo.save_progress(&demo, &progress).await.unwrap();

        // The two owners live under distinct keys.
        assert_eq!(repo.get_progress(&anon).await.unwrap(), Progress::default());
        assert_eq!(repo.get_progress(&demo).await.unwrap(), progress);
        assert!(kv.get("progress_demo-user").is_some());
    }

    #[tokio::test]
    async fn corrupt_progress_record_reports_serialization_error() {
        let kv = SafeStorage::in_memory();
        kv.set(ANONYMOUS_PROGRESS_KEY, "{not json");
        let repo = LocalProgressRepository::new(kv);

        let err = repo.get_progress(&ProgressOwner::Anonymous).await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn repositories_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InMemoryRepository>();
        assert_send_sync::<KvUserRepository>();
        assert_send_sync::<LocalProgressRepository>();
    }
}
