#![forbid(unsafe_code)]

pub mod kv;
pub mod remote;
pub mod repository;

pub use kv::SafeStorage;
pub use remote::{ApiConfig, ProgressApi, RemoteProgressRepository};
pub use repository::{
    InMemoryRepository, KvUserRepository, LocalProgressRepository, ProgressOwner,
    ProgressRepository, Storage, StorageError, UserRepository,
};
