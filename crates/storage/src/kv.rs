//! Safe key/value storage.
//!
//! Persists a flat string map as one JSON file, mirroring the shape of a
//! browser's local storage. Availability is probed once when the store is
//! opened; if the probe fails, every operation silently routes through an
//! in-process map for the lifetime of the value. Callers never see an error
//! from this layer.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

#[derive(Clone)]
enum Backend {
    File(PathBuf),
    Memory,
}

/// Infallible key/value store with a persistent file backend and an
/// in-process fallback.
///
/// Clones share the same underlying map, so one `SafeStorage` can be handed
/// to several services.
#[derive(Clone)]
pub struct SafeStorage {
    backend: Backend,
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl SafeStorage {
    /// Opens a store backed by the given file, probing writability once.
    ///
    /// Any existing content is loaded; a corrupt file is treated as empty.
    /// If the parent directory cannot be created or the probe write fails,
    /// the store degrades to memory-only for its lifetime.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);

        if probe_writable(&path, &entries) {
            Self {
                backend: Backend::File(path),
                entries: Arc::new(Mutex::new(entries)),
            }
        } else {
            debug!(path = %path.display(), "storage probe failed, using in-memory fallback");
            Self {
                backend: Backend::Memory,
                entries: Arc::new(Mutex::new(entries)),
            }
        }
    }

    /// Opens a memory-only store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns true when writes reach the filesystem.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, Backend::File(_))
    }

    /// Returns the value stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock_entries().get(key).cloned()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&self, key: &str, value: &str) {
        let snapshot = {
            let mut entries = self.lock_entries();
            entries.insert(key.to_string(), value.to_string());
            entries.clone()
        };
        self.persist(&snapshot);
    }

    /// Removes the value stored under `key`, if any.
    pub fn remove(&self, key: &str) {
        let snapshot = {
            let mut entries = self.lock_entries();
            entries.remove(key);
            entries.clone()
        };
        self.persist(&snapshot);
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let snapshot = {
            let mut entries = self.lock_entries();
            entries.clear();
            entries.clone()
        };
        self.persist(&snapshot);
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned lock means a panic mid-insert; the map itself is still
        // usable string data, so keep serving it.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn persist(&self, snapshot: &HashMap<String, String>) {
        let Backend::File(path) = &self.backend else {
            return;
        };
        match serde_json::to_string_pretty(snapshot) {
            Ok(json) => {
                if let Err(err) = fs::write(path, json) {
                    debug!(path = %path.display(), %err, "storage write failed, keeping in-memory state");
                }
            }
            Err(err) => {
                debug!(%err, "storage serialization failed, keeping in-memory state");
            }
        }
    }
}

fn load_entries(path: &Path) -> HashMap<String, String> {
    match fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
            debug!(path = %path.display(), %err, "storage file corrupt, starting empty");
            HashMap::new()
        }),
        Err(_) => HashMap::new(),
    }
}

/// Write/delete probe mirroring the availability check a browser storage
/// wrapper performs at startup.
fn probe_writable(path: &Path, existing: &HashMap<String, String>) -> bool {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && fs::create_dir_all(parent).is_err()
    {
        return false;
    }

    let mut probe = existing.clone();
    probe.insert("__storage_probe__".to_string(), "1".to_string());
    let Ok(json) = serde_json::to_string(&probe) else {
        return false;
    };
    if fs::write(path, json).is_err() {
        return false;
    }

    // Roll the probe key back out so it never leaks into real content.
    match serde_json::to_string(existing) {
        Ok(json) => fs::write(path, json).is_ok(),
        Err(_) => false,
    }
}
