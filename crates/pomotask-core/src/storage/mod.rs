//! Persistence gateway and the stores built on it.
//!
//! Everything the core persists goes through [`KvStore`]: a key-based
//! get/set/remove of JSON text. [`Database`] is the SQLite-backed store the
//! CLI uses, [`MemoryStore`] is the in-process one used by tests.

mod archive;
mod config;
pub mod database;
mod memory;

pub use archive::{Archive, Archived};
pub use config::{Config, NotificationsConfig, TasksConfig, TimerConfig};
pub use database::{Database, PendingReminder};
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;

use crate::error::StorageError;

/// Logical keys of the persisted records.
pub mod keys {
    /// The single active-session record.
    pub const SESSION: &str = "session";
    /// Ordered collection of profiles.
    pub const PROFILES: &str = "profiles";
    /// Ordered collection of tasks.
    pub const TASKS: &str = "tasks";
    /// Archive of removed profiles.
    pub const REMOVED_PROFILES: &str = "removed-profiles";
    /// Archive of removed tasks.
    pub const REMOVED_TASKS: &str = "removed-tasks";
}

/// Key-based store of serialized records.
///
/// Implementations use interior mutability so a single store can be shared
/// by reference between the session store and the repositories.
pub trait KvStore {
    /// Read the raw record under `key`, `None` when absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the record under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the record under `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode a JSON record.
///
/// Unavailable storage and undecodable records are both logged and reported
/// as absence.
pub fn read_record<T: DeserializeOwned>(kv: &dyn KvStore, key: &str) -> Option<T> {
    let raw = match kv.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "persistence unavailable, treating record as absent");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(key, error = %e, "corrupt record, treating as absent");
            None
        }
    }
}

/// Encode and write a JSON record.
pub fn write_record<T: Serialize + ?Sized>(
    kv: &dyn KvStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|e| StorageError::CorruptRecord {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    kv.set(key, &raw)
}

/// Returns `~/.config/pomotask[-dev]/` based on POMOTASK_ENV.
///
/// Set POMOTASK_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("POMOTASK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("pomotask-dev")
    } else {
        base_dir.join("pomotask")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
