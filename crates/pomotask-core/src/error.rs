//! Core error types for pomotask-core.
//!
//! None of these are fatal to the host. Storage and scheduling failures are
//! logged by the component that hits them and degraded to "absent" or
//! "no-op"; validation and lookup errors are reported back to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pomotask-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistence gateway failures
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Reminder scheduler failures
    #[error("Scheduling error: {0}")]
    Scheduling(#[from] SchedulingError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Lookup of an unknown record
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}

/// Persistence gateway errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the backing database
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The store could not be read or written
    #[error("Persistence unavailable for key '{key}': {message}")]
    Unavailable { key: String, message: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Stored data could not be decoded
    #[error("Corrupt record under '{key}': {message}")]
    CorruptRecord { key: String, message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reminder scheduler errors.
#[derive(Error, Debug)]
pub enum SchedulingError {
    /// The reminder could not be scheduled
    #[error("Failed to schedule reminder '{title}': {message}")]
    ScheduleFailed { title: String, message: String },

    /// The reminder could not be cancelled
    #[error("Failed to cancel reminder {handle}: {message}")]
    CancelFailed { handle: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A required text field is blank
    #[error("'{0}' must not be empty")]
    EmptyField(&'static str),

    /// Too many phases on a profile
    #[error("A profile holds at most {max} phases, got {got}")]
    TooManyPhases { max: usize, got: usize },

    /// Phase duration must be positive
    #[error("Phase '{name}' must last at least one second")]
    ZeroDuration { name: String },
}

impl StorageError {
    /// Wrap a backend error for a given key.
    pub fn unavailable(key: &str, err: impl std::fmt::Display) -> Self {
        StorageError::Unavailable {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                StorageError::Locked
            }
            _ => StorageError::Unavailable {
                key: String::new(),
                message: err.to_string(),
            },
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
