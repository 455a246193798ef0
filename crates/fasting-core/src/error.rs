//! Core error types for fasting-core.
//!
//! Persistence failures are kept apart from everything else so callers can
//! tell "the meal was not recorded" from a configuration or I/O problem.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for fasting-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Meal log errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Meal log errors.
///
/// A write that returns one of these did not happen: the clock and the
/// notifier keep the state they had before the call.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Failed to open the database file
    #[error("Failed to open meal log at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Append did not reach durable storage
    #[error("Failed to record meal: {0}")]
    WriteFailed(String),

    /// The log exists but cannot be read. Not the same as an empty log.
    #[error("Meal log is unreadable: {0}")]
    Unreadable(String),

    /// Migration failed
    #[error("Meal log migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked by another writer
    #[error("Meal log is locked")]
    Locked,

    /// Append would break chronological order
    #[error("Meal timestamp {attempted} precedes the last recorded meal at {last}")]
    OutOfOrder {
        last: chrono::DateTime<chrono::Utc>,
        attempted: chrono::DateTime<chrono::Utc>,
    },

    /// Stored timestamp could not be parsed
    #[error("Invalid stored timestamp: {0}")]
    InvalidTimestamp(String),

    /// Legacy database import refused or failed
    #[error("Legacy import failed: {0}")]
    LegacyImport(String),
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

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Notification channel errors. Never fatal to the notifier.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Configured sound asset does not exist
    #[error("Notification sound not found: {0}")]
    AssetMissing(PathBuf),

    /// Channel failed to deliver
    #[error("Notification channel '{channel}' failed: {message}")]
    ChannelFailed { channel: String, message: String },
}

impl PersistenceError {
    /// Map a rusqlite error raised while writing.
    pub(crate) fn write(err: rusqlite::Error) -> Self {
        match sqlite_code(&err) {
            Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked) => {
                PersistenceError::Locked
            }
            _ => PersistenceError::WriteFailed(err.to_string()),
        }
    }

    /// Map a rusqlite error raised while reading.
    pub(crate) fn read(err: rusqlite::Error) -> Self {
        match sqlite_code(&err) {
            Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked) => {
                PersistenceError::Locked
            }
            _ => PersistenceError::Unreadable(err.to_string()),
        }
    }
}

fn sqlite_code(err: &rusqlite::Error) -> Option<rusqlite::ErrorCode> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => Some(e.code),
        _ => None,
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
