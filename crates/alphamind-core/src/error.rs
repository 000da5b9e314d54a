//! Core error types for alphamind-core.
//!
//! Every layer has its own thiserror enum; [`CoreError`] wraps them at the
//! crate boundary so managers can use `?` across store, config and
//! validation failures alike.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for alphamind-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Store-related errors (SQLite or the remote REST backend)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Identity resolution errors
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Store-specific errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the SQLite database
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// SQLite query execution failed
    #[error("Query failed: {0}")]
    Sqlite(#[source] rusqlite::Error),

    /// Schema migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked by another connection
    #[error("Database is locked")]
    Locked,

    /// The connection mutex was poisoned by a panicking holder
    #[error("Store connection lock poisoned")]
    Poisoned,

    /// Transport-level HTTP failure
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status from the remote store
    #[error("Remote store returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Row payload could not be decoded
    #[error("Failed to decode row: {0}")]
    Decode(#[from] serde_json::Error),

    /// Remote backend selected without URL or key
    #[error("Remote store not configured: {0}")]
    NotConfigured(String),
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

    /// Data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Identity resolution errors.
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid user ID format: {0}")]
    InvalidFormat(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    /// Input was empty after trimming
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    /// A habit with this name is already tracked today
    #[error("Habit '{0}' already exists")]
    DuplicateHabit(String),

    /// Neither tracked today nor stored on any date
    #[error("Habit '{0}' is not tracked")]
    UnknownHabit(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

// Lock contention is reported separately from ordinary query failures.
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(inner, _) = &err {
            if matches!(
                inner.code,
                rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy
            ) {
                return StoreError::Locked;
            }
        }
        StoreError::Sqlite(err)
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
