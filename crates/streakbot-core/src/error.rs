//! Core error types for streakbot-core.
//!
//! Validation problems are recoverable and carry a user-facing hint,
//! database errors distinguish lock contention from everything else so the
//! rollover engine can decide what is worth retrying.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for streakbot-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The (username, group) pair has no goal record yet.
    #[error("@{username} has no goals registered in group {group_id}")]
    NotRegistered { username: String, group_id: i64 },

    /// Every rollover attempt failed; nothing was applied.
    #[error("Daily rollover abandoned after {attempts} attempt(s): {source}")]
    RolloverFailed {
        attempts: u32,
        #[source]
        source: DatabaseError,
    },

    /// Delivering an announcement failed.
    #[error("Announcement to group {group_id} failed: {message}")]
    Announce { group_id: i64, message: String },

    /// A blocking job panicked or was cancelled.
    #[error("Background job failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked by another writer
    #[error("Database is locked")]
    Locked,
}

impl DatabaseError {
    /// Whether the failure is transient lock contention.
    pub fn is_contention(&self) -> bool {
        matches!(self, DatabaseError::Locked)
    }
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

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// No usable data directory
    #[error("Cannot resolve data directory: {0}")]
    DataDir(String),
}

/// Input that cannot become a goal record mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Goals must cover Monday through Sunday.
    #[error("Please provide 7 numbers for Monday to Sunday goals (got {got}).")]
    WrongGoalCount { got: usize },

    /// A goal or day count was not a whole number.
    #[error("'{value}' is not a whole number")]
    NotAnInteger { value: String },

    /// Goals are counts and cannot be negative.
    #[error("Goal for {day} cannot be negative ({value})")]
    NegativeGoal { day: String, value: i64 },

    /// Opt-out windows are at least one day long.
    #[error("Opt-out days must be a positive number (got {days})")]
    NonPositiveOptOut { days: i64 },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => match inner.code {
                rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy => {
                    DatabaseError::Locked
                }
                _ => DatabaseError::QueryFailed(err.to_string()),
            },
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
