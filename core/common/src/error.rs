//! Common error types for Satchel.

use thiserror::Error;

/// Top-level error type for Satchel operations.
///
/// Variants carry their cause as a message so the type stays `Clone`; a
/// settled sync outcome is handed to every waiter of the same shared handle.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Store operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Underlying database failure.
    #[error("Database error: {0}")]
    Database(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Synchronization is blocked for the entity.
    #[error("Sync blocked: {0}")]
    Blocked(String),

    /// Scheduler is not running or dropped the request.
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// Device has no network connection.
    #[error("Network unavailable")]
    Offline,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
