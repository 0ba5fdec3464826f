//! Error types for personable.

use thiserror::Error;

/// Result type alias using personable's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for storage and record operations.
///
/// Every variant renders with a category prefix, so the display form of an
/// error is never empty.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or missing request input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The store did not confirm a write
    #[error("Write not acknowledged: {0}")]
    Unacknowledged(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// Shorthand for a missing record in a named collection.
    pub fn record_not_found(collection: &str, id: uuid::Uuid) -> Self {
        Error::NotFound(format!("{} record {} not found", collection, id))
    }
}
