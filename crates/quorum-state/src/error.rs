//! Error types for quorum-state

use thiserror::Error;

/// Errors raised while connecting to or preparing a backend.
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Serialization(err.to_string())
    }
}

/// Errors returned by [`crate::SimilarityStore`] operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// The backing store cannot be reached.
    #[error("similarity store unavailable: {0}")]
    Unavailable(String),

    /// A record with the same id was already appended.
    #[error("record already exists: {record_id}")]
    DuplicateRecord { record_id: String },

    /// The digest string is not 64 lowercase hex chars.
    #[error("invalid question digest: {digest}")]
    InvalidDigest { digest: String },

    /// A stored row could not be mapped back to a record.
    #[error("invalid stored record: {0}")]
    InvalidRecord(String),

    /// Any other backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StateError> for StorageError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::Connection(msg) => StorageError::Unavailable(msg),
            other => StorageError::Backend(other.to_string()),
        }
    }
}
