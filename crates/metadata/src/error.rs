//! Metadata store error types.

use thiserror::Error;

/// Metadata store operation errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Optimistic-concurrency conflict: the ref moved since it was read.
    /// Concurrent creation of the same ref maps here too.
    #[error("ref {name} has diverged (expected version {expected}); re-read and retry")]
    StaleRef { name: String, expected: i64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for metadata operations.
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;
