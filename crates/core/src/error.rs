//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("invalid hash prefix: {0}")]
    InvalidPrefix(String),

    /// Canonical-encoding violation: the bytes do not form a valid object.
    #[error("corrupt object encoding: {0}")]
    Corrupt(String),

    /// A structural invariant of a node was violated at construction.
    #[error("node integrity error: {0}")]
    NodeIntegrity(String),

    #[error("invalid chunker parameters: {0}")]
    InvalidChunkerParams(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
