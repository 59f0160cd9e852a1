//! Engine error types.

use thiserror::Error;

/// Errors surfaced by the ingest/restore engine.
///
/// The lower layers keep their own error enums; this one composes them so
/// callers pattern-match a single surface. `NotFound`, `Ambiguous` and
/// `StaleRef` arrive through the wrapped variants and are expected control
/// flow; `Integrity`, `Corrupt` (via [`EngineError::Core`]), `Cancelled`
/// and I/O errors are fatal to the operation and never retried here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] cask_storage::StorageError),

    #[error(transparent)]
    Metadata(#[from] cask_metadata::MetadataError),

    #[error(transparent)]
    Core(#[from] cask_core::Error),

    /// Data does not match what was promised: a declared whole-file hash,
    /// a chunk's stated size, or a gap in the reassembly sequence.
    #[error("integrity failure: {0}")]
    Integrity(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
