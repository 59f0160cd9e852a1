//! Ref repository.

use crate::error::MetadataResult;
use crate::models::RefRow;
use async_trait::async_trait;

/// Repository for branch pointers with optimistic concurrency.
#[async_trait]
pub trait RefRepo: Send + Sync {
    /// Get a ref by name, or `None` for a ref that was never created.
    async fn get_ref(&self, name: &str) -> MetadataResult<Option<RefRow>>;

    /// Atomically advance a ref.
    ///
    /// `expected_old_version` is the version the caller last read; the
    /// sentinel `0` means "I expect no prior ref" and attempts creation.
    /// A lost race (the conditional UPDATE matching zero rows, or the
    /// INSERT hitting the unique constraint on `name`) returns
    /// [`crate::MetadataError::StaleRef`]. Retry policy belongs to the
    /// caller.
    async fn update_ref(
        &self,
        name: &str,
        new_hash: &str,
        expected_old_version: i64,
    ) -> MetadataResult<()>;
}
