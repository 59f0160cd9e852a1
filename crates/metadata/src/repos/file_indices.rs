//! File index repository.

use crate::error::MetadataResult;
use crate::models::FileIndexRow;
use async_trait::async_trait;
use std::collections::HashMap;

/// Repository for the `linear_hash -> merkle_root` fast-path index.
#[async_trait]
pub trait FileIndexRepo: Send + Sync {
    /// Look up an index row by whole-file hash.
    async fn get_file_index(&self, linear_hash: &str) -> MetadataResult<Option<FileIndexRow>>;

    /// Record a `linear_hash -> merkle_root` mapping.
    ///
    /// Idempotent insert: a conflicting row for the same `linear_hash`
    /// is left untouched (first writer wins).
    async fn save_file_index(
        &self,
        linear_hash: &str,
        merkle_root: &str,
        size_bytes: i64,
    ) -> MetadataResult<()>;

    /// Resolve logical sizes for a batch of Merkle roots in one query.
    ///
    /// Roots without an index row are absent from the result.
    async fn get_sizes_by_merkle_roots(
        &self,
        merkle_roots: &[String],
    ) -> MetadataResult<HashMap<String, i64>>;
}
