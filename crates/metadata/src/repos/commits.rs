//! Commit projection repository.

use crate::error::MetadataResult;
use crate::models::CommitRow;
use async_trait::async_trait;

/// Repository for the relational commit projection used by log queries.
#[async_trait]
pub trait CommitRepo: Send + Sync {
    /// Project a commit into the index. Idempotent by commit hash.
    async fn index_commit(&self, commit: &CommitRow) -> MetadataResult<()>;

    /// Fetch a projected commit.
    async fn get_commit(&self, hash: &str) -> MetadataResult<Option<CommitRow>>;

    /// Most recent commits by one author.
    async fn find_commits_by_author(
        &self,
        author: &str,
        limit: u32,
    ) -> MetadataResult<Vec<CommitRow>>;
}
