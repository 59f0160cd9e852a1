//! Row types for the metadata tables.

use cask_core::{CasObject, Commit};
use sqlx::FromRow;
use time::OffsetDateTime;

/// A mutable branch pointer.
///
/// `version` starts at 1 and advances by exactly 1 per successful update;
/// it is the token callers hand back for optimistic concurrency.
#[derive(Clone, Debug, FromRow)]
pub struct RefRow {
    pub name: String,
    pub commit_hash: String,
    pub version: i64,
    pub updated_at: OffsetDateTime,
}

/// Fast-path dedup index: whole-file SHA-256 to Merkle root.
///
/// First writer wins; later writers with the same `linear_hash` are
/// silently ignored.
#[derive(Clone, Debug, FromRow)]
pub struct FileIndexRow {
    pub linear_hash: String,
    pub merkle_root: String,
    pub size_bytes: i64,
}

/// Relational projection of a commit node, for log queries.
#[derive(Clone, Debug, FromRow)]
pub struct CommitRow {
    pub hash: String,
    pub author: String,
    pub message: String,
    pub timestamp: i64,
    pub tree_hash: String,
    /// Parent hashes as a JSON array of hex strings.
    pub parents: String,
}

impl CommitRow {
    /// Project a sealed commit node into its row form.
    pub fn from_commit(commit: &Commit) -> Self {
        let parents: Vec<String> = commit.parents().iter().map(|p| p.to_hex()).collect();
        Self {
            hash: commit.id().to_hex(),
            author: commit.author().to_string(),
            message: commit.message().to_string(),
            timestamp: commit.timestamp(),
            tree_hash: commit.tree().to_hex(),
            parents: serde_json::to_string(&parents).expect("string vec serializes"),
        }
    }

    /// Parse the parents column.
    pub fn parent_hashes(&self) -> Vec<String> {
        serde_json::from_str(&self.parents).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cask_core::Hash;

    #[test]
    fn commit_row_projection() {
        let commit = Commit::with_timestamp(
            Hash::compute(b"tree"),
            vec![Hash::compute(b"p1"), Hash::compute(b"p2")],
            "ada",
            "msg",
            42,
        )
        .unwrap();
        let row = CommitRow::from_commit(&commit);
        assert_eq!(row.hash, commit.id().to_hex());
        assert_eq!(row.tree_hash, commit.tree().to_hex());
        assert_eq!(row.timestamp, 42);
        assert_eq!(row.parent_hashes().len(), 2);
    }
}
