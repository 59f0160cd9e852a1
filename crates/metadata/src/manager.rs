//! Branch/HEAD facade over the ref repository.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::RefRepo;
use crate::store::MetadataStore;
use cask_core::Hash;
use std::sync::Arc;

/// The default ref name.
pub const HEAD: &str = "HEAD";

/// Manages mutable references with optimistic concurrency.
///
/// A ref that was never created reads as `None` with version 0, the
/// "clean repository" state; that 0 is exactly the sentinel
/// [`RefManager::update`] expects for the first commit.
pub struct RefManager {
    store: Arc<dyn MetadataStore>,
}

impl RefManager {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    /// Read a ref: `(commit hash, version)`, or `None` with version 0
    /// for a clean repository.
    pub async fn get(&self, name: &str) -> MetadataResult<(Option<Hash>, i64)> {
        match self.store.get_ref(name).await? {
            Some(row) => {
                let hash = Hash::from_hex(&row.commit_hash).map_err(|e| {
                    MetadataError::Internal(format!(
                        "ref {name} holds invalid commit hash {:?}: {e}",
                        row.commit_hash
                    ))
                })?;
                Ok((Some(hash), row.version))
            }
            None => Ok((None, 0)),
        }
    }

    /// Atomically advance a ref from the version the caller last read.
    ///
    /// Surfaces [`MetadataError::StaleRef`] when another writer got there
    /// first; the caller re-reads and retries or reports the divergence.
    pub async fn update(&self, name: &str, new_hash: &Hash, old_version: i64) -> MetadataResult<()> {
        self.store
            .update_ref(name, &new_hash.to_hex(), old_version)
            .await
    }

    /// Read HEAD.
    pub async fn head(&self) -> MetadataResult<(Option<Hash>, i64)> {
        self.get(HEAD).await
    }

    /// Advance HEAD.
    pub async fn update_head(&self, new_hash: &Hash, old_version: i64) -> MetadataResult<()> {
        self.update(HEAD, new_hash, old_version).await
    }
}
