//! Commit orchestration: seal, persist, project, advance the ref.

use crate::error::EngineResult;
use cask_core::{CasObject, Commit, Hash};
use cask_metadata::{CommitRepo, CommitRow, MetadataStore, RefManager};
use cask_storage::ObjectStore;
use std::sync::Arc;
use tracing::warn;

/// Creates commits against a named ref with optimistic concurrency.
pub struct CommitService {
    store: Arc<dyn ObjectStore>,
    meta: Arc<dyn MetadataStore>,
    refs: RefManager,
}

impl CommitService {
    pub fn new(store: Arc<dyn ObjectStore>, meta: Arc<dyn MetadataStore>) -> Self {
        let refs = RefManager::new(Arc::clone(&meta));
        Self { store, meta, refs }
    }

    /// Commit `tree` onto `ref_name`.
    ///
    /// The parent is whatever the ref points at; a clean repository
    /// produces an initial commit with no parents. The sequence is:
    /// seal the node, `put` it (the durable step), project it into the
    /// relational index (best-effort), then CAS-advance the ref from the
    /// version read at the start. A lost race surfaces as
    /// [`cask_metadata::MetadataError::StaleRef`] and the commit node
    /// stays behind as a harmless orphan.
    pub async fn commit(
        &self,
        ref_name: &str,
        tree: Hash,
        author: &str,
        message: &str,
    ) -> EngineResult<Commit> {
        let (head, version) = self.refs.get(ref_name).await?;
        let parents = head.into_iter().collect();

        let commit = Commit::new(tree, parents, author, message)?;
        self.store.put(&commit).await?;

        // The object is durable; losing the projection only degrades
        // log queries until the next index of this hash.
        if let Err(err) = self.meta.index_commit(&CommitRow::from_commit(&commit)).await {
            warn!(commit = %commit.id(), error = %err, "commit projection failed");
        }

        self.refs.update(ref_name, commit.id(), version).await?;
        Ok(commit)
    }

    /// The ref manager, for reads and manual ref surgery.
    pub fn refs(&self) -> &RefManager {
        &self.refs
    }
}
