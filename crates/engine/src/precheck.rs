//! Two-phase upload: linear-hash pre-check, then verified streaming
//! ingestion.
//!
//! Phase one answers "is this exact file already stored?" from the
//! `linear_hash -> merkle_root` index without touching the data path.
//! Phase two streams the upload through a tee that feeds a running
//! SHA-256 while the ingester consumes, and refuses to acknowledge the
//! upload when the computed digest contradicts the declared one. Chunks
//! written before a refusal stay behind as orphan immutable objects,
//! which the CAS rules make harmless.

use crate::error::{EngineError, EngineResult};
use crate::ingest::Ingester;
use cask_core::{CasObject, EngineConfig, Hash};
use cask_metadata::{FileIndexRepo, MetadataStore};
use cask_storage::ObjectStore;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncRead;
use tokio_util::io::InspectReader;
use tracing::warn;

/// Outcome of the pre-check phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Precheck {
    /// The file is fully stored; reuse this root instead of uploading.
    Present { merkle_root: Hash },
    /// Not stored (or not trustworthy); the client must upload.
    Absent,
}

/// Receipt for a verified upload.
#[derive(Clone, Debug)]
pub struct UploadReceipt {
    pub merkle_root: Hash,
    pub total_size: u64,
}

/// Serves the two-phase upload protocol.
pub struct UploadService {
    store: Arc<dyn ObjectStore>,
    meta: Arc<dyn MetadataStore>,
    ingester: Ingester,
}

impl UploadService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        meta: Arc<dyn MetadataStore>,
        config: &EngineConfig,
    ) -> EngineResult<Self> {
        let ingester = Ingester::new(Arc::clone(&store), config)?;
        Ok(Self {
            store,
            meta,
            ingester,
        })
    }

    /// Phase one: can the declared `(linear_hash, size)` be served from
    /// what is already stored?
    ///
    /// Trust requires all three of: an index row, a matching size, and
    /// the referenced root actually present in the store. Anything less
    /// degrades to [`Precheck::Absent`] and a forced re-upload, never
    /// an error the client has to interpret.
    pub async fn check(&self, linear_hash: &Hash, size: u64) -> EngineResult<Precheck> {
        let Some(row) = self.meta.get_file_index(&linear_hash.to_hex()).await? else {
            return Ok(Precheck::Absent);
        };

        if row.size_bytes != size as i64 {
            warn!(
                linear_hash = %linear_hash,
                indexed_size = row.size_bytes,
                declared_size = size,
                "file index size mismatch; treating as collision and forcing re-upload"
            );
            return Ok(Precheck::Absent);
        }

        let merkle_root = match Hash::from_hex(row.merkle_root.trim()) {
            Ok(hash) => hash,
            Err(err) => {
                warn!(
                    linear_hash = %linear_hash,
                    merkle_root = %row.merkle_root,
                    error = %err,
                    "file index holds invalid merkle root; forcing re-upload"
                );
                return Ok(Precheck::Absent);
            }
        };

        if !self.store.has(&merkle_root).await? {
            warn!(
                linear_hash = %linear_hash,
                merkle_root = %merkle_root,
                "file index is dangling: root missing from store; forcing re-upload"
            );
            return Ok(Precheck::Absent);
        }

        Ok(Precheck::Present { merkle_root })
    }

    /// Phase two: ingest the stream, verifying it against the declared
    /// whole-file hash.
    ///
    /// On digest mismatch the upload is refused with
    /// [`EngineError::Integrity`] and no index row is written. On
    /// success the index write itself is best-effort: losing it only
    /// costs the next caller the fast path.
    pub async fn upload<R>(
        &self,
        declared_linear_hash: &Hash,
        reader: R,
    ) -> EngineResult<UploadReceipt>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let hasher = Arc::new(Mutex::new(Some(Hash::hasher())));
        let tee = {
            let hasher = Arc::clone(&hasher);
            InspectReader::new(reader, move |bytes: &[u8]| {
                if let Some(h) = hasher.lock().unwrap().as_mut() {
                    h.update(bytes);
                }
            })
        };

        let node = self.ingester.ingest(tee).await?;

        let computed = hasher
            .lock()
            .unwrap()
            .take()
            .expect("hasher consumed once")
            .finalize();

        if computed != *declared_linear_hash {
            return Err(EngineError::Integrity(format!(
                "upload hash mismatch: declared {declared_linear_hash}, computed {computed}; \
                 refusing to index corrupted data"
            )));
        }

        if let Err(err) = self
            .meta
            .save_file_index(
                &computed.to_hex(),
                &node.id().to_hex(),
                node.total_size() as i64,
            )
            .await
        {
            warn!(
                linear_hash = %computed,
                merkle_root = %node.id(),
                error = %err,
                "file index write failed after successful upload; fast path lost until next upload"
            );
        }

        Ok(UploadReceipt {
            merkle_root: *node.id(),
            total_size: node.total_size(),
        })
    }
}
