//! Polymorphic restore: serial streaming or parallel positional writes.
//!
//! The sink decides the strategy at the boundary, as a sum type; there
//! is no runtime probing inside the engine. Serial sinks (sockets,
//! pipes, stdout) get an in-order streaming copy. Positional sinks
//! (files) get the concurrent path: chunk offsets are prefix sums of the
//! sizes recorded in the FileNode, known before any download, and the
//! target ranges never overlap, so workers write wherever they land with
//! no coordination.

use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use bytes::Bytes;
use cask_core::{EngineConfig, EntryKind, FileNode, Hash, Tree};
use cask_storage::{collect_bytes, ObjectStore};
use futures::StreamExt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// A sink that accepts writes at absolute offsets, concurrently.
#[async_trait]
pub trait PositionalWrite: Send + Sync {
    async fn write_at(&self, offset: u64, data: Bytes) -> std::io::Result<()>;
}

/// Where restored bytes go, chosen by the caller at the boundary.
pub enum ExportSink {
    /// In-order streaming writes; chunks are copied one at a time.
    Serial(Box<dyn AsyncWrite + Send + Unpin>),
    /// Random-access writes; chunks are downloaded and placed in parallel.
    Positional(Arc<dyn PositionalWrite>),
}

impl ExportSink {
    /// Serial sink over any async writer.
    pub fn serial(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        ExportSink::Serial(Box::new(writer))
    }

    /// Positional sink over a regular file.
    pub fn file(file: std::fs::File) -> Self {
        ExportSink::Positional(Arc::new(PositionalFile::new(file)))
    }
}

/// Positional writes against a [`std::fs::File`] via the platform's
/// offset-write primitive, off the async runtime's worker threads.
pub struct PositionalFile {
    file: Arc<std::fs::File>,
}

impl PositionalFile {
    pub fn new(file: std::fs::File) -> Self {
        Self {
            file: Arc::new(file),
        }
    }
}

#[async_trait]
impl PositionalWrite for PositionalFile {
    async fn write_at(&self, offset: u64, data: Bytes) -> std::io::Result<()> {
        let file = Arc::clone(&self.file);
        tokio::task::spawn_blocking(move || {
            #[cfg(unix)]
            {
                use std::os::unix::fs::FileExt;
                file.write_all_at(&data, offset)
            }
            #[cfg(windows)]
            {
                use std::os::windows::fs::FileExt;
                let mut written = 0;
                while written < data.len() {
                    let n = file.seek_write(&data[written..], offset + written as u64)?;
                    written += n;
                }
                Ok(())
            }
        })
        .await
        .map_err(|e| std::io::Error::other(format!("blocking write task failed: {e}")))?
    }
}

/// A chunk download with its precomputed target range.
struct RestoreJob {
    hash: Hash,
    offset: u64,
    size: u64,
}

/// Callback invoked after each file restored by [`Exporter::restore_tree`],
/// so callers can update their working-state bookkeeping.
pub type OnFileRestored<'a> = &'a mut (dyn FnMut(&Path, &Hash, u64) + Send);

/// Reconstructs files and directory trees from the store.
pub struct Exporter {
    store: Arc<dyn ObjectStore>,
    restore_workers: usize,
}

impl Exporter {
    pub fn new(store: Arc<dyn ObjectStore>, config: &EngineConfig) -> Self {
        Self {
            store,
            restore_workers: config.restore_workers.max(1),
        }
    }

    /// Restore the file identified by `hash` into `sink`.
    pub async fn export(&self, hash: &Hash, sink: ExportSink) -> EngineResult<()> {
        let node = self.fetch_filenode(hash).await?;
        match sink {
            ExportSink::Serial(writer) => self.export_serial(&node, writer).await,
            ExportSink::Positional(writer) => self.export_concurrent(&node, writer).await,
        }
    }

    async fn fetch_filenode(&self, hash: &Hash) -> EngineResult<FileNode> {
        let bytes = collect_bytes(self.store.get(hash).await?).await?;
        Ok(FileNode::decode(&bytes)?)
    }

    /// One chunk at a time, in order. Each chunk's stream is dropped
    /// before the next is opened, on success and error alike.
    async fn export_serial(
        &self,
        node: &FileNode,
        mut writer: Box<dyn AsyncWrite + Send + Unpin>,
    ) -> EngineResult<()> {
        for link in node.chunks() {
            let mut stream = self.store.get(&link.hash).await?;
            while let Some(part) = stream.next().await {
                writer.write_all(&part?).await?;
            }
        }
        writer.flush().await?;
        Ok(())
    }

    /// Offset-indexed concurrent download. A generator feeds jobs whose
    /// offsets are prefix sums over the chunk sizes; workers download,
    /// verify the size against the FileNode's claim, and write in place.
    async fn export_concurrent(
        &self,
        node: &FileNode,
        writer: Arc<dyn PositionalWrite>,
    ) -> EngineResult<()> {
        let cancel = CancellationToken::new();
        let (jobs_tx, jobs_rx) = mpsc::channel::<RestoreJob>(self.restore_workers * 2);
        let jobs_rx = Arc::new(tokio::sync::Mutex::new(jobs_rx));

        let mut tasks: JoinSet<EngineResult<()>> = JoinSet::new();

        // Generator: offsets are known before any byte is fetched.
        let links: Vec<_> = node.chunks().to_vec();
        {
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let mut offset: u64 = 0;
                for link in links {
                    let job = RestoreJob {
                        hash: link.hash,
                        offset,
                        size: link.size,
                    };
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                        sent = jobs_tx.send(job) => {
                            if sent.is_err() {
                                return Err(EngineError::Cancelled);
                            }
                        }
                    }
                    offset += link.size;
                }
                Ok(())
            });
        }

        for _ in 0..self.restore_workers {
            let store = Arc::clone(&self.store);
            let writer = Arc::clone(&writer);
            let jobs_rx = Arc::clone(&jobs_rx);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                loop {
                    let job = {
                        let mut rx = jobs_rx.lock().await;
                        tokio::select! {
                            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                            job = rx.recv() => job,
                        }
                    };
                    let Some(job) = job else {
                        return Ok(());
                    };

                    let result = async {
                        // Chunks are bounded by max_size; buffering one
                        // whole chunk is safe.
                        let data = collect_bytes(store.get(&job.hash).await?).await?;
                        if data.len() as u64 != job.size {
                            return Err(EngineError::Integrity(format!(
                                "chunk {} size mismatch: want {}, got {}",
                                job.hash,
                                job.size,
                                data.len()
                            )));
                        }
                        writer.write_at(job.offset, data).await?;
                        Ok(())
                    }
                    .await;

                    if let Err(err) = result {
                        cancel.cancel();
                        return Err(err);
                    }
                }
            });
        }

        let mut first_err: Option<EngineError> = None;
        let mut saw_cancelled = false;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(EngineError::Cancelled)) => saw_cancelled = true,
                Ok(Err(err)) => {
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
                Err(join_err) => {
                    if first_err.is_none() {
                        first_err =
                            Some(EngineError::Internal(format!("restore task failed: {join_err}")));
                    }
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None if saw_cancelled => Err(EngineError::Cancelled),
            None => Ok(()),
        }
    }

    /// Restore a file to a path, truncating any existing content. Files
    /// support positional writes, so this takes the concurrent path.
    pub async fn export_to_path(&self, hash: &Hash, path: &Path) -> EngineResult<u64> {
        let node = self.fetch_filenode(hash).await?;
        let total = node.total_size();
        let file = tokio::fs::File::create(path).await?.into_std().await;
        self.export_concurrent(&node, Arc::new(PositionalFile::new(file)))
            .await?;
        Ok(total)
    }

    /// Recursively restore the tree at `root_hash` under `target_dir`.
    ///
    /// Directories are created as encountered; files are created or
    /// truncated and exported, after which `on_file_restored` is invoked
    /// with the restored path, hash and size.
    pub async fn restore_tree(
        &self,
        root_hash: &Hash,
        target_dir: &Path,
        on_file_restored: OnFileRestored<'_>,
    ) -> EngineResult<()> {
        tokio::fs::create_dir_all(target_dir).await?;
        self.restore_tree_inner(*root_hash, target_dir.to_path_buf(), on_file_restored)
            .await
    }

    fn restore_tree_inner<'a>(
        &'a self,
        tree_hash: Hash,
        dir: PathBuf,
        on_file_restored: OnFileRestored<'a>,
    ) -> Pin<Box<dyn Future<Output = EngineResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let bytes = collect_bytes(self.store.get(&tree_hash).await?).await?;
            let tree = Tree::decode(&bytes)?;

            for entry in tree.entries() {
                let path = dir.join(&entry.name);
                match entry.kind {
                    EntryKind::Dir => {
                        tokio::fs::create_dir_all(&path).await?;
                        self.restore_tree_inner(entry.link, path, on_file_restored)
                            .await?;
                    }
                    EntryKind::File => {
                        let size = self.export_to_path(&entry.link, &path).await?;
                        on_file_restored(&path, &entry.link, size);
                    }
                }
            }
            Ok(())
        })
    }
}
