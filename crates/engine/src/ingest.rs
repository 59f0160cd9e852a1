//! Streaming concurrent ingestion.
//!
//! `reader -> generator -> jobs -> workers -> results -> collector`
//!
//! The generator slices the stream with the content-defined chunker,
//! carrying the unconsumed tail of each read buffer into the next round.
//! Workers hash and store chunks in parallel; completion order is
//! arbitrary, so every job carries its sequence index and the collector
//! reassembles in order behind a pending map. Bounded channels give the
//! pipeline backpressure: in-flight memory is
//! `read_buffer + channel_capacity * max_chunk`, independent of input
//! size.
//!
//! All stages share one cancellation token. The first failing stage
//! cancels the scope; the others unwind at their next channel operation,
//! and the producer's error is reported as the root cause in preference
//! to downstream "channel closed" symptoms.

use crate::error::{EngineError, EngineResult};
use bytes::Bytes;
use cask_core::{CasObject, Chunk, ChunkLink, Chunker, EngineConfig, FileNode};
use cask_storage::ObjectStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// A complete chunk cut from the stream, tagged with its position.
struct ChunkJob {
    index: u64,
    data: Bytes,
}

/// A stored chunk, reported back out of order.
struct ChunkDone {
    index: u64,
    link: ChunkLink,
}

/// Streams arbitrary readers into chunked, deduplicated FileNodes.
pub struct Ingester {
    store: Arc<dyn ObjectStore>,
    chunker: Arc<Chunker>,
    read_buffer_bytes: usize,
    worker_count: usize,
}

impl Ingester {
    pub fn new(store: Arc<dyn ObjectStore>, config: &EngineConfig) -> EngineResult<Self> {
        config
            .validate()
            .map_err(|e| EngineError::Internal(format!("invalid engine config: {e}")))?;
        Ok(Self {
            store,
            chunker: Arc::new(Chunker::new(config.chunker_params())?),
            read_buffer_bytes: config.read_buffer_bytes,
            worker_count: config.worker_count,
        })
    }

    /// Chunk, hash and store everything `reader` yields, then store and
    /// return the FileNode assembling it.
    pub async fn ingest<R>(&self, reader: R) -> EngineResult<FileNode>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let cancel = CancellationToken::new();
        let (jobs_tx, jobs_rx) = mpsc::channel::<ChunkJob>(self.worker_count * 2);
        let (results_tx, mut results_rx) = mpsc::channel::<ChunkDone>(self.worker_count * 2);
        let jobs_rx = Arc::new(tokio::sync::Mutex::new(jobs_rx));

        let mut producers: JoinSet<EngineResult<()>> = JoinSet::new();

        producers.spawn(generate_jobs(
            reader,
            Arc::clone(&self.chunker),
            self.read_buffer_bytes,
            jobs_tx,
            cancel.clone(),
        ));

        for _ in 0..self.worker_count {
            producers.spawn(store_chunks(
                Arc::clone(&self.store),
                Arc::clone(&jobs_rx),
                results_tx.clone(),
                cancel.clone(),
            ));
        }
        // Workers hold the only senders now; the channel closes when the
        // last worker exits.
        drop(results_tx);

        // Collector: ordered reassembly on the calling task.
        let mut pending: HashMap<u64, ChunkLink> = HashMap::new();
        let mut chunks: Vec<ChunkLink> = Vec::new();
        let mut next_expected: u64 = 0;
        let mut total_size: u64 = 0;
        while let Some(done) = results_rx.recv().await {
            pending.insert(done.index, done.link);
            while let Some(link) = pending.remove(&next_expected) {
                total_size += link.size;
                chunks.push(link);
                next_expected += 1;
            }
        }
        let collected = if pending.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Integrity(format!(
                "missing chunks in sequence: {} pending, next expected index {next_expected}",
                pending.len()
            )))
        };

        // Join every stage; the producer error is the root cause when
        // both a producer and the collector report failure.
        let mut producer_err: Option<EngineError> = None;
        let mut saw_cancelled = false;
        while let Some(joined) = producers.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(EngineError::Cancelled)) => saw_cancelled = true,
                Ok(Err(err)) => {
                    if producer_err.is_none() {
                        producer_err = Some(err);
                    }
                }
                Err(join_err) => {
                    if producer_err.is_none() {
                        producer_err =
                            Some(EngineError::Internal(format!("pipeline task failed: {join_err}")));
                    }
                }
            }
        }

        if let Some(err) = producer_err {
            return Err(err);
        }
        collected?;
        if saw_cancelled {
            return Err(EngineError::Cancelled);
        }

        let node = FileNode::new(total_size, chunks)?;
        self.store.put(&node).await?;
        Ok(node)
    }
}

/// Generator stage: streaming CDC with remainder carry-over.
async fn generate_jobs<R>(
    mut reader: R,
    chunker: Arc<Chunker>,
    read_buffer_bytes: usize,
    jobs_tx: mpsc::Sender<ChunkJob>,
    cancel: CancellationToken,
) -> EngineResult<()>
where
    R: AsyncRead + Send + Unpin,
{
    let mut buffer = vec![0u8; read_buffer_bytes];
    let mut remainder: Vec<u8> = Vec::new();
    let mut index: u64 = 0;

    loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            read = reader.read(&mut buffer) => read,
        };
        let n = match read {
            Ok(n) => n,
            Err(err) => {
                cancel.cancel();
                return Err(EngineError::Io(err));
            }
        };

        if n == 0 {
            // EOF: a non-empty remainder becomes the terminal chunk, the
            // only one allowed below min_size.
            if !remainder.is_empty() {
                send_job(&jobs_tx, &cancel, index, Bytes::from(remainder)).await?;
            }
            return Ok(());
        }

        // The read buffer is reused next round, so every job gets an
        // independent slice.
        let mut processing = std::mem::take(&mut remainder);
        processing.extend_from_slice(&buffer[..n]);

        let cuts = chunker.cut(&processing);
        let mut start = 0;
        for end in cuts {
            let data = Bytes::copy_from_slice(&processing[start..end]);
            send_job(&jobs_tx, &cancel, index, data).await?;
            index += 1;
            start = end;
        }
        if start < processing.len() {
            remainder = processing[start..].to_vec();
        }
    }
}

async fn send_job(
    jobs_tx: &mpsc::Sender<ChunkJob>,
    cancel: &CancellationToken,
    index: u64,
    data: Bytes,
) -> EngineResult<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(EngineError::Cancelled),
        sent = jobs_tx.send(ChunkJob { index, data }) => {
            // A closed channel means the workers are gone, which only
            // happens after a failure elsewhere already cancelled us.
            sent.map_err(|_| EngineError::Cancelled)
        }
    }
}

/// Worker stage: hash, store, report.
async fn store_chunks(
    store: Arc<dyn ObjectStore>,
    jobs_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<ChunkJob>>>,
    results_tx: mpsc::Sender<ChunkDone>,
    cancel: CancellationToken,
) -> EngineResult<()> {
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

        let chunk = Chunk::new(job.data);
        let link = ChunkLink::new(*chunk.id(), chunk.size());
        if let Err(err) = store.put(&chunk).await {
            cancel.cancel();
            return Err(err.into());
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            sent = results_tx.send(ChunkDone { index: job.index, link }) => {
                if sent.is_err() {
                    return Err(EngineError::Cancelled);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cask_core::CasObject;
    use cask_storage::MemoryStore;

    fn small_config() -> EngineConfig {
        EngineConfig::default()
    }

    #[tokio::test]
    async fn empty_input_yields_empty_filenode() {
        let store = Arc::new(MemoryStore::new());
        let ingester = Ingester::new(store.clone(), &small_config()).unwrap();

        let node = ingester.ingest(std::io::Cursor::new(Vec::new())).await.unwrap();
        assert_eq!(node.total_size(), 0);
        assert!(node.chunks().is_empty());
        // The FileNode itself was persisted.
        assert!(store.has(node.id()).await.unwrap());
    }

    #[tokio::test]
    async fn sub_min_input_is_one_terminal_chunk() {
        let store = Arc::new(MemoryStore::new());
        let ingester = Ingester::new(store.clone(), &small_config()).unwrap();

        let node = ingester
            .ingest(std::io::Cursor::new(b"hello world".to_vec()))
            .await
            .unwrap();
        assert_eq!(node.total_size(), 11);
        assert_eq!(node.chunks().len(), 1);
        assert_eq!(
            node.chunks()[0].hash.to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(node.chunks()[0].size, 11);
    }

    #[tokio::test]
    async fn read_error_is_root_cause() {
        struct FailingReader;
        impl AsyncRead for FailingReader {
            fn poll_read(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Err(std::io::Error::other("stream torn")))
            }
        }

        let store = Arc::new(MemoryStore::new());
        let ingester = Ingester::new(store, &small_config()).unwrap();
        match ingester.ingest(FailingReader).await {
            Err(EngineError::Io(err)) => assert!(err.to_string().contains("stream torn")),
            other => panic!("expected the reader's Io error, got {other:?}"),
        }
    }
}
