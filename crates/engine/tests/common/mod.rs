//! Shared test fixtures for the engine integration tests.
//!
//! Not every test binary uses every fixture.
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use cask_core::{CasObject, Hash, HashPrefix};
use cask_storage::{ByteStream, MemoryStore, ObjectStore, StorageResult};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

/// Deterministic pseudo-random payloads.
pub fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut data = vec![0u8; len];
    StdRng::seed_from_u64(seed).fill_bytes(&mut data);
    data
}

/// Spy wrapping an in-memory store, counting the `put` calls that reach
/// the backend. Dedup layers above it should make this number stop
/// growing.
pub struct CountingStore {
    inner: MemoryStore,
    puts: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            puts: AtomicUsize::new(0),
        }
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for CountingStore {
    async fn put(&self, obj: &(dyn CasObject + Send + Sync)) -> StorageResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(obj).await
    }

    async fn get(&self, hash: &Hash) -> StorageResult<ByteStream> {
        self.inner.get(hash).await
    }

    async fn has(&self, hash: &Hash) -> StorageResult<bool> {
        self.inner.has(hash).await
    }

    async fn expand_prefix(&self, prefix: &HashPrefix) -> StorageResult<Hash> {
        self.inner.expand_prefix(prefix).await
    }
}

/// An in-memory serial sink whose contents survive the sink being
/// consumed by the exporter.
#[derive(Clone, Default)]
pub struct SharedBuf {
    data: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }
}

impl AsyncWrite for SharedBuf {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.data.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Chunk-hash multiset of a FileNode, for dedup overlap assertions.
pub fn chunk_hashes(node: &cask_core::FileNode) -> Vec<Bytes> {
    node.chunks()
        .iter()
        .map(|link| Bytes::copy_from_slice(link.hash.as_bytes()))
        .collect()
}
