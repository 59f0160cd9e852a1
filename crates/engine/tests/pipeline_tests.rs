//! Ingest/export round-trips and pipeline behavior under real data.

mod common;

use cask_core::{CasObject, Chunk, ChunkLink, EngineConfig, FileNode};
use cask_engine::{EngineError, ExportSink, Exporter, Ingester};
use cask_storage::{CachedStore, MemoryCache, MemoryStore, ObjectStore};
use common::{chunk_hashes, random_bytes, CountingStore, SharedBuf};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

fn engine_pair(store: Arc<dyn ObjectStore>) -> (Ingester, Exporter) {
    let config = EngineConfig::default();
    (
        Ingester::new(Arc::clone(&store), &config).unwrap(),
        Exporter::new(store, &config),
    )
}

async fn roundtrip(data: Vec<u8>) {
    let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
    let (ingester, exporter) = engine_pair(Arc::clone(&store));

    let node = ingester.ingest(Cursor::new(data.clone())).await.unwrap();
    assert_eq!(node.total_size(), data.len() as u64);

    let sink = SharedBuf::new();
    exporter
        .export(node.id(), ExportSink::serial(sink.clone()))
        .await
        .unwrap();
    assert_eq!(sink.contents(), data, "serial round-trip diverged");
}

#[tokio::test]
async fn roundtrip_at_every_size_boundary() {
    let params = EngineConfig::default();
    let sizes = [
        0,
        1,
        params.chunk_min_bytes - 1,
        params.chunk_min_bytes,
        params.chunk_avg_bytes,
        params.chunk_max_bytes,
        10 * params.chunk_max_bytes,
    ];
    for (i, size) in sizes.into_iter().enumerate() {
        roundtrip(random_bytes(size, 100 + i as u64)).await;
    }
}

#[tokio::test]
async fn roundtrip_large_random_stream() {
    roundtrip(random_bytes(20 * 1024 * 1024, 7)).await;
}

#[tokio::test]
async fn chunk_sizes_respect_bounds() {
    let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
    let (ingester, _) = engine_pair(Arc::clone(&store));
    let config = EngineConfig::default();

    let node = ingester
        .ingest(Cursor::new(random_bytes(4 * 1024 * 1024, 11)))
        .await
        .unwrap();

    let chunks = node.chunks();
    for (i, link) in chunks.iter().enumerate() {
        assert!(link.size <= config.chunk_max_bytes as u64);
        if i + 1 < chunks.len() {
            assert!(
                link.size >= config.chunk_min_bytes as u64,
                "non-terminal chunk {i} of {} bytes below min",
                link.size
            );
        }
    }
}

#[tokio::test]
async fn prepend_keeps_most_chunk_identities() {
    let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
    let (ingester, _) = engine_pair(Arc::clone(&store));

    let base = random_bytes(1024 * 1024, 21);
    let node_base = ingester.ingest(Cursor::new(base.clone())).await.unwrap();

    let mut shifted = b"12345".to_vec();
    shifted.extend_from_slice(&base);
    let node_shifted = ingester.ingest(Cursor::new(shifted)).await.unwrap();

    let mut counts: HashMap<_, i64> = HashMap::new();
    for h in chunk_hashes(&node_base) {
        *counts.entry(h).or_default() += 1;
    }
    let shared = chunk_hashes(&node_shifted)
        .into_iter()
        .filter(|h| {
            counts
                .get_mut(h)
                .map(|c| {
                    *c -= 1;
                    *c >= 0
                })
                .unwrap_or(false)
        })
        .count();

    let total = node_base.chunks().len();
    assert!(
        shared * 10 >= total * 9,
        "only {shared}/{total} chunks survived a 5-byte prepend"
    );
}

#[tokio::test]
async fn cached_reingest_deduplicates_every_chunk() {
    let spy = Arc::new(CountingStore::new());
    let cached: Arc<dyn ObjectStore> = Arc::new(CachedStore::new(
        spy.clone(),
        Arc::new(MemoryCache::new()),
        &cask_core::CacheConfig {
            url: "redis://unused".into(),
            ttl_secs: 3600,
            backfill_timeout_ms: 100,
        },
    ));
    let (ingester, _) = engine_pair(cached);

    let data = random_bytes(20 * 1024 * 1024, 33);
    let first = ingester.ingest(Cursor::new(data.clone())).await.unwrap();
    let puts_after_first = spy.put_count();

    let second = ingester.ingest(Cursor::new(data)).await.unwrap();
    let puts_after_second = spy.put_count();

    assert_eq!(first.id(), second.id());
    assert!(
        puts_after_second - puts_after_first <= 1,
        "re-ingest reached the backend {} times",
        puts_after_second - puts_after_first
    );
}

#[tokio::test]
async fn parallel_restore_matches_original() {
    let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
    let (ingester, exporter) = engine_pair(Arc::clone(&store));

    let data = random_bytes(5 * 1024 * 1024, 55);
    let node = ingester.ingest(Cursor::new(data.clone())).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("restored.bin");
    let written = exporter.export_to_path(node.id(), &path).await.unwrap();
    assert_eq!(written, data.len() as u64);

    let restored = std::fs::read(&path).unwrap();
    assert_eq!(restored, data, "parallel restore diverged from original");
}

#[tokio::test]
async fn restore_rejects_chunk_size_mismatch() {
    let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
    let config = EngineConfig::default();
    let exporter = Exporter::new(Arc::clone(&store), &config);

    // A FileNode whose link claims one byte more than the chunk holds.
    let chunk = Chunk::new(bytes::Bytes::from_static(b"eleven byte"));
    store.put(&chunk).await.unwrap();
    let node = FileNode::new(12, vec![ChunkLink::new(*chunk.id(), 12)]).unwrap();
    store.put(&node).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    match exporter
        .export_to_path(node.id(), &dir.path().join("out.bin"))
        .await
    {
        Err(EngineError::Integrity(msg)) => assert!(msg.contains("size mismatch")),
        other => panic!("expected Integrity error, got {other:?}"),
    }
}

#[tokio::test]
async fn export_of_missing_object_is_not_found() {
    let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
    let (_, exporter) = engine_pair(Arc::clone(&store));

    let missing = cask_core::Hash::compute(b"no such node");
    match exporter.export(&missing, ExportSink::serial(SharedBuf::new())).await {
        Err(EngineError::Storage(cask_storage::StorageError::NotFound(_))) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
}
