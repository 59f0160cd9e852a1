//! Existence-cache decorator over any [`ObjectStore`].
//!
//! Caches only the fact that an object exists (a short key with a TTL),
//! never payloads. The cache is shared across processes through a
//! key-value service, so a second writer skips uploads the first writer
//! already did without a round-trip to the backend.
//!
//! The cache is an optimization, never a correctness dependency: every
//! cache-layer failure is logged at warn level and the request falls
//! through to the backend.

use crate::error::StorageResult;
use crate::traits::{ByteStream, ObjectStore};
use async_trait::async_trait;
use cask_core::{CacheConfig, CasObject, Hash, HashPrefix};
use redis::AsyncCommands;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Cache-layer failure. Always degraded, never surfaced to callers.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

/// Shared existence cache: does the backend hold this object?
#[async_trait]
pub trait ExistenceCache: Send + Sync {
    async fn contains(&self, hash: &Hash) -> Result<bool, CacheError>;
    async fn insert(&self, hash: &Hash, ttl: Duration) -> Result<(), CacheError>;
}

/// Redis-backed existence cache.
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

impl RedisCache {
    /// Connect to the cache service. Fails fast on an unreachable server
    /// so misconfiguration surfaces at startup, not mid-upload.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = redis::aio::ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    fn key(hash: &Hash) -> String {
        format!("cask:obj:{hash}")
    }
}

#[async_trait]
impl ExistenceCache for RedisCache {
    async fn contains(&self, hash: &Hash) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        Ok(conn.exists(Self::key(hash)).await?)
    }

    async fn insert(&self, hash: &Hash, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(Self::key(hash), 1u8, ttl.as_secs())
            .await?;
        Ok(())
    }
}

/// Process-local existence cache for tests (TTL ignored).
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashSet<Hash>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExistenceCache for MemoryCache {
    async fn contains(&self, hash: &Hash) -> Result<bool, CacheError> {
        Ok(self.entries.read().unwrap().contains(hash))
    }

    async fn insert(&self, hash: &Hash, _ttl: Duration) -> Result<(), CacheError> {
        self.entries.write().unwrap().insert(*hash);
        Ok(())
    }
}

/// Caching decorator implementing the same [`ObjectStore`] trait it wraps.
pub struct CachedStore {
    backend: Arc<dyn ObjectStore>,
    cache: Arc<dyn ExistenceCache>,
    ttl: Duration,
    backfill_timeout: Duration,
}

impl CachedStore {
    pub fn new(
        backend: Arc<dyn ObjectStore>,
        cache: Arc<dyn ExistenceCache>,
        config: &CacheConfig,
    ) -> Self {
        Self {
            backend,
            cache,
            ttl: config.ttl(),
            backfill_timeout: config.backfill_timeout(),
        }
    }
}

#[async_trait]
impl ObjectStore for CachedStore {
    async fn put(&self, obj: &(dyn CasObject + Send + Sync)) -> StorageResult<()> {
        // Cheap dedup: a cache hit skips the backend round-trip entirely.
        if self.has(obj.id()).await? {
            return Ok(());
        }

        self.backend.put(obj).await?;

        // Only a confirmed backend write may populate the cache.
        if let Err(err) = self.cache.insert(obj.id(), self.ttl).await {
            warn!(hash = %obj.id(), error = %err, "existence cache write failed");
        }
        Ok(())
    }

    async fn get(&self, hash: &Hash) -> StorageResult<ByteStream> {
        // Payloads are never cached; chunks are far too large for a
        // key-value service.
        self.backend.get(hash).await
    }

    async fn has(&self, hash: &Hash) -> StorageResult<bool> {
        match self.cache.contains(hash).await {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(err) => {
                warn!(hash = %hash, error = %err, "existence cache lookup failed");
            }
        }

        let found = self.backend.has(hash).await?;

        if found {
            // Backfill without blocking the caller; bounded by its own
            // deadline so a slow cache can't pile up tasks forever.
            let cache = Arc::clone(&self.cache);
            let hash = *hash;
            let ttl = self.ttl;
            let deadline = self.backfill_timeout;
            tokio::spawn(async move {
                match tokio::time::timeout(deadline, cache.insert(&hash, ttl)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        warn!(hash = %hash, error = %err, "existence cache backfill failed");
                    }
                    Err(_) => {
                        warn!(hash = %hash, "existence cache backfill timed out");
                    }
                }
            });
        }

        Ok(found)
    }

    async fn expand_prefix(&self, prefix: &HashPrefix) -> StorageResult<Hash> {
        self.backend.expand_prefix(prefix).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::MemoryStore;
    use bytes::Bytes;
    use cask_core::Chunk;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Cache that fails every call, for degradation tests.
    struct BrokenCache;

    #[async_trait]
    impl ExistenceCache for BrokenCache {
        async fn contains(&self, _hash: &Hash) -> Result<bool, CacheError> {
            Err(CacheError::Backend("cache down".into()))
        }

        async fn insert(&self, _hash: &Hash, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Backend("cache down".into()))
        }
    }

    /// Backend counting has() calls, to observe cache short-circuits.
    struct CountingBackend {
        inner: MemoryStore,
        has_calls: AtomicUsize,
    }

    #[async_trait]
    impl ObjectStore for CountingBackend {
        async fn put(&self, obj: &(dyn CasObject + Send + Sync)) -> StorageResult<()> {
            self.inner.put(obj).await
        }

        async fn get(&self, hash: &Hash) -> StorageResult<ByteStream> {
            self.inner.get(hash).await
        }

        async fn has(&self, hash: &Hash) -> StorageResult<bool> {
            self.has_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.has(hash).await
        }

        async fn expand_prefix(&self, prefix: &HashPrefix) -> StorageResult<Hash> {
            self.inner.expand_prefix(prefix).await
        }
    }

    fn config() -> CacheConfig {
        CacheConfig {
            url: "redis://unused".into(),
            ttl_secs: 60,
            backfill_timeout_ms: 100,
        }
    }

    #[tokio::test]
    async fn put_populates_cache_and_skips_backend_has() {
        let backend = Arc::new(CountingBackend {
            inner: MemoryStore::new(),
            has_calls: AtomicUsize::new(0),
        });
        let store = CachedStore::new(
            backend.clone(),
            Arc::new(MemoryCache::new()),
            &config(),
        );

        let chunk = Chunk::new(Bytes::from_static(b"cached"));
        store.put(&chunk).await.unwrap();
        let after_put = backend.has_calls.load(Ordering::SeqCst);

        // Second put answers from the cache alone.
        store.put(&chunk).await.unwrap();
        assert!(store.has(chunk.id()).await.unwrap());
        assert_eq!(backend.has_calls.load(Ordering::SeqCst), after_put);
    }

    #[tokio::test]
    async fn broken_cache_degrades_to_backend() {
        let store = CachedStore::new(
            Arc::new(MemoryStore::new()),
            Arc::new(BrokenCache),
            &config(),
        );

        let chunk = Chunk::new(Bytes::from_static(b"resilient"));
        store.put(&chunk).await.unwrap();
        assert!(store.has(chunk.id()).await.unwrap());

        let data = crate::traits::collect_bytes(store.get(chunk.id()).await.unwrap())
            .await
            .unwrap();
        assert_eq!(&data[..], b"resilient");
    }

    #[tokio::test]
    async fn positive_has_backfills_cache() {
        let cache = Arc::new(MemoryCache::new());
        let backend = Arc::new(MemoryStore::new());
        let store = CachedStore::new(backend.clone(), cache.clone(), &config());

        let chunk = Chunk::new(Bytes::from_static(b"backfill"));
        backend.put(&chunk).await.unwrap();

        assert!(store.has(chunk.id()).await.unwrap());
        // The backfill task runs off the caller's path.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.contains(chunk.id()).await.unwrap());
    }
}
