//! Content-addressable storage for cask.
//!
//! This crate provides:
//! - The [`ObjectStore`] trait: idempotent `put`, streaming `get`,
//!   existence checks, and hash-prefix expansion
//! - Backends: sharded local disk, S3-compatible, and in-memory
//! - [`CachedStore`], an existence-cache decorator over any backend

pub mod backends;
pub mod cache;
pub mod error;
pub mod traits;

pub use backends::{disk::DiskBackend, memory::MemoryStore, s3::S3Backend};
pub use cache::{CacheError, CachedStore, ExistenceCache, MemoryCache, RedisCache};
pub use error::{StorageError, StorageResult};
pub use traits::{collect_bytes, object_key, ByteStream, ObjectStore};

use cask_core::config::{CacheConfig, StorageConfig};
use std::sync::Arc;

/// Create an object store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Disk { path } => {
            let backend = DiskBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::S3 {
            bucket,
            endpoint,
            region,
            access_key_id,
            secret_access_key,
        } => {
            let backend = S3Backend::new(
                bucket,
                endpoint.clone(),
                region.clone(),
                access_key_id.clone(),
                secret_access_key.clone(),
            )
            .await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

/// Wrap a store with the shared existence cache described by `config`.
pub async fn with_cache(
    store: Arc<dyn ObjectStore>,
    config: &CacheConfig,
) -> StorageResult<Arc<dyn ObjectStore>> {
    let cache = RedisCache::connect(&config.url)
        .await
        .map_err(|e| StorageError::Config(format!("cache connection failed: {e}")))?;
    Ok(Arc::new(CachedStore::new(store, Arc::new(cache), config)))
}
