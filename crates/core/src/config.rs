//! Configuration types shared across crates.
//!
//! Everything is fixed at construction time; no component reads knobs at
//! runtime.

use crate::chunker::ChunkerParams;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Ingest/restore engine configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Generator read buffer in bytes.
    #[serde(default = "default_read_buffer_bytes")]
    pub read_buffer_bytes: usize,
    /// Concurrent chunk upload workers.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Concurrent chunk download workers for positional restore.
    #[serde(default = "default_restore_workers")]
    pub restore_workers: usize,
    /// Minimum chunk size in bytes.
    #[serde(default = "default_chunk_min")]
    pub chunk_min_bytes: usize,
    /// Average (target) chunk size in bytes; must be a power of two.
    #[serde(default = "default_chunk_avg")]
    pub chunk_avg_bytes: usize,
    /// Maximum chunk size in bytes.
    #[serde(default = "default_chunk_max")]
    pub chunk_max_bytes: usize,
}

impl EngineConfig {
    /// The chunker parameter triple.
    pub fn chunker_params(&self) -> ChunkerParams {
        ChunkerParams {
            min_size: self.chunk_min_bytes,
            avg_size: self.chunk_avg_bytes,
            max_size: self.chunk_max_bytes,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.read_buffer_bytes == 0 {
            return Err("read_buffer_bytes must be positive".into());
        }
        if self.worker_count == 0 || self.restore_workers == 0 {
            return Err("worker counts must be positive".into());
        }
        self.chunker_params().validate().map_err(|e| e.to_string())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            read_buffer_bytes: default_read_buffer_bytes(),
            worker_count: default_worker_count(),
            restore_workers: default_restore_workers(),
            chunk_min_bytes: default_chunk_min(),
            chunk_avg_bytes: default_chunk_avg(),
            chunk_max_bytes: default_chunk_max(),
        }
    }
}

fn default_read_buffer_bytes() -> usize {
    1024 * 1024
}

fn default_worker_count() -> usize {
    16
}

fn default_restore_workers() -> usize {
    16
}

fn default_chunk_min() -> usize {
    ChunkerParams::DEFAULT.min_size
}

fn default_chunk_avg() -> usize {
    ChunkerParams::DEFAULT.avg_size
}

fn default_chunk_max() -> usize {
    ChunkerParams::DEFAULT.max_size
}

/// Object store backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local sharded directory tree.
    Disk {
        /// Root directory for objects.
        path: PathBuf,
    },
    /// S3-compatible object storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Optional endpoint URL (MinIO etc.).
        endpoint: Option<String>,
        /// Region.
        region: Option<String>,
        /// Access key ID; falls back to ambient AWS credentials if unset.
        access_key_id: Option<String>,
        /// Secret access key; falls back to ambient AWS credentials if unset.
        secret_access_key: Option<String>,
    },
    /// In-memory store for tests and embedding.
    Memory,
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::Disk { path } => {
                if path.as_os_str().is_empty() {
                    return Err("disk storage path must not be empty".into());
                }
            }
            StorageConfig::S3 {
                bucket,
                access_key_id,
                secret_access_key,
                ..
            } => {
                if bucket.is_empty() {
                    return Err("s3 bucket must not be empty".into());
                }
                if access_key_id.is_some() != secret_access_key.is_some() {
                    return Err(
                        "s3 credentials must set both access_key_id and secret_access_key".into(),
                    );
                }
            }
            StorageConfig::Memory => {}
        }
        Ok(())
    }
}

/// Existence-cache configuration for the caching store decorator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache service URL, e.g. `redis://localhost:6379/0`.
    pub url: String,
    /// Entry time-to-live in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    /// Deadline for asynchronous existence backfills, in milliseconds.
    #[serde(default = "default_backfill_timeout_ms")]
    pub backfill_timeout_ms: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn backfill_timeout(&self) -> Duration {
        Duration::from_millis(self.backfill_timeout_ms)
    }
}

fn default_cache_ttl_secs() -> u64 {
    86400 // 24 hours
}

fn default_backfill_timeout_ms() -> u64 {
    2000
}

/// Metadata database configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// Embedded SQLite database.
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
    /// PostgreSQL server.
    Postgres {
        /// Connection URL.
        url: String,
        /// Pool size.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

fn default_max_connections() -> u32 {
    10
}
