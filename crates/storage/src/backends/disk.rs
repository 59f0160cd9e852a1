//! Local disk backend with a sharded object layout.
//!
//! Object `aabbcc…` lives at `<root>/aa/bbcc…`. Writes go to a `temp-*`
//! file in the target shard directory and are renamed into place, so a
//! reader can never observe a partial object; stray `temp-*` files are
//! maintenance debris, never objects.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ByteStream, ObjectStore};
use async_trait::async_trait;
use bytes::Bytes;
use cask_core::{CasObject, Hash, HashPrefix};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::instrument;
use uuid::Uuid;

/// Read granularity for streaming gets (64 KiB).
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Sharded on-disk object store.
pub struct DiskBackend {
    root: PathBuf,
}

impl DiskBackend {
    /// Create a backend rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn object_path(&self, hash: &Hash) -> PathBuf {
        let hex = hash.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }

    fn map_open_error(err: std::io::Error, hash: &Hash) -> StorageError {
        if err.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(hash.to_hex())
        } else {
            StorageError::Io(err)
        }
    }
}

#[async_trait]
impl ObjectStore for DiskBackend {
    #[instrument(skip_all, fields(backend = "disk", hash = %obj.id()))]
    async fn put(&self, obj: &(dyn CasObject + Send + Sync)) -> StorageResult<()> {
        let path = self.object_path(obj.id());

        // Idempotence: an existing object is already this object.
        if fs::try_exists(&path).await? {
            return Ok(());
        }

        let shard_dir = path.parent().expect("object path has a shard parent");
        fs::create_dir_all(shard_dir).await?;

        let temp_path = shard_dir.join(format!("temp-{}", Uuid::new_v4()));
        let write = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(obj.encoded()).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp_path, &path).await
        };
        if let Err(err) = write.await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Io(err));
        }
        Ok(())
    }

    #[instrument(skip_all, fields(backend = "disk", hash = %hash))]
    async fn get(&self, hash: &Hash) -> StorageResult<ByteStream> {
        let path = self.object_path(hash);
        let file = fs::File::open(&path)
            .await
            .map_err(|e| Self::map_open_error(e, hash))?;

        let stream = async_stream::try_stream! {
            let mut file = file;
            let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
            loop {
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                yield Bytes::copy_from_slice(&buf[..n]);
            }
        };
        Ok(Box::pin(stream))
    }

    #[instrument(skip_all, fields(backend = "disk", hash = %hash))]
    async fn has(&self, hash: &Hash) -> StorageResult<bool> {
        Ok(fs::try_exists(self.object_path(hash)).await?)
    }

    #[instrument(skip_all, fields(backend = "disk", prefix = %prefix))]
    async fn expand_prefix(&self, prefix: &HashPrefix) -> StorageResult<Hash> {
        let shard_dir = self.root.join(prefix.shard());

        let mut entries = match fs::read_dir(&shard_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(prefix.to_string()));
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        let mut matches = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            // In-flight writes park as temp-* next to real objects.
            if name.starts_with("temp-") {
                continue;
            }
            if name.starts_with(prefix.rest()) {
                matches.push(format!("{}{name}", prefix.shard()));
            }
        }

        match matches.len() {
            0 => Err(StorageError::NotFound(prefix.to_string())),
            1 => Hash::from_hex(&matches[0])
                .map_err(|e| StorageError::Corrupt(format!("bad object name {}: {e}", matches[0]))),
            _ => {
                matches.sort();
                Err(StorageError::Ambiguous {
                    prefix: prefix.to_string(),
                    matches,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cask_core::Chunk;

    #[tokio::test]
    async fn put_get_roundtrip_in_sharded_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBackend::new(dir.path()).await.unwrap();

        let chunk = Chunk::new(Bytes::from_static(b"hello world"));
        store.put(&chunk).await.unwrap();

        // hash("hello world") = b94d27b99... -> b9/4d27b99...
        let hex = chunk.id().to_hex();
        let expected = dir.path().join(&hex[..2]).join(&hex[2..]);
        assert!(expected.exists(), "object missing from shard directory");

        assert!(store.has(chunk.id()).await.unwrap());
        let data = crate::traits::collect_bytes(store.get(chunk.id()).await.unwrap())
            .await
            .unwrap();
        assert_eq!(&data[..], b"hello world");
    }

    #[tokio::test]
    async fn put_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBackend::new(dir.path()).await.unwrap();

        let chunk = Chunk::new(Bytes::from_static(b"same bytes"));
        store.put(&chunk).await.unwrap();
        store.put(&chunk).await.unwrap();

        let shard = dir.path().join(chunk.id().to_hex()[..2].to_string());
        let count = std::fs::read_dir(shard).unwrap().count();
        assert_eq!(count, 1, "duplicate put left extra files");
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBackend::new(dir.path()).await.unwrap();
        let missing = Hash::compute(b"never stored");
        match store.get(&missing).await {
            Err(StorageError::NotFound(_)) => {}
            Err(e) => panic!("expected NotFound, got Err({e:?})"),
            Ok(_) => panic!("expected NotFound, got Ok"),
        }
    }

    #[tokio::test]
    async fn no_temp_files_survive_put() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBackend::new(dir.path()).await.unwrap();
        let chunk = Chunk::new(Bytes::from_static(b"durable"));
        store.put(&chunk).await.unwrap();

        let shard = dir.path().join(chunk.id().to_hex()[..2].to_string());
        for entry in std::fs::read_dir(shard).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().into_owned();
            assert!(!name.starts_with("temp-"), "temp file left behind: {name}");
        }
    }

    #[tokio::test]
    async fn expand_prefix_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBackend::new(dir.path()).await.unwrap();

        // Find two payloads whose hashes share a 4-char prefix, plus one apart.
        let a = Chunk::new(Bytes::from_static(b"A"));
        let b = Chunk::new(Bytes::from_static(b"B"));
        store.put(&a).await.unwrap();
        store.put(&b).await.unwrap();

        let unique = HashPrefix::new(a.id().to_hex()[..8].to_string()).unwrap();
        assert_eq!(store.expand_prefix(&unique).await.unwrap(), *a.id());

        let full = HashPrefix::new(b.id().to_hex()).unwrap();
        assert_eq!(store.expand_prefix(&full).await.unwrap(), *b.id());

        let missing = HashPrefix::new("0000dead").unwrap();
        match store.expand_prefix(&missing).await {
            Err(StorageError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn expand_prefix_ambiguous() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskBackend::new(dir.path()).await.unwrap();

        // Brute-force two payloads whose hashes share the first 4 chars.
        let mut by_prefix: std::collections::HashMap<String, Chunk> =
            std::collections::HashMap::new();
        let mut pair = None;
        for i in 0u32.. {
            let chunk = Chunk::new(Bytes::from(i.to_le_bytes().to_vec()));
            let prefix = chunk.id().to_hex()[..4].to_string();
            if let Some(first) = by_prefix.get(&prefix) {
                pair = Some((first.clone(), chunk, prefix));
                break;
            }
            by_prefix.insert(prefix, chunk);
        }
        let (first, second, prefix) = pair.unwrap();
        store.put(&first).await.unwrap();
        store.put(&second).await.unwrap();

        match store
            .expand_prefix(&HashPrefix::new(prefix).unwrap())
            .await
        {
            Err(StorageError::Ambiguous { matches, .. }) => assert_eq!(matches.len(), 2),
            other => panic!("expected Ambiguous, got {other:?}"),
        }
    }
}
