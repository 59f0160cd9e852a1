//! In-memory backend for tests and embedded use.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ByteStream, ObjectStore};
use async_trait::async_trait;
use bytes::Bytes;
use cask_core::{CasObject, Hash, HashPrefix};
use std::collections::HashMap;
use std::sync::RwLock;

/// Object store holding everything in a process-local map.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<Hash, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, obj: &(dyn CasObject + Send + Sync)) -> StorageResult<()> {
        self.objects
            .write()
            .unwrap()
            .entry(*obj.id())
            .or_insert_with(|| Bytes::copy_from_slice(obj.encoded()));
        Ok(())
    }

    async fn get(&self, hash: &Hash) -> StorageResult<ByteStream> {
        let data = self
            .objects
            .read()
            .unwrap()
            .get(hash)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(hash.to_hex()))?;
        Ok(Box::pin(futures::stream::once(async move { Ok(data) })))
    }

    async fn has(&self, hash: &Hash) -> StorageResult<bool> {
        Ok(self.objects.read().unwrap().contains_key(hash))
    }

    async fn expand_prefix(&self, prefix: &HashPrefix) -> StorageResult<Hash> {
        let mut matches: Vec<String> = self
            .objects
            .read()
            .unwrap()
            .keys()
            .map(|h| h.to_hex())
            .filter(|hex| hex.starts_with(prefix.as_str()))
            .collect();

        match matches.len() {
            0 => Err(StorageError::NotFound(prefix.to_string())),
            1 => Ok(Hash::from_hex(&matches[0]).expect("stored keys are valid hex")),
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
