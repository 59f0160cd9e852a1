//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use cask_core::{CasObject, Hash, HashPrefix};
use futures::{Stream, StreamExt};
use std::pin::Pin;

/// A boxed stream of bytes for streaming reads.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Content-addressable object store.
///
/// Objects are immutable and located by the hash of their bytes, which
/// makes `put` idempotent and concurrent writers of the same object
/// harmless. Backends never retry; transient-failure policy belongs to
/// callers.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persist a sealed object. Writing an object that already exists is
    /// a successful no-op.
    async fn put(&self, obj: &(dyn CasObject + Send + Sync)) -> StorageResult<()>;

    /// Open a streaming read of the object's bytes.
    ///
    /// Returns [`crate::StorageError::NotFound`] when no such object is
    /// stored.
    async fn get(&self, hash: &Hash) -> StorageResult<ByteStream>;

    /// Check whether the object exists.
    async fn has(&self, hash: &Hash) -> StorageResult<bool>;

    /// Expand a hash prefix to the unique full hash it identifies.
    ///
    /// Returns [`crate::StorageError::NotFound`] when nothing matches and
    /// [`crate::StorageError::Ambiguous`] when more than one object does.
    async fn expand_prefix(&self, prefix: &HashPrefix) -> StorageResult<Hash>;
}

/// Object key inside a backend: two-char shard directory, then the
/// remaining 62 hex chars. Shared by every backend so local and remote
/// repositories interoperate file-for-file.
pub fn object_key(hash: &Hash) -> String {
    let hex = hash.to_hex();
    format!("{}/{}", &hex[..2], &hex[2..])
}

/// Drain a [`ByteStream`] into one contiguous buffer.
///
/// Only safe for objects with a known small bound (chunks, structured
/// nodes); whole files are restored through the streaming paths instead.
pub async fn collect_bytes(mut stream: ByteStream) -> StorageResult<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(part) = stream.next().await {
        buf.extend_from_slice(&part?);
    }
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_shards_on_first_two_chars() {
        let hash = Hash::compute(b"hello");
        let key = object_key(&hash);
        let hex = hash.to_hex();
        assert_eq!(key, format!("{}/{}", &hex[..2], &hex[2..]));
        assert_eq!(key.len(), 65);
    }
}
