//! Raw data chunks, the leaves of the Merkle DAG.

use crate::codec;
use crate::hash::Hash;
use crate::object::{CasObject, ObjectKind};
use bytes::Bytes;
use std::fmt;

/// A chunk produced by content-defined slicing.
///
/// Identity is the SHA-256 of the payload bytes directly; chunks are
/// stored without any envelope so a stored object's bytes hash to its
/// own name.
#[derive(Clone)]
pub struct Chunk {
    hash: Hash,
    data: Bytes,
}

impl Chunk {
    /// Seal a payload into a chunk.
    pub fn new(data: Bytes) -> Self {
        let hash = codec::blob_hash(&data);
        Self { hash, data }
    }

    /// Payload length in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// The payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

impl CasObject for Chunk {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Chunk
    }

    fn id(&self) -> &Hash {
        &self.hash
    }

    fn encoded(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("hash", &self.hash)
            .field("size", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_plain_sha256() {
        let chunk = Chunk::new(Bytes::from_static(b"hello world"));
        assert_eq!(
            chunk.id().to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(chunk.size(), 11);
        assert_eq!(chunk.encoded(), b"hello world");
    }
}
