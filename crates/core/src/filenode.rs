//! Large-file index nodes.

use crate::codec::{self, decode_map_fields, Decoder, Encoder};
use crate::error::Error;
use crate::hash::Hash;
use crate::object::{CasObject, ObjectKind};
use bytes::Bytes;

/// Reference from a FileNode to one underlying chunk.
///
/// Carries the chunk's byte length so absolute file offsets can be
/// computed by prefix sums without fetching any payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkLink {
    pub hash: Hash,
    pub size: u64,
}

impl ChunkLink {
    pub fn new(hash: Hash, size: u64) -> Self {
        Self { hash, size }
    }

    // Wire keys in canonical order: "h", "s".
    fn encode(&self, enc: &mut Encoder) {
        enc.map(2);
        enc.text("h");
        enc.link(&self.hash);
        enc.text("s");
        enc.uint(self.size);
    }

    fn decode(dec: &mut Decoder<'_>) -> crate::Result<Self> {
        let mut hash = None;
        let mut size = None;
        decode_map_fields(dec, |dec, key| {
            match key {
                "h" => hash = Some(dec.link()?),
                "s" => size = Some(dec.uint()?),
                other => return Err(Error::Corrupt(format!("unknown chunk link key {other:?}"))),
            }
            Ok(())
        })?;
        Ok(Self {
            hash: hash.ok_or_else(|| Error::Corrupt("chunk link missing hash".into()))?,
            size: size.ok_or_else(|| Error::Corrupt("chunk link missing size".into()))?,
        })
    }
}

/// Index node assembling ordered chunks into one logical file.
#[derive(Clone, Debug)]
pub struct FileNode {
    hash: Hash,
    encoded: Bytes,
    total_size: u64,
    chunks: Vec<ChunkLink>,
}

impl FileNode {
    /// Seal a file index. `total_size` must equal the sum of chunk sizes.
    pub fn new(total_size: u64, chunks: Vec<ChunkLink>) -> crate::Result<Self> {
        let sum: u64 = chunks.iter().map(|c| c.size).sum();
        if sum != total_size {
            return Err(Error::NodeIntegrity(format!(
                "filenode total_size {total_size} != chunk sum {sum}"
            )));
        }

        // Keys in canonical order: "t", "cs", "ts".
        let mut enc = Encoder::new();
        enc.map(3);
        enc.text("t");
        enc.text(ObjectKind::FileNode.as_str());
        enc.text("cs");
        enc.array(chunks.len());
        for link in &chunks {
            link.encode(&mut enc);
        }
        enc.text("ts");
        enc.uint(total_size);

        let encoded = Bytes::from(enc.finish());
        let hash = codec::hash_of(&encoded);
        Ok(Self {
            hash,
            encoded,
            total_size,
            chunks,
        })
    }

    /// Decode and validate a stored FileNode.
    pub fn decode(data: &[u8]) -> crate::Result<Self> {
        let mut dec = Decoder::new(data);
        let mut kind = None;
        let mut total_size = None;
        let mut chunks = None;
        decode_map_fields(&mut dec, |dec, key| {
            match key {
                "t" => kind = Some(dec.text()?.to_string()),
                "ts" => total_size = Some(dec.uint()?),
                "cs" => {
                    let len = dec.array()?;
                    let mut links = Vec::with_capacity(len);
                    for _ in 0..len {
                        links.push(ChunkLink::decode(dec)?);
                    }
                    chunks = Some(links);
                }
                other => return Err(Error::Corrupt(format!("unknown filenode key {other:?}"))),
            }
            Ok(())
        })?;
        dec.finish()?;

        match kind.as_deref() {
            Some("filenode") => {}
            Some(other) => {
                return Err(Error::Corrupt(format!(
                    "object is not a filenode, got {other:?}"
                )))
            }
            None => return Err(Error::Corrupt("filenode missing type field".into())),
        }
        let total_size =
            total_size.ok_or_else(|| Error::Corrupt("filenode missing total size".into()))?;
        let chunks = chunks.ok_or_else(|| Error::Corrupt("filenode missing chunk list".into()))?;

        let node = Self::new(total_size, chunks)
            .map_err(|e| Error::Corrupt(format!("decoded filenode invalid: {e}")))?;
        // Strict profile: a valid decode must re-encode to the same bytes.
        if node.encoded.as_ref() != data {
            return Err(Error::Corrupt(
                "filenode encoding is not canonical".into(),
            ));
        }
        Ok(node)
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn chunks(&self) -> &[ChunkLink] {
        &self.chunks
    }
}

impl CasObject for FileNode {
    fn kind(&self) -> ObjectKind {
        ObjectKind::FileNode
    }

    fn id(&self) -> &Hash {
        &self.hash
    }

    fn encoded(&self) -> &[u8] {
        &self.encoded
    }
}
