//! Version snapshot nodes.

use crate::codec::{self, decode_map_fields, Decoder, Encoder};
use crate::error::Error;
use crate::hash::Hash;
use crate::object::{CasObject, ObjectKind};
use bytes::Bytes;
use std::time::{SystemTime, UNIX_EPOCH};

/// A commit: a root tree, zero or more parents, author, message and a
/// Unix-seconds timestamp.
#[derive(Clone, Debug)]
pub struct Commit {
    hash: Hash,
    encoded: Bytes,
    tree: Hash,
    parents: Vec<Hash>,
    author: String,
    message: String,
    timestamp: i64,
}

impl Commit {
    /// Seal a commit stamped with the current time.
    pub fn new(
        tree: Hash,
        parents: Vec<Hash>,
        author: impl Into<String>,
        message: impl Into<String>,
    ) -> crate::Result<Self> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Self::with_timestamp(tree, parents, author, message, now)
    }

    /// Seal a commit with an explicit timestamp (Unix seconds).
    pub fn with_timestamp(
        tree: Hash,
        parents: Vec<Hash>,
        author: impl Into<String>,
        message: impl Into<String>,
        timestamp: i64,
    ) -> crate::Result<Self> {
        let author = author.into();
        let message = message.into();

        // Keys in canonical order: "a", "m", "p", "t", "th", "ts".
        let mut enc = Encoder::new();
        enc.map(6);
        enc.text("a");
        enc.text(&author);
        enc.text("m");
        enc.text(&message);
        enc.text("p");
        enc.array(parents.len());
        for parent in &parents {
            enc.link(parent);
        }
        enc.text("t");
        enc.text(ObjectKind::Commit.as_str());
        enc.text("th");
        enc.link(&tree);
        enc.text("ts");
        enc.int(timestamp);

        let encoded = Bytes::from(enc.finish());
        let hash = codec::hash_of(&encoded);
        Ok(Self {
            hash,
            encoded,
            tree,
            parents,
            author,
            message,
            timestamp,
        })
    }

    /// Decode and validate a stored Commit.
    pub fn decode(data: &[u8]) -> crate::Result<Self> {
        let mut dec = Decoder::new(data);
        let mut kind = None;
        let mut tree = None;
        let mut parents = None;
        let mut author = None;
        let mut message = None;
        let mut timestamp = None;
        decode_map_fields(&mut dec, |dec, key| {
            match key {
                "t" => kind = Some(dec.text()?.to_string()),
                "th" => tree = Some(dec.link()?),
                "p" => {
                    let len = dec.array()?;
                    let mut list = Vec::with_capacity(len);
                    for _ in 0..len {
                        list.push(dec.link()?);
                    }
                    parents = Some(list);
                }
                "a" => author = Some(dec.text()?.to_string()),
                "m" => message = Some(dec.text()?.to_string()),
                "ts" => timestamp = Some(dec.int()?),
                other => return Err(Error::Corrupt(format!("unknown commit key {other:?}"))),
            }
            Ok(())
        })?;
        dec.finish()?;

        match kind.as_deref() {
            Some("commit") => {}
            Some(other) => {
                return Err(Error::Corrupt(format!(
                    "object is not a commit, got {other:?}"
                )))
            }
            None => return Err(Error::Corrupt("commit missing type field".into())),
        }

        let commit = Self::with_timestamp(
            tree.ok_or_else(|| Error::Corrupt("commit missing tree link".into()))?,
            parents.ok_or_else(|| Error::Corrupt("commit missing parents".into()))?,
            author.ok_or_else(|| Error::Corrupt("commit missing author".into()))?,
            message.ok_or_else(|| Error::Corrupt("commit missing message".into()))?,
            timestamp.ok_or_else(|| Error::Corrupt("commit missing timestamp".into()))?,
        )?;
        if commit.encoded.as_ref() != data {
            return Err(Error::Corrupt("commit encoding is not canonical".into()));
        }
        Ok(commit)
    }

    pub fn tree(&self) -> &Hash {
        &self.tree
    }

    pub fn parents(&self) -> &[Hash] {
        &self.parents
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Unix seconds.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

impl CasObject for Commit {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Commit
    }

    fn id(&self) -> &Hash {
        &self.hash
    }

    fn encoded(&self) -> &[u8] {
        &self.encoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let commit = Commit::with_timestamp(
            Hash::compute(b"tree"),
            vec![Hash::compute(b"parent")],
            "ada",
            "train for one more epoch",
            1_700_000_000,
        )
        .unwrap();
        let decoded = Commit::decode(commit.encoded()).unwrap();
        assert_eq!(decoded.id(), commit.id());
        assert_eq!(decoded.tree(), commit.tree());
        assert_eq!(decoded.parents(), commit.parents());
        assert_eq!(decoded.author(), "ada");
        assert_eq!(decoded.message(), "train for one more epoch");
        assert_eq!(decoded.timestamp(), 1_700_000_000);
    }

    #[test]
    fn initial_commit_has_no_parents() {
        let commit =
            Commit::with_timestamp(Hash::compute(b"tree"), vec![], "ada", "init", 1).unwrap();
        assert!(commit.parents().is_empty());
        assert_eq!(Commit::decode(commit.encoded()).unwrap().id(), commit.id());
    }

    #[test]
    fn identity_depends_on_timestamp() {
        let a = Commit::with_timestamp(Hash::compute(b"t"), vec![], "ada", "m", 1).unwrap();
        let b = Commit::with_timestamp(Hash::compute(b"t"), vec![], "ada", "m", 2).unwrap();
        assert_ne!(a.id(), b.id());
    }
}
