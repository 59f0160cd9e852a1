//! Directory tree nodes.

use crate::codec::{self, decode_map_fields, Decoder, Encoder};
use crate::error::Error;
use crate::hash::Hash;
use crate::object::{CasObject, ObjectKind};
use bytes::Bytes;
use std::fmt;

/// What a tree entry points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Dir => "dir",
        }
    }

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "file" => Ok(EntryKind::File),
            "dir" => Ok(EntryKind::Dir),
            other => Err(Error::Corrupt(format!("unknown entry kind {other:?}"))),
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named child of a tree: a file (FileNode link) or a subdirectory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub kind: EntryKind,
    pub link: Hash,
    /// Logical size for files; always 0 for directories.
    pub size: u64,
}

impl TreeEntry {
    /// Entry for a file with its logical size.
    pub fn file(name: impl Into<String>, link: Hash, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            link,
            size,
        }
    }

    /// Entry for a subdirectory.
    pub fn dir(name: impl Into<String>, link: Hash) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Dir,
            link,
            size: 0,
        }
    }

    // Wire keys in canonical order: "h", "n", "s", "t".
    fn encode(&self, enc: &mut Encoder) {
        enc.map(4);
        enc.text("h");
        enc.link(&self.link);
        enc.text("n");
        enc.text(&self.name);
        enc.text("s");
        enc.uint(self.size);
        enc.text("t");
        enc.text(self.kind.as_str());
    }

    fn decode(dec: &mut Decoder<'_>) -> crate::Result<Self> {
        let mut name = None;
        let mut kind = None;
        let mut link = None;
        let mut size = None;
        decode_map_fields(dec, |dec, key| {
            match key {
                "n" => name = Some(dec.text()?.to_string()),
                "t" => kind = Some(EntryKind::from_str(dec.text()?)?),
                "h" => link = Some(dec.link()?),
                "s" => size = Some(dec.uint()?),
                other => return Err(Error::Corrupt(format!("unknown tree entry key {other:?}"))),
            }
            Ok(())
        })?;
        Ok(Self {
            name: name.ok_or_else(|| Error::Corrupt("tree entry missing name".into()))?,
            kind: kind.ok_or_else(|| Error::Corrupt("tree entry missing kind".into()))?,
            link: link.ok_or_else(|| Error::Corrupt("tree entry missing link".into()))?,
            size: size.ok_or_else(|| Error::Corrupt("tree entry missing size".into()))?,
        })
    }
}

/// A directory node: entries sorted strictly ascending by name.
#[derive(Clone, Debug)]
pub struct Tree {
    hash: Hash,
    encoded: Bytes,
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// Seal a tree node. Entries must already be sorted strictly
    /// ascending by name with no duplicates; the builder guarantees this
    /// and decode re-checks it, so hashes stay deterministic.
    pub fn new(entries: Vec<TreeEntry>) -> crate::Result<Self> {
        for pair in entries.windows(2) {
            if pair[0].name >= pair[1].name {
                return Err(Error::NodeIntegrity(format!(
                    "tree entries not strictly sorted: {:?} then {:?}",
                    pair[0].name, pair[1].name
                )));
            }
        }
        for entry in &entries {
            if entry.kind == EntryKind::Dir && entry.size != 0 {
                return Err(Error::NodeIntegrity(format!(
                    "directory entry {:?} has nonzero size",
                    entry.name
                )));
            }
        }

        // Keys in canonical order: "e", "t".
        let mut enc = Encoder::new();
        enc.map(2);
        enc.text("e");
        enc.array(entries.len());
        for entry in &entries {
            entry.encode(&mut enc);
        }
        enc.text("t");
        enc.text(ObjectKind::Tree.as_str());

        let encoded = Bytes::from(enc.finish());
        let hash = codec::hash_of(&encoded);
        Ok(Self {
            hash,
            encoded,
            entries,
        })
    }

    /// Decode and validate a stored Tree.
    pub fn decode(data: &[u8]) -> crate::Result<Self> {
        let mut dec = Decoder::new(data);
        let mut kind = None;
        let mut entries = None;
        decode_map_fields(&mut dec, |dec, key| {
            match key {
                "t" => kind = Some(dec.text()?.to_string()),
                "e" => {
                    let len = dec.array()?;
                    let mut list = Vec::with_capacity(len);
                    for _ in 0..len {
                        list.push(TreeEntry::decode(dec)?);
                    }
                    entries = Some(list);
                }
                other => return Err(Error::Corrupt(format!("unknown tree key {other:?}"))),
            }
            Ok(())
        })?;
        dec.finish()?;

        match kind.as_deref() {
            Some("tree") => {}
            Some(other) => {
                return Err(Error::Corrupt(format!("object is not a tree, got {other:?}")))
            }
            None => return Err(Error::Corrupt("tree missing type field".into())),
        }
        let entries = entries.ok_or_else(|| Error::Corrupt("tree missing entries".into()))?;

        let tree = Self::new(entries)
            .map_err(|e| Error::Corrupt(format!("decoded tree invalid: {e}")))?;
        if tree.encoded.as_ref() != data {
            return Err(Error::Corrupt("tree encoding is not canonical".into()));
        }
        Ok(tree)
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }
}

impl CasObject for Tree {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Tree
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

    fn sample_entries() -> Vec<TreeEntry> {
        vec![
            TreeEntry::file("model.bin", Hash::compute(b"model"), 123),
            TreeEntry::dir("weights", Hash::compute(b"weights")),
        ]
    }

    #[test]
    fn roundtrip() {
        let tree = Tree::new(sample_entries()).unwrap();
        let decoded = Tree::decode(tree.encoded()).unwrap();
        assert_eq!(decoded.id(), tree.id());
        assert_eq!(decoded.entries(), tree.entries());
    }

    #[test]
    fn rejects_unsorted_entries() {
        let mut entries = sample_entries();
        entries.reverse();
        assert!(Tree::new(entries).is_err());
    }

    #[test]
    fn rejects_duplicate_names() {
        let entries = vec![
            TreeEntry::file("a", Hash::compute(b"1"), 1),
            TreeEntry::file("a", Hash::compute(b"2"), 2),
        ];
        assert!(Tree::new(entries).is_err());
    }

    #[test]
    fn rejects_sized_directory() {
        let entries = vec![TreeEntry {
            name: "d".into(),
            kind: EntryKind::Dir,
            link: Hash::compute(b"d"),
            size: 9,
        }];
        assert!(Tree::new(entries).is_err());
    }

    #[test]
    fn empty_tree_is_valid() {
        let tree = Tree::new(Vec::new()).unwrap();
        let decoded = Tree::decode(tree.encoded()).unwrap();
        assert!(decoded.entries().is_empty());
    }
}
