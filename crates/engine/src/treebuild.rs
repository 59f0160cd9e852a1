//! Builds a Merkle tree from a flat `path -> (hash, size)` set.
//!
//! Two passes: inflate an in-memory trie with `mkdir -p` semantics, then
//! collapse it post-order, persisting a canonical Tree per directory.
//! Child names iterate in sorted order and the codec is canonical, so
//! identical content maps produce identical root hashes no matter how
//! the input was ordered.

use crate::error::{EngineError, EngineResult};
use cask_core::{CasObject, Hash, Tree, TreeEntry};
use cask_storage::ObjectStore;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A staged file: the FileNode hash and the file's logical size.
#[derive(Clone, Copy, Debug)]
pub struct FileRef {
    pub hash: Hash,
    pub size: u64,
}

enum TrieNode {
    Dir(BTreeMap<String, TrieNode>),
    File(FileRef),
}

/// Converts flat path sets into persisted Merkle trees.
pub struct TreeBuilder {
    store: Arc<dyn ObjectStore>,
}

impl TreeBuilder {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Build and persist the tree for `files`, returning the root hash.
    ///
    /// Paths use `/` separators; empty components and leading `./` are
    /// tolerated. A path that is both a file and a directory is an error.
    pub async fn build<I>(&self, files: I) -> EngineResult<Hash>
    where
        I: IntoIterator<Item = (String, FileRef)>,
    {
        let mut root: BTreeMap<String, TrieNode> = BTreeMap::new();

        for (path, file) in files {
            insert_file(&mut root, &path, file)?;
        }

        self.write_dir(&root).await
    }

    fn write_dir<'a>(
        &'a self,
        children: &'a BTreeMap<String, TrieNode>,
    ) -> Pin<Box<dyn Future<Output = EngineResult<Hash>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = Vec::with_capacity(children.len());
            // BTreeMap iterates ascending, which is exactly the order the
            // Tree invariant demands.
            for (name, child) in children {
                match child {
                    TrieNode::File(file) => {
                        entries.push(TreeEntry::file(name.clone(), file.hash, file.size));
                    }
                    TrieNode::Dir(grandchildren) => {
                        let hash = self.write_dir(grandchildren).await?;
                        entries.push(TreeEntry::dir(name.clone(), hash));
                    }
                }
            }

            let tree = Tree::new(entries)?;
            self.store.put(&tree).await?;
            Ok(*tree.id())
        })
    }
}

fn insert_file(
    root: &mut BTreeMap<String, TrieNode>,
    path: &str,
    file: FileRef,
) -> EngineResult<()> {
    // Tolerate doubled slashes and a leading "." the way shell paths do.
    let components: Vec<&str> = path
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();
    let Some((file_name, dirs)) = components.split_last() else {
        return Err(EngineError::Internal(format!("empty file path {path:?}")));
    };

    let mut current = root;
    for dir in dirs {
        let node = current
            .entry((*dir).to_string())
            .or_insert_with(|| TrieNode::Dir(BTreeMap::new()));
        current = match node {
            TrieNode::Dir(children) => children,
            TrieNode::File(_) => {
                return Err(EngineError::Internal(format!(
                    "path {path:?} traverses file component {dir:?}"
                )));
            }
        };
    }

    match current.insert((*file_name).to_string(), TrieNode::File(file)) {
        None | Some(TrieNode::File(_)) => Ok(()),
        Some(TrieNode::Dir(_)) => Err(EngineError::Internal(format!(
            "path {path:?} replaces a directory"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cask_storage::MemoryStore;

    fn file(tag: &str, size: u64) -> FileRef {
        FileRef {
            hash: Hash::compute(tag.as_bytes()),
            size,
        }
    }

    #[tokio::test]
    async fn deterministic_across_insertion_order() {
        let store = Arc::new(MemoryStore::new());
        let builder = TreeBuilder::new(store);

        let forward = vec![
            ("a/x.bin".to_string(), file("x", 1)),
            ("a/y.bin".to_string(), file("y", 2)),
            ("b.bin".to_string(), file("b", 3)),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let h1 = builder.build(forward).await.unwrap();
        let h2 = builder.build(reversed).await.unwrap();
        assert_eq!(h1, h2);
    }

    #[tokio::test]
    async fn nested_directories_collapse_bottom_up() {
        let store = Arc::new(MemoryStore::new());
        let builder = TreeBuilder::new(store.clone());

        let root = builder
            .build(vec![
                ("models/llm/weights.bin".to_string(), file("w", 100)),
                ("models/llm/config.json".to_string(), file("c", 10)),
                ("README.md".to_string(), file("r", 5)),
            ])
            .await
            .unwrap();

        let bytes = cask_storage::collect_bytes(store.get(&root).await.unwrap())
            .await
            .unwrap();
        let tree = Tree::decode(&bytes).unwrap();
        let names: Vec<_> = tree.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["README.md", "models"]);
        assert_eq!(tree.entries()[1].size, 0);
    }

    #[tokio::test]
    async fn tolerates_messy_paths() {
        let store = Arc::new(MemoryStore::new());
        let builder = TreeBuilder::new(store);

        let clean = builder
            .build(vec![("a/b.bin".to_string(), file("f", 1))])
            .await
            .unwrap();
        let messy = builder
            .build(vec![("./a//b.bin".to_string(), file("f", 1))])
            .await
            .unwrap();
        assert_eq!(clean, messy);
    }

    #[tokio::test]
    async fn rejects_file_as_directory() {
        let store = Arc::new(MemoryStore::new());
        let builder = TreeBuilder::new(store);

        let result = builder
            .build(vec![
                ("a".to_string(), file("a", 1)),
                ("a/b.bin".to_string(), file("b", 2)),
            ])
            .await;
        assert!(result.is_err());
    }
}
