//! Core domain types and pure algorithms for cask.
//!
//! This crate defines everything the storage and engine layers agree on:
//! - Content hashes and user-supplied hash prefixes
//! - The content-defined chunker and its fixed Gear table
//! - The canonical binary encoding and its strict decoder
//! - The Merkle DAG node types: Chunk, FileNode, Tree, Commit
//! - Construction-time configuration structs

pub mod chunk;
pub mod chunker;
pub mod codec;
pub mod commit;
pub mod config;
pub mod error;
pub mod filenode;
pub mod gear;
pub mod hash;
pub mod object;
pub mod tree;

pub use chunk::Chunk;
pub use chunker::{Chunker, ChunkerParams};
pub use commit::Commit;
pub use config::{CacheConfig, EngineConfig, MetadataConfig, StorageConfig};
pub use error::{Error, Result};
pub use filenode::{ChunkLink, FileNode};
pub use hash::{Hash, HashPrefix, StreamHasher};
pub use object::{CasObject, ObjectKind};
pub use tree::{EntryKind, Tree, TreeEntry};
