//! The cask data engine.
//!
//! Wires the core model, the object store and the metadata index into
//! the operations clients actually call:
//! - [`Ingester`]: streaming chunked ingestion with bounded memory
//! - [`Exporter`]: serial or parallel restore, whole trees included
//! - [`TreeBuilder`]: flat path sets to persisted Merkle trees
//! - [`UploadService`]: linear-hash pre-check and verified uploads
//! - [`CommitService`]: snapshot commits with optimistic ref updates
//! - [`describe_object`]: human-readable object inspection

pub mod commit;
pub mod error;
pub mod export;
pub mod ingest;
pub mod inspect;
pub mod precheck;
pub mod treebuild;

pub use commit::CommitService;
pub use error::{EngineError, EngineResult};
pub use export::{ExportSink, Exporter, PositionalFile, PositionalWrite};
pub use ingest::Ingester;
pub use inspect::describe_object;
pub use precheck::{Precheck, UploadReceipt, UploadService};
pub use treebuild::{FileRef, TreeBuilder};
