//! Repository traits for metadata operations.

pub mod commits;
pub mod file_indices;
pub mod refs;

pub use commits::CommitRepo;
pub use file_indices::FileIndexRepo;
pub use refs::RefRepo;
