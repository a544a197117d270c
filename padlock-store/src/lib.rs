//! Padlock Storage Backends
//!
//! Implements the core's chunk I/O contract over concrete stores:
//! - [`DirectoryStore`]: one subdirectory per collection, one binary file
//!   per chunk record
//! - [`MemoryStore`]: in-memory records for tests and embedding
//!
//! Record bytes are opaque here; all framing lives in the core's record
//! codec.

pub mod dir;
pub mod memory;

pub use dir::{require_collections, CollectionReader, DirectoryStore};
pub use memory::MemoryStore;

/// Default format tag used for chunk files
pub const DEFAULT_FORMAT: &str = "bin";
