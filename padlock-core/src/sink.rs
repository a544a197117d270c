//! Chunk I/O contract
//!
//! The core never touches storage directly. On the way out it asks a
//! [`ChunkFactory`] for one sink per record and closes it when the record is
//! complete; on the way back in it consumes plain [`std::io::Read`] streams.
//! Record bytes are opaque to the storage layer; any format-specific
//! embedding happens behind these traits.

use crate::collection::CollectionLabel;
use crate::error::Result;
use std::io::Write;

/// Write sink for exactly one chunk record
pub trait ChunkSink: Write + Send {
    /// Finalize the record. Storage must be durable before this returns.
    fn close(&mut self) -> Result<()>;
}

/// Factory opening one sink per (collection, chunk) pair
pub trait ChunkFactory {
    /// Open a sink for the record of `label` at `chunk_number`.
    ///
    /// `format_tag` is an opaque string the caller threads through to the
    /// storage layer (e.g. a file extension).
    fn new_chunk(
        &mut self,
        label: &CollectionLabel,
        chunk_number: u64,
        format_tag: &str,
    ) -> Result<Box<dyn ChunkSink>>;
}

/// Adapter turning a closure into a [`ChunkFactory`]
pub struct FactoryFn<F>(pub F);

impl<F> ChunkFactory for FactoryFn<F>
where
    F: FnMut(&CollectionLabel, u64, &str) -> Result<Box<dyn ChunkSink>>,
{
    fn new_chunk(
        &mut self,
        label: &CollectionLabel,
        chunk_number: u64,
        format_tag: &str,
    ) -> Result<Box<dyn ChunkSink>> {
        (self.0)(label, chunk_number, format_tag)
    }
}
