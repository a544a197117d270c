//! In-memory chunk store
//!
//! Used for tests and embedding. Not persistent.

use padlock_core::{ChunkFactory, ChunkSink, CollectionLabel, Result};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct StoreInner {
    /// Committed records keyed by collection label, ordered by chunk number
    records: RwLock<HashMap<String, BTreeMap<u64, Vec<u8>>>>,

    /// Number of sinks closed successfully
    writes: AtomicU64,
}

/// In-memory chunk store; clones share the same underlying records
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels with at least one committed record, sorted by letter
    pub fn collections(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.inner.records.read().keys().cloned().collect();
        labels.sort();
        labels
    }

    /// Number of records committed across all collections
    pub fn record_count(&self) -> u64 {
        self.inner.writes.load(Ordering::Relaxed)
    }

    /// Concatenated record bytes of one collection, in chunk order
    pub fn collection_bytes(&self, label: &CollectionLabel) -> Vec<u8> {
        let records = self.inner.records.read();
        let mut bytes = Vec::new();
        if let Some(chunks) = records.get(&label.to_string()) {
            for record in chunks.values() {
                bytes.extend_from_slice(record);
            }
        }
        bytes
    }

    /// Reader over one collection's records, snapshotted at call time
    pub fn collection_reader(&self, label: &CollectionLabel) -> impl Read {
        Cursor::new(self.collection_bytes(label))
    }

    /// Drop all committed records
    pub fn clear(&self) {
        self.inner.records.write().clear();
        self.inner.writes.store(0, Ordering::Relaxed);
    }
}

impl ChunkFactory for MemoryStore {
    fn new_chunk(
        &mut self,
        label: &CollectionLabel,
        chunk_number: u64,
        _format_tag: &str,
    ) -> Result<Box<dyn ChunkSink>> {
        Ok(Box::new(MemorySink {
            inner: self.inner.clone(),
            label: label.to_string(),
            chunk_number,
            buf: Vec::new(),
        }))
    }
}

/// Sink buffering one record, committed on close
struct MemorySink {
    inner: Arc<StoreInner>,
    label: String,
    chunk_number: u64,
    buf: Vec<u8>,
}

impl Write for MemorySink {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl ChunkSink for MemorySink {
    fn close(&mut self) -> Result<()> {
        let record = std::mem::take(&mut self.buf);
        self.inner
            .records
            .write()
            .entry(self.label.clone())
            .or_default()
            .insert(self.chunk_number, record);
        self.inner.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
