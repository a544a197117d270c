//! Directory-backed chunk store
//!
//! Lays out collections the way the original tool distributes them: one
//! subdirectory per collection under a root, holding that collection's chunk
//! records as files named `"{label}_{chunk:04}.{tag}"`. A collection stream
//! is the concatenation of its chunk files in ascending order, which is
//! exactly what the core's decoder consumes.

use padlock_core::{ChunkFactory, ChunkSink, CollectionLabel, PadlockError, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Chunk store writing one file per record under per-collection directories
pub struct DirectoryStore {
    root: PathBuf,
    format: String,
}

impl DirectoryStore {
    /// Use an existing root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            format: crate::DEFAULT_FORMAT.to_string(),
        }
    }

    /// Create the root directory if needed and use it
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(root);
        fs::create_dir_all(&store.root)?;
        Ok(store)
    }

    /// Set the format tag used when reading chunk files back
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn chunk_path(&self, label: &CollectionLabel, chunk_number: u64, format: &str) -> PathBuf {
        self.root
            .join(label.to_string())
            .join(format!("{label}_{chunk_number:04}.{format}"))
    }

    /// Open a reader over one collection's records in chunk order
    pub fn collection_reader(&self, label: CollectionLabel) -> CollectionReader {
        CollectionReader {
            store_root: self.root.clone(),
            label,
            format: self.format.clone(),
            next_chunk: 1,
            current: None,
        }
    }

    /// Discover the collections present under the root
    ///
    /// Non-label directory names are skipped with a warning; the result is
    /// sorted by letter.
    pub fn list_collections(&self) -> Result<Vec<CollectionLabel>> {
        let mut labels = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            match name.parse::<CollectionLabel>() {
                Ok(label) => labels.push(label),
                Err(_) => {
                    warn!(directory = %name, "skipping non-collection directory");
                }
            }
        }
        labels.sort();
        Ok(labels)
    }
}

impl ChunkFactory for DirectoryStore {
    fn new_chunk(
        &mut self,
        label: &CollectionLabel,
        chunk_number: u64,
        format_tag: &str,
    ) -> Result<Box<dyn ChunkSink>> {
        let path = self.chunk_path(label, chunk_number, format_tag);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "opening chunk file");
        let file = File::create(&path)?;
        Ok(Box::new(FileSink {
            writer: BufWriter::new(file),
        }))
    }
}

struct FileSink {
    writer: BufWriter<File>,
}

impl Write for FileSink {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.writer.write(data)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl ChunkSink for FileSink {
    fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }
}

/// Reader chaining one collection's chunk files in ascending order
///
/// Yields the record bytes with no extra framing; a missing next file is
/// end-of-collection.
pub struct CollectionReader {
    store_root: PathBuf,
    label: CollectionLabel,
    format: String,
    next_chunk: u64,
    current: Option<BufReader<File>>,
}

impl CollectionReader {
    /// Label of the collection being read
    pub fn label(&self) -> CollectionLabel {
        self.label
    }

    fn next_path(&self) -> PathBuf {
        self.store_root.join(self.label.to_string()).join(format!(
            "{}_{:04}.{}",
            self.label, self.next_chunk, self.format
        ))
    }
}

impl Read for CollectionReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            match self.current.as_mut() {
                None => {
                    let path = self.next_path();
                    if !path.exists() {
                        return Ok(0);
                    }
                    self.current = Some(BufReader::new(File::open(&path)?));
                    self.next_chunk += 1;
                }
                Some(reader) => match reader.read(buf)? {
                    0 => self.current = None,
                    n => return Ok(n),
                },
            }
        }
    }
}

/// Verify a root directory holds at least `required` collection directories
pub fn require_collections(root: &Path, required: usize) -> Result<Vec<CollectionLabel>> {
    let labels = DirectoryStore::new(root).list_collections()?;
    if labels.len() < required {
        return Err(PadlockError::InsufficientCollections {
            available: labels.len(),
            required,
        });
    }
    Ok(labels)
}
