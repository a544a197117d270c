//! Chunk record codec
//!
//! One record is what a collection stores for one plaintext chunk:
//!
//! ```text
//! u8            name_len   (1..=255)
//! u8[name_len]  name       ASCII "{label}:{chunk}:{data_bytes}"
//! u8[B * P]     body       P shares of data_bytes bytes, no delimiters
//! ```
//!
//! Records tile end-to-end in a collection stream with no outer framing; the
//! header's `data_bytes` field is the single source of truth for share
//! length. The format carries no checksum; bit integrity is the storage
//! container's concern.

use crate::collection::CollectionLabel;
use crate::error::{PadlockError, Result};
use bytes::Bytes;
use std::io::Read;

/// Maximum record name length representable in the one-byte prefix
pub const MAX_NAME_LEN: usize = 255;

/// Parsed record name header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Collection this record belongs to
    pub label: CollectionLabel,

    /// 1-based chunk number
    pub chunk_number: u64,

    /// Plaintext byte length of this chunk; every share in the body has
    /// exactly this length
    pub data_bytes: usize,
}

impl RecordHeader {
    pub fn new(label: CollectionLabel, chunk_number: u64, data_bytes: usize) -> Self {
        Self {
            label,
            chunk_number,
            data_bytes,
        }
    }

    /// Record name as stored on the wire
    pub fn name(&self) -> String {
        format!("{}:{}:{}", self.label, self.chunk_number, self.data_bytes)
    }

    /// Serialize the length-prefixed name header
    pub fn encode(&self) -> Result<Vec<u8>> {
        let name = self.name();
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(PadlockError::ParameterMismatch(format!(
                "record name {name:?} does not fit a one-byte length prefix"
            )));
        }
        let mut out = Vec::with_capacity(1 + name.len());
        out.push(name.len() as u8);
        out.extend_from_slice(name.as_bytes());
        Ok(out)
    }

    /// Parse a record name back into its parts
    pub fn parse_name(name: &str) -> Result<Self> {
        let mut parts = name.split(':');
        let (label, chunk, bytes) = match (parts.next(), parts.next(), parts.next(), parts.next())
        {
            (Some(label), Some(chunk), Some(bytes), None) => (label, chunk, bytes),
            _ => {
                return Err(PadlockError::BadLabel(format!(
                    "record name {name:?} is not label:chunk:bytes"
                )))
            }
        };

        let label: CollectionLabel = label.parse()?;
        let chunk_number: u64 = chunk.parse().map_err(|_| {
            PadlockError::ParameterMismatch(format!("invalid chunk number in record name {name:?}"))
        })?;
        let data_bytes: usize = bytes.parse().map_err(|_| {
            PadlockError::ParameterMismatch(format!("invalid chunk size in record name {name:?}"))
        })?;

        if chunk_number == 0 {
            return Err(PadlockError::ParameterMismatch(format!(
                "chunk number must be positive in record name {name:?}"
            )));
        }
        if data_bytes == 0 {
            return Err(PadlockError::ParameterMismatch(format!(
                "chunk size must be positive in record name {name:?}"
            )));
        }

        Ok(Self {
            label,
            chunk_number,
            data_bytes,
        })
    }

    /// Read one name header from a stream
    ///
    /// Returns `Ok(None)` on clean EOF at the length byte; the record
    /// boundary is the only place a collection stream may end.
    pub fn read_from(reader: &mut dyn Read) -> Result<Option<Self>> {
        let mut len_buf = [0u8; 1];
        loop {
            match reader.read(&mut len_buf) {
                Ok(0) => return Ok(None),
                Ok(_) => break,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let name_len = len_buf[0] as usize;
        if name_len == 0 {
            return Err(PadlockError::TruncatedStream(
                "record name length is zero".to_string(),
            ));
        }

        let mut name_buf = vec![0u8; name_len];
        read_exact_or(reader, &mut name_buf, "record name")?;
        let name = std::str::from_utf8(&name_buf)
            .map_err(|_| PadlockError::BadLabel("record name is not ASCII".to_string()))?;
        Self::parse_name(name).map(Some)
    }

    /// Byte length of the record body for a collection storing `shares`
    /// shares per record
    pub fn body_len(&self, shares: usize) -> usize {
        self.data_bytes * shares
    }
}

/// Read one record body and split it into its equal-length shares
///
/// Reads exactly `data_bytes * share_count` bytes and returns `share_count`
/// zero-copy slices of `data_bytes` each, indexed by the collection's
/// canonical participation order.
pub fn read_body(
    reader: &mut dyn Read,
    data_bytes: usize,
    share_count: usize,
) -> Result<Vec<Bytes>> {
    let mut body = vec![0u8; data_bytes * share_count];
    read_exact_or(reader, &mut body, "record body")?;

    let body = Bytes::from(body);
    Ok((0..share_count)
        .map(|i| body.slice(i * data_bytes..(i + 1) * data_bytes))
        .collect())
}

/// `read_exact` that reports a short read as `TruncatedStream`
fn read_exact_or(reader: &mut dyn Read, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            PadlockError::TruncatedStream(format!("{what} ended after partial read"))
        } else {
            PadlockError::Io(e)
        }
    })
}
