//! Threshold-OTP decoder
//!
//! Consumes K or more collection streams and reconstructs the plaintext one
//! chunk at a time. The decoder infers K and N from the first record header
//! it sees, validates every stream against it, and XORs the shares of the
//! lexicographically smallest K-subset of the supplied collections. Streams
//! are advanced in lockstep: no stream moves past the current chunk's record
//! until every stream has been read for that chunk.
//!
//! The decoder does not own the readers; their lifetime is the caller's.

use crate::cancel::CancelToken;
use crate::collection::CollectionLabel;
use crate::error::{PadlockError, Result};
use crate::record::{read_body, RecordHeader};
use crate::subsets::SubsetTable;
use std::io::{Read, Write};
use tracing::debug;

/// Streaming K-of-N threshold-OTP decoder
#[derive(Default)]
pub struct Decoder {
    cancel: CancelToken,
}

struct StreamState<'a> {
    reader: Box<dyn Read + 'a>,
    label: CollectionLabel,
    /// Rank of the reconstruction subset within this collection's
    /// participating list; `None` for streams outside the chosen subset.
    share_rank: Option<usize>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Honor a host-supplied cancellation token
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Reconstruct the plaintext from `streams` into `output`
    pub fn decode<'a>(
        &self,
        streams: Vec<Box<dyn Read + 'a>>,
        output: &mut dyn Write,
    ) -> Result<()> {
        if streams.is_empty() {
            return Err(PadlockError::InsufficientCollections {
                available: 0,
                required: crate::collection::MIN_COLLECTIONS,
            });
        }

        // First headers: infer K and N, or finish cleanly if every stream is
        // already empty.
        let mut readers = streams;
        let mut headers: Vec<Option<RecordHeader>> = Vec::with_capacity(readers.len());
        for reader in readers.iter_mut() {
            headers.push(RecordHeader::read_from(reader.as_mut())?);
        }
        if headers.iter().all(|h| h.is_none()) {
            debug!("all collection streams empty, nothing to decode");
            return Ok(());
        }
        if headers.iter().any(|h| h.is_none()) {
            return Err(PadlockError::UnevenCollections(
                "some collection streams are empty".to_string(),
            ));
        }
        let mut headers: Vec<RecordHeader> = headers.into_iter().flatten().collect();

        let first = headers[0];
        let total = first.label.total();
        let required = first.label.required();
        for header in &headers {
            if header.label.total() != total || header.label.required() != required {
                return Err(PadlockError::ParameterMismatch(format!(
                    "stream {} disagrees with scheme {}-of-{}",
                    header.label, required, total
                )));
            }
            if header.chunk_number != 1 {
                return Err(PadlockError::ParameterMismatch(format!(
                    "stream {} starts at chunk {}, expected 1",
                    header.label, header.chunk_number
                )));
            }
        }
        if readers.len() < required {
            return Err(PadlockError::InsufficientCollections {
                available: readers.len(),
                required,
            });
        }

        let table = SubsetTable::new(total, required)?;

        // Lexicographically smallest K letters form the reconstruction
        // subset; any K would do, this keeps the choice deterministic.
        let mut letters: Vec<CollectionLabel> = headers.iter().map(|h| h.label).collect();
        letters.sort();
        letters.dedup();
        if letters.len() != headers.len() {
            return Err(PadlockError::ParameterMismatch(
                "duplicate collection streams supplied".to_string(),
            ));
        }
        let star_id: String = letters[..required].iter().map(|l| l.letter()).collect();
        debug!(subset = %star_id, collections = readers.len(), "decoding");

        let mut states: Vec<StreamState<'a>> = Vec::with_capacity(readers.len());
        for (reader, header) in readers.into_iter().zip(headers.iter()) {
            let index = header.label.index() as u8;
            let share_rank = if star_id.contains(header.label.letter()) {
                let rank = table.participation_rank(index, &star_id).ok_or_else(|| {
                    PadlockError::ParameterMismatch(format!(
                        "collection {} does not participate in subset {}",
                        header.label, star_id
                    ))
                })?;
                Some(rank)
            } else {
                None
            };
            states.push(StreamState {
                reader,
                label: header.label,
                share_rank,
            });
        }

        let shares_per_record = table.per_collection();
        let mut chunk_number: u64 = 1;
        loop {
            self.cancel.check()?;

            // All headers for this chunk are in hand; bodies must agree on
            // the chunk's plaintext length.
            let data_bytes = headers[0].data_bytes;
            for header in &headers {
                if header.data_bytes != data_bytes {
                    return Err(PadlockError::ParameterMismatch(format!(
                        "stream {} stores {} byte chunks, expected {}",
                        header.label, header.data_bytes, data_bytes
                    )));
                }
            }

            let mut decoded = vec![0u8; data_bytes];
            for state in states.iter_mut() {
                let shares = read_body(state.reader.as_mut(), data_bytes, shares_per_record)?;
                if let Some(rank) = state.share_rank {
                    for (d, s) in decoded.iter_mut().zip(shares[rank].iter()) {
                        *d ^= *s;
                    }
                }
            }
            output.write_all(&decoded)?;
            debug!(chunk_number, data_bytes, "decoded chunk");

            // Advance every stream to the next record boundary together.
            chunk_number += 1;
            let mut next: Vec<Option<RecordHeader>> = Vec::with_capacity(states.len());
            for state in states.iter_mut() {
                next.push(RecordHeader::read_from(state.reader.as_mut())?);
            }
            if next.iter().all(|h| h.is_none()) {
                debug!(chunks = chunk_number - 1, "decode complete");
                return Ok(());
            }
            if next.iter().any(|h| h.is_none()) {
                let ended: Vec<String> = states
                    .iter()
                    .zip(next.iter())
                    .filter(|(_, h)| h.is_none())
                    .map(|(s, _)| s.label.to_string())
                    .collect();
                return Err(PadlockError::UnevenCollections(format!(
                    "collections {} ended at chunk {} while others continue",
                    ended.join(", "),
                    chunk_number - 1
                )));
            }

            headers = next.into_iter().flatten().collect();
            for (state, header) in states.iter().zip(headers.iter()) {
                if header.label != state.label {
                    return Err(PadlockError::ParameterMismatch(format!(
                        "stream for {} produced a record for {}",
                        state.label, header.label
                    )));
                }
                if header.chunk_number != chunk_number {
                    return Err(PadlockError::ParameterMismatch(format!(
                        "stream {} jumped to chunk {}, expected {}",
                        state.label, header.chunk_number, chunk_number
                    )));
                }
            }
        }
    }
}

/// Convenience function running one decode with a fresh [`Decoder`]
pub fn decode<'a>(streams: Vec<Box<dyn Read + 'a>>, output: &mut dyn Write) -> Result<()> {
    Decoder::new().decode(streams, output)
}
