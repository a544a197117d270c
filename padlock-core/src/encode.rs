//! Threshold-OTP encoder
//!
//! Drives the chunk-at-a-time encode pipeline: read one plaintext chunk,
//! expand it into per-subset share tuples, then write one record per
//! collection through the chunk factory. Records for chunk `n` are fully
//! written to all N sinks before any record for chunk `n+1` is opened.
//!
//! For one chunk and one K-subset, share 0 (the carrier, held by the
//! subset's lowest-index member) starts as the plaintext and absorbs K-1
//! fresh pads; shares 1..K are those pads. The XOR of all K shares is the
//! plaintext, and any strict subset of them is uniformly random.

use crate::cancel::CancelToken;
use crate::collection::{CollectionLabel, Params};
use crate::error::{PadlockError, Result};
use crate::record::RecordHeader;
use crate::rng::MixedRandom;
use crate::sink::{ChunkFactory, ChunkSink};
use crate::subsets::SubsetTable;
use std::io::Read;
use tracing::debug;
use zeroize::Zeroizing;

/// Streaming K-of-N threshold-OTP encoder
pub struct Encoder {
    params: Params,
    table: SubsetTable,
    labels: Vec<CollectionLabel>,
    cancel: CancelToken,
}

impl Encoder {
    pub fn new(params: Params) -> Result<Self> {
        params.validate()?;
        let table = SubsetTable::new(params.total, params.required)?;
        let labels = params.labels();
        Ok(Self {
            params,
            table,
            labels,
            cancel: CancelToken::new(),
        })
    }

    /// Honor a host-supplied cancellation token
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Plaintext bytes consumed per chunk: the record body budget divided by
    /// the number of shares each collection stores per record
    pub fn plaintext_chunk_bytes(&self) -> Result<usize> {
        let shares = self.table.per_collection();
        let chunk_bytes = self.params.chunk_bytes / shares;
        if chunk_bytes < 1 {
            return Err(PadlockError::ChunkTooSmall {
                budget: self.params.chunk_bytes,
                shares,
            });
        }
        Ok(chunk_bytes)
    }

    /// Encode `input` to EOF, emitting one record per collection per chunk
    ///
    /// The encoder owns every sink the factory hands it for the duration of
    /// the run and closes each before moving on; on error the open sink is
    /// closed best-effort and the original error surfaces.
    pub fn encode(
        &self,
        input: &mut dyn Read,
        rng: &MixedRandom,
        chunks: &mut dyn ChunkFactory,
        format_tag: &str,
    ) -> Result<()> {
        let chunk_bytes = self.plaintext_chunk_bytes()?;
        debug!(
            total = self.params.total,
            required = self.params.required,
            chunk_bytes,
            subsets = self.table.count(),
            "starting encode"
        );

        let mut buffer = Zeroizing::new(vec![0u8; chunk_bytes]);
        let mut chunk_number: u64 = 0;
        loop {
            self.cancel.check()?;

            let got = read_until_full(input, &mut buffer)?;
            if got > 0 {
                chunk_number += 1;
                self.encode_one_chunk(&buffer[..got], chunk_number, rng, chunks, format_tag)?;
            }
            if got < chunk_bytes {
                break;
            }
        }

        debug!(chunks = chunk_number, "encode complete");
        Ok(())
    }

    fn encode_one_chunk(
        &self,
        chunk: &[u8],
        chunk_number: u64,
        rng: &MixedRandom,
        chunks: &mut dyn ChunkFactory,
        format_tag: &str,
    ) -> Result<()> {
        let data_bytes = chunk.len();
        debug!(chunk_number, data_bytes, "encoding chunk");

        // Build the K shares of every subset. Pads live only until the end
        // of this chunk and are wiped on drop.
        let mut tuples: Vec<Vec<Zeroizing<Vec<u8>>>> = Vec::with_capacity(self.table.count());
        for _ in 0..self.table.count() {
            let mut shares = Vec::with_capacity(self.table.required());
            shares.push(Zeroizing::new(chunk.to_vec()));
            for _ in 1..self.table.required() {
                let mut pad = Zeroizing::new(vec![0u8; data_bytes]);
                rng.fill(&mut pad)?;
                xor_into(&mut shares[0], &pad);
                shares.push(pad);
            }
            tuples.push(shares);
        }

        // One record per collection, shares in canonical participation order.
        for label in &self.labels {
            self.cancel.check()?;
            let mut sink = chunks.new_chunk(label, chunk_number, format_tag)?;
            let header = RecordHeader::new(*label, chunk_number, data_bytes);
            match self.write_record(sink.as_mut(), &header, &tuples) {
                Ok(()) => sink.close()?,
                Err(e) => {
                    let _ = sink.close();
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    fn write_record(
        &self,
        sink: &mut dyn ChunkSink,
        header: &RecordHeader,
        tuples: &[Vec<Zeroizing<Vec<u8>>>],
    ) -> Result<()> {
        sink.write_all(&header.encode()?)?;

        let index = header.label.index() as u8;
        for &at in self.table.participating(index) {
            let position = self.table.subset(at).position_of(index).ok_or_else(|| {
                PadlockError::ParameterMismatch(format!(
                    "collection {} missing from subset {}",
                    header.label,
                    self.table.subset(at).id()
                ))
            })?;
            sink.write_all(&tuples[at][position])?;
        }
        Ok(())
    }
}

/// Convenience function running one encode with a fresh [`Encoder`]
pub fn encode(
    params: Params,
    input: &mut dyn Read,
    rng: &MixedRandom,
    chunks: &mut dyn ChunkFactory,
    format_tag: &str,
) -> Result<()> {
    Encoder::new(params)?.encode(input, rng, chunks, format_tag)
}

fn xor_into(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d ^= *s;
    }
}

/// Read until `buf` is full or EOF; returns bytes read
fn read_until_full(input: &mut dyn Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ChunkSink;
    use std::collections::BTreeMap;
    use std::io::{Cursor, Write};
    use std::sync::{Arc, Mutex};

    /// Sink collecting records into a shared map keyed by collection label
    pub(crate) struct VecSink {
        store: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
        label: String,
        buf: Vec<u8>,
    }

    impl Write for VecSink {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            self.buf.extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl ChunkSink for VecSink {
        fn close(&mut self) -> Result<()> {
            self.store
                .lock()
                .unwrap()
                .entry(self.label.clone())
                .or_default()
                .extend_from_slice(&self.buf);
            Ok(())
        }
    }

    pub(crate) fn vec_factory(
        store: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    ) -> impl crate::sink::ChunkFactory {
        crate::sink::FactoryFn(move |label: &CollectionLabel, _chunk: u64, _tag: &str| {
            Ok(Box::new(VecSink {
                store: store.clone(),
                label: label.to_string(),
                buf: Vec::new(),
            }) as Box<dyn ChunkSink>)
        })
    }

    fn encode_to_map(params: Params, plaintext: &[u8], seed: u8) -> BTreeMap<String, Vec<u8>> {
        let store = Arc::new(Mutex::new(BTreeMap::new()));
        let rng = MixedRandom::deterministic(seed);
        let mut factory = vec_factory(store.clone());
        let encoder = Encoder::new(params).unwrap();
        encoder
            .encode(&mut Cursor::new(plaintext.to_vec()), &rng, &mut factory, "bin")
            .unwrap();
        let records = store.lock().unwrap().clone();
        records
    }

    #[test]
    fn test_two_of_two_bodies_xor_to_plaintext() {
        // N=2, K=2: one subset, one share per collection.
        let params = Params::new(2, 2).unwrap().with_chunk_bytes(2);
        let records = encode_to_map(params, b"hi", 7);
        assert_eq!(records.len(), 2);

        let a = &records["2A2"];
        let b = &records["2B2"];
        // Header "2A2:1:2" is 7 chars + length byte.
        assert_eq!(a.len(), 1 + 7 + 2);
        assert_eq!(a[0] as usize, 7);
        assert_eq!(&a[1..8], b"2A2:1:2");

        let body_a = &a[8..];
        let body_b = &b[8..];
        assert_eq!(body_a.len(), 2);
        assert_eq!([body_a[0] ^ body_b[0], body_a[1] ^ body_b[1]], *b"hi");
    }

    #[test]
    fn test_record_sizes_match_participation() {
        // N=5, K=3: C=10, 6 shares per record.
        let params = Params::new(5, 3).unwrap().with_chunk_bytes(60);
        let plaintext = vec![0xAA; 50];
        let records = encode_to_map(params, &plaintext, 0);
        assert_eq!(records.len(), 5);

        for (label, record) in &records {
            // 5 chunks of 10 bytes: five records tiled end-to-end.
            let name = format!("{label}:1:10");
            assert_eq!(record[0] as usize, name.len());
            assert_eq!(&record[1..1 + name.len()], name.as_bytes());
            assert_eq!(record.len(), 5 * (1 + name.len() + 10 * 6));
        }
    }

    #[test]
    fn test_short_final_chunk_keeps_exact_length() {
        // N=4, K=2: 3 shares per record; chunk budget 9 -> B=3.
        let params = Params::new(4, 2).unwrap().with_chunk_bytes(9);
        let records = encode_to_map(params, &[1, 2, 3, 4, 5, 6, 7], 0);

        let record = &records["2A4"];
        // Chunks of 3, 3, 1: the final record name carries B=1 and its body
        // holds 3 one-byte shares.
        let name3 = "2A4:1:3";
        let name_short = "2A4:3:1";
        let full = 1 + name3.len() + 3 * 3;
        let short = 1 + name_short.len() + 1 * 3;
        assert_eq!(record.len(), 2 * full + short);

        let tail = &record[2 * full..];
        assert_eq!(tail[0] as usize, name_short.len());
        assert_eq!(&tail[1..1 + name_short.len()], name_short.as_bytes());
    }

    #[test]
    fn test_empty_input_emits_no_records() {
        let params = Params::new(3, 2).unwrap().with_chunk_bytes(64);
        let records = encode_to_map(params, b"", 0);
        assert!(records.is_empty());
    }

    #[test]
    fn test_chunk_budget_too_small() {
        // N=5, K=3 needs 6 shares per record; budget 5 leaves B=0.
        let params = Params::new(5, 3).unwrap().with_chunk_bytes(5);
        let encoder = Encoder::new(params).unwrap();
        assert!(matches!(
            encoder.plaintext_chunk_bytes(),
            Err(PadlockError::ChunkTooSmall { budget: 5, shares: 6 })
        ));
    }

    #[test]
    fn test_minimum_viable_budget() {
        // Budget exactly one byte per share must succeed with B=1.
        let params = Params::new(5, 3).unwrap().with_chunk_bytes(6);
        let encoder = Encoder::new(params).unwrap();
        assert_eq!(encoder.plaintext_chunk_bytes().unwrap(), 1);

        let records = encode_to_map(params, b"x", 0);
        assert_eq!(records.len(), 5);
    }

    #[test]
    fn test_deterministic_mixer_is_reproducible() {
        let params = Params::new(3, 2).unwrap().with_chunk_bytes(8);
        let plaintext = [0x00, 0x01, 0x02, 0x03];
        let first = encode_to_map(params, &plaintext, 0);
        let second = encode_to_map(params, &plaintext, 0);
        assert_eq!(first, second);

        let reseeded = encode_to_map(params, &plaintext, 1);
        assert_ne!(first, reseeded);
    }

    #[test]
    fn test_cancelled_before_first_chunk() {
        let params = Params::new(2, 2).unwrap().with_chunk_bytes(4);
        let cancel = CancelToken::new();
        cancel.cancel();
        let encoder = Encoder::new(params).unwrap().with_cancel(cancel);

        let store = Arc::new(Mutex::new(BTreeMap::new()));
        let rng = MixedRandom::deterministic(0);
        let mut factory = vec_factory(store.clone());
        let err = encoder
            .encode(&mut Cursor::new(b"data".to_vec()), &rng, &mut factory, "bin")
            .unwrap_err();
        assert!(matches!(err, PadlockError::Cancelled));
        assert!(store.lock().unwrap().is_empty());
    }

    #[test]
    fn test_sink_write_failure_aborts_and_closes() {
        struct BrokenSink {
            closed: Arc<std::sync::atomic::AtomicBool>,
        }

        impl Write for BrokenSink {
            fn write(&mut self, _data: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        impl ChunkSink for BrokenSink {
            fn close(&mut self) -> Result<()> {
                self.closed.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            }
        }

        let closed = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let sink_closed = closed.clone();
        let mut factory = crate::sink::FactoryFn(
            move |_label: &CollectionLabel, _chunk: u64, _tag: &str| {
                Ok(Box::new(BrokenSink {
                    closed: sink_closed.clone(),
                }) as Box<dyn ChunkSink>)
            },
        );

        let params = Params::new(2, 2).unwrap().with_chunk_bytes(4);
        let encoder = Encoder::new(params).unwrap();
        let rng = MixedRandom::deterministic(0);
        let err = encoder
            .encode(&mut Cursor::new(b"data".to_vec()), &rng, &mut factory, "bin")
            .unwrap_err();
        assert!(matches!(err, PadlockError::Io(_)));
        // The failed sink was still closed before the error surfaced.
        assert!(closed.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_rng_failure_aborts_before_any_sink_opens() {
        struct DrySource;

        impl crate::rng::RandomSource for DrySource {
            fn name(&self) -> &'static str {
                "dry"
            }

            fn fill(&self, _out: &mut [u8]) -> Result<()> {
                Err(PadlockError::RngExhausted("no entropy".to_string()))
            }
        }

        let store = Arc::new(Mutex::new(BTreeMap::new()));
        let mut factory = vec_factory(store.clone());
        let params = Params::new(3, 2).unwrap().with_chunk_bytes(8);
        let encoder = Encoder::new(params).unwrap();
        let rng = MixedRandom::new(vec![Box::new(DrySource)]).unwrap();

        let err = encoder
            .encode(&mut Cursor::new(b"data".to_vec()), &rng, &mut factory, "bin")
            .unwrap_err();
        assert!(matches!(err, PadlockError::RngExhausted(_)));
        // Pads are drawn before any record sink is opened.
        assert!(store.lock().unwrap().is_empty());
    }

    #[test]
    fn test_factory_error_propagates() {
        let mut factory = crate::sink::FactoryFn(
            |_label: &CollectionLabel, _chunk: u64, _tag: &str| -> Result<Box<dyn ChunkSink>> {
                Err(PadlockError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only store",
                )))
            },
        );

        let params = Params::new(2, 2).unwrap().with_chunk_bytes(4);
        let encoder = Encoder::new(params).unwrap();
        let rng = MixedRandom::deterministic(0);
        let err = encoder
            .encode(&mut Cursor::new(b"data".to_vec()), &rng, &mut factory, "bin")
            .unwrap_err();
        assert!(matches!(err, PadlockError::Io(_)));
    }

    #[test]
    fn test_subset_shares_xor_to_plaintext() {
        // N=3, K=3: single subset ABC, three shares, one per collection.
        let params = Params::new(3, 3).unwrap().with_chunk_bytes(1);
        let records = encode_to_map(params, &[0x5C], 42);

        let name_len = "3A3:1:1".len();
        let mut acc = 0u8;
        for record in records.values() {
            assert_eq!(record.len(), 1 + name_len + 1);
            acc ^= record[1 + name_len];
        }
        assert_eq!(acc, 0x5C);
    }
}
