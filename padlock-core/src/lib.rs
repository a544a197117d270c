//! Padlock Core Library
//!
//! Cryptographic core of the padlock K-of-N threshold one-time-pad system.
//! A plaintext stream is encoded into N collection streams such that any K
//! of them reconstruct the plaintext byte-for-byte, while any K-1 or fewer
//! are indistinguishable from uniform random bytes (information-theoretic
//! security). This crate provides:
//! - A multi-source XOR mixer producing one-time-pad material
//! - The collection model and canonical K-subset enumeration
//! - The per-chunk record codec
//! - Streaming threshold-OTP encoder and decoder
//! - The chunk I/O contract that storage backends implement
//!
//! Storage, archive packaging, and the CLI live in sibling crates; the core
//! only ever sees byte streams and opaque record sinks.

pub mod cancel;
pub mod collection;
pub mod decode;
pub mod encode;
pub mod error;
pub mod record;
pub mod rng;
pub mod sink;
pub mod subsets;

pub use cancel::CancelToken;
pub use collection::{
    CollectionLabel, Params, DEFAULT_CHUNK_BYTES, MAX_COLLECTIONS, MIN_COLLECTIONS,
};
pub use decode::{decode, Decoder};
pub use encode::{encode, Encoder};
pub use error::{PadlockError, Result};
pub use record::RecordHeader;
pub use rng::{MixedRandom, RandomSource};
pub use sink::{ChunkFactory, ChunkSink, FactoryFn};
pub use subsets::{Subset, SubsetTable};
