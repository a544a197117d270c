//! Random sources and the XOR mixer
//!
//! Pad material quality is the entire security of a one-time pad, so pad
//! bytes are drawn from a mixer that XOR-combines several independent
//! sources. The mixed output is at least as unpredictable as the strongest
//! component: an attacker must predict every source at once to predict the
//! pad.
//!
//! Sources:
//! - [`SystemSource`]: the platform CSPRNG
//! - [`ChaChaSource`]: ChaCha20 keystream seeded from the platform CSPRNG
//! - [`StdSource`]: `StdRng` seeded from the platform CSPRNG
//! - [`CounterSource`]: deterministic counter, for tests only

use crate::error::{PadlockError, Result};
use parking_lot::Mutex;
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use zeroize::Zeroize;

/// One independent source of random bytes
///
/// `fill` either fills the whole buffer or fails; stateful implementations
/// serialize access internally so a source can be shared across threads.
pub trait RandomSource: Send + Sync {
    /// Short stable name, for diagnostics
    fn name(&self) -> &'static str;

    /// Fill `out` completely with random bytes
    fn fill(&self, out: &mut [u8]) -> Result<()>;
}

/// Platform cryptographic RNG (`getrandom`)
///
/// The primary source. Stateless; safe to share without locking.
pub struct SystemSource;

impl RandomSource for SystemSource {
    fn name(&self) -> &'static str {
        "system"
    }

    fn fill(&self, out: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(out)
            .map_err(|e| PadlockError::RngExhausted(format!("platform rng: {e}")))
    }
}

/// ChaCha20 keystream generator seeded from the platform CSPRNG at
/// construction
pub struct ChaChaSource {
    inner: Mutex<ChaCha20Rng>,
}

impl ChaChaSource {
    pub fn new() -> Result<Self> {
        let rng = ChaCha20Rng::from_rng(OsRng)
            .map_err(|e| PadlockError::RngExhausted(format!("seeding chacha20: {e}")))?;
        Ok(Self {
            inner: Mutex::new(rng),
        })
    }
}

impl RandomSource for ChaChaSource {
    fn name(&self) -> &'static str {
        "chacha20"
    }

    fn fill(&self, out: &mut [u8]) -> Result<()> {
        self.inner.lock().fill_bytes(out);
        Ok(())
    }
}

/// `StdRng` seeded from the platform CSPRNG at construction
///
/// A further independent algorithmic generator; its only job is to be
/// uncorrelated with the other sources.
pub struct StdSource {
    inner: Mutex<StdRng>,
}

impl StdSource {
    pub fn new() -> Result<Self> {
        let rng = StdRng::from_rng(OsRng)
            .map_err(|e| PadlockError::RngExhausted(format!("seeding std rng: {e}")))?;
        Ok(Self {
            inner: Mutex::new(rng),
        })
    }
}

impl RandomSource for StdSource {
    fn name(&self) -> &'static str {
        "std"
    }

    fn fill(&self, out: &mut [u8]) -> Result<()> {
        self.inner.lock().fill_bytes(out);
        Ok(())
    }
}

/// Deterministic counter source yielding `s, s+1, s+2, ...`
///
/// For reproducible tests only. Never include it in a mixer that protects
/// real data.
pub struct CounterSource {
    counter: Mutex<u8>,
}

impl CounterSource {
    pub fn new(seed: u8) -> Self {
        Self {
            counter: Mutex::new(seed),
        }
    }
}

impl RandomSource for CounterSource {
    fn name(&self) -> &'static str {
        "counter"
    }

    fn fill(&self, out: &mut [u8]) -> Result<()> {
        let mut counter = self.counter.lock();
        for byte in out.iter_mut() {
            *byte = *counter;
            *counter = counter.wrapping_add(1);
        }
        Ok(())
    }
}

/// XOR mixer over an ordered, non-empty list of sources
///
/// `fill` reads the full request from every source into a scratch buffer and
/// XOR-accumulates into a zeroed accumulator; the scratch and accumulator are
/// wiped before returning. The mixer holds no lock of its own; it is safe to
/// share across threads because each source serializes internally.
pub struct MixedRandom {
    sources: Vec<Box<dyn RandomSource>>,
}

impl MixedRandom {
    /// Build a mixer from explicit sources
    pub fn new(sources: Vec<Box<dyn RandomSource>>) -> Result<Self> {
        if sources.is_empty() {
            return Err(PadlockError::BadParams(
                "a random mixer needs at least one source".to_string(),
            ));
        }
        Ok(Self { sources })
    }

    /// Default production mixer: platform CSPRNG plus two independently
    /// seeded algorithmic generators
    pub fn with_default_sources() -> Result<Self> {
        Self::new(vec![
            Box::new(SystemSource),
            Box::new(ChaChaSource::new()?),
            Box::new(StdSource::new()?),
        ])
    }

    /// Deterministic single-source mixer for reproducible tests
    pub fn deterministic(seed: u8) -> Self {
        Self {
            sources: vec![Box::new(CounterSource::new(seed))],
        }
    }

    /// Names of the mixed sources, in order
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Fill `out` with mixed random bytes
    pub fn fill(&self, out: &mut [u8]) -> Result<()> {
        let mut acc = vec![0u8; out.len()];
        let mut scratch = vec![0u8; out.len()];

        for source in &self.sources {
            if let Err(e) = source.fill(&mut scratch) {
                acc.zeroize();
                scratch.zeroize();
                return Err(e);
            }
            for (a, s) in acc.iter_mut().zip(scratch.iter()) {
                *a ^= *s;
            }
        }

        out.copy_from_slice(&acc);
        acc.zeroize();
        scratch.zeroize();
        Ok(())
    }
}
