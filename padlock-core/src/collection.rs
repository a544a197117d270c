//! Collection identity and scheme parameters
//!
//! A collection is one of the N output streams of an encode run. Each is
//! identified by an index in `[0, N)`, the letter `'A' + index`, and a label
//! of the form `"{K}{letter}{N}"`: `"3C5"` is collection C of a 3-of-5
//! scheme. Labels sort by letter, so lexicographic order over labels equals
//! order over indices.

use crate::error::{PadlockError, Result};
use std::fmt;
use std::str::FromStr;

/// Minimum number of collections in a scheme
pub const MIN_COLLECTIONS: usize = 2;

/// Maximum number of collections in a scheme (one per letter A-Z)
pub const MAX_COLLECTIONS: usize = 26;

/// Default target byte budget for one stored record body
pub const DEFAULT_CHUNK_BYTES: usize = 2 * 1024 * 1024;

/// Parameters for one K-of-N threshold encode run
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Params {
    /// N: total number of collections to produce (2-26)
    pub total: usize,

    /// K: minimum collections needed for reconstruction (2-N)
    pub required: usize,

    /// Target byte budget for one stored record body
    pub chunk_bytes: usize,
}

impl Params {
    /// Create parameters for a K-of-N scheme with the default chunk budget
    pub fn new(total: usize, required: usize) -> Result<Self> {
        let params = Self {
            total,
            required,
            chunk_bytes: DEFAULT_CHUNK_BYTES,
        };
        params.validate()?;
        Ok(params)
    }

    /// Set the record body byte budget
    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes;
        self
    }

    /// Validate N and K ranges
    pub fn validate(&self) -> Result<()> {
        if self.total < MIN_COLLECTIONS || self.total > MAX_COLLECTIONS {
            return Err(PadlockError::BadParams(format!(
                "total collections must be between {} and {}, got {}",
                MIN_COLLECTIONS, MAX_COLLECTIONS, self.total
            )));
        }
        if self.required < MIN_COLLECTIONS {
            return Err(PadlockError::BadParams(format!(
                "required collections must be at least {}, got {}",
                MIN_COLLECTIONS, self.required
            )));
        }
        if self.required > self.total {
            return Err(PadlockError::BadParams(format!(
                "required collections cannot exceed total, got {} > {}",
                self.required, self.total
            )));
        }
        Ok(())
    }

    /// Labels of all N collections, in index order
    pub fn labels(&self) -> Vec<CollectionLabel> {
        (0..self.total)
            .map(|i| CollectionLabel {
                required: self.required as u8,
                total: self.total as u8,
                index: i as u8,
            })
            .collect()
    }
}

/// Identity of one collection within a K-of-N scheme
///
/// Displays as `"{K}{letter}{N}"`; parsing validates all three fields.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionLabel {
    required: u8,
    total: u8,
    index: u8,
}

impl CollectionLabel {
    /// Build a label from scheme parameters and a collection index
    pub fn new(total: usize, required: usize, index: usize) -> Result<Self> {
        Params {
            total,
            required,
            chunk_bytes: DEFAULT_CHUNK_BYTES,
        }
        .validate()?;
        if index >= total {
            return Err(PadlockError::BadLabel(format!(
                "collection index {index} out of range for {total} collections"
            )));
        }
        Ok(Self {
            required: required as u8,
            total: total as u8,
            index: index as u8,
        })
    }

    /// K: collections required for reconstruction
    pub fn required(&self) -> usize {
        self.required as usize
    }

    /// N: total collections in the scheme
    pub fn total(&self) -> usize {
        self.total as usize
    }

    /// 0-based collection index
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Letter identifying this collection ('A' + index)
    pub fn letter(&self) -> char {
        letter_for_index(self.index)
    }
}

/// Letter for a 0-based collection index
pub(crate) fn letter_for_index(index: u8) -> char {
    debug_assert!((index as usize) < MAX_COLLECTIONS);
    (b'A' + index) as char
}

impl fmt::Display for CollectionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.required, self.letter(), self.total)
    }
}

impl fmt::Debug for CollectionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionLabel({self})")
    }
}

impl FromStr for CollectionLabel {
    type Err = PadlockError;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() < 3 || !s.is_ascii() {
            return Err(PadlockError::BadLabel(format!("label too short: {s:?}")));
        }

        // Leading digits are K, a single uppercase letter, trailing digits are N.
        let bytes = s.as_bytes();
        let letter_at = bytes
            .iter()
            .position(|b| !b.is_ascii_digit())
            .ok_or_else(|| PadlockError::BadLabel(format!("no collection letter in {s:?}")))?;
        if letter_at == 0 || letter_at >= s.len() - 1 {
            return Err(PadlockError::BadLabel(format!(
                "expected digits, then letter, then digits: {s:?}"
            )));
        }

        let letter = bytes[letter_at];
        if !letter.is_ascii_uppercase() {
            return Err(PadlockError::BadLabel(format!(
                "collection letter must be A-Z: {s:?}"
            )));
        }

        let required: usize = s[..letter_at]
            .parse()
            .map_err(|_| PadlockError::BadLabel(format!("invalid required count in {s:?}")))?;
        let total: usize = s[letter_at + 1..]
            .parse()
            .map_err(|_| PadlockError::BadLabel(format!("invalid total count in {s:?}")))?;

        if !(MIN_COLLECTIONS..=MAX_COLLECTIONS).contains(&total) {
            return Err(PadlockError::BadLabel(format!(
                "total collections out of range in {s:?}"
            )));
        }
        if required < MIN_COLLECTIONS || required > total {
            return Err(PadlockError::BadLabel(format!(
                "required collections out of range in {s:?}"
            )));
        }

        let index = letter - b'A';
        if index as usize >= total {
            return Err(PadlockError::BadLabel(format!(
                "letter {} out of range for {} collections",
                letter as char, total
            )));
        }

        Ok(Self {
            required: required as u8,
            total: total as u8,
            index,
        })
    }
}

impl serde::Serialize for CollectionLabel {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for CollectionLabel {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
