//! Canonical K-subset enumeration
//!
//! Every encode run distributes shares over all `C(N, K)` size-K subsets of
//! the collection indices, and the decoder must walk them in the same order.
//! The canonical order is lexicographic over sorted index tuples, which for
//! single-letter collection names is also lexicographic over subset id
//! strings like `"ACE"`. The table is cheap to recompute per run for N <= 26,
//! so nothing is cached globally.

use crate::collection::{letter_for_index, MAX_COLLECTIONS, MIN_COLLECTIONS};
use crate::error::{PadlockError, Result};

/// One K-subset of collection indices, with its canonical string id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subset {
    members: Vec<u8>,
    id: String,
}

impl Subset {
    fn new(members: Vec<u8>) -> Self {
        debug_assert!(members.windows(2).all(|w| w[0] < w[1]));
        let id = members.iter().map(|&i| letter_for_index(i)).collect();
        Self { members, id }
    }

    /// Canonical id: member letters in ascending order, e.g. `"ACE"`
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Member collection indices, ascending
    pub fn members(&self) -> &[u8] {
        &self.members
    }

    /// Number of members (always K)
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when the subset has no members (never, for a valid table)
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether this subset contains the collection index
    pub fn contains(&self, index: u8) -> bool {
        self.members.binary_search(&index).is_ok()
    }

    /// 0-based rank of a member among the sorted members
    ///
    /// Rank 0 is the carrier position: the share stored there is the one the
    /// encoder XORed with the plaintext.
    pub fn position_of(&self, index: u8) -> Option<usize> {
        self.members.binary_search(&index).ok()
    }
}

/// All `C(N, K)` subsets in canonical order, with per-collection views
#[derive(Debug, Clone)]
pub struct SubsetTable {
    total: usize,
    required: usize,
    subsets: Vec<Subset>,
    /// Per collection index: positions into `subsets` of the subsets that
    /// contain it, in canonical order.
    participating: Vec<Vec<usize>>,
}

impl SubsetTable {
    /// Enumerate the table for a K-of-N scheme
    pub fn new(total: usize, required: usize) -> Result<Self> {
        if !(MIN_COLLECTIONS..=MAX_COLLECTIONS).contains(&total)
            || required < MIN_COLLECTIONS
            || required > total
        {
            return Err(PadlockError::BadParams(format!(
                "cannot enumerate {required}-subsets of {total} collections"
            )));
        }

        let mut subsets = Vec::with_capacity(binomial(total, required));
        let mut path: Vec<u8> = Vec::with_capacity(required);
        enumerate(0, total, required, &mut path, &mut subsets);

        let mut participating = vec![Vec::new(); total];
        for (at, subset) in subsets.iter().enumerate() {
            for &member in subset.members() {
                participating[member as usize].push(at);
            }
        }

        Ok(Self {
            total,
            required,
            subsets,
            participating,
        })
    }

    /// N
    pub fn total(&self) -> usize {
        self.total
    }

    /// K
    pub fn required(&self) -> usize {
        self.required
    }

    /// C: number of K-subsets
    pub fn count(&self) -> usize {
        self.subsets.len()
    }

    /// Number of subsets each collection participates in: `C * K / N`
    pub fn per_collection(&self) -> usize {
        self.participating[0].len()
    }

    /// All subsets in canonical order
    pub fn subsets(&self) -> &[Subset] {
        &self.subsets
    }

    /// Subset at a canonical position
    pub fn subset(&self, at: usize) -> &Subset {
        &self.subsets[at]
    }

    /// Canonical positions of the subsets containing a collection
    pub fn participating(&self, index: u8) -> &[usize] {
        &self.participating[index as usize]
    }

    /// Rank of the subset with `id` within a collection's participating list
    ///
    /// This is the share offset for that subset inside the collection's
    /// record body.
    pub fn participation_rank(&self, index: u8, id: &str) -> Option<usize> {
        self.participating(index)
            .iter()
            .position(|&at| self.subsets[at].id() == id)
    }

    /// Canonical position of the subset with `id`, if present
    pub fn find(&self, id: &str) -> Option<usize> {
        // Canonical order is sorted by id.
        self.subsets
            .binary_search_by(|s| s.id().cmp(id))
            .ok()
    }
}

fn enumerate(start: usize, total: usize, want: usize, path: &mut Vec<u8>, out: &mut Vec<Subset>) {
    if path.len() == want {
        out.push(Subset::new(path.clone()));
        return;
    }
    for i in start..total {
        path.push(i as u8);
        enumerate(i + 1, total, want, path, out);
        path.pop();
    }
}

/// C(n, k) without overflow for n <= 26
pub fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: usize = 1;
    for i in 0..k {
        acc = acc * (n - i) / (i + 1);
    }
    acc
}
