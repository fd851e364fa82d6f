//! A set-of-indices abstraction over the cells of a [`crate::raster::SurfaceRaster`],
//! with two concrete backings treated uniformly by the coverage selector.
//!
//! Per-candidate visible sets are typically a small fraction of the frame
//! ([`CellSet::Sparse`], a hash set); the running `covered` accumulator in
//! the greedy selector grows to cover most of the frame and is cheaper as
//! a dense bitset ([`CellSet::Dense`]). Both sides implement the same
//! `{contains, difference_size, union_into}` interface named in the
//! re-architecture notes.

use std::collections::HashSet;

/// A dense bitset over `rows * cols` cells, packed 64 bits per word.
#[derive(Debug, Clone)]
pub struct BitSet {
    words: Vec<u64>,
    len: usize,
}

impl BitSet {
    pub fn new(len: usize) -> BitSet {
        BitSet {
            words: vec![0u64; len.div_ceil(64)],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        let word = self.words[index / 64];
        (word >> (index % 64)) & 1 == 1
    }

    pub fn insert(&mut self, index: usize) {
        if index >= self.len {
            return;
        }
        self.words[index / 64] |= 1u64 << (index % 64);
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Number of set bits in `other` that are NOT set in `self`.
    pub fn difference_size(&self, other: &CellSet) -> usize {
        match other {
            CellSet::Sparse(set) => set.iter().filter(|&&i| !self.contains(i)).count(),
            CellSet::Dense(bits) => {
                debug_assert_eq!(self.words.len(), bits.words.len());
                self.words
                    .iter()
                    .zip(bits.words.iter())
                    .map(|(&a, &b)| (!a & b).count_ones() as usize)
                    .sum()
            }
        }
    }

    /// Sets every bit present in `other`.
    pub fn union_into(&mut self, other: &CellSet) {
        match other {
            CellSet::Sparse(set) => {
                for &i in set {
                    self.insert(i);
                }
            }
            CellSet::Dense(bits) => {
                debug_assert_eq!(self.words.len(), bits.words.len());
                for (a, &b) in self.words.iter_mut().zip(bits.words.iter()) {
                    *a |= b;
                }
            }
        }
    }
}

/// A per-candidate visible-cell set, backed by whichever representation is
/// cheaper at construction time. The viewshed engine always produces
/// `Sparse` (candidate visible sets are a small fraction of the frame);
/// `Dense` exists for the selector's running `covered` accumulator.
#[derive(Debug, Clone)]
pub enum CellSet {
    Sparse(HashSet<usize>),
    Dense(BitSet),
}

impl CellSet {
    pub fn sparse() -> CellSet {
        CellSet::Sparse(HashSet::new())
    }

    pub fn insert(&mut self, index: usize) {
        match self {
            CellSet::Sparse(set) => {
                set.insert(index);
            }
            CellSet::Dense(bits) => bits.insert(index),
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        match self {
            CellSet::Sparse(set) => set.contains(&index),
            CellSet::Dense(bits) => bits.contains(index),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CellSet::Sparse(set) => set.len(),
            CellSet::Dense(bits) => bits.count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        match self {
            CellSet::Sparse(set) => Box::new(set.iter().copied()),
            CellSet::Dense(bits) => Box::new((0..bits.len()).filter(move |&i| bits.contains(i))),
        }
    }
}
