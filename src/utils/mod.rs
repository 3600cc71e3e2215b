//! Generic containers shared by the analysis modules.

mod bitset;

pub use bitset::{BitSet, BitSetIter};
