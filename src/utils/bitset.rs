//! A fixed-capacity bit vector.
//!
//! Register ids are small dense integers, so the sets computed during a
//! history scan (the changing registers, the registers defined by one
//! instruction) are stored as one bit per register instead of a hashed set.
//!
//! # Example
//!
//! ```rust,ignore
//! use dbghistory::utils::BitSet;
//!
//! let mut set = BitSet::new(100);
//! assert!(set.insert(7));
//! assert!(!set.insert(7));
//! assert_eq!(set.iter().collect::<Vec<_>>(), vec![7]);
//! ```

const WORD_BITS: usize = 64;

/// A bit vector holding indices in `0..len`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitSet {
    /// The bits, stored as a vector of words.
    words: Vec<u64>,
    /// The number of addressable bits.
    len: usize,
}

impl BitSet {
    /// Creates a new empty bit set able to hold indices in `0..capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            len: capacity,
        }
    }

    /// Returns the capacity of this bit set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no bit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Sets the bit at `index`, returning `true` if it was not set before.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn insert(&mut self, index: usize) -> bool {
        assert!(index < self.len, "index {index} out of bounds ({})", self.len);
        let mask = 1u64 << (index % WORD_BITS);
        let word = &mut self.words[index / WORD_BITS];
        let fresh = *word & mask == 0;
        *word |= mask;
        fresh
    }

    /// Clears the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn remove(&mut self, index: usize) {
        assert!(index < self.len, "index {index} out of bounds ({})", self.len);
        self.words[index / WORD_BITS] &= !(1u64 << (index % WORD_BITS));
    }

    /// Returns `true` if the bit at `index` is set. Indices past the capacity
    /// are reported as not set.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        index < self.len && self.words[index / WORD_BITS] & (1u64 << (index % WORD_BITS)) != 0
    }

    /// Returns the number of bits set.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Clears all bits.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Adds every bit of `other` to `self`, returning `true` if `self` changed.
    pub fn union_with(&mut self, other: &Self) -> bool {
        assert_eq!(self.len, other.len, "bit sets must have same length");
        let mut changed = false;
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            let old = *a;
            *a |= *b;
            changed |= old != *a;
        }
        changed
    }

    /// Returns an iterator over the set indices in ascending order.
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            words: &self.words,
            word_idx: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }
}

impl std::fmt::Debug for BitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Iterator over the set bits in a [`BitSet`].
pub struct BitSetIter<'a> {
    words: &'a [u64],
    word_idx: usize,
    /// Remaining bits of the word at `word_idx`.
    current: u64,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some(self.word_idx * WORD_BITS + bit);
            }
            self.word_idx += 1;
            self.current = *self.words.get(self.word_idx)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitset_insert_reports_fresh() {
        let mut bs = BitSet::new(10);
        assert!(bs.is_empty());
        assert!(bs.insert(3));
        assert!(!bs.insert(3));
        assert_eq!(bs.count(), 1);
        assert!(bs.contains(3));
        assert!(!bs.contains(4));
    }

    #[test]
    fn test_bitset_contains_past_capacity() {
        let bs = BitSet::new(10);
        assert!(!bs.contains(10));
        assert!(!bs.contains(1000));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_bitset_insert_past_capacity() {
        let mut bs = BitSet::new(10);
        bs.insert(10);
    }

    #[test]
    fn test_bitset_iter_crosses_words() {
        let mut bs = BitSet::new(200);
        for i in [0, 63, 64, 130, 199] {
            bs.insert(i);
        }
        assert_eq!(bs.iter().collect::<Vec<_>>(), vec![0, 63, 64, 130, 199]);
    }

    #[test]
    fn test_bitset_empty_capacity() {
        let bs = BitSet::new(0);
        assert!(bs.is_empty());
        assert_eq!(bs.iter().count(), 0);
    }

    #[test]
    fn test_bitset_union_and_remove() {
        let mut a = BitSet::new(70);
        let mut b = BitSet::new(70);
        a.insert(1);
        b.insert(1);
        b.insert(65);

        assert!(a.union_with(&b));
        assert!(!a.union_with(&b));
        assert_eq!(format!("{a:?}"), "{1, 65}");

        a.remove(1);
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![65]);
        a.clear();
        assert!(a.is_empty());
    }
}
