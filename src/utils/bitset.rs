//! Dense bit sets keyed by register number.
//!
//! Liveness information arrives from the surrounding compiler as sets of
//! virtual register numbers, and the pressure tracker keeps per-register
//! "active" and "pinned" flags. Both are small dense integer domains, so a
//! word-packed bit vector is the natural representation.
//!
//! # Example
//!
//! ```rust
//! use gensched::utils::BitSet;
//!
//! let mut live_out = BitSet::new(64);
//! live_out.insert(3);
//! live_out.insert(17);
//!
//! assert!(live_out.contains(17));
//! assert_eq!(live_out.iter().collect::<Vec<_>>(), vec![3, 17]);
//! ```

/// A fixed-capacity bit vector indexed by register number.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct BitSet {
    words: Vec<u64>,
    len: usize,
}

impl BitSet {
    /// Creates an empty set able to hold indices `0..capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(64)],
            len: capacity,
        }
    }

    /// Creates a set of the given capacity containing `members`.
    ///
    /// Members outside the capacity are ignored; liveness producers size
    /// their sets generously and the scheduler only cares about registers
    /// the block can name.
    #[must_use]
    pub fn with_members(capacity: usize, members: impl IntoIterator<Item = usize>) -> Self {
        let mut set = Self::new(capacity);
        for member in members {
            if member < capacity {
                set.insert(member);
            }
        }
        set
    }

    /// Returns the capacity of this set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no bit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Sets the bit at `index`, returning `true` if it was previously clear.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn insert(&mut self, index: usize) -> bool {
        assert!(index < self.len, "register {index} outside set of {}", self.len);
        let mask = 1u64 << (index % 64);
        let word = &mut self.words[index / 64];
        let was_clear = *word & mask == 0;
        *word |= mask;
        was_clear
    }

    /// Clears the bit at `index`, returning `true` if it was previously set.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn remove(&mut self, index: usize) -> bool {
        assert!(index < self.len, "register {index} outside set of {}", self.len);
        let mask = 1u64 << (index % 64);
        let word = &mut self.words[index / 64];
        let was_set = *word & mask != 0;
        *word &= !mask;
        was_set
    }

    /// Returns `true` if the bit at `index` is set.
    ///
    /// Indices beyond the capacity are reported as absent rather than
    /// panicking, so callers can query with register numbers taken from
    /// unrelated register files.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        self.words[index / 64] & (1u64 << (index % 64)) != 0
    }

    /// Returns the number of set bits.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Adds every member of `other` to `self`, returning `true` on change.
    ///
    /// # Panics
    ///
    /// Panics if the capacities differ.
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

    /// Returns an iterator over set indices in ascending order.
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            set: self,
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

/// Iterator over the set bits of a [`BitSet`].
pub struct BitSetIter<'a> {
    set: &'a BitSet,
    word_idx: usize,
    current: u64,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some(self.word_idx * 64 + bit);
            }
            self.word_idx += 1;
            self.current = *self.set.words.get(self.word_idx)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove_report_change() {
        let mut set = BitSet::new(130);
        assert!(set.insert(129));
        assert!(!set.insert(129));
        assert!(set.contains(129));
        assert!(set.remove(129));
        assert!(!set.remove(129));
        assert!(set.is_empty());
    }

    #[test]
    fn test_contains_out_of_range_is_false() {
        let set = BitSet::with_members(8, [1, 2]);
        assert!(!set.contains(8));
        assert!(!set.contains(1000));
    }

    #[test]
    fn test_with_members_drops_out_of_range() {
        let set = BitSet::with_members(4, [0, 3, 4, 99]);
        assert_eq!(set.count(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn test_iter_crosses_word_boundaries() {
        let set = BitSet::with_members(200, [0, 63, 64, 127, 128, 199]);
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![0, 63, 64, 127, 128, 199]
        );
    }

    #[test]
    fn test_union_with() {
        let mut a = BitSet::with_members(70, [1, 65]);
        let b = BitSet::with_members(70, [2, 65]);
        assert!(a.union_with(&b));
        assert!(!a.union_with(&b));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 2, 65]);
    }

    #[test]
    fn test_empty_capacity() {
        let set = BitSet::new(0);
        assert!(set.is_empty());
        assert_eq!(set.iter().count(), 0);
        assert_eq!(format!("{set:?}"), "{}");
    }
}
