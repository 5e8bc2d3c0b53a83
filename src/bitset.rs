//! Simple BitSet implementation backed by a Vec<u64>.
//! Used as the per-entity pool membership mask: bit `n` is set while pool `n`
//! holds a component for the entity.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    /// Create a new BitSet capable of holding at least `capacity` bits.
    pub fn with_capacity(capacity: usize) -> Self {
        let num_words = capacity.div_ceil(64);
        Self {
            words: vec![0; num_words],
        }
    }

    /// Set the bit at `index` to true.
    /// Resizes automatically if index is out of bounds.
    pub fn set(&mut self, index: usize) {
        let (word_idx, bit_idx) = (index / 64, index % 64);
        if word_idx >= self.words.len() {
            self.words.resize(word_idx + 1, 0);
        }
        self.words[word_idx] |= 1 << bit_idx;
    }

    /// Clear the bit at `index`. Out of range is a no-op.
    pub fn remove(&mut self, index: usize) {
        let (word_idx, bit_idx) = (index / 64, index % 64);
        if let Some(word) = self.words.get_mut(word_idx) {
            *word &= !(1 << bit_idx);
        }
    }

    /// Check if the bit at `index` is set.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        let (word_idx, bit_idx) = (index / 64, index % 64);
        match self.words.get(word_idx) {
            Some(word) => (word & (1 << bit_idx)) != 0,
            None => false,
        }
    }

    /// True when no bit is set
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Returns iterator over indices of set bits
    pub fn ones(&self) -> OnesIter<'_> {
        OnesIter {
            bitset: self,
            word_idx: 0,
            current_word: self.words.first().copied().unwrap_or(0),
        }
    }
}

pub struct OnesIter<'a> {
    bitset: &'a BitSet,
    word_idx: usize,
    current_word: u64,
}

impl<'a> Iterator for OnesIter<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let trailing = self.current_word.trailing_zeros();
                self.current_word &= !(1 << trailing); // Clear the bit we just found
                return Some(self.word_idx * 64 + trailing as usize);
            }

            self.word_idx += 1;
            if self.word_idx >= self.bitset.words.len() {
                return None;
            }
            self.current_word = self.bitset.words[self.word_idx];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_remove_contains() {
        let mut bits = BitSet::with_capacity(8);
        bits.set(3);
        bits.set(130);
        assert!(bits.contains(3));
        assert!(bits.contains(130));
        assert!(!bits.contains(4));
        assert!(!bits.contains(1000));

        bits.remove(3);
        assert!(!bits.contains(3));
        bits.remove(5000);
        assert!(!bits.is_empty());

        bits.remove(130);
        assert!(bits.is_empty());
    }

    #[test]
    fn test_ones_spans_words() {
        let mut bits = BitSet::default();
        for i in [0, 63, 64, 200] {
            bits.set(i);
        }
        assert_eq!(bits.ones().collect::<Vec<_>>(), vec![0, 63, 64, 200]);
    }
}
