use std::sync::atomic::{AtomicU64, Ordering};

const BITS: usize = 64;

/// Dense, fixed-capacity bit vector.
///
/// Backed by a `Vec<AtomicU64>` so that [`BitSet::set_sync`] can be used
/// from multiple threads without external locking, while [`BitSet::set_unsync`]
/// stays available for the common single-writer hot loop where the extra
/// atomic RMW would be pure overhead.
pub struct BitSet {
    words: Vec<AtomicU64>,
    capacity: usize,
}

impl BitSet {
    pub fn new(capacity: usize) -> Self {
        let word_count = capacity.div_ceil(BITS);
        let mut words = Vec::with_capacity(word_count);
        words.resize_with(word_count, || AtomicU64::new(0));
        Self { words, capacity }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Set bit `i`. Caller guarantees no concurrent writer touches the same
    /// word — this is the hot-loop variant used by single-threaded
    /// partitioner passes.
    #[inline]
    pub fn set_unsync(&self, i: usize) {
        debug_assert!(i < self.capacity);
        let (word, bit) = (i / BITS, i % BITS);
        // SAFETY: caller upholds the no-concurrent-writer contract; a plain
        // load-or-store is enough and avoids the atomic RMW instruction.
        let cell = &self.words[word];
        let prev = cell.load(Ordering::Relaxed);
        cell.store(prev | (1u64 << bit), Ordering::Relaxed);
    }

    /// Set bit `i`, safe for concurrent writers touching the same word.
    #[inline]
    pub fn set_sync(&self, i: usize) {
        debug_assert!(i < self.capacity);
        let (word, bit) = (i / BITS, i % BITS);
        self.words[word].fetch_or(1u64 << bit, Ordering::AcqRel);
    }

    #[inline]
    pub fn test(&self, i: usize) -> bool {
        debug_assert!(i < self.capacity);
        let (word, bit) = (i / BITS, i % BITS);
        (self.words[word].load(Ordering::Acquire) >> bit) & 1 == 1
    }

    #[inline]
    pub fn clear(&self, i: usize) {
        debug_assert!(i < self.capacity);
        let (word, bit) = (i / BITS, i % BITS);
        self.words[word].fetch_and(!(1u64 << bit), Ordering::AcqRel);
    }

    /// Clear every bit without deallocating the backing storage.
    pub fn clear_all(&self) {
        for word in &self.words {
            word.store(0, Ordering::Relaxed);
        }
    }

    pub fn popcount(&self) -> u64 {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Acquire).count_ones() as u64)
            .sum()
    }

    /// Iterate set bit indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, w)| {
            let mut bits = w.load(Ordering::Acquire);
            let base = wi * BITS;
            std::iter::from_fn(move || {
                if bits == 0 {
                    None
                } else {
                    let bit = bits.trailing_zeros() as usize;
                    bits &= bits - 1;
                    Some(base + bit)
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_test() {
        let bs = BitSet::new(200);
        bs.set_unsync(0);
        bs.set_unsync(63);
        bs.set_unsync(64);
        bs.set_unsync(199);

        assert!(bs.test(0));
        assert!(bs.test(63));
        assert!(bs.test(64));
        assert!(bs.test(199));
        assert!(!bs.test(1));
        assert!(!bs.test(65));
    }

    #[test]
    fn popcount_matches_test() {
        let bs = BitSet::new(1000);
        let set_indices = [3usize, 7, 64, 65, 512, 999];
        for &i in &set_indices {
            bs.set_sync(i);
        }

        let counted = (0..1000).filter(|&i| bs.test(i)).count() as u64;
        assert_eq!(bs.popcount(), set_indices.len() as u64);
        assert_eq!(bs.popcount(), counted);
    }

    #[test]
    fn iter_ascending() {
        let bs = BitSet::new(130);
        let set_indices = [1usize, 2, 64, 63, 129];
        for &i in &set_indices {
            bs.set_unsync(i);
        }
        let mut expected = set_indices.to_vec();
        expected.sort_unstable();
        assert_eq!(bs.iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn clear_unsets_bit() {
        let bs = BitSet::new(10);
        bs.set_unsync(5);
        assert!(bs.test(5));
        bs.clear(5);
        assert!(!bs.test(5));
        assert_eq!(bs.popcount(), 0);
    }

    #[test]
    fn set_sync_under_concurrent_writers() {
        use std::sync::Arc;
        let bs = Arc::new(BitSet::new(64));
        std::thread::scope(|s| {
            for t in 0..8 {
                let bs = Arc::clone(&bs);
                s.spawn(move || {
                    for i in (t..64).step_by(8) {
                        bs.set_sync(i);
                    }
                });
            }
        });
        assert_eq!(bs.popcount(), 64);
    }
}
