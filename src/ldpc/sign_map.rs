//! Per-check sign bitmap
//!
//! One bit per edge of a check node, bit `i` holding the sign of the message
//! exchanged over the check's `i`-th edge (1 = negative).

use bitvec::prelude::*;

/// Fixed-width sign bitset for a single check node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignMap(BitArray<[u64; 1], Lsb0>);

impl SignMap {
    /// Number of edges a single check can track
    pub const WIDTH: usize = 64;

    /// Sign bit of edge `index`
    ///
    /// Panics if `index >= SignMap::WIDTH`.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        self.0[index]
    }

    /// Store the sign bit of edge `index`
    ///
    /// Panics if `index >= SignMap::WIDTH`.
    #[inline]
    pub fn set(&mut self, index: usize, negative: bool) {
        self.0.set(index, negative);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut signs = SignMap::default();
        signs.set(0, true);
        signs.set(5, true);
        signs.set(63, true);
        assert!(signs.get(0));
        assert!(!signs.get(1));
        assert!(signs.get(5));
        assert!(signs.get(63));

        signs.set(5, false);
        assert!(!signs.get(5));
    }

    #[test]
    fn test_overwrite_every_edge() {
        let mut signs = SignMap::default();
        for i in 0..SignMap::WIDTH {
            signs.set(i, true);
        }
        assert!((0..SignMap::WIDTH).all(|i| signs.get(i)));
        for i in 0..SignMap::WIDTH {
            signs.set(i, false);
        }
        assert_eq!(signs, SignMap::default());
    }

    #[test]
    #[should_panic]
    fn test_index_past_width_panics() {
        let mut signs = SignMap::default();
        signs.set(SignMap::WIDTH, true);
    }
}
