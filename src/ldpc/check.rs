//! Compressed check node messages and the min-sum check update
//!
//! A min-sum check node sends the same magnitude to every neighbour except
//! the one that supplied the smallest input, which gets the second smallest.
//! Keeping the two minima, the position of the first one and one sign bit per
//! edge is therefore enough to take the check's previous contribution back
//! out of the beliefs, instead of storing `degree` full values per check.
//! The contribution removed is the unscaled stored minimum, so normalization
//! and offset only shape what enters the tier accumulators.

use super::metric::{Metric, MinSumParams};
use super::sign_map::SignMap;

/// Compressed state of one check node
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CheckCache<T> {
    /// Smallest extrinsic input magnitude
    pub min1: T,
    /// Second smallest extrinsic input magnitude
    pub min2: T,
    /// Edge position that supplied `min1`
    pub argmin: usize,
    /// Sign of the message last sent over each edge
    pub signs: SignMap,
}

impl<T: Metric> CheckCache<T> {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Contribution of edge `i` removed from the belief on the next pass
    ///
    /// This is the stored minimum with the sent sign. Normalization and
    /// offset are not reapplied.
    #[inline]
    pub fn sent_message(&self, i: usize) -> T {
        let a = if i == self.argmin { self.min2 } else { self.min1 };
        T::with_sign(a, self.signs.get(i))
    }
}

/// Run one min-sum update of a single check node
///
/// Reads the current beliefs of the check's neighbours, removes the check's
/// own previous contribution (when `reconstruct` is set, i.e. from the second
/// iteration on), refreshes the compressed cache and writes the new outgoing
/// messages into the tier accumulator at the neighbours' positions.
///
/// # Arguments
/// * `cache` - Compressed state of this check, updated in place
/// * `neighbors` - Variable nodes attached to this check
/// * `belief` - Current total beliefs, indexed by variable node
/// * `tier` - Accumulator of the block row this check belongs to
/// * `reconstruct` - Whether `cache` holds messages from a previous pass
/// * `params` - Normalization and offset
pub fn update_check<T: Metric>(
    cache: &mut CheckCache<T>,
    neighbors: &[u32],
    belief: &[T],
    tier: &mut [T],
    reconstruct: bool,
    params: &MinSumParams,
) {
    let mut min1 = T::max_value();
    let mut min2 = T::max_value();
    let mut argmin = 0usize;
    let mut parity = false;

    // Pass 1: extrinsic inputs, two minima and the sign parity
    for (i, &n) in neighbors.iter().enumerate() {
        let n = n as usize;
        let z_mn = if reconstruct {
            belief[n].remove(cache.sent_message(i))
        } else {
            belief[n]
        };

        let negative = z_mn.is_negative_llr();
        let a = z_mn.magnitude();

        cache.signs.set(i, negative);
        parity ^= negative;

        if a <= min1 {
            min2 = min1;
            min1 = a;
            argmin = i;
        } else if a < min2 {
            min2 = a;
        }
    }

    cache.min1 = min1;
    cache.min2 = min2;
    cache.argmin = argmin;

    // Pass 2: outgoing messages. The parity includes the edge's own sign,
    // XOR-ing it back in leaves the product of the other signs.
    for (i, &n) in neighbors.iter().enumerate() {
        let a = if i == argmin { min2 } else { min1 };
        let negative = cache.signs.get(i) ^ parity;

        let message = T::with_sign(T::scale_magnitude(a, params), negative);

        cache.signs.set(i, message.is_negative_llr());
        tier[n as usize] = message;
    }
}
