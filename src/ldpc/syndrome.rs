//! Hard decision and parity check evaluation
//!
//! Sign convention: a negative LLR decides bit 1, zero and positive decide 0.

use bitvec::prelude::*;

use super::index::CheckAdjacency;
use super::metric::Metric;

/// Read access to a hard-decision vector, unpacked or packed
pub trait HardBits {
    fn bit_count(&self) -> usize;
    fn bit(&self, index: usize) -> bool;
}

impl HardBits for [u8] {
    #[inline]
    fn bit_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn bit(&self, index: usize) -> bool {
        self[index] & 1 == 1
    }
}

impl HardBits for BitSlice<u8, Msb0> {
    #[inline]
    fn bit_count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn bit(&self, index: usize) -> bool {
        self[index]
    }
}

/// One byte per bit: 1 where the LLR is negative
pub fn hard_decision<T: Metric>(llr: &[T]) -> Vec<u8> {
    llr.iter().map(|x| x.is_negative_llr() as u8).collect()
}

pub fn hard_decision_into<T: Metric>(llr: &[T], out: &mut [u8]) {
    for (bit, x) in out.iter_mut().zip(llr) {
        *bit = x.is_negative_llr() as u8;
    }
}

/// Packed hard decision, first bit in the MSB of the first byte
///
/// The tail of the last byte is zero padded.
pub fn hard_decision_packed<T: Metric>(llr: &[T]) -> BitVec<u8, Msb0> {
    let mut bits: BitVec<u8, Msb0> = llr.iter().map(|x| x.is_negative_llr()).collect();
    bits.set_uninitialized(false);
    bits
}

/// XOR of the hard bits attached to check `m`
#[inline]
fn check_parity<B: HardBits + ?Sized>(adjacency: &CheckAdjacency, bits: &B, m: usize) -> bool {
    adjacency
        .neighbors(m)
        .iter()
        .fold(false, |acc, &n| acc ^ bits.bit(n as usize))
}

/// True when every check of the code is satisfied
///
/// Returns false for a vector of the wrong length instead of panicking.
pub fn check_syndrome<B: HardBits + ?Sized>(adjacency: &CheckAdjacency, bits: &B) -> bool {
    if bits.bit_count() != adjacency.num_variables() {
        return false;
    }
    (0..adjacency.num_checks()).all(|m| !check_parity(adjacency, bits, m))
}

/// Number of unsatisfied checks, 0 for a valid codeword
pub fn unsatisfied_checks<B: HardBits + ?Sized>(adjacency: &CheckAdjacency, bits: &B) -> usize {
    if bits.bit_count() != adjacency.num_variables() {
        return adjacency.num_checks();
    }
    (0..adjacency.num_checks())
        .filter(|&m| check_parity(adjacency, bits, m))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldpc::QcCode;

    fn small_adjacency() -> CheckAdjacency {
        let code = QcCode::new(2, &[[0, -1, 1, 0], [1, 0, -1, 0]]).unwrap();
        CheckAdjacency::build(&code).unwrap()
    }

    #[test]
    fn test_hard_decision_sign_convention() {
        let llr = [1.5f32, -0.1, 0.0, -7.0, 2.0];
        assert_eq!(hard_decision(&llr), vec![0, 1, 0, 1, 0]);

        let mut out = [9u8; 5];
        hard_decision_into(&llr, &mut out);
        assert_eq!(out, [0, 1, 0, 1, 0]);

        assert_eq!(hard_decision(&[-3i32, 3, 0]), vec![1, 0, 0]);
    }

    #[test]
    fn test_hard_decision_is_scale_invariant() {
        let llr = [0.3f32, -2.5, 4.0, -0.01, 1.0e-3];
        let scaled: Vec<f32> = llr.iter().map(|x| x * 2.0).collect();
        assert_eq!(hard_decision(&llr), hard_decision(&scaled));
    }

    #[test]
    fn test_packed_layout() {
        let llr = [-1.0f32, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, -1.0, -1.0, 1.0];
        let packed = hard_decision_packed(&llr);
        assert_eq!(packed.len(), 10);
        assert_eq!(packed.as_raw_slice(), &[0b1000_0001, 0b1000_0000]);
    }

    #[test]
    fn test_syndrome_of_codewords() {
        let adj = small_adjacency();
        assert!(check_syndrome(&adj, &[0u8; 8][..]));

        // single flipped bit breaks every check it touches
        let mut bits = [0u8; 8];
        bits[0] = 1;
        assert!(!check_syndrome(&adj, &bits[..]));
        assert_eq!(unsatisfied_checks(&adj, &bits[..]), 2);
    }

    #[test]
    fn test_packed_and_unpacked_agree() {
        let adj = small_adjacency();
        let llr = [1.0f32, -1.0, 1.0, 1.0, -1.0, 1.0, 1.0, 1.0];
        let unpacked = hard_decision(&llr);
        let packed = hard_decision_packed(&llr);
        assert_eq!(
            check_syndrome(&adj, &unpacked[..]),
            check_syndrome(&adj, packed.as_bitslice())
        );
        assert_eq!(
            unsatisfied_checks(&adj, &unpacked[..]),
            unsatisfied_checks(&adj, packed.as_bitslice())
        );
    }

    #[test]
    fn test_wrong_length_is_not_a_codeword() {
        let adj = small_adjacency();
        assert!(!check_syndrome(&adj, &[0u8; 7][..]));
        assert_eq!(unsatisfied_checks(&adj, &[0u8; 9][..]), 4);
    }
}
