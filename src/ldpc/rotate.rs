//! Circulant rotation of Z-bit blocks
//!
//! Multiplying a Z-bit block by the identity matrix cyclically shifted by `s`
//! rotates it: `dst[i] = src[(i + s) mod Z]`. The array form works on one
//! byte per bit, the packed form on MSB-first bytes. Both produce the same
//! bits for the same shift.

/// Rotate an unpacked block, `dst[i] = src[(i + shift) mod Z]`
pub fn rotate_bits(src: &[u8], dst: &mut [u8], shift: usize) {
    let z = src.len();
    debug_assert_eq!(dst.len(), z);
    let s = shift % z;
    dst[..z - s].copy_from_slice(&src[s..]);
    dst[z - s..].copy_from_slice(&src[..s]);
}

/// Rotate a packed block of `z` bits stored MSB first in `z / 8` bytes
///
/// Same bit mapping as [`rotate_bits`]. Implemented as a right rotation by
/// `r = (Z - s) mod Z`: whole bytes move by `r / 8`, the remaining `r % 8`
/// bits carry across byte boundaries.
pub fn rotate_words(src: &[u8], dst: &mut [u8], shift: usize, z: usize) {
    debug_assert_eq!(z % 8, 0);
    let zw = z / 8;
    debug_assert_eq!(src.len(), zw);
    debug_assert_eq!(dst.len(), zw);

    let r = (z - shift % z) % z;
    let word_shift = r / 8;
    let bit_shift = r % 8;

    if bit_shift == 0 {
        for (i, &byte) in src.iter().enumerate() {
            dst[(i + word_shift) % zw] = byte;
        }
        return;
    }

    let mut prev = src[zw - 1];
    for (i, &cur) in src.iter().enumerate() {
        dst[(i + word_shift) % zw] = (prev << (8 - bit_shift)) | (cur >> bit_shift);
        prev = cur;
    }
}

/// XOR a rotated unpacked block into an accumulator
pub(crate) fn xor_rotated_bits(src: &[u8], acc: &mut [u8], shift: usize) {
    let z = src.len();
    for (i, a) in acc.iter_mut().enumerate() {
        *a ^= src[(i + shift) % z];
    }
}
