//! Systematic encoder for dual-diagonal QC-LDPC codes
//!
//! The parity part of the base matrix is assumed to have the IEEE 802.11n /
//! 802.16e shape: a first parity column holding the same shift in the first
//! and last block rows plus one unpaired shift in a middle row, followed by
//! a staircase of identity blocks. With `S_i` the XOR of the rotated data
//! blocks of block row `i`:
//!
//! - `v0 = P^-1 * (S_0 + ... + S_{MB-1})` where `P` is the unpaired circulant
//! - `v1 = S_0 + H(0, KB) * v0`
//! - `v{i+1} = v_i + S_i + H(i, KB) * v0` for the middle rows
//!
//! The codeword is the data followed by `v0 .. v{MB-1}`.

use rayon::prelude::*;
use snafu::ensure;

use super::error::*;
use super::geometry::{BaseMatrix, CodeGeometry, QcCode};
use super::rotate::{rotate_words, xor_rotated_bits};

/// Quasi-cyclic back-substitution encoder
#[derive(Debug, Clone)]
pub struct QcEncoder {
    geometry: CodeGeometry,
    base: BaseMatrix,
    /// Inverse rotation of the unpaired shift of the first parity column
    inverse_shift: usize,
    dual_diagonal: bool,
}

impl QcEncoder {
    /// Prepare an encoder for `code`
    ///
    /// Locates the unpaired shift of the first parity column once. Codes
    /// whose parity part is not exactly dual-diagonal are accepted with a
    /// warning, and their output is not guaranteed to be a codeword.
    ///
    /// # Errors
    /// * `CodeError::EncoderStructure` - fewer than two block rows, or more
    ///   than one middle block row populated in the first parity column
    pub fn new(code: &QcCode) -> Result<Self, CodeError> {
        let geometry = *code.geometry();
        let base = code.base().clone();
        let mb = geometry.mb();
        let kb = geometry.kb();
        let z = geometry.z();

        ensure!(
            mb >= 2,
            EncoderStructureSnafu { reason: "at least two block rows are required" }
        );

        let middle: Vec<usize> = (1..mb - 1).filter_map(|i| base.shift(i, kb)).collect();
        ensure!(
            middle.len() <= 1,
            EncoderStructureSnafu { reason: "first parity column has more than one unpaired shift" }
        );
        let unpaired = middle.first().copied().unwrap_or(0);
        let inverse_shift = (z - unpaired) % z;

        let dual_diagonal = middle.len() == 1 && Self::is_dual_diagonal(&base, mb, kb);
        if !dual_diagonal {
            tracing::warn!(mb, kb, "parity part is not dual-diagonal, encoded words may not satisfy every check");
        }

        tracing::debug!(
            n = geometry.n(),
            k = geometry.k(),
            z,
            unpaired,
            "initialised encoder"
        );

        Ok(Self {
            geometry,
            base,
            inverse_shift,
            dual_diagonal,
        })
    }

    fn is_dual_diagonal(base: &BaseMatrix, mb: usize, kb: usize) -> bool {
        let first = base.shift(0, kb);
        if first.is_none() || first != base.shift(mb - 1, kb) {
            return false;
        }

        // staircase: column kb + c has identities in rows c - 1 and c
        (1..mb).all(|c| {
            (0..mb).all(|r| {
                let expected = if r + 1 == c || r == c { Some(0) } else { None };
                base.shift(r, kb + c) == expected
            })
        })
    }

    pub fn geometry(&self) -> &CodeGeometry {
        &self.geometry
    }

    /// Whether the parity part has the structure the recursion assumes
    pub fn is_dual_diagonal_code(&self) -> bool {
        self.dual_diagonal
    }

    /// Compute the M parity bits of K data bits, one byte per bit
    pub fn encode(&self, data: &[u8]) -> Result<Vec<u8>, EncodeError> {
        let mut parity = vec![0u8; self.geometry.m()];
        self.encode_into(data, &mut parity)?;
        Ok(parity)
    }

    /// Array form encoding into a caller supplied buffer
    ///
    /// # Errors
    /// * `EncodeError::BufferLength` - `data` is not K or `parity` not M long
    /// * `EncodeError::NonBinaryInput` - a data value other than 0 or 1
    pub fn encode_into(&self, data: &[u8], parity: &mut [u8]) -> Result<(), EncodeError> {
        let k = self.geometry.k();
        let m = self.geometry.m();
        ensure!(data.len() == k, BufferLengthSnafu { expected: k, found: data.len() });
        ensure!(parity.len() == m, BufferLengthSnafu { expected: m, found: parity.len() });
        if let Some((index, &value)) = data.iter().enumerate().find(|&(_, &b)| b > 1) {
            return NonBinaryInputSnafu { index, value }.fail();
        }

        self.encode_blocks(data, parity, self.geometry.z(), xor_rotated_bits);
        Ok(())
    }

    /// Packed form: K/8 data bytes in, M/8 parity bytes out, MSB first
    ///
    /// Every byte is valid input, so no binary check is made.
    ///
    /// # Errors
    /// * `EncodeError::PackedUnaligned` - Z is not a multiple of 8
    /// * `EncodeError::BufferLength` - `data` is not K/8 bytes long
    pub fn encode_packed(&self, data: &[u8]) -> Result<Vec<u8>, EncodeError> {
        let z = self.geometry.z();
        ensure!(z % 8 == 0, PackedUnalignedSnafu { z });
        let k_bytes = self.geometry.k() / 8;
        ensure!(
            data.len() == k_bytes,
            BufferLengthSnafu { expected: k_bytes, found: data.len() }
        );

        let zw = z / 8;
        let mut parity = vec![0u8; self.geometry.m() / 8];
        let mut rotated = vec![0u8; zw];
        self.encode_blocks(data, &mut parity, zw, |src: &[u8], acc: &mut [u8], shift| {
            rotate_words(src, &mut rotated, shift, z);
            for (a, r) in acc.iter_mut().zip(&rotated) {
                *a ^= r;
            }
        });
        Ok(parity)
    }

    /// Data bits followed by parity bits
    pub fn encode_codeword(&self, data: &[u8]) -> Result<Vec<u8>, EncodeError> {
        let mut codeword = vec![0u8; self.geometry.n()];
        let (systematic, parity) = codeword.split_at_mut(self.geometry.k());
        self.encode_into(data, parity)?;
        systematic.copy_from_slice(data);
        Ok(codeword)
    }

    /// Encode `channels` data words laid out back to back (K bits each)
    ///
    /// Returns the parity words back to back (M bits each). Channels are
    /// encoded in parallel. A `NonBinaryInput` index points into `data`.
    pub fn encode_batch(&self, data: &[u8], channels: usize) -> Result<Vec<u8>, EncodeError> {
        let k = self.geometry.k();
        let m = self.geometry.m();
        ensure!(
            data.len() == k * channels,
            BufferLengthSnafu { expected: k * channels, found: data.len() }
        );

        let mut parity = vec![0u8; m * channels];
        parity
            .par_chunks_mut(m)
            .zip(data.par_chunks(k))
            .enumerate()
            .try_for_each(|(c, (p, d))| {
                self.encode_into(d, p).map_err(|e| match e {
                    EncodeError::NonBinaryInput { index, value } => {
                        EncodeError::NonBinaryInput { index: c * k + index, value }
                    }
                    other => other,
                })
            })?;
        Ok(parity)
    }

    /// Shared recursion over blocks of `block` elements
    ///
    /// `xor_rotated(src, acc, s)` must XOR the block `src` rotated by `s`
    /// into `acc`.
    fn encode_blocks<F>(&self, data: &[u8], parity: &mut [u8], block: usize, mut xor_rotated: F)
    where
        F: FnMut(&[u8], &mut [u8], usize),
    {
        let mb = self.geometry.mb();
        let kb = self.geometry.kb();

        let mut sums = vec![0u8; mb * block];
        for (i, sum) in sums.chunks_exact_mut(block).enumerate() {
            for (j, data_block) in data.chunks_exact(block).take(kb).enumerate() {
                if let Some(shift) = self.base.shift(i, j) {
                    xor_rotated(data_block, sum, shift);
                }
            }
        }

        let mut total = vec![0u8; block];
        for sum in sums.chunks_exact(block) {
            xor_into(&mut total, sum);
        }

        let (v0, rest) = parity.split_at_mut(block);
        v0.fill(0);
        xor_rotated(&total, v0, self.inverse_shift);

        let mut running = vec![0u8; block];
        for (i, out) in rest.chunks_exact_mut(block).enumerate() {
            xor_into(&mut running, &sums[i * block..(i + 1) * block]);
            if let Some(shift) = self.base.shift(i, kb) {
                xor_rotated(v0, &mut running, shift);
            }
            out.copy_from_slice(&running);
        }
    }
}

fn xor_into(acc: &mut [u8], src: &[u8]) {
    for (a, s) in acc.iter_mut().zip(src) {
        *a ^= s;
    }
}

/// True when `bits` holds `rows * cols` values, all 0 or 1
pub fn validate_encoder_input(bits: &[u8], rows: usize, cols: usize) -> bool {
    bits.len() == rows * cols && bits.iter().all(|&b| b <= 1)
}
