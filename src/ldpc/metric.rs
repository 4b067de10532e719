//! Numeric representations for decoder messages
//!
//! The layered decoder runs the same control flow for floating point and
//! fixed point LLRs. Only the per-message arithmetic differs:
//!
//! - `f32`: outgoing magnitudes are normalized and offset,
//!   `lambda * max(a - beta, 0)`.
//! - `i32`: magnitudes pass through unmodified, belief accumulation saturates
//!   instead of wrapping.

use std::fmt::Debug;

use num::{Bounded, Signed, Zero};

/// Normalization and offset of the min-sum check update
///
/// Ignored by the fixed point representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinSumParams {
    /// Multiplicative normalization (lambda), 1.0 disables it
    pub normalization: f32,
    /// Subtractive offset (beta), clamped so magnitudes never go negative
    pub offset: f32,
}

impl Default for MinSumParams {
    fn default() -> Self {
        Self {
            normalization: 1.0,
            offset: 0.0,
        }
    }
}

/// LLR value type the decoder can run on
pub trait Metric: Copy + PartialOrd + Default + Debug + Send + Sync + Signed + Bounded + 'static {
    /// Sign bit convention shared by the whole crate: negative LLR = bit 1
    #[inline]
    fn is_negative_llr(self) -> bool {
        self < Self::zero()
    }

    /// Signed value with the given magnitude
    #[inline]
    fn with_sign(magnitude: Self, negative: bool) -> Self {
        if negative {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Absolute value, saturating where the type is asymmetric
    fn magnitude(self) -> Self;

    /// Magnitude of the message a check sends for an extrinsic minimum `a`
    fn scale_magnitude(a: Self, params: &MinSumParams) -> Self;

    /// Belief accumulation
    fn accumulate(self, rhs: Self) -> Self;

    /// Removal of a previously accumulated message
    fn remove(self, rhs: Self) -> Self;
}

impl Metric for f32 {
    #[inline]
    fn magnitude(self) -> Self {
        self.abs()
    }

    #[inline]
    fn scale_magnitude(a: Self, params: &MinSumParams) -> Self {
        params.normalization * (a - params.offset).max(0.0)
    }

    #[inline]
    fn accumulate(self, rhs: Self) -> Self {
        self + rhs
    }

    #[inline]
    fn remove(self, rhs: Self) -> Self {
        self - rhs
    }
}

impl Metric for i32 {
    #[inline]
    fn magnitude(self) -> Self {
        self.saturating_abs()
    }

    #[inline]
    fn scale_magnitude(a: Self, _params: &MinSumParams) -> Self {
        a
    }

    #[inline]
    fn accumulate(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }

    #[inline]
    fn remove(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }
}

/// Conversion between floating point channel LLRs and fixed point levels
///
/// Channel values are clipped to `[-range, range]` and mapped linearly onto
/// `[-levels, levels]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedFormat {
    /// Largest representable LLR magnitude
    pub range: f32,
    /// Integer level corresponding to `range`
    pub levels: i32,
}

impl Default for FixedFormat {
    fn default() -> Self {
        Self {
            range: 20.0,
            levels: 1023,
        }
    }
}

impl FixedFormat {
    /// Quantize one LLR
    pub fn quantize(&self, llr: f32) -> i32 {
        let clipped = llr.clamp(-self.range, self.range);
        (clipped * self.levels as f32 / self.range).round() as i32
    }

    /// Convert a fixed point belief back to the LLR domain
    pub fn dequantize(&self, value: i32) -> f32 {
        value as f32 * self.range / self.levels as f32
    }

    pub fn quantize_into(&self, llr: &[f32], out: &mut [i32]) {
        for (q, &x) in out.iter_mut().zip(llr) {
            *q = self.quantize(x);
        }
    }

    pub fn dequantize_into(&self, values: &[i32], out: &mut [f32]) {
        for (x, &q) in out.iter_mut().zip(values) {
            *x = self.dequantize(q);
        }
    }
}
