//! BPSK over additive white Gaussian noise
//!
//! Bit 0 is sent as +1, bit 1 as -1. The receiver's channel LLR is
//! `2 y / sigma^2`, so negative LLRs favour bit 1 like everywhere else in
//! the crate.

use rand::Rng;
use rand_distr::{Distribution, Normal, NormalError};
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
pub enum ChannelError {
    #[snafu(display("invalid noise standard deviation {sigma}"))]
    InvalidSigma { sigma: f32, source: NormalError },
}

/// Noise standard deviation for a given Eb/N0 and code rate
pub fn noise_sigma(ebn0_db: f32, rate: f64) -> f32 {
    let ebn0 = 10.0_f32.powf(ebn0_db / 10.0);
    (1.0 / (2.0 * rate as f32 * ebn0)).sqrt()
}

/// Uniformly random bits, one byte per bit
pub fn random_bits<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Vec<u8> {
    (0..len).map(|_| rng.random_range(0..=1u8)).collect()
}

/// Memoryless BPSK/AWGN channel
#[derive(Debug, Clone, Copy)]
pub struct AwgnChannel {
    normal: Normal<f32>,
    sigma: f32,
}

impl AwgnChannel {
    pub fn new(sigma: f32) -> Result<Self, ChannelError> {
        let normal = Normal::new(0.0, sigma).context(InvalidSigmaSnafu { sigma })?;
        Ok(Self { normal, sigma })
    }

    /// Channel for a code of rate `rate` operated at `ebn0_db`
    pub fn from_ebn0(ebn0_db: f32, rate: f64) -> Result<Self, ChannelError> {
        Self::new(noise_sigma(ebn0_db, rate))
    }

    pub fn sigma(&self) -> f32 {
        self.sigma
    }

    /// Transmit `bits` and return the received channel LLRs
    pub fn transmit<R: Rng + ?Sized>(&self, bits: &[u8], rng: &mut R) -> Vec<f32> {
        let mut llr = vec![0.0; bits.len()];
        self.transmit_into(bits, &mut llr, rng);
        llr
    }

    pub fn transmit_into<R: Rng + ?Sized>(&self, bits: &[u8], llr: &mut [f32], rng: &mut R) {
        let scale = 2.0 / (self.sigma * self.sigma);
        for (out, &bit) in llr.iter_mut().zip(bits) {
            let symbol = if bit == 0 { 1.0 } else { -1.0 };
            *out = scale * (symbol + self.normal.sample(rng));
        }
    }
}

/// Noiseless LLRs of magnitude `magnitude` matching `bits`
pub fn perfect_llr(bits: &[u8], magnitude: f32) -> Vec<f32> {
    bits.iter()
        .map(|&b| if b == 0 { magnitude } else { -magnitude })
        .collect()
}
