//! Channel simulation for benchmarks and tests

mod noise;

pub use noise::{noise_sigma, perfect_llr, random_bits, AwgnChannel, ChannelError};
