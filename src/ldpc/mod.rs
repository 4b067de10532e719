//! Quasi-cyclic LDPC codec
//!
//! A code is described by a lifting size Z and a block model matrix of
//! circulant shifts ([`QcCode`]). From that description:
//!
//! - [`CheckAdjacency`] expands the block matrix into per-check variable
//!   lists once; decoders share it read-only.
//! - [`LayeredDecoder`] runs layered min-sum decoding, storing each check's
//!   messages in compressed form (two minima, the argmin and a sign bitmap).
//! - [`QcEncoder`] computes parity for dual-diagonal codes by block
//!   rotations and XOR accumulation.
//! - [`check_syndrome`] validates hard decisions against the code.
//!
//! Sign convention throughout: negative LLR = bit 1.

mod check;
pub mod constants;
mod decode;
mod encode;
mod error;
mod geometry;
mod index;
mod metric;
mod rotate;
mod sign_map;
mod soft;
mod syndrome;

pub use check::{update_check, CheckCache};
pub use decode::{Arithmetic, DecodeOutcome, DecodeStatus, DecoderConfig, LayeredDecoder, Workspace};
pub use encode::{validate_encoder_input, QcEncoder};
pub use error::{CodeError, DecodeError, EncodeError};
pub use geometry::{BaseMatrix, CodeGeometry, QcCode};
pub use index::CheckAdjacency;
pub use metric::{FixedFormat, Metric, MinSumParams};
pub use rotate::{rotate_bits, rotate_words};
pub use sign_map::SignMap;
pub use soft::{SoftDecoder, SoftWorkspace};
pub use syndrome::{
    check_syndrome, hard_decision, hard_decision_into, hard_decision_packed, unsatisfied_checks,
    HardBits,
};
