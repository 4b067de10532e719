//! QC-LDPC forward error correction
//!
//! Encoder and layered min-sum decoder for quasi-cyclic LDPC codes described
//! by a block model matrix, plus batch decoding across worker threads.

pub mod batch;
pub mod ldpc;
pub mod simulation;
pub mod tracing_init;

pub use batch::{BatchConfig, BatchDecoder, BatchError, BatchOutput, HardOutput, WorkerPool};
pub use ldpc::{
    check_syndrome, hard_decision, CheckAdjacency, CodeError, DecodeError, DecodeStatus, DecoderConfig,
    EncodeError, LayeredDecoder, QcCode, QcEncoder, SoftDecoder,
};
