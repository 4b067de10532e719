//! Decoder with the numeric representation chosen at run time
//!
//! Callers always hand in and get back `f32` LLRs. In fixed point mode the
//! channel values are quantized on the way in and the posterior converted
//! back on the way out.

use std::sync::Arc;

use snafu::ensure;

use super::decode::*;
use super::error::*;
use super::geometry::QcCode;
use super::index::CheckAdjacency;
use super::metric::FixedFormat;

#[derive(Debug, Clone)]
enum Backend {
    Float(LayeredDecoder<f32>),
    Fixed(LayeredDecoder<i32>, FixedFormat),
}

/// Workspace matching a [`SoftDecoder`]
#[derive(Debug, Clone)]
pub enum SoftWorkspace {
    Float(Workspace<f32>),
    Fixed {
        ws: Workspace<i32>,
        llr: Vec<i32>,
        posterior: Vec<i32>,
    },
}

impl SoftWorkspace {
    pub fn hard_bits(&self) -> &[u8] {
        match self {
            SoftWorkspace::Float(ws) => ws.hard_bits(),
            SoftWorkspace::Fixed { ws, .. } => ws.hard_bits(),
        }
    }
}

/// Layered decoder whose arithmetic follows `DecoderConfig::arithmetic`
#[derive(Debug, Clone)]
pub struct SoftDecoder {
    backend: Backend,
}

impl SoftDecoder {
    pub fn new(code: &QcCode, config: &DecoderConfig) -> Result<Self, CodeError> {
        let adjacency = Arc::new(CheckAdjacency::build(code)?);
        Self::with_adjacency(code, config, adjacency)
    }

    pub fn with_adjacency(
        code: &QcCode,
        config: &DecoderConfig,
        adjacency: Arc<CheckAdjacency>,
    ) -> Result<Self, CodeError> {
        let backend = match config.arithmetic {
            Arithmetic::Float => Backend::Float(LayeredDecoder::with_adjacency(code, config, adjacency)?),
            Arithmetic::Fixed(format) => {
                Backend::Fixed(LayeredDecoder::with_adjacency(code, config, adjacency)?, format)
            }
        };
        Ok(Self { backend })
    }

    pub fn arithmetic(&self) -> Arithmetic {
        match &self.backend {
            Backend::Float(_) => Arithmetic::Float,
            Backend::Fixed(_, format) => Arithmetic::Fixed(*format),
        }
    }

    pub fn adjacency(&self) -> &Arc<CheckAdjacency> {
        match &self.backend {
            Backend::Float(decoder) => decoder.adjacency(),
            Backend::Fixed(decoder, _) => decoder.adjacency(),
        }
    }

    pub fn workspace(&self) -> SoftWorkspace {
        match &self.backend {
            Backend::Float(decoder) => SoftWorkspace::Float(decoder.workspace()),
            Backend::Fixed(decoder, _) => {
                let n = decoder.geometry().n();
                SoftWorkspace::Fixed {
                    ws: decoder.workspace(),
                    llr: vec![0; n],
                    posterior: vec![0; n],
                }
            }
        }
    }

    /// Decode one codeword of `f32` channel LLRs
    pub fn decode_into(
        &self,
        ws: &mut SoftWorkspace,
        llr: &[f32],
        posterior: &mut [f32],
    ) -> Result<DecodeStatus, DecodeError> {
        match (&self.backend, ws) {
            (Backend::Float(decoder), SoftWorkspace::Float(ws)) => decoder.decode_into(ws, llr, posterior),
            (
                Backend::Fixed(decoder, format),
                SoftWorkspace::Fixed { ws, llr: quantized, posterior: fixed_posterior },
            ) => {
                let n = decoder.geometry().n();
                ensure!(llr.len() == n, LlrLengthSnafu { expected: n, found: llr.len() });
                ensure!(
                    posterior.len() == n,
                    OutputLengthSnafu { expected: n, found: posterior.len() }
                );
                ensure!(
                    quantized.len() == n && fixed_posterior.len() == n,
                    WorkspaceMismatchSnafu {
                        n,
                        m: decoder.geometry().m(),
                        found_n: quantized.len(),
                        found_m: ws.geometry().m(),
                    }
                );

                format.quantize_into(llr, quantized);
                let status = decoder.decode_into(ws, quantized, fixed_posterior)?;
                format.dequantize_into(fixed_posterior, posterior);
                Ok(status)
            }
            (_, ws) => {
                let geometry = *self.adjacency().geometry();
                let found = match ws {
                    SoftWorkspace::Float(ws) => *ws.geometry(),
                    SoftWorkspace::Fixed { ws, .. } => *ws.geometry(),
                };
                WorkspaceMismatchSnafu {
                    n: geometry.n(),
                    m: geometry.m(),
                    found_n: found.n(),
                    found_m: found.m(),
                }
                .fail()
            }
        }
    }

    pub fn decode(&self, ws: &mut SoftWorkspace, llr: &[f32]) -> Result<DecodeOutcome<f32>, DecodeError> {
        let mut posterior = vec![0.0f32; self.adjacency().num_variables()];
        let status = self.decode_into(ws, llr, &mut posterior)?;
        Ok(DecodeOutcome {
            posterior,
            hard_bits: ws.hard_bits().to_vec(),
            status,
        })
    }
}
