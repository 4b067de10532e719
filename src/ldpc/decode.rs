//! Layered min-sum decoder
//!
//! Block rows of the base matrix are processed as tiers, strictly in order.
//! Every tier keeps its own accumulator of check-to-variable messages; after
//! a tier is updated the running belief is rebuilt as channel LLR plus the
//! sum of all tier accumulators. Tiers not yet visited in the current
//! iteration therefore still contribute their messages from the previous
//! one, so updates propagate within an iteration instead of after a sweep.
//!
//! The decoder itself is immutable and shared between threads. All mutable
//! state lives in a [`Workspace`] owned by the calling worker.

use std::marker::PhantomData;
use std::sync::Arc;

use snafu::ensure;

use super::check::{update_check, CheckCache};
use super::error::*;
use super::geometry::{CodeGeometry, QcCode};
use super::index::CheckAdjacency;
use super::metric::{FixedFormat, Metric, MinSumParams};
use super::syndrome::{check_syndrome, hard_decision_into};

/// Numeric representation used by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Arithmetic {
    /// `f32` LLRs with normalization and offset
    #[default]
    Float,
    /// Quantized `i32` LLRs, magnitudes passed through unmodified
    Fixed(FixedFormat),
}

/// Configuration for the layered decoder
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Maximum number of full iterations over all tiers
    pub max_iterations: usize,
    /// Multiplicative normalization of check messages (floating point only)
    pub normalization: f32,
    /// Subtractive offset of check messages (floating point only)
    pub offset: f32,
    /// Stop as soon as the hard decision satisfies every check
    pub early_termination: bool,
    /// Numeric representation, used by [`super::SoftDecoder`]
    pub arithmetic: Arithmetic,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            normalization: 1.0,
            offset: 0.0,
            early_termination: true,
            arithmetic: Arithmetic::Float,
        }
    }
}

impl DecoderConfig {
    pub fn params(&self) -> MinSumParams {
        MinSumParams {
            normalization: self.normalization,
            offset: self.offset,
        }
    }
}

/// Result of one decode call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeStatus {
    /// Iterations run; equals the configured maximum on exhaustion
    pub iterations: usize,
    /// Whether the final hard decision satisfies every check
    pub converged: bool,
}

/// Owned result of [`LayeredDecoder::decode`]
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOutcome<T> {
    pub posterior: Vec<T>,
    /// Hard decision of the posterior, one byte per bit
    pub hard_bits: Vec<u8>,
    pub status: DecodeStatus,
}

/// Per-worker decoder state
///
/// Sized once for a code geometry and reused across decode calls; every call
/// starts by clearing it. A workspace must never be shared between two
/// concurrent decodes.
#[derive(Debug, Clone)]
pub struct Workspace<T> {
    geometry: CodeGeometry,
    beliefs: [Vec<T>; 2],
    cursor: usize,
    tiers: Vec<T>,
    caches: Vec<CheckCache<T>>,
    hard: Vec<u8>,
}

impl<T: Metric> Workspace<T> {
    pub fn new(geometry: &CodeGeometry) -> Self {
        let n = geometry.n();
        Self {
            geometry: *geometry,
            beliefs: [vec![T::zero(); n], vec![T::zero(); n]],
            cursor: 0,
            tiers: vec![T::zero(); geometry.mb() * n],
            caches: vec![CheckCache::default(); geometry.m()],
            hard: vec![0; n],
        }
    }

    pub fn geometry(&self) -> &CodeGeometry {
        &self.geometry
    }

    /// Hard decision left behind by the last decode call
    pub fn hard_bits(&self) -> &[u8] {
        &self.hard
    }

    /// Current belief, i.e. the posterior of the last decode call
    pub fn belief(&self) -> &[T] {
        &self.beliefs[self.cursor]
    }

    fn reset(&mut self, llr: &[T]) {
        self.cursor = 0;
        self.beliefs[0].copy_from_slice(llr);
        self.tiers.fill(T::zero());
        for cache in self.caches.iter_mut() {
            cache.reset();
        }
    }
}

/// Split the two belief slots into (current, next)
fn belief_slots<T>(beliefs: &mut [Vec<T>; 2], cursor: usize) -> (&[T], &mut [T]) {
    let (lo, hi) = beliefs.split_at_mut(1);
    if cursor == 0 {
        (&lo[0], &mut hi[0])
    } else {
        (&hi[0], &mut lo[0])
    }
}

/// Layered min-sum decoder for one QC-LDPC code
///
/// Immutable after construction. The adjacency table is reference counted so
/// several decoders (or a whole worker pool) can share one copy.
#[derive(Debug, Clone)]
pub struct LayeredDecoder<T> {
    adjacency: Arc<CheckAdjacency>,
    params: MinSumParams,
    max_iterations: usize,
    early_termination: bool,
    _metric: PhantomData<fn() -> T>,
}

impl<T: Metric> LayeredDecoder<T> {
    /// Build the check adjacency for `code` and store the decoder parameters
    pub fn new(code: &QcCode, config: &DecoderConfig) -> Result<Self, CodeError> {
        let adjacency = Arc::new(CheckAdjacency::build(code)?);
        Self::with_adjacency(code, config, adjacency)
    }

    /// Reuse an adjacency table built earlier for the same code
    pub fn with_adjacency(
        code: &QcCode,
        config: &DecoderConfig,
        adjacency: Arc<CheckAdjacency>,
    ) -> Result<Self, CodeError> {
        ensure!(
            adjacency.geometry() == code.geometry(),
            InvalidGeometrySnafu { reason: "adjacency table was built for a different code" }
        );

        tracing::debug!(
            n = code.geometry().n(),
            m = code.geometry().m(),
            max_iterations = config.max_iterations,
            normalization = config.normalization,
            offset = config.offset,
            early_termination = config.early_termination,
            "initialised layered decoder"
        );

        Ok(Self {
            adjacency,
            params: config.params(),
            max_iterations: config.max_iterations,
            early_termination: config.early_termination,
            _metric: PhantomData,
        })
    }

    pub fn adjacency(&self) -> &Arc<CheckAdjacency> {
        &self.adjacency
    }

    pub fn geometry(&self) -> &CodeGeometry {
        self.adjacency.geometry()
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Allocate a workspace sized for this decoder's code
    pub fn workspace(&self) -> Workspace<T> {
        Workspace::new(self.geometry())
    }

    /// Decode one codeword
    ///
    /// # Arguments
    /// * `ws` - Workspace owned by the calling worker
    /// * `llr` - Channel LLRs, N values, negative means bit 1
    /// * `posterior` - Output buffer for the final belief, N values
    ///
    /// # Returns
    /// Iteration count and convergence flag. Running out of iterations is
    /// not an error; buffer or workspace size mismatches are.
    pub fn decode_into(
        &self,
        ws: &mut Workspace<T>,
        llr: &[T],
        posterior: &mut [T],
    ) -> Result<DecodeStatus, DecodeError> {
        let geometry = self.geometry();
        let n = geometry.n();
        let z = geometry.z();

        ensure!(llr.len() == n, LlrLengthSnafu { expected: n, found: llr.len() });
        ensure!(
            posterior.len() == n,
            OutputLengthSnafu { expected: n, found: posterior.len() }
        );
        ensure!(
            ws.geometry.n() == n && ws.geometry.m() == geometry.m() && ws.geometry.mb() == geometry.mb(),
            WorkspaceMismatchSnafu {
                n,
                m: geometry.m(),
                found_n: ws.geometry.n(),
                found_m: ws.geometry.m(),
            }
        );

        ws.reset(llr);

        let mut status = DecodeStatus {
            iterations: self.max_iterations,
            converged: false,
        };

        for iter in 0..self.max_iterations {
            for mb in 0..geometry.mb() {
                let Workspace { beliefs, cursor, tiers, caches, .. } = ws;
                let (current, next) = belief_slots(beliefs, *cursor);

                let tier = &mut tiers[mb * n..(mb + 1) * n];
                tier.fill(T::zero());
                for check in mb * z..(mb + 1) * z {
                    update_check(
                        &mut caches[check],
                        self.adjacency.neighbors(check),
                        current,
                        tier,
                        iter > 0,
                        &self.params,
                    );
                }

                next.copy_from_slice(llr);
                for contribution in tiers.chunks_exact(n) {
                    for (belief, &message) in next.iter_mut().zip(contribution) {
                        *belief = belief.accumulate(message);
                    }
                }

                *cursor ^= 1;
            }

            if self.early_termination && self.converged(ws) {
                status = DecodeStatus {
                    iterations: iter + 1,
                    converged: true,
                };
                break;
            }
        }

        if !status.converged {
            status.converged = self.converged(ws);
            tracing::trace!(
                iterations = status.iterations,
                converged = status.converged,
                unsatisfied = super::syndrome::unsatisfied_checks(&self.adjacency, &ws.hard[..]),
                "decoder ran out of iterations"
            );
        }

        posterior.copy_from_slice(ws.belief());
        Ok(status)
    }

    /// Decode one codeword into freshly allocated buffers
    pub fn decode(&self, ws: &mut Workspace<T>, llr: &[T]) -> Result<DecodeOutcome<T>, DecodeError> {
        let mut posterior = vec![T::zero(); self.geometry().n()];
        let status = self.decode_into(ws, llr, &mut posterior)?;
        Ok(DecodeOutcome {
            posterior,
            hard_bits: ws.hard.clone(),
            status,
        })
    }

    /// Refresh the workspace hard decision and test every check
    fn converged(&self, ws: &mut Workspace<T>) -> bool {
        let Workspace { beliefs, cursor, hard, .. } = ws;
        hard_decision_into(&beliefs[*cursor], hard);
        check_syndrome(&self.adjacency, &hard[..])
    }
}
