//! Batch decoding of independent codewords
//!
//! A batch is a flat buffer of `channels * N` LLRs, one codeword after the
//! other. Every worker owns a private [`Workspace`] and decodes a contiguous
//! slice of the batch; the decoder and its adjacency table are the only
//! shared state and are read-only.
//!
//! Three ways to run a batch:
//! - [`BatchDecoder::decode_sequential`]: every channel on the calling thread
//! - [`BatchDecoder::decode_spawned`]: one scoped thread per worker, joined
//!   before returning
//! - [`WorkerPool`]: persistent threads parked between batches

mod pool;

use std::sync::Arc;
use std::thread;

use bitvec::prelude::*;
use snafu::{ensure, Snafu};

use crate::ldpc::{DecodeError, DecodeStatus, LayeredDecoder, Metric, Workspace};

pub use pool::{CancellationToken, WorkerPool};

/// Errors of the batch layer
///
/// Per-channel decode failures are not batch errors, they are reported in
/// [`BatchOutput::outcomes`] so one bad channel never aborts the others.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BatchError {
    /// A pool or batch decoder needs at least one worker
    #[snafu(display("worker count must be at least 1"))]
    NoWorkers,

    /// Batch buffer is not a whole number of codewords
    #[snafu(display("batch holds {len} LLRs, not a multiple of the codeword length {n}"))]
    RaggedBatch { len: usize, n: usize },

    /// Channels cannot be split evenly between the workers
    #[snafu(display("{channels} channels cannot be split evenly across {workers} workers"))]
    UnevenBatch { channels: usize, workers: usize },

    /// The operating system refused to start a worker thread
    #[snafu(display("failed to spawn worker {worker}: {source}"))]
    WorkerSpawn { worker: usize, source: std::io::Error },

    /// A pool lock was poisoned by a panicking thread
    #[snafu(display("{what} lock poisoned"))]
    LockPoisoned { what: &'static str },

    /// The pool was cancelled and accepts no more batches
    #[snafu(display("worker pool has been shut down"))]
    PoolShutDown,
}

/// What hard decisions a batch should return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HardOutput {
    /// Posterior LLRs only
    #[default]
    None,
    /// One byte per bit
    Unpacked,
    /// MSB-first bytes, each codeword padded to a whole byte
    Packed,
}

impl HardOutput {
    /// Bytes of hard output per channel
    pub fn stride(self, n: usize) -> usize {
        match self {
            HardOutput::None => 0,
            HardOutput::Unpacked => n,
            HardOutput::Packed => n.div_ceil(8),
        }
    }
}

/// Batch layer configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Number of workers, each with its own workspace
    pub workers: usize,
    pub hard_output: HardOutput,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            hard_output: HardOutput::None,
        }
    }
}

/// Decoded batch
#[derive(Debug, Clone)]
pub struct BatchOutput<T> {
    n: usize,
    hard_stride: usize,
    /// Posterior LLRs, laid out like the input
    pub posterior: Vec<T>,
    /// Per channel status, or the error that channel hit
    pub outcomes: Vec<Result<DecodeStatus, DecodeError>>,
    /// Hard decisions in the configured format, empty for `HardOutput::None`
    pub hard_bits: Vec<u8>,
}

impl<T: Metric> BatchOutput<T> {
    pub(crate) fn new(channels: usize, n: usize, hard_output: HardOutput) -> Self {
        let hard_stride = hard_output.stride(n);
        Self {
            n,
            hard_stride,
            posterior: vec![T::zero(); channels * n],
            outcomes: vec![Ok(DecodeStatus { iterations: 0, converged: false }); channels],
            hard_bits: vec![0; channels * hard_stride],
        }
    }

    pub fn channels(&self) -> usize {
        self.outcomes.len()
    }

    pub fn posterior_of(&self, channel: usize) -> &[T] {
        &self.posterior[channel * self.n..(channel + 1) * self.n]
    }

    /// Hard decision of one channel, empty if none was requested
    pub fn hard_bits_of(&self, channel: usize) -> &[u8] {
        &self.hard_bits[channel * self.hard_stride..(channel + 1) * self.hard_stride]
    }

    /// Channels whose decode ended with every check satisfied
    pub fn converged_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, Ok(status) if status.converged))
            .count()
    }

    /// Mutable views of the slices belonging to each of `parts` workers
    pub(crate) fn split_mut(&mut self, parts: usize) -> Vec<OutputSlice<'_, T>> {
        let per = self.channels() / parts;
        let hard: Vec<&mut [u8]> = if self.hard_stride == 0 {
            (0..parts).map(|_| Default::default()).collect()
        } else {
            self.hard_bits.chunks_mut(per * self.hard_stride).collect()
        };

        self.posterior
            .chunks_mut(per * self.n)
            .zip(self.outcomes.chunks_mut(per))
            .zip(hard)
            .map(|((posterior, outcomes), hard)| OutputSlice { posterior, outcomes, hard })
            .collect()
    }
}

/// One worker's share of a [`BatchOutput`]
pub(crate) struct OutputSlice<'a, T> {
    pub posterior: &'a mut [T],
    pub outcomes: &'a mut [Result<DecodeStatus, DecodeError>],
    pub hard: &'a mut [u8],
}

/// Decode consecutive channels into the matching output slice
///
/// Errors are recorded per channel; the remaining channels still run.
pub(crate) fn decode_slice<T: Metric>(
    decoder: &LayeredDecoder<T>,
    ws: &mut Workspace<T>,
    llr: &[T],
    out: OutputSlice<'_, T>,
    hard_output: HardOutput,
) {
    let n = decoder.geometry().n();
    let stride = hard_output.stride(n);

    for (c, (channel, outcome)) in llr.chunks_exact(n).zip(out.outcomes.iter_mut()).enumerate() {
        let posterior = &mut out.posterior[c * n..(c + 1) * n];
        let hard = &mut out.hard[c * stride..(c + 1) * stride];

        *outcome = decoder.decode_into(ws, channel, posterior);
        if let Err(e) = &*outcome {
            tracing::warn!(channel = c, error = %e, "channel decode failed");
            posterior.fill(T::zero());
            hard.fill(0);
            continue;
        }

        match hard_output {
            HardOutput::None => {}
            HardOutput::Unpacked => hard.copy_from_slice(ws.hard_bits()),
            HardOutput::Packed => {
                let bits = hard.view_bits_mut::<Msb0>();
                bits.fill(false);
                for (i, &b) in ws.hard_bits().iter().enumerate() {
                    bits.set(i, b == 1);
                }
            }
        }
    }
}

/// Check the batch shape and return the channel count
pub(crate) fn channel_count(len: usize, n: usize, workers: usize) -> Result<usize, BatchError> {
    ensure!(len % n == 0, RaggedBatchSnafu { len, n });
    let channels = len / n;
    ensure!(channels % workers == 0, UnevenBatchSnafu { channels, workers });
    Ok(channels)
}

/// Batch decoder owning one workspace per worker
#[derive(Debug)]
pub struct BatchDecoder<T> {
    decoder: Arc<LayeredDecoder<T>>,
    hard_output: HardOutput,
    workspaces: Vec<Workspace<T>>,
}

impl<T: Metric> BatchDecoder<T> {
    pub fn new(decoder: Arc<LayeredDecoder<T>>, config: &BatchConfig) -> Result<Self, BatchError> {
        ensure!(config.workers > 0, NoWorkersSnafu);
        let workspaces = (0..config.workers).map(|_| decoder.workspace()).collect();
        Ok(Self {
            decoder,
            hard_output: config.hard_output,
            workspaces,
        })
    }

    pub fn decoder(&self) -> &Arc<LayeredDecoder<T>> {
        &self.decoder
    }

    pub fn workers(&self) -> usize {
        self.workspaces.len()
    }

    /// Decode one codeword with the workspace of `worker`
    ///
    /// # Arguments
    /// * `worker` - Worker index in `[0, workers)`
    /// * `llr` - Channel LLRs, N values
    /// * `posterior` - Output buffer, N values
    pub fn decode_with_worker(
        &mut self,
        worker: usize,
        llr: &[T],
        posterior: &mut [T],
    ) -> Result<DecodeStatus, DecodeError> {
        let workers = self.workspaces.len();
        let ws = self
            .workspaces
            .get_mut(worker)
            .ok_or(DecodeError::UnknownWorker { worker, workers })?;
        self.decoder.decode_into(ws, llr, posterior)
    }

    /// Decode every channel on the calling thread with worker 0's workspace
    pub fn decode_sequential(&mut self, llr: &[T]) -> Result<BatchOutput<T>, BatchError> {
        let n = self.decoder.geometry().n();
        let channels = channel_count(llr.len(), n, 1)?;
        let mut output = BatchOutput::new(channels, n, self.hard_output);
        if channels == 0 {
            return Ok(output);
        }

        let slice = output.split_mut(1).into_iter().next();
        if let Some(slice) = slice {
            decode_slice(&self.decoder, &mut self.workspaces[0], llr, slice, self.hard_output);
        }
        Ok(output)
    }

    /// Spawn one thread per worker, decode, join all
    ///
    /// Worker `w` decodes channels `[w * per, (w + 1) * per)` where
    /// `per = channels / workers`. A panicking worker marks its channels
    /// with `DecodeError::WorkerPanicked`.
    pub fn decode_spawned(&mut self, llr: &[T]) -> Result<BatchOutput<T>, BatchError> {
        let n = self.decoder.geometry().n();
        let workers = self.workspaces.len();
        let channels = channel_count(llr.len(), n, workers)?;
        let mut output = BatchOutput::new(channels, n, self.hard_output);
        if channels == 0 {
            return Ok(output);
        }
        let per = channels / workers;
        let decoder = &*self.decoder;
        let hard_output = self.hard_output;

        let panicked = thread::scope(|scope| -> Result<Vec<usize>, BatchError> {
            let mut handles = Vec::with_capacity(workers);
            let jobs = self
                .workspaces
                .iter_mut()
                .zip(llr.chunks(per * n))
                .zip(output.split_mut(workers));

            for (worker, ((ws, llr), slice)) in jobs.enumerate() {
                let handle = thread::Builder::new()
                    .name(format!("qcldpc-batch-{}", worker))
                    .spawn_scoped(scope, move || decode_slice(decoder, ws, llr, slice, hard_output))
                    .map_err(|source| BatchError::WorkerSpawn { worker, source })?;
                handles.push(handle);
            }

            Ok(handles
                .into_iter()
                .enumerate()
                .filter_map(|(worker, handle)| handle.join().is_err().then_some(worker))
                .collect())
        })?;

        for worker in panicked {
            tracing::error!(worker, "batch worker panicked");
            for outcome in &mut output.outcomes[worker * per..(worker + 1) * per] {
                *outcome = Err(DecodeError::WorkerPanicked { worker });
            }
        }

        Ok(output)
    }
}
