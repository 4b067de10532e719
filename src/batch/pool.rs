//! Persistent decoder worker pool
//!
//! Workers are started once and park on their job channel between batches.
//! A batch is dispatched as one job per worker; the caller then waits on a
//! completion barrier until every dispatched job has reported back. Each
//! worker keeps its own workspace for its whole lifetime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use snafu::ensure;

use super::*;

/// Shared stop flag observed by pool workers
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Decoded share of one worker
struct SliceResult<T> {
    posterior: Vec<T>,
    outcomes: Vec<Result<DecodeStatus, DecodeError>>,
    hard: Vec<u8>,
}

struct Job<T> {
    input: Arc<Vec<T>>,
    first_channel: usize,
    channels: usize,
    hard_output: HardOutput,
}

struct Completion<T> {
    done: usize,
    results: Vec<Option<SliceResult<T>>>,
}

/// Completion barrier: done count plus one result slot per worker
struct Barrier<T> {
    state: Mutex<Completion<T>>,
    all_done: Condvar,
}

/// Reports a worker's job as finished when dropped, including by a panic
/// unwinding through the job. The slot stays empty in that case.
struct CompletionGuard<'a, T> {
    barrier: &'a Barrier<T>,
    worker: usize,
    result: Option<SliceResult<T>>,
}

impl<T> Drop for CompletionGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = self.barrier.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.results[self.worker] = self.result.take();
        state.done += 1;
        self.barrier.all_done.notify_all();
    }
}

fn worker_loop<T: Metric>(
    worker: usize,
    decoder: Arc<LayeredDecoder<T>>,
    jobs: Receiver<Job<T>>,
    barrier: Arc<Barrier<T>>,
    token: CancellationToken,
) {
    let mut ws = decoder.workspace();
    let n = decoder.geometry().n();

    while let Ok(job) = jobs.recv() {
        let mut guard = CompletionGuard {
            barrier: &barrier,
            worker,
            result: None,
        };
        if token.is_cancelled() {
            break;
        }

        let stride = job.hard_output.stride(n);
        let mut result = SliceResult {
            posterior: vec![T::zero(); job.channels * n],
            outcomes: vec![Ok(DecodeStatus { iterations: 0, converged: false }); job.channels],
            hard: vec![0; job.channels * stride],
        };
        let llr = &job.input[job.first_channel * n..(job.first_channel + job.channels) * n];
        let slice = OutputSlice {
            posterior: &mut result.posterior,
            outcomes: &mut result.outcomes,
            hard: &mut result.hard,
        };
        decode_slice(&decoder, &mut ws, llr, slice, job.hard_output);
        guard.result = Some(result);
    }

    tracing::debug!(worker, "pool worker exiting");
}

/// Copy each worker's share into the batch output
///
/// An empty slot means the worker produced nothing. With the token set that
/// is a shutdown race and fails the batch, otherwise the worker panicked.
fn fill_output<T: Metric>(
    results: Vec<Option<SliceResult<T>>>,
    output: &mut BatchOutput<T>,
    workers: usize,
    cancelled: bool,
) -> Result<(), BatchError> {
    if cancelled && results.iter().any(Option::is_none) {
        tracing::warn!("pool cancelled during a batch");
        return PoolShutDownSnafu.fail();
    }

    for (worker, (result, slice)) in results.into_iter().zip(output.split_mut(workers)).enumerate() {
        match result {
            Some(result) => {
                slice.posterior.copy_from_slice(&result.posterior);
                slice.outcomes.clone_from_slice(&result.outcomes);
                slice.hard.copy_from_slice(&result.hard);
            }
            None => {
                tracing::error!(worker, "pool worker panicked");
                for outcome in slice.outcomes.iter_mut() {
                    *outcome = Err(DecodeError::WorkerPanicked { worker });
                }
            }
        }
    }
    Ok(())
}

/// Fixed set of long-lived decoder threads
///
/// Dropping the pool cancels it, wakes every parked worker and joins them.
pub struct WorkerPool<T: Metric> {
    decoder: Arc<LayeredDecoder<T>>,
    hard_output: HardOutput,
    senders: Vec<Sender<Job<T>>>,
    handles: Vec<JoinHandle<()>>,
    barrier: Arc<Barrier<T>>,
    token: CancellationToken,
}

impl<T: Metric> WorkerPool<T> {
    /// Start `config.workers` threads, each with its own workspace
    pub fn new(decoder: Arc<LayeredDecoder<T>>, config: &BatchConfig) -> Result<Self, BatchError> {
        let workers = config.workers;
        ensure!(workers > 0, NoWorkersSnafu);

        let barrier = Arc::new(Barrier {
            state: Mutex::new(Completion {
                done: 0,
                results: (0..workers).map(|_| None).collect(),
            }),
            all_done: Condvar::new(),
        });
        let token = CancellationToken::new();

        let mut pool = Self {
            decoder: Arc::clone(&decoder),
            hard_output: config.hard_output,
            senders: Vec::with_capacity(workers),
            handles: Vec::with_capacity(workers),
            barrier: Arc::clone(&barrier),
            token: token.clone(),
        };

        for worker in 0..workers {
            let (tx, rx) = mpsc::channel();
            let decoder = Arc::clone(&decoder);
            let barrier = Arc::clone(&barrier);
            let token = token.clone();

            // on failure the partially built pool is dropped, joining the
            // workers already running
            let handle = thread::Builder::new()
                .name(format!("qcldpc-worker-{}", worker))
                .spawn(move || worker_loop(worker, decoder, rx, barrier, token))
                .map_err(|source| BatchError::WorkerSpawn { worker, source })?;

            pool.senders.push(tx);
            pool.handles.push(handle);
        }

        tracing::debug!(workers, n = decoder.geometry().n(), "started decoder worker pool");
        Ok(pool)
    }

    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    /// Token that stops the pool from accepting further batches
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Decode a batch across all workers
    ///
    /// The channel count must be a multiple of the worker count. Worker `w`
    /// decodes the `w`-th contiguous share. Channels of a worker that panicked
    /// report `DecodeError::WorkerPanicked`; that worker stays gone for later
    /// batches, whose matching channels report the same error. A pool
    /// cancelled while the batch was in flight fails with
    /// `BatchError::PoolShutDown`.
    pub fn decode(&mut self, llr: &[T]) -> Result<BatchOutput<T>, BatchError> {
        ensure!(!self.token.is_cancelled(), PoolShutDownSnafu);

        let n = self.decoder.geometry().n();
        let workers = self.workers();
        let channels = channel_count(llr.len(), n, workers)?;
        let mut output = BatchOutput::new(channels, n, self.hard_output);
        if channels == 0 {
            return Ok(output);
        }
        let per = channels / workers;

        {
            let mut state = self
                .barrier
                .state
                .lock()
                .map_err(|_| BatchError::LockPoisoned { what: "completion barrier" })?;
            state.done = 0;
            state.results.iter_mut().for_each(|slot| *slot = None);
        }

        let input = Arc::new(llr.to_vec());
        let mut dispatched = 0;
        for (worker, sender) in self.senders.iter().enumerate() {
            let job = Job {
                input: Arc::clone(&input),
                first_channel: worker * per,
                channels: per,
                hard_output: self.hard_output,
            };
            if sender.send(job).is_ok() {
                dispatched += 1;
            } else {
                tracing::warn!(worker, "pool worker is gone, its channels are skipped");
            }
        }
        tracing::trace!(channels, workers, dispatched, "dispatched batch");

        let mut state = self
            .barrier
            .state
            .lock()
            .map_err(|_| BatchError::LockPoisoned { what: "completion barrier" })?;
        while state.done < dispatched {
            state = self
                .barrier
                .all_done
                .wait(state)
                .map_err(|_| BatchError::LockPoisoned { what: "completion barrier" })?;
        }

        let results: Vec<Option<SliceResult<T>>> = state.results.iter_mut().map(Option::take).collect();
        drop(state);

        fill_output(results, &mut output, workers, self.token.is_cancelled())?;
        Ok(output)
    }

    /// Cancel the pool and join every worker
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.token.cancel();
        // closing the job channels wakes every parked worker
        self.senders.clear();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("pool worker had panicked");
            }
        }
    }
}

impl<T: Metric> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldpc::{constants, DecoderConfig};

    fn decoder() -> Arc<LayeredDecoder<f32>> {
        Arc::new(LayeredDecoder::new(&constants::demo_code(), &DecoderConfig::default()).unwrap())
    }

    fn batch(channels: usize) -> Vec<f32> {
        (0..channels * 48)
            .map(|i| if (i * 5 + i / 48) % 11 == 2 { -0.4 } else { 1.7 })
            .collect()
    }

    #[test]
    fn test_pool_matches_spawned_decoding() {
        crate::tracing_init::init_test_tracing();
        let config = BatchConfig { workers: 3, hard_output: HardOutput::Unpacked };
        let mut pool = WorkerPool::new(decoder(), &config).unwrap();
        let mut spawned = BatchDecoder::new(decoder(), &config).unwrap();

        // several batches reuse the same parked workers
        for channels in [3, 6, 12] {
            let llr = batch(channels);
            let a = pool.decode(&llr).unwrap();
            let b = spawned.decode_spawned(&llr).unwrap();
            assert_eq!(a.posterior, b.posterior);
            assert_eq!(a.outcomes, b.outcomes);
            assert_eq!(a.hard_bits, b.hard_bits);
        }
    }

    #[test]
    fn test_cancelled_pool_refuses_batches() {
        let mut pool = WorkerPool::new(decoder(), &BatchConfig { workers: 2, ..Default::default() }).unwrap();
        assert_eq!(pool.workers(), 2);

        pool.cancellation_token().cancel();
        assert!(matches!(pool.decode(&batch(2)), Err(BatchError::PoolShutDown)));
        pool.shutdown();
    }

    fn share(channels: usize) -> SliceResult<f32> {
        SliceResult {
            posterior: vec![1.0; channels * 48],
            outcomes: vec![Ok(DecodeStatus { iterations: 2, converged: true }); channels],
            hard: vec![0; channels * 48],
        }
    }

    #[test]
    fn test_empty_share_after_cancel_is_shutdown() {
        let mut output = BatchOutput::<f32>::new(4, 48, HardOutput::Unpacked);
        let results = vec![Some(share(2)), None];
        assert!(matches!(
            fill_output(results, &mut output, 2, true),
            Err(BatchError::PoolShutDown)
        ));
    }

    #[test]
    fn test_empty_share_without_cancel_is_panic() {
        let mut output = BatchOutput::<f32>::new(4, 48, HardOutput::Unpacked);
        let results = vec![None, Some(share(2))];
        fill_output(results, &mut output, 2, false).unwrap();

        assert_eq!(output.outcomes[0], Err(DecodeError::WorkerPanicked { worker: 0 }));
        assert_eq!(output.outcomes[1], Err(DecodeError::WorkerPanicked { worker: 0 }));
        assert_eq!(output.outcomes[2], Ok(DecodeStatus { iterations: 2, converged: true }));
        assert_eq!(&output.posterior[2 * 48..], &vec![1.0f32; 2 * 48][..]);
    }

    #[test]
    fn test_pool_validates_shape() {
        let mut pool = WorkerPool::new(decoder(), &BatchConfig { workers: 2, ..Default::default() }).unwrap();
        assert!(matches!(
            pool.decode(&batch(3)),
            Err(BatchError::UnevenBatch { channels: 3, workers: 2 })
        ));
        assert!(matches!(
            WorkerPool::new(decoder(), &BatchConfig { workers: 0, ..Default::default() }),
            Err(BatchError::NoWorkers)
        ));
    }
}
