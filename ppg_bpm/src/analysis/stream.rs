//! Threaded front end for a single estimator.
//!
//! Sensor drivers deliver sample batches from their own acquisition
//! thread. [`EstimatorWorker`] moves the estimator onto one consumer thread
//! and feeds it through a bounded channel, so calls into the estimator are
//! never concurrent and its state needs no locking. Producers block when
//! the queue is full; samples are never dropped, since a missing sample
//! would shift the estimator's time axis.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

use crate::analysis::estimator::{to_sentinel, HeartRateEstimator, NO_ESTIMATE};
use crate::error::StreamError;

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Notification sent to the listener when the smoothed BPM changes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BpmUpdate {
    /// Session time of the sample that produced the update.
    pub time_secs: f64,
    pub bpm: f64,
}

enum WorkerCmd {
    Samples(Vec<f32>),
    Reset,
    Shutdown,
}

/// Latest smoothed BPM, readable from any thread.
#[derive(Debug)]
struct SharedBpm(AtomicU64);

impl SharedBpm {
    fn new() -> Self {
        Self(AtomicU64::new(NO_ESTIMATE.to_bits()))
    }

    fn store(&self, bpm: Option<f64>) {
        self.0.store(to_sentinel(bpm).to_bits(), Ordering::Release);
    }

    fn load(&self) -> Option<f64> {
        let bpm = f64::from_bits(self.0.load(Ordering::Acquire));
        (bpm >= 0.0).then_some(bpm)
    }
}

/// Owns a [`HeartRateEstimator`] on a dedicated thread.
pub struct EstimatorWorker {
    tx: Sender<WorkerCmd>,
    latest: Arc<SharedBpm>,
    worker_thread: Option<thread::JoinHandle<HeartRateEstimator>>,
}

impl EstimatorWorker {
    /// Starts the worker. `on_update` runs on the worker thread each time
    /// the smoothed BPM takes a new value.
    pub fn start<F>(estimator: HeartRateEstimator, capacity: usize, on_update: F) -> Self
    where
        F: FnMut(BpmUpdate) + Send + 'static,
    {
        let (tx, rx) = bounded(capacity.max(1));
        let latest = Arc::new(SharedBpm::new());
        let latest_clone = Arc::clone(&latest);

        let worker_thread = thread::spawn(move || {
            Self::run_loop(estimator, &rx, &latest_clone, on_update)
        });

        Self { tx, latest, worker_thread: Some(worker_thread) }
    }

    /// Queues a batch of samples, blocking while the queue is full.
    pub fn push(&self, samples: &[f32]) -> Result<(), StreamError> {
        if samples.is_empty() {
            return Ok(());
        }
        self.tx
            .send(WorkerCmd::Samples(samples.to_vec()))
            .map_err(|_| StreamError::Disconnected)
    }

    /// Queues a reset behind any samples already pushed.
    pub fn reset(&self) -> Result<(), StreamError> {
        self.tx.send(WorkerCmd::Reset).map_err(|_| StreamError::Disconnected)
    }

    /// Latest smoothed BPM seen by the worker. Never blocks.
    pub fn bpm(&self) -> Option<f64> {
        self.latest.load()
    }

    /// Drains the queue, stops the thread and returns the estimator.
    pub fn shutdown(mut self) -> Result<HeartRateEstimator, StreamError> {
        self.stop().ok_or(StreamError::Disconnected)?
    }

    fn stop(&mut self) -> Option<Result<HeartRateEstimator, StreamError>> {
        let handle = self.worker_thread.take()?;
        // The worker may already be gone; join reports how it ended.
        let _ = self.tx.send(WorkerCmd::Shutdown);
        Some(handle.join().map_err(|_| StreamError::WorkerPanicked))
    }

    fn run_loop<F>(
        mut estimator: HeartRateEstimator,
        rx: &Receiver<WorkerCmd>,
        latest: &SharedBpm,
        mut on_update: F,
    ) -> HeartRateEstimator
    where
        F: FnMut(BpmUpdate),
    {
        let mut published = estimator.bpm();
        latest.store(published);

        while let Ok(cmd) = rx.recv() {
            match cmd {
                WorkerCmd::Samples(batch) => {
                    for value in batch {
                        let Some(bpm) = estimator.add_sample(value) else {
                            continue;
                        };
                        if published != Some(bpm) {
                            published = Some(bpm);
                            latest.store(published);
                            on_update(BpmUpdate { time_secs: estimator.current_time_secs(), bpm });
                        }
                    }
                }
                WorkerCmd::Reset => {
                    estimator.reset();
                    published = None;
                    latest.store(None);
                }
                WorkerCmd::Shutdown => {
                    debug!("estimator worker shutting down");
                    break;
                }
            }
        }
        estimator
    }
}

impl Drop for EstimatorWorker {
    fn drop(&mut self) {
        if let Some(Err(e)) = self.stop() {
            warn!(error = %e, "estimator worker ended abnormally");
        }
    }
}
