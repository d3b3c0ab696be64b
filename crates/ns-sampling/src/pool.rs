//! Fixed-size local worker pool for trial evaluation.
//!
//! A batch is a set of independent jobs. Jobs run on a dedicated rayon pool
//! and report back over a channel; the caller blocks until every job in the
//! batch has answered, the first job fails, or the batch timeout expires.

use crossbeam_channel::RecvTimeoutError;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use ns_types::{config_error, NsError, NsResult, TrialError};

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// Number of worker threads.
    pub num_workers: usize,
    /// Maximum wall time for one batch. `None` waits indefinitely.
    pub batch_timeout: Option<Duration>,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: default_workers(),
            batch_timeout: None,
        }
    }
}

impl WorkerPoolConfig {
    pub fn with_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = Some(timeout);
        self
    }
}

/// Number of available processing units, at least one.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    config: WorkerPoolConfig,
}

impl WorkerPool {
    pub fn new(config: WorkerPoolConfig) -> NsResult<Self> {
        if config.num_workers == 0 {
            return Err(config_error!("worker pool needs at least one worker"));
        }
        if config.batch_timeout == Some(Duration::ZERO) {
            return Err(config_error!("batch timeout must be positive"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_workers)
            .thread_name(|i| format!("ns-trial-{i}"))
            .build()
            .map_err(|e| config_error!("failed to start worker pool: {e}"))?;
        debug!("Started worker pool with {} workers", config.num_workers);
        Ok(Self { pool, config })
    }

    /// Pool sized to the available processing units.
    pub fn with_default_size() -> NsResult<Self> {
        Self::new(WorkerPoolConfig::default())
    }

    pub fn num_workers(&self) -> usize {
        self.config.num_workers
    }

    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Run every job and return their results in submission order.
    ///
    /// The first failing or panicking job aborts the batch; results already
    /// received are discarded and jobs still in flight finish unobserved.
    pub fn run_batch<T, F>(&self, jobs: Vec<F>) -> NsResult<Vec<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> NsResult<T> + Send + 'static,
    {
        let total = jobs.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let (tx, rx) = crossbeam_channel::bounded(total);
        for (idx, job) in jobs.into_iter().enumerate() {
            let tx = tx.clone();
            self.pool.spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(job));
                // The receiver is gone once the batch has been abandoned.
                let _ = tx.send((idx, outcome));
            });
        }
        drop(tx);

        let deadline = self.config.batch_timeout.map(|t| Instant::now() + t);
        let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();
        let mut completed = 0usize;

        while completed < total {
            let (idx, outcome) = match deadline {
                Some(deadline) => rx.recv_deadline(deadline).map_err(|e| match e {
                    RecvTimeoutError::Timeout => {
                        let timeout_ms = self
                            .config
                            .batch_timeout
                            .map(|t| t.as_millis() as u64)
                            .unwrap_or_default();
                        warn!(
                            "Trial batch timed out after {} ms with {}/{} trials done",
                            timeout_ms, completed, total
                        );
                        TrialError::Timeout {
                            timeout_ms,
                            completed,
                            total,
                        }
                    }
                    RecvTimeoutError::Disconnected => TrialError::WorkerDisconnected,
                })?,
                None => rx.recv().map_err(|_| TrialError::WorkerDisconnected)?,
            };

            match outcome {
                Ok(Ok(value)) => {
                    slots[idx] = Some(value);
                    completed += 1;
                }
                Ok(Err(err)) => {
                    warn!("Trial {} failed: {}", idx, err);
                    return Err(NsError::Trial(TrialError::Failed {
                        trial: idx,
                        source: Box::new(err),
                    }));
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!("Trial {} panicked: {}", idx, message);
                    return Err(NsError::Trial(TrialError::Panicked { trial: idx, message }));
                }
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(workers: usize) -> WorkerPool {
        WorkerPool::new(WorkerPoolConfig::default().with_workers(workers)).unwrap()
    }

    #[test]
    fn results_keep_submission_order() {
        let pool = pool(4);
        let jobs: Vec<_> = (0..20u64)
            .map(|i| {
                move || {
                    std::thread::sleep(Duration::from_millis((20 - i) % 5));
                    Ok(i * i)
                }
            })
            .collect();
        let results = pool.run_batch(jobs).unwrap();
        assert_eq!(results, (0..20u64).map(|i| i * i).collect::<Vec<_>>());
    }

    #[test]
    fn failing_job_aborts_batch() {
        let pool = pool(2);
        let jobs: Vec<_> = (0..4)
            .map(|i| {
                move || {
                    if i == 2 {
                        Err(NsError::Validation("bad trial".into()))
                    } else {
                        Ok(i)
                    }
                }
            })
            .collect();
        match pool.run_batch(jobs) {
            Err(NsError::Trial(TrialError::Failed { trial, source })) => {
                assert_eq!(trial, 2);
                assert!(matches!(*source, NsError::Validation(_)));
            }
            other => panic!("expected trial failure, got {other:?}"),
        }
    }

    #[test]
    fn panicking_job_is_reported() {
        let pool = pool(2);
        let jobs: Vec<Box<dyn FnOnce() -> NsResult<u32> + Send>> = vec![
            Box::new(|| -> NsResult<u32> { Ok(1) }),
            Box::new(|| -> NsResult<u32> { panic!("sampler exploded") }),
        ];
        match pool.run_batch(jobs) {
            Err(NsError::Trial(TrialError::Panicked { trial, message })) => {
                assert_eq!(trial, 1);
                assert!(message.contains("sampler exploded"));
            }
            other => panic!("expected panic report, got {other:?}"),
        }
        // pool remains usable afterwards
        let again: Vec<_> = (0..3).map(|i| move || Ok(i)).collect();
        assert_eq!(pool.run_batch(again).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn hung_batch_times_out() {
        let pool = WorkerPool::new(
            WorkerPoolConfig::default()
                .with_workers(2)
                .with_batch_timeout(Duration::from_millis(50)),
        )
        .unwrap();
        let jobs: Vec<_> = (0..2u64)
            .map(|i| {
                move || {
                    if i == 1 {
                        std::thread::sleep(Duration::from_millis(1_000));
                    }
                    Ok(i)
                }
            })
            .collect();
        match pool.run_batch(jobs) {
            Err(NsError::Trial(TrialError::Timeout { total, .. })) => assert_eq!(total, 2),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn empty_batch_and_bad_config() {
        let pool = pool(1);
        let jobs: Vec<fn() -> NsResult<u8>> = Vec::new();
        assert!(pool.run_batch(jobs).unwrap().is_empty());
        assert!(WorkerPool::new(WorkerPoolConfig::default().with_workers(0)).is_err());
    }
}
