//! Bounded upload worker pool
//!
//! All jobs go into one shared lock-free queue. `W` workers each pop a job,
//! await its put, record the outcome and loop until the queue is empty, so at
//! most `W` puts are ever in flight. Failures become outcomes; nothing is
//! retried and nothing aborts the pool.

use crate::config::{resolve_workers, Config};
use crate::error::Error;
use crate::policy::UploadPolicy;
use crate::progress::ProgressTracker;
use crate::storage::ObjectStore;
use crate::types::{RunStats, UploadJob, UploadOutcome};
use crossbeam_queue::SegQueue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Failure message for a job whose worker stopped before recording an outcome
const LOST_MESSAGE: &str = "upload worker stopped before finishing";

/// Live counters shared between workers
#[derive(Debug, Default)]
pub struct StatsCounter {
    total: AtomicU64,
    in_flight: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl StatsCounter {
    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> RunStats {
        RunStats {
            total: self.total.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    fn start(&self) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    /// Count jobs that never got an outcome as failed; nothing is in flight any more
    fn abandon(&self, lost: u64) {
        self.in_flight.store(0, Ordering::Relaxed);
        self.failed.fetch_add(lost, Ordering::Relaxed);
    }

    fn finish(&self, outcome: &UploadOutcome) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        if outcome.is_success() {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Settings every worker needs to mint policies
#[derive(Debug, Clone)]
struct PolicySettings {
    bucket: String,
    overwrite: bool,
    expiry: Duration,
}

impl PolicySettings {
    fn mint(&self, key: &str) -> UploadPolicy {
        UploadPolicy::for_key(&self.bucket, key, self.overwrite, self.expiry)
    }
}

/// Fixed-size upload worker pool
pub struct Dispatcher {
    store: Arc<dyn ObjectStore>,
    policy: PolicySettings,
    workers: usize,
    stats: Arc<StatsCounter>,
    progress: ProgressTracker,
}

impl Dispatcher {
    /// Create a dispatcher writing to `store` with the configured worker count
    pub fn new(store: Arc<dyn ObjectStore>, config: &Config) -> Self {
        let policy = PolicySettings {
            bucket: store.bucket(),
            overwrite: config.overwrite,
            expiry: config.token_expiry(),
        };
        Self {
            store,
            policy,
            workers: config.workers,
            stats: Arc::new(StatsCounter::default()),
            progress: ProgressTracker::hidden(),
        }
    }

    /// Report progress to a tracker
    pub fn with_progress(mut self, progress: ProgressTracker) -> Self {
        self.progress = progress;
        self
    }

    /// Shared counters, readable while the pool runs
    pub fn stats(&self) -> Arc<StatsCounter> {
        Arc::clone(&self.stats)
    }

    /// Upload every job, returning exactly one outcome per job
    pub async fn run(&self, jobs: Vec<UploadJob>) -> Vec<UploadOutcome> {
        let total = jobs.len();
        if total == 0 {
            return Vec::new();
        }

        let queue = Arc::new(SegQueue::new());
        for (index, job) in jobs.iter().cloned().enumerate() {
            queue.push((index, job));
        }
        // Outcomes live outside the workers so a dead worker loses nothing it finished
        let done = Arc::new(SegQueue::new());
        self.stats.total.fetch_add(total as u64, Ordering::Relaxed);

        let workers = resolve_workers(self.workers, total);
        tracing::info!(files = total, workers, bucket = %self.policy.bucket, "Starting upload pool");

        let mut pool = JoinSet::new();
        for id in 0..workers {
            let queue = Arc::clone(&queue);
            let done = Arc::clone(&done);
            let store = Arc::clone(&self.store);
            let stats = Arc::clone(&self.stats);
            let policy = self.policy.clone();
            let progress = self.progress.clone();

            pool.spawn(async move {
                let mut uploaded = 0usize;
                while let Some((index, job)) = queue.pop() {
                    stats.start();
                    progress.update(&stats.snapshot());

                    let outcome = upload_one(store.as_ref(), &policy, job).await;

                    stats.finish(&outcome);
                    progress.update(&stats.snapshot());
                    tracing::trace!(worker = id, key = outcome.remote_key(), "Outcome recorded");
                    done.push((index, outcome));
                    uploaded += 1;
                }
                tracing::debug!(worker = id, uploaded, "Worker finished");
            });
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Upload worker stopped early");
            }
        }

        let mut slots: Vec<Option<UploadOutcome>> = vec![None; total];
        while let Some((index, outcome)) = done.pop() {
            slots[index] = Some(outcome);
        }

        // Jobs held or still queued by a dead worker become failures
        let mut lost = 0u64;
        let outcomes = slots
            .into_iter()
            .zip(jobs)
            .map(|(slot, job)| {
                slot.unwrap_or_else(|| {
                    lost += 1;
                    tracing::error!(file = %job.local_path.display(), key = %job.remote_key, "Upload lost");
                    UploadOutcome::failed(job, LOST_MESSAGE)
                })
            })
            .collect();
        self.stats.abandon(lost);

        outcomes
    }
}

async fn upload_one(
    store: &dyn ObjectStore,
    policy: &PolicySettings,
    job: UploadJob,
) -> UploadOutcome {
    let grant = policy.mint(&job.remote_key);

    match store
        .put_file(&grant, &job.remote_key, &job.local_path)
        .await
    {
        Ok(()) => {
            tracing::debug!(file = %job.local_path.display(), key = %job.remote_key, "Uploaded");
            UploadOutcome::uploaded(job)
        }
        Err(Error::AlreadyExists { .. }) => {
            tracing::info!(key = %job.remote_key, "Object exists, skipped");
            UploadOutcome::skipped(job)
        }
        Err(e) => {
            tracing::error!(
                file = %job.local_path.display(),
                key = %job.remote_key,
                error = %e,
                "Upload failed"
            );
            let message = e.to_string();
            UploadOutcome::failed(job, message)
        }
    }
}
