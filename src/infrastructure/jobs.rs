//! In-process job dispatch
//!
//! Stand-in for an external task queue: every spawned job is registered
//! here with its latest progress snapshot and a cancellation token, so
//! callers can observe and cancel runs by id. Job bodies report through
//! `DispatchSink`, which writes snapshots back into this tracker.

use crate::domain::jobs::{CancelToken, JobKind, JobProgress, JobState};
use crate::domain::ports::ProgressSink;
use crate::infrastructure::observability::Metrics;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Latest observed state of one dispatched job.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrackedJob {
    pub id: Uuid,
    pub kind: JobKind,
    pub submitted_at: DateTime<Utc>,
    pub progress: JobProgress,
}

struct Tracked {
    job: TrackedJob,
    cancel: CancelToken,
}

/// Registry of every job submitted in this process.
pub struct JobDispatcher {
    jobs: RwLock<HashMap<Uuid, Tracked>>,
    metrics: Metrics,
}

impl JobDispatcher {
    pub fn new(metrics: Metrics) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    /// Register a new job and hand back its id and cancellation token.
    pub async fn register(&self, kind: JobKind) -> (Uuid, CancelToken) {
        let id = Uuid::new_v4();
        let cancel = CancelToken::new();
        let tracked = Tracked {
            job: TrackedJob {
                id,
                kind,
                submitted_at: Utc::now(),
                progress: JobProgress::queued(),
            },
            cancel: cancel.clone(),
        };
        self.jobs.write().await.insert(id, tracked);
        self.metrics
            .jobs_active
            .with_label_values(&[kind.as_str()])
            .inc();
        info!("Job {} ({}) registered", id, kind);
        (id, cancel)
    }

    /// Record a progress snapshot for a job. The first terminal snapshot
    /// settles the job's metrics; anything after it is ignored.
    pub async fn record(&self, id: Uuid, progress: JobProgress) {
        let mut jobs = self.jobs.write().await;
        let Some(tracked) = jobs.get_mut(&id) else {
            debug!("Progress update for unknown job {}", id);
            return;
        };
        if tracked.job.progress.is_terminal() {
            return;
        }
        if progress.is_terminal() {
            let status = match progress.state {
                JobState::Succeeded => "succeeded",
                _ => "failed",
            };
            self.metrics
                .jobs_active
                .with_label_values(&[tracked.job.kind.as_str()])
                .dec();
            self.metrics.inc_job(tracked.job.kind.as_str(), status);
            info!("Job {} ({}) finished: {}", id, tracked.job.kind, status);
        }
        tracked.job.progress = progress;
    }

    /// Latest progress for one job, if it exists.
    pub async fn progress(&self, id: Uuid) -> Option<JobProgress> {
        self.jobs
            .read()
            .await
            .get(&id)
            .map(|t| t.job.progress.clone())
    }

    /// Snapshot of every tracked job, newest submission first.
    pub async fn snapshot(&self) -> Vec<TrackedJob> {
        let mut jobs: Vec<TrackedJob> = self
            .jobs
            .read()
            .await
            .values()
            .map(|t| t.job.clone())
            .collect();
        jobs.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        jobs
    }

    /// Request cancellation. Takes effect at the job's next stage
    /// boundary; returns false for unknown ids.
    pub async fn cancel(&self, id: Uuid) -> bool {
        match self.jobs.read().await.get(&id) {
            Some(tracked) => {
                tracked.cancel.cancel();
                warn!("Job {} ({}) cancellation requested", id, tracked.job.kind);
                true
            }
            None => false,
        }
    }

    /// Whether any job of this kind has not yet reached a terminal state.
    /// The scheduling loop uses this to serialize retraining runs.
    pub async fn is_active(&self, kind: JobKind) -> bool {
        self.jobs
            .read()
            .await
            .values()
            .any(|t| t.job.kind == kind && !t.job.progress.is_terminal())
    }
}

/// `ProgressSink` that writes back into the dispatcher.
#[derive(Clone)]
pub struct DispatchSink {
    dispatcher: Arc<JobDispatcher>,
    id: Uuid,
}

impl DispatchSink {
    pub fn new(dispatcher: Arc<JobDispatcher>, id: Uuid) -> Self {
        Self { dispatcher, id }
    }
}

#[async_trait]
impl ProgressSink for DispatchSink {
    async fn update(&self, progress: JobProgress) {
        self.dispatcher.record(self.id, progress).await;
    }
}

/// `ProgressSink` that only logs; used by the command-line entrypoints.
pub struct LogSink;

#[async_trait]
impl ProgressSink for LogSink {
    async fn update(&self, progress: JobProgress) {
        match &progress.error {
            Some(error) => warn!(
                "[{}/{}] {}",
                progress.stage, progress.total_stages, error
            ),
            None => info!(
                "[{}/{}] {}",
                progress.stage, progress.total_stages, progress.message
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::jobs::ProgressTracker;

    #[tokio::test]
    async fn test_register_and_observe() {
        let dispatcher = JobDispatcher::new(Metrics::default());
        let (id, _cancel) = dispatcher.register(JobKind::Retrain).await;

        let progress = dispatcher.progress(id).await.expect("job should exist");
        assert_eq!(progress.state, JobState::Pending);
        assert!(dispatcher.is_active(JobKind::Retrain).await);
        assert!(!dispatcher.is_active(JobKind::BatchPredict).await);
    }

    #[tokio::test]
    async fn test_terminal_snapshot_settles_job() {
        let dispatcher = JobDispatcher::new(Metrics::default());
        let (id, _cancel) = dispatcher.register(JobKind::BatchPredict).await;

        let mut tracker = ProgressTracker::new(2);
        dispatcher.record(id, tracker.stage(1, "working")).await;
        assert!(dispatcher.is_active(JobKind::BatchPredict).await);

        dispatcher.record(id, tracker.succeed("done")).await;
        assert!(!dispatcher.is_active(JobKind::BatchPredict).await);

        // Later updates cannot reopen a settled job.
        let mut other = ProgressTracker::new(2);
        dispatcher.record(id, other.fail("late")).await;
        let progress = dispatcher.progress(id).await.unwrap();
        assert_eq!(progress.state, JobState::Succeeded);
    }

    #[tokio::test]
    async fn test_cancel_flips_token() {
        let dispatcher = JobDispatcher::new(Metrics::default());
        let (id, cancel) = dispatcher.register(JobKind::ProcessData).await;
        assert!(!cancel.is_cancelled());

        assert!(dispatcher.cancel(id).await);
        assert!(cancel.is_cancelled());
        assert!(!dispatcher.cancel(Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn test_snapshot_lists_jobs() {
        let dispatcher = JobDispatcher::new(Metrics::default());
        dispatcher.register(JobKind::Retrain).await;
        dispatcher.register(JobKind::BatchPredict).await;
        assert_eq!(dispatcher.snapshot().await.len(), 2);
    }
}
