use crate::domain::model::{ModelKind, ModelVersion};
use crate::domain::prediction::PredictionResult;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Job names accepted by the dispatch layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Retrain,
    BatchPredict,
    ProcessData,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Retrain => "retrain",
            JobKind::BatchPredict => "batch_predict",
            JobKind::ProcessData => "process_data",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// Read-only snapshot of a job's progress. Observers only ever see these;
/// the mutable cell behind them is owned by the running job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgress {
    pub stage: usize,
    pub total_stages: usize,
    pub message: String,
    pub state: JobState,
    pub error: Option<String>,
}

impl JobProgress {
    /// State of a registered job before its body reports anything.
    pub fn queued() -> Self {
        Self {
            stage: 0,
            total_stages: 0,
            message: "queued".to_string(),
            state: JobState::Pending,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, JobState::Succeeded | JobState::Failed)
    }
}

/// The single mutable progress cell for one run. Only the job body holds
/// it; every mutation hands back a snapshot for the progress sink. Once
/// finalized the cell is frozen and later calls return the final snapshot
/// unchanged.
#[derive(Debug)]
pub struct ProgressTracker {
    progress: JobProgress,
    finalized: bool,
}

impl ProgressTracker {
    pub fn new(total_stages: usize) -> Self {
        Self {
            progress: JobProgress {
                stage: 0,
                total_stages,
                message: "pending".to_string(),
                state: JobState::Pending,
                error: None,
            },
            finalized: false,
        }
    }

    pub fn snapshot(&self) -> JobProgress {
        self.progress.clone()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Enter a stage. Marks the job Running on first use.
    pub fn stage(&mut self, stage: usize, message: impl Into<String>) -> JobProgress {
        if !self.finalized {
            self.progress.stage = stage;
            self.progress.message = message.into();
            self.progress.state = JobState::Running;
        }
        self.snapshot()
    }

    pub fn succeed(&mut self, message: impl Into<String>) -> JobProgress {
        if !self.finalized {
            self.progress.stage = self.progress.total_stages;
            self.progress.message = message.into();
            self.progress.state = JobState::Succeeded;
            self.finalized = true;
        }
        self.snapshot()
    }

    pub fn fail(&mut self, error: impl Into<String>) -> JobProgress {
        if !self.finalized {
            let error = error.into();
            self.progress.message = error.clone();
            self.progress.error = Some(error);
            self.progress.state = JobState::Failed;
            self.finalized = true;
        }
        self.snapshot()
    }
}

/// Cooperative cancellation flag, checked at stage boundaries only. Work
/// already in flight (a fit, a batch item) always runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// One batch item's outcome, independent of its siblings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResultEntry {
    pub target_id: String,
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Success { payload: BatchPayload },
    #[serde(rename = "failed")]
    Failure { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPayload {
    Prediction(PredictionResult),
    Cleaning(CleaningSummary),
}

/// Counts from one data-processing item: records seen, records kept after
/// dropping malformed/null/non-finite ones.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CleaningSummary {
    pub total: usize,
    pub kept: usize,
    pub dropped: usize,
}

/// Durable summary of one batch run, persisted under
/// `batch_results/<kind>/<job_id>.json`. `entries.len()` shorter than
/// `total_targets` means the run was cancelled partway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub job_id: Uuid,
    pub kind: JobKind,
    pub model: Option<ModelKind>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_targets: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub entries: Vec<BatchResultEntry>,
}

/// Durable summary of one retraining run, persisted under
/// `retraining_results/<YYYYMMDD>/results.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainReport {
    pub run_date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cohort_size: usize,
    pub domains: Vec<DomainOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainOutcome {
    pub model: ModelKind,
    pub fit: FitOutcome,
    /// None when fitting failed, so there was nothing to persist.
    pub persist: Option<PersistOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FitOutcome {
    Fitted {
        version: ModelVersion,
        examples: usize,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PersistOutcome {
    Saved,
    Failed { error: String },
}

impl DomainOutcome {
    pub fn fit_ok(&self) -> bool {
        matches!(self.fit, FitOutcome::Fitted { .. })
    }

    pub fn persist_ok(&self) -> bool {
        matches!(self.persist, Some(PersistOutcome::Saved))
    }
}

impl RetrainReport {
    /// True only when every domain fitted and persisted.
    pub fn fully_succeeded(&self) -> bool {
        self.domains.iter().all(|d| d.fit_ok() && d.persist_ok())
    }

    /// Human-readable list of what went wrong, or None for a clean run.
    pub fn failure_summary(&self) -> Option<String> {
        let mut parts = Vec::new();
        for domain in &self.domains {
            if let FitOutcome::Failed { error } = &domain.fit {
                parts.push(format!("{} fit: {}", domain.model, error));
            }
            if let Some(PersistOutcome::Failed { error }) = &domain.persist {
                parts.push(format!("{} persist: {}", domain.model, error));
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}
