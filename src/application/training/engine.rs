//! Retraining Orchestrator
//!
//! Staged run over the four model domains: initialize, collect training
//! data once, fit each domain in fixed order, persist what fitted.
//! Collection failure aborts before any registry mutation; a single
//! domain's fit or persist failure is isolated and the remaining domains
//! still proceed. Every stage boundary reports progress and honors
//! cancellation.

use crate::application::registry::ModelRegistry;
use crate::application::training::fit::{self, ForestParams};
use crate::domain::errors::{PersistError, RetrainError, SourceError, StoreError};
use crate::domain::jobs::{
    CancelToken, DomainOutcome, FitOutcome, PersistOutcome, ProgressTracker, RetrainReport,
};
use crate::domain::model::{ModelEntry, ModelKind, ModelVersion};
use crate::domain::ports::{ObjectStore, ProgressSink, RecordSource};
use crate::domain::records::{TrainingBatch, Window};
use crate::infrastructure::model_store::ModelStore;
use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Stage count: initializing, collecting, one fit per domain, persisting.
const RUN_STAGES: usize = 3 + ModelKind::ALL.len();

#[derive(Debug, Clone)]
pub struct RetrainSettings {
    pub cohort_size: usize,
    pub window: Window,
    pub forest: ForestParams,
}

impl Default for RetrainSettings {
    fn default() -> Self {
        Self {
            cohort_size: 10,
            window: Window::default(),
            forest: ForestParams::default(),
        }
    }
}

pub struct RetrainEngine {
    registry: Arc<ModelRegistry>,
    models: ModelStore,
    objects: Arc<dyn ObjectStore>,
    source: Arc<dyn RecordSource>,
    settings: RetrainSettings,
}

impl RetrainEngine {
    pub fn new(
        registry: Arc<ModelRegistry>,
        models: ModelStore,
        objects: Arc<dyn ObjectStore>,
        source: Arc<dyn RecordSource>,
        settings: RetrainSettings,
    ) -> Self {
        Self {
            registry,
            models,
            objects,
            source,
            settings,
        }
    }

    /// Execute one retraining run. Returns the run report; `Err` only for
    /// run-fatal conditions (collection failure, cancellation, report
    /// persistence failure). Per-domain failures live inside the report,
    /// and the job is finalized Failed whenever any of them occurred.
    pub async fn run(
        &self,
        targets: Option<Vec<String>>,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<RetrainReport, RetrainError> {
        let started_at = Utc::now();
        let run_date = started_at.date_naive();
        let mut tracker = ProgressTracker::new(RUN_STAGES);

        sink.update(tracker.stage(1, "initializing retraining run"))
            .await;
        let targets = targets.unwrap_or_else(|| default_cohort(self.settings.cohort_size));
        info!(
            "Retraining run started: {} targets, window {} days",
            targets.len(),
            self.settings.window.days
        );

        self.checkpoint(cancel, "initializing", &mut tracker, sink)
            .await?;
        sink.update(tracker.stage(
            2,
            format!("collecting training data from {} targets", targets.len()),
        ))
        .await;
        let batch = match self.collect(&targets).await {
            Ok(batch) => batch,
            Err(e) => {
                error!("Training data collection failed: {}", e);
                sink.update(tracker.fail(format!("data collection failed: {}", e)))
                    .await;
                return Err(RetrainError::Collection(e));
            }
        };

        let mut outcomes: Vec<DomainOutcome> = Vec::with_capacity(ModelKind::ALL.len());
        let mut fitted: Vec<Arc<ModelEntry>> = Vec::new();
        for (index, kind) in ModelKind::ALL.into_iter().enumerate() {
            self.checkpoint(cancel, &format!("fitting {}", kind), &mut tracker, sink)
                .await?;
            sink.update(tracker.stage(3 + index, format!("fitting {} model", kind)))
                .await;

            let examples = batch.domain(kind);
            let previous = self.registry.get(kind).await.ok();
            let version = next_version(previous.as_ref().map(|e| &e.version), run_date);
            match fit::fit_domain(kind, examples, self.settings.forest, version) {
                Ok(entry) => {
                    let fit_outcome = FitOutcome::Fitted {
                        version: entry.version.clone(),
                        examples: examples.len(),
                    };
                    // Publish immediately; later domains' failures never
                    // roll this back.
                    self.registry.swap(entry).await;
                    if let Ok(active) = self.registry.get(kind).await {
                        fitted.push(active);
                    }
                    outcomes.push(DomainOutcome {
                        model: kind,
                        fit: fit_outcome,
                        persist: None,
                    });
                }
                Err(e) => {
                    warn!(
                        "Fitting {} failed, previous entry keeps serving: {}",
                        kind, e
                    );
                    outcomes.push(DomainOutcome {
                        model: kind,
                        fit: FitOutcome::Failed {
                            error: e.to_string(),
                        },
                        persist: None,
                    });
                }
            }
        }

        self.checkpoint(cancel, "persisting", &mut tracker, sink)
            .await?;
        sink.update(tracker.stage(RUN_STAGES, format!("persisting {} models", fitted.len())))
            .await;
        self.persist_fitted(&fitted, &mut outcomes).await;

        let report = RetrainReport {
            run_date,
            started_at,
            finished_at: Utc::now(),
            cohort_size: targets.len(),
            domains: outcomes,
        };

        if let Err(e) = self.store_report(&report, run_date).await {
            error!("Failed to persist retraining report: {}", e);
            sink.update(tracker.fail(format!("report persistence failed: {}", e)))
                .await;
            return Err(RetrainError::ReportPersist(e));
        }

        match report.failure_summary() {
            None => {
                info!(
                    "Retraining run complete: {} models republished",
                    report.domains.len()
                );
                sink.update(tracker.succeed("all models retrained and persisted"))
                    .await;
            }
            Some(summary) => {
                warn!("Retraining run finished with failures: {}", summary);
                sink.update(tracker.fail(format!("run finished with failures: {}", summary)))
                    .await;
            }
        }

        Ok(report)
    }

    /// One pass over the targets, filling all four domains' records so raw
    /// data is never re-fetched per model.
    async fn collect(&self, targets: &[String]) -> Result<TrainingBatch, SourceError> {
        let mut batch = TrainingBatch::default();
        for target in targets {
            for kind in ModelKind::ALL {
                let records = self.source.fetch(target, kind, self.settings.window).await?;
                batch.push(records);
            }
        }
        Ok(batch)
    }

    async fn persist_fitted(
        &self,
        fitted: &[Arc<ModelEntry>],
        outcomes: &mut [DomainOutcome],
    ) {
        let saves = fitted.iter().map(|entry| {
            let models = &self.models;
            async move { (entry.name, models.save(entry).await) }
        });
        for (name, result) in join_all(saves).await {
            let persist = match result {
                Ok(()) => PersistOutcome::Saved,
                Err(e) => {
                    let persist_error = PersistError {
                        model: name,
                        source: e,
                    };
                    error!("{}", persist_error);
                    PersistOutcome::Failed {
                        error: persist_error.to_string(),
                    }
                }
            };
            if let Some(outcome) = outcomes.iter_mut().find(|o| o.model == name) {
                outcome.persist = Some(persist);
            }
        }
    }

    async fn store_report(
        &self,
        report: &RetrainReport,
        run_date: NaiveDate,
    ) -> Result<(), StoreError> {
        let key = format!(
            "retraining_results/{}/results.json",
            run_date.format("%Y%m%d")
        );
        let bytes = serde_json::to_vec(report).map_err(|e| StoreError::Serialize {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.objects.put(&key, bytes).await
    }

    async fn checkpoint(
        &self,
        cancel: &CancelToken,
        stage: &str,
        tracker: &mut ProgressTracker,
        sink: &dyn ProgressSink,
    ) -> Result<(), RetrainError> {
        if cancel.is_cancelled() {
            warn!("Retraining cancelled at the {} boundary", stage);
            sink.update(tracker.fail(format!("cancelled during {}", stage)))
                .await;
            return Err(RetrainError::Cancelled {
                stage: stage.to_string(),
            });
        }
        Ok(())
    }
}

/// Generated targets used when no explicit list is given.
pub fn default_cohort(size: usize) -> Vec<String> {
    (0..size).map(|i| format!("training-asset-{:03}", i)).collect()
}

/// A retrained model advances the patch of whatever was serving; a domain
/// with no active entry starts one patch above the untrained default, so
/// v1.0.0 always means "never trained".
fn next_version(previous: Option<&ModelVersion>, run_date: NaiveDate) -> ModelVersion {
    match previous {
        Some(version) => version.bump_patch(run_date),
        None => ModelVersion::initial(run_date).bump_patch(run_date),
    }
}
