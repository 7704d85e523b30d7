//! Batch Job Runner
//!
//! Iterates a target list in input order and runs one operation per
//! target inside an isolated failure boundary: a failing target becomes
//! a `Failure` entry and the loop moves on. Progress is reported after
//! every item, cancellation is honored between items (the partial report
//! is still persisted), and the final report lands in the object store
//! under `batch_results/<kind>/<job_id>.json`.

use crate::application::inference::InferenceService;
use crate::domain::errors::{BatchError, StoreError, TargetError};
use crate::domain::jobs::{
    BatchOutcome, BatchPayload, BatchReport, BatchResultEntry, CancelToken, CleaningSummary,
    JobKind, ProgressTracker,
};
use crate::domain::model::ModelKind;
use crate::domain::ports::{ObjectStore, ProgressSink, RecordSource};
use crate::domain::records::Window;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// What to do with each target of a batch job.
#[derive(Debug, Clone)]
pub enum BatchJobKind {
    Predict { model: ModelKind },
    ProcessData { dataset: String },
}

impl BatchJobKind {
    pub fn job_kind(&self) -> JobKind {
        match self {
            Self::Predict { .. } => JobKind::BatchPredict,
            Self::ProcessData { .. } => JobKind::ProcessData,
        }
    }

    pub fn model(&self) -> Option<ModelKind> {
        match self {
            Self::Predict { model } => Some(*model),
            Self::ProcessData { .. } => None,
        }
    }
}

pub struct BatchRunner {
    inference: Arc<InferenceService>,
    source: Arc<dyn RecordSource>,
    objects: Arc<dyn ObjectStore>,
    window: Window,
}

impl BatchRunner {
    pub fn new(
        inference: Arc<InferenceService>,
        source: Arc<dyn RecordSource>,
        objects: Arc<dyn ObjectStore>,
        window: Window,
    ) -> Self {
        Self {
            inference,
            source,
            objects,
            window,
        }
    }

    /// Run one batch job over `targets`. `Err` only for job-fatal
    /// conditions (cancellation, report persistence failure); per-target
    /// failures are entries inside the `Ok` report.
    pub async fn run(
        &self,
        job_id: Uuid,
        kind: BatchJobKind,
        targets: Vec<String>,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<BatchReport, BatchError> {
        let started_at = Utc::now();
        let total = targets.len();
        let mut tracker = ProgressTracker::new(total + 1);
        let mut entries: Vec<BatchResultEntry> = Vec::with_capacity(total);

        info!(
            "Batch job {} ({}) started over {} targets",
            job_id,
            kind.job_kind(),
            total
        );

        for (index, target) in targets.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(
                    "Batch job {} cancelled after {} of {} targets",
                    job_id, index, total
                );
                let report = build_report(job_id, &kind, started_at, total, entries);
                if let Err(e) = self.store_report(&report).await {
                    error!("Failed to persist partial batch report: {}", e);
                }
                sink.update(tracker.fail(format!(
                    "cancelled after {} of {} targets",
                    index, total
                )))
                .await;
                return Err(BatchError::Cancelled {
                    completed: index,
                    total,
                });
            }

            let outcome = match self.execute(&kind, target).await {
                Ok(payload) => BatchOutcome::Success { payload },
                Err(e) => {
                    warn!("Batch target {} failed: {}", target, e);
                    BatchOutcome::Failure {
                        error: e.to_string(),
                    }
                }
            };
            entries.push(BatchResultEntry {
                target_id: target.clone(),
                outcome,
            });
            sink.update(tracker.stage(
                index + 1,
                format!("processed target {} ({}/{})", target, index + 1, total),
            ))
            .await;
        }

        let report = build_report(job_id, &kind, started_at, total, entries);
        sink.update(tracker.stage(total + 1, "persisting batch report"))
            .await;
        if let Err(e) = self.store_report(&report).await {
            error!("Failed to persist batch report: {}", e);
            sink.update(tracker.fail(format!("report persistence failed: {}", e)))
                .await;
            return Err(BatchError::ReportPersist(e));
        }

        info!(
            "Batch job {} complete: {} succeeded, {} failed",
            job_id, report.succeeded, report.failed
        );
        sink.update(tracker.succeed(format!(
            "{} of {} targets succeeded",
            report.succeeded, total
        )))
        .await;
        Ok(report)
    }

    async fn execute(&self, kind: &BatchJobKind, target: &str) -> Result<BatchPayload, TargetError> {
        match kind {
            BatchJobKind::Predict { model } => {
                let records = self.source.fetch(target, *model, self.window).await?;
                let result = self.inference.predict(&records.into_request()).await?;
                Ok(BatchPayload::Prediction(result))
            }
            BatchJobKind::ProcessData { dataset } => {
                let summary = self.clean_dataset(target, dataset).await?;
                Ok(BatchPayload::Cleaning(summary))
            }
        }
    }

    /// Load a raw dataset, drop records that are not objects or that carry
    /// null or non-finite fields, and store the survivors.
    async fn clean_dataset(
        &self,
        target: &str,
        dataset: &str,
    ) -> Result<CleaningSummary, TargetError> {
        let raw_key = format!("raw_data/{}/{}.json", target, dataset);
        let bytes = self.objects.get(&raw_key).await?;
        let records: Vec<Value> =
            serde_json::from_slice(&bytes).map_err(|e| TargetError::Malformed {
                reason: format!("{}: {}", raw_key, e),
            })?;

        let total = records.len();
        let kept: Vec<Value> = records.into_iter().filter(is_clean_record).collect();
        let summary = CleaningSummary {
            total,
            kept: kept.len(),
            dropped: total - kept.len(),
        };

        let out_key = format!("processed_data/{}/{}.json", target, dataset);
        let out = serde_json::to_vec(&kept).map_err(|e| StoreError::Serialize {
            key: out_key.clone(),
            reason: e.to_string(),
        })?;
        self.objects.put(&out_key, out).await?;
        Ok(summary)
    }

    async fn store_report(&self, report: &BatchReport) -> Result<(), StoreError> {
        let key = format!(
            "batch_results/{}/{}.json",
            report.kind.as_str(),
            report.job_id
        );
        let bytes = serde_json::to_vec(report).map_err(|e| StoreError::Serialize {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.objects.put(&key, bytes).await
    }
}

fn build_report(
    job_id: Uuid,
    kind: &BatchJobKind,
    started_at: DateTime<Utc>,
    total: usize,
    entries: Vec<BatchResultEntry>,
) -> BatchReport {
    let succeeded = entries
        .iter()
        .filter(|e| matches!(e.outcome, BatchOutcome::Success { .. }))
        .count();
    let failed = entries.len() - succeeded;
    BatchReport {
        job_id,
        kind: kind.job_kind(),
        model: kind.model(),
        started_at,
        finished_at: Utc::now(),
        total_targets: total,
        succeeded,
        failed,
        entries,
    }
}

fn is_clean_record(record: &Value) -> bool {
    let Some(fields) = record.as_object() else {
        return false;
    };
    fields.values().all(|value| match value {
        Value::Null => false,
        Value::Number(n) => n.as_f64().map(|f| f.is_finite()).unwrap_or(true),
        _ => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_record_rules() {
        assert!(is_clean_record(&json!({"reading": 4.2, "unit": "kWh"})));
        assert!(is_clean_record(&json!({})));
        assert!(!is_clean_record(&json!({"reading": null})));
        assert!(!is_clean_record(&json!([1, 2, 3])));
        assert!(!is_clean_record(&json!("loose string")));
    }

    #[test]
    fn test_job_kind_mapping() {
        let predict = BatchJobKind::Predict {
            model: ModelKind::Risk,
        };
        assert_eq!(predict.job_kind(), JobKind::BatchPredict);
        assert_eq!(predict.model(), Some(ModelKind::Risk));

        let process = BatchJobKind::ProcessData {
            dataset: "sensor_readings".into(),
        };
        assert_eq!(process.job_kind(), JobKind::ProcessData);
        assert_eq!(process.model(), None);
    }

    #[test]
    fn test_report_counts_follow_entries() {
        let entries = vec![
            BatchResultEntry {
                target_id: "a".into(),
                outcome: BatchOutcome::Success {
                    payload: BatchPayload::Cleaning(CleaningSummary {
                        total: 3,
                        kept: 3,
                        dropped: 0,
                    }),
                },
            },
            BatchResultEntry {
                target_id: "b".into(),
                outcome: BatchOutcome::Failure {
                    error: "no raw data".into(),
                },
            },
        ];
        let kind = BatchJobKind::ProcessData {
            dataset: "sensor_readings".into(),
        };
        let report = build_report(Uuid::new_v4(), &kind, Utc::now(), 2, entries);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total_targets, 2);
    }
}
