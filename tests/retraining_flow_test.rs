use assayer::application::registry::ModelRegistry;
use assayer::application::training::{ForestParams, RetrainEngine, RetrainSettings};
use assayer::domain::errors::{RetrainError, SourceError};
use assayer::domain::jobs::{CancelToken, FitOutcome, JobProgress, JobState, RetrainReport};
use assayer::domain::model::ModelKind;
use assayer::domain::ports::{ObjectStore, ProgressSink, RecordSource};
use assayer::domain::records::{DomainRecords, Window};
use assayer::infrastructure::{LogSink, MemoryObjectStore, ModelStore, SyntheticSource};

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Sink that records every progress snapshot it receives.
#[derive(Default)]
struct RecordingSink {
    updates: Mutex<Vec<JobProgress>>,
}

impl RecordingSink {
    fn collected(&self) -> Vec<JobProgress> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn update(&self, progress: JobProgress) {
        self.updates.lock().unwrap().push(progress);
    }
}

/// Source serving realistic records except that every risk observation is
/// NaN, so exactly the risk fit fails.
struct PoisonedRiskSource {
    inner: SyntheticSource,
}

#[async_trait]
impl RecordSource for PoisonedRiskSource {
    async fn fetch(
        &self,
        target_id: &str,
        domain: ModelKind,
        window: Window,
    ) -> Result<DomainRecords, SourceError> {
        let records = self.inner.fetch(target_id, domain, window).await?;
        Ok(match records {
            DomainRecords::Risk { inputs, .. } => DomainRecords::Risk {
                inputs,
                observed_score: f64::NAN,
            },
            other => other,
        })
    }
}

/// Source whose upstream is down for every target.
struct UnavailableSource;

#[async_trait]
impl RecordSource for UnavailableSource {
    async fn fetch(
        &self,
        target_id: &str,
        _domain: ModelKind,
        _window: Window,
    ) -> Result<DomainRecords, SourceError> {
        Err(SourceError::Unavailable {
            target: target_id.to_string(),
            reason: "upstream offline".to_string(),
        })
    }
}

fn engine_with(
    source: Arc<dyn RecordSource>,
) -> (RetrainEngine, Arc<ModelRegistry>, Arc<MemoryObjectStore>) {
    let registry = Arc::new(ModelRegistry::default());
    let objects = Arc::new(MemoryObjectStore::new());
    let engine = RetrainEngine::new(
        registry.clone(),
        ModelStore::new(objects.clone()),
        objects.clone(),
        source,
        RetrainSettings {
            cohort_size: 8,
            window: Window::days(30),
            forest: ForestParams {
                trees: 10,
                max_depth: 4,
                min_split: 2,
            },
        },
    );
    (engine, registry, objects)
}

/// Test: A clean run fits all four domains in fixed order, swaps each one
/// in, persists the artifacts plus the run report, and finalizes Succeeded.
#[tokio::test]
async fn test_full_run_retrains_and_persists_every_domain() {
    let (engine, registry, objects) = engine_with(Arc::new(SyntheticSource));
    let sink = RecordingSink::default();

    let report = engine
        .run(None, &sink, &CancelToken::new())
        .await
        .expect("a healthy source should never abort the run");

    // Report: every domain fitted on the full default cohort
    assert!(
        report.fully_succeeded(),
        "run should be clean: {:?}",
        report.failure_summary()
    );
    assert_eq!(report.cohort_size, 8);
    let fitted_order: Vec<ModelKind> = report.domains.iter().map(|d| d.model).collect();
    assert_eq!(fitted_order, ModelKind::ALL.to_vec());
    for domain in &report.domains {
        assert!(
            matches!(domain.fit, FitOutcome::Fitted { examples: 8, .. }),
            "{} should fit on one example per cohort target: {:?}",
            domain.model,
            domain.fit
        );
    }

    // Registry: every domain now serves the freshly trained v1.0.1
    let stamp = report.run_date.format("%Y%m%d").to_string();
    for kind in ModelKind::ALL {
        let entry = registry.get(kind).await.unwrap();
        assert_eq!(entry.version.to_string(), format!("v1.0.1-{}", stamp));
    }

    // Storage: three artifacts per domain plus the run report
    let artifacts = objects.list("models/").await.unwrap();
    assert_eq!(artifacts.len(), 12, "3 artifacts x 4 domains: {:?}", artifacts);
    let report_key = format!("retraining_results/{}/results.json", stamp);
    let stored: RetrainReport =
        serde_json::from_slice(&objects.get(&report_key).await.unwrap()).unwrap();
    assert_eq!(stored.domains.len(), 4);

    // Progress: walked from initialization to a Succeeded terminal stage
    let updates = sink.collected();
    assert_eq!(updates[0].stage, 1);
    assert_eq!(updates[0].message, "initializing retraining run");
    let last = updates.last().unwrap();
    assert_eq!(last.state, JobState::Succeeded);
    assert_eq!(last.stage, last.total_stages);

    println!("✅ Full retraining run: 4 domains fitted, 12 artifacts persisted");
}

/// Test: One domain failing to fit is isolated. The other three still
/// retrain, swap and persist; the poisoned domain publishes nothing and
/// the run finalizes Failed with the domain named in the error.
#[tokio::test]
async fn test_single_domain_failure_keeps_siblings_serving() {
    let (engine, registry, objects) = engine_with(Arc::new(PoisonedRiskSource {
        inner: SyntheticSource,
    }));
    let sink = RecordingSink::default();

    let report = engine
        .run(None, &sink, &CancelToken::new())
        .await
        .expect("a per-domain fit failure must not abort the run");

    assert!(!report.fully_succeeded());
    let risk = report
        .domains
        .iter()
        .find(|d| d.model == ModelKind::Risk)
        .unwrap();
    assert!(
        matches!(&risk.fit, FitOutcome::Failed { error } if error.contains("Non-finite")),
        "risk fit should reject NaN observations: {:?}",
        risk.fit
    );
    assert!(risk.persist.is_none(), "nothing to persist for a failed fit");

    // The three healthy domains were swapped in and persisted
    for kind in [ModelKind::Pricing, ModelKind::Yield, ModelKind::Anomaly] {
        let entry = registry.get(kind).await.unwrap();
        assert_eq!(entry.version.patch, 1, "{} should carry the new patch", kind);
        let artifacts = objects.list(&format!("models/{}/", kind)).await.unwrap();
        assert_eq!(artifacts.len(), 3);
    }

    // Risk never reached the registry or storage
    assert!(registry.get(ModelKind::Risk).await.is_err());
    assert!(objects.list("models/risk/").await.unwrap().is_empty());

    // The run report still landed, and the job finalized Failed
    let report_key = format!(
        "retraining_results/{}/results.json",
        report.run_date.format("%Y%m%d")
    );
    assert!(objects.get(&report_key).await.is_ok());
    let updates = sink.collected();
    let last = updates.last().unwrap();
    assert_eq!(last.state, JobState::Failed);
    assert!(
        last.error.as_deref().unwrap().contains("risk fit"),
        "terminal error should name the failed domain: {:?}",
        last.error
    );

    println!("✅ Risk failure isolated: 3 of 4 domains republished");
}

/// Test: Collection failure aborts the run before any model is touched.
#[tokio::test]
async fn test_collection_failure_aborts_before_any_swap() {
    let (engine, registry, objects) = engine_with(Arc::new(UnavailableSource));
    let sink = RecordingSink::default();

    let err = engine
        .run(None, &sink, &CancelToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RetrainError::Collection(_)), "got {:?}", err);
    assert!(
        registry.inventory().await.is_empty(),
        "no entry may be swapped in"
    );
    assert!(
        objects.list("").await.unwrap().is_empty(),
        "nothing may be persisted"
    );

    let updates = sink.collected();
    let last = updates.last().unwrap();
    assert_eq!(last.state, JobState::Failed);
    assert_eq!(last.stage, 2, "the run died while collecting");
    assert!(
        last.error
            .as_deref()
            .unwrap()
            .contains("data collection failed")
    );
}

/// Test: A token cancelled before the run starts stops it at the very
/// first boundary, leaving registry and storage untouched.
#[tokio::test]
async fn test_cancelled_run_stops_at_the_first_boundary() {
    let (engine, registry, objects) = engine_with(Arc::new(SyntheticSource));
    let sink = RecordingSink::default();
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = engine.run(None, &sink, &cancel).await.unwrap_err();

    assert!(
        matches!(&err, RetrainError::Cancelled { stage } if stage == "initializing"),
        "got {:?}",
        err
    );
    assert!(registry.inventory().await.is_empty());
    assert!(objects.list("").await.unwrap().is_empty());

    let updates = sink.collected();
    let last = updates.last().unwrap();
    assert_eq!(last.state, JobState::Failed);
    assert!(
        last.error
            .as_deref()
            .unwrap()
            .contains("cancelled during initializing")
    );
}

/// Test: Versions advance one patch per run, stamped with the run date.
#[tokio::test]
async fn test_each_run_bumps_the_patch_version() {
    let (engine, registry, _objects) = engine_with(Arc::new(SyntheticSource));

    let first = engine
        .run(None, &LogSink, &CancelToken::new())
        .await
        .unwrap();
    assert!(first.fully_succeeded());
    let second = engine
        .run(None, &LogSink, &CancelToken::new())
        .await
        .unwrap();
    assert!(second.fully_succeeded());

    let stamp = second.run_date.format("%Y%m%d").to_string();
    for kind in ModelKind::ALL {
        let entry = registry.get(kind).await.unwrap();
        assert_eq!(
            entry.version.to_string(),
            format!("v1.0.2-{}", stamp),
            "{} should be two patches past the untrained default",
            kind
        );
    }
}

/// Test: An explicit target list replaces the generated cohort, and the
/// per-domain example counts follow it.
#[tokio::test]
async fn test_explicit_targets_replace_the_default_cohort() {
    let (engine, _registry, _objects) = engine_with(Arc::new(SyntheticSource));
    let targets = vec![
        "plant-north".to_string(),
        "plant-south".to_string(),
        "plant-east".to_string(),
        "plant-west".to_string(),
    ];

    let report = engine
        .run(Some(targets), &LogSink, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.cohort_size, 4);
    for domain in &report.domains {
        assert!(
            matches!(domain.fit, FitOutcome::Fitted { examples: 4, .. }),
            "{} should see exactly one example per explicit target: {:?}",
            domain.model,
            domain.fit
        );
    }
}
