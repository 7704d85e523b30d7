//! Application composition
//!
//! Wires the registry, stores, data source, inference service, training
//! engine and batch runner into one process-wide system. `build` constructs
//! the pieces, `bootstrap` restores persisted models, and the spawn methods
//! hand jobs to the dispatcher so callers can observe and cancel them.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::batch::{BatchJobKind, BatchRunner};
use crate::application::inference::InferenceService;
use crate::application::registry::ModelRegistry;
use crate::application::training::{RetrainEngine, default_cohort};
use crate::config::Config;
use crate::domain::jobs::JobKind;
use crate::domain::model::{ModelKind, ModelVersion};
use crate::domain::ports::{ObjectStore, RecordSource};
use crate::infrastructure::jobs::{DispatchSink, JobDispatcher};
use crate::infrastructure::memory_store::MemoryObjectStore;
use crate::infrastructure::model_store::ModelStore;
use crate::infrastructure::observability::Metrics;
use crate::infrastructure::synthetic::{self, SyntheticSource};

/// Dataset id used when seeding demo raw records at startup.
pub const DEMO_DATASET: &str = "demo";

pub struct Application {
    pub config: Config,
    pub metrics: Metrics,
    pub objects: Arc<dyn ObjectStore>,
    pub models: ModelStore,
    pub registry: Arc<ModelRegistry>,
    pub source: Arc<dyn RecordSource>,
    pub inference: Arc<InferenceService>,
    pub dispatcher: Arc<JobDispatcher>,
    pub engine: Arc<RetrainEngine>,
    pub runner: Arc<BatchRunner>,
}

/// Shared components handed to the entrypoint after `start`.
pub struct SystemHandle {
    pub metrics: Metrics,
    pub registry: Arc<ModelRegistry>,
    pub dispatcher: Arc<JobDispatcher>,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self> {
        info!("Building Assayer application...");

        // 1. Metrics and storage
        let metrics = Metrics::new().context("Failed to create metrics")?;
        let objects: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let models = ModelStore::new(objects.clone());

        // 2. Model serving
        let registry = Arc::new(ModelRegistry::new(metrics.clone()));
        let inference = Arc::new(InferenceService::new(
            registry.clone(),
            metrics.clone(),
            config.yield_noise_pct,
        ));

        // 3. Data source and job execution
        let source: Arc<dyn RecordSource> = Arc::new(SyntheticSource::default());
        let dispatcher = Arc::new(JobDispatcher::new(metrics.clone()));
        let engine = Arc::new(RetrainEngine::new(
            registry.clone(),
            models.clone(),
            objects.clone(),
            source.clone(),
            config.retrain_settings(),
        ));
        let runner = Arc::new(BatchRunner::new(
            inference.clone(),
            source.clone(),
            objects.clone(),
            config.window(),
        ));

        Ok(Self {
            config,
            metrics,
            objects,
            models,
            registry,
            source,
            inference,
            dispatcher,
            engine,
            runner,
        })
    }

    /// Restore persisted models into the registry, installing an untrained
    /// default for every domain the store cannot produce. An empty store is
    /// the normal first-boot state, so misses are not fatal.
    pub async fn bootstrap(&self) -> Result<()> {
        let today = Utc::now().date_naive();
        for kind in ModelKind::ALL {
            match self.models.load(kind).await {
                Ok(entry) => {
                    self.registry.swap(entry).await;
                }
                Err(e) => {
                    warn!("No usable {} model in the store: {}", kind, e);
                    self.registry.initialize_default(kind, today).await;
                }
            }
        }
        for (kind, version) in self.inventory().await {
            info!("Serving {} at {}", kind, version);
        }

        if self.config.seed_demo_data {
            let targets = default_cohort(self.config.cohort_size);
            synthetic::seed_raw_records(self.objects.as_ref(), &targets, DEMO_DATASET)
                .await
                .context("Failed to seed demo raw records")?;
        }
        Ok(())
    }

    /// Bootstrap and start the background scheduling loop, handing back the
    /// components long-running entrypoints need.
    pub async fn start(&self) -> Result<SystemHandle> {
        self.bootstrap().await?;

        match self.config.retrain_interval_secs {
            Some(secs) => {
                self.spawn_schedule(Duration::from_secs(secs));
                info!("Scheduled retraining every {}s", secs);
            }
            None => info!("Scheduled retraining disabled"),
        }

        Ok(SystemHandle {
            metrics: self.metrics.clone(),
            registry: self.registry.clone(),
            dispatcher: self.dispatcher.clone(),
        })
    }

    /// Queue a retraining run; `None` targets means the default cohort.
    pub async fn spawn_retrain(&self, targets: Option<Vec<String>>) -> Uuid {
        let (id, cancel) = self.dispatcher.register(JobKind::Retrain).await;
        let sink = DispatchSink::new(self.dispatcher.clone(), id);
        let engine = self.engine.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.run(targets, &sink, &cancel).await {
                error!("Retraining job {} aborted: {}", id, e);
            }
        });
        id
    }

    /// Queue a batch job over `targets`.
    pub async fn spawn_batch(&self, kind: BatchJobKind, targets: Vec<String>) -> Uuid {
        let (id, cancel) = self.dispatcher.register(kind.job_kind()).await;
        let sink = DispatchSink::new(self.dispatcher.clone(), id);
        let runner = self.runner.clone();
        tokio::spawn(async move {
            if let Err(e) = runner.run(id, kind, targets, &sink, &cancel).await {
                error!("Batch job {} aborted: {}", id, e);
            }
        });
        id
    }

    /// (model, version) pairs currently serving.
    pub async fn inventory(&self) -> Vec<(ModelKind, ModelVersion)> {
        self.registry.inventory().await
    }

    /// Periodic retraining, serialized against any run already in flight.
    fn spawn_schedule(&self, interval: Duration) {
        let dispatcher = self.dispatcher.clone();
        let engine = self.engine.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if dispatcher.is_active(JobKind::Retrain).await {
                    info!("Skipping scheduled retraining: previous run still active");
                    continue;
                }
                let (id, cancel) = dispatcher.register(JobKind::Retrain).await;
                info!("Scheduled retraining run {} starting", id);
                let sink = DispatchSink::new(dispatcher.clone(), id);
                if let Err(e) = engine.run(None, &sink, &cancel).await {
                    error!("Scheduled retraining run {} aborted: {}", id, e);
                }
            }
        });
    }
}
