//! Push-based metrics reporter for Assayer
//!
//! Periodically outputs metrics as structured JSON to stdout.
//!
//! **Security**: This system only SENDS data, never accepts requests.

use crate::application::registry::ModelRegistry;
use crate::infrastructure::jobs::JobDispatcher;
use crate::infrastructure::observability::metrics::Metrics;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Metrics snapshot for JSON output
#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub models: Vec<ModelSnapshot>,
    pub jobs: JobsSnapshot,
}

#[derive(Serialize)]
pub struct ModelSnapshot {
    pub model: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct JobsSnapshot {
    pub tracked: usize,
    pub active: usize,
}

/// Push-based metrics reporter
///
/// Outputs registry and job state as structured JSON logs on a
/// configurable interval. No HTTP server, no incoming connections -
/// only outbound data.
pub struct MetricsReporter {
    registry: Arc<ModelRegistry>,
    dispatcher: Arc<JobDispatcher>,
    metrics: Metrics,
    start_time: Instant,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(
        registry: Arc<ModelRegistry>,
        dispatcher: Arc<JobDispatcher>,
        metrics: Metrics,
        interval_seconds: u64,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            metrics,
            start_time: Instant::now(),
            interval: Duration::from_secs(interval_seconds),
        }
    }

    /// Run the reporter in a loop, outputting metrics periodically
    pub async fn run(self) {
        info!(
            "MetricsReporter: Starting push-based metrics (interval: {:?})",
            self.interval
        );
        info!("MetricsReporter: Metrics will be output as JSON to stdout");

        loop {
            tokio::time::sleep(self.interval).await;

            let snapshot = self.collect_snapshot().await;
            match serde_json::to_string(&snapshot) {
                Ok(json) => {
                    // Use a special prefix so logs can be easily filtered
                    println!("METRICS_JSON:{}", json);
                    info!(
                        "Models: {} | Active jobs: {} | Uptime: {}s",
                        snapshot.models.len(),
                        snapshot.jobs.active,
                        snapshot.uptime_seconds
                    );
                }
                Err(e) => warn!("Failed to serialize metrics: {}", e),
            }
        }
    }

    /// Collect current metrics snapshot
    async fn collect_snapshot(&self) -> MetricsSnapshot {
        let uptime = self.start_time.elapsed().as_secs();
        let inventory = self.registry.inventory().await;
        let jobs = self.dispatcher.snapshot().await;
        let active = jobs.iter().filter(|j| !j.progress.is_terminal()).count();

        self.metrics.uptime_seconds.set(uptime as f64);

        MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: uptime,
            version: env!("CARGO_PKG_VERSION").to_string(),
            models: inventory
                .into_iter()
                .map(|(kind, version)| ModelSnapshot {
                    model: kind.to_string(),
                    version: version.to_string(),
                })
                .collect(),
            jobs: JobsSnapshot {
                tracked: jobs.len(),
                active,
            },
        }
    }
}
