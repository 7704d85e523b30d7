//! Prometheus metrics definitions for Assayer
//!
//! All metrics use the `assayer_` prefix and are read-only.

use prometheus::{
    CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge, GenericGaugeVec},
};
use std::sync::Arc;

/// Prometheus metrics for the model-serving pipeline
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Predictions served, by model and outcome
    pub predictions_total: CounterVec,
    /// Prediction latency in seconds, by model
    pub prediction_latency_seconds: HistogramVec,
    /// Finished jobs, by kind and terminal state
    pub jobs_total: CounterVec,
    /// Jobs currently running, by kind
    pub jobs_active: GenericGaugeVec<AtomicF64>,
    /// Registry hot-swaps, by model
    pub models_swapped_total: CounterVec,
    /// Number of models currently loaded in the registry
    pub models_loaded: GenericGauge<AtomicF64>,
    /// Uptime in seconds
    pub uptime_seconds: GenericGauge<AtomicF64>,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let predictions_total = CounterVec::new(
            Opts::new(
                "assayer_predictions_total",
                "Predictions served by model and outcome",
            ),
            &["model", "status"],
        )?;
        registry.register(Box::new(predictions_total.clone()))?;

        let prediction_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "assayer_prediction_latency_seconds",
                "Prediction latency in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5,
            ]),
            &["model"],
        )?;
        registry.register(Box::new(prediction_latency_seconds.clone()))?;

        let jobs_total = CounterVec::new(
            Opts::new(
                "assayer_jobs_total",
                "Finished jobs by kind and terminal state",
            ),
            &["kind", "status"],
        )?;
        registry.register(Box::new(jobs_total.clone()))?;

        let jobs_active = GaugeVec::new(
            Opts::new("assayer_jobs_active", "Jobs currently running by kind"),
            &["kind"],
        )?;
        registry.register(Box::new(jobs_active.clone()))?;

        let models_swapped_total = CounterVec::new(
            Opts::new(
                "assayer_models_swapped_total",
                "Registry hot-swaps by model",
            ),
            &["model"],
        )?;
        registry.register(Box::new(models_swapped_total.clone()))?;

        let models_loaded = Gauge::with_opts(Opts::new(
            "assayer_models_loaded",
            "Number of models currently loaded in the registry",
        ))?;
        registry.register(Box::new(models_loaded.clone()))?;

        let uptime_seconds = Gauge::with_opts(Opts::new(
            "assayer_uptime_seconds",
            "Server uptime in seconds",
        ))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            predictions_total,
            prediction_latency_seconds,
            jobs_total,
            jobs_active,
            models_swapped_total,
            models_loaded,
            uptime_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    /// Increment the prediction counter
    pub fn inc_prediction(&self, model: &str, status: &str) {
        self.predictions_total
            .with_label_values(&[model, status])
            .inc();
    }

    /// Observe one prediction's latency
    pub fn observe_prediction_latency(&self, model: &str, latency: f64) {
        self.prediction_latency_seconds
            .with_label_values(&[model])
            .observe(latency);
    }

    /// Record a finished job
    pub fn inc_job(&self, kind: &str, status: &str) {
        self.jobs_total.with_label_values(&[kind, status]).inc();
    }

    /// Record a registry hot-swap
    pub fn inc_swap(&self, model: &str) {
        self.models_swapped_total
            .with_label_values(&[model])
            .inc();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create default Metrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        assert!(metrics.render().contains("assayer_"));
    }

    #[test]
    fn test_prediction_counter_labels() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.inc_prediction("pricing", "ok");
        metrics.inc_prediction("risk", "error");
        let output = metrics.render();
        assert!(output.contains("assayer_predictions_total"));
        assert!(output.contains("pricing"));
        assert!(output.contains("risk"));
    }

    #[test]
    fn test_job_counter() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.inc_job("retrain", "succeeded");
        metrics.inc_job("batch_predict", "failed");
        let output = metrics.render();
        assert!(output.contains("assayer_jobs_total"));
    }

    #[test]
    fn test_models_loaded_gauge() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.models_loaded.set(4.0);
        assert!(metrics.render().contains("assayer_models_loaded 4"));
    }
}
