//! Assayer Server - Headless model-serving pipeline
//!
//! This binary runs the model registry, scheduled retraining and metrics
//! reporting without any request-routing layer. Metrics are pushed via
//! structured JSON logs to stdout.
//!
//! # Usage
//! ```sh
//! RETRAIN_INTERVAL_SECS=3600 cargo run --bin server
//! ```
//!
//! # Environment Variables
//! - `RETRAIN_INTERVAL_SECS` - Scheduled retraining period (default: disabled)
//! - `OBSERVABILITY_ENABLED` - Enable metrics reporting (default: true)
//! - `METRICS_INTERVAL_SECONDS` - Interval in seconds between metric outputs (default: 60)

use anyhow::Result;
use assayer::application::system::Application;
use assayer::config::Config;
use assayer::infrastructure::observability::MetricsReporter;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Setup logging (stdout only)
    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Assayer Server {} starting...", env!("CARGO_PKG_VERSION"));
    info!("Mode: HEADLESS (no request routing)");
    info!("Metrics: Push-based (JSON to stdout)");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: cohort={}, window={}d, forest={} trees",
        config.cohort_size, config.training_window_days, config.forest_trees
    );

    // Build and start the application
    info!("Building model pipeline...");
    let app = Application::build(config.clone()).await?;

    info!("Starting model pipeline...");
    let handle = app.start().await?;
    info!("Model pipeline running.");

    // Start metrics reporter if enabled
    if config.observability_enabled {
        let reporter = MetricsReporter::new(
            handle.registry.clone(),
            handle.dispatcher.clone(),
            handle.metrics.clone(),
            config.metrics_interval_seconds,
        );

        tokio::spawn(async move {
            reporter.run().await;
        });

        info!(
            "Metrics reporter started (interval: {}s)",
            config.metrics_interval_seconds
        );
    } else {
        info!("Metrics reporting disabled.");
    }

    info!("Server running. Press Ctrl+C to shutdown.");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting...");

    Ok(())
}
