//! Batch Job Runner
//!
//! A CLI tool for running a prediction or data-processing batch over a
//! target list and printing the per-target outcomes.

use anyhow::{Result, bail};
use assayer::application::batch::BatchJobKind;
use assayer::application::system::Application;
use assayer::config::Config;
use assayer::domain::jobs::{BatchOutcome, BatchPayload, BatchReport, CancelToken};
use assayer::domain::model::ModelKind;
use assayer::domain::prediction::Estimate;
use assayer::infrastructure::jobs::LogSink;
use assayer::infrastructure::synthetic;
use clap::{Parser, Subcommand};
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Batch prediction and data-processing jobs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one prediction per target against the active model
    Predict {
        /// Model domain (pricing, yield, risk, anomaly)
        #[arg(short, long, default_value = "pricing")]
        model: String,

        /// Comma-separated target ids
        #[arg(short, long, default_value = "asset-001,asset-002,asset-003")]
        targets: String,
    },
    /// Clean raw datasets into their processed form
    ProcessData {
        /// Dataset id under raw_data/<target>/
        #[arg(short, long, default_value = "demo")]
        dataset: String,

        /// Comma-separated target ids
        #[arg(
            short,
            long,
            default_value = "training-asset-000,training-asset-001,training-asset-002"
        )]
        targets: String,

        /// Seed synthetic raw records for the targets before running
        #[arg(long)]
        seed: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Setup logging
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    let app = Application::build(config).await?;
    app.bootstrap().await?;

    let job_id = Uuid::new_v4();
    let cancel = CancelToken::new();

    let report = match cli.command {
        Commands::Predict { model, targets } => {
            let model: ModelKind = model.parse()?;
            let targets = split_targets(&targets);
            info!("Running {} predictions with the {} model...", targets.len(), model);
            app.runner
                .run(
                    job_id,
                    BatchJobKind::Predict { model },
                    targets,
                    &LogSink,
                    &cancel,
                )
                .await?
        }
        Commands::ProcessData {
            dataset,
            targets,
            seed,
        } => {
            let targets = split_targets(&targets);
            if seed {
                synthetic::seed_raw_records(app.objects.as_ref(), &targets, &dataset).await?;
            }
            info!("Cleaning dataset {} for {} targets...", dataset, targets.len());
            app.runner
                .run(
                    job_id,
                    BatchJobKind::ProcessData { dataset },
                    targets,
                    &LogSink,
                    &cancel,
                )
                .await?
        }
    };

    print_report(&report);

    if report.failed > 0 {
        bail!("{} of {} targets failed", report.failed, report.total_targets);
    }
    Ok(())
}

fn split_targets(list: &str) -> Vec<String> {
    list.split(',').map(|s| s.trim().to_string()).collect()
}

fn print_report(report: &BatchReport) {
    println!("{}", "=".repeat(80));
    println!(
        "BATCH REPORT - {} (job {})",
        report.kind, report.job_id
    );
    println!(
        "Targets: {} | Succeeded: {} | Failed: {}",
        report.total_targets, report.succeeded, report.failed
    );
    println!("{}", "=".repeat(80));

    for entry in &report.entries {
        match &entry.outcome {
            BatchOutcome::Success { payload } => {
                println!("✅ {:<20} {}", entry.target_id, summarize(payload));
            }
            BatchOutcome::Failure { error } => {
                println!("❌ {:<20} {}", entry.target_id, error);
            }
        }
    }
    println!("{}", "=".repeat(80));
}

fn summarize(payload: &BatchPayload) -> String {
    match payload {
        BatchPayload::Prediction(result) => match &result.estimate {
            Estimate::Valuation { value, .. } => {
                format!("valuation {:.2} ({})", value, result.model_version)
            }
            Estimate::Yield { points } => {
                format!("{} yield periods ({})", points.len(), result.model_version)
            }
            Estimate::Risk { score, level, .. } => {
                format!("risk {:.1} {:?} ({})", score, level, result.model_version)
            }
            Estimate::Anomaly { score, flagged, .. } => {
                format!(
                    "anomaly score {:.3}, flagged: {} ({})",
                    score, flagged, result.model_version
                )
            }
        },
        BatchPayload::Cleaning(summary) => format!(
            "kept {}/{} records ({} dropped)",
            summary.kept, summary.total, summary.dropped
        ),
    }
}
