//! One-shot Retraining Run
//!
//! A CLI tool for retraining every model domain over a target cohort and
//! printing the per-domain report.

use anyhow::{Result, bail};
use assayer::application::system::Application;
use assayer::config::Config;
use assayer::domain::jobs::{CancelToken, FitOutcome, PersistOutcome, RetrainReport};
use assayer::infrastructure::jobs::LogSink;
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "One-shot model retraining", long_about = None)]
struct Cli {
    /// Comma-separated target ids (defaults to the generated cohort)
    #[arg(short, long)]
    targets: Option<String>,

    /// Cohort size used when no targets are given
    #[arg(long)]
    cohort_size: Option<usize>,

    /// Lookback window in days
    #[arg(long)]
    window_days: Option<u32>,

    /// Number of trees per random forest
    #[arg(long)]
    trees: Option<usize>,
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

    let mut config = Config::from_env()?;
    if let Some(size) = cli.cohort_size {
        config.cohort_size = size;
    }
    if let Some(days) = cli.window_days {
        config.training_window_days = days;
    }
    if let Some(trees) = cli.trees {
        config.forest_trees = trees;
    }

    let targets: Option<Vec<String>> = cli
        .targets
        .map(|list| list.split(',').map(|s| s.trim().to_string()).collect());

    let app = Application::build(config).await?;
    app.bootstrap().await?;

    info!("Starting retraining run...");
    let cancel = CancelToken::new();
    let report = app.engine.run(targets, &LogSink, &cancel).await?;

    print_report(&report);

    if let Some(summary) = report.failure_summary() {
        bail!("retraining finished with failures: {}", summary);
    }
    Ok(())
}

fn print_report(report: &RetrainReport) {
    println!("{}", "=".repeat(80));
    println!("RETRAINING REPORT - {}", report.run_date.format("%Y-%m-%d"));
    println!(
        "Cohort: {} targets | Duration: {}s",
        report.cohort_size,
        (report.finished_at - report.started_at).num_seconds()
    );
    println!("{}", "=".repeat(80));

    for outcome in &report.domains {
        match &outcome.fit {
            FitOutcome::Fitted { version, examples } => {
                let persist = match &outcome.persist {
                    Some(PersistOutcome::Saved) => "persisted".to_string(),
                    Some(PersistOutcome::Failed { error }) => {
                        format!("persist failed: {}", error)
                    }
                    None => "not persisted".to_string(),
                };
                println!(
                    "✅ {:<8} {} ({} examples, {})",
                    outcome.model, version, examples, persist
                );
            }
            FitOutcome::Failed { error } => {
                println!("❌ {:<8} fit failed: {}", outcome.model, error);
            }
        }
    }
    println!("{}", "=".repeat(80));
}
