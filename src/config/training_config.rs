//! Training configuration parsing from environment variables.
//!
//! Covers the retraining cohort, lookback window, forest hyperparameters
//! and the optional retraining schedule.

use crate::config::{parse_u16, parse_u32, parse_usize};
use anyhow::{Context, Result};
use std::env;

/// Training environment configuration
#[derive(Debug, Clone)]
pub struct TrainingEnvConfig {
    pub cohort_size: usize,
    pub window_days: u32,
    pub forest_trees: usize,
    pub forest_max_depth: u16,
    pub forest_min_samples_split: usize,
    /// Interval between scheduled retraining runs. Unset or zero disables
    /// the schedule.
    pub retrain_interval_secs: Option<u64>,
}

impl TrainingEnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            cohort_size: parse_usize("COHORT_SIZE", 10)?,
            window_days: parse_u32("TRAINING_WINDOW_DAYS", 365)?,
            forest_trees: parse_usize("FOREST_TREES", 100)?,
            forest_max_depth: parse_u16("FOREST_MAX_DEPTH", 10)?,
            forest_min_samples_split: parse_usize("FOREST_MIN_SAMPLES_SPLIT", 5)?,
            retrain_interval_secs: env::var("RETRAIN_INTERVAL_SECS")
                .ok()
                .map(|s| {
                    s.parse::<u64>()
                        .context("Failed to parse RETRAIN_INTERVAL_SECS")
                })
                .transpose()?
                .filter(|&secs| secs > 0),
        })
    }
}
