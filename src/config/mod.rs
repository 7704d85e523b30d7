//! Configuration module for Assayer.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Training, Serving, and Observability.

mod observability_config;
mod serving_config;
mod training_config;

pub use observability_config::ObservabilityEnvConfig;
pub use serving_config::ServingEnvConfig;
pub use training_config::TrainingEnvConfig;

use crate::application::training::{ForestParams, RetrainSettings};
use crate::domain::records::Window;
use anyhow::{Context, Result};
use std::env;

/// Main application configuration.
///
/// This struct aggregates all configuration from sub-modules and provides
/// flat field access for the rest of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // Training (from TrainingEnvConfig)
    pub cohort_size: usize,
    pub training_window_days: u32,
    pub forest_trees: usize,
    pub forest_max_depth: u16,
    pub forest_min_samples_split: usize,
    pub retrain_interval_secs: Option<u64>,

    // Serving (from ServingEnvConfig)
    pub yield_noise_pct: f64,
    pub seed_demo_data: bool,

    // Observability (from ObservabilityEnvConfig)
    pub observability_enabled: bool,
    pub metrics_interval_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This orchestrates loading from all sub-config modules and composes
    /// them into a unified Config struct.
    pub fn from_env() -> Result<Self> {
        let training =
            TrainingEnvConfig::from_env().context("Failed to load training config")?;
        let serving = ServingEnvConfig::from_env().context("Failed to load serving config")?;
        let observability = ObservabilityEnvConfig::from_env();

        Ok(Self {
            // Training
            cohort_size: training.cohort_size,
            training_window_days: training.window_days,
            forest_trees: training.forest_trees,
            forest_max_depth: training.forest_max_depth,
            forest_min_samples_split: training.forest_min_samples_split,
            retrain_interval_secs: training.retrain_interval_secs,

            // Serving
            yield_noise_pct: serving.yield_noise_pct,
            seed_demo_data: serving.seed_demo_data,

            // Observability
            observability_enabled: observability.enabled,
            metrics_interval_seconds: observability.interval_seconds,
        })
    }

    /// Forest hyperparameters for domain fitting
    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            trees: self.forest_trees,
            max_depth: self.forest_max_depth,
            min_split: self.forest_min_samples_split,
        }
    }

    /// Lookback window for record fetches
    pub fn window(&self) -> Window {
        Window::days(self.training_window_days)
    }

    /// Assembled settings for a retraining run
    pub fn retrain_settings(&self) -> RetrainSettings {
        RetrainSettings {
            cohort_size: self.cohort_size,
            window: self.window(),
            forest: self.forest_params(),
        }
    }
}

pub(crate) fn parse_usize(key: &str, default: usize) -> Result<usize> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<usize>()
        .context(format!("Failed to parse {}", key))
}

pub(crate) fn parse_u16(key: &str, default: u16) -> Result<u16> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<u16>()
        .context(format!("Failed to parse {}", key))
}

pub(crate) fn parse_u32(key: &str, default: u32) -> Result<u32> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<u32>()
        .context(format!("Failed to parse {}", key))
}

pub(crate) fn parse_f64(key: &str, default: f64) -> Result<f64> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<f64>()
        .context(format!("Failed to parse {}", key))
}

pub(crate) fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<bool>()
        .unwrap_or(default)
}
