//! Serving configuration parsing from environment variables.

use crate::config::{parse_bool, parse_f64};
use anyhow::Result;

/// Serving environment configuration
#[derive(Debug, Clone)]
pub struct ServingEnvConfig {
    /// Relative spread applied to per-period yield projections.
    pub yield_noise_pct: f64,
    /// Seed demo raw datasets into the object store at startup.
    pub seed_demo_data: bool,
}

impl ServingEnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            yield_noise_pct: parse_f64("YIELD_NOISE_PCT", 0.05)?,
            seed_demo_data: parse_bool("SEED_DEMO_DATA", true),
        })
    }
}
