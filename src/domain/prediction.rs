use crate::domain::model::{ModelKind, ModelVersion};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed prediction, stamped with the exact entry version that
/// produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub model: ModelKind,
    pub model_version: ModelVersion,
    pub generated_at: DateTime<Utc>,
    pub estimate: Estimate,
}

/// Domain-specific prediction payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimate {
    Valuation {
        value: f64,
        interval: Interval,
    },
    Yield {
        points: Vec<YieldPoint>,
    },
    Risk {
        score: f64,
        level: RiskLevel,
        interval: Interval,
    },
    Anomaly {
        score: f64,
        threshold: f64,
        flagged: bool,
    },
}

/// One projected period of a yield forecast. Periods are 1-based.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct YieldPoint {
    pub period: usize,
    pub expected: f64,
    pub interval: Interval,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Banding over a clamped [0, 100] score: below 30 is low, below 70 is
    /// medium, the rest is high.
    pub fn from_score(score: f64) -> Self {
        if score < 30.0 {
            RiskLevel::Low
        } else if score < 70.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}
