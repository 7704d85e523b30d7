use crate::domain::errors::EstimatorError;
use crate::domain::model::ModelKind;
use crate::domain::scaler::StandardScaler;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::RandomForestRegressor;
use smartcore::linalg::basic::matrix::DenseMatrix;

/// The random-forest regressor shape used by every supervised domain.
pub type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// A fitted predictor producing one numeric output per feature vector.
/// `Baseline` is the untrained default installed before any training run;
/// `Profile` is the unsupervised outlier scorer used by the anomaly domain.
#[derive(Debug, Serialize, Deserialize)]
pub enum Estimator {
    Forest(Forest),
    Baseline { output: f64 },
    Profile(OutlierProfile),
}

impl Estimator {
    /// Untrained default for a domain.
    pub fn neutral(kind: ModelKind) -> Self {
        Estimator::Baseline {
            output: kind.neutral_output(),
        }
    }

    /// Label persisted in model metadata.
    pub fn kind(&self) -> &'static str {
        match self {
            Estimator::Forest(_) => "random_forest",
            Estimator::Baseline { .. } => "baseline",
            Estimator::Profile(_) => "outlier_profile",
        }
    }

    pub fn predict(&self, features: &[f64]) -> Result<f64, EstimatorError> {
        match self {
            Estimator::Forest(model) => {
                let matrix = DenseMatrix::from_2d_vec(&vec![features.to_vec()]).map_err(|e| {
                    EstimatorError::Matrix {
                        reason: e.to_string(),
                    }
                })?;
                let predictions =
                    model
                        .predict(&matrix)
                        .map_err(|e| EstimatorError::Predict {
                            reason: e.to_string(),
                        })?;
                predictions
                    .first()
                    .copied()
                    .ok_or(EstimatorError::NoOutput)
            }
            Estimator::Baseline { output } => Ok(*output),
            Estimator::Profile(profile) => {
                profile
                    .score(features)
                    .map_err(|e| EstimatorError::Predict {
                        reason: e.to_string(),
                    })
            }
        }
    }
}

/// Per-feature location/spread profile fitted on normal observations.
/// Scores a vector by its mean absolute z-distance from the profile,
/// negated so that lower means more anomalous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierProfile {
    scaler: StandardScaler,
}

impl OutlierProfile {
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        Self {
            scaler: StandardScaler::fit(rows),
        }
    }

    pub fn score(&self, features: &[f64]) -> Result<f64, crate::domain::errors::ScaleError> {
        let z = self.scaler.transform(features)?;
        if z.is_empty() {
            return Ok(0.0);
        }
        let mean_abs = z.iter().map(|v| v.abs()).sum::<f64>() / z.len() as f64;
        Ok(-mean_abs)
    }
}
