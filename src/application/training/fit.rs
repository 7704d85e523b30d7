//! Per-domain fitting: one call turns a domain's training examples into a
//! fully-constructed, ready-to-swap model entry.

use crate::domain::errors::FitError;
use crate::domain::estimator::{Estimator, OutlierProfile};
use crate::domain::features;
use crate::domain::model::{ModelEntry, ModelKind, ModelVersion};
use crate::domain::records::TrainingExample;
use crate::domain::scaler::StandardScaler;
use chrono::Utc;
use rayon::prelude::*;
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

/// Random-forest hyperparameters, shared by every supervised domain.
#[derive(Debug, Clone, Copy)]
pub struct ForestParams {
    pub trees: usize,
    pub max_depth: u16,
    pub min_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            trees: 100,
            max_depth: 10,
            min_split: 5,
        }
    }
}

impl ForestParams {
    fn to_smartcore(self) -> RandomForestRegressorParameters {
        RandomForestRegressorParameters::default()
            .with_n_trees(self.trees)
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_split)
    }
}

/// Fit a new estimator and scaler for one domain. The result is a complete
/// entry carrying `version`; nothing is published here, the caller decides
/// when to swap.
pub fn fit_domain(
    kind: ModelKind,
    examples: &[TrainingExample],
    params: ForestParams,
    version: ModelVersion,
) -> Result<ModelEntry, FitError> {
    if examples.is_empty() {
        return Err(FitError::EmptyTrainingSet { model: kind });
    }

    let rows: Vec<Vec<f64>> = examples
        .par_iter()
        .map(|example| features::extract(kind, &example.request))
        .collect::<Result<_, _>>()
        .map_err(|e| FitError::Training {
            model: kind,
            reason: e.to_string(),
        })?;

    for (index, row) in rows.iter().enumerate() {
        if row.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite {
                model: kind,
                example: index,
            });
        }
    }

    let scaler = StandardScaler::fit(&rows);
    let scaled: Vec<Vec<f64>> = rows
        .iter()
        .map(|row| scaler.transform(row))
        .collect::<Result<_, _>>()
        .map_err(|e| FitError::Training {
            model: kind,
            reason: e.to_string(),
        })?;

    let estimator = match kind {
        ModelKind::Anomaly => Estimator::Profile(OutlierProfile::fit(&scaled)),
        _ => fit_forest(kind, examples, &scaled, params)?,
    };

    Ok(ModelEntry {
        name: kind,
        estimator,
        scaler,
        version,
        trained_at: Utc::now(),
    })
}

fn fit_forest(
    kind: ModelKind,
    examples: &[TrainingExample],
    scaled: &Vec<Vec<f64>>,
    params: ForestParams,
) -> Result<Estimator, FitError> {
    let mut targets = Vec::with_capacity(examples.len());
    for (index, example) in examples.iter().enumerate() {
        let target = example.target.ok_or_else(|| FitError::Training {
            model: kind,
            reason: format!("example {} carries no training target", index),
        })?;
        if !target.is_finite() {
            return Err(FitError::NonFinite {
                model: kind,
                example: index,
            });
        }
        targets.push(target);
    }

    let x = DenseMatrix::from_2d_vec(scaled).map_err(|e| FitError::Training {
        model: kind,
        reason: format!("matrix construction: {}", e),
    })?;
    let model = RandomForestRegressor::fit(&x, &targets, params.to_smartcore()).map_err(|e| {
        FitError::Training {
            model: kind,
            reason: e.to_string(),
        }
    })?;
    Ok(Estimator::Forest(model))
}
