use crate::domain::errors::ScaleError;
use serde::{Deserialize, Serialize};

/// Per-column standardizing normalizer fitted on training features and
/// persisted next to its estimator. A constant column scales by 1 so
/// transform never divides by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit column means and population standard deviations over row-major
    /// training features.
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let n = rows.len() as f64;
        let mut means = vec![0.0; width];
        let mut stds = vec![1.0; width];

        if rows.is_empty() {
            return Self { means, stds };
        }

        for row in rows {
            for (column, value) in row.iter().enumerate() {
                means[column] += value;
            }
        }
        for mean in &mut means {
            *mean /= n;
        }

        for (column, std) in stds.iter_mut().enumerate() {
            let variance = rows
                .iter()
                .map(|row| {
                    let delta = row[column] - means[column];
                    delta * delta
                })
                .sum::<f64>()
                / n;
            let spread = variance.sqrt();
            *std = if spread > 0.0 { spread } else { 1.0 };
        }

        Self { means, stds }
    }

    /// Pass-through scaler for untrained default entries.
    pub fn identity(width: usize) -> Self {
        Self {
            means: vec![0.0; width],
            stds: vec![1.0; width],
        }
    }

    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ScaleError> {
        if features.len() != self.means.len() {
            return Err(ScaleError::WidthMismatch {
                expected: self.means.len(),
                actual: features.len(),
            });
        }
        Ok(features
            .iter()
            .zip(self.means.iter().zip(self.stds.iter()))
            .map(|(value, (mean, std))| (value - mean) / std)
            .collect())
    }

    pub fn width(&self) -> usize {
        self.means.len()
    }

    pub fn kind(&self) -> &'static str {
        "standard"
    }
}
