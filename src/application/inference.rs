//! Inference Service
//!
//! End-to-end prediction path: extract features, look up the active model
//! entry, scale, estimate, then apply the domain's post-processing. Results
//! are stamped with the exact entry version that served them.

use crate::application::registry::ModelRegistry;
use crate::domain::errors::InferenceError;
use crate::domain::features;
use crate::domain::prediction::{Estimate, Interval, PredictionResult, RiskLevel, YieldPoint};
use crate::domain::records::PredictRequest;
use crate::infrastructure::observability::metrics::Metrics;
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

pub struct InferenceService {
    registry: Arc<ModelRegistry>,
    metrics: Metrics,
    /// Relative noise bound applied per projected yield period.
    yield_noise: f64,
}

impl InferenceService {
    pub fn new(registry: Arc<ModelRegistry>, metrics: Metrics, yield_noise: f64) -> Self {
        Self {
            registry,
            metrics,
            yield_noise,
        }
    }

    pub async fn predict(
        &self,
        request: &PredictRequest,
    ) -> Result<PredictionResult, InferenceError> {
        let model = request.kind();
        let started = Instant::now();
        let result = self.predict_inner(request).await;
        match &result {
            Ok(_) => self.metrics.inc_prediction(model.as_str(), "ok"),
            Err(e) => {
                warn!("Prediction failed for {}: {}", model, e);
                self.metrics.inc_prediction(model.as_str(), "error");
            }
        }
        self.metrics
            .observe_prediction_latency(model.as_str(), started.elapsed().as_secs_f64());
        result
    }

    async fn predict_inner(
        &self,
        request: &PredictRequest,
    ) -> Result<PredictionResult, InferenceError> {
        let kind = request.kind();
        let features = features::extract(kind, request)?;
        let entry = self.registry.get(kind).await?;
        let scaled = entry.scaler.transform(&features)?;
        let raw = entry.estimator.predict(&scaled)?;

        let estimate = match request {
            PredictRequest::Pricing(_) => valuation_estimate(raw),
            PredictRequest::Yield(inputs) => self.yield_estimate(raw, inputs.horizon),
            PredictRequest::Risk(_) => risk_estimate(raw),
            PredictRequest::Anomaly(_) => anomaly_estimate(raw),
        };

        Ok(PredictionResult {
            model: kind,
            model_version: entry.version.clone(),
            generated_at: Utc::now(),
            estimate,
        })
    }

    /// Expand the point estimate over the requested horizon. Each period
    /// perturbs the base by a bounded relative noise and carries a ±10%
    /// interval around its own projection.
    fn yield_estimate(&self, raw: f64, horizon: usize) -> Estimate {
        let mut rng = rand::rng();
        let points = (1..=horizon)
            .map(|period| {
                let noise = rng.random_range(-self.yield_noise..=self.yield_noise);
                let expected = raw * (1.0 + noise);
                YieldPoint {
                    period,
                    expected,
                    interval: Interval {
                        lower: expected * 0.9,
                        upper: expected * 1.1,
                    },
                }
            })
            .collect();
        Estimate::Yield { points }
    }
}

fn valuation_estimate(raw: f64) -> Estimate {
    Estimate::Valuation {
        value: raw,
        interval: Interval {
            lower: raw * 0.8,
            upper: raw * 1.2,
        },
    }
}

fn risk_estimate(raw: f64) -> Estimate {
    let score = raw.clamp(0.0, 100.0);
    Estimate::Risk {
        score,
        level: RiskLevel::from_score(score),
        interval: Interval {
            lower: (score - 10.0).clamp(0.0, 100.0),
            upper: (score + 10.0).clamp(0.0, 100.0),
        },
    }
}

/// A single prediction call has only its own score to threshold against:
/// the 10th percentile of a one-element set is the score itself, so
/// flagging never triggers here. The verdict still carries score and
/// threshold so callers holding a historical score distribution can apply
/// their own cutoff.
fn anomaly_estimate(raw: f64) -> Estimate {
    let threshold = raw;
    Estimate::Anomaly {
        score: raw,
        threshold,
        flagged: raw < threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::estimator::Estimator;
    use crate::domain::model::{ModelEntry, ModelKind, ModelVersion};
    use crate::domain::records::{AnomalyInputs, PricingInputs, RiskInputs, YieldInputs};
    use crate::domain::scaler::StandardScaler;
    use chrono::NaiveDate;

    fn fixed_entry(kind: ModelKind, output: f64) -> ModelEntry {
        ModelEntry {
            name: kind,
            estimator: Estimator::Baseline { output },
            scaler: StandardScaler::identity(kind.feature_width()),
            version: ModelVersion::initial(NaiveDate::from_ymd_opt(2026, 8, 21).unwrap()),
            trained_at: Utc::now(),
        }
    }

    async fn service_with(kind: ModelKind, output: f64) -> InferenceService {
        let registry = Arc::new(ModelRegistry::default());
        registry.swap(fixed_entry(kind, output)).await;
        InferenceService::new(registry, Metrics::default(), 0.05)
    }

    #[tokio::test]
    async fn test_predict_without_entry_fails_with_not_loaded() {
        let registry = Arc::new(ModelRegistry::default());
        let service = InferenceService::new(registry, Metrics::default(), 0.05);
        let err = service
            .predict(&PredictRequest::Pricing(PricingInputs::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Registry(_)));
    }

    #[tokio::test]
    async fn test_risk_scores_clamp_into_bands() {
        let cases = [
            (-5.0, 0.0, RiskLevel::Low),
            (150.0, 100.0, RiskLevel::High),
            (50.0, 50.0, RiskLevel::Medium),
        ];
        for (raw, expected_score, expected_level) in cases {
            let service = service_with(ModelKind::Risk, raw).await;
            let result = service
                .predict(&PredictRequest::Risk(RiskInputs::default()))
                .await
                .unwrap();
            match result.estimate {
                Estimate::Risk {
                    score,
                    level,
                    interval,
                } => {
                    assert_eq!(score, expected_score, "raw {}", raw);
                    assert_eq!(level, expected_level, "raw {}", raw);
                    assert!(interval.lower >= 0.0 && interval.upper <= 100.0);
                }
                other => panic!("expected risk estimate, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_valuation_interval_is_twenty_percent() {
        let service = service_with(ModelKind::Pricing, 1000.0).await;
        let result = service
            .predict(&PredictRequest::Pricing(PricingInputs::default()))
            .await
            .unwrap();
        match result.estimate {
            Estimate::Valuation { value, interval } => {
                assert_eq!(value, 1000.0);
                assert_eq!(interval.lower, 800.0);
                assert_eq!(interval.upper, 1200.0);
            }
            other => panic!("expected valuation estimate, got {:?}", other),
        }
        assert_eq!(result.model_version.to_string(), "v1.0.0-20260821");
    }

    #[tokio::test]
    async fn test_yield_horizon_expansion_stays_within_noise_bound() {
        let service = service_with(ModelKind::Yield, 0.06).await;
        let result = service
            .predict(&PredictRequest::Yield(YieldInputs {
                historical_yields: vec![0.05, 0.06],
                horizon: 4,
                ..Default::default()
            }))
            .await
            .unwrap();
        match result.estimate {
            Estimate::Yield { points } => {
                assert_eq!(points.len(), 4);
                for (i, point) in points.iter().enumerate() {
                    assert_eq!(point.period, i + 1);
                    assert!(
                        (point.expected - 0.06).abs() <= 0.06 * 0.05 + 1e-12,
                        "period {} drifted past the noise bound: {}",
                        point.period,
                        point.expected
                    );
                    assert!((point.interval.lower - point.expected * 0.9).abs() < 1e-12);
                    assert!((point.interval.upper - point.expected * 1.1).abs() < 1e-12);
                }
            }
            other => panic!("expected yield estimate, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_single_anomaly_call_is_never_flagged() {
        let service = service_with(ModelKind::Anomaly, -1.7).await;
        let result = service
            .predict(&PredictRequest::Anomaly(AnomalyInputs::default()))
            .await
            .unwrap();
        match result.estimate {
            Estimate::Anomaly {
                score,
                threshold,
                flagged,
            } => {
                assert_eq!(score, -1.7);
                assert_eq!(threshold, score, "trivial one-score batch");
                assert!(!flagged);
            }
            other => panic!("expected anomaly estimate, got {:?}", other),
        }
    }
}
