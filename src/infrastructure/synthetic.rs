//! Synthetic record source
//!
//! Generates randomized but realistically-shaped records for every model
//! domain. Stands in for the upstream asset-data service in local runs,
//! demos and tests; the training pipeline treats it like any other
//! `RecordSource`.

use crate::domain::errors::{SourceError, StoreError};
use crate::domain::model::ModelKind;
use crate::domain::ports::{ObjectStore, RecordSource};
use crate::domain::records::{
    AnomalyInputs, CashflowRecord, DomainRecords, FinancialMetrics, FlowKind, MarketConditions,
    MarketExposure, MarketRecord, OperationalMetrics, PricingInputs, RiskInputs, SeriesPoint,
    UtilizationRecord, Window, YieldInputs,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use tracing::info;

/// Upper bound on generated time-series points per fetch.
const MAX_SERIES_POINTS: u32 = 1000;

#[derive(Debug, Default)]
pub struct SyntheticSource;

#[async_trait]
impl RecordSource for SyntheticSource {
    async fn fetch(
        &self,
        target_id: &str,
        domain: ModelKind,
        window: Window,
    ) -> Result<DomainRecords, SourceError> {
        if target_id.is_empty() {
            return Err(SourceError::UnknownTarget {
                target: target_id.to_string(),
            });
        }

        let mut rng = rand::rng();
        let records = match domain {
            ModelKind::Pricing => DomainRecords::Pricing {
                inputs: PricingInputs {
                    cashflows: cashflows(&mut rng, window.days),
                    market: market_series(&mut rng, window.days),
                    utilization: utilization_series(&mut rng, window.days),
                },
                observed_value: rng.random_range(100_000.0..=1_000_000.0),
            },
            ModelKind::Yield => {
                let historical: Vec<f64> =
                    (0..12).map(|_| rng.random_range(0.04..=0.12)).collect();
                let observed = historical.iter().sum::<f64>() / historical.len() as f64;
                DomainRecords::Yield {
                    inputs: YieldInputs {
                        historical_yields: historical,
                        conditions: market_conditions(&mut rng),
                        horizon: 12,
                    },
                    observed_yield: observed,
                }
            }
            ModelKind::Risk => DomainRecords::Risk {
                inputs: RiskInputs {
                    financial: FinancialMetrics {
                        debt_to_equity: rng.random_range(0.1..=2.0),
                        current_ratio: rng.random_range(0.5..=3.0),
                        profit_margin: rng.random_range(-0.1..=0.3),
                        return_on_equity: rng.random_range(0.05..=0.25),
                        cash_flow_coverage: rng.random_range(0.5..=5.0),
                    },
                    exposure: MarketExposure {
                        interest_rate_sensitivity: rng.random_range(0.0..=1.0),
                        currency_exposure: rng.random_range(0.0..=1.0),
                        commodity_exposure: rng.random_range(0.0..=1.0),
                        geographic_concentration: rng.random_range(0.0..=1.0),
                        sector_concentration: rng.random_range(0.0..=1.0),
                    },
                    operational: OperationalMetrics {
                        utilization_rate: rng.random_range(0.5..=1.0),
                        efficiency: rng.random_range(0.6..=1.0),
                        maintenance_ratio: rng.random_range(0.05..=0.2),
                        staff_turnover: rng.random_range(0.05..=0.3),
                        quality_score: rng.random_range(0.7..=1.0),
                    },
                },
                observed_score: rng.random_range(0.0..=100.0),
            },
            ModelKind::Anomaly => DomainRecords::Anomaly {
                inputs: AnomalyInputs {
                    series: sensor_series(&mut rng, window.days),
                },
            },
        };
        Ok(records)
    }
}

/// Monthly revenue and weekly expense line items across the window.
fn cashflows(rng: &mut impl Rng, days: u32) -> Vec<CashflowRecord> {
    let today = Utc::now().date_naive();
    let start = today - Duration::days(days as i64);
    let mut out = Vec::new();
    for i in 0..days {
        let date = start + Duration::days(i as i64);
        if i % 30 == 0 {
            out.push(CashflowRecord {
                date,
                amount: Decimal::from_f64_retain(rng.random_range(6_000.0..=14_000.0))
                    .unwrap_or_default(),
                flow: FlowKind::Revenue,
                category: "monthly".to_string(),
            });
        } else if i % 7 == 0 {
            out.push(CashflowRecord {
                date,
                amount: Decimal::from_f64_retain(rng.random_range(-3_000.0..=-1_000.0))
                    .unwrap_or_default(),
                flow: FlowKind::Expense,
                category: "operational".to_string(),
            });
        }
    }
    out
}

/// Daily rates as a clamped random walk from realistic base values.
fn market_series(rng: &mut impl Rng, days: u32) -> Vec<MarketRecord> {
    let today = Utc::now().date_naive();
    let start = today - Duration::days(days as i64);
    let mut interest_rate: f64 = 0.05;
    let mut inflation_rate: f64 = 0.02;
    let mut volatility: f64 = 0.15;
    let mut out = Vec::with_capacity(days as usize);
    for i in 0..days {
        interest_rate = (interest_rate + rng.random_range(-0.002..=0.002)).clamp(0.0, 0.15);
        inflation_rate = (inflation_rate + rng.random_range(-0.001..=0.001)).clamp(-0.05, 0.10);
        volatility = (volatility + rng.random_range(-0.004..=0.004)).clamp(0.05, 0.50);
        out.push(MarketRecord {
            date: start + Duration::days(i as i64),
            interest_rate,
            inflation_rate,
            market_volatility: volatility,
        });
    }
    out
}

/// Daily utilization with a yearly seasonal swing.
fn utilization_series(rng: &mut impl Rng, days: u32) -> Vec<UtilizationRecord> {
    let today = Utc::now().date_naive();
    let start = today - Duration::days(days as i64);
    let mut out = Vec::with_capacity(days as usize);
    for i in 0..days {
        let seasonal = 1.0 + 0.2 * (2.0 * std::f64::consts::PI * i as f64 / 365.0).sin();
        let rate = (rng.random_range(0.5..=0.9) * seasonal).clamp(0.0, 1.0);
        out.push(UtilizationRecord {
            date: start + Duration::days(i as i64),
            utilization_rate: rate,
            capacity: 1000.0,
            efficiency: rng.random_range(0.75..=0.95),
        });
    }
    out
}

/// Hourly sensor readings; a fetch never returns more than
/// `MAX_SERIES_POINTS` of them.
fn sensor_series(rng: &mut impl Rng, days: u32) -> Vec<SeriesPoint> {
    let hours = (days.saturating_mul(24)).min(MAX_SERIES_POINTS);
    let now = Utc::now();
    (0..hours)
        .map(|i| SeriesPoint {
            timestamp: now - Duration::hours(i as i64),
            value: rng.random_range(80.0..=120.0),
        })
        .collect()
}

fn market_conditions(rng: &mut impl Rng) -> MarketConditions {
    MarketConditions {
        interest_rate: rng.random_range(0.02..=0.08),
        inflation_rate: rng.random_range(0.01..=0.05),
        market_volatility: rng.random_range(0.1..=0.3),
        economic_growth: rng.random_range(-0.01..=0.05),
        sector_performance: rng.random_range(-0.1..=0.2),
    }
}

/// Write raw sensor datasets for demo targets so data-processing jobs
/// have something to read. Roughly one reading in ten is null and gets
/// dropped by the cleaning pass.
pub async fn seed_raw_records(
    store: &dyn ObjectStore,
    targets: &[String],
    dataset: &str,
) -> Result<(), StoreError> {
    let mut rng = rand::rng();
    let now = Utc::now();
    for target in targets {
        let records: Vec<serde_json::Value> = (0..48i64)
            .map(|i| {
                let reading = if rng.random_bool(0.1) {
                    serde_json::Value::Null
                } else {
                    serde_json::json!(rng.random_range(80.0..=120.0))
                };
                serde_json::json!({
                    "timestamp": (now - Duration::hours(i)).to_rfc3339(),
                    "reading": reading,
                    "unit": "kWh",
                })
            })
            .collect();
        let key = format!("raw_data/{}/{}.json", target, dataset);
        let bytes = serde_json::to_vec(&records).map_err(|e| StoreError::Serialize {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        store.put(&key, bytes).await?;
    }
    info!("Seeded raw {} datasets for {} targets", dataset, targets.len());
    Ok(())
}
