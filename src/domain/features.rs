use crate::domain::errors::FeatureError;
use crate::domain::model::ModelKind;
use crate::domain::records::{
    AnomalyInputs, FlowKind, PredictRequest, PricingInputs, RiskInputs, YieldInputs,
};
use rust_decimal::prelude::ToPrimitive;
use statrs::statistics::{Data, Distribution, Max, Min, OrderStatistics};
use std::collections::BTreeMap;

/// Fixed-width ordered feature vector. Position semantics are pinned by the
/// per-domain name constants below; training and serving share this order.
pub type FeatureVector = Vec<f64>;

/// Ordered pricing feature names. This order MUST match the training-time
/// order exactly; any change here invalidates persisted models.
pub const PRICING_FEATURES: &[&str] = &[
    "monthly_revenue_mean",
    "monthly_revenue_std",
    "monthly_expense_mean",
    "monthly_expense_std",
    "avg_interest_rate",
    "avg_inflation_rate",
    "avg_market_volatility",
    "avg_utilization_rate",
    "avg_efficiency",
    "cashflow_count",
    "market_count",
    "utilization_count",
];

pub const YIELD_FEATURES: &[&str] = &[
    "yield_mean",
    "yield_std",
    "yield_min",
    "yield_max",
    "yield_count",
    "interest_rate",
    "inflation_rate",
    "market_volatility",
    "economic_growth",
    "sector_performance",
];

pub const RISK_FEATURES: &[&str] = &[
    "debt_to_equity",
    "current_ratio",
    "profit_margin",
    "return_on_equity",
    "cash_flow_coverage",
    "interest_rate_sensitivity",
    "currency_exposure",
    "commodity_exposure",
    "geographic_concentration",
    "sector_concentration",
    "utilization_rate",
    "efficiency",
    "maintenance_ratio",
    "staff_turnover",
    "quality_score",
];

pub const ANOMALY_FEATURES: &[&str] = &[
    "value_mean",
    "value_std",
    "value_min",
    "value_max",
    "value_p25",
    "value_p75",
    "value_count",
    "trend_slope",
];

pub fn feature_names(kind: ModelKind) -> &'static [&'static str] {
    match kind {
        ModelKind::Pricing => PRICING_FEATURES,
        ModelKind::Yield => YIELD_FEATURES,
        ModelKind::Risk => RISK_FEATURES,
        ModelKind::Anomaly => ANOMALY_FEATURES,
    }
}

/// Extract the feature vector for `kind` from a raw request. Deterministic:
/// identical input always produces a bit-identical vector. Missing optional
/// fields and degenerate statistics yield 0, never an error; the only
/// failure is handing a request to the wrong domain's extractor.
pub fn extract(kind: ModelKind, request: &PredictRequest) -> Result<FeatureVector, FeatureError> {
    if request.kind() != kind {
        return Err(FeatureError::DomainMismatch {
            model: kind,
            request: request.kind(),
        });
    }
    let features = match request {
        PredictRequest::Pricing(inputs) => pricing_features(inputs),
        PredictRequest::Yield(inputs) => yield_features(inputs),
        PredictRequest::Risk(inputs) => risk_features(inputs),
        PredictRequest::Anomaly(inputs) => anomaly_features(inputs),
    };
    debug_assert_eq!(features.len(), kind.feature_width());
    Ok(features)
}

fn pricing_features(inputs: &PricingInputs) -> FeatureVector {
    // Monthly totals keyed by (year, month); BTreeMap keeps summation order
    // stable so repeated extraction is bit-identical.
    let mut monthly_revenue: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    let mut monthly_expense: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for record in &inputs.cashflows {
        use chrono::Datelike;
        let month = (record.date.year(), record.date.month());
        let amount = record.amount.to_f64().unwrap_or(0.0);
        match record.flow {
            FlowKind::Revenue => *monthly_revenue.entry(month).or_insert(0.0) += amount,
            FlowKind::Expense => *monthly_expense.entry(month).or_insert(0.0) += amount,
            FlowKind::Other => {}
        }
    }
    let revenue: Vec<f64> = monthly_revenue.into_values().collect();
    let expense: Vec<f64> = monthly_expense.into_values().collect();

    let interest: Vec<f64> = inputs.market.iter().map(|m| m.interest_rate).collect();
    let inflation: Vec<f64> = inputs.market.iter().map(|m| m.inflation_rate).collect();
    let volatility: Vec<f64> = inputs.market.iter().map(|m| m.market_volatility).collect();
    let utilization: Vec<f64> = inputs
        .utilization
        .iter()
        .map(|u| u.utilization_rate)
        .collect();
    let efficiency: Vec<f64> = inputs.utilization.iter().map(|u| u.efficiency).collect();

    vec![
        mean(&revenue),
        std_dev(&revenue),
        mean(&expense),
        std_dev(&expense),
        mean(&interest),
        mean(&inflation),
        mean(&volatility),
        mean(&utilization),
        mean(&efficiency),
        inputs.cashflows.len() as f64,
        inputs.market.len() as f64,
        inputs.utilization.len() as f64,
    ]
}

fn yield_features(inputs: &YieldInputs) -> FeatureVector {
    let yields = &inputs.historical_yields;
    let c = &inputs.conditions;
    vec![
        mean(yields),
        std_dev(yields),
        minimum(yields),
        maximum(yields),
        yields.len() as f64,
        c.interest_rate,
        c.inflation_rate,
        c.market_volatility,
        c.economic_growth,
        c.sector_performance,
    ]
}

fn risk_features(inputs: &RiskInputs) -> FeatureVector {
    let f = &inputs.financial;
    let e = &inputs.exposure;
    let o = &inputs.operational;
    vec![
        f.debt_to_equity,
        f.current_ratio,
        f.profit_margin,
        f.return_on_equity,
        f.cash_flow_coverage,
        e.interest_rate_sensitivity,
        e.currency_exposure,
        e.commodity_exposure,
        e.geographic_concentration,
        e.sector_concentration,
        o.utilization_rate,
        o.efficiency,
        o.maintenance_ratio,
        o.staff_turnover,
        o.quality_score,
    ]
}

fn anomaly_features(inputs: &AnomalyInputs) -> FeatureVector {
    let values: Vec<f64> = inputs.series.iter().map(|p| p.value).collect();
    vec![
        mean(&values),
        std_dev(&values),
        minimum(&values),
        maximum(&values),
        percentile(&values, 25),
        percentile(&values, 75),
        values.len() as f64,
        trend_slope(&values),
    ]
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    Data::new(values.to_vec()).mean().unwrap_or(0.0)
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    Data::new(values.to_vec()).std_dev().unwrap_or(0.0)
}

fn minimum(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    Data::new(values.to_vec()).min()
}

fn maximum(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    Data::new(values.to_vec()).max()
}

fn percentile(values: &[f64], p: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    Data::new(values.to_vec()).percentile(p)
}

/// Least-squares slope of values against their index. Fewer than two
/// points have no trend, so the slope is 0.
fn trend_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<f64>() / n as f64;
    let mut covariance = 0.0;
    let mut x_variance = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        covariance += dx * (y - y_mean);
        x_variance += dx * dx;
    }
    if x_variance == 0.0 {
        return 0.0;
    }
    covariance / x_variance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::records::{
        CashflowRecord, MarketConditions, MarketRecord, SeriesPoint, UtilizationRecord,
    };
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn cashflow(date: (i32, u32, u32), amount: rust_decimal::Decimal, flow: FlowKind) -> CashflowRecord {
        CashflowRecord {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            amount,
            flow,
            category: "operating".to_string(),
        }
    }

    fn sample_pricing_inputs() -> PricingInputs {
        PricingInputs {
            cashflows: vec![
                cashflow((2026, 1, 5), dec!(1000), FlowKind::Revenue),
                cashflow((2026, 1, 20), dec!(2000), FlowKind::Revenue),
                cashflow((2026, 2, 5), dec!(5000), FlowKind::Revenue),
                cashflow((2026, 1, 10), dec!(-400), FlowKind::Expense),
                cashflow((2026, 2, 10), dec!(-600), FlowKind::Expense),
            ],
            market: vec![
                MarketRecord {
                    date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                    interest_rate: 0.04,
                    inflation_rate: 0.02,
                    market_volatility: 0.10,
                },
                MarketRecord {
                    date: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
                    interest_rate: 0.06,
                    inflation_rate: 0.02,
                    market_volatility: 0.20,
                },
            ],
            utilization: vec![UtilizationRecord {
                date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                utilization_rate: 0.8,
                capacity: 100.0,
                efficiency: 0.9,
            }],
        }
    }

    #[test]
    fn test_every_domain_width_matches_its_name_table() {
        for kind in ModelKind::ALL {
            assert_eq!(feature_names(kind).len(), kind.feature_width());
        }
        let empty: Vec<(ModelKind, PredictRequest)> = vec![
            (ModelKind::Pricing, PredictRequest::Pricing(Default::default())),
            (ModelKind::Yield, PredictRequest::Yield(Default::default())),
            (ModelKind::Risk, PredictRequest::Risk(Default::default())),
            (ModelKind::Anomaly, PredictRequest::Anomaly(Default::default())),
        ];
        for (kind, request) in empty {
            let features = extract(kind, &request).unwrap();
            assert_eq!(features.len(), kind.feature_width());
            assert!(features.iter().all(|v| *v == 0.0), "{} empty input", kind);
        }
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let request = PredictRequest::Pricing(sample_pricing_inputs());
        let first = extract(ModelKind::Pricing, &request).unwrap();
        let second = extract(ModelKind::Pricing, &request).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_pricing_aggregates_monthly_and_counts() {
        let request = PredictRequest::Pricing(sample_pricing_inputs());
        let features = extract(ModelKind::Pricing, &request).unwrap();

        // January revenue 3000, February 5000.
        assert!((features[0] - 4000.0).abs() < 1e-9, "revenue mean");
        assert!((features[2] - (-500.0)).abs() < 1e-9, "expense mean");
        assert!((features[4] - 0.05).abs() < 1e-12, "avg interest");
        assert_eq!(features[9], 5.0, "cashflow count");
        assert_eq!(features[10], 2.0, "market count");
        assert_eq!(features[11], 1.0, "utilization count");
    }

    #[test]
    fn test_yield_summary_and_condition_scalars() {
        let request = PredictRequest::Yield(YieldInputs {
            historical_yields: vec![0.04, 0.06, 0.08],
            conditions: MarketConditions {
                interest_rate: 0.05,
                sector_performance: 0.03,
                ..Default::default()
            },
            horizon: 12,
        });
        let features = extract(ModelKind::Yield, &request).unwrap();
        assert!((features[0] - 0.06).abs() < 1e-12, "mean");
        assert_eq!(features[2], 0.04, "min");
        assert_eq!(features[3], 0.08, "max");
        assert_eq!(features[4], 3.0, "count");
        assert_eq!(features[5], 0.05, "interest rate");
        assert_eq!(features[9], 0.03, "sector performance");
    }

    #[test]
    fn test_risk_positions_follow_group_order() {
        let mut inputs = RiskInputs::default();
        inputs.financial.debt_to_equity = 1.5;
        inputs.exposure.currency_exposure = 0.3;
        inputs.operational.quality_score = 0.95;

        let features = extract(ModelKind::Risk, &PredictRequest::Risk(inputs)).unwrap();
        assert_eq!(features[0], 1.5);
        assert_eq!(features[6], 0.3);
        assert_eq!(features[14], 0.95);
        assert_eq!(features.iter().filter(|v| **v != 0.0).count(), 3);
    }

    #[test]
    fn test_anomaly_summary_and_trend() {
        let series: Vec<SeriesPoint> = [10.0, 12.0, 14.0, 16.0]
            .iter()
            .enumerate()
            .map(|(i, v)| SeriesPoint {
                timestamp: Utc.with_ymd_and_hms(2026, 3, 1, i as u32, 0, 0).unwrap(),
                value: *v,
            })
            .collect();
        let request = PredictRequest::Anomaly(AnomalyInputs { series });
        let features = extract(ModelKind::Anomaly, &request).unwrap();

        assert_eq!(features[0], 13.0, "mean");
        assert_eq!(features[2], 10.0, "min");
        assert_eq!(features[3], 16.0, "max");
        assert_eq!(features[6], 4.0, "count");
        assert!((features[7] - 2.0).abs() < 1e-12, "slope of a 2-step ramp");
    }

    #[test]
    fn test_single_point_series_has_no_spread_or_trend() {
        let request = PredictRequest::Anomaly(AnomalyInputs {
            series: vec![SeriesPoint {
                timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
                value: 42.0,
            }],
        });
        let features = extract(ModelKind::Anomaly, &request).unwrap();
        assert_eq!(features[0], 42.0);
        assert_eq!(features[1], 0.0, "std of one point");
        assert_eq!(features[7], 0.0, "slope of one point");
    }

    #[test]
    fn test_wrong_domain_is_rejected() {
        let request = PredictRequest::Risk(RiskInputs::default());
        let err = extract(ModelKind::Pricing, &request).unwrap_err();
        assert!(matches!(
            err,
            FeatureError::DomainMismatch {
                model: ModelKind::Pricing,
                request: ModelKind::Risk
            }
        ));
    }
}
