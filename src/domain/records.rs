use crate::domain::model::ModelKind;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One cashflow line item for an asset. Unknown flow labels deserialize to
/// `Other` instead of failing the whole record set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashflowRecord {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub flow: FlowKind,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowKind {
    Revenue,
    Expense,
    #[serde(other)]
    Other,
}

/// Daily market observation. Absent fields default to 0 rather than fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub interest_rate: f64,
    #[serde(default)]
    pub inflation_rate: f64,
    #[serde(default)]
    pub market_volatility: f64,
}

/// Daily asset utilization observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtilizationRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub utilization_rate: f64,
    #[serde(default)]
    pub capacity: f64,
    #[serde(default)]
    pub efficiency: f64,
}

/// One point of a numeric time series (sensor readings, metric samples).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Named market-condition scalars for yield forecasting. Every field
/// defaults to 0 when the caller omits it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MarketConditions {
    #[serde(default)]
    pub interest_rate: f64,
    #[serde(default)]
    pub inflation_rate: f64,
    #[serde(default)]
    pub market_volatility: f64,
    #[serde(default)]
    pub economic_growth: f64,
    #[serde(default)]
    pub sector_performance: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FinancialMetrics {
    #[serde(default)]
    pub debt_to_equity: f64,
    #[serde(default)]
    pub current_ratio: f64,
    #[serde(default)]
    pub profit_margin: f64,
    #[serde(default)]
    pub return_on_equity: f64,
    #[serde(default)]
    pub cash_flow_coverage: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MarketExposure {
    #[serde(default)]
    pub interest_rate_sensitivity: f64,
    #[serde(default)]
    pub currency_exposure: f64,
    #[serde(default)]
    pub commodity_exposure: f64,
    #[serde(default)]
    pub geographic_concentration: f64,
    #[serde(default)]
    pub sector_concentration: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OperationalMetrics {
    #[serde(default)]
    pub utilization_rate: f64,
    #[serde(default)]
    pub efficiency: f64,
    #[serde(default)]
    pub maintenance_ratio: f64,
    #[serde(default)]
    pub staff_turnover: f64,
    #[serde(default)]
    pub quality_score: f64,
}

/// Raw inputs for a pricing prediction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingInputs {
    #[serde(default)]
    pub cashflows: Vec<CashflowRecord>,
    #[serde(default)]
    pub market: Vec<MarketRecord>,
    #[serde(default)]
    pub utilization: Vec<UtilizationRecord>,
}

fn default_horizon() -> usize {
    12
}

/// Raw inputs for a yield forecast. `horizon` is the number of future
/// periods to project, defaulting to 12.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldInputs {
    #[serde(default)]
    pub historical_yields: Vec<f64>,
    #[serde(default)]
    pub conditions: MarketConditions,
    #[serde(default = "default_horizon")]
    pub horizon: usize,
}

impl Default for YieldInputs {
    fn default() -> Self {
        Self {
            historical_yields: Vec::new(),
            conditions: MarketConditions::default(),
            horizon: default_horizon(),
        }
    }
}

/// Raw inputs for a risk assessment: three fixed five-scalar groups.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RiskInputs {
    #[serde(default)]
    pub financial: FinancialMetrics,
    #[serde(default)]
    pub exposure: MarketExposure,
    #[serde(default)]
    pub operational: OperationalMetrics,
}

/// Raw inputs for anomaly scoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnomalyInputs {
    #[serde(default)]
    pub series: Vec<SeriesPoint>,
}

/// A prediction request, tagged by the domain it addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "lowercase")]
pub enum PredictRequest {
    Pricing(PricingInputs),
    Yield(YieldInputs),
    Risk(RiskInputs),
    Anomaly(AnomalyInputs),
}

impl PredictRequest {
    pub fn kind(&self) -> ModelKind {
        match self {
            PredictRequest::Pricing(_) => ModelKind::Pricing,
            PredictRequest::Yield(_) => ModelKind::Yield,
            PredictRequest::Risk(_) => ModelKind::Risk,
            PredictRequest::Anomaly(_) => ModelKind::Anomaly,
        }
    }
}

/// What the data source returns for one (target, domain) pair: the domain's
/// raw inputs plus the observed training target for supervised domains.
/// Anomaly is unsupervised and carries no target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainRecords {
    Pricing {
        inputs: PricingInputs,
        observed_value: f64,
    },
    Yield {
        inputs: YieldInputs,
        observed_yield: f64,
    },
    Risk {
        inputs: RiskInputs,
        observed_score: f64,
    },
    Anomaly {
        inputs: AnomalyInputs,
    },
}

impl DomainRecords {
    pub fn kind(&self) -> ModelKind {
        match self {
            DomainRecords::Pricing { .. } => ModelKind::Pricing,
            DomainRecords::Yield { .. } => ModelKind::Yield,
            DomainRecords::Risk { .. } => ModelKind::Risk,
            DomainRecords::Anomaly { .. } => ModelKind::Anomaly,
        }
    }

    pub fn target(&self) -> Option<f64> {
        match self {
            DomainRecords::Pricing { observed_value, .. } => Some(*observed_value),
            DomainRecords::Yield { observed_yield, .. } => Some(*observed_yield),
            DomainRecords::Risk { observed_score, .. } => Some(*observed_score),
            DomainRecords::Anomaly { .. } => None,
        }
    }

    pub fn into_request(self) -> PredictRequest {
        match self {
            DomainRecords::Pricing { inputs, .. } => PredictRequest::Pricing(inputs),
            DomainRecords::Yield { inputs, .. } => PredictRequest::Yield(inputs),
            DomainRecords::Risk { inputs, .. } => PredictRequest::Risk(inputs),
            DomainRecords::Anomaly { inputs } => PredictRequest::Anomaly(inputs),
        }
    }
}

/// Lookback window for record fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub days: u32,
}

impl Window {
    pub const fn days(days: u32) -> Self {
        Self { days }
    }
}

impl Default for Window {
    fn default() -> Self {
        Self { days: 365 }
    }
}

/// One labeled training example, already split into request and target.
#[derive(Debug, Clone)]
pub struct TrainingExample {
    pub request: PredictRequest,
    pub target: Option<f64>,
}

/// Per-domain training records gathered once per retraining run and
/// discarded after fitting.
#[derive(Debug, Default)]
pub struct TrainingBatch {
    examples: HashMap<ModelKind, Vec<TrainingExample>>,
}

impl TrainingBatch {
    pub fn push(&mut self, records: DomainRecords) {
        let kind = records.kind();
        let target = records.target();
        self.examples
            .entry(kind)
            .or_default()
            .push(TrainingExample {
                request: records.into_request(),
                target,
            });
    }

    pub fn domain(&self, kind: ModelKind) -> &[TrainingExample] {
        self.examples.get(&kind).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self, kind: ModelKind) -> usize {
        self.examples.get(&kind).map_or(0, Vec::len)
    }
}
