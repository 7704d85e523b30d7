use crate::domain::estimator::Estimator;
use crate::domain::scaler::StandardScaler;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of served model domains. Extending it means adding a feature
/// extraction rule and a training routine, not just a new variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Pricing,
    Yield,
    Risk,
    Anomaly,
}

impl ModelKind {
    /// Fixed fitting/serving order for retraining runs.
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Pricing,
        ModelKind::Yield,
        ModelKind::Risk,
        ModelKind::Anomaly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Pricing => "pricing",
            ModelKind::Yield => "yield",
            ModelKind::Risk => "risk",
            ModelKind::Anomaly => "anomaly",
        }
    }

    /// Width of the feature vector this domain's extractor produces.
    pub fn feature_width(&self) -> usize {
        match self {
            ModelKind::Pricing => 12,
            ModelKind::Yield => 10,
            ModelKind::Risk => 15,
            ModelKind::Anomaly => 8,
        }
    }

    /// Output of an untrained default entry, chosen so downstream
    /// post-processing stays sensible (risk sits mid-band, the rest at 0).
    pub fn neutral_output(&self) -> f64 {
        match self {
            ModelKind::Risk => 50.0,
            _ => 0.0,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pricing" => Ok(ModelKind::Pricing),
            "yield" => Ok(ModelKind::Yield),
            "risk" => Ok(ModelKind::Risk),
            "anomaly" => Ok(ModelKind::Anomaly),
            _ => anyhow::bail!("Unknown model kind: {}", s),
        }
    }
}

const VERSION_DATE_FORMAT: &str = "%Y%m%d";

/// Audit version stamp, rendered as `v<major>.<minor>.<patch>-<YYYYMMDD>`.
/// Advances monotonically per retraining run; never used for correctness
/// gating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub date: String,
}

impl ModelVersion {
    /// Version assigned by `initialize_default`: v1.0.0 stamped with the day.
    pub fn initial(date: NaiveDate) -> Self {
        Self {
            major: 1,
            minor: 0,
            patch: 0,
            date: date.format(VERSION_DATE_FORMAT).to_string(),
        }
    }

    /// Next version after a retraining run on `date`.
    pub fn bump_patch(&self, date: NaiveDate) -> Self {
        Self {
            major: self.major,
            minor: self.minor,
            patch: self.patch + 1,
            date: date.format(VERSION_DATE_FORMAT).to_string(),
        }
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "v{}.{}.{}-{}",
            self.major, self.minor, self.patch, self.date
        )
    }
}

impl FromStr for ModelVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix('v')
            .ok_or_else(|| anyhow::anyhow!("Version missing 'v' prefix: {}", s))?;
        let (numbers, date) = body
            .split_once('-')
            .ok_or_else(|| anyhow::anyhow!("Version missing date stamp: {}", s))?;
        let mut parts = numbers.split('.');
        let mut next = |label: &str| -> anyhow::Result<u32> {
            parts
                .next()
                .ok_or_else(|| anyhow::anyhow!("Version missing {} component: {}", label, s))?
                .parse()
                .map_err(|e| anyhow::anyhow!("Bad {} component in {}: {}", label, s, e))
        };
        let major = next("major")?;
        let minor = next("minor")?;
        let patch = next("patch")?;
        if parts.next().is_some() {
            anyhow::bail!("Version has trailing components: {}", s);
        }
        Ok(Self {
            major,
            minor,
            patch,
            date: date.to_string(),
        })
    }
}

impl TryFrom<String> for ModelVersion {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ModelVersion> for String {
    fn from(v: ModelVersion) -> Self {
        v.to_string()
    }
}

/// The active artifact triple served for one model domain. Immutable once
/// constructed; retraining builds a brand-new entry and swaps the whole
/// thing, it never mutates a live one.
#[derive(Debug)]
pub struct ModelEntry {
    pub name: ModelKind,
    pub estimator: Estimator,
    pub scaler: StandardScaler,
    pub version: ModelVersion,
    pub trained_at: DateTime<Utc>,
}

impl ModelEntry {
    /// Untrained-but-usable default: neutral estimator, identity scaler,
    /// v1.0.0 stamped with `date`. Used at startup when storage has no
    /// artifacts yet.
    pub fn untrained(name: ModelKind, date: NaiveDate) -> Self {
        Self {
            name,
            estimator: Estimator::neutral(name),
            scaler: StandardScaler::identity(name.feature_width()),
            version: ModelVersion::initial(date),
            trained_at: Utc::now(),
        }
    }

    pub fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            version: self.version.clone(),
            last_updated: self.trained_at,
            estimator_kind: self.estimator.kind().to_string(),
            scaler_kind: self.scaler.kind().to_string(),
        }
    }
}

/// Sidecar record persisted next to the serialized estimator and scaler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub version: ModelVersion,
    pub last_updated: DateTime<Utc>,
    pub estimator_kind: String,
    pub scaler_kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_renders_with_prefix_and_date() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 21).unwrap();
        let version = ModelVersion::initial(date);
        assert_eq!(version.to_string(), "v1.0.0-20260821");
    }

    #[test]
    fn test_version_round_trips_through_string() {
        let parsed: ModelVersion = "v2.3.11-20251204".parse().unwrap();
        assert_eq!(parsed.major, 2);
        assert_eq!(parsed.minor, 3);
        assert_eq!(parsed.patch, 11);
        assert_eq!(parsed.date, "20251204");
        assert_eq!(parsed.to_string(), "v2.3.11-20251204");
    }

    #[test]
    fn test_version_rejects_malformed_strings() {
        assert!("1.0.0-20260821".parse::<ModelVersion>().is_err());
        assert!("v1.0-20260821".parse::<ModelVersion>().is_err());
        assert!("v1.0.0".parse::<ModelVersion>().is_err());
        assert!("v1.0.0.0-20260821".parse::<ModelVersion>().is_err());
    }

    #[test]
    fn test_bump_patch_advances_and_restamps() {
        let v1 = ModelVersion::initial(NaiveDate::from_ymd_opt(2026, 1, 2).unwrap());
        let v2 = v1.bump_patch(NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
        assert_eq!(v2.to_string(), "v1.0.1-20260304");
        // The original stamp is untouched; bumping builds a new value.
        assert_eq!(v1.to_string(), "v1.0.0-20260102");
    }

    #[test]
    fn test_kind_labels_parse_back() {
        for kind in ModelKind::ALL {
            let parsed: ModelKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("sentiment".parse::<ModelKind>().is_err());
    }

    #[test]
    fn test_untrained_entry_reports_baseline_metadata() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 21).unwrap();
        let entry = ModelEntry::untrained(ModelKind::Risk, date);
        let meta = entry.metadata();
        assert_eq!(meta.version.to_string(), "v1.0.0-20260821");
        assert_eq!(meta.estimator_kind, "baseline");
        assert_eq!(meta.scaler_kind, "standard");
    }
}
