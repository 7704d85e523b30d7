//! Model Registry
//!
//! In-process owner of the active {estimator, scaler, version} triple per
//! model domain. Entries are immutable and shared as `Arc`; replacement is
//! copy-on-write, so a concurrent reader holds either the full old entry or
//! the full new one and never a mix.

use crate::domain::errors::RegistryError;
use crate::domain::model::{ModelEntry, ModelKind, ModelVersion};
use crate::infrastructure::observability::metrics::Metrics;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

pub struct ModelRegistry {
    entries: RwLock<HashMap<ModelKind, Arc<ModelEntry>>>,
    metrics: Metrics,
}

impl ModelRegistry {
    pub fn new(metrics: Metrics) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    /// Active entry for `name`, or `NotLoaded` before any load/swap/default.
    pub async fn get(&self, name: ModelKind) -> Result<Arc<ModelEntry>, RegistryError> {
        self.entries
            .read()
            .await
            .get(&name)
            .cloned()
            .ok_or(RegistryError::NotLoaded { model: name })
    }

    /// Atomically publish a brand-new entry, returning the displaced one.
    /// In-flight readers keep serving whatever entry they already hold.
    pub async fn swap(&self, entry: ModelEntry) -> Option<Arc<ModelEntry>> {
        let name = entry.name;
        let version = entry.version.clone();
        let displaced = {
            let mut entries = self.entries.write().await;
            let displaced = entries.insert(name, Arc::new(entry));
            self.metrics.models_loaded.set(entries.len() as f64);
            displaced
        };
        self.metrics.inc_swap(name.as_str());
        match &displaced {
            Some(old) => info!("Hot-swapped {}: {} -> {}", name, old.version, version),
            None => info!("Hot-swapped {}: first entry at {}", name, version),
        }
        displaced
    }

    /// Install an untrained default entry unless one is already active.
    /// Returns the entry serving after the call either way.
    pub async fn initialize_default(&self, name: ModelKind, date: NaiveDate) -> Arc<ModelEntry> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(name)
            .or_insert_with(|| {
                info!("Installing untrained default for {}", name);
                Arc::new(ModelEntry::untrained(name, date))
            })
            .clone();
        self.metrics.models_loaded.set(entries.len() as f64);
        entry
    }

    /// (kind, version) pairs of every loaded model, in serving order.
    pub async fn inventory(&self) -> Vec<(ModelKind, ModelVersion)> {
        let entries = self.entries.read().await;
        ModelKind::ALL
            .iter()
            .filter_map(|kind| entries.get(kind).map(|e| (*kind, e.version.clone())))
            .collect()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(Metrics::default())
    }
}
