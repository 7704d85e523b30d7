//! Model Store
//!
//! Serializes model entries to the object store as three JSON artifacts per
//! model: `models/<name>/model.json`, `scaler.json` and `metadata.json`.
//! Loading misses if any of the three is absent so the caller can fall back
//! to an untrained default.

use crate::domain::errors::StoreError;
use crate::domain::estimator::Estimator;
use crate::domain::model::{ModelEntry, ModelKind, ModelMetadata};
use crate::domain::ports::ObjectStore;
use crate::domain::scaler::StandardScaler;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct ModelStore {
    store: Arc<dyn ObjectStore>,
}

impl ModelStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    fn model_key(name: ModelKind) -> String {
        format!("models/{}/model.json", name)
    }

    fn scaler_key(name: ModelKind) -> String {
        format!("models/{}/scaler.json", name)
    }

    fn metadata_key(name: ModelKind) -> String {
        format!("models/{}/metadata.json", name)
    }

    /// Write all three artifacts. The first failure surfaces immediately;
    /// no internal retries, the caller reports failure upward.
    pub async fn save(&self, entry: &ModelEntry) -> Result<(), StoreError> {
        self.put_json(&Self::model_key(entry.name), &entry.estimator)
            .await?;
        self.put_json(&Self::scaler_key(entry.name), &entry.scaler)
            .await?;
        self.put_json(&Self::metadata_key(entry.name), &entry.metadata())
            .await?;
        info!("Persisted {} artifacts at {}", entry.name, entry.version);
        Ok(())
    }

    /// Reassemble an entry from storage. Any absent artifact propagates as
    /// a `Miss`; corrupt payloads surface as `Deserialize`.
    pub async fn load(&self, name: ModelKind) -> Result<ModelEntry, StoreError> {
        let estimator: Estimator = self.fetch_json(&Self::model_key(name)).await?;
        let scaler: StandardScaler = self.fetch_json(&Self::scaler_key(name)).await?;
        let metadata: ModelMetadata = self.fetch_json(&Self::metadata_key(name)).await?;
        Ok(ModelEntry {
            name,
            estimator,
            scaler,
            version: metadata.version,
            trained_at: metadata.last_updated,
        })
    }

    async fn put_json<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(value).map_err(|e| StoreError::Serialize {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.store.put(key, bytes).await
    }

    async fn fetch_json<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        let bytes = self.store.get(key).await?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Deserialize {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory_store::MemoryObjectStore;
    use chrono::NaiveDate;

    fn store() -> ModelStore {
        ModelStore::new(Arc::new(MemoryObjectStore::new()))
    }

    #[tokio::test]
    async fn test_save_writes_all_three_artifacts() {
        let objects = Arc::new(MemoryObjectStore::new());
        let model_store = ModelStore::new(objects.clone());
        let entry = ModelEntry::untrained(
            ModelKind::Yield,
            NaiveDate::from_ymd_opt(2026, 8, 21).unwrap(),
        );

        model_store.save(&entry).await.unwrap();
        let keys = objects.list("models/yield/").await.unwrap();
        assert_eq!(
            keys,
            vec![
                "models/yield/metadata.json",
                "models/yield/model.json",
                "models/yield/scaler.json",
            ]
        );
    }

    #[tokio::test]
    async fn test_load_absent_model_misses() {
        let err = store().load(ModelKind::Pricing).await.unwrap_err();
        assert!(matches!(err, StoreError::Miss { .. }));
    }

    #[tokio::test]
    async fn test_load_rejects_corrupt_artifacts() {
        let objects = Arc::new(MemoryObjectStore::new());
        let model_store = ModelStore::new(objects.clone());
        let entry = ModelEntry::untrained(
            ModelKind::Risk,
            NaiveDate::from_ymd_opt(2026, 8, 21).unwrap(),
        );
        model_store.save(&entry).await.unwrap();

        objects
            .put("models/risk/scaler.json", b"not json".to_vec())
            .await
            .unwrap();
        let err = model_store.load(ModelKind::Risk).await.unwrap_err();
        assert!(matches!(err, StoreError::Deserialize { key, .. } if key.contains("scaler")));
    }

    #[tokio::test]
    async fn test_round_trip_preserves_version_and_kind() {
        let model_store = store();
        let entry = ModelEntry::untrained(
            ModelKind::Anomaly,
            NaiveDate::from_ymd_opt(2026, 8, 21).unwrap(),
        );
        model_store.save(&entry).await.unwrap();

        let loaded = model_store.load(ModelKind::Anomaly).await.unwrap();
        assert_eq!(loaded.version, entry.version);
        assert_eq!(loaded.estimator.kind(), "baseline");
        assert_eq!(loaded.scaler, entry.scaler);
    }
}
