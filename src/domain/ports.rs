use crate::domain::errors::{SourceError, StoreError};
use crate::domain::jobs::JobProgress;
use crate::domain::records::{DomainRecords, Window};
use async_trait::async_trait;

/// Durable key/bytes object store. `get` on an absent key fails with
/// `StoreError::Miss`; there is deliberately no delete.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// Black-box provider of raw domain records for one target over a lookback
/// window. Implementations decide how records come to exist.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch(
        &self,
        target_id: &str,
        domain: crate::domain::model::ModelKind,
        window: Window,
    ) -> Result<DomainRecords, SourceError>;
}

/// Receives advisory progress snapshots from running jobs. Updates may be
/// dropped without affecting job correctness.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn update(&self, progress: JobProgress);
}
