use crate::domain::model::ModelKind;
use thiserror::Error;

/// Errors from feature extraction. Missing optional fields never fail
/// (they default to 0); only structurally unusable input does.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Domain mismatch: {model} extractor received a {request} request")]
    DomainMismatch { model: ModelKind, request: ModelKind },
}

/// Errors from scaler application.
#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("Feature width mismatch: scaler expects {expected}, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },
}

/// Errors raised by a fitted estimator at prediction time.
#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("Input matrix construction failed: {reason}")]
    Matrix { reason: String },

    #[error("Estimator inference failed: {reason}")]
    Predict { reason: String },

    #[error("Estimator returned no prediction")]
    NoOutput,
}

/// Errors from registry lookups.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Model not loaded: {model}")]
    NotLoaded { model: ModelKind },
}

/// Errors from the durable object store and the artifact codec above it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object not found: {key}")]
    Miss { key: String },

    #[error("Failed to serialize {key}: {reason}")]
    Serialize { key: String, reason: String },

    #[error("Failed to deserialize {key}: {reason}")]
    Deserialize { key: String, reason: String },

    #[error("Object store backend failure: {reason}")]
    Backend { reason: String },
}

/// Any failure during a prediction request, wrapping the originating cause.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Feature extraction failed: {0}")]
    Feature(#[from] FeatureError),

    #[error("Model lookup failed: {0}")]
    Registry(#[from] RegistryError),

    #[error("Scaling failed: {0}")]
    Scale(#[from] ScaleError),

    #[error("Estimation failed: {0}")]
    Estimator(#[from] EstimatorError),
}

/// One domain's retraining step failed. Isolated per domain; never aborts
/// the surrounding run.
#[derive(Debug, Error)]
pub enum FitError {
    #[error("No training examples collected for {model}")]
    EmptyTrainingSet { model: ModelKind },

    #[error("Non-finite value in training example {example} for {model}")]
    NonFinite { model: ModelKind, example: usize },

    #[error("Fitting {model} failed: {reason}")]
    Training { model: ModelKind, reason: String },
}

/// Storage write failure for one model's artifacts. Reported per model;
/// never blocks persistence attempts for sibling models.
#[derive(Debug, Error)]
#[error("Failed to persist {model} artifacts: {source}")]
pub struct PersistError {
    pub model: ModelKind,
    #[source]
    pub source: StoreError,
}

/// Errors from the data-source collaborator.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Unknown target: {target}")]
    UnknownTarget { target: String },

    #[error("Record source unavailable for {target}: {reason}")]
    Unavailable { target: String, reason: String },
}

/// One batch item failed. Isolated per item; never aborts the batch.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("Record fetch failed: {0}")]
    Source(#[from] SourceError),

    #[error("Prediction failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("Storage access failed: {0}")]
    Store(#[from] StoreError),

    #[error("Malformed raw payload: {reason}")]
    Malformed { reason: String },
}

/// Run-fatal retraining failures. Per-domain fit and persist failures are
/// not run-fatal; they are carried in the run report instead.
#[derive(Debug, Error)]
pub enum RetrainError {
    #[error("Training data collection failed: {0}")]
    Collection(#[from] SourceError),

    #[error("Run cancelled during {stage}")]
    Cancelled { stage: String },

    #[error("Failed to persist run report: {0}")]
    ReportPersist(#[from] StoreError),
}

/// Run-fatal batch failures. Per-item failures are carried in the report.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Batch cancelled after {completed} of {total} targets")]
    Cancelled { completed: usize, total: usize },

    #[error("Failed to persist batch report: {0}")]
    ReportPersist(#[from] StoreError),
}
