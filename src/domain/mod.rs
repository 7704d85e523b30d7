// Model identity, versioning, registry entries
pub mod model;

// Fitted estimators and the anomaly outlier profile
pub mod estimator;

// Feature scaling
pub mod scaler;

// Typed raw records and request envelopes
pub mod records;

// Deterministic feature extraction
pub mod features;

// Prediction results
pub mod prediction;

// Job lifecycle: progress, cancellation, reports
pub mod jobs;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
