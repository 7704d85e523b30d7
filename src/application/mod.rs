// Model serving: registry and inference path
pub mod inference;
pub mod registry;

// Background work: retraining runs and batch jobs
pub mod batch;
pub mod training;

// System orchestrator
pub mod system;
