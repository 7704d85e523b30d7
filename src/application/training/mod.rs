// Training pipeline: per-domain fitting and the staged retraining run
pub mod engine;
pub mod fit;

pub use engine::{RetrainEngine, RetrainSettings, default_cohort};
pub use fit::ForestParams;
