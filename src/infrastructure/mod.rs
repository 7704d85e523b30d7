pub mod jobs;
pub mod memory_store;
pub mod model_store;
pub mod observability;
pub mod synthetic;

pub use jobs::{DispatchSink, JobDispatcher, LogSink};
pub use memory_store::MemoryObjectStore;
pub use model_store::ModelStore;
pub use synthetic::SyntheticSource;
