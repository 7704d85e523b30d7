//! Push-based observability for Assayer
//!
//! Outbound data only: no HTTP server, no incoming requests. Counters live
//! in a process-local Prometheus registry and a reporter task periodically
//! emits them as structured JSON lines on stdout, where a log shipper
//! (Loki, Fluentd, CloudWatch) picks them up.

pub mod metrics;
pub mod reporter;

pub use metrics::Metrics;
pub use reporter::MetricsReporter;
