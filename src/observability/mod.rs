//! Observability: Prometheus metrics.

mod metrics;

pub use metrics::Metrics;
