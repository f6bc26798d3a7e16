//! Prometheus metrics for chatgate.
//!
//! Tracks request throughput, latency, and per-gate deny counts.

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};

/// Prometheus metrics registry with all application metrics.
pub struct Metrics {
    registry: Registry,

    /// Total HTTP requests by method, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration in seconds
    pub http_request_duration_seconds: HistogramVec,

    /// Requests denied by a gate, by gate name
    pub gate_denials_total: CounterVec,
}

impl Metrics {
    /// Create a new metrics registry with all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // HTTP latency buckets (in seconds); gate checks are in-memory so
        // the interesting range is small.
        let http_buckets = vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0];

        let http_requests_total = CounterVec::new(
            Opts::new("chatgate_http_requests_total", "Total HTTP requests"),
            &["method", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "chatgate_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(http_buckets),
            &["method"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        let gate_denials_total = CounterVec::new(
            Opts::new(
                "chatgate_gate_denials_total",
                "Requests denied by a gate, by gate name",
            ),
            &["gate"],
        )?;
        registry.register(Box::new(gate_denials_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            gate_denials_total,
        })
    }

    /// Record a completed HTTP request.
    pub fn record_request(&self, method: &str, status: u16, duration_secs: f64) {
        self.http_requests_total
            .with_label_values(&[method, &status.to_string()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method])
            .observe(duration_secs);
    }

    /// Record a gate deny.
    pub fn record_denial(&self, gate: &str) {
        self.gate_denials_total.with_label_values(&[gate]).inc();
    }

    /// Export metrics in Prometheus text format.
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    /// Get the underlying registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
