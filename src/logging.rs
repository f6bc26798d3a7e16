//! Unified JSON logging with custom format.
//!
//! Log format:
//! ```json
//! {"ts":"2026-08-05T18:04:05.123Z","level":"info","type":"app","msg":"Server started","ctx":{},"data":{}}
//! ```

use std::collections::HashMap;

use serde::Serialize;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

/// Initialize the global tracing subscriber from logging configuration.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chatgate=info"));

    if config.json {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .event_format(JsonFormatter::new(config.service_name.clone())),
            )
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init();
    }
}

/// Log entry with unified structure.
#[derive(Serialize)]
pub struct LogEntry<'a> {
    /// ISO 8601 timestamp with milliseconds, UTC
    pub ts: &'a str,
    /// Log level: debug, info, warn, error
    pub level: &'a str,
    /// Log type: app, request, error
    #[serde(rename = "type")]
    pub log_type: &'a str,
    /// Short human-readable message
    pub msg: &'a str,
    /// Context: service name, request_id
    pub ctx: LogContext<'a>,
    /// Type-specific data
    pub data: HashMap<&'a str, serde_json::Value>,
}

/// Log context.
#[derive(Serialize, Default)]
pub struct LogContext<'a> {
    /// Service name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<&'a str>,
    /// Request ID for correlation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<&'a str>,
}

/// Custom JSON formatter for tracing.
pub struct JsonFormatter {
    service_name: String,
}

impl JsonFormatter {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for JsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let level = match *meta.level() {
            Level::TRACE => "debug",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };

        // Determine log type from target
        let log_type = if meta.target() == "request" {
            "request"
        } else if *meta.level() == Level::ERROR {
            "error"
        } else {
            "app"
        };

        // Collect fields
        let mut visitor = FieldVisitor::new();
        event.record(&mut visitor);

        let ts = chrono::Utc::now()
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();

        // Build message
        let msg = if log_type == "request" {
            // For request logs, build "USER PATH"
            let user = visitor
                .fields
                .get("user")
                .and_then(|v| v.as_str())
                .unwrap_or("?");
            let path = visitor
                .fields
                .get("path")
                .and_then(|v| v.as_str())
                .unwrap_or("?");
            format!("{} {}", user, path)
        } else {
            visitor.message.clone().unwrap_or_default()
        };

        // Build context
        let ctx = serde_json::json!({
            "service": &self.service_name
        });

        // Build data (remove message from fields for app logs)
        let mut data = visitor.fields;
        if log_type != "request" {
            data.remove("message");
        }

        // Build final JSON
        let entry = serde_json::json!({
            "ts": ts,
            "level": level,
            "type": log_type,
            "msg": msg,
            "ctx": ctx,
            "data": data,
        });

        writeln!(
            writer,
            "{}",
            serde_json::to_string(&entry).unwrap_or_default()
        )
    }
}

/// Field visitor for collecting tracing fields.
struct FieldVisitor {
    message: Option<String>,
    fields: HashMap<String, serde_json::Value>,
}

impl FieldVisitor {
    fn new() -> Self {
        Self {
            message: None,
            fields: HashMap::new(),
        }
    }
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value).trim_matches('"').to_string());
        } else {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::String(format!("{:?}", value)),
            );
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::String(value.to_string()),
            );
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }
}
