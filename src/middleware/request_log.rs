//! Request logging middleware.
//!
//! Appends one line per request (timestamp, resolved identity, path) to
//! an append-only log file, alongside a structured tracing event.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::core::{Context, Request};

use super::{Middleware, MiddlewareResult};

/// Identity recorded for requests without a resolved user.
const ANONYMOUS: &str = "Anonymous";

/// Append-only file sink for the request log.
///
/// Writes are serialized through a mutex; each line is flushed to the OS
/// on write. A failed write degrades to a warning, never an error for
/// the request being served.
pub struct RequestLog {
    file: Mutex<File>,
}

impl RequestLog {
    /// Open (or create) the log file in append mode.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Append one line to the log.
    pub fn append(&self, line: &str) {
        let mut file = self.file.lock().unwrap();
        if let Err(e) = writeln!(file, "{}", line) {
            tracing::warn!(error = %e, "failed to write request log entry");
        }
    }
}

/// Request logging middleware.
///
/// Runs first in the chain so that requests denied by a later gate are
/// still recorded. Never short-circuits.
pub struct RequestLogMiddleware {
    log: Arc<RequestLog>,
}

impl RequestLogMiddleware {
    /// Create a new request log middleware over an opened sink.
    pub fn new(log: Arc<RequestLog>) -> Self {
        Self { log }
    }
}

impl Middleware for RequestLogMiddleware {
    fn name(&self) -> &'static str {
        "request_log"
    }

    fn priority(&self) -> i32 {
        -100 // First in the chain: every request is logged
    }

    fn on_request(&self, req: Request, ctx: &mut Context) -> MiddlewareResult {
        let user = ctx.user.as_deref().unwrap_or(ANONYMOUS);

        let line = format!(
            "{} - User: {} - Path: {}",
            ctx.received_at.format("%Y-%m-%d %H:%M:%S%.6f"),
            user,
            req.path(),
        );
        self.log.append(&line);

        tracing::debug!(
            target: "request",
            user = user,
            path = req.path(),
            client = %ctx.client_key,
            request_id = %ctx.request_id,
            "request received"
        );

        MiddlewareResult::Next(req)
    }
}
