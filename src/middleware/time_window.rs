//! Time-of-day access restriction middleware.
//!
//! Denies requests to protected paths outside a configured hour range,
//! e.g. a chat that is only open between 18:00 and 21:00 local time.

use chrono::{DateTime, Local, Timelike};

use crate::config::GatesConfig;
use crate::core::{Context, Request, Response};

use super::{Middleware, MiddlewareResult, DENIED_BY};

/// Time-window gate.
///
/// The allowed range is half-open `[start, end)` at hour granularity:
/// a request at `start:00:00` is allowed, one at `end:00:00` is denied,
/// minutes and seconds are ignored. The check is a pure function of the
/// request path and wall-clock hour; no state is mutated.
pub struct TimeWindowGate {
    start_hour: u32,
    end_hour: u32,
    paths: Vec<String>,
}

impl TimeWindowGate {
    /// Create a new gate for the given allowed hour range and path prefixes.
    pub fn new(start_hour: u32, end_hour: u32, paths: Vec<String>) -> Self {
        Self {
            start_hour,
            end_hour,
            paths,
        }
    }

    /// Create from gate configuration.
    /// Returns None if the time window is not enabled.
    pub fn from_config(config: &GatesConfig) -> Option<Self> {
        config.time_window.then(|| {
            Self::new(
                config.allowed_start_hour,
                config.allowed_end_hour,
                config.time_window_paths.clone(),
            )
        })
    }

    /// Whether this path is protected by the gate.
    fn applies(&self, path: &str) -> bool {
        self.paths.iter().any(|p| path.starts_with(p.as_str()))
    }

    /// Decide whether a request to `path` arriving at `now` passes.
    ///
    /// Returns the 403 response for denied requests, None for allowed ones.
    pub fn check(&self, path: &str, now: DateTime<Local>) -> Option<Response> {
        if !self.applies(path) {
            return None;
        }

        let hour = now.hour();
        if hour >= self.start_hour && hour < self.end_hour {
            return None;
        }

        let body = format!(
            "Access denied. Chat is only available between {:02}:00 and {:02}:00. Current time: {}.",
            self.start_hour,
            self.end_hour,
            now.format("%H:%M:%S"),
        );
        Some(Response::forbidden(body))
    }
}

impl Middleware for TimeWindowGate {
    fn name(&self) -> &'static str {
        "time_window"
    }

    fn priority(&self) -> i32 {
        -90 // Before the rate limiter, after request logging
    }

    fn on_request(&self, req: Request, ctx: &mut Context) -> MiddlewareResult {
        match self.check(req.path(), ctx.received_at) {
            None => MiddlewareResult::Next(req),
            Some(res) => {
                tracing::debug!(
                    path = req.path(),
                    hour = ctx.received_at.hour(),
                    start = self.start_hour,
                    end = self.end_hour,
                    "request outside allowed hours"
                );
                ctx.set(DENIED_BY, self.name());
                MiddlewareResult::Stop(res)
            }
        }
    }
}
