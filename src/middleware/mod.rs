//! Middleware pipeline for request/response processing.
//!
//! This module provides the composable gate system that runs in front of the
//! downstream handler. Middleware can:
//! - Inspect incoming requests
//! - Short-circuit the pipeline and return early responses (Deny outcomes)
//! - Modify outgoing responses
//!
//! # Example
//!
//! ```rust,ignore
//! use chatgate::middleware::{Middleware, MiddlewareResult, MiddlewareChain};
//! use chatgate::core::{Request, Response, Context};
//!
//! struct LoggingMiddleware;
//!
//! impl Middleware for LoggingMiddleware {
//!     fn name(&self) -> &'static str { "logging" }
//!
//!     fn on_request(&self, req: Request, ctx: &mut Context) -> MiddlewareResult {
//!         println!("Request: {} {}", req.method(), req.path());
//!         MiddlewareResult::Next(req)
//!     }
//! }
//!
//! let chain = MiddlewareChain::new().add(LoggingMiddleware);
//! ```

mod chain;

pub mod rate_limit;
pub mod request_log;
pub mod time_window;

pub use chain::MiddlewareChain;

use crate::core::{Context, Request, Response};

/// Context key under which a denying gate records its name.
pub const DENIED_BY: &str = "denied_by";

/// Result of middleware request processing.
#[derive(Debug)]
pub enum MiddlewareResult {
    /// Continue to the next middleware with the (possibly modified) request.
    Next(Request),
    /// Stop the middleware chain and return this response immediately.
    Stop(Response),
}

impl MiddlewareResult {
    /// Check if this result continues the chain.
    pub fn is_next(&self) -> bool {
        matches!(self, MiddlewareResult::Next(_))
    }

    /// Check if this result stops the chain.
    pub fn is_stop(&self) -> bool {
        matches!(self, MiddlewareResult::Stop(_))
    }

    /// Unwrap the request if this is a Next result.
    pub fn into_request(self) -> Option<Request> {
        match self {
            MiddlewareResult::Next(req) => Some(req),
            MiddlewareResult::Stop(_) => None,
        }
    }

    /// Unwrap the response if this is a Stop result.
    pub fn into_response(self) -> Option<Response> {
        match self {
            MiddlewareResult::Next(_) => None,
            MiddlewareResult::Stop(res) => Some(res),
        }
    }
}

/// Trait for implementing middleware.
///
/// Middleware processes requests before they reach the handler and responses
/// after the handler returns. The pipeline executes `on_request` in order
/// and `on_response` in reverse order.
///
/// # Lifecycle
///
/// ```text
/// Request → MW1.on_request → MW2.on_request → Handler
///                                                ↓
/// Response ← MW1.on_response ← MW2.on_response ←─┘
/// ```
///
/// # Implementation Notes
///
/// - `on_request` can modify the request or short-circuit with a response
/// - `on_response` can modify the response (e.g., add headers)
/// - Context allows middleware to communicate (e.g., record which gate denied)
pub trait Middleware: Send + Sync {
    /// Unique name for this middleware (used for logging/metrics).
    fn name(&self) -> &'static str;

    /// Priority for ordering in the chain.
    /// Lower values execute first for requests, last for responses.
    /// Default is 0.
    ///
    /// Suggested priority ranges:
    /// - -100..-50: Request logging, gates (time window, rate limiting)
    /// - -50..0: Tracing
    /// - 0..50: Request modification
    /// - 50..100: Response modification
    fn priority(&self) -> i32 {
        0
    }

    /// Process an incoming request.
    ///
    /// Return `MiddlewareResult::Next(req)` to continue the chain,
    /// or `MiddlewareResult::Stop(res)` to short-circuit with a response.
    fn on_request(&self, req: Request, _ctx: &mut Context) -> MiddlewareResult {
        MiddlewareResult::Next(req)
    }

    /// Process an outgoing response.
    ///
    /// Called in reverse order after the handler returns.
    fn on_response(&self, res: Response, _ctx: &Context) -> Response {
        res
    }
}
