//! chatgate - Request gating layer for a messaging API, powered by Rust and Tokio.
//!
//! This crate provides an async HTTP front that runs every request through a
//! composable chain of gates before it reaches the downstream handler.
//!
//! # Features
//!
//! - **Middleware Pipeline**: Composable request/response middleware
//! - **Time Window Gate**: Denies protected paths outside allowed hours (403)
//! - **Rate Limiting**: Per-client sliding-window limit on message sends (429)
//! - **Request Logging**: One line per request to an append-only file
//! - **Observability**: Structured logging with tracing, Prometheus metrics
//!
//! # Architecture
//!
//! Gates implement the [`middleware::Middleware`] trait and are composed into
//! a [`middleware::MiddlewareChain`] at startup. The downstream stage is any
//! [`server::Handler`]; the shipped binary uses a stub messaging API.
//!
//! # Example
//!
//! ```rust,ignore
//! use chatgate::config::Config;
//! use chatgate::middleware::MiddlewareChain;
//! use chatgate::middleware::time_window::TimeWindowGate;
//! use chatgate::server::{Server, StubHandler};
//!
//! let config = Config::from_env()?;
//! let chain = MiddlewareChain::new()
//!     .add(TimeWindowGate::new(18, 21, vec!["/api/messages/".into()]));
//! let server = Server::new(config.server, chain, handler, metrics);
//! server.run().await?;
//! ```

/// Package version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod core;
pub mod logging;
pub mod middleware;
pub mod observability;
pub mod server;

// Re-exports for convenience
pub use config::Config;
pub use server::Server;
