use std::sync::Arc;

use tracing::info;

use chatgate::config::{Config, ConfigError};
use chatgate::middleware::rate_limit::RateLimitMiddleware;
use chatgate::middleware::request_log::{RequestLog, RequestLogMiddleware};
use chatgate::middleware::time_window::TimeWindowGate;
use chatgate::middleware::MiddlewareChain;
use chatgate::observability::Metrics;
use chatgate::server::{Handler, Server, StubHandler};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::from_env()?;

    chatgate::logging::init(&config.logging);

    info!("Starting chatgate {}...", chatgate::PKG_VERSION);
    config.log_summary();

    let metrics = Arc::new(Metrics::new()?);

    // Build the gate chain. Order comes from middleware priorities:
    // request log, then time window, then rate limiter.
    let mut chain = MiddlewareChain::new();

    if let Some(path) = &config.gates.request_log {
        let log = RequestLog::open(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            error: e,
        })?;
        chain = chain.add(RequestLogMiddleware::new(Arc::new(log)));
    }

    if let Some(gate) = TimeWindowGate::from_config(&config.gates) {
        chain = chain.add(gate);
    }

    if let Some(limiter) = RateLimitMiddleware::from_config(&config.gates) {
        chain = chain.add(limiter);
    }

    let handler = StubHandler::new(Arc::clone(&metrics));
    let server = Server::new(config.server.clone(), chain, handler, metrics);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_server(server))
}

async fn run_server<H: Handler>(
    server: Server<H>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Handle shutdown gracefully
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                eprintln!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
    }

    Ok(())
}
