//! Configuration module for chatgate.
//!
//! This module provides centralized configuration loading from environment
//! variables. Everything here is static startup configuration; nothing is
//! runtime-mutable.
//!
//! # Example
//!
//! ```rust,ignore
//! use chatgate::config::Config;
//!
//! let config = Config::from_env()?;
//! println!("Listen address: {}", config.server.listen_addr);
//! ```

mod error;
mod gates;
mod logging;
mod parse;
mod server;

pub use error::ConfigError;
pub use gates::GatesConfig;
pub use logging::LoggingConfig;
pub use server::ServerConfig;

/// Complete application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Gate configuration.
    pub gates: GatesConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::from_env()?,
            gates: GatesConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Print configuration summary to log.
    pub fn log_summary(&self) {
        use tracing::info;

        info!("Configuration loaded:");
        info!("  Listen: {}", self.server.listen_addr);

        if self.gates.time_window {
            info!(
                "  Time window: {:02}:00-{:02}:00 on {}",
                self.gates.allowed_start_hour,
                self.gates.allowed_end_hour,
                self.gates.time_window_paths.join(", ")
            );
        } else {
            info!("  Time window: disabled");
        }

        if let Some(limit) = self.gates.rate_limit {
            info!(
                "  Rate limit: {} msg/{}s per client on {}",
                limit,
                self.gates.rate_window,
                self.gates.rate_limit_paths.join(", ")
            );
        } else {
            info!("  Rate limit: disabled");
        }

        match &self.gates.request_log {
            Some(path) => info!("  Request log: {:?}", path),
            None => info!("  Request log: disabled"),
        }
    }
}
