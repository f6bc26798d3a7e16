//! Server configuration.

use std::net::SocketAddr;

use super::parse::env_or;
use super::ConfigError;

/// Server configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listen address (default: 0.0.0.0:8080).
    pub listen_addr: SocketAddr,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_addr: SocketAddr = env_or("LISTEN_ADDR", "0.0.0.0:8080")
            .parse()
            .map_err(|e| ConfigError::Parse {
                key: "LISTEN_ADDR".into(),
                value: env_or("LISTEN_ADDR", "0.0.0.0:8080"),
                error: format!("{}", e),
            })?;

        Ok(Self { listen_addr })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: ([0, 0, 0, 0], 8080).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_listen_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr.port(), 8080);
    }
}
