//! Gate configuration: time window, rate limiting, request log.

use std::path::PathBuf;

use super::parse::{env_bool, env_or, env_parse, parse_prefix_list};
use super::ConfigError;

/// Default path prefixes protected by the time window gate.
const DEFAULT_TIME_WINDOW_PATHS: &str = "/api/conversations/,/api/messages/";

/// Default path prefixes guarded by the rate limiter.
const DEFAULT_RATE_LIMIT_PATHS: &str = "/api/messages/";

/// Gate configuration loaded from environment.
///
/// All values are fixed at startup; none are runtime-mutable.
#[derive(Clone, Debug)]
pub struct GatesConfig {
    /// Time window gate enabled.
    pub time_window: bool,
    /// First allowed hour (inclusive), 24h local time.
    pub allowed_start_hour: u32,
    /// First denied hour (exclusive end of the allowed range).
    pub allowed_end_hour: u32,
    /// Path prefixes protected by the time window gate.
    pub time_window_paths: Vec<String>,
    /// Rate limit: max message sends per client per window (0 = disabled).
    pub rate_limit: Option<usize>,
    /// Rate limit window in seconds.
    pub rate_window: u64,
    /// Path prefixes whose POSTs are rate limited.
    pub rate_limit_paths: Vec<String>,
    /// Request log file ("off" = disabled).
    pub request_log: Option<PathBuf>,
}

impl GatesConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let rate_limit_value: usize = env_parse("RATE_LIMIT", 5)?;
        let rate_window: u64 = env_parse("RATE_WINDOW", 60)?;
        let allowed_start_hour: u32 = env_parse("ALLOWED_START_HOUR", 18)?;
        let allowed_end_hour: u32 = env_parse("ALLOWED_END_HOUR", 21)?;

        let request_log = match env_or("REQUEST_LOG", "requests.log") {
            s if s == "off" || s.is_empty() => None,
            s => Some(PathBuf::from(s)),
        };

        let config = Self {
            time_window: env_bool("TIME_WINDOW", true),
            allowed_start_hour,
            allowed_end_hour,
            time_window_paths: parse_prefix_list(&env_or(
                "TIME_WINDOW_PATHS",
                DEFAULT_TIME_WINDOW_PATHS,
            )),
            rate_limit: if rate_limit_value > 0 {
                Some(rate_limit_value)
            } else {
                None
            },
            rate_window,
            rate_limit_paths: parse_prefix_list(&env_or(
                "RATE_LIMIT_PATHS",
                DEFAULT_RATE_LIMIT_PATHS,
            )),
            request_log,
        };

        config.validate()?;
        Ok(config)
    }

    /// A configuration with every gate switched off. Starting point for
    /// tests and embedders that enable gates selectively.
    pub fn disabled() -> Self {
        Self {
            time_window: false,
            allowed_start_hour: 18,
            allowed_end_hour: 21,
            time_window_paths: Vec::new(),
            rate_limit: None,
            rate_window: 60,
            rate_limit_paths: Vec::new(),
            request_log: None,
        }
    }

    /// Check hour range and window sanity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed_start_hour > 23 {
            return Err(ConfigError::Invalid {
                key: "ALLOWED_START_HOUR".into(),
                message: format!("{} is not an hour of day", self.allowed_start_hour),
            });
        }
        if self.allowed_end_hour > 24 {
            return Err(ConfigError::Invalid {
                key: "ALLOWED_END_HOUR".into(),
                message: format!("{} is not an hour of day", self.allowed_end_hour),
            });
        }
        if self.allowed_start_hour >= self.allowed_end_hour {
            return Err(ConfigError::Invalid {
                key: "ALLOWED_START_HOUR".into(),
                message: format!(
                    "allowed range [{}, {}) is empty",
                    self.allowed_start_hour, self.allowed_end_hour
                ),
            });
        }
        if self.rate_limit.is_some() && self.rate_window == 0 {
            return Err(ConfigError::Invalid {
                key: "RATE_WINDOW".into(),
                message: "rate window must be at least one second".into(),
            });
        }
        Ok(())
    }

    /// Check if rate limiting is enabled.
    pub fn is_rate_limiting_enabled(&self) -> bool {
        self.rate_limit.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_has_no_gates() {
        let config = GatesConfig::disabled();
        assert!(!config.time_window);
        assert!(!config.is_rate_limiting_enabled());
        assert!(config.request_log.is_none());
    }

    #[test]
    fn test_rate_limiting_enabled_when_set() {
        let config = GatesConfig {
            rate_limit: Some(100),
            ..GatesConfig::disabled()
        };
        assert!(config.is_rate_limiting_enabled());
        assert_eq!(config.rate_limit, Some(100));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let config = GatesConfig {
            time_window: true,
            allowed_start_hour: 18,
            allowed_end_hour: 21,
            rate_limit: Some(5),
            rate_window: 60,
            ..GatesConfig::disabled()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_hours() {
        let config = GatesConfig {
            allowed_start_hour: 25,
            ..GatesConfig::disabled()
        };
        assert!(config.validate().is_err());

        let config = GatesConfig {
            allowed_start_hour: 21,
            allowed_end_hour: 18,
            ..GatesConfig::disabled()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_midnight_end() {
        let config = GatesConfig {
            allowed_start_hour: 18,
            allowed_end_hour: 24,
            ..GatesConfig::disabled()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let config = GatesConfig {
            rate_limit: Some(5),
            rate_window: 0,
            ..GatesConfig::disabled()
        };
        assert!(config.validate().is_err());
    }
}
