//! Environment variable parsing utilities.

use std::str::FromStr;

use super::ConfigError;

/// Get environment variable with default value.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse environment variable as boolean.
/// Treats "1", "true" (case-insensitive) as true.
pub fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(default)
}

/// Parse environment variable with type conversion.
pub fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => v.parse().map_err(|e: T::Err| ConfigError::Parse {
            key: key.into(),
            value: v,
            error: e.to_string(),
        }),
        _ => Ok(default),
    }
}

/// Parse a comma-separated list of path prefixes, dropping empty entries.
pub fn parse_prefix_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
