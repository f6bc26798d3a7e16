//! Core error types.

use std::fmt;

/// Core errors for request/response handling.
#[derive(Debug)]
pub enum Error {
    /// Invalid HTTP request.
    InvalidRequest(String),

    /// I/O error.
    Io(std::io::Error),

    /// HTTP error.
    Http(http::Error),

    /// Custom error with message.
    Custom(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidRequest(msg) => write!(f, "invalid request: {}", msg),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Http(e) => write!(f, "HTTP error: {}", e),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<http::Error> for Error {
    fn from(e: http::Error) -> Self {
        Error::Http(e)
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Custom(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Custom(msg.to_string())
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
