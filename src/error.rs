// src/error.rs

//! Unified error handling for the schedule scraper.

use thiserror::Error;

/// Result type alias for scraper operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Network-level failure (connect/timeout/DNS/TLS or non-2xx status).
    /// Retried by the transport before being surfaced.
    #[error("network error: {0}")]
    Network(String),

    /// HTTP client failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote page or response no longer matches the assumed shape.
    /// Never retried: shape drift has to reach an operator.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O operation failed (cache reads/writes are non-fatal at call sites)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create a protocol (shape drift) error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
