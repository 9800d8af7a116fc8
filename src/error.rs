use thiserror::Error;

use crate::background::rate_limiter::RateLimitError;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    RateLimited(#[from] RateLimitError),

    #[error("Proxy error: {0}")]
    Proxy(#[from] ProxyError),

    #[error("Authentication required: {0}")]
    AuthRequired(String),

    #[error("Request is already in progress, please try again later: {0}")]
    RequestInProgress(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unsupported message: {0}")]
    UnsupportedMessage(String),

    #[error("Background link closed: {0}")]
    LinkClosed(String),
}

/// Failures of a single proxied HTTP attempt.
///
/// Every variant is treated as transient by the proxy's retry loop; HTTP error
/// statuses from a reachable server never become a `ProxyError`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    #[error("Fetch failed: {0}")]
    Connection(String),

    #[error("Request timeout ({0} seconds)")]
    Timeout(u64),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// Envelope-level failure reported after the last attempt
    #[error("{0}")]
    Exhausted(String),
}

impl ProxyError {
    pub fn error_type(&self) -> &'static str {
        match self {
            ProxyError::Connection(_) => "connection_error",
            ProxyError::Timeout(_) => "timeout",
            ProxyError::InvalidRequest(_) => "invalid_request",
            ProxyError::Internal(_) => "internal_error",
            ProxyError::Exhausted(_) => "retries_exhausted",
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProxyError::Connection(format!("request timed out: {}", err))
        } else if err.is_connect() {
            ProxyError::Connection(format!(
                "failed to connect to analytics API: {}",
                err
            ))
        } else if err.is_builder() {
            ProxyError::InvalidRequest(err.to_string())
        } else {
            ProxyError::Connection(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
