//! HTTP transport error handling
//!
//! Maps bridge errors onto HTTP status codes with a JSON error body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::BridgeError;

/// HTTP transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl TransportError {
    /// Get HTTP status code for error
    pub fn status_code(&self) -> StatusCode {
        match self {
            TransportError::BadRequest(_) => StatusCode::BAD_REQUEST,
            TransportError::Bridge(err) => match err {
                BridgeError::Json(_)
                | BridgeError::InvalidSymbol(_)
                | BridgeError::UnsupportedMessage(_) => StatusCode::BAD_REQUEST,
                BridgeError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                BridgeError::AuthRequired(_) => StatusCode::UNAUTHORIZED,
                BridgeError::RequestInProgress(_) => StatusCode::CONFLICT,
                BridgeError::Proxy(_) | BridgeError::Api { .. } => StatusCode::BAD_GATEWAY,
                BridgeError::Config(_) | BridgeError::LinkClosed(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            TransportError::BadRequest(_) => "bad_request",
            TransportError::Bridge(err) => match err {
                BridgeError::Json(_) => "invalid_json",
                BridgeError::Config(_) => "config_error",
                BridgeError::RateLimited(_) => "rate_limited",
                BridgeError::Proxy(e) => e.error_type(),
                BridgeError::AuthRequired(_) => "auth_required",
                BridgeError::RequestInProgress(_) => "request_in_progress",
                BridgeError::InvalidSymbol(_) => "invalid_symbol",
                BridgeError::Api { .. } => "api_error",
                BridgeError::UnsupportedMessage(_) => "unsupported_message",
                BridgeError::LinkClosed(_) => "link_closed",
            },
        }
    }
}

impl IntoResponse for TransportError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request handling failed");
        } else {
            tracing::debug!(error = %self, %status, "Request rejected");
        }

        let body = json!({
            "status": "error",
            "error": self.to_string(),
            "error_type": self.error_type(),
        });
        (status, Json(body)).into_response()
    }
}

/// Result type for HTTP transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::RateLimitError;

    #[test]
    fn test_unsupported_message_is_bad_request() {
        let err = TransportError::from(BridgeError::UnsupportedMessage("SYMBOL_UPDATED".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_type(), "unsupported_message");
    }

    #[test]
    fn test_rate_limit_maps_to_429() {
        let err = TransportError::from(BridgeError::from(RateLimitError::TooManyRequests {
            wait_secs: 0.5,
        }));
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.to_string(), "Too many requests, please wait 0.50 seconds");
    }

    #[test]
    fn test_bad_tab_header() {
        let err = TransportError::BadRequest("x-tab-id must be an integer".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_type(), "bad_request");
    }
}
