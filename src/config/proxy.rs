//! Request proxy and rate limiter configuration
//!
//! ## Environment Variables
//!
//! - `COOLTRADE_ENV`: `production` or `development` (default: production)
//! - `COOLTRADE_API_BASE_URL`: API base URL (default depends on environment)
//! - `COOLTRADE_API_TOKEN`: fallback token when callers send no Authorization
//! - `COOLTRADE_REQUEST_TIMEOUT_SECS`: normal request timeout (default: 60)
//! - `COOLTRADE_FORCE_REFRESH_TIMEOUT_SECS`: force-refresh timeout (default: 120)
//! - `COOLTRADE_MAX_RETRIES`: attempts per proxied request (default: 3)
//! - `COOLTRADE_RATE_LIMIT_MAX`: requests per window per tab (default: 10)
//! - `COOLTRADE_RATE_LIMIT_WINDOW_MS`: window size in milliseconds (default: 1000)

use std::time::Duration;

use super::credentials::SecretString;
use super::{parse_var, Environment};
use crate::error::BridgeError;

/// Query marker that switches a request to the extended timeout.
pub const FORCE_REFRESH_MARKER: &str = "force_refresh=true";

/// Proxy configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub environment: Environment,

    /// Base URL relative request paths are joined onto
    pub base_url: String,

    /// Token used when a request carries no Authorization header
    pub token: Option<SecretString>,

    pub request_timeout: Duration,

    /// Timeout for requests whose URL contains [`FORCE_REFRESH_MARKER`]
    pub force_refresh_timeout: Duration,

    /// Total attempts per request, including the first
    pub max_attempts: u32,

    /// Path fragments for which a 404 still counts as a successful response
    pub not_found_ok_paths: Vec<String>,

    /// Path fragments whose 404 body is rewritten into a `not_found` report payload
    pub not_found_report_paths: Vec<String>,
}

impl ProxyConfig {
    /// Defaults for the given environment.
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            base_url: environment.default_base_url().to_string(),
            token: None,
            request_timeout: Duration::from_secs(60),
            force_refresh_timeout: Duration::from_secs(120),
            max_attempts: 3,
            not_found_ok_paths: vec![
                "/favorites/".to_string(),
                "/technical-indicators/".to_string(),
            ],
            not_found_report_paths: vec!["/technical-indicators/".to_string()],
        }
    }

    /// Load proxy configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to an unparseable value
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = parse_var(&lookup, "COOLTRADE_ENV", Environment::Production)?;
        let mut config = Self::for_environment(environment);

        if let Some(base_url) = lookup("COOLTRADE_API_BASE_URL") {
            let base_url = base_url.trim().trim_end_matches('/');
            if !base_url.is_empty() {
                config.base_url = base_url.to_string();
            }
        }

        config.token = lookup("COOLTRADE_API_TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(SecretString::new);

        config.request_timeout = Duration::from_secs(parse_var(
            &lookup,
            "COOLTRADE_REQUEST_TIMEOUT_SECS",
            config.request_timeout.as_secs(),
        )?);
        config.force_refresh_timeout = Duration::from_secs(parse_var(
            &lookup,
            "COOLTRADE_FORCE_REFRESH_TIMEOUT_SECS",
            config.force_refresh_timeout.as_secs(),
        )?);

        let max_attempts: u32 = parse_var(&lookup, "COOLTRADE_MAX_RETRIES", config.max_attempts)?;
        if max_attempts == 0 {
            return Err(BridgeError::Config(
                "COOLTRADE_MAX_RETRIES must be at least 1".to_string(),
            ));
        }
        config.max_attempts = max_attempts;

        Ok(config)
    }

    /// Timeout for a fully built request URL.
    pub fn timeout_for(&self, url: &str) -> Duration {
        if url.contains(FORCE_REFRESH_MARKER) {
            self.force_refresh_timeout
        } else {
            self.request_timeout
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

/// Per-tab rate limit settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let max_requests = parse_var(&lookup, "COOLTRADE_RATE_LIMIT_MAX", defaults.max_requests)?;
        let window_ms = parse_var(
            &lookup,
            "COOLTRADE_RATE_LIMIT_WINDOW_MS",
            defaults.window.as_millis() as u64,
        )?;

        if max_requests == 0 || window_ms == 0 {
            return Err(BridgeError::Config(
                "rate limit max and window must be non-zero".to_string(),
            ));
        }

        Ok(Self {
            max_requests,
            window: Duration::from_millis(window_ms),
        })
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_millis(1000),
        }
    }
}
