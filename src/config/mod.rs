//! Configuration Management
//!
//! Environment selection, proxy/rate-limit settings and the API token.

pub mod credentials;
pub mod proxy;

#[cfg(feature = "http_transport")]
pub mod http;

use std::str::FromStr;

use crate::error::BridgeError;

// Re-export
pub use credentials::SecretString;
pub use proxy::{ProxyConfig, RateLimitConfig};

#[cfg(feature = "http_transport")]
pub use http::HttpConfig;

/// Deployment environment of the bridge.
///
/// Selects the default API base URL and whether `SET_ENV_CONFIG` messages may
/// override the base URL and token at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Environment::Production => "https://www.cooltrade.xyz/api",
            Environment::Development => "http://127.0.0.1:8000/api",
        }
    }

    pub fn allows_runtime_override(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl FromStr for Environment {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" => Ok(Environment::Development),
            other => Err(BridgeError::Config(format!(
                "unknown environment '{}', expected production or development",
                other
            ))),
        }
    }
}

/// Reads `key` through `lookup` and parses it, falling back to `default` when unset.
pub(crate) fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T, BridgeError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| BridgeError::Config(format!("invalid {}: {}", key, e))),
        _ => Ok(default),
    }
}
