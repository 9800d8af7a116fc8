//! HTTP Bridge Configuration

use std::net::SocketAddr;

use super::parse_var;
use crate::error::BridgeError;

/// HTTP bridge server configuration
///
/// ## Environment Variables
///
/// - `BRIDGE_HTTP_HOST`: Server bind address (default: 127.0.0.1)
/// - `BRIDGE_HTTP_PORT`: Server port (default: 8787)
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Server bind address
    pub addr: SocketAddr,
}

impl HttpConfig {
    pub const DEFAULT_PORT: u16 = 8787;

    /// Load HTTP configuration from environment variables
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("BRIDGE_HTTP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port: u16 = parse_var(&lookup, "BRIDGE_HTTP_PORT", Self::DEFAULT_PORT)?;

        Self::with_host_port(&host, port)
    }

    pub fn with_host_port(host: &str, port: u16) -> Result<Self, BridgeError> {
        let addr = format!("{}:{}", host, port)
            .parse()
            .map_err(|e| BridgeError::Config(format!("invalid bind address: {}", e)))?;
        Ok(Self { addr })
    }
}
