//! HTTP transport used by the proxy
//!
//! A single attempt, no retries and no timeout; both are layered on top by
//! [`ApiProxy`](super::ApiProxy).

use async_trait::async_trait;
use reqwest::{Client, Method};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::types::{OutgoingRequest, RawResponse};
use crate::error::ProxyError;

const USER_AGENT: &str = concat!("cooltrade-bridge/", env!("CARGO_PKG_VERSION"));

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends one request and reads the whole body as text.
    ///
    /// HTTP error statuses are returned as responses, only failures to get a
    /// response at all are errors.
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, ProxyError>;
}

/// reqwest-backed transport
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ProxyError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProxyError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, ProxyError> {
        let method = Method::from_str(&request.method)
            .map_err(|_| ProxyError::InvalidRequest(format!("bad method '{}'", request.method)))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;

        let status = response.status();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}
