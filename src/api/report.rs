//! Report Client
//!
//! UI-side calls to the technical-analysis endpoints, routed through the
//! request proxy.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use super::auth::{is_auth_request, TokenStore};
use crate::error::{BridgeError, ProxyError, Result};
use crate::exchange::MarketType;
use crate::proxy::{ApiProxy, ProxyRequest, ProxyResponse};
use crate::report::{format_technical_analysis, FormattedAnalysis};

const DEFAULT_NOT_FOUND_MESSAGE: &str = "Token data not found";

/// Result of a report lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportOutcome {
    #[serde(rename = "success")]
    Ready(FormattedAnalysis),
    /// No report exists yet; the UI offers a refresh
    NotFound { message: String, needs_refresh: bool },
}

impl ReportOutcome {
    fn not_found(data: &Value) -> Self {
        let message = data
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_NOT_FOUND_MESSAGE)
            .to_string();
        ReportOutcome::NotFound {
            message,
            needs_refresh: true,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ReportOutcome::Ready(_))
    }
}

/// Clears an in-flight marker when the request finishes, however it ends.
struct PendingGuard<'a> {
    pending: &'a Mutex<HashSet<String>>,
    key: String,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[derive(Debug)]
pub struct ReportClient {
    proxy: Arc<ApiProxy>,
    tokens: Arc<TokenStore>,
    pending: Mutex<HashSet<String>>,
}

impl ReportClient {
    pub fn new(proxy: Arc<ApiProxy>, tokens: Arc<TokenStore>) -> Self {
        Self {
            proxy,
            tokens,
            pending: Mutex::new(HashSet::new()),
        }
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Reads the stored report for `symbol` without regenerating it.
    pub async fn technical_indicators(
        &self,
        symbol: &str,
        market: MarketType,
        no_cache: bool,
    ) -> Result<ReportOutcome> {
        let symbol = market.report_symbol(symbol)?;
        let path = format!("/{}/technical-indicators/{}/", market.api_segment(), symbol);

        let mut request = ProxyRequest::get(path).with_param("language", self.tokens.language());
        if no_cache {
            request = request.with_param("_t", cache_buster());
        }

        tracing::debug!(%symbol, %market, no_cache, "Reading technical indicators");
        let response = self.send(request).await?;
        self.interpret(response)
    }

    /// Fetches the latest report for `symbol`, regenerating it when `force_refresh`.
    ///
    /// Identical concurrent calls are rejected with `RequestInProgress`.
    pub async fn latest_report(
        &self,
        symbol: &str,
        market: MarketType,
        force_refresh: bool,
    ) -> Result<ReportOutcome> {
        let symbol = market.report_symbol(symbol)?;
        let path = format!("/{}/get_report/{}/", market.api_segment(), symbol);
        let language = self.tokens.language();

        let key = format!(
            "{}?language={}&force_refresh={}",
            path, language, force_refresh
        );
        let _guard = self.begin(key)?;

        let mut request = ProxyRequest::get(path)
            .with_param("language", language)
            .with_header("Cache-Control", "no-cache, no-store, must-revalidate")
            .with_header("Pragma", "no-cache")
            .with_header("Expires", "0");
        if force_refresh {
            request = request.with_param("force_refresh", "true");
        }
        request = request.with_param("_t", cache_buster());

        tracing::info!(%symbol, %market, force_refresh, "Requesting latest report");
        let response = self.send(request).await?;
        self.interpret(response)
    }

    fn begin(&self, key: String) -> Result<PendingGuard<'_>> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if !pending.insert(key.clone()) {
            tracing::warn!(request = %key, "Identical report request already in flight");
            return Err(BridgeError::RequestInProgress(key));
        }
        Ok(PendingGuard {
            pending: &self.pending,
            key,
        })
    }

    async fn send(&self, mut request: ProxyRequest) -> Result<ProxyResponse> {
        if !is_auth_request(&request.url) {
            if !self.tokens.validate() {
                self.tokens.clear();
                return Err(BridgeError::AuthRequired(
                    "missing or invalid token, please log in again".to_string(),
                ));
            }
            if let Some(auth) = self.tokens.authorization() {
                request = request.with_header("Authorization", auth);
            }
        }

        let response = self.proxy.proxy_request(request).await;
        if response.status == 401 {
            self.tokens.clear();
            return Err(BridgeError::AuthRequired(
                response
                    .message()
                    .unwrap_or("session expired, please log in again")
                    .to_string(),
            ));
        }
        Ok(response)
    }

    fn interpret(&self, response: ProxyResponse) -> Result<ReportOutcome> {
        if response.status == 404 {
            return Ok(ReportOutcome::not_found(&response.data));
        }

        if !response.success {
            if let Some(error) = response.error.as_deref() {
                return Err(ProxyError::Exhausted(error.to_string()).into());
            }
            let message = response
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| response.status_text.clone());
            return Err(BridgeError::Api {
                status: response.status,
                message,
            });
        }

        let data = &response.data;
        if data.get("status").and_then(Value::as_str) == Some("not_found") {
            return Ok(ReportOutcome::not_found(data));
        }

        Ok(ReportOutcome::Ready(format_technical_analysis(data)))
    }
}

fn cache_buster() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
