//! API Proxy
//!
//! Performs HTTP requests on behalf of UI surfaces: resolves relative URLs
//! against the API base, normalizes authentication, races each attempt
//! against a timeout and retries transport failures with capped exponential
//! backoff. Every call resolves to a [`ProxyResponse`].

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use uuid::Uuid;

use super::transport::{HttpTransport, ReqwestTransport};
use super::types::{OutgoingRequest, ProxyRequest, ProxyResponse, RawResponse};
use crate::config::credentials::with_auth_scheme;
use crate::config::{ProxyConfig, SecretString};
use crate::error::ProxyError;

/// First retry delay
const BACKOFF_BASE_MS: u64 = 1000;

/// Upper bound for a single retry delay
const BACKOFF_CAP_MS: u64 = 5000;

const BODY_METHODS: [&str; 4] = ["POST", "PUT", "PATCH", "DELETE"];
const QUERY_METHODS: [&str; 2] = ["GET", "HEAD"];

/// Delay before the retry that follows failed attempt number `attempt` (1-based).
pub fn backoff_delay(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    Duration::from_millis((BACKOFF_BASE_MS << exp).min(BACKOFF_CAP_MS))
}

/// Joins `url` onto `base_url` unless it is already absolute, then appends
/// non-null `params` as a query string.
pub fn build_url(base_url: &str, url: &str, params: Option<&Map<String, Value>>) -> String {
    let base = base_url.trim_end_matches('/');
    let mut full = if url.starts_with('/') {
        format!("{}{}", base, url)
    } else if url.starts_with("http") {
        url.to_string()
    } else {
        format!("{}/{}", base, url)
    };

    let Some(params) = params else {
        return full;
    };

    let mut query = url::form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in params {
        let rendered = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        query.append_pair(key, &rendered);
        any = true;
    }

    if any {
        full.push(if full.contains('?') { '&' } else { '?' });
        full.push_str(&query.finish());
    }
    full
}

#[derive(Debug, Clone)]
struct RuntimeSettings {
    base_url: String,
    token: Option<SecretString>,
}

/// Request proxy with retry, backoff and timeout
pub struct ApiProxy {
    transport: Arc<dyn HttpTransport>,
    config: ProxyConfig,
    settings: RwLock<RuntimeSettings>,
}

impl std::fmt::Debug for ApiProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let settings = self.settings();
        f.debug_struct("ApiProxy")
            .field("environment", &self.config.environment)
            .field("base_url", &settings.base_url)
            .field("token", &settings.token.as_ref().map(|t| t.masked()))
            .field("max_attempts", &self.config.max_attempts)
            .finish()
    }
}

impl ApiProxy {
    pub fn new(config: ProxyConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let settings = RuntimeSettings {
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        };
        Self {
            transport,
            config,
            settings: RwLock::new(settings),
        }
    }

    /// Proxy backed by a fresh reqwest client.
    pub fn from_config(config: ProxyConfig) -> Result<Self, ProxyError> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn base_url(&self) -> String {
        self.settings().base_url
    }

    fn settings(&self) -> RuntimeSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Overrides the base URL and fallback token at runtime.
    ///
    /// Only honoured in the development environment; returns whether anything
    /// was applied.
    pub fn apply_env_config(&self, base_url: Option<String>, token: Option<String>) -> bool {
        if !self.config.environment.allows_runtime_override() {
            tracing::warn!(
                environment = ?self.config.environment,
                "Ignoring runtime API configuration outside development"
            );
            return false;
        }

        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(base_url) = base_url.filter(|u| !u.trim().is_empty()) {
            settings.base_url = base_url.trim().trim_end_matches('/').to_string();
        }
        if let Some(token) = token {
            settings.token = Some(token).filter(|t| !t.is_empty()).map(SecretString::new);
        }
        tracing::info!(
            base_url = %settings.base_url,
            has_token = settings.token.is_some(),
            "Runtime API configuration updated"
        );
        true
    }

    /// Performs `request`, retrying transport failures.
    ///
    /// Never fails: exhausted retries produce a `success: false` envelope with
    /// status 500 and the last error message.
    pub async fn proxy_request(&self, request: ProxyRequest) -> ProxyResponse {
        let request_id = Uuid::new_v4();
        let outgoing = self.prepare(&request);
        let timeout = self.config.timeout_for(&outgoing.url);
        let max_attempts = self.config.max_attempts.max(1);

        tracing::debug!(
            %request_id,
            method = %outgoing.method,
            url = %outgoing.url,
            authenticated = outgoing.header("Authorization").is_some(),
            timeout_secs = timeout.as_secs(),
            "Proxying API request"
        );

        let mut last_error = ProxyError::Internal("no attempt made".to_string());
        for attempt in 1..=max_attempts {
            let result = tokio::time::timeout(timeout, self.transport.send(outgoing.clone())).await;

            match result {
                Ok(Ok(raw)) => {
                    let response = self.envelope(raw, &outgoing.url);
                    tracing::debug!(
                        %request_id,
                        attempt,
                        status = response.status,
                        success = response.success,
                        "API request completed"
                    );
                    return response;
                }
                Ok(Err(err)) => last_error = err,
                Err(_) => last_error = ProxyError::Timeout(timeout.as_secs()),
            }

            if attempt < max_attempts {
                let delay = backoff_delay(attempt);
                tracing::warn!(
                    %request_id,
                    attempt,
                    max_attempts,
                    error = %last_error,
                    error_type = last_error.error_type(),
                    delay_ms = delay.as_millis() as u64,
                    "API request failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }

        tracing::error!(
            %request_id,
            url = %outgoing.url,
            attempts = max_attempts,
            error = %last_error,
            "API request failed after all retries"
        );
        ProxyResponse::failure(last_error.to_string())
    }

    fn prepare(&self, request: &ProxyRequest) -> OutgoingRequest {
        let settings = self.settings();
        let method = request.method();

        let params = if QUERY_METHODS.contains(&method.as_str()) {
            request.params.as_ref()
        } else {
            None
        };
        let url = build_url(&settings.base_url, &request.url, params);

        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        for (name, value) in &request.headers {
            headers.retain(|existing: &String, _| !existing.eq_ignore_ascii_case(name));
            headers.insert(name.clone(), value.clone());
        }

        let caller_auth = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("Authorization"))
            .map(|(k, v)| (k.clone(), v.clone()));
        match caller_auth {
            Some((name, value)) if !value.trim().is_empty() => {
                headers.insert(name, with_auth_scheme(value.trim()));
            }
            Some((name, _)) => {
                headers.remove(&name);
                if let Some(token) = &settings.token {
                    headers.insert("Authorization".to_string(), token.authorization());
                }
            }
            None => {
                if let Some(token) = &settings.token {
                    headers.insert("Authorization".to_string(), token.authorization());
                }
            }
        }

        let body = if BODY_METHODS.contains(&method.as_str()) {
            request
                .body
                .as_ref()
                .filter(|b| !b.is_null())
                .map(Value::to_string)
        } else {
            None
        };

        OutgoingRequest {
            method,
            url,
            headers,
            body,
        }
    }

    fn envelope(&self, raw: RawResponse, url: &str) -> ProxyResponse {
        let mut data = serde_json::from_str::<Value>(&raw.body)
            .unwrap_or_else(|_| Value::String(raw.body.clone()));

        let not_found = raw.status == 404;
        let allow_listed = not_found
            && self
                .config
                .not_found_ok_paths
                .iter()
                .any(|p| url.contains(p.as_str()));

        if not_found
            && self
                .config
                .not_found_report_paths
                .iter()
                .any(|p| url.contains(p.as_str()))
        {
            data = json!({
                "status": "not_found",
                "message": "Technical analysis report not found",
            });
        }

        ProxyResponse {
            status: raw.status,
            status_text: raw.status_text.clone(),
            success: raw.is_ok() || allow_listed,
            headers: raw.headers,
            data,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<OutgoingRequest>>,
    }

    #[async_trait]
    impl HttpTransport for Recorder {
        async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, ProxyError> {
            self.seen.lock().unwrap().push(request);
            Ok(RawResponse {
                status: 200,
                status_text: "OK".to_string(),
                headers: BTreeMap::new(),
                body: "{\"ok\":true}".to_string(),
            })
        }
    }

    fn proxy_with(config: ProxyConfig) -> (ApiProxy, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (ApiProxy::new(config, recorder.clone()), recorder)
    }

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(2), Duration::from_millis(2000));
        assert_eq!(backoff_delay(3), Duration::from_millis(4000));
        assert_eq!(backoff_delay(4), Duration::from_millis(5000));
        assert_eq!(backoff_delay(40), Duration::from_millis(5000));
    }

    #[test]
    fn test_build_url_variants() {
        let base = "https://api.example.com/api/";
        assert_eq!(
            build_url(base, "/crypto/favorites/", None),
            "https://api.example.com/api/crypto/favorites/"
        );
        assert_eq!(
            build_url(base, "auth/login/", None),
            "https://api.example.com/api/auth/login/"
        );
        assert_eq!(
            build_url(base, "https://other.example/x", None),
            "https://other.example/x"
        );
    }

    #[test]
    fn test_build_url_params() {
        let mut params = Map::new();
        params.insert("language".into(), json!("zh-CN"));
        params.insert("force_refresh".into(), json!(true));
        params.insert("skip".into(), Value::Null);

        assert_eq!(
            build_url("http://h/api", "/r/", Some(&params)),
            "http://h/api/r/?force_refresh=true&language=zh-CN"
        );
        assert_eq!(
            build_url("http://h/api", "/r/?a=1", Some(&params)),
            "http://h/api/r/?a=1&force_refresh=true&language=zh-CN"
        );

        let only_null: Map<String, Value> = [("x".to_string(), Value::Null)].into_iter().collect();
        assert_eq!(build_url("http://h", "/r", Some(&only_null)), "http://h/r");
    }

    #[tokio::test]
    async fn test_prepare_normalizes_caller_authorization() {
        let (proxy, recorder) = proxy_with(ProxyConfig::default());
        let request = ProxyRequest::get("/auth/me/").with_header("authorization", "abc123");
        let response = proxy.proxy_request(request).await;
        assert!(response.success);

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].header("Authorization"), Some("Token abc123"));
        assert_eq!(seen[0].header("Accept"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_prepare_uses_configured_token() {
        let mut config = ProxyConfig::default();
        config.token = Some(SecretString::from("Bearer xyz"));
        let (proxy, recorder) = proxy_with(config);

        proxy.proxy_request(ProxyRequest::get("/x/")).await;
        assert_eq!(
            recorder.seen.lock().unwrap()[0].header("Authorization"),
            Some("Bearer xyz")
        );
    }

    #[tokio::test]
    async fn test_body_only_for_mutating_methods() {
        let (proxy, recorder) = proxy_with(ProxyConfig::default());

        let mut get = ProxyRequest::get("/x/").with_param("page", 2);
        get.body = Some(json!({"ignored": true}));
        proxy.proxy_request(get).await;

        let post = ProxyRequest::post("/x/", json!({"symbol": "BTCUSDT"})).with_param("page", 2);
        proxy.proxy_request(post).await;

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].body, None);
        assert!(seen[0].url.ends_with("/x/?page=2"));
        assert_eq!(seen[1].body.as_deref(), Some("{\"symbol\":\"BTCUSDT\"}"));
        assert!(seen[1].url.ends_with("/x/"));
    }

    #[test]
    fn test_env_config_only_in_development() {
        let (prod, _) = proxy_with(ProxyConfig::for_environment(Environment::Production));
        assert!(!prod.apply_env_config(Some("http://evil/api".into()), None));
        assert_eq!(prod.base_url(), "https://www.cooltrade.xyz/api");

        let (dev, _) = proxy_with(ProxyConfig::for_environment(Environment::Development));
        assert!(dev.apply_env_config(Some("http://localhost:9000/api/".into()), Some("t".into())));
        assert_eq!(dev.base_url(), "http://localhost:9000/api");
    }

    #[test]
    fn test_envelope_falls_back_to_text() {
        let (proxy, _) = proxy_with(ProxyConfig::default());
        let raw = RawResponse {
            status: 502,
            status_text: "Bad Gateway".to_string(),
            headers: BTreeMap::new(),
            body: "<html>upstream</html>".to_string(),
        };
        let envelope = proxy.envelope(raw, "https://h/api/x/");
        assert!(!envelope.success);
        assert_eq!(envelope.data, json!("<html>upstream</html>"));
    }
}
