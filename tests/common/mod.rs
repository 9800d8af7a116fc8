// Shared test doubles for the integration suites
#![allow(dead_code)]

use async_trait::async_trait;
use cooltrade_bridge::config::{Environment, ProxyConfig, RateLimitConfig};
use cooltrade_bridge::error::ProxyError;
use cooltrade_bridge::proxy::{ApiProxy, HttpTransport, OutgoingRequest, RawResponse};
use cooltrade_bridge::BackgroundService;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const TEST_BASE_URL: &str = "http://api.test/api";

/// What the scripted transport does for one attempt
#[derive(Debug, Clone)]
pub enum Step {
    Respond(RawResponse),
    Fail(ProxyError),
    /// Never completes; only the proxy timeout ends the attempt
    Hang,
}

/// Transport replaying a fixed script, then repeating `fallback`
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    requests: Mutex<Vec<OutgoingRequest>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>, fallback: Step) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            fallback,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn always(step: Step) -> Arc<Self> {
        Self::new(Vec::new(), step)
    }

    pub fn requests(&self) -> Vec<OutgoingRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, ProxyError> {
        self.requests.lock().unwrap().push(request);
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            Step::Respond(raw) => Ok(raw),
            Step::Fail(err) => Err(err),
            Step::Hang => std::future::pending().await,
        }
    }
}

pub fn json_response(status: u16, body: Value) -> Step {
    Step::Respond(RawResponse {
        status,
        status_text: String::new(),
        headers: BTreeMap::new(),
        body: body.to_string(),
    })
}

pub fn connection_refused() -> Step {
    Step::Fail(ProxyError::Connection("connection refused".to_string()))
}

pub fn test_config() -> ProxyConfig {
    let mut config = ProxyConfig::for_environment(Environment::Production);
    config.base_url = TEST_BASE_URL.to_string();
    config
}

pub fn proxy_with(transport: Arc<ScriptedTransport>, config: ProxyConfig) -> Arc<ApiProxy> {
    Arc::new(ApiProxy::new(config, transport))
}

pub fn service_with(transport: Arc<ScriptedTransport>) -> Arc<BackgroundService> {
    Arc::new(BackgroundService::new(
        proxy_with(transport, test_config()),
        RateLimitConfig::default(),
    ))
}
