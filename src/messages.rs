//! Message protocol between UI surfaces, watchers and the background service
//!
//! Messages travel as `{ "type": "TRADING_PAGE_LOADED", "data": { ... } }`.

use serde::{Deserialize, Serialize};

use crate::proxy::{ProxyRequest, ProxyResponse};

/// Browser tab identifier
pub type TabId = u32;

/// Runtime overrides accepted in the development environment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvConfigUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Watcher found a symbol on the current page
    TradingPageLoaded { symbol: String },

    GetCurrentSymbol,

    /// User override from the popup
    ManualSetSymbol { symbol: String },

    /// Background asks a tab's watcher to re-scan after navigation
    PageUpdated {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        symbol: Option<String>,
    },

    ProxyApiRequest(ProxyRequest),

    SetEnvConfig(EnvConfigUpdate),

    /// Broadcast whenever the current symbol changes
    SymbolUpdated { symbol: String },

    RateLimitError { message: String },

    GetSymbolFromContent,
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::TradingPageLoaded { .. } => "TRADING_PAGE_LOADED",
            Message::GetCurrentSymbol => "GET_CURRENT_SYMBOL",
            Message::ManualSetSymbol { .. } => "MANUAL_SET_SYMBOL",
            Message::PageUpdated { .. } => "PAGE_UPDATED",
            Message::ProxyApiRequest(_) => "PROXY_API_REQUEST",
            Message::SetEnvConfig(_) => "SET_ENV_CONFIG",
            Message::SymbolUpdated { .. } => "SYMBOL_UPDATED",
            Message::RateLimitError { .. } => "RATE_LIMIT_ERROR",
            Message::GetSymbolFromContent => "GET_SYMBOL_FROM_CONTENT",
        }
    }
}

/// Reply to a handled [`Message`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageResponse {
    Proxy(ProxyResponse),
    SymbolAck { status: String, symbol: String },
    Ack { status: String },
    Symbol { symbol: Option<String> },
}

impl MessageResponse {
    pub fn success() -> Self {
        MessageResponse::Ack {
            status: "success".to_string(),
        }
    }

    pub fn symbol_ack(symbol: impl Into<String>) -> Self {
        MessageResponse::SymbolAck {
            status: "success".to_string(),
            symbol: symbol.into(),
        }
    }

    pub fn symbol(symbol: Option<String>) -> Self {
        MessageResponse::Symbol { symbol }
    }

    pub fn is_success(&self) -> bool {
        match self {
            MessageResponse::Proxy(resp) => resp.success,
            MessageResponse::SymbolAck { status, .. } | MessageResponse::Ack { status } => {
                status == "success"
            }
            MessageResponse::Symbol { .. } => true,
        }
    }
}

/// Destination of an outbound push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "target", content = "tab_id", rename_all = "snake_case")]
pub enum Target {
    /// Every runtime listener (popup, side panel)
    Runtime,
    Tab(TabId),
}

/// Message pushed by the background service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outbound {
    #[serde(flatten)]
    pub target: Target,
    pub message: Message,
}

impl Outbound {
    pub fn runtime(message: Message) -> Self {
        Self {
            target: Target::Runtime,
            message,
        }
    }

    pub fn tab(tab_id: TabId, message: Message) -> Self {
        Self {
            target: Target::Tab(tab_id),
            message,
        }
    }
}
