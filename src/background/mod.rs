//! Background service
//!
//! Owns the current symbol, the per-tab rate limiter and the request proxy,
//! and answers every [`Message`] sent by watchers and UI surfaces. Pushes
//! (`SYMBOL_UPDATED`, `PAGE_UPDATED`, `RATE_LIMIT_ERROR`) go out on a
//! broadcast channel; sending with no subscriber is not an error.

pub mod rate_limiter;
pub mod state;

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::{ProxyConfig, RateLimitConfig};
use crate::error::{BridgeError, Result};
use crate::exchange::normalize_reported_symbol;
use crate::messages::{Message, MessageResponse, Outbound, TabId};
use crate::proxy::ApiProxy;

pub use rate_limiter::{RateLimitError, RateLimiter};
pub use state::{SymbolSnapshot, SymbolState};

/// Outbound pushes buffered per subscriber before lagging ones drop messages
const OUTBOUND_CAPACITY: usize = 256;

pub struct BackgroundService {
    symbol: SymbolState,
    limiter: RateLimiter<TabId>,
    proxy: Arc<ApiProxy>,
    outbound: broadcast::Sender<Outbound>,
}

impl BackgroundService {
    pub fn new(proxy: Arc<ApiProxy>, rate_limit: RateLimitConfig) -> Self {
        let (outbound, _) = broadcast::channel(OUTBOUND_CAPACITY);
        Self {
            symbol: SymbolState::new(),
            limiter: RateLimiter::new(rate_limit),
            proxy,
            outbound,
        }
    }

    /// Service backed by a reqwest proxy built from `config`.
    pub fn from_config(config: ProxyConfig, rate_limit: RateLimitConfig) -> Result<Self> {
        let proxy = ApiProxy::from_config(config)?;
        Ok(Self::new(Arc::new(proxy), rate_limit))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.outbound.subscribe()
    }

    pub fn proxy(&self) -> &Arc<ApiProxy> {
        &self.proxy
    }

    pub fn current_symbol(&self) -> String {
        self.symbol.get()
    }

    pub fn snapshot(&self) -> SymbolSnapshot {
        self.symbol.snapshot()
    }

    /// Handles one message from a watcher or UI surface.
    ///
    /// `tab` is the sending tab, if the message came from one.
    pub async fn handle(&self, message: Message, tab: Option<TabId>) -> Result<MessageResponse> {
        debug!(kind = message.kind(), ?tab, "Handling message");

        match message {
            Message::TradingPageLoaded { symbol } => {
                self.handle_trading_page(&symbol, tab);
                Ok(MessageResponse::success())
            }
            Message::GetCurrentSymbol => Ok(MessageResponse::symbol(Some(self.symbol.get()))),
            Message::ManualSetSymbol { symbol } => {
                let symbol = symbol.trim().to_string();
                if symbol.is_empty() {
                    debug!("Ignoring empty manual symbol");
                    return Ok(MessageResponse::symbol_ack(self.symbol.get()));
                }
                self.update_symbol(symbol.clone());
                info!(%symbol, "Symbol set manually");
                Ok(MessageResponse::symbol_ack(symbol))
            }
            Message::ProxyApiRequest(request) => {
                let response = self.proxy.proxy_request(request).await;
                Ok(MessageResponse::Proxy(response))
            }
            Message::SetEnvConfig(update) => {
                self.proxy
                    .apply_env_config(update.base_api_url, update.token);
                Ok(MessageResponse::success())
            }
            other @ (Message::PageUpdated { .. }
            | Message::SymbolUpdated { .. }
            | Message::RateLimitError { .. }
            | Message::GetSymbolFromContent) => {
                Err(BridgeError::UnsupportedMessage(other.kind().to_string()))
            }
        }
    }

    /// Navigation in `tab` finished loading `url`; asks its watcher to re-scan.
    pub fn on_tab_updated(&self, tab: TabId, url: &str) {
        debug!(tab, url, "Tab navigation completed");
        self.push(Outbound::tab(
            tab,
            Message::PageUpdated {
                url: Some(url.to_string()),
                symbol: None,
            },
        ));
    }

    /// Tab closed; its rate-limit window is no longer needed.
    pub fn on_tab_removed(&self, tab: TabId) {
        self.limiter.forget(&tab);
    }

    fn handle_trading_page(&self, reported: &str, tab: Option<TabId>) {
        let reported = reported.trim();
        if reported.is_empty() {
            debug!(?tab, "Ignoring trading page without symbol");
            return;
        }
        let symbol = normalize_reported_symbol(reported);
        self.update_symbol(symbol.clone());
        info!(%symbol, ?tab, "Trading page symbol updated");

        let Some(tab) = tab else {
            return;
        };
        if let Err(err) = self.limiter.check(&tab) {
            warn!(tab, error = %err, "Trading page notifications rate limited");
            self.push(Outbound::tab(
                tab,
                Message::RateLimitError {
                    message: err.to_string(),
                },
            ));
        }
    }

    fn update_symbol(&self, symbol: String) {
        self.symbol.set(symbol.clone());
        self.push(Outbound::runtime(Message::SymbolUpdated { symbol }));
    }

    fn push(&self, outbound: Outbound) {
        if self.outbound.send(outbound).is_err() {
            debug!("No listeners for outbound message");
        }
    }
}

impl std::fmt::Debug for BackgroundService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundService")
            .field("symbol", &self.symbol.get())
            .field("proxy", &self.proxy)
            .field("subscribers", &self.outbound.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Target;

    fn service() -> BackgroundService {
        let proxy = ApiProxy::from_config(ProxyConfig::default()).unwrap();
        BackgroundService::new(Arc::new(proxy), RateLimitConfig::default())
    }

    #[tokio::test]
    async fn test_manual_set_then_get() {
        let svc = service();
        let resp = svc
            .handle(
                Message::ManualSetSymbol {
                    symbol: "ETHUSDT".into(),
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(resp, MessageResponse::symbol_ack("ETHUSDT"));

        let resp = svc.handle(Message::GetCurrentSymbol, None).await.unwrap();
        assert_eq!(resp, MessageResponse::symbol(Some("ETHUSDT".into())));
    }

    #[tokio::test]
    async fn test_trading_page_normalizes_and_broadcasts() {
        let svc = service();
        let mut rx = svc.subscribe();

        svc.handle(
            Message::TradingPageLoaded {
                symbol: "SOL".into(),
            },
            Some(3),
        )
        .await
        .unwrap();

        assert_eq!(svc.current_symbol(), "SOLUSDT");
        let pushed = rx.try_recv().unwrap();
        assert_eq!(pushed.target, Target::Runtime);
        assert_eq!(
            pushed.message,
            Message::SymbolUpdated {
                symbol: "SOLUSDT".into()
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_equities_are_kept_verbatim() {
        let svc = service();
        svc.handle(
            Message::TradingPageLoaded {
                symbol: "AAPL".into(),
            },
            None,
        )
        .await
        .unwrap();
        assert_eq!(svc.current_symbol(), "AAPL");
    }

    #[tokio::test]
    async fn test_outbound_only_messages_rejected() {
        let svc = service();
        let err = svc
            .handle(Message::GetSymbolFromContent, Some(1))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedMessage(kind) if kind == "GET_SYMBOL_FROM_CONTENT"));
    }

    #[tokio::test]
    async fn test_empty_manual_symbol_keeps_current() {
        let svc = service();
        let mut rx = svc.subscribe();
        let resp = svc
            .handle(Message::ManualSetSymbol { symbol: "  ".into() }, None)
            .await
            .unwrap();
        assert_eq!(resp, MessageResponse::symbol_ack("BTCUSDT"));
        assert_eq!(svc.current_symbol(), "BTCUSDT");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_blank_trading_page_symbol_ignored() {
        let svc = service();
        let mut rx = svc.subscribe();

        for reported in ["", "   "] {
            let resp = svc
                .handle(
                    Message::TradingPageLoaded {
                        symbol: reported.into(),
                    },
                    Some(2),
                )
                .await
                .unwrap();
            assert!(resp.is_success());
        }

        assert_eq!(svc.current_symbol(), "BTCUSDT");
        assert!(rx.try_recv().is_err());
        assert_eq!(svc.limiter.in_window(&2), 0);
    }

    #[test]
    fn test_tab_update_pushes_page_updated() {
        let svc = service();
        let mut rx = svc.subscribe();
        svc.on_tab_updated(9, "https://www.okx.com/trade-spot/eth-usdt");

        let pushed = rx.try_recv().unwrap();
        assert_eq!(pushed.target, Target::Tab(9));
        assert!(matches!(pushed.message, Message::PageUpdated { url: Some(_), .. }));
    }
}
