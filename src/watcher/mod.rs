//! Symbol Watcher
//!
//! Page-side observer: watches the location of one tab, and whenever it lands
//! on a trading page, parses the symbol and reports it to the background
//! service. Change detection combines navigation events with a one-second
//! poll for client-side routers that fire neither.

pub mod link;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result};
use crate::exchange::{is_trading_page, parse_symbol};
use crate::messages::{Message, MessageResponse};

pub use link::{LocalLink, SharedLocation};

/// Default URL poll period
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Source of the page's current URL
pub trait PageLocation: Send + Sync {
    fn current_url(&self) -> String;
}

/// Channel to the background service
#[async_trait]
pub trait BackgroundLink: Send + Sync {
    /// Sends `TRADING_PAGE_LOADED` and waits for the acknowledgment.
    async fn notify_trading_page(&self, symbol: String) -> Result<MessageResponse>;
}

/// Navigation signals delivered by the page host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    PopState,
    HashChange,
    /// Background reported a completed navigation; forces a re-scan
    PageUpdated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WatchOutcome {
    /// Same URL already processed, or another scan in flight
    Skipped,
    NotTradingPage,
    NoSymbol,
    Notified { symbol: String },
    Failed { error: String },
}

#[derive(Debug, Default)]
struct WatchState {
    last_processed_url: String,
    last_seen_url: String,
    is_processing: bool,
}

pub struct SymbolWatcher {
    location: Arc<dyn PageLocation>,
    link: Arc<dyn BackgroundLink>,
    state: Mutex<WatchState>,
    poll_interval: Duration,
}

impl SymbolWatcher {
    pub fn new(location: Arc<dyn PageLocation>, link: Arc<dyn BackgroundLink>) -> Self {
        let last_seen_url = location.current_url();
        Self {
            location,
            link,
            state: Mutex::new(WatchState {
                last_seen_url,
                ..Default::default()
            }),
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, WatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Scans the current page and reports its symbol.
    ///
    /// Without `force_refresh`, a scan already in flight or an unchanged URL
    /// makes this a no-op.
    pub async fn initialize(&self, force_refresh: bool) -> WatchOutcome {
        let current_url = self.location.current_url();

        {
            let mut state = self.state();
            if !force_refresh && (state.is_processing || current_url == state.last_processed_url) {
                debug!(url = %current_url, "Skipping repeated page scan");
                return WatchOutcome::Skipped;
            }
            state.is_processing = true;
        }

        if !is_trading_page(&current_url) {
            self.state().is_processing = false;
            return WatchOutcome::NotTradingPage;
        }

        let Some(symbol) = parse_symbol(&current_url) else {
            debug!(url = %current_url, "Trading page without a recognizable symbol");
            self.state().is_processing = false;
            return WatchOutcome::NoSymbol;
        };

        let result = self.link.notify_trading_page(symbol.clone()).await;

        let mut state = self.state();
        state.is_processing = false;
        match result {
            Ok(_) => {
                state.last_processed_url = current_url;
                info!(%symbol, "Reported trading page symbol");
                WatchOutcome::Notified { symbol }
            }
            Err(err) => {
                warn!(%symbol, error = %err, "Failed to report trading page symbol");
                WatchOutcome::Failed {
                    error: err.to_string(),
                }
            }
        }
    }

    /// Checks for a URL change since the last check; a change onto a trading
    /// page triggers a scan.
    pub async fn on_url_change(&self) -> Option<WatchOutcome> {
        let current_url = self.location.current_url();
        {
            let mut state = self.state();
            if current_url == state.last_seen_url {
                return None;
            }
            state.last_seen_url = current_url.clone();
        }

        debug!(url = %current_url, "Page URL changed");
        if is_trading_page(&current_url) {
            Some(self.initialize(false).await)
        } else {
            None
        }
    }

    /// Symbol of the current URL, without notifying anyone.
    pub fn current_symbol(&self) -> Option<String> {
        parse_symbol(&self.location.current_url())
    }

    /// Answers a message addressed to this page.
    pub async fn handle(&self, message: Message) -> Result<MessageResponse> {
        match message {
            Message::PageUpdated { .. } => {
                self.initialize(true).await;
                Ok(MessageResponse::success())
            }
            Message::GetSymbolFromContent => Ok(MessageResponse::symbol(self.current_symbol())),
            other => Err(BridgeError::UnsupportedMessage(other.kind().to_string())),
        }
    }

    /// Runs the initial scan, then reacts to navigation events and the poll
    /// timer until `events` closes or `shutdown` fires.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<NavigationEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        self.initialize(false).await;

        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately.
        poll.tick().await;

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    self.on_url_change().await;
                }
                event = events.recv() => match event {
                    Some(NavigationEvent::PopState) | Some(NavigationEvent::HashChange) => {
                        self.on_url_change().await;
                    }
                    Some(NavigationEvent::PageUpdated) => {
                        self.initialize(true).await;
                    }
                    None => {
                        debug!("Navigation event channel closed, stopping watcher");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    info!("Watcher shutting down");
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for SymbolWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("SymbolWatcher")
            .field("last_processed_url", &state.last_processed_url)
            .field("is_processing", &state.is_processing)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}
