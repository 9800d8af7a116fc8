//! In-process location and background link

use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

use super::{BackgroundLink, PageLocation};
use crate::background::BackgroundService;
use crate::error::{BridgeError, Result};
use crate::messages::{Message, MessageResponse, TabId};

/// Location cell shared between the page host and its watcher
#[derive(Debug, Clone, Default)]
pub struct SharedLocation {
    url: Arc<RwLock<String>>,
}

impl SharedLocation {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Arc::new(RwLock::new(url.into())),
        }
    }

    pub fn set(&self, url: impl Into<String>) {
        *self.url.write().unwrap_or_else(PoisonError::into_inner) = url.into();
    }
}

impl PageLocation for SharedLocation {
    fn current_url(&self) -> String {
        self.url
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Direct link to a background service running in the same process
#[derive(Debug, Clone)]
pub struct LocalLink {
    service: Arc<BackgroundService>,
    tab: Option<TabId>,
}

impl LocalLink {
    pub fn new(service: Arc<BackgroundService>, tab: Option<TabId>) -> Self {
        Self { service, tab }
    }
}

#[async_trait]
impl BackgroundLink for LocalLink {
    async fn notify_trading_page(&self, symbol: String) -> Result<MessageResponse> {
        let response = self
            .service
            .handle(Message::TradingPageLoaded { symbol }, self.tab)
            .await?;
        if !response.is_success() {
            return Err(BridgeError::LinkClosed(
                "background rejected trading page notification".to_string(),
            ));
        }
        Ok(response)
    }
}
