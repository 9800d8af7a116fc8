//! Current symbol cell

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{PoisonError, RwLock};

use crate::exchange::DEFAULT_SYMBOL;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolSnapshot {
    pub symbol: String,
    pub updated_at: DateTime<Utc>,
}

/// Last symbol seen on a trading page or set by the user.
#[derive(Debug)]
pub struct SymbolState {
    inner: RwLock<SymbolSnapshot>,
}

impl SymbolState {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(SymbolSnapshot {
                symbol: DEFAULT_SYMBOL.to_string(),
                updated_at: Utc::now(),
            }),
        }
    }

    pub fn get(&self) -> String {
        self.snapshot().symbol
    }

    pub fn snapshot(&self) -> SymbolSnapshot {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stores `symbol`, returning the previous value.
    pub fn set(&self, symbol: impl Into<String>) -> String {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut guard.symbol, symbol.into());
        guard.updated_at = Utc::now();
        previous
    }
}

impl Default for SymbolState {
    fn default() -> Self {
        Self::new()
    }
}
