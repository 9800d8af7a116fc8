//! Per-tab rate limiter for trading-page notifications
//!
//! Sliding window log: each key keeps the instants of its admitted requests
//! within the window. Stale entries are pruned on every check, so memory per
//! key is bounded by `max_requests`, and keys with nothing left in their
//! window are dropped.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;

/// Rate limiter errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RateLimitError {
    #[error("Too many requests, please wait {wait_secs:.2} seconds")]
    TooManyRequests { wait_secs: f64 },
}

impl RateLimitError {
    pub fn retry_after(&self) -> Duration {
        match self {
            RateLimitError::TooManyRequests { wait_secs } => Duration::from_secs_f64(*wait_secs),
        }
    }
}

/// Keyed sliding-window rate limiter
#[derive(Debug)]
pub struct RateLimiter<K> {
    config: RateLimitConfig,
    windows: Mutex<HashMap<K, VecDeque<Instant>>>,
}

impl<K> RateLimiter<K>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Admits one request for `key` or reports how long until a slot frees up.
    pub fn check(&self, key: &K) -> Result<(), RateLimitError> {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &K, now: Instant) -> Result<(), RateLimitError> {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let span = self.config.window;
        windows.retain(|k, w| {
            k == key
                || w
                    .back()
                    .is_some_and(|newest| now.saturating_duration_since(*newest) < span)
        });
        let window = windows.entry(key.clone()).or_default();

        while let Some(oldest) = window.front() {
            if now.saturating_duration_since(*oldest) < self.config.window {
                break;
            }
            window.pop_front();
        }

        if window.len() >= self.config.max_requests {
            let oldest = window.front().copied().unwrap_or(now);
            let wait = self
                .config
                .window
                .saturating_sub(now.saturating_duration_since(oldest));
            warn!(
                ?key,
                in_window = window.len(),
                wait_ms = wait.as_millis() as u64,
                "Rate limit exceeded"
            );
            return Err(RateLimitError::TooManyRequests {
                wait_secs: wait.as_secs_f64(),
            });
        }

        window.push_back(now);
        debug!(?key, in_window = window.len(), "Rate limit permission granted");
        Ok(())
    }

    /// Drops the window of a closed tab.
    pub fn forget(&self, key: &K) {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Number of keys holding a window.
    pub fn tracked_keys(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Requests currently counted against `key`.
    pub fn in_window(&self, key: &K) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map_or(0, VecDeque::len)
    }
}
