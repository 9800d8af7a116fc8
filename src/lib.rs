// Library exports for cooltrade-bridge

pub mod error;
pub mod messages;

pub mod config; // Configuration management
pub mod exchange; // Exchange registry, symbol parser, page classifier

pub mod background; // Current symbol, per-tab rate limiting, message handling
pub mod proxy; // Retrying HTTP relay to the analytics API
pub mod watcher; // Page-side symbol watcher

pub mod api; // Token store and report endpoints
pub mod report; // Technical-analysis report normalization

pub mod transport; // HTTP bridge and stdio watch loop

pub use background::BackgroundService;
pub use error::{BridgeError, ProxyError};
pub use exchange::{is_trading_page, parse_symbol};
pub use messages::{Message, MessageResponse};
pub use proxy::{ApiProxy, ProxyRequest, ProxyResponse};
