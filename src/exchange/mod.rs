//! Exchange URL handling
//!
//! Registry of supported exchanges, URL-to-symbol parsing and trading-page
//! classification.

pub mod classifier;
pub mod parser;
pub mod registry;
pub mod symbol;

// Re-export commonly used items
pub use classifier::is_trading_page;
pub use parser::parse_symbol;
pub use registry::{exchanges, supported_exchanges, ExchangeDescriptor};
pub use symbol::{normalize_reported_symbol, MarketType, DEFAULT_QUOTE, DEFAULT_SYMBOL};
