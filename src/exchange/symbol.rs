//! Trading symbol normalization
//!
//! Canonical symbols are uppercase base + quote with no separator, e.g. `BTCUSDT`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BridgeError;

/// Quote currency appended to bare base assets.
pub const DEFAULT_QUOTE: &str = "USDT";

/// Symbol the background service reports before any page was seen.
pub const DEFAULT_SYMBOL: &str = "BTCUSDT";

/// US equity tickers that are reported verbatim instead of being paired with USDT.
pub const KNOWN_EQUITY_TICKERS: [&str; 21] = [
    "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "META", "NVDA", "NFLX", "BABA", "AMD", "INTC", "CRM",
    "ORCL", "ADBE", "PYPL", "UBER", "LYFT", "SNAP", "TWTR", "FB", "GOOG",
];

/// Returns true for 1-5 uppercase ASCII letters listed in [`KNOWN_EQUITY_TICKERS`].
pub fn is_known_equity(symbol: &str) -> bool {
    (1..=5).contains(&symbol.len())
        && symbol.bytes().all(|b| b.is_ascii_uppercase())
        && KNOWN_EQUITY_TICKERS.contains(&symbol)
}

/// Normalizes a symbol reported by a watcher before it becomes the current symbol.
///
/// Known equities pass through. Anything already quoted in USDT or BTC is kept,
/// everything else gets the default quote appended.
pub fn normalize_reported_symbol(symbol: &str) -> String {
    if is_known_equity(symbol) || symbol.contains(DEFAULT_QUOTE) || symbol.contains("BTC") {
        symbol.to_string()
    } else {
        format!("{}{}", symbol, DEFAULT_QUOTE)
    }
}

/// Market a report is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    #[default]
    Crypto,
    Stock,
    China,
}

impl MarketType {
    /// Path segment of this market's API endpoints.
    pub fn api_segment(&self) -> &'static str {
        match self {
            MarketType::Crypto => "crypto",
            MarketType::Stock => "stock",
            MarketType::China => "china",
        }
    }

    /// Symbol as the report endpoints expect it.
    ///
    /// Crypto symbols are quoted in USDT; equities are only uppercased.
    pub fn report_symbol(&self, symbol: &str) -> Result<String, BridgeError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(BridgeError::InvalidSymbol("symbol is empty".to_string()));
        }
        if !symbol.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
            return Err(BridgeError::InvalidSymbol(symbol.to_string()));
        }

        let upper = symbol.to_ascii_uppercase();
        Ok(match self {
            MarketType::Crypto if !upper.ends_with(DEFAULT_QUOTE) => {
                format!("{}{}", upper, DEFAULT_QUOTE)
            }
            _ => upper,
        })
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_segment())
    }
}

impl FromStr for MarketType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "crypto" => Ok(MarketType::Crypto),
            "stock" => Ok(MarketType::Stock),
            "china" => Ok(MarketType::China),
            other => Err(BridgeError::Config(format!("unknown market type '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equity_detection() {
        assert!(is_known_equity("AAPL"));
        assert!(is_known_equity("FB"));
        assert!(!is_known_equity("aapl"));
        assert!(!is_known_equity("ETH"));
        assert!(!is_known_equity("GOOGLE"));
    }

    #[test]
    fn test_reported_symbol_normalization() {
        assert_eq!(normalize_reported_symbol("ETH"), "ETHUSDT");
        assert_eq!(normalize_reported_symbol("ETHUSDT"), "ETHUSDT");
        assert_eq!(normalize_reported_symbol("TSLA"), "TSLA");
        // BTC-quoted pairs are left alone.
        assert_eq!(normalize_reported_symbol("ETHBTC"), "ETHBTC");
        assert_eq!(normalize_reported_symbol("BTC"), "BTC");
    }

    #[test]
    fn test_report_symbol_per_market() {
        assert_eq!(MarketType::Crypto.report_symbol("eth").unwrap(), "ETHUSDT");
        assert_eq!(MarketType::Crypto.report_symbol("btcusdt").unwrap(), "BTCUSDT");
        assert_eq!(MarketType::Stock.report_symbol("aapl").unwrap(), "AAPL");
        assert_eq!(MarketType::China.report_symbol("600519.SH").unwrap(), "600519.SH");
        assert!(MarketType::Crypto.report_symbol("  ").is_err());
        assert!(MarketType::Crypto.report_symbol("../etc").is_err());
    }

    #[test]
    fn test_market_type_round_trip_names() {
        assert_eq!("Stock".parse::<MarketType>().unwrap(), MarketType::Stock);
        assert_eq!(MarketType::China.to_string(), "china");
        assert!("forex".parse::<MarketType>().is_err());
    }
}
