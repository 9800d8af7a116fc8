//! Page Classifier
//!
//! Decides whether a URL is worth running the symbol parser on. Any trade
//! keyword in the path qualifies; the registry's trade paths cover the rest.

use url::Url;

use super::registry::{exchanges, FUTURES_HOST};

const TRADE_KEYWORDS: [&str; 6] = ["trade", "trading", "exchange", "spot", "futures", "market"];

/// Returns true if `url` looks like an exchange trading page.
pub fn is_trading_page(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    let host = parsed.host_str().unwrap_or_default();
    let path = parsed.path();

    if host.contains(FUTURES_HOST) && path.contains("/futures/") {
        return true;
    }

    let lowered = path.to_lowercase();
    if TRADE_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return true;
    }

    exchanges()
        .iter()
        .any(|ex| host.contains(ex.hostname_fragment) && ex.matches_trade_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_heuristic() {
        assert!(is_trading_page("https://www.binance.com/en/trade/BTC_USDT"));
        assert!(is_trading_page("https://unlisted.example/Markets/overview"));
        assert!(is_trading_page("https://www.okx.com/trade-spot/eth-usdt"));
    }

    #[test]
    fn test_registry_fallback() {
        // No keyword in the path; Bitfinex's `/t/` pattern carries it.
        assert!(is_trading_page("https://trading.bitfinex.com/t/BTC:UST"));
        assert!(is_trading_page("https://www.bitfinex.com/t/BTCUSD"));
        assert!(!is_trading_page("https://www.bitfinex.com/about"));
    }

    #[test]
    fn test_non_trading_pages() {
        assert!(!is_trading_page("https://example.com/"));
        assert!(!is_trading_page("https://www.binance.com/en/support"));
        assert!(!is_trading_page("not a url"));
        assert!(!is_trading_page(""));
    }

    #[test]
    fn test_futures_marketplace() {
        assert!(is_trading_page("https://futures.mexc.com/futures/BTC_USDT"));
    }
}
