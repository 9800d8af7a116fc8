//! Symbol Parser
//!
//! Extracts a canonical trading pair from an exchange page URL.

use regex::Captures;
use url::Url;

use super::registry::{exchanges, FUTURES_HOST, FUTURES_PAIR};
use super::symbol::DEFAULT_QUOTE;

/// Parses the trading pair shown on an exchange page.
///
/// Returns `None` for malformed URLs, unregistered hosts and URLs none of the
/// matching exchange's patterns recognize. Never panics.
///
/// # Example
/// ```
/// use cooltrade_bridge::exchange::parse_symbol;
///
/// assert_eq!(
///     parse_symbol("https://www.binance.com/en/trade/BTC_USDT").as_deref(),
///     Some("BTCUSDT")
/// );
/// assert_eq!(parse_symbol("https://example.com/"), None);
/// ```
pub fn parse_symbol(url: &str) -> Option<String> {
    if Url::parse(url).is_err() {
        tracing::debug!(url, "not an absolute URL, skipping symbol parse");
        return None;
    }

    if let Some(symbol) = parse_futures_pair(url) {
        return Some(symbol);
    }

    for exchange in exchanges().iter().filter(|ex| ex.matches_host(url)) {
        for pattern in &exchange.symbol_patterns {
            if let Some(caps) = pattern.captures(url) {
                let symbol = symbol_from_captures(&caps);
                tracing::debug!(exchange = exchange.name, %symbol, "parsed symbol from URL");
                return Some(symbol);
            }
        }
    }

    tracing::debug!(url, "no exchange pattern matched");
    None
}

/// Futures pages write the pair as `BASE_QUOTE`; only the base is kept and
/// paired with the default quote.
fn parse_futures_pair(url: &str) -> Option<String> {
    if !url.contains(FUTURES_HOST) || !url.contains("/futures/") {
        return None;
    }

    let pair = FUTURES_PAIR.captures(url)?.get(1)?.as_str();
    let (base, _) = pair.split_once('_')?;
    Some(format!("{}{}", base.to_ascii_uppercase(), DEFAULT_QUOTE))
}

fn symbol_from_captures(caps: &Captures<'_>) -> String {
    let groups: Vec<String> = caps
        .iter()
        .skip(1)
        .flatten()
        .map(|m| m.as_str().to_ascii_uppercase())
        .collect();

    match groups.as_slice() {
        [single] if single.contains(DEFAULT_QUOTE) => single.clone(),
        [single] => format!("{}{}", single, DEFAULT_QUOTE),
        // Non-USDT quotes are concatenated without a separator, e.g. ETH/BTC -> ETHBTC.
        [base, quote] => format!("{}{}", base, quote),
        other => other.concat(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_group_gets_quote() {
        assert_eq!(
            parse_symbol("https://www.bybit.com/trade/usdt/SOL").as_deref(),
            Some("SOLUSDT")
        );
    }

    #[test]
    fn test_single_group_with_quote_is_kept() {
        assert_eq!(
            parse_symbol("https://www.bitget.com/spot/BTCUSDT").as_deref(),
            Some("BTCUSDT")
        );
        // Separator inside the captured pair survives; only the suffix check applies.
        assert_eq!(
            parse_symbol("https://www.poloniex.com/spot/btc_usdt").as_deref(),
            Some("BTC_USDT")
        );
    }

    #[test]
    fn test_two_groups_usdt_quote() {
        assert_eq!(
            parse_symbol("https://www.htx.com/trade/doge_usdt").as_deref(),
            Some("DOGEUSDT")
        );
        assert_eq!(
            parse_symbol("https://www.kucoin.com/trade/ETH-USDT").as_deref(),
            Some("ETHUSDT")
        );
    }

    #[test]
    fn test_futures_special_case() {
        assert_eq!(
            parse_symbol("https://futures.mexc.com/futures/ETH_USDT?type=linear_swap").as_deref(),
            Some("ETHUSDT")
        );
        // No underscore: falls back to the MEXC table entry.
        assert_eq!(
            parse_symbol("https://www.mexc.com/futures/BTCUSDT").as_deref(),
            Some("BTCUSDT")
        );
    }

    #[test]
    fn test_query_string_patterns() {
        assert_eq!(
            parse_symbol("https://www.bitmart.com/trade/en?symbol=BMX_USDT").as_deref(),
            Some("BMX_USDT")
        );
        assert_eq!(
            parse_symbol("https://upbit.com/trade?code=CRIX.UPBIT.KRW-BTC").as_deref(),
            Some("KRWBTC")
        );
    }

    #[test]
    fn test_malformed_url() {
        assert_eq!(parse_symbol("binance.com/en/trade/BTC_USDT"), None);
        assert_eq!(parse_symbol(""), None);
        assert_eq!(parse_symbol("::::"), None);
    }

    #[test]
    fn test_known_host_without_pattern_match() {
        assert_eq!(parse_symbol("https://www.binance.com/en/markets/overview"), None);
    }
}
