//! Exchange Registry
//!
//! Static per-exchange URL rules. Entries and their symbol patterns are tried
//! in declaration order; language-prefixed patterns sit before generic ones.

use once_cell::sync::Lazy;
use regex::Regex;

/// Hostname fragment of the marketplace whose futures URLs encode the pair as `BASE_QUOTE`.
pub const FUTURES_HOST: &str = "mexc.com";

/// Immutable registry entry for one exchange
#[derive(Debug)]
pub struct ExchangeDescriptor {
    pub name: &'static str,
    /// Substring matched against the page URL / hostname
    pub hostname_fragment: &'static str,
    /// A path containing any of these is a trade page
    pub trade_path_patterns: &'static [&'static str],
    /// Case-insensitive extraction patterns with one or two capture groups
    pub symbol_patterns: Vec<Regex>,
}

impl ExchangeDescriptor {
    pub fn matches_host(&self, haystack: &str) -> bool {
        haystack.contains(self.hostname_fragment)
    }

    pub fn matches_trade_path(&self, path: &str) -> bool {
        self.trade_path_patterns.iter().any(|p| path.contains(p))
    }
}

struct ExchangeSpec {
    name: &'static str,
    host: &'static str,
    trade_paths: &'static [&'static str],
    patterns: &'static [&'static str],
}

const EXCHANGES: &[ExchangeSpec] = &[
    ExchangeSpec {
        name: "Gate.io",
        host: "gate.io",
        trade_paths: &["/zh/trade/", "/en/trade/", "/trade/"],
        patterns: &[
            r"/trade/([A-Z0-9]+)_USDT",
            r"/[a-z]{2}/trade/([A-Z0-9]+)_USDT",
            r"/([A-Z0-9]+)_USDT$",
        ],
    },
    ExchangeSpec {
        name: "Gate.com",
        host: "gate.com",
        trade_paths: &["/zh/trade/", "/en/trade/", "/trade/"],
        patterns: &[
            r"/trade/([A-Z0-9]+)_USDT",
            r"/[a-z]{2}/trade/([A-Z0-9]+)_USDT",
            r"/([A-Z0-9]+)_USDT$",
            r"/([A-Z0-9]+)_([A-Z0-9]+)",
        ],
    },
    ExchangeSpec {
        name: "Binance",
        host: "binance.com",
        trade_paths: &["/trade/"],
        patterns: &[
            r"/([A-Z0-9]+)USDT$",
            r"/trade/([A-Z0-9]+)_USDT",
            r"/trading/([A-Z0-9]+)USDT",
        ],
    },
    ExchangeSpec {
        name: "OKX",
        host: "okx.com",
        trade_paths: &["/trade-spot/", "/trade/"],
        patterns: &[
            r"/([A-Z0-9]+)-USDT$",
            r"/trade/([A-Z0-9]+)-USDT",
            r"/spot/([A-Z0-9]+)-USDT",
        ],
    },
    ExchangeSpec {
        name: "HTX",
        host: "htx.com",
        trade_paths: &["/trade/"],
        patterns: &[r"/trade/([A-Z0-9]+)_([A-Z0-9]+)"],
    },
    ExchangeSpec {
        name: "Bybit",
        host: "bybit.com",
        trade_paths: &["/trade/usdt/", "/trade/spot/", "/en/trade/", "/zh/trade/"],
        patterns: &[
            r"/trade/usdt/([A-Z0-9]+)",
            r"/trade/spot/([A-Z0-9]+)/USDT",
            r"/[a-z]{2}/trade/spot/([A-Z0-9]+)/USDT",
            r"/([A-Z0-9]+)/USDT$",
        ],
    },
    ExchangeSpec {
        name: "Bitmart",
        host: "bitmart.com",
        trade_paths: &["/trade/en"],
        patterns: &[r"/trade/en\?symbol=([A-Z0-9_]+)"],
    },
    ExchangeSpec {
        name: "Coinbase",
        host: "coinbase.com",
        trade_paths: &["/trade/"],
        patterns: &[r"/trade/([A-Z0-9-]+)"],
    },
    ExchangeSpec {
        name: "Bitstamp",
        host: "bitstamp.net",
        trade_paths: &["/markets/"],
        patterns: &[r"/markets/([A-Z0-9]+)/([A-Z0-9]+)"],
    },
    ExchangeSpec {
        name: "Kucoin",
        host: "kucoin.com",
        trade_paths: &["/trade/"],
        patterns: &[r"/trade/([A-Z0-9_]+)-([A-Z0-9_]+)"],
    },
    ExchangeSpec {
        name: "Poloniex",
        host: "poloniex.com",
        trade_paths: &["/spot/"],
        patterns: &[r"/spot/([A-Z0-9_]+)"],
    },
    ExchangeSpec {
        name: "Bithumb",
        host: "bithumb.com",
        trade_paths: &["/trade/"],
        patterns: &[r"/trade/([A-Z0-9_]+)"],
    },
    ExchangeSpec {
        name: "Upbit",
        host: "upbit.com",
        trade_paths: &["/trade/"],
        patterns: &[r"/trade\?code=CRIX.UPBIT.([A-Z0-9]+)-([A-Z0-9]+)"],
    },
    ExchangeSpec {
        name: "Bitflyer",
        host: "bitflyer.com",
        trade_paths: &["/trade/"],
        patterns: &[r"/trade/([A-Z0-9_]+)"],
    },
    ExchangeSpec {
        name: "Gemini",
        host: "gemini.com",
        trade_paths: &["/trade/"],
        patterns: &[r"/trade/([A-Z0-9]+)[-_/]([A-Z0-9]+)"],
    },
    ExchangeSpec {
        name: "LBank",
        host: "lbank.com",
        trade_paths: &["/trade/"],
        patterns: &[r"/trade/([A-Z0-9_]+)"],
    },
    ExchangeSpec {
        name: "Phemex",
        host: "phemex.com",
        trade_paths: &["/spot/trade"],
        patterns: &[r"/spot/trade\?symbol=([A-Z0-9_]+)"],
    },
    ExchangeSpec {
        name: "MEXC",
        host: "mexc.com",
        trade_paths: &["/exchange/", "/futures/"],
        patterns: &[r"/exchange/([A-Z0-9_]+)", r"/futures/([A-Z0-9_]+)"],
    },
    ExchangeSpec {
        name: "Bitget",
        host: "bitget.com",
        trade_paths: &["/spot/"],
        patterns: &[r"/spot/([A-Z0-9_]+)"],
    },
    ExchangeSpec {
        name: "Bitfinex",
        host: "bitfinex.com",
        trade_paths: &["/t/"],
        patterns: &[r"/t/([A-Z0-9:]+)"],
    },
    ExchangeSpec {
        name: "Kraken",
        host: "kraken.com",
        trade_paths: &["/trade/"],
        patterns: &[r"/trade/([A-Z0-9]+)-([A-Z0-9]+)"],
    },
    ExchangeSpec {
        name: "Huobi",
        host: "huobi.com",
        trade_paths: &["/en-us/exchange/"],
        patterns: &[r"/exchange/([A-Z0-9]+)/\?type=spot"],
    },
];

fn compile(pattern: &str) -> Regex {
    // All table patterns are literals covered by `test_all_patterns_compile`.
    Regex::new(&format!("(?i){}", pattern)).expect("exchange symbol pattern must compile")
}

static REGISTRY: Lazy<Vec<ExchangeDescriptor>> = Lazy::new(|| {
    EXCHANGES
        .iter()
        .map(|spec| ExchangeDescriptor {
            name: spec.name,
            hostname_fragment: spec.host,
            trade_path_patterns: spec.trade_paths,
            symbol_patterns: spec.patterns.iter().map(|p| compile(p)).collect(),
        })
        .collect()
});

/// `/futures/<PAIR>` segment used by the futures special case.
pub(crate) static FUTURES_PAIR: Lazy<Regex> = Lazy::new(|| compile(r"/futures/([A-Z0-9_]+)"));

/// All registered exchanges, in priority order.
pub fn exchanges() -> &'static [ExchangeDescriptor] {
    &REGISTRY
}

/// First exchange whose hostname fragment occurs in `haystack`.
pub fn find_by_host(haystack: &str) -> Option<&'static ExchangeDescriptor> {
    exchanges().iter().find(|ex| ex.matches_host(haystack))
}

/// `(name, hostname_fragment)` pairs of every supported exchange.
pub fn supported_exchanges() -> impl Iterator<Item = (&'static str, &'static str)> {
    exchanges().iter().map(|ex| (ex.name, ex.hostname_fragment))
}
