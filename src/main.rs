use cooltrade_bridge::config::{ProxyConfig, RateLimitConfig};
use cooltrade_bridge::exchange::{is_trading_page, parse_symbol};
use cooltrade_bridge::BackgroundService;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Http,
    Parse(String),
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first to determine mode
    let args: Vec<String> = std::env::args().collect();
    let (mode, port) = parse_args(&args);

    // Initialize tracing/logging
    // Always stderr: stdout carries --parse and --watch output
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    match mode {
        Mode::Parse(url) => run_parse(&url)?,
        Mode::Watch => {
            let service = build_service()?;
            cooltrade_bridge::transport::stdio::run_stdio_watch(service).await?;
        }
        Mode::Http => run_http(port).await?,
    }

    Ok(())
}

/// Parse command-line arguments
fn parse_args(args: &[String]) -> (Mode, Option<u16>) {
    let mut mode = Mode::Http;
    let mut port = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--http" => mode = Mode::Http,
            "--watch" => mode = Mode::Watch,
            "--parse" => {
                if i + 1 < args.len() {
                    mode = Mode::Parse(args[i + 1].clone());
                    i += 1;
                } else {
                    eprintln!("--parse requires a URL");
                    print_usage();
                    std::process::exit(1);
                }
            }
            "--port" => {
                if i + 1 < args.len() {
                    port = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    (mode, port)
}

/// Print usage information
fn print_usage() {
    println!("CoolTrade Bridge - exchange symbol detection and analytics API relay");
    println!();
    println!("USAGE:");
    println!("    cooltrade-bridge [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --http              Serve the HTTP bridge (default)");
    println!("    --port <PORT>       Port for the HTTP bridge (default: 8787)");
    println!("    --parse <URL>       Print the symbol parsed from URL and exit");
    println!("    --watch             Read page URLs from stdin, print one JSON report per line");
    println!("    --help, -h          Print this help message");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    COOLTRADE_ENV                          production or development (default: production)");
    println!("    COOLTRADE_API_BASE_URL                 Analytics API base URL");
    println!("    COOLTRADE_API_TOKEN                    Fallback API token");
    println!("    COOLTRADE_REQUEST_TIMEOUT_SECS         Request timeout (default: 60)");
    println!("    COOLTRADE_FORCE_REFRESH_TIMEOUT_SECS   Force-refresh timeout (default: 120)");
    println!("    COOLTRADE_MAX_RETRIES                  Attempts per request (default: 3)");
    println!("    COOLTRADE_RATE_LIMIT_MAX               Notifications per window per tab (default: 10)");
    println!("    COOLTRADE_RATE_LIMIT_WINDOW_MS         Rate limit window (default: 1000)");
    println!("    BRIDGE_HTTP_HOST                       Bind host (default: 127.0.0.1)");
    println!("    BRIDGE_HTTP_PORT                       Bind port (default: 8787)");
    println!("    RUST_LOG                               Logging level (default: info)");
    println!();
    println!("EXAMPLES:");
    println!("    cooltrade-bridge --parse https://www.binance.com/en/trade/BTC_USDT");
    println!("    cooltrade-bridge --http --port 9000");
    println!("    echo https://www.okx.com/trade-spot/eth-usdt | cooltrade-bridge --watch");
}

fn build_service() -> anyhow::Result<Arc<BackgroundService>> {
    let proxy_config = ProxyConfig::from_env()?;
    let rate_limit = RateLimitConfig::from_env()?;

    tracing::info!(
        environment = ?proxy_config.environment,
        base_url = %proxy_config.base_url,
        has_token = proxy_config.token.is_some(),
        max_attempts = proxy_config.max_attempts,
        "Initializing background service"
    );

    Ok(Arc::new(BackgroundService::from_config(
        proxy_config,
        rate_limit,
    )?))
}

fn run_parse(url: &str) -> anyhow::Result<()> {
    let trading = is_trading_page(url);
    match parse_symbol(url) {
        Some(symbol) => println!("{}", symbol),
        None => {
            tracing::info!(trading_page = trading, "No symbol found in {}", url);
            std::process::exit(2);
        }
    }
    Ok(())
}

#[cfg(feature = "http_transport")]
async fn run_http(port: Option<u16>) -> anyhow::Result<()> {
    use cooltrade_bridge::config::HttpConfig;

    let mut http_config = HttpConfig::from_env()?;
    if let Some(port) = port {
        http_config.addr.set_port(port);
    }

    let service = build_service()?;
    cooltrade_bridge::transport::http::start_http_server(http_config, service).await
}

#[cfg(not(feature = "http_transport"))]
async fn run_http(_port: Option<u16>) -> anyhow::Result<()> {
    anyhow::bail!("HTTP bridge not available: rebuild with --features http_transport")
}
