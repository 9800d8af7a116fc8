//! Stdio watch loop
//!
//! Reads one page URL per line from stdin, treats each as a completed
//! navigation of a single tab and writes one JSON report per line to stdout.
//! Logging goes to stderr.

use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::background::BackgroundService;
use crate::messages::TabId;
use crate::watcher::{LocalLink, SharedLocation, SymbolWatcher, WatchOutcome};

/// Tab id used for the stdin-driven page
pub const STDIO_TAB: TabId = 1;

#[derive(Debug, Serialize)]
struct WatchReport<'a> {
    url: &'a str,
    #[serde(flatten)]
    outcome: WatchOutcome,
    current_symbol: String,
}

/// Runs the watch loop on stdin/stdout until EOF.
pub async fn run_stdio_watch(service: Arc<BackgroundService>) -> anyhow::Result<()> {
    tracing::info!("Reading page URLs from stdin");
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    watch_lines(service, stdin, stdout).await?;
    tracing::info!("Stdin closed, watch loop finished");
    Ok(())
}

/// Feeds each non-blank line of `reader` to a watcher as a fresh navigation.
pub async fn watch_lines<R, W>(
    service: Arc<BackgroundService>,
    reader: R,
    mut writer: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let location = SharedLocation::default();
    let link = LocalLink::new(service.clone(), Some(STDIO_TAB));
    let watcher = SymbolWatcher::new(Arc::new(location.clone()), Arc::new(link));

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let url = line.trim();
        if url.is_empty() {
            continue;
        }

        location.set(url);
        let outcome = watcher.initialize(true).await;

        let report = WatchReport {
            url,
            outcome,
            current_symbol: service.current_symbol(),
        };
        let mut encoded = serde_json::to_vec(&report)?;
        encoded.push(b'\n');
        writer.write_all(&encoded).await?;
        writer.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProxyConfig, RateLimitConfig};
    use crate::proxy::ApiProxy;

    #[tokio::test]
    async fn test_watch_lines_reports_each_url() {
        let proxy = ApiProxy::from_config(ProxyConfig::default()).unwrap();
        let service = Arc::new(BackgroundService::new(
            Arc::new(proxy),
            RateLimitConfig::default(),
        ));

        let input: &[u8] = b"https://www.okx.com/trade-spot/eth-usdt\n\nhttps://example.com/\n";
        let mut output = Vec::new();
        watch_lines(service.clone(), input, &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let reports: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0]["outcome"], "notified");
        assert_eq!(reports[0]["symbol"], "ETHUSDT");
        assert_eq!(reports[0]["current_symbol"], "ETHUSDT");
        assert_eq!(reports[1]["outcome"], "not_trading_page");
        assert_eq!(reports[1]["current_symbol"], "ETHUSDT");
    }
}
