//! Tickers command implementation.

use anyhow::{Context, Result};
use tickscan_fetch::{ExchangeClient, TickerSource};
use tickscan_types::{ExchangeId, clean_symbol};

/// Fetch one snapshot and print a table of tickers.
pub(crate) async fn tickers(exchange: &str, filter: Option<&str>, limit: usize) -> Result<()> {
    let exchange: ExchangeId = exchange.parse()?;
    let client = ExchangeClient::with_defaults(exchange)?;
    let mut tickers = client
        .all_tickers()
        .await
        .with_context(|| format!("Failed to fetch {exchange} tickers"))?;

    if let Some(pattern) = filter {
        let pattern = pattern.to_uppercase();
        tickers.retain(|t| t.symbol.to_uppercase().contains(&pattern));
    }
    tickers.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    if tickers.is_empty() {
        println!("No tickers found.");
        return Ok(());
    }

    println!(
        "{:<22} {:<12} {:>16} {:>10} {:>20}",
        "SYMBOL", "NORMALIZED", "LAST", "CHANGE", "VOLUME 24H"
    );
    println!("{}", "-".repeat(84));

    for ticker in tickers.iter().take(limit) {
        println!(
            "{:<22} {:<12} {:>16} {:>10} {:>20}",
            ticker.symbol,
            clean_symbol(&ticker.symbol),
            ticker.last_price,
            ticker.change_24h,
            ticker.vol_24h
        );
    }

    println!("\nShowing {} of {} tickers", tickers.len().min(limit), tickers.len());
    Ok(())
}
