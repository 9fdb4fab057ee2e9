//! Binance USDⓈ-M futures tickers.

use serde::Deserialize;
use serde_json::Value;
use tickscan_types::{ExchangeId, NormalizedTicker};

use super::{Endpoints, decode_entries, lenient_string};
use crate::FetchError;

pub(super) const ENDPOINTS: Endpoints = Endpoints {
    base_url: "https://fapi.binance.com",
    snapshot_path: "/fapi/v1/ticker/24hr",
    snapshot_query: &[],
    ticker_path: "/fapi/v1/ticker/24hr",
    symbol_param: "symbol",
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker {
    symbol: String,
    #[serde(default, deserialize_with = "lenient_string")]
    last_price: String,
    #[serde(default, deserialize_with = "lenient_string")]
    volume: String,
    #[serde(default, deserialize_with = "lenient_string")]
    price_change_percent: String,
    #[serde(default, deserialize_with = "lenient_string")]
    high_price: String,
    #[serde(default, deserialize_with = "lenient_string")]
    low_price: String,
}

/// The snapshot is an array; a single-symbol query returns a bare object.
pub(super) fn parse_tickers(body: &str) -> Result<Vec<NormalizedTicker>, FetchError> {
    let entries = match serde_json::from_str(body)? {
        Value::Array(entries) => entries,
        single => vec![single],
    };
    Ok(decode_entries::<Ticker>(ExchangeId::Binance, entries)
        .into_iter()
        .map(normalize)
        .collect())
}

fn normalize(t: Ticker) -> NormalizedTicker {
    NormalizedTicker::new(
        ExchangeId::Binance,
        t.symbol,
        t.last_price,
        t.volume,
        t.price_change_percent,
    )
    .with_range(t.high_price, t.low_price)
}
