//! Bitget USDT-margined futures tickers.

use serde::Deserialize;
use serde_json::Value;
use tickscan_types::{ExchangeId, NormalizedTicker};

use super::{Endpoints, decode_entries, lenient_string};
use crate::FetchError;

/// Success code of the Bitget response envelope.
const CODE_OK: &str = "00000";

pub(super) const ENDPOINTS: Endpoints = Endpoints {
    base_url: "https://api.bitget.com",
    snapshot_path: "/api/v2/mix/market/tickers",
    snapshot_query: &[("productType", "USDT-FUTURES")],
    ticker_path: "/api/v2/mix/market/ticker",
    symbol_param: "symbol",
};

#[derive(Debug, Deserialize)]
struct Envelope {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Option<Vec<Value>>,
}

/// v2 responses use `lastPr`/`change24h`; older ones `last`/`changePercent`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker {
    symbol: String,
    #[serde(default, alias = "last", deserialize_with = "lenient_string")]
    last_pr: String,
    #[serde(default, deserialize_with = "lenient_string")]
    base_volume: String,
    #[serde(
        default,
        rename = "change24h",
        alias = "changePercent",
        deserialize_with = "lenient_string"
    )]
    change_24h: String,
    #[serde(default, rename = "high24h", deserialize_with = "lenient_string")]
    high_24h: String,
    #[serde(default, rename = "low24h", deserialize_with = "lenient_string")]
    low_24h: String,
}

pub(super) fn parse_tickers(body: &str) -> Result<Vec<NormalizedTicker>, FetchError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    if envelope.code != CODE_OK {
        return Err(FetchError::Api {
            exchange: ExchangeId::Bitget,
            code: envelope.code,
            message: envelope.msg,
        });
    }

    Ok(decode_entries::<Ticker>(ExchangeId::Bitget, envelope.data.unwrap_or_default())
        .into_iter()
        .map(|t| {
            NormalizedTicker::new(ExchangeId::Bitget, t.symbol, t.last_pr, t.base_volume, t.change_24h)
                .with_range(t.high_24h, t.low_24h)
        })
        .collect())
}
