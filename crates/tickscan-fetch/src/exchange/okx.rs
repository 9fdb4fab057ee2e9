//! OKX perpetual swap tickers.

use serde::Deserialize;
use serde_json::Value;
use tickscan_types::{ExchangeId, NormalizedTicker};

use super::{Endpoints, decode_entries, lenient_string, percent_change};
use crate::FetchError;

pub(super) const ENDPOINTS: Endpoints = Endpoints {
    base_url: "https://www.okx.com",
    snapshot_path: "/api/v5/market/tickers",
    snapshot_query: &[("instType", "SWAP")],
    ticker_path: "/api/v5/market/ticker",
    symbol_param: "instId",
};

#[derive(Debug, Deserialize)]
struct Envelope {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker {
    inst_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    last: String,
    #[serde(default, rename = "vol24h", deserialize_with = "lenient_string")]
    vol_24h: String,
    #[serde(default, rename = "open24h", deserialize_with = "lenient_string")]
    open_24h: String,
    #[serde(default, rename = "high24h", deserialize_with = "lenient_string")]
    high_24h: String,
    #[serde(default, rename = "low24h", deserialize_with = "lenient_string")]
    low_24h: String,
}

pub(super) fn parse_tickers(body: &str) -> Result<Vec<NormalizedTicker>, FetchError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    if envelope.code != "0" {
        return Err(FetchError::Api {
            exchange: ExchangeId::Okx,
            code: envelope.code,
            message: envelope.msg,
        });
    }

    Ok(decode_entries::<Ticker>(ExchangeId::Okx, envelope.data)
        .into_iter()
        .map(|t| {
            // OKX reports no change field; derive it from the 24h open.
            let change = percent_change(&t.open_24h, &t.last);
            NormalizedTicker::new(ExchangeId::Okx, t.inst_id, t.last, t.vol_24h, change)
                .with_range(t.high_24h, t.low_24h)
        })
        .collect())
}
