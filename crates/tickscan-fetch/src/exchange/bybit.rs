//! Bybit v5 linear perpetual tickers.

use serde::Deserialize;
use serde_json::Value;
use tickscan_types::{ExchangeId, NormalizedTicker};

use super::{Endpoints, decode_entries, lenient_string};
use crate::FetchError;

pub(super) const ENDPOINTS: Endpoints = Endpoints {
    base_url: "https://api.bybit.com",
    snapshot_path: "/v5/market/tickers",
    snapshot_query: &[("category", "linear")],
    ticker_path: "/v5/market/tickers",
    symbol_param: "symbol",
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    #[serde(default)]
    result: ResultList,
}

#[derive(Debug, Default, Deserialize)]
struct ResultList {
    #[serde(default)]
    list: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker {
    symbol: String,
    #[serde(default, deserialize_with = "lenient_string")]
    last_price: String,
    #[serde(default, rename = "volume24h", deserialize_with = "lenient_string")]
    volume_24h: String,
    #[serde(default, rename = "price24hPcnt", deserialize_with = "lenient_string")]
    price_24h_pcnt: String,
    #[serde(default, rename = "highPrice24h", deserialize_with = "lenient_string")]
    high_price_24h: String,
    #[serde(default, rename = "lowPrice24h", deserialize_with = "lenient_string")]
    low_price_24h: String,
}

pub(super) fn parse_tickers(body: &str) -> Result<Vec<NormalizedTicker>, FetchError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    if envelope.ret_code != 0 {
        return Err(FetchError::Api {
            exchange: ExchangeId::Bybit,
            code: envelope.ret_code.to_string(),
            message: envelope.ret_msg,
        });
    }

    Ok(decode_entries::<Ticker>(ExchangeId::Bybit, envelope.result.list)
        .into_iter()
        .map(|t| {
            NormalizedTicker::new(
                ExchangeId::Bybit,
                t.symbol,
                t.last_price,
                t.volume_24h,
                t.price_24h_pcnt,
            )
            .with_range(t.high_price_24h, t.low_price_24h)
        })
        .collect())
}
