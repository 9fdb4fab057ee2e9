//! Exchange ticker adapters.
//!
//! Every exchange maps its own snapshot shape onto [`NormalizedTicker`];
//! nothing outside this module sees exchange-specific field names.

mod binance;
mod bitget;
mod bybit;
mod okx;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tickscan_types::{ExchangeId, NormalizedTicker};
use tracing::{debug, warn};

use crate::limit::RateLimitHeaders;
use crate::{ClientConfig, FetchError, RateLimitedClient};

/// Request weight of one ticker endpoint call.
pub const TICKER_WEIGHT: u32 = 1;

/// Source of exchange-wide ticker snapshots.
#[async_trait]
pub trait TickerSource: Send + Sync {
    /// Returns the exchange this source reads from.
    fn exchange(&self) -> ExchangeId;

    /// Fetches the full ticker snapshot in one request.
    async fn all_tickers(&self) -> Result<Vec<NormalizedTicker>, FetchError>;

    /// Fetches the ticker for a single exchange symbol.
    async fn ticker(&self, symbol: &str) -> Result<NormalizedTicker, FetchError>;
}

/// Endpoint description for one exchange.
#[derive(Debug, Clone, Copy)]
struct Endpoints {
    base_url: &'static str,
    snapshot_path: &'static str,
    snapshot_query: &'static [(&'static str, &'static str)],
    ticker_path: &'static str,
    symbol_param: &'static str,
}

const fn endpoints(exchange: ExchangeId) -> Endpoints {
    match exchange {
        ExchangeId::Binance => binance::ENDPOINTS,
        ExchangeId::Bybit => bybit::ENDPOINTS,
        ExchangeId::Okx => okx::ENDPOINTS,
        ExchangeId::Bitget => bitget::ENDPOINTS,
    }
}

fn parse_tickers(exchange: ExchangeId, body: &str) -> Result<Vec<NormalizedTicker>, FetchError> {
    match exchange {
        ExchangeId::Binance => binance::parse_tickers(body),
        ExchangeId::Bybit => bybit::parse_tickers(body),
        ExchangeId::Okx => okx::parse_tickers(body),
        ExchangeId::Bitget => bitget::parse_tickers(body),
    }
}

/// Public-endpoint ticker client for one exchange.
#[derive(Debug, Clone)]
pub struct ExchangeClient {
    exchange: ExchangeId,
    base_url: String,
    http: RateLimitedClient,
}

impl ExchangeClient {
    /// Creates a client for `exchange` using its production base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(exchange: ExchangeId, config: ClientConfig) -> Result<Self, FetchError> {
        let http = RateLimitedClient::new(config, RateLimitHeaders::for_exchange(exchange))?;
        Ok(Self {
            exchange,
            base_url: endpoints(exchange).base_url.to_string(),
            http,
        })
    }

    /// Creates a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_defaults(exchange: ExchangeId) -> Result<Self, FetchError> {
        Self::new(exchange, ClientConfig::default())
    }

    /// Overrides the base URL (scheme and host, no trailing path).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns the base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the underlying rate-limited client.
    #[must_use]
    pub const fn http(&self) -> &RateLimitedClient {
        &self.http
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<NormalizedTicker>, FetchError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let request = self.http.http().get(&url).query(query).build()?;
        let response = self.http.send_with_retry(request, TICKER_WEIGHT).await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let tickers = parse_tickers(self.exchange, &body)?;
        debug!(exchange = %self.exchange, count = tickers.len(), "fetched tickers");
        Ok(tickers)
    }
}

#[async_trait]
impl TickerSource for ExchangeClient {
    fn exchange(&self) -> ExchangeId {
        self.exchange
    }

    async fn all_tickers(&self) -> Result<Vec<NormalizedTicker>, FetchError> {
        let endpoints = endpoints(self.exchange);
        self.get(endpoints.snapshot_path, endpoints.snapshot_query)
            .await
    }

    async fn ticker(&self, symbol: &str) -> Result<NormalizedTicker, FetchError> {
        let endpoints = endpoints(self.exchange);
        let mut query: Vec<(&str, &str)> = endpoints.snapshot_query.to_vec();
        query.push((endpoints.symbol_param, symbol));

        self.get(endpoints.ticker_path, &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::MissingTicker {
                symbol: symbol.to_string(),
            })
    }
}

/// Decodes snapshot entries one by one, dropping those that do not fit `T`.
///
/// A single bad entry must not cost the rest of the snapshot.
fn decode_entries<T: DeserializeOwned>(exchange: ExchangeId, entries: Vec<Value>) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(ticker) => Some(ticker),
            Err(e) => {
                warn!(exchange = %exchange, error = %e, "skipping undecodable ticker entry");
                None
            }
        })
        .collect()
}

/// Reads a numeric field that may arrive as a string, a number or `null`.
///
/// Anything else decodes as empty and is rejected later when parsed.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// Formats `(last - open) / open` as a percentage, or empty if either is unusable.
fn percent_change(open: &str, last: &str) -> String {
    let open = open.trim().parse::<f64>().ok().filter(|v| v.is_finite() && *v != 0.0);
    let last = last.trim().parse::<f64>().ok().filter(|v| v.is_finite());
    match (open, last) {
        (Some(open), Some(last)) => format!("{:.4}", (last - open) / open * 100.0),
        _ => String::new(),
    }
}
