//! Fetch error types.

use thiserror::Error;
use tickscan_types::ExchangeId;

/// Errors that can occur while fetching ticker data.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request failed and is not retryable.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server kept answering with a rate-limit status.
    #[error("rate limited (status {status}) after {attempts} attempts")]
    RateLimited {
        /// Last HTTP status code (429 or 418).
        status: u16,
        /// Number of requests issued.
        attempts: u32,
    },

    /// Transient network failure persisted through every retry.
    #[error("transient error after {attempts} attempts: {source}")]
    Transient {
        /// Number of requests issued.
        attempts: u32,
        /// Last underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// Server returned a non-success status.
    #[error("server returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// Exchange returned a well-formed error envelope.
    #[error("{exchange} API error {code}: {message}")]
    Api {
        /// Exchange that reported the error.
        exchange: ExchangeId,
        /// Exchange-specific error code.
        code: String,
        /// Exchange-provided message.
        message: String,
    },

    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Single-ticker lookup returned no data.
    #[error("no ticker returned for {symbol}")]
    MissingTicker {
        /// Requested symbol.
        symbol: String,
    },

    /// Request body is a stream and cannot be replayed on retry.
    #[error("request cannot be cloned for retry")]
    UnclonableRequest,
}

impl FetchError {
    /// Returns true if the error came from the retry cap being reached.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transient { .. })
    }
}
