//! Ticker field parse errors.

use thiserror::Error;

/// Error for ticker fields that are not valid decimal numbers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TickerParseError {
    /// The last price is missing or not a number.
    #[error("invalid last price '{value}' for {symbol}")]
    Price {
        /// The symbol whose price failed to parse.
        symbol: String,
        /// The raw value.
        value: String,
    },

    /// The 24h volume is missing or not a number.
    #[error("invalid 24h volume '{value}' for {symbol}")]
    Volume {
        /// The symbol whose volume failed to parse.
        symbol: String,
        /// The raw value.
        value: String,
    },
}
