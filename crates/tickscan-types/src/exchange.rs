//! Supported exchanges.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Exchange whose public futures ticker endpoint can be polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeId {
    /// Binance USD-M futures.
    Binance,
    /// Bybit linear perpetuals.
    Bybit,
    /// OKX perpetual swaps.
    Okx,
    /// Bitget USDT futures.
    Bitget,
}

impl ExchangeId {
    /// Returns the exchange as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Binance => "binance",
            Self::Bybit => "bybit",
            Self::Okx => "okx",
            Self::Bitget => "bitget",
        }
    }

    /// Returns all supported exchanges.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Binance, Self::Bybit, Self::Okx, Self::Bitget]
    }
}

impl std::fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExchangeId {
    type Err = ExchangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "binance" => Ok(Self::Binance),
            "bybit" => Ok(Self::Bybit),
            "okx" => Ok(Self::Okx),
            "bitget" => Ok(Self::Bitget),
            _ => Err(ExchangeParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unsupported exchange name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeParseError(String);

impl std::fmt::Display for ExchangeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unsupported exchange '{}', expected one of: binance, bybit, okx, bitget",
            self.0
        )
    }
}

impl std::error::Error for ExchangeParseError {}
