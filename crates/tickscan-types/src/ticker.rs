//! Normalized ticker snapshot record.

use serde::{Deserialize, Serialize};

use crate::{ExchangeId, TickerParseError};

/// Exchange-independent ticker record.
///
/// Every exchange adapter maps its own response shape onto this struct.
/// Numeric fields stay as the decimal strings the exchange returned; the
/// scanner parses them with [`NormalizedTicker::sample_values`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTicker {
    /// Raw exchange symbol (e.g. `BTCUSDT`, `BTC-USDT-SWAP`).
    pub symbol: String,
    /// Last traded price.
    pub last_price: String,
    /// Rolling 24h volume.
    pub vol_24h: String,
    /// Rolling 24h change, in percent or ratio depending on the exchange.
    pub change_24h: String,
    /// Rolling 24h high, empty when the exchange does not report it.
    pub high_24h: String,
    /// Rolling 24h low, empty when the exchange does not report it.
    pub low_24h: String,
    /// Exchange the ticker came from.
    pub exchange: ExchangeId,
}

impl NormalizedTicker {
    /// Creates a ticker with the fields every exchange reports.
    #[must_use]
    pub fn new(
        exchange: ExchangeId,
        symbol: impl Into<String>,
        last_price: impl Into<String>,
        vol_24h: impl Into<String>,
        change_24h: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            last_price: last_price.into(),
            vol_24h: vol_24h.into(),
            change_24h: change_24h.into(),
            high_24h: String::new(),
            low_24h: String::new(),
            exchange,
        }
    }

    /// Sets the 24h high and low.
    #[must_use]
    pub fn with_range(mut self, high_24h: impl Into<String>, low_24h: impl Into<String>) -> Self {
        self.high_24h = high_24h.into();
        self.low_24h = low_24h.into();
        self
    }

    /// Parses the last price and 24h volume.
    ///
    /// # Errors
    ///
    /// Returns an error naming the field that is not a finite decimal number.
    pub fn sample_values(&self) -> Result<(f64, f64), TickerParseError> {
        let price = parse_decimal(&self.last_price).ok_or_else(|| TickerParseError::Price {
            symbol: self.symbol.clone(),
            value: self.last_price.clone(),
        })?;
        let volume = parse_decimal(&self.vol_24h).ok_or_else(|| TickerParseError::Volume {
            symbol: self.symbol.clone(),
            value: self.vol_24h.clone(),
        })?;
        Ok((price, volume))
    }
}

fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_values() {
        let ticker = NormalizedTicker::new(ExchangeId::Binance, "BTCUSDT", "64000.5", "1234.5", "1.2");
        let (price, volume) = ticker.sample_values().unwrap();
        assert!((price - 64000.5).abs() < 1e-9);
        assert!((volume - 1234.5).abs() < 1e-9);
    }

    #[test]
    fn test_sample_values_bad_price() {
        let ticker = NormalizedTicker::new(ExchangeId::Okx, "BTC-USDT-SWAP", "", "10", "0");
        assert!(matches!(
            ticker.sample_values(),
            Err(TickerParseError::Price { .. })
        ));
    }

    #[test]
    fn test_sample_values_bad_volume() {
        let ticker = NormalizedTicker::new(ExchangeId::Bybit, "ETHUSDT", "3000", "NaN", "0");
        assert!(matches!(
            ticker.sample_values(),
            Err(TickerParseError::Volume { .. })
        ));
    }
}
