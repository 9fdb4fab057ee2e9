//! OHLC candle data structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tickscan_types::{Interval, TickSample};

/// Completed OHLC candle for one symbol and interval.
///
/// Candles are produced at extraction time and never updated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Exchange symbol.
    pub symbol: String,
    /// Candle interval.
    pub interval: Interval,
    /// Price of the earliest sample in the window.
    pub open: f64,
    /// Highest sample price in the window.
    pub high: f64,
    /// Lowest sample price in the window.
    pub low: f64,
    /// Price of the latest sample in the window.
    pub close: f64,
    /// Window start in Unix milliseconds, a multiple of the interval length.
    pub open_time: i64,
    /// Sum of sample volumes.
    pub volume: f64,
    /// Number of samples in the window.
    pub trade_count: i64,
}

impl Candle {
    /// Builds a candle from samples sorted by time.
    ///
    /// Returns `None` if `samples` is empty.
    #[must_use]
    pub fn from_samples(
        symbol: &str,
        interval: Interval,
        open_time: i64,
        samples: &[&TickSample],
    ) -> Option<Self> {
        let (first, rest) = samples.split_first()?;
        let mut builder = CandleBuilder::new(first);
        for sample in rest {
            builder.update(sample);
        }
        Some(builder.finish(symbol, interval, open_time))
    }

    /// Returns the candle open time as a UTC timestamp.
    #[must_use]
    pub fn open_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.open_time)
    }

    /// Returns the exclusive window end in Unix milliseconds.
    #[must_use]
    pub const fn close_time(&self) -> i64 {
        self.open_time + self.interval.millis()
    }

    /// Returns the price range (high - low).
    #[must_use]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Returns true if this is a bullish (green) candle.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

/// Running OHLC accumulator.
#[derive(Debug)]
struct CandleBuilder {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    trade_count: i64,
}

impl CandleBuilder {
    const fn new(sample: &TickSample) -> Self {
        Self {
            open: sample.price,
            high: sample.price,
            low: sample.price,
            close: sample.price,
            volume: sample.volume,
            trade_count: 1,
        }
    }

    fn update(&mut self, sample: &TickSample) {
        self.high = self.high.max(sample.price);
        self.low = self.low.min(sample.price);
        self.close = sample.price;
        self.volume += sample.volume;
        self.trade_count += 1;
    }

    fn finish(self, symbol: &str, interval: Interval, open_time: i64) -> Candle {
        Candle {
            symbol: symbol.to_string(),
            interval,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            open_time,
            volume: self.volume,
            trade_count: self.trade_count,
        }
    }
}
