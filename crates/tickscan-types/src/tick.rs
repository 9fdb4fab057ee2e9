//! Tick sample representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resolution, in milliseconds, that sample timestamps are truncated to.
pub const TICK_RESOLUTION_MS: i64 = 1_000;

/// Truncates a millisecond timestamp down to [`TICK_RESOLUTION_MS`].
#[must_use]
pub const fn truncate_to_resolution(time_ms: i64) -> i64 {
    time_ms - time_ms.rem_euclid(TICK_RESOLUTION_MS)
}

/// A single price/volume observation for a symbol.
///
/// `time_ms` is always a multiple of [`TICK_RESOLUTION_MS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSample {
    /// Exchange symbol the sample belongs to.
    pub symbol: String,
    /// Last traded price.
    pub price: f64,
    /// Volume reading taken with the price.
    pub volume: f64,
    /// Observation time in Unix milliseconds, truncated to one second.
    pub time_ms: i64,
}

impl TickSample {
    /// Creates a new sample, truncating `time_ms` to the sample resolution.
    #[must_use]
    pub fn new(symbol: impl Into<String>, price: f64, volume: f64, time_ms: i64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            volume,
            time_ms: truncate_to_resolution(time_ms),
        }
    }

    /// Returns the sample time as a UTC timestamp.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.time_ms)
    }
}
