//! Candle interval definitions.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Candle interval.
///
/// The table is closed: every interval maps to a fixed duration and windows
/// are aligned to multiples of that duration since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interval {
    /// 1-minute candles.
    #[serde(rename = "1m")]
    Minute1,
    /// 3-minute candles.
    #[serde(rename = "3m")]
    Minute3,
    /// 5-minute candles.
    #[serde(rename = "5m")]
    Minute5,
    /// 15-minute candles.
    #[serde(rename = "15m")]
    Minute15,
    /// 30-minute candles.
    #[serde(rename = "30m")]
    Minute30,
    /// 1-hour candles.
    #[serde(rename = "1h")]
    Hour1,
    /// 2-hour candles.
    #[serde(rename = "2h")]
    Hour2,
    /// 4-hour candles.
    #[serde(rename = "4h")]
    Hour4,
    /// 12-hour candles.
    #[serde(rename = "12h")]
    Hour12,
    /// Daily candles.
    #[serde(rename = "1d")]
    Day1,
    /// 2-day candles.
    #[serde(rename = "2d")]
    Day2,
    /// 3-day candles.
    #[serde(rename = "3d")]
    Day3,
}

impl Interval {
    /// Returns the duration in milliseconds.
    #[must_use]
    pub const fn millis(&self) -> i64 {
        match self {
            Self::Minute1 => 60_000,
            Self::Minute3 => 3 * 60_000,
            Self::Minute5 => 5 * 60_000,
            Self::Minute15 => 15 * 60_000,
            Self::Minute30 => 30 * 60_000,
            Self::Hour1 => 60 * 60_000,
            Self::Hour2 => 2 * 60 * 60_000,
            Self::Hour4 => 4 * 60 * 60_000,
            Self::Hour12 => 12 * 60 * 60_000,
            Self::Day1 => 24 * 60 * 60_000,
            Self::Day2 => 2 * 24 * 60 * 60_000,
            Self::Day3 => 3 * 24 * 60 * 60_000,
        }
    }

    /// Returns the interval name (e.g. `"15m"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Minute1 => "1m",
            Self::Minute3 => "3m",
            Self::Minute5 => "5m",
            Self::Minute15 => "15m",
            Self::Minute30 => "30m",
            Self::Hour1 => "1h",
            Self::Hour2 => "2h",
            Self::Hour4 => "4h",
            Self::Hour12 => "12h",
            Self::Day1 => "1d",
            Self::Day2 => "2d",
            Self::Day3 => "3d",
        }
    }

    /// Returns all intervals, shortest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Minute1,
            Self::Minute3,
            Self::Minute5,
            Self::Minute15,
            Self::Minute30,
            Self::Hour1,
            Self::Hour2,
            Self::Hour4,
            Self::Hour12,
            Self::Day1,
            Self::Day2,
            Self::Day3,
        ]
    }

    /// Returns the longest interval in the table.
    #[must_use]
    pub const fn longest() -> Self {
        Self::Day3
    }

    /// Returns the start of the most recently completed window at `now_ms`.
    ///
    /// The window is `[start, start + millis)` where `start + millis` is
    /// `now_ms` floored to the interval.
    #[must_use]
    pub const fn last_closed_start(&self, now_ms: i64) -> i64 {
        let ms = self.millis();
        now_ms.div_euclid(ms) * ms - ms
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Interval {
    type Err = IntervalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .find(|interval| interval.as_str() == s)
            .copied()
            .ok_or_else(|| IntervalParseError(s.to_string()))
    }
}

/// Error returned when parsing an unknown interval name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalParseError(String);

impl std::fmt::Display for IntervalParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid interval '{}', expected one of: 1m, 3m, 5m, 15m, 30m, 1h, 2h, 4h, 12h, 1d, 2d, 3d",
            self.0
        )
    }
}

impl std::error::Error for IntervalParseError {}
