//! Buffered multi-interval tick-to-candle aggregation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tickscan_types::{Interval, TickSample, truncate_to_resolution};
use tracing::{debug, trace};

use crate::Candle;

/// How much of a window the buffer must cover before a candle is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Coverage {
    /// Emit a candle whenever the window holds at least one sample.
    #[default]
    Lenient,
    /// Skip a window when the oldest buffered sample is newer than the
    /// window start, so a cold-started buffer never emits a partial candle.
    FullWindow,
}

/// Buffered tick aggregator.
///
/// Keeps one flat, time-ordered sample buffer per symbol and resolves
/// intervals at extraction time, so a sample can feed every interval whose
/// window contains it. All buffer access goes through one lock.
#[derive(Debug, Default)]
pub struct TickAggregator {
    buffers: Mutex<HashMap<String, Vec<TickSample>>>,
    coverage: Coverage,
}

impl TickAggregator {
    /// Creates an aggregator with [`Coverage::Lenient`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an aggregator with the given coverage policy.
    #[must_use]
    pub fn with_coverage(coverage: Coverage) -> Self {
        Self {
            buffers: Mutex::default(),
            coverage,
        }
    }

    /// Returns the coverage policy.
    #[must_use]
    pub const fn coverage(&self) -> Coverage {
        self.coverage
    }

    /// Records a price/volume observation at the current wall-clock time.
    ///
    /// Returns `false` if a sample already exists for this symbol in the
    /// current second; the earlier sample is kept.
    pub fn add_price(&self, symbol: &str, price: f64, volume: f64) -> bool {
        self.add_price_at(symbol, price, volume, Utc::now().timestamp_millis())
    }

    /// Records a price/volume observation at `now_ms`.
    ///
    /// See [`TickAggregator::add_price`].
    pub fn add_price_at(&self, symbol: &str, price: f64, volume: f64, now_ms: i64) -> bool {
        let truncated = truncate_to_resolution(now_ms);
        let mut buffers = self.lock();
        let samples = buffers.entry(symbol.to_string()).or_default();

        if samples.iter().any(|s| s.time_ms == truncated) {
            trace!(symbol, time_ms = truncated, "skipped duplicate tick");
            return false;
        }

        samples.push(TickSample {
            symbol: symbol.to_string(),
            price,
            volume,
            time_ms: truncated,
        });
        trace!(symbol, price, time_ms = truncated, "added tick");
        true
    }

    /// Extracts the most recently completed candle of each requested interval
    /// for every buffered symbol, at the current wall-clock time.
    ///
    /// Unknown interval names are ignored.
    pub fn extract_ohlc<S: AsRef<str>>(&self, intervals: &[S]) -> Vec<Candle> {
        self.extract_ohlc_at(Utc::now().timestamp_millis(), intervals)
    }

    /// Extracts candles as of `now_ms`.
    ///
    /// For each symbol and interval the window is
    /// `[floor(now / ms) * ms - ms, floor(now / ms) * ms)`. Samples are left
    /// in place so overlapping intervals can share them; afterwards samples
    /// older than twice the longest interval are dropped.
    pub fn extract_ohlc_at<S: AsRef<str>>(&self, now_ms: i64, intervals: &[S]) -> Vec<Candle> {
        let intervals: Vec<Interval> = intervals
            .iter()
            .filter_map(|name| name.as_ref().parse().ok())
            .collect();
        self.extract_intervals_at(now_ms, &intervals)
    }

    /// Extracts candles for already-parsed intervals as of `now_ms`.
    pub fn extract_intervals_at(&self, now_ms: i64, intervals: &[Interval]) -> Vec<Candle> {
        let oldest_valid = now_ms - 2 * Interval::longest().millis();
        let mut candles = Vec::new();
        let mut buffers = self.lock();

        for (symbol, samples) in buffers.iter_mut() {
            if samples.is_empty() {
                continue;
            }
            samples.sort_by_key(|s| s.time_ms);

            for &interval in intervals {
                if let Some(candle) = self.candle_for(symbol, samples, interval, now_ms) {
                    candles.push(candle);
                }
            }

            samples.retain(|s| s.time_ms >= oldest_valid);
        }

        buffers.retain(|_, samples| !samples.is_empty());
        candles
    }

    /// Builds the candle for one symbol and interval from sorted samples.
    fn candle_for(
        &self,
        symbol: &str,
        samples: &[TickSample],
        interval: Interval,
        now_ms: i64,
    ) -> Option<Candle> {
        let candle_start = interval.last_closed_start(now_ms);
        let candle_end = candle_start + interval.millis();

        if self.coverage == Coverage::FullWindow
            && samples.first().is_some_and(|s| s.time_ms > candle_start)
        {
            debug!(symbol, %interval, candle_start, "buffer does not cover window yet");
            return None;
        }

        let group: Vec<&TickSample> = samples
            .iter()
            .filter(|s| s.time_ms >= candle_start && s.time_ms < candle_end)
            .collect();

        if group.is_empty() {
            debug!(symbol, %interval, candle_start, candle_end, "no ticks in window");
            return None;
        }

        Candle::from_samples(symbol, interval, candle_start, &group)
    }

    /// Returns the number of buffered samples for a symbol.
    #[must_use]
    pub fn buffered_len(&self, symbol: &str) -> usize {
        self.lock().get(symbol).map_or(0, Vec::len)
    }

    /// Returns the symbols that currently have buffered samples, sorted.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.lock().keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Returns the timestamp of the oldest buffered sample across all symbols.
    #[must_use]
    pub fn oldest_sample_ms(&self) -> Option<i64> {
        self.lock()
            .values()
            .flat_map(|samples| samples.iter().map(|s| s.time_ms))
            .min()
    }

    /// Drops every buffered sample for a symbol.
    ///
    /// Returns the number of samples removed.
    pub fn purge_symbol(&self, symbol: &str) -> usize {
        self.lock().remove(symbol).map_or(0, |samples| samples.len())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<TickSample>>> {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const MAX_MS: i64 = 259_200_000;

    #[test]
    fn test_add_price_dedups_within_second() {
        let agg = TickAggregator::new();
        assert!(agg.add_price_at("BTCUSDT", 100.0, 1.0, 10_000));
        assert!(!agg.add_price_at("BTCUSDT", 101.0, 1.0, 10_400));
        assert!(!agg.add_price_at("BTCUSDT", 102.0, 1.0, 10_999));
        assert!(agg.add_price_at("BTCUSDT", 103.0, 1.0, 11_000));
        assert_eq!(agg.buffered_len("BTCUSDT"), 2);
    }

    #[test]
    fn test_first_sample_in_second_wins() {
        let agg = TickAggregator::new();
        agg.add_price_at("BTCUSDT", 100.0, 1.0, 10_100);
        agg.add_price_at("BTCUSDT", 999.0, 9.0, 10_900);

        let candles = agg.extract_ohlc_at(65_000, &["1m"]);
        assert_eq!(candles.len(), 1);
        assert_relative_eq!(candles[0].open, 100.0);
        assert_relative_eq!(candles[0].high, 100.0);
        assert_eq!(candles[0].trade_count, 1);
    }

    #[test]
    fn test_dedup_is_per_symbol() {
        let agg = TickAggregator::new();
        assert!(agg.add_price_at("BTCUSDT", 100.0, 1.0, 10_000));
        assert!(agg.add_price_at("ETHUSDT", 10.0, 1.0, 10_000));
        assert_eq!(agg.symbols(), vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn test_single_minute_candle() {
        let agg = TickAggregator::new();
        agg.add_price_at("BTCUSDT", 100.0, 1.0, 10_000);
        agg.add_price_at("BTCUSDT", 105.0, 2.0, 30_000);
        agg.add_price_at("BTCUSDT", 102.0, 1.5, 50_000);

        let candles = agg.extract_ohlc_at(65_000, &["1m"]);
        assert_eq!(candles.len(), 1);

        let candle = &candles[0];
        assert_eq!(candle.symbol, "BTCUSDT");
        assert_eq!(candle.interval, Interval::Minute1);
        assert_relative_eq!(candle.open, 100.0);
        assert_relative_eq!(candle.high, 105.0);
        assert_relative_eq!(candle.low, 100.0);
        assert_relative_eq!(candle.close, 102.0);
        assert_relative_eq!(candle.volume, 4.5);
        assert_eq!(candle.trade_count, 3);
        assert_eq!(candle.open_time, 0);
    }

    #[test]
    fn test_out_of_order_ingest_sorted_before_build() {
        let agg = TickAggregator::new();
        agg.add_price_at("BTCUSDT", 102.0, 1.0, 50_000);
        agg.add_price_at("BTCUSDT", 100.0, 1.0, 10_000);

        let candles = agg.extract_ohlc_at(65_000, &["1m"]);
        assert_relative_eq!(candles[0].open, 100.0);
        assert_relative_eq!(candles[0].close, 102.0);
    }

    #[test]
    fn test_window_excludes_current_minute() {
        let agg = TickAggregator::new();
        agg.add_price_at("BTCUSDT", 100.0, 1.0, 10_000);
        agg.add_price_at("BTCUSDT", 200.0, 1.0, 61_000);

        let candles = agg.extract_ohlc_at(65_000, &["1m"]);
        assert_eq!(candles.len(), 1);
        assert_relative_eq!(candles[0].close, 100.0);
    }

    #[test]
    fn test_empty_window_emits_nothing() {
        let agg = TickAggregator::new();
        agg.add_price_at("BTCUSDT", 100.0, 1.0, 61_000);
        assert!(agg.extract_ohlc_at(65_000, &["1m"]).is_empty());
    }

    #[test]
    fn test_full_window_coverage_skips_cold_start() {
        let agg = TickAggregator::with_coverage(Coverage::FullWindow);
        agg.add_price_at("BTCUSDT", 100.0, 1.0, 5_000);
        agg.add_price_at("BTCUSDT", 101.0, 1.0, 30_000);
        assert!(agg.extract_ohlc_at(65_000, &["1m"]).is_empty());

        // Once the buffer reaches back past the window start, the next window emits.
        let candles = agg.extract_ohlc_at(125_000, &["1m"]);
        assert!(candles.is_empty());
        agg.add_price_at("BTCUSDT", 103.0, 1.0, 70_000);
        let candles = agg.extract_ohlc_at(125_000, &["1m"]);
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].open_time, 60_000);
    }

    #[test]
    fn test_full_window_coverage_accepts_sample_at_start() {
        let agg = TickAggregator::with_coverage(Coverage::FullWindow);
        agg.add_price_at("BTCUSDT", 100.0, 1.0, 60_000);
        agg.add_price_at("BTCUSDT", 101.0, 1.0, 90_000);
        let candles = agg.extract_ohlc_at(125_000, &["1m"]);
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].trade_count, 2);
    }

    #[test]
    fn test_unknown_interval_is_ignored() {
        let agg = TickAggregator::new();
        agg.add_price_at("BTCUSDT", 100.0, 1.0, 10_000);
        let candles = agg.extract_ohlc_at(65_000, &["7m", "1m", "bogus"]);
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].interval, Interval::Minute1);
    }

    #[test]
    fn test_multiple_intervals_share_samples() {
        let agg = TickAggregator::new();
        let base = 3_600_000 * 10;
        for i in 0..60 {
            agg.add_price_at("BTCUSDT", 100.0 + f64::from(i), 1.0, base + i64::from(i) * 60_000);
        }
        let now = base + 3_600_000 + 1_000;

        let candles = agg.extract_ohlc_at(now, &["1m", "5m", "1h"]);
        let by_interval = |iv: Interval| candles.iter().find(|c| c.interval == iv).unwrap();

        assert_eq!(by_interval(Interval::Minute1).trade_count, 1);
        assert_eq!(by_interval(Interval::Minute5).trade_count, 5);
        let hour = by_interval(Interval::Hour1);
        assert_eq!(hour.trade_count, 60);
        assert_eq!(hour.open_time, base);
        assert_relative_eq!(hour.open, 100.0);
        assert_relative_eq!(hour.close, 159.0);
        assert_relative_eq!(hour.volume, 60.0);

        // Extraction does not consume samples.
        assert_eq!(agg.buffered_len("BTCUSDT"), 60);
    }

    #[test]
    fn test_extraction_is_idempotent_within_window() {
        let agg = TickAggregator::new();
        agg.add_price_at("BTCUSDT", 100.0, 1.0, 10_000);
        agg.add_price_at("BTCUSDT", 101.0, 1.0, 20_000);

        let first = agg.extract_ohlc_at(65_000, &["1m"]);
        let second = agg.extract_ohlc_at(119_000, &["1m"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_boundary_alignment() {
        let agg = TickAggregator::new();
        let now = 1_700_000_123_456;
        for offset in (0..(4 * 86_400_000)).step_by(600_000) {
            agg.add_price_at("ETHUSDT", 2000.0, 1.0, now - offset);
        }
        let names: Vec<&str> = Interval::all().iter().map(Interval::as_str).collect();
        let candles = agg.extract_ohlc_at(now, names.as_slice());

        assert!(!candles.is_empty());
        for candle in &candles {
            assert_eq!(candle.open_time % candle.interval.millis(), 0);
            assert!(candle.low <= candle.open && candle.low <= candle.close);
            assert!(candle.high >= candle.open && candle.high >= candle.close);
            assert!(candle.low <= candle.high);
        }
    }

    #[test]
    fn test_retention_drops_old_samples() {
        let agg = TickAggregator::new();
        let now = 10 * MAX_MS;
        agg.add_price_at("BTCUSDT", 1.0, 1.0, now - 2 * MAX_MS - 1_000);
        agg.add_price_at("BTCUSDT", 2.0, 1.0, now - 2 * MAX_MS);
        agg.add_price_at("BTCUSDT", 3.0, 1.0, now - 1_000);

        agg.extract_ohlc_at(now, &["1m"]);
        assert_eq!(agg.buffered_len("BTCUSDT"), 2);
        assert!(agg.oldest_sample_ms().unwrap() >= now - 2 * MAX_MS);
    }

    #[test]
    fn test_retention_runs_without_known_intervals() {
        let agg = TickAggregator::new();
        let now = 10 * MAX_MS;
        agg.add_price_at("BTCUSDT", 1.0, 1.0, 1_000);
        agg.add_price_at("ETHUSDT", 1.0, 1.0, now - 5_000);

        let candles = agg.extract_ohlc_at(now, &["nope"]);
        assert!(candles.is_empty());
        assert_eq!(agg.buffered_len("BTCUSDT"), 0);
        assert_eq!(agg.symbols(), vec!["ETHUSDT"]);
    }

    #[test]
    fn test_purge_symbol() {
        let agg = TickAggregator::new();
        agg.add_price_at("BTCUSDT", 1.0, 1.0, 1_000);
        agg.add_price_at("BTCUSDT", 1.0, 1.0, 2_000);
        assert_eq!(agg.purge_symbol("BTCUSDT"), 2);
        assert_eq!(agg.purge_symbol("BTCUSDT"), 0);
        assert!(agg.symbols().is_empty());
    }
}
