//! Candle persistence abstraction.

use async_trait::async_trait;
use tickscan_aggregate::Candle;

use crate::SinkError;

/// Outcome of a save call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Rows submitted.
    pub attempted: u64,
    /// Rows actually written; duplicates are not counted.
    pub inserted: u64,
}

impl SaveReport {
    /// Returns the number of rows skipped as duplicates.
    #[must_use]
    pub const fn duplicates(&self) -> u64 {
        self.attempted.saturating_sub(self.inserted)
    }

    /// Adds another report into this one.
    pub const fn merge(&mut self, other: Self) {
        self.attempted += other.attempted;
        self.inserted += other.inserted;
    }
}

/// Destination for completed candles.
///
/// Implementations must ignore candles whose `(symbol, interval, open_time)`
/// already exists rather than update them.
#[async_trait]
pub trait CandleStore: Send + Sync {
    /// Saves candles tagged with the producing scanner instance.
    async fn save(&self, candles: &[Candle], instance: &str) -> Result<SaveReport, SinkError>;
}
