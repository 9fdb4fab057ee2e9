//! Per-cycle counters.

use std::time::Duration;
use tickscan_sink::SaveReport;

/// What one scanner cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Tickers in the exchange snapshot.
    pub snapshot_len: usize,
    /// Symbols in this cycle's batch.
    pub batch_len: usize,
    /// Samples added to the aggregator.
    pub samples_added: usize,
    /// Samples rejected as same-second duplicates.
    pub samples_duplicate: usize,
    /// Tickers skipped because price or volume did not parse.
    pub samples_malformed: usize,
    /// Messages offered to the stream publisher and accepted.
    pub streamed: usize,
    /// Messages the stream publisher dropped.
    pub stream_dropped: usize,
    /// Batch symbols missing from the snapshot.
    pub missing: usize,
    /// Symbols blacklisted this cycle.
    pub blacklisted: Vec<String>,
    /// Intervals extracted this cycle.
    pub intervals_due: usize,
    /// Candles produced.
    pub candles: usize,
    /// Store outcome, when candles were saved successfully.
    pub saved: Option<SaveReport>,
    /// Wall time of the cycle.
    pub elapsed: Duration,
}

impl CycleStats {
    /// Returns true if the cycle fed at least one sample to the aggregator.
    #[must_use]
    pub const fn made_progress(&self) -> bool {
        self.samples_added > 0
    }

    /// Returns the number of candles the store actually inserted.
    #[must_use]
    pub fn inserted(&self) -> u64 {
        self.saved.map_or(0, |report| report.inserted)
    }
}
