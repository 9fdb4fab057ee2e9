//! Boundary tracking for candle extraction.

use std::collections::HashMap;
use tickscan_types::Interval;

/// Decides which intervals have closed a window since they were last extracted.
///
/// The first observation of an interval only records the current boundary:
/// the window that closed before the scanner started was never fully sampled.
#[derive(Debug, Clone, Default)]
pub struct IntervalSchedule {
    intervals: Vec<Interval>,
    last_closed: HashMap<Interval, i64>,
}

impl IntervalSchedule {
    /// Creates a schedule for the given intervals.
    #[must_use]
    pub fn new(intervals: Vec<Interval>) -> Self {
        Self {
            intervals,
            last_closed: HashMap::new(),
        }
    }

    /// Returns the scheduled intervals.
    #[must_use]
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Returns the intervals with a newly closed window at `now_ms` and marks
    /// them as extracted.
    pub fn due(&mut self, now_ms: i64) -> Vec<Interval> {
        let mut due = Vec::new();
        for &interval in &self.intervals {
            let closed = interval.last_closed_start(now_ms);
            match self.last_closed.insert(interval, closed) {
                Some(previous) if closed > previous => due.push(interval),
                Some(previous) => {
                    self.last_closed.insert(interval, previous.max(closed));
                }
                None => {}
            }
        }
        due
    }
}
