//! Absence tracking for symbols that stop appearing in snapshots.

use std::collections::HashMap;

/// Counts consecutive cycles in which a requested symbol was missing.
///
/// A symbol seen in a snapshot has its count reset. Once a count reaches the
/// threshold the symbol is reported exactly once and forgotten.
#[derive(Debug, Clone, Default)]
pub struct AbsenceTracker {
    threshold: u32,
    misses: HashMap<String, u32>,
}

impl AbsenceTracker {
    /// Creates a tracker; a threshold of zero is treated as one.
    #[must_use]
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            misses: HashMap::new(),
        }
    }

    /// Returns the miss count that triggers blacklisting.
    #[must_use]
    pub const fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Records that `symbol` was present.
    pub fn seen(&mut self, symbol: &str) {
        self.misses.remove(symbol);
    }

    /// Records that `symbol` was missing.
    ///
    /// Returns true when this miss reaches the threshold.
    pub fn missed(&mut self, symbol: &str) -> bool {
        let count = self.misses.entry(symbol.to_string()).or_insert(0);
        *count += 1;
        if *count >= self.threshold {
            self.misses.remove(symbol);
            return true;
        }
        false
    }

    /// Returns the current miss count for `symbol`.
    #[must_use]
    pub fn misses(&self, symbol: &str) -> u32 {
        self.misses.get(symbol).copied().unwrap_or(0)
    }
}
