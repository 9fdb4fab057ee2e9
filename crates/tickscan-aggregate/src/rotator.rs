//! Round-robin symbol batch rotation.

use tracing::debug;

/// Cycles through a symbol universe in fixed-size batches.
///
/// Each call to [`SymbolRotator::next_batch`] returns up to `batch_size`
/// consecutive symbols starting at the cursor, wrapping back to the start of
/// the list once the end has been reached.
#[derive(Debug, Clone)]
pub struct SymbolRotator {
    symbols: Vec<String>,
    batch_size: usize,
    cursor: usize,
}

impl SymbolRotator {
    /// Creates a rotator over `symbols`.
    #[must_use]
    pub const fn new(symbols: Vec<String>, batch_size: usize) -> Self {
        Self {
            symbols,
            batch_size,
            cursor: 0,
        }
    }

    /// Returns the next batch and advances the cursor.
    ///
    /// The batch is `symbols[cursor..min(cursor + batch_size, len)]` and the
    /// cursor becomes that end index modulo the universe length. An empty
    /// universe or a zero batch size yields an empty batch and leaves the
    /// cursor where it is.
    pub fn next_batch(&mut self) -> Vec<String> {
        let len = self.symbols.len();
        if len == 0 || self.batch_size == 0 {
            return Vec::new();
        }

        let start = self.cursor.min(len);
        let end = (start + self.batch_size).min(len);
        let batch = self.symbols[start..end].to_vec();
        self.cursor = end % len;
        batch
    }

    /// Removes symbols for which `keep` returns false.
    ///
    /// The cursor is shifted back by the number of removed symbols that sat
    /// before it, so the rotation continues with the same next symbol.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        let before_cursor = self.symbols[..self.cursor.min(self.symbols.len())]
            .iter()
            .filter(|s| !keep(s.as_str()))
            .count();
        let original = self.symbols.len();
        self.symbols.retain(|s| keep(s.as_str()));

        self.cursor -= before_cursor.min(self.cursor);
        if self.cursor >= self.symbols.len() {
            self.cursor = 0;
        }

        let removed = original - self.symbols.len();
        if removed > 0 {
            debug!(removed, remaining = self.symbols.len(), "pruned rotation universe");
        }
    }

    /// Replaces the universe and resets the cursor.
    pub fn set_universe(&mut self, symbols: Vec<String>) {
        self.symbols = symbols;
        self.cursor = 0;
    }

    /// Returns the current universe.
    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Returns the configured batch size.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Returns the index the next batch starts at.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Returns the number of symbols in the universe.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns true if the universe is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
