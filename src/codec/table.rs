// Fibonacci reference table.
//
// The table is the universe of reference points ("pillars"): every value is
// encoded relative to the nearest entry. Built once, never mutated.

use thiserror::Error;

/// Default number of table entries. `table[92]` is the largest reference.
pub const DEFAULT_TABLE_LEN: usize = 93;

/// Smallest usable table (`[0, 1]`).
pub const MIN_TABLE_LEN: usize = 2;

/// Largest table whose entries all fit in a `u64` (`table[93]` = F(93)).
pub const MAX_TABLE_LEN: usize = 94;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("invalid table length {0} (expected {min}..={max})", min = MIN_TABLE_LEN, max = MAX_TABLE_LEN)]
    InvalidLength(usize),
}

/// Ordered Fibonacci numbers `0, 1, 1, 2, 3, 5, ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTable {
    entries: Vec<u64>,
}

impl ReferenceTable {
    /// Build the first `len` Fibonacci numbers.
    pub fn new(len: usize) -> Result<Self, TableError> {
        if !(MIN_TABLE_LEN..=MAX_TABLE_LEN).contains(&len) {
            return Err(TableError::InvalidLength(len));
        }
        Ok(Self {
            entries: fibonacci(len),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; a table has at least two entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<u64> {
        self.entries.get(index).copied()
    }

    /// Largest reference. Values above it are clamped to this entry.
    #[inline]
    pub fn last(&self) -> u64 {
        self.entries[self.entries.len() - 1]
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.entries
    }

    /// Index of the reference nearest to `n`.
    ///
    /// Distance ties resolve to the lower reference, and values past the
    /// end resolve to the last index. Both rules are part of the wire format.
    pub fn nearest(&self, n: u64) -> usize {
        // Leftmost position with entries[pos] >= n.
        let pos = self.entries.partition_point(|&f| f < n);
        if pos == 0 {
            0
        } else if pos == self.entries.len() {
            pos - 1
        } else {
            let above = self.entries[pos] - n;
            let below = n - self.entries[pos - 1];
            if above < below { pos } else { pos - 1 }
        }
    }
}

impl Default for ReferenceTable {
    fn default() -> Self {
        Self {
            entries: fibonacci(DEFAULT_TABLE_LEN),
        }
    }
}

/// First `len` Fibonacci numbers; `len` is already validated.
fn fibonacci(len: usize) -> Vec<u64> {
    let mut entries = Vec::with_capacity(len);
    entries.extend_from_slice(&[0, 1]);
    for i in 2..len {
        entries.push(entries[i - 1] + entries[i - 2]);
    }
    entries
}
