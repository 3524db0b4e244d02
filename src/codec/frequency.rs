//! Symbol frequency counting.
//!
//! Counting is the first parallel phase: every worker counts the symbols in its
//! own byte range and the coordinator merges the partial maps. Merging sums
//! counts per symbol, so the merged map is independent of how the content was
//! partitioned.

use std::collections::BTreeMap;
use std::ops::Range;

/// One raw byte value of the input alphabet.
pub type Symbol = u8;

/// Mapping from symbol to occurrence count.
///
/// Symbols are kept in ascending order, which is the order the tree builder
/// seeds its leaves in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyMap {
    counts: BTreeMap<Symbol, u64>,
}

impl FrequencyMap {
    /// Creates an empty frequency map
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts every symbol in `content`.
    pub fn count(content: &[u8]) -> Self {
        let mut histogram = [0u64; 256];
        for &symbol in content {
            histogram[symbol as usize] += 1;
        }

        let counts = histogram
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .map(|(symbol, &count)| (symbol as Symbol, count))
            .collect();
        Self { counts }
    }

    /// Counts the symbols in `content[range]`.
    ///
    /// Out-of-bounds ranges are clamped to the content; an empty range yields
    /// an empty map.
    pub fn count_range(content: &[u8], range: Range<usize>) -> Self {
        let end = range.end.min(content.len());
        let start = range.start.min(end);
        Self::count(&content[start..end])
    }

    /// Builds a map from explicit `(symbol, count)` pairs. Zero counts are dropped
    /// and repeated symbols are summed.
    pub fn from_counts<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Symbol, u64)>,
    {
        let mut map = Self::new();
        for (symbol, count) in pairs {
            map.add(symbol, count);
        }
        map
    }

    /// Adds `count` occurrences of `symbol`.
    pub fn add(&mut self, symbol: Symbol, count: u64) {
        if count > 0 {
            let slot = self.counts.entry(symbol).or_insert(0);
            *slot = slot.saturating_add(count);
        }
    }

    /// Sums another partial map into this one.
    pub fn merge(&mut self, other: &FrequencyMap) {
        for (&symbol, &count) in &other.counts {
            self.add(symbol, count);
        }
    }

    /// Merges a sequence of partial maps into one.
    pub fn merged<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a FrequencyMap>,
    {
        parts.into_iter().fold(Self::new(), |mut acc, part| {
            acc.merge(part);
            acc
        })
    }

    /// Count for `symbol`, zero when absent
    pub fn get(&self, symbol: Symbol) -> u64 {
        self.counts.get(&symbol).copied().unwrap_or(0)
    }

    /// Number of distinct symbols
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total number of symbols counted, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.counts
            .values()
            .fold(0u64, |acc, &count| acc.saturating_add(count))
    }

    /// Total number of symbols counted, `None` if the sum overflows `u64`.
    pub fn checked_total(&self) -> Option<u64> {
        self.counts
            .values()
            .try_fold(0u64, |acc, &count| acc.checked_add(count))
    }

    /// Iterates `(symbol, count)` in ascending symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, u64)> + '_ {
        self.counts.iter().map(|(&symbol, &count)| (symbol, count))
    }
}
