//! Per-contractor-kind call counters (spec §9's "static singletons" design
//! note; the original's `Stat` singleton, `Stat.hpp`/`Stat.cpp`). Rather than
//! a global singleton, a `Stats` value is owned by the [`crate::search::Search`]
//! that runs a solve and threaded explicitly through the propagator, the way
//! the design note prescribes for every would-be static in this crate.

use std::collections::HashMap;

/// Call counts keyed by contractor kind (`"HC4"`, `"BC4"`, `"Polytope"`, ...).
/// Supplements the aggregate `nodes_processed`/`elapsed` counters spec §4.7
/// already requires on [`crate::search::SearchReport`] with a breakdown of
/// where propagation actually spent its calls.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stats {
    calls: HashMap<&'static str, u64>,
}

impl Stats {
    pub fn new() -> Self {
        Stats::default()
    }

    /// Records one call to a contractor of the given kind.
    pub fn record_call(&mut self, kind: &'static str) {
        *self.calls.entry(kind).or_insert(0) += 1;
    }

    /// Total calls recorded for `kind`, zero if it never ran.
    pub fn calls(&self, kind: &str) -> u64 {
        self.calls.get(kind).copied().unwrap_or(0)
    }

    /// Total calls recorded across every kind.
    pub fn total_calls(&self) -> u64 {
        self.calls.values().sum()
    }

    /// Kinds in descending call-count order, for reporting.
    pub fn by_count_desc(&self) -> Vec<(&'static str, u64)> {
        let mut entries: Vec<_> = self.calls.iter().map(|(&k, &v)| (k, v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    pub fn reset(&mut self) {
        self.calls.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_totals_calls_per_kind() {
        let mut stats = Stats::new();
        stats.record_call("HC4");
        stats.record_call("HC4");
        stats.record_call("BC4");
        assert_eq!(stats.calls("HC4"), 2);
        assert_eq!(stats.calls("BC4"), 1);
        assert_eq!(stats.calls("Newton"), 0);
        assert_eq!(stats.total_calls(), 3);
    }

    #[test]
    fn by_count_desc_breaks_ties_alphabetically() {
        let mut stats = Stats::new();
        stats.record_call("BC4");
        stats.record_call("HC4");
        stats.record_call("HC4");
        assert_eq!(stats.by_count_desc(), vec![("HC4", 2), ("BC4", 1)]);
    }

    #[test]
    fn reset_clears_all_counts() {
        let mut stats = Stats::new();
        stats.record_call("HC4");
        stats.reset();
        assert_eq!(stats.total_calls(), 0);
    }
}
