//! Meta-index operation counters.
//!
//! All counters are plain atomics updated with `Relaxed` ordering; a
//! snapshot is a point-in-time read, not a consistent cut.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters for one meta-index instance.
#[derive(Debug, Default)]
pub struct IndexMetrics {
    /// Partitions merged (including replacements).
    pub merges_total: AtomicU64,
    /// Partitions erased.
    pub erases_total: AtomicU64,
    /// Lookup requests served.
    pub lookups_total: AtomicU64,
    /// Candidate partition ids returned across all lookups.
    pub candidates_returned_total: AtomicU64,
}

impl IndexMetrics {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            merges_total: AtomicU64::new(0),
            erases_total: AtomicU64::new(0),
            lookups_total: AtomicU64::new(0),
            candidates_returned_total: AtomicU64::new(0),
        }
    }

    pub fn record_merge(&self) {
        self.merges_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_erase(&self) {
        self.erases_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lookup(&self, candidates: usize) {
        self.lookups_total.fetch_add(1, Ordering::Relaxed);
        self.candidates_returned_total
            .fetch_add(candidates as u64, Ordering::Relaxed);
    }

    /// Read a point-in-time snapshot.
    #[must_use]
    pub fn snapshot(&self) -> IndexMetricsSnapshot {
        IndexMetricsSnapshot {
            merges_total: self.merges_total.load(Ordering::Relaxed),
            erases_total: self.erases_total.load(Ordering::Relaxed),
            lookups_total: self.lookups_total.load(Ordering::Relaxed),
            candidates_returned_total: self.candidates_returned_total.load(Ordering::Relaxed),
        }
    }
}

/// Serializable snapshot of [`IndexMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexMetricsSnapshot {
    pub merges_total: u64,
    pub erases_total: u64,
    pub lookups_total: u64,
    pub candidates_returned_total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = IndexMetrics::new();
        metrics.record_merge();
        metrics.record_merge();
        metrics.record_erase();
        metrics.record_lookup(3);
        metrics.record_lookup(0);

        let snap = metrics.snapshot();
        assert_eq!(snap.merges_total, 2);
        assert_eq!(snap.erases_total, 1);
        assert_eq!(snap.lookups_total, 2);
        assert_eq!(snap.candidates_returned_total, 3);
    }

    #[test]
    fn snapshot_serializes() {
        let metrics = IndexMetrics::new();
        metrics.record_lookup(1);
        let json = serde_json::to_string(&metrics.snapshot()).unwrap();
        assert!(json.contains("\"lookups_total\":1"));
    }
}
