//! Cache statistics.
//!
//! All counters are atomic and can be read while a delta is being applied.
//! Values only ever increase.
//!
//! ```rust,ignore
//! let stats = reader.stats();
//! println!("Deltas applied: {}", stats.deltas_applied);
//! println!("Queries: {}", stats.queries);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters owned by a cache.
#[derive(Debug, Default)]
pub(crate) struct CacheStats {
    // Write path
    /// Deltas committed.
    deltas_applied: AtomicU64,
    /// Deltas rejected as out of order.
    deltas_rejected: AtomicU64,
    /// Upserts committed, counting each entry of each delta.
    upserts_applied: AtomicU64,
    /// Deletions committed, counting each entry of each delta.
    deletes_applied: AtomicU64,

    // Read path
    /// Changes-since queries served.
    queries: AtomicU64,
    /// Point lookups served.
    lookups: AtomicU64,
}

impl CacheStats {
    /// Creates a zeroed stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a committed delta.
    pub(crate) fn record_commit(&self, upserts: usize, deletes: usize) {
        self.deltas_applied.fetch_add(1, Ordering::Relaxed);
        self.upserts_applied
            .fetch_add(upserts as u64, Ordering::Relaxed);
        self.deletes_applied
            .fetch_add(deletes as u64, Ordering::Relaxed);
    }

    /// Records a rejected delta.
    pub(crate) fn record_rejection(&self) {
        self.deltas_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a changes-since query.
    pub(crate) fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a point lookup.
    pub(crate) fn record_lookup(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            deltas_applied: self.deltas_applied.load(Ordering::Relaxed),
            deltas_rejected: self.deltas_rejected.load(Ordering::Relaxed),
            upserts_applied: self.upserts_applied.load(Ordering::Relaxed),
            deletes_applied: self.deletes_applied.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
            lookups: self.lookups.load(Ordering::Relaxed),
        }
    }
}

/// A copy of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Deltas committed.
    pub deltas_applied: u64,
    /// Deltas rejected as out of order.
    pub deltas_rejected: u64,
    /// Upserts committed.
    pub upserts_applied: u64,
    /// Deletions committed.
    pub deletes_applied: u64,
    /// Changes-since queries served.
    pub queries: u64,
    /// Point lookups served.
    pub lookups: u64,
}
