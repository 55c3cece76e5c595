//! Cache Statistics Module
//!
//! Tracks local-tier metrics including hits, misses, evictions and sweeps.

use serde::Serialize;

// == Cache Stats ==
/// Tracks local-tier performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Reads answered by a fresh local entry
    pub hits: u64,
    /// Reads that found nothing fresh locally
    pub misses: u64,
    /// Reads that found an entry present but stale
    pub expired_reads: u64,
    /// Entries removed by capacity pressure
    pub evictions: u64,
    /// Entries removed by the periodic sweep
    pub swept: u64,
    /// Current number of entries in the local tier
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// A stale read also counts as a miss.
    pub fn record_expired_read(&mut self) {
        self.expired_reads += 1;
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_swept(&mut self, count: usize) {
        self.swept += count as u64;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
