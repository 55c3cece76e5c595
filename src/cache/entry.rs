//! Cache Entry Module
//!
//! Defines the structure for individual local-tier entries with TTL support.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A single local-tier entry with its write time and TTL.
///
/// Timestamps come from the tokio clock, so a paused test runtime can move
/// entries from fresh to stale with `tokio::time::advance`.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// When the entry was last written
    pub written_at: Instant,
    /// How long the entry stays fresh after `written_at`
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new fresh entry written now.
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            written_at: Instant::now(),
            ttl,
        }
    }

    // == Is Fresh ==
    /// An entry is fresh while `now - written_at < ttl`.
    ///
    /// Boundary condition: once the TTL has fully elapsed the entry is stale,
    /// so a zero TTL produces an entry that is never fresh.
    pub fn is_fresh(&self) -> bool {
        self.written_at.elapsed() < self.ttl
    }

    /// Inverse of [`CacheEntry::is_fresh`].
    pub fn is_stale(&self) -> bool {
        !self.is_fresh()
    }

    // == Time To Live ==
    /// Remaining freshness window, zero once stale.
    pub fn ttl_remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.written_at.elapsed())
    }

    /// Overwrites the value and restarts the freshness window.
    pub fn refresh(&mut self, value: V, ttl: Duration) {
        self.value = value;
        self.ttl = ttl;
        self.written_at = Instant::now();
    }
}
