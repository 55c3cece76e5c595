//! Local Cache Module
//!
//! Bounded in-process tier combining HashMap storage with FIFO eviction and
//! lazy TTL checks. Stale entries read as absent and stay resident until the
//! sweep or an overwrite reclaims them.
//!
//! Every insertion takes the next sequence number, and `order` maps sequence
//! numbers back to keys. Eviction pops the lowest sequence; removing a key
//! anywhere in the order is one tree removal, so a sweep of `k` stale entries
//! costs `O(k log n)` under the lock.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::cache::{CacheEntry, CacheStats};

/// A resident entry and its insertion sequence number.
#[derive(Debug)]
struct Slot<V> {
    seq: u64,
    entry: CacheEntry<V>,
}

// == Local Cache ==
/// Bounded local tier with FIFO-by-insertion eviction.
#[derive(Debug)]
pub struct LocalCache<V> {
    /// Key-value storage
    entries: HashMap<String, Slot<V>>,
    /// Resident keys by insertion sequence, oldest first
    order: BTreeMap<u64, String>,
    /// Sequence number of the next inserted key
    next_seq: u64,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl<V: Clone> LocalCache<V> {
    // == Constructor ==
    /// Creates a new LocalCache holding at most `max_entries` entries.
    ///
    /// A capacity of zero disables local storage entirely.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
            stats: CacheStats::new(),
            max_entries,
        }
    }

    // == Set ==
    /// Stores a value with the given TTL.
    ///
    /// Overwriting a resident key refreshes its value and freshness window
    /// but keeps its insertion position. Inserting a new key at capacity
    /// first evicts the earliest inserted resident key, which is returned.
    pub fn set(&mut self, key: String, value: V, ttl: Duration) -> Option<String> {
        if self.max_entries == 0 {
            return None;
        }

        if let Some(slot) = self.entries.get_mut(&key) {
            slot.entry.refresh(value, ttl);
            return None;
        }

        let mut evicted = None;
        if self.entries.len() >= self.max_entries {
            if let Some((_, oldest)) = self.order.pop_first() {
                self.entries.remove(&oldest);
                self.stats.record_eviction();
                evicted = Some(oldest);
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.clone());
        self.entries.insert(
            key,
            Slot {
                seq,
                entry: CacheEntry::new(value, ttl),
            },
        );
        self.stats.set_total_entries(self.entries.len());

        evicted
    }

    // == Get ==
    /// Returns the value if a fresh entry exists.
    ///
    /// A stale entry reads as absent and is left in place.
    pub fn get(&mut self, key: &str) -> Option<V> {
        match self.entries.get(key) {
            Some(slot) if slot.entry.is_fresh() => {
                self.stats.record_hit();
                Some(slot.entry.value.clone())
            }
            Some(_) => {
                self.stats.record_expired_read();
                None
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Delete ==
    /// Removes an entry by key, returning whether it was resident.
    pub fn delete(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(slot) => {
                self.order.remove(&slot.seq);
                self.stats.set_total_entries(self.entries.len());
                true
            }
            None => false,
        }
    }

    // == Sweep Expired ==
    /// Removes every stale entry, including keys nobody reads again.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&mut self) -> usize {
        let order = &mut self.order;
        let before = self.entries.len();

        self.entries.retain(|_, slot| {
            if slot.entry.is_stale() {
                order.remove(&slot.seq);
                return false;
            }
            true
        });

        let removed = before - self.entries.len();
        self.stats.record_swept(removed);
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Stats ==
    /// Returns current local-tier statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Whether the key is physically resident, fresh or stale.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// The next key capacity eviction would remove.
    pub fn oldest_key(&self) -> Option<&String> {
        self.order.first_key_value().map(|(_, key)| key)
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
