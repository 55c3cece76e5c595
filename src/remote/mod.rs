//! Remote Store Module
//!
//! The shared, authoritative tier. [`RemoteStore`] is the contract the cache
//! manager consumes; [`RedisStore`] talks to a real Redis server and
//! [`MemoryStore`] keeps the same contract in process.

mod memory;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;

use crate::cache::MAX_TTL;
use crate::error::Result;

pub use self::memory::{glob_match, MemoryStore};
pub use self::redis_store::{RedisStore, RedisStoreConfig};

// == Remote Store Contract ==
/// Shared key-value store with native TTL.
///
/// Payloads are opaque text. Every call is a suspension point and may fail;
/// callers decide how to degrade.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch a payload, `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a payload that the store expires after `ttl`.
    async fn set(&self, key: &str, payload: String, ttl: Duration) -> Result<()>;

    /// Delete one key, returning how many keys were removed.
    async fn delete(&self, key: &str) -> Result<u64>;

    /// Delete a batch of keys in one round trip.
    async fn delete_many(&self, keys: &[String]) -> Result<u64>;

    /// Fetch several payloads, same length and order as `keys`.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    /// Write several `(key, payload, ttl)` records in one pipelined round trip.
    async fn mset(&self, entries: Vec<(String, String, Duration)>) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Atomically add `by` to an integer record, creating it at zero.
    async fn increment(&self, key: &str, by: i64) -> Result<i64>;

    /// Reset a key's TTL, returning whether the key existed.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// List keys matching a glob pattern (`*`, `?`, `[...]`).
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    async fn ping(&self) -> Result<()>;

    /// Release the connection. Later calls fail with a connection error.
    async fn close(&self);

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

/// Millisecond TTL as the store expects it, between 1 ms and [`MAX_TTL`].
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    let millis = ttl.min(MAX_TTL).as_millis();
    u64::try_from(millis).unwrap_or(u64::MAX).max(1)
}
