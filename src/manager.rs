//! Cache Manager
//!
//! Orchestrates the local and remote tiers behind one fail-open API.
//!
//! Reads try the local tier first and fall through to the remote store,
//! repopulating the local tier on a remote hit. Writes go to the remote store
//! first and are mirrored locally only once the remote write succeeded, so
//! the local tier never holds a value the authoritative tier rejected.
//!
//! No operation returns an infrastructure error. Connection, protocol and
//! serialization failures are logged with the key and operation, and the
//! call degrades to its safe default: `None`, `false`, `0`, or a no-op.
//! [`CacheManager::lookup`] keeps failures distinguishable from misses for
//! callers that need to tell them apart.
//!
//! Batch operations (`mget`, `mset`) and `flush_pattern` only talk to the
//! remote store. Entries written by `mset` become visible locally after the
//! next single-key `get`, and entries flushed remotely stay readable locally
//! until their local TTL runs out or they are overwritten.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, LocalCache};
use crate::codec;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::remote::{RedisStore, RedisStoreConfig, RemoteStore};
use crate::tasks::{spawn_sweep_task, SweepHandle};

// == Lookup ==
/// Outcome of a read, before fail-open collapses it to an `Option`.
#[derive(Debug)]
pub enum Lookup<T> {
    /// A value was found and decoded
    Hit(T),
    /// Neither tier holds the key
    Miss,
    /// The read could not be completed
    Failed(CacheError),
}

impl<T> Lookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Lookup::Failed(_))
    }

    /// Collapses misses and failures to `None`.
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss | Lookup::Failed(_) => None,
        }
    }
}

// == Manager Options ==
/// Tuning of the manager independent of the remote backend.
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// TTL used when a call does not pass one, and for read repopulation
    pub default_ttl: Duration,
    /// Local tier capacity
    pub local_max_entries: usize,
    /// Local sweep interval; zero disables the sweep task
    pub sweep_interval: Duration,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ManagerOptions {
    fn from(config: &Config) -> Self {
        Self {
            default_ttl: config.default_ttl(),
            local_max_entries: config.local_max_entries,
            sweep_interval: config.sweep_interval(),
        }
    }
}

// == Cache Manager ==
/// Two-tier cache manager.
///
/// Built once at startup and shared by reference (usually in an `Arc`).
/// Values are any `Serialize`/`DeserializeOwned` type; both tiers hold the
/// encoded payload.
pub struct CacheManager {
    remote: Arc<dyn RemoteStore>,
    local: Arc<Mutex<LocalCache<String>>>,
    default_ttl: Duration,
    sweeper: Mutex<Option<SweepHandle>>,
}

impl CacheManager {
    /// Connects to Redis as configured and starts the local sweep.
    ///
    /// Fails only on an unusable Redis URL; an unreachable server is retried
    /// on demand.
    pub async fn connect(config: &Config) -> Result<Self> {
        let store = RedisStore::connect(RedisStoreConfig::from(config)).await?;
        Ok(Self::with_store(Arc::new(store), ManagerOptions::from(config)))
    }

    /// Builds a manager over any remote store and starts the local sweep.
    ///
    /// Must be called from within a tokio runtime unless the sweep is
    /// disabled.
    pub fn with_store(remote: Arc<dyn RemoteStore>, options: ManagerOptions) -> Self {
        let local = Arc::new(Mutex::new(LocalCache::new(options.local_max_entries)));

        let sweeper = if options.sweep_interval.is_zero() {
            None
        } else {
            Some(spawn_sweep_task(local.clone(), options.sweep_interval))
        };

        info!(
            backend = remote.name(),
            local_max_entries = options.local_max_entries,
            default_ttl_secs = options.default_ttl.as_secs(),
            "cache manager started"
        );

        Self {
            remote,
            local,
            default_ttl: options.default_ttl,
            sweeper: Mutex::new(sweeper),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Reads ==
    /// Reads a value, local tier first.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_with(key, true).await
    }

    /// Reads a value, optionally bypassing the local tier.
    pub async fn get_with<T: DeserializeOwned>(&self, key: &str, use_local: bool) -> Option<T> {
        match self.lookup(key, use_local).await {
            Lookup::Failed(e) => {
                warn!(key, op = "get", error = %e, "cache read failed, treating as miss");
                None
            }
            outcome => outcome.into_option(),
        }
    }

    /// Reads a value and reports misses and failures separately.
    ///
    /// A fresh local entry answers without a remote round trip. A remote hit
    /// is copied into the local tier with the default TTL when `use_local`.
    pub async fn lookup<T: DeserializeOwned>(&self, key: &str, use_local: bool) -> Lookup<T> {
        if use_local {
            let cached = self.local.lock().get(key);
            if let Some(payload) = cached {
                debug!(key, "local hit");
                return match codec::decode(&payload) {
                    Ok(value) => Lookup::Hit(value),
                    Err(e) => Lookup::Failed(e),
                };
            }
        }

        let payload = match self.remote.get(key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!(key, "remote miss");
                return Lookup::Miss;
            }
            Err(e) => return Lookup::Failed(e),
        };

        match codec::decode(&payload) {
            Ok(value) => {
                if use_local {
                    self.local
                        .lock()
                        .set(key.to_string(), payload, self.default_ttl);
                }
                Lookup::Hit(value)
            }
            Err(e) => Lookup::Failed(e),
        }
    }

    // == Writes ==
    /// Writes a value with the default TTL to both tiers.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        self.set_with(key, value, None, true).await
    }

    /// Writes a value; `ttl` defaults to the manager default.
    ///
    /// The local tier is written only after the remote write succeeded.
    pub async fn set_with<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        use_local: bool,
    ) {
        if let Err(e) = self.try_set(key, value, ttl, use_local).await {
            warn!(key, op = "set", error = %e, "cache write failed, local tier untouched");
        }
    }

    pub(crate) async fn try_set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        use_local: bool,
    ) -> Result<()> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let payload = codec::encode(value)?;

        self.remote.set(key, payload.clone(), ttl).await?;

        if use_local {
            if let Some(evicted) = self.local.lock().set(key.to_string(), payload, ttl) {
                debug!(key, evicted = %evicted, "local tier at capacity, evicted oldest");
            }
        }
        Ok(())
    }

    /// Deletes a key from both tiers.
    pub async fn del(&self, key: &str) {
        self.local.lock().delete(key);
        if let Err(e) = self.remote.delete(key).await {
            warn!(key, op = "del", error = %e, "remote delete failed");
        }
    }

    // == Batch ==
    /// Reads several keys from the remote store only.
    ///
    /// The result has the same length and order as `keys`. A failed batch
    /// yields all `None`; an entry that fails to decode yields `None` alone.
    pub async fn mget<K, T>(&self, keys: &[K]) -> Vec<Option<T>>
    where
        K: AsRef<str>,
        T: DeserializeOwned,
    {
        if keys.is_empty() {
            return Vec::new();
        }
        let keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();

        let payloads = match self.remote.mget(&keys).await {
            Ok(payloads) if payloads.len() == keys.len() => payloads,
            Ok(payloads) => {
                warn!(
                    op = "mget",
                    requested = keys.len(),
                    returned = payloads.len(),
                    "batch read returned wrong length"
                );
                return keys.iter().map(|_| None).collect();
            }
            Err(e) => {
                warn!(op = "mget", count = keys.len(), error = %e, "batch read failed");
                return keys.iter().map(|_| None).collect();
            }
        };

        keys.iter()
            .zip(payloads)
            .map(|(key, payload)| {
                let payload = payload?;
                match codec::decode(&payload) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!(key = %key, op = "mget", error = %e, "batch entry undecodable");
                        None
                    }
                }
            })
            .collect()
    }

    /// Writes several `(key, value, ttl)` entries in one pipelined round trip.
    ///
    /// The local tier is not written. A `None` TTL means the default.
    pub async fn mset<K, T>(&self, entries: &[(K, T, Option<Duration>)])
    where
        K: AsRef<str>,
        T: Serialize,
    {
        if entries.is_empty() {
            return;
        }
        if let Err(e) = self.try_mset(entries).await {
            warn!(op = "mset", count = entries.len(), error = %e, "batch write failed");
        }
    }

    async fn try_mset<K, T>(&self, entries: &[(K, T, Option<Duration>)]) -> Result<()>
    where
        K: AsRef<str>,
        T: Serialize,
    {
        let encoded = entries
            .iter()
            .map(|(key, value, ttl)| {
                Ok((
                    key.as_ref().to_string(),
                    codec::encode(value)?,
                    ttl.unwrap_or(self.default_ttl),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        self.remote.mset(encoded).await
    }

    // == Remote-only operations ==
    /// Whether the remote store holds the key; `false` on error.
    pub async fn exists(&self, key: &str) -> bool {
        match self.remote.exists(key).await {
            Ok(found) => found,
            Err(e) => {
                warn!(key, op = "exists", error = %e, "existence check failed");
                false
            }
        }
    }

    /// Atomically increments a remote counter by one.
    pub async fn increment(&self, key: &str) -> i64 {
        self.increment_by(key, 1).await
    }

    /// Atomically adds `by` to a remote counter.
    ///
    /// Returns `0` on failure, which callers cannot tell apart from a counter
    /// that really is zero.
    pub async fn increment_by(&self, key: &str, by: i64) -> i64 {
        match self.remote.increment(key, by).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, op = "increment", error = %e, "increment failed, returning 0");
                0
            }
        }
    }

    /// Resets the remote TTL of a key.
    ///
    /// Entries already cached locally keep their own freshness window.
    pub async fn expire(&self, key: &str, ttl: Duration) {
        match self.remote.expire(key, ttl).await {
            Ok(true) => {}
            Ok(false) => debug!(key, "expire on missing key"),
            Err(e) => warn!(key, op = "expire", error = %e, "expire failed"),
        }
    }

    /// Deletes every remote key matching `pattern` in one batch.
    ///
    /// Returns the number of keys deleted, `0` on failure. Costs a full key
    /// listing; meant for maintenance paths. The local tier is not touched.
    pub async fn flush_pattern(&self, pattern: &str) -> u64 {
        match self.try_flush_pattern(pattern).await {
            Ok(deleted) => {
                info!(pattern, deleted, "flushed keys by pattern");
                deleted
            }
            Err(e) => {
                warn!(pattern, op = "flush_pattern", error = %e, "pattern flush failed");
                0
            }
        }
    }

    async fn try_flush_pattern(&self, pattern: &str) -> Result<u64> {
        let keys = self.remote.keys(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        self.remote.delete_many(&keys).await
    }

    // == Warming ==
    /// Computes and stores a value with the default TTL if the key is absent.
    pub async fn warm_cache<T, F, Fut>(&self, key: &str, fetcher: F)
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.warm_cache_with_ttl(key, fetcher, None).await
    }

    /// Computes and stores a value if the remote store reports the key absent.
    ///
    /// Not guarded by a lock: concurrent callers racing on the same absent
    /// key may each run `fetcher` and overwrite each other with equivalent
    /// values.
    pub async fn warm_cache_with_ttl<T, F, Fut>(&self, key: &str, fetcher: F, ttl: Option<Duration>)
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if self.exists(key).await {
            debug!(key, "warm skipped, key present");
            return;
        }
        let value = fetcher().await;
        self.set_with(key, &value, ttl, true).await;
    }

    // == Lifecycle ==
    /// Pings the remote store; `false` on failure.
    pub async fn health_check(&self) -> bool {
        match self.remote.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(op = "health_check", error = %e, "remote store unhealthy");
                false
            }
        }
    }

    /// Stops the local sweep and closes the remote connection.
    ///
    /// Safe to call more than once. Reads and writes after disconnect
    /// degrade like any other remote failure.
    pub async fn disconnect(&self) {
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
            debug!("local sweep stopped");
        }
        self.remote.close().await;
        info!("cache manager disconnected");
    }

    /// Local tier statistics.
    pub fn local_stats(&self) -> CacheStats {
        self.local.lock().stats()
    }

    /// Number of entries physically resident in the local tier.
    pub fn local_len(&self) -> usize {
        self.local.lock().len()
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .is_some_and(|sweeper| !sweeper.is_finished())
    }
}

impl Drop for CacheManager {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.get_mut().take() {
            sweeper.abort();
        }
    }
}
