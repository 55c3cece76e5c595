//! Redis-backed remote store
//!
//! One multiplexed tokio connection, opened eagerly when possible and
//! re-established lazily after connection failures. Every key is written
//! under the configured prefix; `keys` strips it back off.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, ConnectionInfo, RedisResult};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{ttl_millis, RemoteStore};
use crate::config::Config;
use crate::error::{CacheError, Result};

/// Connection settings for [`RedisStore`].
#[derive(Clone)]
pub struct RedisStoreConfig {
    /// Server address, database and credentials
    pub connection: ConnectionInfo,
    /// Prefix applied to every key
    pub key_prefix: String,
    /// Delay between retries of a request that failed to connect
    pub retry_delay: Duration,
    /// Retries per request after the first attempt
    pub max_retries: u32,
}

impl From<&Config> for RedisStoreConfig {
    fn from(config: &Config) -> Self {
        Self {
            connection: config.connection_info(),
            key_prefix: config.key_prefix.clone(),
            retry_delay: config.retry_delay(),
            max_retries: config.max_retries,
        }
    }
}

impl fmt::Debug for RedisStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStoreConfig")
            .field("addr", &self.connection.addr.to_string())
            .field("db", &self.connection.redis.db)
            .field("key_prefix", &self.key_prefix)
            .field("retry_delay", &self.retry_delay)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

// == Redis Store ==
/// Remote store backed by a Redis server.
pub struct RedisStore {
    client: Client,
    conn: Mutex<Option<MultiplexedConnection>>,
    closed: AtomicBool,
    config: RedisStoreConfig,
}

impl RedisStore {
    /// Creates the store and tries to connect.
    ///
    /// Only unusable connection settings are an error. An unreachable server
    /// is logged and the connection is attempted again on the first request.
    pub async fn connect(config: RedisStoreConfig) -> Result<Self> {
        let client = Client::open(config.connection.clone()).map_err(|e| {
            CacheError::Connection(format!("invalid redis connection settings: {}", e))
        })?;

        let conn = match client.get_multiplexed_async_connection().await {
            Ok(conn) => {
                info!(addr = %config.connection.addr, prefix = %config.key_prefix, "connected to redis");
                Some(conn)
            }
            Err(e) => {
                warn!(addr = %config.connection.addr, error = %e, "redis unreachable at startup, will retry on demand");
                None
            }
        };

        Ok(Self {
            client,
            conn: Mutex::new(conn),
            closed: AtomicBool::new(false),
            config,
        })
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    fn prefixed_all(&self, keys: &[String]) -> Vec<String> {
        keys.iter().map(|k| self.prefixed(k)).collect()
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CacheError::Connection("connection closed".to_string()));
        }

        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self.client.get_multiplexed_async_connection().await?;
        debug!("redis connection re-established");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    /// Runs one request, retrying connection failures with a fixed delay.
    async fn run<T, F, Fut>(&self, op: &'static str, request: F) -> Result<T>
    where
        F: Fn(MultiplexedConnection) -> Fut + Send + Sync,
        Fut: Future<Output = RedisResult<T>> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            let outcome = match self.connection().await {
                Ok(conn) => request(conn).await.map_err(CacheError::from),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    debug!(op, attempt, error = %e, "retrying redis request");
                    self.conn.lock().await.take();
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => {
                    if e.is_retryable() {
                        self.conn.lock().await.take();
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// Escapes glob metacharacters so a literal prefix matches only itself.
fn escape_glob(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = self.prefixed(key);
        self.run("get", |mut conn| {
            let key = key.clone();
            async move {
                let payload: Option<String> = conn.get(key).await?;
                Ok(payload)
            }
        })
        .await
    }

    async fn set(&self, key: &str, payload: String, ttl: Duration) -> Result<()> {
        let key = self.prefixed(key);
        let millis = ttl_millis(ttl);
        self.run("set", |mut conn| {
            let key = key.clone();
            let payload = payload.clone();
            async move {
                let _: () = conn.pset_ex(key, payload, millis).await?;
                Ok(())
            }
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<u64> {
        let key = self.prefixed(key);
        self.run("del", |mut conn| {
            let key = key.clone();
            async move {
                let removed: u64 = conn.del(key).await?;
                Ok(removed)
            }
        })
        .await
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let keys = self.prefixed_all(keys);
        self.run("del", |mut conn| {
            let keys = keys.clone();
            async move {
                let removed: u64 = conn.del(keys).await?;
                Ok(removed)
            }
        })
        .await
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let keys = self.prefixed_all(keys);
        self.run("mget", |mut conn| {
            let keys = keys.clone();
            async move {
                let payloads: Vec<Option<String>> =
                    redis::cmd("MGET").arg(&keys).query_async(&mut conn).await?;
                Ok(payloads)
            }
        })
        .await
    }

    async fn mset(&self, entries: Vec<(String, String, Duration)>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, payload, ttl) in &entries {
            pipe.pset_ex(self.prefixed(key), payload, ttl_millis(*ttl))
                .ignore();
        }
        self.run("mset", |mut conn| {
            let pipe = pipe.clone();
            async move {
                let _: () = pipe.query_async(&mut conn).await?;
                Ok(())
            }
        })
        .await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let key = self.prefixed(key);
        self.run("exists", |mut conn| {
            let key = key.clone();
            async move {
                let found: bool = conn.exists(key).await?;
                Ok(found)
            }
        })
        .await
    }

    async fn increment(&self, key: &str, by: i64) -> Result<i64> {
        let key = self.prefixed(key);
        self.run("incrby", |mut conn| {
            let key = key.clone();
            async move {
                let value: i64 = conn.incr(key, by).await?;
                Ok(value)
            }
        })
        .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let key = self.prefixed(key);
        let millis = ttl_millis(ttl) as i64;
        self.run("pexpire", |mut conn| {
            let key = key.clone();
            async move {
                let applied: bool = conn.pexpire(key, millis).await?;
                Ok(applied)
            }
        })
        .await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let full_pattern = format!("{}{}", escape_glob(&self.config.key_prefix), pattern);
        let found: Vec<String> = self
            .run("keys", |mut conn| {
                let full_pattern = full_pattern.clone();
                async move {
                    let keys: Vec<String> = conn.keys(full_pattern).await?;
                    Ok(keys)
                }
            })
            .await?;

        Ok(found
            .into_iter()
            .filter_map(|k| k.strip_prefix(&self.config.key_prefix).map(str::to_string))
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        self.run("ping", |mut conn| async move {
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if self.conn.lock().await.take().is_some() {
            info!("redis connection closed");
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
