//! Configuration Module
//!
//! Handles loading the remote store, local tier and server configuration
//! from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};

/// Process-wide configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote store host
    pub redis_host: String,
    /// Remote store port
    pub redis_port: u16,
    /// Remote store password, if any
    pub redis_password: Option<String>,
    /// Logical database index on the remote store
    pub redis_db: i64,
    /// Prefix applied to every key written to the remote store
    pub key_prefix: String,
    /// Delay between retries of a failed remote request, in milliseconds
    pub retry_delay_ms: u64,
    /// Maximum number of retries per remote request
    pub max_retries: u32,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Maximum number of entries held by the local tier
    pub local_max_entries: usize,
    /// Local tier expiry sweep interval in seconds (0 disables the sweep)
    pub sweep_interval: u64,
    /// Admin HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_HOST` - Remote host (default: 127.0.0.1)
    /// - `REDIS_PORT` - Remote port (default: 6379)
    /// - `REDIS_PASSWORD` - Remote password (default: none)
    /// - `REDIS_DB` - Logical database index (default: 0)
    /// - `CACHE_KEY_PREFIX` - Key prefix (default: "dashboard:")
    /// - `REDIS_RETRY_DELAY_MS` - Retry delay in ms (default: 100)
    /// - `REDIS_MAX_RETRIES` - Retries per request (default: 3)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `LOCAL_MAX_ENTRIES` - Local tier capacity (default: 1000)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `SERVER_PORT` - Admin HTTP port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_host: env::var("REDIS_HOST").unwrap_or(defaults.redis_host),
            redis_port: parse_var("REDIS_PORT", defaults.redis_port),
            redis_password: env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
            redis_db: parse_var("REDIS_DB", defaults.redis_db),
            key_prefix: env::var("CACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            retry_delay_ms: parse_var("REDIS_RETRY_DELAY_MS", defaults.retry_delay_ms),
            max_retries: parse_var("REDIS_MAX_RETRIES", defaults.max_retries),
            default_ttl: parse_var("DEFAULT_TTL", defaults.default_ttl),
            local_max_entries: parse_var("LOCAL_MAX_ENTRIES", defaults.local_max_entries),
            sweep_interval: parse_var("SWEEP_INTERVAL", defaults.sweep_interval),
            server_port: parse_var("SERVER_PORT", defaults.server_port),
        }
    }

    /// Connection settings for the remote store.
    ///
    /// The password travels as a plain field, so any byte sequence Redis
    /// accepts as a credential works here.
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.redis_host.clone(), self.redis_port),
            redis: RedisConnectionInfo {
                db: self.redis_db,
                password: self.redis_password.clone(),
                ..RedisConnectionInfo::default()
            },
        }
    }

    /// Remote store URL for logs, with the password masked.
    pub fn redis_url(&self) -> String {
        let auth = if self.redis_password.is_some() { ":***@" } else { "" };
        format!(
            "redis://{}{}:{}/{}",
            auth, self.redis_host, self.redis_port, self.redis_db
        )
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_host: "127.0.0.1".to_string(),
            redis_port: 6379,
            redis_password: None,
            redis_db: 0,
            key_prefix: "dashboard:".to_string(),
            retry_delay_ms: 100,
            max_retries: 3,
            default_ttl: 300,
            local_max_entries: 1000,
            sweep_interval: 60,
            server_port: 3000,
        }
    }
}
