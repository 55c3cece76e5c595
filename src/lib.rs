//! Tiered Cache - a two-tier cache manager
//!
//! Keeps a bounded, process-local cache in front of a shared Redis tier
//! with native TTL. Failures of the remote tier degrade to cache misses and
//! never reach the caller.

pub mod api;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod keys;
pub mod manager;
pub mod models;
pub mod remote;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use error::{CacheError, Result};
pub use manager::{CacheManager, Lookup, ManagerOptions};
pub use remote::{MemoryStore, RedisStore, RemoteStore};
