//! Cache Module
//!
//! Provides the bounded local tier with TTL freshness and FIFO eviction.

use std::time::Duration;

mod entry;
mod local;
mod stats;


// Re-export public types
pub use entry::CacheEntry;
pub use local::LocalCache;
pub use stats::CacheStats;

// == Public Constants ==
/// Maximum allowed key length in bytes accepted by the admin API
pub const MAX_KEY_LENGTH: usize = 256;

/// Longest TTL any tier is asked to keep, ten years
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);
