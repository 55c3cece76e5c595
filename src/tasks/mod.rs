//! Background Tasks Module
//!
//! Contains background tasks owned by the cache manager.
//!
//! # Tasks
//! - Local sweep: removes stale local-tier entries at a fixed interval

mod sweep;

pub use sweep::{spawn_sweep_task, SweepHandle};
