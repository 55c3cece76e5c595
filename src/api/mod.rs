//! API Module
//!
//! Admin HTTP surface over the cache manager, for probes and maintenance.
//!
//! # Endpoints
//! - `GET /health` - Remote store liveness
//! - `GET /stats` - Local tier statistics
//! - `GET /cache/:key` - Read a value through both tiers
//! - `PUT /cache` - Write a value
//! - `DELETE /cache/:key` - Delete a key from both tiers
//! - `POST /flush` - Delete remote keys matching a glob

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
