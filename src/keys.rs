//! Cache key taxonomy
//!
//! Deterministic key generators, one per semantic family. Generators are
//! pure: equal inputs give equal keys, and readable components are escaped
//! so a separator inside an input cannot make two different inputs collide.
//! Unbounded inputs (free-text queries plus filters) are reduced to a
//! SHA-256 digest; a filter value without a JSON form is refused rather than
//! given a shared fallback key.
//!
//! ```
//! use tiered_cache::keys;
//!
//! assert_eq!(keys::entity("user", 42), "user:42");
//! assert_eq!(
//!     keys::tenant_list("acme", "alerts", 2, 50),
//!     "list:acme:alerts:page:2:limit:50"
//! );
//! ```

use std::fmt::Display;
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Namespace of tenant-scoped paginated listings
pub const LIST_NAMESPACE: &str = "list";
/// Namespace of time-bucketed analytics results
pub const ANALYTICS_NAMESPACE: &str = "analytics";
/// Namespace of content-addressed query results
pub const QUERY_NAMESPACE: &str = "search";

/// Escapes the component separator and the escape character itself.
fn component(value: impl Display) -> String {
    let raw = value.to_string();
    if !raw.contains([':', '%']) {
        return raw;
    }
    raw.replace('%', "%25").replace(':', "%3A")
}

// == Entity ==
/// Key of a single entity looked up by id, e.g. `user:42`.
pub fn entity(kind: impl Display, id: impl Display) -> String {
    format!("{}:{}", component(kind), component(id))
}

// == Tenant List ==
/// Key of one page of a tenant-scoped listing.
pub fn tenant_list(tenant: impl Display, resource: impl Display, page: u32, limit: u32) -> String {
    format!(
        "{}:{}:{}:page:{}:limit:{}",
        LIST_NAMESPACE,
        component(tenant),
        component(resource),
        page,
        limit
    )
}

// == Analytics ==
/// Key of an aggregate over the time window containing `at_unix_secs`.
///
/// The timestamp is floored to the window start, so every instant inside one
/// window maps to the same key. A zero window is treated as one second.
pub fn analytics(
    tenant: impl Display,
    metric: impl Display,
    at_unix_secs: u64,
    window: Duration,
) -> String {
    let window_secs = window.as_secs().max(1);
    let bucket_start = at_unix_secs - at_unix_secs % window_secs;
    format!(
        "{}:{}:{}:{}:{}",
        ANALYTICS_NAMESPACE,
        component(tenant),
        component(metric),
        window_secs,
        bucket_start
    )
}

// == Query ==
/// Content-addressed key of a parameterized query result.
///
/// The digest covers the canonical JSON of `[query, filters]`; object keys
/// are emitted in sorted order, so filter maps that differ only in insertion
/// order share a key.
///
/// # Errors
/// Returns [`CacheError::Serialization`] when `filters` has no JSON form,
/// e.g. a map with non-string keys. Such a query has no key and must not be
/// cached.
pub fn query<F: Serialize + ?Sized>(
    namespace: impl Display,
    query: &str,
    filters: &F,
) -> Result<String> {
    let filters = serde_json::to_value(filters)?;
    let canonical = serde_json::Value::Array(vec![query.into(), filters]).to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    Ok(format!(
        "{}:{}:{}",
        QUERY_NAMESPACE,
        component(namespace),
        hex::encode(digest)
    ))
}

/// Glob matching every key of the query family in one namespace.
pub fn query_pattern(namespace: impl Display) -> String {
    format!("{}:{}:*", QUERY_NAMESPACE, component(namespace))
}
