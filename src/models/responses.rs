//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;

/// Response body for the GET operation (GET /cache/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: Value,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for the SET operation (PUT /cache)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set", key),
            key,
        }
    }
}

/// Response body for the DELETE operation (DELETE /cache/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted", key),
            key,
        }
    }
}

/// Response body for the pattern flush (POST /flush)
#[derive(Debug, Clone, Serialize)]
pub struct FlushResponse {
    pub message: String,
    pub pattern: String,
    /// Number of remote keys deleted
    pub deleted: u64,
}

impl FlushResponse {
    pub fn new(pattern: impl Into<String>, deleted: u64) -> Self {
        let pattern = pattern.into();
        Self {
            message: format!("Flushed {} keys matching '{}'", deleted, pattern),
            pattern,
            deleted,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Local tier counters
    #[serde(flatten)]
    pub local: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(local: CacheStats) -> Self {
        Self {
            hit_rate: local.hit_rate(),
            local,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" when the remote store answers, "degraded" otherwise
    pub status: String,
    /// Whether the remote store answered a ping
    pub remote: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self::with_status("healthy", true)
    }

    pub fn degraded() -> Self {
        Self::with_status("degraded", false)
    }

    fn with_status(status: &str, remote: bool) -> Self {
        Self {
            status: status.to_string(),
            remote,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_response_serialize() {
        let resp = GetResponse::new("user:42", serde_json::json!({"name": "Ann"}));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["key"], "user:42");
        assert_eq!(json["value"]["name"], "Ann");
    }

    #[test]
    fn test_flush_response_serialize() {
        let resp = FlushResponse::new("search:*", 3);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["deleted"], 3);
        assert!(json["message"].as_str().unwrap().contains("search:*"));
    }

    #[test]
    fn test_stats_response_flattens_counters() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();

        let json = serde_json::to_value(StatsResponse::from(stats)).unwrap();
        assert_eq!(json["hits"], 3);
        assert_eq!(json["misses"], 1);
        assert!((json["hit_rate"].as_f64().unwrap() - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_health_response_variants() {
        let healthy = serde_json::to_value(HealthResponse::healthy()).unwrap();
        assert_eq!(healthy["status"], "healthy");
        assert_eq!(healthy["remote"], true);
        assert!(healthy.get("timestamp").is_some());

        let degraded = serde_json::to_value(HealthResponse::degraded()).unwrap();
        assert_eq!(degraded["status"], "degraded");
    }

    #[test]
    fn test_error_response_serialize() {
        let json = serde_json::to_string(&ErrorResponse::new("Something went wrong")).unwrap();
        assert_eq!(json, r#"{"error":"Something went wrong"}"#);
    }
}
