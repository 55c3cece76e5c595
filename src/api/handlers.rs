//! API Handlers
//!
//! HTTP request handlers for each admin endpoint. Values travel as JSON.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::error::{CacheError, Result};
use crate::manager::CacheManager;
use crate::models::{
    DeleteResponse, FlushRequest, FlushResponse, GetResponse, HealthResponse, SetRequest,
    SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The process-wide cache manager
    pub manager: Arc<CacheManager>,
}

impl AppState {
    pub fn new(manager: Arc<CacheManager>) -> Self {
        Self { manager }
    }
}

/// Handler for PUT /cache
///
/// The write is fail-open like every manager write: a remote outage still
/// answers 200 and leaves the local tier untouched.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = req.ttl.map(Duration::from_secs);
    state.manager.set_with(&req.key, &req.value, ttl, true).await;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /cache/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.manager.get::<Value>(&key).await {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    state.manager.del(&key).await;
    Json(DeleteResponse::new(key))
}

/// Handler for POST /flush
pub async fn flush_handler(
    State(state): State<AppState>,
    Json(req): Json<FlushRequest>,
) -> Result<Json<FlushResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let deleted = state.manager.flush_pattern(&req.pattern).await;
    Ok(Json(FlushResponse::new(req.pattern, deleted)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.manager.local_stats()))
}

/// Handler for GET /health
///
/// Answers 503 while the remote store is unreachable so readiness probes
/// can take the instance out of rotation.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    if state.manager.health_check().await {
        (StatusCode::OK, Json(HealthResponse::healthy()))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(HealthResponse::degraded()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ManagerOptions;
    use crate::remote::MemoryStore;
    use serde_json::json;

    fn test_state() -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let options = ManagerOptions {
            sweep_interval: Duration::ZERO,
            ..ManagerOptions::default()
        };
        let manager = CacheManager::with_store(store.clone(), options);
        (AppState::new(Arc::new(manager)), store)
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let (state, _) = test_state();

        let req = SetRequest {
            key: "user:42".to_string(),
            value: json!({"name": "Ann"}),
            ttl: None,
        };
        let result = set_handler(State(state.clone()), Json(req)).await;
        assert!(result.is_ok());

        let response = get_handler(State(state), Path("user:42".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, json!({"name": "Ann"}));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let (state, _) = test_state();

        let result = get_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let (state, _) = test_state();

        let req = SetRequest {
            key: "to_delete".to_string(),
            value: json!("value"),
            ttl: Some(60),
        };
        set_handler(State(state.clone()), Json(req)).await.unwrap();

        delete_handler(State(state.clone()), Path("to_delete".to_string())).await;

        let result = get_handler(State(state), Path("to_delete".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_flush_handler_counts_deleted() {
        let (state, _) = test_state();
        for key in ["search:a", "search:b", "user:1"] {
            state.manager.set(key, &1).await;
        }

        let req = FlushRequest {
            pattern: "search:*".to_string(),
        };
        let response = flush_handler(State(state), Json(req)).await.unwrap();
        assert_eq!(response.deleted, 2);
    }

    #[tokio::test]
    async fn test_health_handler_reflects_remote() {
        let (state, store) = test_state();

        let (status, body) = health_handler(State(state.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "healthy");

        store.set_failing(true);
        let (status, body) = health_handler(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "degraded");
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let (state, _) = test_state();
        let _: Option<Value> = state.manager.get("missing").await;

        let response = stats_handler(State(state)).await;
        assert_eq!(response.local.hits, 0);
        assert_eq!(response.local.misses, 1);
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let (state, _) = test_state();

        let req = SetRequest {
            key: "".to_string(),
            value: json!("value"),
            ttl: None,
        };
        let result = set_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }
}
