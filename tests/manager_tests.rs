//! Integration Tests for the Cache Manager
//!
//! Exercises the public manager API over the in-process remote store, with
//! the tokio clock paused wherever expiry matters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tiered_cache::{keys, CacheManager, Lookup, ManagerOptions, MemoryStore, RemoteStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    name: String,
}

fn ann() -> User {
    User {
        name: "Ann".to_string(),
    }
}

// == Helper Functions ==

fn options(local_max_entries: usize, sweep_interval: Duration) -> ManagerOptions {
    ManagerOptions {
        default_ttl: Duration::from_secs(300),
        local_max_entries,
        sweep_interval,
    }
}

fn create_manager() -> (CacheManager, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let manager = CacheManager::with_store(store.clone(), options(100, Duration::ZERO));
    (manager, store)
}

// == Round Trip and Expiry ==

#[tokio::test]
async fn test_round_trip() {
    let (manager, _) = create_manager();

    manager
        .set_with("user:42", &ann(), Some(Duration::from_secs(60)), true)
        .await;

    assert_eq!(manager.get::<User>("user:42").await, Some(ann()));
}

#[tokio::test(start_paused = true)]
async fn test_entry_expires_without_delete() {
    let (manager, _) = create_manager();

    manager
        .set_with("user:42", &ann(), Some(Duration::from_secs(60)), true)
        .await;
    assert_eq!(manager.get::<User>("user:42").await, Some(ann()));

    tokio::time::advance(Duration::from_secs(61)).await;

    assert_eq!(manager.get::<User>("user:42").await, None);
}

#[tokio::test(start_paused = true)]
async fn test_expiry_at_exact_ttl() {
    let (manager, _) = create_manager();

    manager
        .set_with("k", &1u32, Some(Duration::from_secs(10)), true)
        .await;
    tokio::time::advance(Duration::from_secs(10)).await;

    assert_eq!(manager.get::<u32>("k").await, None);
}

#[tokio::test(start_paused = true)]
async fn test_repopulated_entry_uses_default_ttl() {
    let (manager, store) = create_manager();
    store
        .set("k", "7".to_string(), Duration::from_secs(1000))
        .await
        .unwrap();

    assert_eq!(manager.get::<u32>("k").await, Some(7));

    // Past the 300s default the local copy is stale, so the read goes remote.
    tokio::time::advance(Duration::from_secs(301)).await;
    let calls = store.calls();
    assert_eq!(manager.get::<u32>("k").await, Some(7));
    assert_eq!(store.calls(), calls + 1);
}

#[tokio::test(start_paused = true)]
async fn test_oversized_ttl_is_clamped_remotely() {
    let (manager, store) = create_manager();

    manager.set_with("k", &1, Some(Duration::MAX), true).await;

    assert_eq!(store.ttl("k"), Some(tiered_cache::cache::MAX_TTL));
    assert_eq!(manager.get::<i32>("k").await, Some(1));
}

// == Local Tier Bounds ==

#[tokio::test]
async fn test_local_capacity_evicts_earliest_inserted() {
    let store = Arc::new(MemoryStore::new());
    let manager = CacheManager::with_store(store.clone(), options(3, Duration::ZERO));

    for i in 1..=3 {
        manager.set(&format!("k{}", i), &i).await;
    }
    // Reading k1 does not protect it: eviction is by insertion order.
    let _ = manager.get::<i32>("k1").await;
    manager.set("k4", &4).await;

    let stats = manager.local_stats();
    assert_eq!(stats.evictions, 1);
    assert_eq!(manager.local_len(), 3);

    // k1 is gone locally, so reading it needs a remote round trip.
    let calls = store.calls();
    assert_eq!(manager.get::<i32>("k1").await, Some(1));
    assert_eq!(store.calls(), calls + 1);

    // k3 is still local.
    let calls = store.calls();
    assert_eq!(manager.get::<i32>("k3").await, Some(3));
    assert_eq!(store.calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_background_sweep_reclaims_unread_entries() {
    let store = Arc::new(MemoryStore::new());
    let manager = CacheManager::with_store(store, options(100, Duration::from_secs(60)));

    manager
        .set_with("forgotten", &1, Some(Duration::from_secs(5)), true)
        .await;
    assert_eq!(manager.local_len(), 1);

    tokio::time::sleep(Duration::from_secs(61)).await;

    assert_eq!(manager.local_len(), 0);
    assert_eq!(manager.local_stats().swept, 1);
    manager.disconnect().await;
}

// == Deletion ==

#[tokio::test]
async fn test_delete_removes_from_both_tiers() {
    let (manager, store) = create_manager();

    manager.set("user:1", &ann()).await;
    manager.del("user:1").await;

    assert_eq!(manager.local_len(), 0);
    assert!(!store.exists("user:1").await.unwrap());
    assert_eq!(manager.get::<User>("user:1").await, None);
}

#[tokio::test]
async fn test_delete_clears_local_even_when_remote_fails() {
    let (manager, store) = create_manager();

    manager.set("user:1", &ann()).await;
    store.set_failing(true);
    manager.del("user:1").await;

    assert_eq!(manager.local_len(), 0);
}

// == Batch Operations ==

#[tokio::test]
async fn test_batch_round_trip_in_order() {
    let (manager, _) = create_manager();

    manager
        .mset(&[
            ("k1", "v1".to_string(), None),
            ("k2", "v2".to_string(), Some(Duration::from_secs(30))),
        ])
        .await;

    let values: Vec<Option<String>> = manager.mget(&["k2", "missing", "k1"]).await;
    assert_eq!(
        values,
        vec![Some("v2".to_string()), None, Some("v1".to_string())]
    );
}

#[tokio::test]
async fn test_mset_bypasses_local_tier() {
    let (manager, store) = create_manager();

    manager.mset(&[("k1", 1, None), ("k2", 2, None)]).await;
    assert_eq!(manager.local_len(), 0);

    let _: Vec<Option<i32>> = manager.mget(&["k1", "k2"]).await;
    assert_eq!(manager.local_len(), 0, "mget must not populate the local tier");

    // A single-key read is what brings the entry into the local tier.
    assert_eq!(manager.get::<i32>("k1").await, Some(1));
    assert_eq!(manager.local_len(), 1);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_mget_failure_returns_all_absent() {
    let (manager, store) = create_manager();
    manager.mset(&[("k1", 1, None), ("k2", 2, None)]).await;
    store.set_failing(true);

    let values: Vec<Option<i32>> = manager.mget(&["k1", "k2", "k3"]).await;

    assert_eq!(values, vec![None, None, None]);
}

#[tokio::test]
async fn test_mget_empty_request() {
    let (manager, store) = create_manager();
    let keys: [&str; 0] = [];

    let values: Vec<Option<i32>> = manager.mget(&keys).await;

    assert!(values.is_empty());
    assert_eq!(store.calls(), 0);
}

// == Counters ==

#[tokio::test]
async fn test_counter_increments_sequentially() {
    let (manager, _) = create_manager();

    assert_eq!(manager.increment("hits").await, 1);
    assert_eq!(manager.increment("hits").await, 2);
    assert_eq!(manager.increment("hits").await, 3);
    assert_eq!(manager.increment_by("hits", 10).await, 13);
}

#[tokio::test]
async fn test_increment_failure_is_indistinguishable_from_zero() {
    let (manager, store) = create_manager();

    assert_eq!(manager.increment_by("balance", 0).await, 0);
    store.set_failing(true);
    assert_eq!(manager.increment("balance").await, 0);
}

// == Expire ==

#[tokio::test(start_paused = true)]
async fn test_expire_changes_remote_ttl_only() {
    let (manager, store) = create_manager();

    manager
        .set_with("k", &1, Some(Duration::from_secs(100)), true)
        .await;
    manager.expire("k", Duration::from_secs(10)).await;
    assert_eq!(store.ttl("k"), Some(Duration::from_secs(10)));

    tokio::time::advance(Duration::from_secs(20)).await;

    // Remote has purged the record; the local copy keeps its own window.
    assert!(!manager.exists("k").await);
    assert_eq!(manager.get::<i32>("k").await, Some(1));
    assert_eq!(manager.get_with::<i32>("k", false).await, None);
}

// == Pattern Flush ==

#[tokio::test]
async fn test_flush_pattern_scope() {
    let (manager, _) = create_manager();

    for key in ["search:a", "search:b", "search:c"] {
        manager.set(key, &key).await;
    }
    manager.set("user:1", &ann()).await;

    let deleted = manager.flush_pattern("search:*").await;

    assert_eq!(deleted, 3);
    for key in ["search:a", "search:b", "search:c"] {
        assert!(!manager.exists(key).await);
    }
    assert_eq!(manager.get::<User>("user:1").await, Some(ann()));
    assert_eq!(manager.get_with::<User>("user:1", false).await, Some(ann()));
}

#[tokio::test]
async fn test_flush_pattern_leaves_local_tier_alone() {
    let (manager, _) = create_manager();

    manager.set("search:a", &1).await;
    manager.flush_pattern("search:*").await;

    assert_eq!(manager.local_len(), 1);
    assert_eq!(manager.get_with::<i32>("search:a", false).await, None);
}

#[tokio::test]
async fn test_flush_query_family_by_namespace() {
    let (manager, _) = create_manager();
    let alerts =
        keys::query("alerts", "cpu > 90", &serde_json::json!({"region": "eu"})).unwrap();
    let users = keys::query("users", "ann", &serde_json::json!(null)).unwrap();

    manager.set(&alerts, &vec![1, 2, 3]).await;
    manager.set(&users, &vec![4]).await;

    assert_eq!(manager.flush_pattern(&keys::query_pattern("alerts")).await, 1);
    assert!(manager.exists(&users).await);
}

// == Cache Warming ==

#[tokio::test]
async fn test_warm_cache_fetches_once_when_absent() {
    let (manager, _) = create_manager();
    let calls = AtomicUsize::new(0);

    manager
        .warm_cache("report:1", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            ann()
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(manager.get::<User>("report:1").await, Some(ann()));
}

#[tokio::test]
async fn test_warm_cache_skips_present_key() {
    let (manager, _) = create_manager();
    let calls = AtomicUsize::new(0);
    manager.set("report:1", &ann()).await;

    manager
        .warm_cache_with_ttl(
            "report:1",
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                User {
                    name: "Other".to_string(),
                }
            },
            Some(Duration::from_secs(5)),
        )
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(manager.get::<User>("report:1").await, Some(ann()));
}

// == Fail-Open ==

#[tokio::test]
async fn test_fail_open_defaults() {
    let (manager, store) = create_manager();
    manager.set("user:1", &ann()).await;
    store.set_failing(true);

    manager.set("user:2", &ann()).await;
    assert_eq!(manager.get_with::<User>("user:1", false).await, None);
    assert_eq!(manager.get::<User>("user:2").await, None);
    manager.del("user:1").await;
    assert_eq!(manager.increment("n").await, 0);
    assert!(!manager.exists("user:1").await);
    manager.expire("user:1", Duration::from_secs(1)).await;
    assert_eq!(manager.flush_pattern("*").await, 0);
    assert!(!manager.health_check().await);

    let lookup: Lookup<User> = manager.lookup("user:2", true).await;
    assert!(lookup.is_failed());
}

#[tokio::test]
async fn test_local_hit_survives_remote_outage() {
    let (manager, store) = create_manager();
    manager.set("user:1", &ann()).await;
    store.set_failing(true);

    assert_eq!(manager.get::<User>("user:1").await, Some(ann()));
}

#[tokio::test]
async fn test_type_mismatch_reads_as_absent() {
    let (manager, _) = create_manager();
    manager.set("n", &5).await;

    assert_eq!(manager.get::<User>("n").await, None);
    assert_eq!(manager.get::<i32>("n").await, Some(5));
}

// == Lifecycle ==

#[tokio::test]
async fn test_disconnect_stops_sweep_and_closes_remote() {
    let store = Arc::new(MemoryStore::new());
    let manager = CacheManager::with_store(store.clone(), options(10, Duration::from_secs(60)));
    assert!(manager.is_sweeping());
    assert!(manager.health_check().await);

    manager.disconnect().await;

    assert!(!manager.is_sweeping());
    assert!(!manager.health_check().await);
    assert!(store.ping().await.is_err());
}

#[tokio::test]
async fn test_shared_manager_across_tasks() {
    let (manager, _) = create_manager();
    let manager = Arc::new(manager);

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.increment("shared").await })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    results.sort();

    assert_eq!(results, (1..=10).collect::<Vec<i64>>());
}
