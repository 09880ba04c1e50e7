//! Coordination store contract tests
//!
//! The same contract runs against every backend. Redis and etcd runs need
//! a live server and are ignored by default:
//!
//! ```bash
//! ROUTER_TEST_REDIS_URL=redis://127.0.0.1:6379 cargo test -p integration-tests -- --ignored
//! ```

use crate::fixtures::*;
use crate::helpers::*;
use async_trait::async_trait;
use gateway_coordination::{
    CoordinationResult, CoordinationStore, EtcdCoordinationStore, EtcdStoreConfig, KeySpace,
    MemoryCoordinationStore, RedisCoordinationStore, RedisStoreConfig,
};
use gateway_core::{BranchStrategy, RouteRequest};
use gateway_routing::{RoutingEngine, RoutingError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn counters_never_repeat(store: Arc<dyn CoordinationStore>, key: &str) {
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let key = key.to_string();
            tokio::spawn(async move {
                let mut values = Vec::new();
                for _ in 0..25 {
                    values.push(store.next_counter(&key).await.expect("counter"));
                }
                values
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for task in futures::future::join_all(tasks).await {
        for value in task.expect("task should not panic") {
            assert!(seen.insert(value), "counter value {value} returned twice");
        }
    }
    assert_eq!(seen.len(), 200);
    assert_eq!(seen.iter().min(), Some(&1));
    assert_eq!(seen.iter().max(), Some(&200));
}

async fn bindings_expire(store: Arc<dyn CoordinationStore>, expiry: Duration, wait: Duration) {
    store
        .set_binding("tenant-a:chat", "sess-1", "{\"branch\":\"b\",\"instance\":\"i\"}", expiry)
        .await
        .expect("set");

    let read = store.get_binding("tenant-a:chat", "sess-1").await.expect("get");
    assert_eq!(read.as_deref(), Some("{\"branch\":\"b\",\"instance\":\"i\"}"));
    assert!(store.get_binding("tenant-a:chat", "sess-2").await.expect("get").is_none());

    tokio::time::sleep(wait).await;
    assert!(store.get_binding("tenant-a:chat", "sess-1").await.expect("get").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_memory_counters_never_repeat() {
    counters_never_repeat(Arc::new(MemoryCoordinationStore::new()), "rr:shared").await;
}

#[tokio::test]
async fn test_memory_binding_expiry() {
    bindings_expire(
        Arc::new(MemoryCoordinationStore::new()),
        Duration::from_millis(500),
        Duration::from_millis(650),
    )
    .await;
}

#[test]
fn test_remote_key_layout() {
    let keys = KeySpace::new("edge");
    assert_eq!(keys.counter("rr:tenant-a:chat:tier:1"), "edge:counter:rr:tenant-a:chat:tier:1");

    let binding = keys.binding("tenant-a:chat", "raw-session-token");
    assert!(binding.starts_with("edge:sticky:tenant-a:chat:"));
    assert!(!binding.contains("raw-session-token"));
    assert_eq!(binding.rsplit(':').next().map(str::len), Some(64));
}

#[tokio::test]
#[ignore = "requires Redis at ROUTER_TEST_REDIS_URL"]
async fn test_redis_contract() {
    let Ok(url) = std::env::var("ROUTER_TEST_REDIS_URL") else {
        return;
    };
    let config = RedisStoreConfig::builder()
        .url(url)
        .key_prefix(format!("router-it-{}", std::process::id()))
        .build();
    let store: Arc<dyn CoordinationStore> =
        Arc::new(RedisCoordinationStore::connect(&config).await.expect("connect"));

    store.health_check().await.expect("healthy");
    counters_never_repeat(Arc::clone(&store), "rr:shared").await;
    bindings_expire(store, Duration::from_millis(500), Duration::from_millis(650)).await;
}

#[tokio::test]
#[ignore = "requires etcd at ROUTER_TEST_ETCD_ENDPOINTS"]
async fn test_etcd_contract() {
    let Ok(endpoints) = std::env::var("ROUTER_TEST_ETCD_ENDPOINTS") else {
        return;
    };
    let config = EtcdStoreConfig::builder()
        .endpoints(endpoints.split(',').map(str::to_string))
        .key_prefix(format!("router-it-{}", std::process::id()))
        .build();
    let store: Arc<dyn CoordinationStore> =
        Arc::new(EtcdCoordinationStore::connect(&config).await.expect("connect"));

    store.health_check().await.expect("healthy");
    counters_never_repeat(Arc::clone(&store), "rr:shared").await;
    bindings_expire(store, Duration::from_millis(500), Duration::from_millis(650)).await;
}

/// Store that takes a long time to answer counter calls
struct SlowCounters;

#[async_trait]
impl CoordinationStore for SlowCounters {
    async fn next_counter(&self, _: &str) -> CoordinationResult<u64> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(1)
    }

    async fn get_binding(&self, _: &str, _: &str) -> CoordinationResult<Option<String>> {
        Ok(None)
    }

    async fn set_binding(&self, _: &str, _: &str, _: &str, _: Duration) -> CoordinationResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slow"
    }

    fn is_distributed(&self) -> bool {
        true
    }
}

/// Cancelling the caller aborts a pending store call
#[tokio::test]
async fn test_cancellation_reaches_store_calls() {
    init_tracing();
    let engine = RoutingEngine::new(Arc::new(SlowCounters));
    let request = RouteRequest::new(TENANT, sticky_group(BranchStrategy::RoundRobin))
        .with_instances(pool_of(&["primary"], 3));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let started = std::time::Instant::now();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = engine
        .route_with_cancellation(&request, &cancel)
        .await
        .expect_err("cancelled");
    assert!(matches!(err, RoutingError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));
}
