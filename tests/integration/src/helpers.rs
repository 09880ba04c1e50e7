//! Test helper utilities for integration tests

use async_trait::async_trait;
use gateway_coordination::{
    CoordinationError, CoordinationResult, CoordinationStore, MemoryCoordinationStore,
};
use gateway_core::RouteRequest;
use gateway_routing::{RouteDecision, RoutingEngine};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for tests (only once)
static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
});

/// Initialize tracing for tests
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// Several engines over one store, standing in for a fleet of gateway replicas
pub struct Fleet {
    /// Store shared by every replica
    pub store: Arc<InstrumentedStore>,
    /// One engine per replica
    pub replicas: Vec<RoutingEngine>,
}

impl Fleet {
    /// Fleet of `size` replicas over a fresh in-memory store
    pub fn new(size: usize) -> Self {
        Self::with_binding_ttl(size, Duration::from_secs(600))
    }

    /// Fleet whose replicas write bindings with `ttl`
    pub fn with_binding_ttl(size: usize, ttl: Duration) -> Self {
        init_tracing();
        let store = Arc::new(InstrumentedStore::new());
        let replicas = (0..size)
            .map(|_| {
                RoutingEngine::builder(Arc::clone(&store) as Arc<dyn CoordinationStore>)
                    .binding_ttl(ttl)
                    .build()
            })
            .collect();
        Self { store, replicas }
    }

    /// Replica `index`
    pub fn replica(&self, index: usize) -> &RoutingEngine {
        &self.replicas[index]
    }
}

/// Route `request` `count` times through `engine`
pub async fn route_many(engine: &RoutingEngine, request: &RouteRequest, count: usize) -> Vec<RouteDecision> {
    let mut decisions = Vec::with_capacity(count);
    for _ in 0..count {
        decisions.push(engine.route(request).await.expect("route should succeed"));
    }
    decisions
}

/// How often each branch was chosen
pub fn branch_histogram(decisions: &[RouteDecision]) -> BTreeMap<String, usize> {
    let mut histogram = BTreeMap::new();
    for decision in decisions {
        *histogram.entry(decision.trace.branch_name.clone()).or_insert(0) += 1;
    }
    histogram
}

/// How often each instance was chosen
pub fn instance_histogram(decisions: &[RouteDecision]) -> BTreeMap<String, usize> {
    let mut histogram = BTreeMap::new();
    for decision in decisions {
        *histogram.entry(decision.instance.id().to_string()).or_insert(0) += 1;
    }
    histogram
}

/// In-memory store that counts calls and can be told to fail
#[derive(Debug, Default)]
pub struct InstrumentedStore {
    inner: MemoryCoordinationStore,
    counter_calls: AtomicU64,
    binding_reads: AtomicU64,
    binding_writes: AtomicU64,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl InstrumentedStore {
    /// Create a healthy store
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrapped store
    pub fn inner(&self) -> &MemoryCoordinationStore {
        &self.inner
    }

    /// Make binding writes fail from now on
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make binding reads fail from now on
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Counter calls seen
    pub fn counter_calls(&self) -> u64 {
        self.counter_calls.load(Ordering::SeqCst)
    }

    /// Binding reads seen
    pub fn binding_reads(&self) -> u64 {
        self.binding_reads.load(Ordering::SeqCst)
    }

    /// Binding writes attempted
    pub fn binding_writes(&self) -> u64 {
        self.binding_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CoordinationStore for InstrumentedStore {
    async fn next_counter(&self, key: &str) -> CoordinationResult<u64> {
        self.counter_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.next_counter(key).await
    }

    async fn get_binding(
        &self,
        binding_key: &str,
        sticky_value: &str,
    ) -> CoordinationResult<Option<String>> {
        self.binding_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CoordinationError::connection("injected read failure"));
        }
        self.inner.get_binding(binding_key, sticky_value).await
    }

    async fn set_binding(
        &self,
        binding_key: &str,
        sticky_value: &str,
        target: &str,
        ttl: Duration,
    ) -> CoordinationResult<()> {
        self.binding_writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CoordinationError::backend("injected write failure"));
        }
        self.inner
            .set_binding(binding_key, sticky_value, target, ttl)
            .await
    }

    fn name(&self) -> &'static str {
        "instrumented"
    }

    fn is_distributed(&self) -> bool {
        true
    }
}
