//! In-process coordination store.
//!
//! Suitable for single-replica deployments and tests. Expiry is checked
//! lazily: an expired binding is removed by the first read that observes
//! it, and nothing sweeps in the background.

use crate::error::CoordinationResult;
use crate::store::{effective_ttl, CoordinationStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Binding with instant-based expiry
#[derive(Debug)]
struct BindingEntry {
    target: String,
    expires_at: Instant,
}

impl BindingEntry {
    fn new(target: String, ttl: Duration) -> Self {
        Self {
            target,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Lock-guarded in-memory store
#[derive(Debug, Default)]
pub struct MemoryCoordinationStore {
    counters: Mutex<HashMap<String, u64>>,
    bindings: Mutex<HashMap<(String, String), BindingEntry>>,
}

impl MemoryCoordinationStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored bindings, including expired ones not yet read
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.bindings.lock().len()
    }

    /// Current value of a counter without advancing it
    #[must_use]
    pub fn counter_value(&self, key: &str) -> u64 {
        self.counters.lock().get(key).copied().unwrap_or(0)
    }
}

#[async_trait]
impl CoordinationStore for MemoryCoordinationStore {
    async fn next_counter(&self, key: &str) -> CoordinationResult<u64> {
        let mut counters = self.counters.lock();
        let counter = counters.entry(key.to_string()).or_insert(0);
        *counter = counter.wrapping_add(1).max(1);
        Ok(*counter)
    }

    async fn get_binding(
        &self,
        binding_key: &str,
        sticky_value: &str,
    ) -> CoordinationResult<Option<String>> {
        let mut bindings = self.bindings.lock();
        let key = (binding_key.to_string(), sticky_value.to_string());

        match bindings.get(&key) {
            Some(entry) if entry.is_expired() => {
                bindings.remove(&key);
                debug!(binding_key = %binding_key, "Expired binding removed");
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.target.clone())),
            None => Ok(None),
        }
    }

    async fn set_binding(
        &self,
        binding_key: &str,
        sticky_value: &str,
        target: &str,
        ttl: Duration,
    ) -> CoordinationResult<()> {
        let entry = BindingEntry::new(target.to_string(), effective_ttl(ttl));
        self.bindings.lock().insert(
            (binding_key.to_string(), sticky_value.to_string()),
            entry,
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    fn is_distributed(&self) -> bool {
        false
    }
}
