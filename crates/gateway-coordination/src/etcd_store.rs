//! etcd-backed coordination store.
//!
//! etcd has no atomic increment, so counters are advanced with an
//! optimistic transaction: read the value and its version, write
//! `value + 1` only if the version is unchanged, and retry after a short
//! delay when another writer got there first.
//!
//! Bindings are stored as `{"target", "expires_at_ms"}` and checked against
//! the local clock on read, so a binding never outlives its TTL. The value
//! is also attached to a lease (whole seconds, rounded up) so etcd removes
//! it eventually.

use crate::config::EtcdStoreConfig;
use crate::error::{CoordinationError, CoordinationResult};
use crate::store::{effective_ttl, CoordinationStore, KeySpace};
use async_trait::async_trait;
use etcd_client::{Client, Compare, CompareOp, ConnectOptions, PutOptions, Txn, TxnOp};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Coordination store shared through etcd
#[derive(Clone)]
pub struct EtcdCoordinationStore {
    client: Client,
    keys: KeySpace,
    operation_timeout: Duration,
    cas_max_attempts: u32,
    cas_retry_delay: Duration,
}

impl EtcdCoordinationStore {
    /// Connect to an etcd cluster
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the connection fails
    pub async fn connect(config: &EtcdStoreConfig) -> CoordinationResult<Self> {
        config.validate()?;

        let mut options = ConnectOptions::new()
            .with_connect_timeout(config.connect_timeout)
            .with_timeout(config.operation_timeout);
        if let (Some(user), Some(password)) = (&config.username, &config.password) {
            options = options.with_user(user.clone(), password.clone());
        }

        let endpoints: Vec<String> = config
            .endpoints
            .iter()
            .filter(|e| !e.trim().is_empty())
            .cloned()
            .collect();

        let client = tokio::time::timeout(
            config.connect_timeout,
            Client::connect(endpoints.clone(), Some(options)),
        )
        .await
        .map_err(|_| CoordinationError::Timeout(config.connect_timeout))?
        .map_err(|e| CoordinationError::connection(e.to_string()))?;

        info!(
            endpoints = ?endpoints,
            prefix = %config.key_prefix,
            "etcd coordination store connected"
        );

        Ok(Self {
            client,
            keys: KeySpace::new(config.key_prefix.clone()),
            operation_timeout: config.operation_timeout,
            cas_max_attempts: config.cas_max_attempts.max(1),
            cas_retry_delay: config.cas_retry_delay,
        })
    }

    /// Key layout in use
    #[must_use]
    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    async fn bounded<T, F>(&self, fut: F) -> CoordinationResult<T>
    where
        F: Future<Output = Result<T, etcd_client::Error>> + Send,
    {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => result.map_err(map_etcd_error),
            Err(_) => Err(CoordinationError::Timeout(self.operation_timeout)),
        }
    }

    /// Delay before the next counter attempt, with up to 100% jitter
    fn retry_delay(&self) -> Duration {
        let base = self.cas_retry_delay.as_micros() as u64;
        if base == 0 {
            return Duration::ZERO;
        }
        let jitter = rand::thread_rng().gen_range(0..=base);
        Duration::from_micros(base + jitter)
    }
}

fn map_etcd_error(error: etcd_client::Error) -> CoordinationError {
    match error {
        etcd_client::Error::TransportError(e) => CoordinationError::connection(e.to_string()),
        other => CoordinationError::backend(other.to_string()),
    }
}

/// Lease length in whole seconds, rounded up, never below one
fn lease_seconds(ttl: Duration) -> i64 {
    let ttl = effective_ttl(ttl);
    let mut secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs += 1;
    }
    i64::try_from(secs.max(1)).unwrap_or(i64::MAX)
}

/// Binding value as stored in etcd
#[derive(Debug, Serialize, Deserialize)]
struct StoredBinding {
    target: String,
    expires_at_ms: u64,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

fn encode_binding(target: &str, ttl: Duration, now_ms: u64) -> CoordinationResult<String> {
    let ttl_ms = u64::try_from(effective_ttl(ttl).as_millis()).unwrap_or(u64::MAX);
    let stored = StoredBinding {
        target: target.to_string(),
        expires_at_ms: now_ms.saturating_add(ttl_ms),
    };
    serde_json::to_string(&stored).map_err(|e| CoordinationError::backend(e.to_string()))
}

/// Target of a stored binding, or `None` once it has expired or cannot be read
fn decode_binding(raw: &str, now_ms: u64) -> Option<String> {
    let stored: StoredBinding = serde_json::from_str(raw).ok()?;
    (now_ms < stored.expires_at_ms).then_some(stored.target)
}

fn parse_counter(key: &str, raw: &[u8]) -> CoordinationResult<u64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or_else(|| CoordinationError::backend(format!("counter {key} holds a non-numeric value")))
}

fn advance_counter(key: &str, current: u64) -> CoordinationResult<u64> {
    current
        .checked_add(1)
        .ok_or_else(|| CoordinationError::backend(format!("counter {key} would overflow")))
}

#[async_trait]
impl CoordinationStore for EtcdCoordinationStore {
    async fn next_counter(&self, key: &str) -> CoordinationResult<u64> {
        let key = self.keys.counter(key);
        let mut kv = self.client.kv_client();

        for attempt in 1..=self.cas_max_attempts {
            let response = self.bounded(kv.get(key.as_str(), None)).await?;

            // An absent key has version 0, which makes the first write a create.
            let (current, version) = match response.kvs().first() {
                Some(entry) => (parse_counter(&key, entry.value())?, entry.version()),
                None => (0, 0),
            };
            let next = advance_counter(&key, current)?;

            let txn = Txn::new()
                .when([Compare::version(key.as_str(), CompareOp::Equal, version)])
                .and_then([TxnOp::put(key.as_str(), next.to_string(), None)]);

            let outcome = self.bounded(kv.txn(txn)).await?;
            if outcome.succeeded() {
                return Ok(next);
            }

            debug!(key = %key, attempt = attempt, "etcd counter update conflicted");
            if attempt < self.cas_max_attempts {
                tokio::time::sleep(self.retry_delay()).await;
            }
        }

        warn!(
            key = %key,
            attempts = self.cas_max_attempts,
            "etcd counter update exhausted attempts"
        );
        Err(CoordinationError::Conflict {
            key,
            attempts: self.cas_max_attempts,
        })
    }

    async fn get_binding(
        &self,
        binding_key: &str,
        sticky_value: &str,
    ) -> CoordinationResult<Option<String>> {
        let key = self.keys.binding(binding_key, sticky_value);
        let mut kv = self.client.kv_client();

        let response = self.bounded(kv.get(key.as_str(), None)).await?;
        let value = match response.kvs().first() {
            Some(entry) => {
                let raw = entry.value_str().map_err(map_etcd_error)?;
                decode_binding(raw, now_millis())
            }
            None => None,
        };

        debug!(key = %key, found = value.is_some(), "etcd binding read");
        Ok(value)
    }

    async fn set_binding(
        &self,
        binding_key: &str,
        sticky_value: &str,
        target: &str,
        ttl: Duration,
    ) -> CoordinationResult<()> {
        let key = self.keys.binding(binding_key, sticky_value);
        let seconds = lease_seconds(ttl);
        let value = encode_binding(target, ttl, now_millis())?;

        let mut lease = self.client.lease_client();
        let granted = self.bounded(lease.grant(seconds, None)).await?;

        let mut kv = self.client.kv_client();
        let options = PutOptions::new().with_lease(granted.id());
        self.bounded(kv.put(key.as_str(), value, Some(options)))
            .await?;

        debug!(key = %key, lease_secs = seconds, "etcd binding written");
        Ok(())
    }

    async fn health_check(&self) -> CoordinationResult<()> {
        let mut maintenance = self.client.maintenance_client();
        self.bounded(maintenance.status()).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "etcd"
    }

    fn is_distributed(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for EtcdCoordinationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtcdCoordinationStore")
            .field("prefix", &self.keys.prefix())
            .field("operation_timeout", &self.operation_timeout)
            .field("cas_max_attempts", &self.cas_max_attempts)
            .finish_non_exhaustive()
    }
}
