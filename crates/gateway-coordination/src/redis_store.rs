//! Redis-backed coordination store.
//!
//! Counters use `INCR`, bindings use `SET .. PX` so Redis expires them on
//! its own. Binding keys embed a SHA-256 of the sticky value, never the
//! raw value.

use crate::config::RedisStoreConfig;
use crate::error::{CoordinationError, CoordinationResult};
use crate::store::{effective_ttl, CoordinationStore, KeySpace};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{RedisError, RedisResult};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Coordination store shared through Redis
#[derive(Clone)]
pub struct RedisCoordinationStore {
    conn: ConnectionManager,
    keys: KeySpace,
    operation_timeout: Duration,
}

impl RedisCoordinationStore {
    /// Connect to Redis
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the connection fails
    pub async fn connect(config: &RedisStoreConfig) -> CoordinationResult<Self> {
        config.validate()?;

        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| CoordinationError::config(e.to_string()))?;

        let conn = tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CoordinationError::Timeout(config.connect_timeout))?
            .map_err(|e| CoordinationError::connection(e.to_string()))?;

        info!(prefix = %config.key_prefix, "Redis coordination store connected");

        Ok(Self {
            conn,
            keys: KeySpace::new(config.key_prefix.clone()),
            operation_timeout: config.operation_timeout,
        })
    }

    /// Key layout in use
    #[must_use]
    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    async fn bounded<T, F>(&self, fut: F) -> CoordinationResult<T>
    where
        F: Future<Output = RedisResult<T>> + Send,
    {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => result.map_err(map_redis_error),
            Err(_) => Err(CoordinationError::Timeout(self.operation_timeout)),
        }
    }
}

fn map_redis_error(error: RedisError) -> CoordinationError {
    if error.is_io_error() || error.is_connection_dropped() || error.is_connection_refusal() {
        CoordinationError::connection(error.to_string())
    } else {
        CoordinationError::backend(error.to_string())
    }
}

/// Expiry in whole milliseconds, never below one
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(effective_ttl(ttl).as_millis())
        .unwrap_or(u64::MAX)
        .max(1)
}

#[async_trait]
impl CoordinationStore for RedisCoordinationStore {
    async fn next_counter(&self, key: &str) -> CoordinationResult<u64> {
        let key = self.keys.counter(key);
        let mut conn = self.conn.clone();

        let value: i64 = self
            .bounded(redis::cmd("INCR").arg(&key).query_async(&mut conn))
            .await?;

        u64::try_from(value)
            .map_err(|_| CoordinationError::backend(format!("counter {key} is negative: {value}")))
    }

    async fn get_binding(
        &self,
        binding_key: &str,
        sticky_value: &str,
    ) -> CoordinationResult<Option<String>> {
        let key = self.keys.binding(binding_key, sticky_value);
        let mut conn = self.conn.clone();

        let value: Option<String> = self
            .bounded(redis::cmd("GET").arg(&key).query_async(&mut conn))
            .await?;

        debug!(key = %key, found = value.is_some(), "Redis binding read");
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
        let millis = ttl_millis(ttl);
        let mut conn = self.conn.clone();

        self.bounded::<(), _>(
            redis::cmd("SET")
                .arg(&key)
                .arg(target)
                .arg("PX")
                .arg(millis)
                .query_async(&mut conn),
        )
        .await?;

        debug!(key = %key, ttl_ms = millis, "Redis binding written");
        Ok(())
    }

    async fn health_check(&self) -> CoordinationResult<()> {
        let mut conn = self.conn.clone();
        let _: String = self
            .bounded(redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }

    fn is_distributed(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for RedisCoordinationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCoordinationStore")
            .field("prefix", &self.keys.prefix())
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}
