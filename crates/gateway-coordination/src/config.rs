//! Connection settings for the shared backends.

use crate::error::{CoordinationError, CoordinationResult};
use crate::store::DEFAULT_KEY_PREFIX;
use std::time::Duration;

/// Configuration for the Redis-backed store
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,

    /// Key prefix for namespace isolation
    pub key_prefix: String,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Per-operation timeout
    pub operation_timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            connect_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_secs(2),
        }
    }
}

impl RedisStoreConfig {
    /// Create a builder
    #[must_use]
    pub fn builder() -> RedisStoreConfigBuilder {
        RedisStoreConfigBuilder::default()
    }

    /// Check the URL scheme and timeouts
    pub fn validate(&self) -> CoordinationResult<()> {
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(CoordinationError::config("invalid Redis URL scheme"));
        }
        if self.operation_timeout.is_zero() {
            return Err(CoordinationError::config("Redis operation timeout is zero"));
        }
        Ok(())
    }
}

/// Builder for `RedisStoreConfig`
#[derive(Debug, Default)]
pub struct RedisStoreConfigBuilder {
    config: RedisStoreConfig,
}

impl RedisStoreConfigBuilder {
    /// Set Redis connection URL
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Set key prefix
    #[must_use]
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    /// Set connection timeout
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set operation timeout
    #[must_use]
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.config.operation_timeout = timeout;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> RedisStoreConfig {
        self.config
    }
}

/// Configuration for the etcd-backed store
#[derive(Debug, Clone)]
pub struct EtcdStoreConfig {
    /// Cluster endpoints (e.g., "http://127.0.0.1:2379")
    pub endpoints: Vec<String>,

    /// Key prefix for namespace isolation
    pub key_prefix: String,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Per-request timeout
    pub operation_timeout: Duration,

    /// Attempts of the optimistic counter update before giving up
    pub cas_max_attempts: u32,

    /// Delay between conflicting counter updates
    pub cas_retry_delay: Duration,

    /// Optional user name
    pub username: Option<String>,

    /// Optional password
    pub password: Option<String>,
}

impl Default for EtcdStoreConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["http://127.0.0.1:2379".to_string()],
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            connect_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_secs(2),
            cas_max_attempts: 64,
            cas_retry_delay: Duration::from_millis(5),
            username: None,
            password: None,
        }
    }
}

impl EtcdStoreConfig {
    /// Create a builder
    #[must_use]
    pub fn builder() -> EtcdStoreConfigBuilder {
        EtcdStoreConfigBuilder::default()
    }

    /// Check endpoints and retry settings
    pub fn validate(&self) -> CoordinationResult<()> {
        if self.endpoints.iter().all(|e| e.trim().is_empty()) {
            return Err(CoordinationError::config("no etcd endpoints configured"));
        }
        if self.cas_max_attempts == 0 {
            return Err(CoordinationError::config(
                "etcd counter attempts must be at least 1",
            ));
        }
        if self.operation_timeout.is_zero() {
            return Err(CoordinationError::config("etcd operation timeout is zero"));
        }
        Ok(())
    }
}

/// Builder for `EtcdStoreConfig`
#[derive(Debug, Default)]
pub struct EtcdStoreConfigBuilder {
    config: EtcdStoreConfig,
}

impl EtcdStoreConfigBuilder {
    /// Replace the endpoint list
    #[must_use]
    pub fn endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    /// Set key prefix
    #[must_use]
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    /// Set connection timeout
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set operation timeout
    #[must_use]
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.config.operation_timeout = timeout;
        self
    }

    /// Set counter update attempts
    #[must_use]
    pub fn cas_max_attempts(mut self, attempts: u32) -> Self {
        self.config.cas_max_attempts = attempts;
        self
    }

    /// Set delay between counter update attempts
    #[must_use]
    pub fn cas_retry_delay(mut self, delay: Duration) -> Self {
        self.config.cas_retry_delay = delay;
        self
    }

    /// Set credentials
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self.config.password = Some(password.into());
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> EtcdStoreConfig {
        self.config
    }
}
