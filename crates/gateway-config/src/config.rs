//! Router configuration model.

use crate::error::{ConfigError, ConfigResult};
use gateway_coordination::{EtcdStoreConfig, RedisStoreConfig, DEFAULT_BINDING_TTL, DEFAULT_KEY_PREFIX};
use gateway_telemetry::{LogFormat, LoggingConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Top-level router configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Coordination store settings
    #[serde(default)]
    pub coordination: CoordinationSettings,

    /// Sticky session settings
    #[serde(default)]
    pub sticky: StickySettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl RoutingConfig {
    /// Parse a YAML document
    ///
    /// # Errors
    /// Returns error if the document is malformed
    pub fn from_yaml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(source)?;
        debug!(backend = %config.coordination.backend, "Parsed YAML configuration");
        Ok(config)
    }

    /// Parse a TOML document
    ///
    /// # Errors
    /// Returns error if the document is malformed
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        debug!(backend = %config.coordination.backend, "Parsed TOML configuration");
        Ok(config)
    }

    /// Check that the configuration can be used to build a router
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] describing the first problem found
    pub fn validate(&self) -> ConfigResult<()> {
        let coordination = &self.coordination;
        if coordination.operation_timeout.is_zero() {
            return Err(ConfigError::invalid("coordination.operation_timeout must be positive"));
        }

        match coordination.backend {
            BackendKind::Memory => {}
            BackendKind::Redis => {
                let raw = coordination.redis.url.trim();
                if raw.is_empty() {
                    return Err(ConfigError::invalid("redis backend selected but coordination.redis.url is empty"));
                }
                let parsed = url::Url::parse(raw)
                    .map_err(|e| ConfigError::invalid(format!("coordination.redis.url: {e}")))?;
                if !matches!(parsed.scheme(), "redis" | "rediss") {
                    return Err(ConfigError::invalid(format!(
                        "coordination.redis.url has unsupported scheme {}",
                        parsed.scheme()
                    )));
                }
            }
            BackendKind::Etcd => {
                if coordination.etcd.endpoints.iter().all(|e| e.trim().is_empty()) {
                    return Err(ConfigError::invalid("etcd backend selected but coordination.etcd.endpoints is empty"));
                }
                if coordination.etcd.cas_max_attempts == 0 {
                    return Err(ConfigError::invalid("coordination.etcd.cas_max_attempts must be at least 1"));
                }
            }
        }

        Ok(())
    }
}

/// Which coordination store backs the router
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process store; single replica only
    #[default]
    Memory,
    /// Redis
    Redis,
    /// etcd
    Etcd,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            "etcd" => Ok(Self::Etcd),
            other => Err(ConfigError::invalid(format!("unknown coordination backend: {other}"))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::Redis => "redis",
            Self::Etcd => "etcd",
        })
    }
}

/// Coordination store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinationSettings {
    /// Backend kind
    #[serde(default)]
    pub backend: BackendKind,

    /// Prefix for every key written to a shared backend
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Bound on a single store operation
    #[serde(default = "default_operation_timeout", with = "humantime_serde")]
    pub operation_timeout: Duration,

    /// Redis settings
    #[serde(default)]
    pub redis: RedisSettings,

    /// etcd settings
    #[serde(default)]
    pub etcd: EtcdSettings,
}

impl Default for CoordinationSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            key_prefix: default_key_prefix(),
            operation_timeout: default_operation_timeout(),
            redis: RedisSettings::default(),
            etcd: EtcdSettings::default(),
        }
    }
}

impl CoordinationSettings {
    /// Redis store configuration derived from these settings
    #[must_use]
    pub fn redis_store_config(&self) -> RedisStoreConfig {
        RedisStoreConfig::builder()
            .url(self.redis.url.clone())
            .key_prefix(self.key_prefix.clone())
            .connect_timeout(self.redis.connect_timeout)
            .operation_timeout(self.operation_timeout)
            .build()
    }

    /// etcd store configuration derived from these settings
    #[must_use]
    pub fn etcd_store_config(&self) -> EtcdStoreConfig {
        let mut builder = EtcdStoreConfig::builder()
            .endpoints(self.etcd.endpoints.iter().cloned())
            .key_prefix(self.key_prefix.clone())
            .connect_timeout(self.etcd.connect_timeout)
            .operation_timeout(self.operation_timeout)
            .cas_max_attempts(self.etcd.cas_max_attempts)
            .cas_retry_delay(self.etcd.cas_retry_delay);
        if let (Some(user), Some(password)) = (&self.etcd.username, &self.etcd.password) {
            builder = builder.credentials(user.clone(), password.clone());
        }
        builder.build()
    }
}

/// Redis settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisSettings {
    /// Connection URL (`redis://` or `rediss://`)
    #[serde(default)]
    pub url: String,

    /// Initial connection timeout
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

/// etcd settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtcdSettings {
    /// Cluster endpoints
    #[serde(default)]
    pub endpoints: Vec<String>,

    /// Initial connection timeout
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Attempts at an optimistic counter update before giving up
    #[serde(default = "default_cas_max_attempts")]
    pub cas_max_attempts: u32,

    /// Base delay between counter attempts
    #[serde(default = "default_cas_retry_delay", with = "humantime_serde")]
    pub cas_retry_delay: Duration,

    /// Username for authenticated clusters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password for authenticated clusters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for EtcdSettings {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            connect_timeout: default_connect_timeout(),
            cas_max_attempts: default_cas_max_attempts(),
            cas_retry_delay: default_cas_retry_delay(),
            username: None,
            password: None,
        }
    }
}

/// Sticky session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickySettings {
    /// Expiry of a sticky binding
    #[serde(default = "default_binding_ttl", with = "humantime_serde")]
    pub binding_ttl: Duration,
}

impl Default for StickySettings {
    fn default() -> Self {
        Self {
            binding_ttl: default_binding_ttl(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingSettings {
    /// Logging configuration for [`gateway_telemetry::init_logging`]
    #[must_use]
    pub fn to_logging_config(&self) -> LoggingConfig {
        LoggingConfig::new(self.level.clone()).with_format(self.format)
    }
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_operation_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_cas_max_attempts() -> u32 {
    64
}

fn default_cas_retry_delay() -> Duration {
    Duration::from_millis(5)
}

fn default_binding_ttl() -> Duration {
    DEFAULT_BINDING_TTL
}

fn default_log_level() -> String {
    "info".to_string()
}
