//! Environment variable overrides.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `ROUTER_COORDINATION_BACKEND` | `coordination.backend` |
//! | `ROUTER_REDIS_URL` | `coordination.redis.url` |
//! | `ROUTER_ETCD_ENDPOINTS` | `coordination.etcd.endpoints` (comma separated) |
//! | `ROUTER_BINDING_TTL` | `sticky.binding_ttl` (e.g. `15m`) |
//! | `ROUTER_LOG_LEVEL` | `logging.level` |

use crate::config::{BackendKind, RoutingConfig};
use crate::error::{ConfigError, ConfigResult};
use tracing::debug;

/// Backend selection
pub const ENV_BACKEND: &str = "ROUTER_COORDINATION_BACKEND";
/// Redis URL
pub const ENV_REDIS_URL: &str = "ROUTER_REDIS_URL";
/// etcd endpoints
pub const ENV_ETCD_ENDPOINTS: &str = "ROUTER_ETCD_ENDPOINTS";
/// Sticky binding TTL
pub const ENV_BINDING_TTL: &str = "ROUTER_BINDING_TTL";
/// Log level
pub const ENV_LOG_LEVEL: &str = "ROUTER_LOG_LEVEL";

impl RoutingConfig {
    /// Apply overrides from the process environment
    ///
    /// # Errors
    /// Returns [`ConfigError::Env`] if a variable holds an unusable value
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary lookup (empty values are ignored)
    ///
    /// # Errors
    /// Returns [`ConfigError::Env`] if a variable holds an unusable value
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(raw) = get(ENV_BACKEND) {
            self.coordination.backend = raw
                .parse::<BackendKind>()
                .map_err(|e| ConfigError::env(ENV_BACKEND, e.to_string()))?;
            debug!(backend = %self.coordination.backend, "Backend overridden from environment");
        }

        if let Some(raw) = get(ENV_REDIS_URL) {
            self.coordination.redis.url = raw.trim().to_string();
        }

        if let Some(raw) = get(ENV_ETCD_ENDPOINTS) {
            self.coordination.etcd.endpoints = raw
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(raw) = get(ENV_BINDING_TTL) {
            self.sticky.binding_ttl = humantime::parse_duration(raw.trim())
                .map_err(|e| ConfigError::env(ENV_BINDING_TTL, e.to_string()))?;
        }

        if let Some(raw) = get(ENV_LOG_LEVEL) {
            self.logging.level = raw.trim().to_string();
        }

        Ok(())
    }
}
