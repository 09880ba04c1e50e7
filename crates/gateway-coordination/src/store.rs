//! Coordination store contract and key layout.

use crate::error::CoordinationResult;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Expiry applied to bindings written with a zero TTL
pub const DEFAULT_BINDING_TTL: Duration = Duration::from_secs(10 * 60);

/// Namespace prefix for keys written to shared backends
pub const DEFAULT_KEY_PREFIX: &str = "llm-router";

/// Shared counter and sticky-binding service
///
/// Implementations must guarantee that:
/// - two concurrent `next_counter` calls with the same key never return
///   the same value, even from different processes
/// - a binding read shortly after a write observes that write
/// - a binding read after its expiry reports `None`
///
/// Futures returned by these methods may be dropped at any await point;
/// callers use that to cancel in-flight operations.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Next value of a monotonically increasing counter, starting at 1
    async fn next_counter(&self, key: &str) -> CoordinationResult<u64>;

    /// Read a binding; absence and expiry are `Ok(None)`
    async fn get_binding(
        &self,
        binding_key: &str,
        sticky_value: &str,
    ) -> CoordinationResult<Option<String>>;

    /// Upsert a binding with an expiry ([`effective_ttl`] applies)
    async fn set_binding(
        &self,
        binding_key: &str,
        sticky_value: &str,
        target: &str,
        ttl: Duration,
    ) -> CoordinationResult<()>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> CoordinationResult<()> {
        Ok(())
    }

    /// Backend name for logs and metrics
    fn name(&self) -> &'static str;

    /// Whether the backend is shared between processes
    fn is_distributed(&self) -> bool;
}

/// Coerce a binding TTL: zero never means "forever"
#[must_use]
pub fn effective_ttl(ttl: Duration) -> Duration {
    if ttl.is_zero() {
        DEFAULT_BINDING_TTL
    } else {
        ttl
    }
}

/// Key layout for shared backends
///
/// Sticky values are hashed before they become part of a key so that
/// key size stays bounded and raw session identifiers never reach the
/// backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    /// Create a key space under `prefix`
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let prefix = prefix.trim_end_matches(':');
        Self {
            prefix: if prefix.is_empty() {
                DEFAULT_KEY_PREFIX.to_string()
            } else {
                prefix.to_string()
            },
        }
    }

    /// Prefix in use
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Key holding a counter
    #[must_use]
    pub fn counter(&self, key: &str) -> String {
        format!("{}:counter:{}", self.prefix, key)
    }

    /// Key holding a sticky binding
    #[must_use]
    pub fn binding(&self, binding_key: &str, sticky_value: &str) -> String {
        format!(
            "{}:sticky:{}:{}",
            self.prefix,
            binding_key,
            hash_sticky_value(sticky_value)
        )
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

/// Hex SHA-256 of a sticky value
#[must_use]
pub fn hash_sticky_value(sticky_value: &str) -> String {
    hex::encode(Sha256::digest(sticky_value.as_bytes()))
}
