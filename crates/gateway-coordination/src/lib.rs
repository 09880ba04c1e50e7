//! # Gateway Coordination
//!
//! Coordination store for the LLM traffic router.
//!
//! Gateway replicas share no local memory, so every decision that must be
//! consistent across the fleet goes through a [`CoordinationStore`]:
//! - Monotonic counters driving round-robin rotation
//! - Sticky bindings with expiry pinning a session to an instance
//!
//! Three interchangeable backends are provided:
//! - [`MemoryCoordinationStore`] (single process, default)
//! - [`RedisCoordinationStore`] (feature `redis`)
//! - [`EtcdCoordinationStore`] (feature `etcd`)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod memory;
pub mod store;

#[cfg(feature = "etcd")]
pub mod etcd_store;
#[cfg(feature = "redis")]
pub mod redis_store;

// Re-export main types
pub use config::{EtcdStoreConfig, EtcdStoreConfigBuilder, RedisStoreConfig, RedisStoreConfigBuilder};
pub use error::{CoordinationError, CoordinationResult};
pub use memory::MemoryCoordinationStore;
pub use store::{effective_ttl, CoordinationStore, KeySpace, DEFAULT_BINDING_TTL, DEFAULT_KEY_PREFIX};

#[cfg(feature = "etcd")]
pub use etcd_store::EtcdCoordinationStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisCoordinationStore;
