//! # Gateway Config
//!
//! Deployment configuration for the LLM traffic router.
//!
//! This crate provides:
//! - Coordination backend selection (memory, Redis, etcd) and timeouts
//! - Sticky session settings
//! - Logging settings
//! - YAML / TOML parsing, environment overrides and validation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod env;
pub mod error;

// Re-export main types
pub use config::{
    BackendKind, CoordinationSettings, EtcdSettings, LoggingSettings, RedisSettings,
    RoutingConfig, StickySettings,
};
pub use error::{ConfigError, ConfigResult};
