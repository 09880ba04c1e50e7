//! # Gateway Telemetry
//!
//! Observability for the LLM traffic router.
//!
//! This crate provides:
//! - Structured logging setup (pretty, compact or JSON output)
//! - Prometheus metrics for routing decisions

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

// Re-export main types
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::RoutingMetrics;
