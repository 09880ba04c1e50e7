//! Telemetry errors.

use thiserror::Error;

/// Result type for telemetry setup
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Telemetry initialization error
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to install the global subscriber
    #[error("failed to initialize logging: {0}")]
    Init(String),

    /// Invalid filter directive
    #[error("invalid log filter: {0}")]
    Filter(String),

    /// Failed to create or register a metric
    #[error("metrics registration failed: {0}")]
    Metrics(#[from] prometheus::Error),
}
