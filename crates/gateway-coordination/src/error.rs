//! Error types for coordination store operations.

use std::time::Duration;
use thiserror::Error;

/// Result type for coordination store operations
pub type CoordinationResult<T> = Result<T, CoordinationError>;

/// Errors returned by coordination store backends
///
/// A missing or expired binding is not an error; it is reported as
/// `Ok(None)` by [`crate::CoordinationStore::get_binding`].
#[derive(Debug, Error)]
pub enum CoordinationError {
    /// Could not reach the backend
    #[error("coordination store connection error: {0}")]
    Connection(String),

    /// The backend rejected or failed an operation
    #[error("coordination store backend error: {0}")]
    Backend(String),

    /// Operation did not finish in time
    #[error("coordination store operation timeout after {0:?}")]
    Timeout(Duration),

    /// Optimistic counter update kept losing the race
    #[error("coordination counter {key} still conflicting after {attempts} attempts")]
    Conflict {
        /// Counter key
        key: String,
        /// Attempts made
        attempts: u32,
    },

    /// Invalid backend configuration
    #[error("coordination store configuration error: {0}")]
    Config(String),
}

impl CoordinationError {
    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if the error is transient (a later call may succeed)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Timeout(_) | Self::Conflict { .. }
        )
    }
}
