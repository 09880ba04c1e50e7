//! Error types for policy definitions.

use thiserror::Error;

/// Result type for policy operations
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Errors raised while interpreting a policy group definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// The group mode is not one of the supported modes
    #[error("unsupported policy mode: {0}")]
    UnsupportedMode(String),

    /// The branch strategy is not one of the supported strategies
    #[error("unsupported branch strategy: {0}")]
    UnsupportedStrategy(String),

    /// The policy definition is structurally invalid
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
}

impl PolicyError {
    /// Create an invalid policy error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidPolicy(message.into())
    }

    /// Check if this error comes from an unknown mode or strategy name
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedMode(_) | Self::UnsupportedStrategy(_))
    }
}
