//! Error types for routing decisions.

use gateway_coordination::CoordinationError;
use gateway_core::PolicyError;
use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Result type for routing operations
pub type RoutingResult<T> = Result<T, RoutingError>;

/// Errors returned by the routing engine
#[derive(Debug, Error)]
pub enum RoutingError {
    /// No branch of the group has a matching, healthy instance
    #[error("no available branch in policy group {group}")]
    NoAvailableBranch {
        /// Policy group name
        group: String,
    },

    /// The chosen branch has no instance left
    #[error("no available instance in branch {branch} of policy group {group}")]
    NoAvailableInstance {
        /// Policy group name
        group: String,
        /// Branch name
        branch: String,
    },

    /// Malformed request input
    #[error("invalid route request: {0}")]
    InvalidRequest(String),

    /// Round robin asked to rotate over nothing
    #[error("round robin over an empty set (counter {key})")]
    EmptyRotation {
        /// Counter key
        key: String,
    },

    /// Policy definition error (unsupported mode or strategy, invalid group)
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Coordination store failure, propagated as-is
    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    /// The caller cancelled the decision
    #[error("routing decision cancelled")]
    Cancelled,
}

impl RoutingError {
    /// Create a no-available-branch error
    pub fn no_available_branch(group: impl Into<String>) -> Self {
        Self::NoAvailableBranch {
            group: group.into(),
        }
    }

    /// Create a no-available-instance error
    pub fn no_available_instance(group: impl Into<String>, branch: impl Into<String>) -> Self {
        Self::NoAvailableInstance {
            group: group.into(),
            branch: branch.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Check for the no-available-branch condition
    pub fn is_no_available_branch(&self) -> bool {
        matches!(self, Self::NoAvailableBranch { .. })
    }

    /// Check for the no-available-instance condition
    pub fn is_no_available_instance(&self) -> bool {
        matches!(self, Self::NoAvailableInstance { .. })
    }

    /// Expected outcome the caller can recover from (e.g. by answering 503)
    pub fn is_recoverable(&self) -> bool {
        self.is_no_available_branch() || self.is_no_available_instance()
    }

    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoAvailableBranch { .. } => "no_branch",
            Self::NoAvailableInstance { .. } => "no_instance",
            Self::InvalidRequest(_) | Self::EmptyRotation { .. } => "invalid",
            Self::Policy(_) => "policy",
            Self::Coordination(_) => "store",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Await a coordination store call unless `cancel` fires first
///
/// Dropping the losing store future aborts the in-flight operation.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> RoutingResult<T>
where
    F: Future<Output = Result<T, CoordinationError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(RoutingError::Cancelled),
        result = fut => result.map_err(RoutingError::from),
    }
}
