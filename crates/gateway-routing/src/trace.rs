//! Per-decision route trace.

use gateway_core::{BranchStrategy, PolicyBranch, PolicyGroup, PolicyMode};
use serde::Serialize;

/// What the engine did to reach a decision
///
/// Serializable so callers can attach it to audit logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteTrace {
    /// Client identifier
    pub client_id: String,
    /// Policy group name
    pub group_name: String,
    /// Branch selection mode of the group
    pub mode: PolicyMode,
    /// Sticky key declared by the group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticky_key: Option<String>,
    /// A sticky value was present, so a binding lookup was made
    pub sticky_attempted: bool,
    /// An existing binding was honored
    pub sticky_hit: bool,
    /// A lookup was made but no usable binding was found
    pub sticky_fallback: bool,
    /// Chosen branch
    pub branch_name: String,
    /// Effective weight of the chosen branch
    pub branch_weight: u32,
    /// Effective priority of the chosen branch
    pub branch_priority: u32,
    /// Instance strategy of the chosen branch
    pub branch_strategy: BranchStrategy,
    /// Chosen instance
    pub instance_id: String,
}

impl RouteTrace {
    pub(crate) fn new(client_id: &str, group: &PolicyGroup, branch: &PolicyBranch, instance_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            group_name: group.name.clone(),
            mode: group.mode,
            sticky_key: group.sticky_key().map(str::to_string),
            sticky_attempted: false,
            sticky_hit: false,
            sticky_fallback: false,
            branch_name: branch.name.clone(),
            branch_weight: branch.effective_weight(),
            branch_priority: branch.effective_priority(),
            branch_strategy: branch.strategy,
            instance_id: instance_id.to_string(),
        }
    }

    pub(crate) fn with_sticky(mut self, outcome: StickyOutcome) -> Self {
        match outcome {
            StickyOutcome::NotAttempted => {}
            StickyOutcome::Hit => {
                self.sticky_attempted = true;
                self.sticky_hit = true;
            }
            StickyOutcome::Fallback => {
                self.sticky_attempted = true;
                self.sticky_fallback = true;
            }
        }
        self
    }

    /// Sticky outcome as a metrics label: `none`, `hit` or `fallback`
    #[must_use]
    pub fn sticky_label(&self) -> &'static str {
        if self.sticky_hit {
            "hit"
        } else if self.sticky_fallback {
            "fallback"
        } else {
            "none"
        }
    }
}

/// Result of the sticky lookup step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StickyOutcome {
    NotAttempted,
    Hit,
    Fallback,
}
