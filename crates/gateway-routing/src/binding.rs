//! Sticky binding payload.

use serde::{Deserialize, Serialize};

/// Branch and instance a sticky session is pinned to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingTarget {
    /// Branch name
    pub branch: String,
    /// Instance identifier
    pub instance: String,
}

impl BindingTarget {
    /// Create a target
    pub fn new(branch: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            instance: instance.into(),
        }
    }

    /// Encode for storage
    #[must_use]
    pub fn encode(&self) -> String {
        serde_json::json!({
            "branch": self.branch,
            "instance": self.instance,
        })
        .to_string()
    }

    /// Decode a stored value; anything malformed or incomplete is `None`
    #[must_use]
    pub fn decode(raw: &str) -> Option<Self> {
        serde_json::from_str::<Self>(raw)
            .ok()
            .filter(|target| !target.branch.is_empty() && !target.instance.is_empty())
    }
}

/// Binding key grouping sticky sessions of one client and policy group
#[must_use]
pub fn binding_key(client_id: &str, group_name: &str) -> String {
    format!("{client_id}:{group_name}")
}
