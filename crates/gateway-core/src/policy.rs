//! Policy groups and branches.
//!
//! A policy group is owned by an external management surface and is
//! read-only to the router. It names a selection mode, an optional sticky
//! key, and an ordered list of branches. Each branch partitions the
//! instance pool with a label selector and carries the weight, priority
//! and strategy used once it has been chosen.

use crate::error::PolicyError;
use crate::labels::LabelSelector;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Priority used for branches that declare priority `0`
pub const DEFAULT_BRANCH_PRIORITY: u32 = 100;

/// Smallest weight a branch is given during selection
pub const MIN_BRANCH_WEIGHT: u32 = 1;

/// How a group chooses among its candidate branches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PolicyMode {
    /// Smooth weighted round robin over branch weights
    Weighted,
    /// Lowest priority tier first, round robin inside a tier
    Priority,
}

impl PolicyMode {
    /// Canonical name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weighted => "weighted",
            Self::Priority => "priority",
        }
    }
}

impl FromStr for PolicyMode {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weighted" | "weight" => Ok(Self::Weighted),
            "priority" => Ok(Self::Priority),
            other => Err(PolicyError::UnsupportedMode(other.to_string())),
        }
    }
}

impl TryFrom<String> for PolicyMode {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PolicyMode> for String {
    fn from(mode: PolicyMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an instance is chosen inside a branch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BranchStrategy {
    /// Shared-counter rotation across the branch's instances
    #[default]
    RoundRobin,
    /// Hash of the sticky routing key
    ConsistentHash,
}

impl BranchStrategy {
    /// Canonical name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::ConsistentHash => "consistent_hash",
        }
    }
}

impl FromStr for BranchStrategy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "round_robin" | "roundrobin" | "rr" => Ok(Self::RoundRobin),
            "consistent_hash" | "consistenthash" | "hash" => Ok(Self::ConsistentHash),
            other => Err(PolicyError::UnsupportedStrategy(other.to_string())),
        }
    }
}

impl TryFrom<String> for BranchStrategy {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BranchStrategy> for String {
    fn from(strategy: BranchStrategy) -> Self {
        strategy.as_str().to_string()
    }
}

impl fmt::Display for BranchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named rule inside a policy group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyBranch {
    /// Branch name, unique within its group
    pub name: String,

    /// Label selector; `None` matches every instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,

    /// Relative weight for weighted mode
    #[serde(default)]
    pub weight: u32,

    /// Priority tier for priority mode (lower wins)
    #[serde(default)]
    pub priority: u32,

    /// Instance selection strategy
    #[serde(default)]
    pub strategy: BranchStrategy,
}

impl PolicyBranch {
    /// Create a branch that matches every instance
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: None,
            weight: MIN_BRANCH_WEIGHT,
            priority: 0,
            strategy: BranchStrategy::RoundRobin,
        }
    }

    /// Set the selector
    #[must_use]
    pub fn with_selector(mut self, selector: LabelSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Set the weight
    #[must_use]
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Set the priority
    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the strategy
    #[must_use]
    pub fn with_strategy(mut self, strategy: BranchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Weight used during selection, never below [`MIN_BRANCH_WEIGHT`]
    #[must_use]
    pub fn effective_weight(&self) -> u32 {
        self.weight.max(MIN_BRANCH_WEIGHT)
    }

    /// Priority used during selection; `0` means [`DEFAULT_BRANCH_PRIORITY`]
    #[must_use]
    pub fn effective_priority(&self) -> u32 {
        if self.priority == 0 {
            DEFAULT_BRANCH_PRIORITY
        } else {
            self.priority
        }
    }
}

/// Routing policy for one route of one client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyGroup {
    /// Group name
    pub name: String,

    /// Client that owns the group
    pub client_id: String,

    /// Branch selection mode
    pub mode: PolicyMode,

    /// Request metadata key whose value pins a session (may be `header.`-prefixed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticky_key: Option<String>,

    /// Ordered branches
    #[serde(default)]
    pub branches: Vec<PolicyBranch>,
}

impl PolicyGroup {
    /// Create an empty group
    pub fn new(name: impl Into<String>, client_id: impl Into<String>, mode: PolicyMode) -> Self {
        Self {
            name: name.into(),
            client_id: client_id.into(),
            mode,
            sticky_key: None,
            branches: Vec::new(),
        }
    }

    /// Set the sticky key
    #[must_use]
    pub fn with_sticky_key(mut self, key: impl Into<String>) -> Self {
        self.sticky_key = Some(key.into());
        self
    }

    /// Append a branch
    #[must_use]
    pub fn with_branch(mut self, branch: PolicyBranch) -> Self {
        self.branches.push(branch);
        self
    }

    /// Find a branch by name
    #[must_use]
    pub fn branch(&self, name: &str) -> Option<&PolicyBranch> {
        self.branches.iter().find(|b| b.name == name)
    }

    /// Sticky key with surrounding whitespace removed, if any is configured
    #[must_use]
    pub fn sticky_key(&self) -> Option<&str> {
        self.sticky_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Check structural invariants: non-empty name, unique non-empty branch names
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.name.trim().is_empty() {
            return Err(PolicyError::invalid("policy group name is empty"));
        }

        let mut seen = HashSet::new();
        for branch in &self.branches {
            if branch.name.trim().is_empty() {
                return Err(PolicyError::invalid(format!(
                    "policy group {} has a branch without a name",
                    self.name
                )));
            }
            if !seen.insert(branch.name.as_str()) {
                return Err(PolicyError::invalid(format!(
                    "policy group {} has duplicate branch {}",
                    self.name, branch.name
                )));
            }
        }

        Ok(())
    }
}
