//! Per-branch candidate instances.

use crate::health::HealthFilter;
use crate::selector::match_instances;
use gateway_core::{PolicyBranch, PolicyGroup, SharedInstance};

/// A branch together with the healthy instances its selector matched
#[derive(Debug, Clone)]
pub struct BranchCandidate<'a> {
    /// Branch definition
    pub branch: &'a PolicyBranch,
    /// Matched healthy instances, in pool order; never empty
    pub instances: Vec<SharedInstance>,
}

impl BranchCandidate<'_> {
    /// Branch name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.branch.name
    }
}

/// Candidates for every branch of `group` that kept at least one instance
///
/// Branches keep their declaration order. `pool` should already be in a
/// stable order so that index-based selection is deterministic.
pub fn build_candidates<'a>(
    group: &'a PolicyGroup,
    pool: &[SharedInstance],
    health: &dyn HealthFilter,
) -> Vec<BranchCandidate<'a>> {
    group
        .branches
        .iter()
        .filter_map(|branch| {
            let matched = match_instances(pool, branch.selector.as_ref());
            if matched.is_empty() {
                return None;
            }
            let instances = health.filter(matched);
            if instances.is_empty() {
                return None;
            }
            Some(BranchCandidate { branch, instances })
        })
        .collect()
}
