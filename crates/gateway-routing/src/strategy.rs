//! Branch and instance selection.
//!
//! Priority tie-breaks and round-robin instance picks draw from the shared
//! coordination counter, so a fleet of routers rotates as one. Weighted
//! branch selection uses the process-local SWRR registry instead: each
//! replica converges on the configured ratio independently, without a
//! store round trip per decision.

use crate::candidate::BranchCandidate;
use crate::error::{RoutingError, RoutingResult};
use crate::load_balancer::{consistent_hash_index, round_robin_index, SwrrRegistry, WeightedItem};
use gateway_coordination::CoordinationStore;
use gateway_core::{BranchStrategy, PolicyGroup, PolicyMode, SharedInstance};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Everything selection needs for one routing call
#[derive(Clone, Copy)]
pub struct SelectionContext<'a> {
    /// Shared counters
    pub store: &'a dyn CoordinationStore,
    /// Process-local weighted sequencers
    pub sequencers: &'a SwrrRegistry,
    /// Cancellation of the enclosing call
    pub cancel: &'a CancellationToken,
    /// Client identifier
    pub client_id: &'a str,
    /// Policy group being routed
    pub group: &'a PolicyGroup,
}

impl SelectionContext<'_> {
    /// Pick a branch according to the group's mode
    ///
    /// # Errors
    /// [`RoutingError::NoAvailableBranch`] when `candidates` is empty; store
    /// and cancellation errors from priority tie-breaks.
    pub async fn select_branch<'c, 'b>(
        &self,
        candidates: &'c [BranchCandidate<'b>],
    ) -> RoutingResult<&'c BranchCandidate<'b>> {
        if candidates.is_empty() {
            return Err(RoutingError::no_available_branch(&self.group.name));
        }

        match self.group.mode {
            PolicyMode::Priority => self.select_priority_branch(candidates).await,
            PolicyMode::Weighted => self.select_weighted_branch(candidates),
        }
    }

    /// Lowest priority tier wins; ties rotate through the shared counter
    async fn select_priority_branch<'c, 'b>(
        &self,
        candidates: &'c [BranchCandidate<'b>],
    ) -> RoutingResult<&'c BranchCandidate<'b>> {
        let mut tiers: BTreeMap<u32, Vec<&'c BranchCandidate<'b>>> = BTreeMap::new();
        for candidate in candidates {
            tiers
                .entry(candidate.branch.effective_priority())
                .or_default()
                .push(candidate);
        }

        let Some((priority, tier)) = tiers.into_iter().find(|(_, tier)| !tier.is_empty()) else {
            return Err(RoutingError::no_available_branch(&self.group.name));
        };

        if tier.len() == 1 {
            return Ok(tier[0]);
        }

        let key = format!("rr:{}:{}:tier:{}", self.client_id, self.group.name, priority);
        let index = round_robin_index(self.store, &key, tier.len(), self.cancel).await?;
        debug!(
            group = %self.group.name,
            priority = priority,
            tied = tier.len(),
            index = index,
            "Priority tie broken"
        );
        Ok(tier[index])
    }

    /// Smooth weighted round robin over every candidate branch
    fn select_weighted_branch<'c, 'b>(
        &self,
        candidates: &'c [BranchCandidate<'b>],
    ) -> RoutingResult<&'c BranchCandidate<'b>> {
        let items: Vec<WeightedItem> = candidates
            .iter()
            .map(|c| WeightedItem::new(c.branch.name.clone(), c.branch.effective_weight()))
            .collect();

        let key = format!("{}:{}", self.client_id, self.group.name);
        self.sequencers
            .next(&key, &items)
            .and_then(|name| candidates.iter().find(|c| c.branch.name == name))
            .ok_or_else(|| RoutingError::no_available_branch(&self.group.name))
    }

    /// Pick an instance inside `candidate` according to its strategy
    ///
    /// With a sticky value present both strategies place the request by
    /// consistent hash, so a session lands on the same instance before its
    /// binding exists. Without one, `consistent_hash` has no key and
    /// degrades to round robin.
    ///
    /// # Errors
    /// [`RoutingError::NoAvailableInstance`] when the branch holds no
    /// instance; store and cancellation errors from round robin.
    pub async fn select_instance(
        &self,
        candidate: &BranchCandidate<'_>,
        sticky_value: Option<&str>,
    ) -> RoutingResult<SharedInstance> {
        let branch = candidate.branch;
        let instances = &candidate.instances;
        if instances.is_empty() {
            return Err(RoutingError::no_available_instance(&self.group.name, &branch.name));
        }

        let routing_key = sticky_value
            .filter(|v| !v.is_empty())
            .map(|v| format!("{}:{}:{}:{}", self.client_id, self.group.name, branch.name, v));

        let hashed = routing_key
            .as_deref()
            .and_then(|key| consistent_hash_index(key, instances.len()));

        let index = match (branch.strategy, hashed) {
            (BranchStrategy::ConsistentHash, Some(index)) => index,
            // Sticky requests stay on one instance under round robin too.
            (BranchStrategy::RoundRobin, Some(index)) => index,
            (BranchStrategy::ConsistentHash | BranchStrategy::RoundRobin, None) => {
                let key = format!("rr:{}:{}:branch:{}", self.client_id, self.group.name, branch.name);
                round_robin_index(self.store, &key, instances.len(), self.cancel).await?
            }
        };

        instances
            .get(index)
            .map(Arc::clone)
            .ok_or_else(|| RoutingError::no_available_instance(&self.group.name, &branch.name))
    }
}

impl std::fmt::Debug for SelectionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionContext")
            .field("store", &self.store.name())
            .field("client_id", &self.client_id)
            .field("group", &self.group.name)
            .finish_non_exhaustive()
    }
}
