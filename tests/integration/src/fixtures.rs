//! Policy groups and instance pools used across scenarios

use gateway_core::{
    BranchStrategy, LabelRequirement, LabelSelector, Labels, ModelInstance, PolicyBranch,
    PolicyGroup, PolicyMode, RequestMetadata, RoutingModelInstance, SharedInstance,
};

/// Client used by every scenario
pub const TENANT: &str = "tenant-a";

/// Sticky key declared by sticky fixtures
pub const SESSION_HEADER: &str = "header.X-Session-Id";

/// Instance labelled with a pool, region and model
pub fn instance(id: &str, pool: &str, region: &str) -> SharedInstance {
    let labels: Labels = [("pool", pool), ("region", region), ("model", "gpt-4o")]
        .into_iter()
        .collect();
    RoutingModelInstance::new(
        ModelInstance::new(id)
            .with_model("gpt-4o")
            .with_provider("openai")
            .with_endpoint(format!("https://{id}.internal/v1")),
        labels,
    )
    .shared()
}

/// Branch selecting one pool
pub fn pool_branch(name: &str, pool: &str) -> PolicyBranch {
    PolicyBranch::new(name).with_selector(LabelSelector::new(vec![LabelRequirement::in_values(
        "pool",
        [pool],
    )]))
}

/// Pool with `per_pool` instances in each named pool
pub fn pool_of(pools: &[&str], per_pool: usize) -> Vec<SharedInstance> {
    pools
        .iter()
        .flat_map(|pool| {
            (0..per_pool).map(move |i| instance(&format!("{pool}-{i}"), pool, "us-east"))
        })
        .collect()
}

/// Weighted group: `stable` weight 3, `canary` weight 1
pub fn canary_group() -> PolicyGroup {
    PolicyGroup::new("chat", TENANT, PolicyMode::Weighted)
        .with_branch(pool_branch("stable", "stable").with_weight(3))
        .with_branch(pool_branch("canary", "canary").with_weight(1))
}

/// Priority group: two primaries sharing tier 1, a backup at tier 2
pub fn failover_group() -> PolicyGroup {
    PolicyGroup::new("completions", TENANT, PolicyMode::Priority)
        .with_branch(pool_branch("east", "east").with_priority(1))
        .with_branch(pool_branch("west", "west").with_priority(1))
        .with_branch(pool_branch("backup", "backup").with_priority(2))
}

/// Weighted single-branch group keyed on a session header
pub fn sticky_group(strategy: BranchStrategy) -> PolicyGroup {
    PolicyGroup::new("assistants", TENANT, PolicyMode::Weighted)
        .with_sticky_key(SESSION_HEADER)
        .with_branch(pool_branch("primary", "primary").with_strategy(strategy))
}

/// Metadata carrying a session id under the bare header name
pub fn session(id: &str) -> RequestMetadata {
    RequestMetadata::new().with("X-Session-Id", id)
}
