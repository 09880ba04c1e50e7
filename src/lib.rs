//! # LLM Traffic Router
//!
//! Traffic-routing core for a multi-tenant LLM gateway.
//!
//! Given a request, a policy group and the instance pool visible to the
//! client, the router picks exactly one instance, honoring weighted and
//! priority branches, label selectors and sticky sessions. Gateway
//! replicas coordinate through a shared store (in-memory, Redis or etcd).
//!
//! ## Usage
//!
//! ```no_run
//! use llm_traffic_router::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = RoutingConfig::from_yaml_str("coordination:\n  backend: memory\n")?;
//! config.apply_env_overrides()?;
//! let engine = llm_traffic_router::bootstrap::build_engine(&config).await?;
//!
//! let group = PolicyGroup::new("chat", "tenant-a", PolicyMode::Weighted)
//!     .with_branch(PolicyBranch::new("primary").with_weight(3))
//!     .with_branch(PolicyBranch::new("canary").with_weight(1));
//! let request = RouteRequest::new("tenant-a", group)
//!     .with_instance(RoutingModelInstance::new(ModelInstance::new("gpt-4o-east"), Labels::new()));
//!
//! let decision = engine.route(&request).await?;
//! println!("{} via {}", decision.instance.id(), decision.trace.branch_name);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bootstrap;

pub use gateway_config as config;
pub use gateway_coordination as coordination;
pub use gateway_core as core;
pub use gateway_routing as routing;
pub use gateway_telemetry as telemetry;

pub use bootstrap::{build_engine, build_engine_with_metrics, connect_store, BootstrapError, BootstrapResult};

/// Commonly used types
pub mod prelude {
    pub use gateway_config::{BackendKind, RoutingConfig};
    pub use gateway_coordination::{CoordinationStore, MemoryCoordinationStore};
    pub use gateway_core::{
        BranchStrategy, LabelRequirement, LabelSelector, Labels, ModelInstance, PolicyBranch,
        PolicyGroup, PolicyMode, RequestMetadata, RouteRequest, RoutingModelInstance,
        SharedInstance,
    };
    pub use gateway_routing::{
        HealthFilter, PassThroughHealth, RouteDecision, RouteTrace, RoutingEngine, RoutingError,
    };
}
