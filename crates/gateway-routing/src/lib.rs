//! # Gateway Routing
//!
//! Traffic routing for the LLM traffic router.
//!
//! This crate provides:
//! - Label selector evaluation partitioning the instance pool per branch
//! - Load balancing primitives (shared round robin, consistent hash, smooth weighted round robin)
//! - Priority and weighted branch selection
//! - Sticky sessions backed by the coordination store
//! - The routing engine tying it together, with a per-decision trace

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod binding;
pub mod candidate;
pub mod error;
pub mod health;
pub mod load_balancer;
pub mod router;
pub mod selector;
pub mod strategy;
pub mod trace;

// Re-export main types
pub use binding::BindingTarget;
pub use candidate::{build_candidates, BranchCandidate};
pub use error::{RoutingError, RoutingResult};
pub use health::{HealthFilter, PassThroughHealth};
pub use load_balancer::{
    consistent_hash_index, round_robin_index, SmoothWeightedRoundRobin, SwrrRegistry, WeightedItem,
};
pub use router::{RouteDecision, RoutingEngine, RoutingEngineBuilder};
pub use selector::{match_instances, matches_selector};
pub use strategy::SelectionContext;
pub use trace::RouteTrace;
