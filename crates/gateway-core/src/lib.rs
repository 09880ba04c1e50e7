//! # Gateway Core
//!
//! Core types shared by the LLM traffic router.
//!
//! This crate provides the data model every other crate consumes:
//! - Policy groups and their branches (mode, strategy, weight, priority)
//! - Label selectors and case-insensitive label sets
//! - Routable model instances
//! - Route requests and their metadata
//! - Policy parsing errors

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod instance;
pub mod labels;
pub mod policy;
pub mod request;

// Re-export commonly used types
pub use error::{PolicyError, PolicyResult};
pub use instance::{ModelInstance, RoutingModelInstance, SharedInstance};
pub use labels::{eq_ignore_case, LabelOperator, LabelRequirement, LabelSelector, Labels, RequirementKind};
pub use policy::{
    BranchStrategy, PolicyBranch, PolicyGroup, PolicyMode, DEFAULT_BRANCH_PRIORITY,
    MIN_BRANCH_WEIGHT,
};
pub use request::{RequestMetadata, RouteRequest, HEADER_KEY_PREFIX};
