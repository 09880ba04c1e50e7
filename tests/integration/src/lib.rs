//! Integration tests for the LLM traffic router
//!
//! This crate covers cross-crate behavior:
//! - Weighted and priority routing end to end
//! - Sticky sessions, including rebinding and expiry
//! - Several engines sharing one coordination store, as a fleet would
//! - Bootstrapping from configuration

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items
pub use fixtures::*;
pub use helpers::*;

#[cfg(test)]
mod bootstrap_tests;
#[cfg(test)]
mod routing_tests;
#[cfg(test)]
mod sticky_tests;
#[cfg(test)]
mod store_tests;
