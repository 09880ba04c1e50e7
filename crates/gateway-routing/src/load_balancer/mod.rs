//! Load balancing primitives.
//!
//! - [`round_robin_index`]: rotation driven by a shared coordination counter
//! - [`consistent_hash_index`]: deterministic key-to-slot mapping
//! - [`SmoothWeightedRoundRobin`]: in-process weighted interleaving

mod consistent_hash;
mod round_robin;
mod swrr;

pub use consistent_hash::consistent_hash_index;
pub use round_robin::round_robin_index;
pub use swrr::{SmoothWeightedRoundRobin, SwrrRegistry, WeightedItem};
