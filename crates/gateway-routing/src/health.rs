//! Instance health filtering.

use gateway_core::SharedInstance;

/// Removes instances that should not receive traffic
///
/// Applied to each branch's matched instances before selection. A branch
/// left with nothing is skipped. Implementations must be cheap; they run
/// on every routing call.
pub trait HealthFilter: Send + Sync {
    /// Keep the instances that may receive traffic, preserving order
    fn filter(&self, instances: Vec<SharedInstance>) -> Vec<SharedInstance>;
}

impl<F> HealthFilter for F
where
    F: Fn(Vec<SharedInstance>) -> Vec<SharedInstance> + Send + Sync,
{
    fn filter(&self, instances: Vec<SharedInstance>) -> Vec<SharedInstance> {
        self(instances)
    }
}

/// Filter that keeps every instance
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughHealth;

impl HealthFilter for PassThroughHealth {
    fn filter(&self, instances: Vec<SharedInstance>) -> Vec<SharedInstance> {
        instances
    }
}
