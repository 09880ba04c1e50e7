//! Prometheus metrics for routing decisions.

use crate::error::TelemetryResult;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::time::Duration;

const DECISION_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Routing metrics, registered into a caller-owned registry
#[derive(Debug, Clone)]
pub struct RoutingMetrics {
    decisions: IntCounterVec,
    failures: IntCounterVec,
    binding_write_failures: IntCounterVec,
    decision_duration: HistogramVec,
}

impl RoutingMetrics {
    /// Create the metrics and register them into `registry`
    ///
    /// # Errors
    /// Returns error if a metric with the same name is already registered
    pub fn new(registry: &Registry) -> TelemetryResult<Self> {
        let decisions = IntCounterVec::new(
            Opts::new("routing_decisions_total", "Routing decisions made"),
            &["group", "branch", "mode", "sticky"],
        )?;
        let failures = IntCounterVec::new(
            Opts::new("routing_failures_total", "Routing calls that returned an error"),
            &["group", "reason"],
        )?;
        let binding_write_failures = IntCounterVec::new(
            Opts::new(
                "routing_binding_write_failures_total",
                "Sticky binding writes that failed and were skipped",
            ),
            &["group"],
        )?;
        let decision_duration = HistogramVec::new(
            HistogramOpts::new(
                "routing_decision_duration_seconds",
                "Time spent making a routing decision",
            )
            .buckets(DECISION_BUCKETS.to_vec()),
            &["group"],
        )?;

        registry.register(Box::new(decisions.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(binding_write_failures.clone()))?;
        registry.register(Box::new(decision_duration.clone()))?;

        Ok(Self {
            decisions,
            failures,
            binding_write_failures,
            decision_duration,
        })
    }

    /// Record a successful decision
    pub fn record_decision(&self, group: &str, branch: &str, mode: &str, sticky: &str, elapsed: Duration) {
        self.decisions
            .with_label_values(&[group, branch, mode, sticky])
            .inc();
        self.decision_duration
            .with_label_values(&[group])
            .observe(elapsed.as_secs_f64());
    }

    /// Record a failed decision
    pub fn record_failure(&self, group: &str, reason: &str, elapsed: Duration) {
        self.failures.with_label_values(&[group, reason]).inc();
        self.decision_duration
            .with_label_values(&[group])
            .observe(elapsed.as_secs_f64());
    }

    /// Record a sticky binding write that failed
    pub fn record_binding_write_failure(&self, group: &str) {
        self.binding_write_failures.with_label_values(&[group]).inc();
    }

    /// Decisions counted for the given labels
    #[must_use]
    pub fn decision_count(&self, group: &str, branch: &str, mode: &str, sticky: &str) -> u64 {
        self.decisions
            .with_label_values(&[group, branch, mode, sticky])
            .get()
    }

    /// Failures counted for the given labels
    #[must_use]
    pub fn failure_count(&self, group: &str, reason: &str) -> u64 {
        self.failures.with_label_values(&[group, reason]).get()
    }

    /// Binding write failures counted for a group
    #[must_use]
    pub fn binding_write_failure_count(&self, group: &str) -> u64 {
        self.binding_write_failures.with_label_values(&[group]).get()
    }
}
