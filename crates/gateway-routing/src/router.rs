//! The routing engine.
//!
//! One call of [`RoutingEngine::route`] turns a [`RouteRequest`] into a
//! single instance:
//!
//! 1. sort the pool by instance id so index-based picks are reproducible
//! 2. build branch candidates (selector, then health filter)
//! 3. honor an existing sticky binding if its branch and instance survive
//! 4. otherwise pick a branch (priority tiers or weighted SWRR)
//! 5. pick an instance in that branch (consistent hash or round robin)
//! 6. persist the binding for sticky requests, best effort
//!
//! The engine holds no lock across a call. Counters and bindings live in
//! the coordination store; the SWRR sequencers live in a registry owned by
//! the engine and dropped with it.

use crate::binding::{binding_key, BindingTarget};
use crate::candidate::{build_candidates, BranchCandidate};
use crate::error::{cancellable, RoutingError, RoutingResult};
use crate::health::{HealthFilter, PassThroughHealth};
use crate::load_balancer::SwrrRegistry;
use crate::strategy::SelectionContext;
use crate::trace::{RouteTrace, StickyOutcome};
use gateway_coordination::{effective_ttl, CoordinationStore, DEFAULT_BINDING_TTL};
use gateway_core::{RouteRequest, SharedInstance};
use gateway_telemetry::RoutingMetrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Outcome of a routing call
#[derive(Debug, Clone)]
pub struct RouteDecision {
    /// Chosen instance
    pub instance: SharedInstance,
    /// How the engine got there
    pub trace: RouteTrace,
}

/// Policy-group routing engine
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct RoutingEngine {
    store: Arc<dyn CoordinationStore>,
    health: Arc<dyn HealthFilter>,
    sequencers: SwrrRegistry,
    binding_ttl: Duration,
    metrics: Option<RoutingMetrics>,
}

impl RoutingEngine {
    /// Engine with default settings over `store`
    #[must_use]
    pub fn new(store: Arc<dyn CoordinationStore>) -> Self {
        Self::builder(store).build()
    }

    /// Start building an engine over `store`
    #[must_use]
    pub fn builder(store: Arc<dyn CoordinationStore>) -> RoutingEngineBuilder {
        RoutingEngineBuilder::new(store)
    }

    /// Coordination store in use
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CoordinationStore> {
        &self.store
    }

    /// Process-local weighted sequencers
    #[must_use]
    pub fn sequencers(&self) -> &SwrrRegistry {
        &self.sequencers
    }

    /// Expiry applied to new sticky bindings
    #[must_use]
    pub fn binding_ttl(&self) -> Duration {
        self.binding_ttl
    }

    /// Route a request
    ///
    /// # Errors
    /// See [`RoutingEngine::route_with_cancellation`]
    pub async fn route(&self, request: &RouteRequest) -> RoutingResult<RouteDecision> {
        self.route_with_cancellation(request, &CancellationToken::new())
            .await
    }

    /// Route a request, aborting in-flight store calls when `cancel` fires
    ///
    /// The binding write of a fresh sticky decision completes before this
    /// returns, so a slow store adds up to its operation timeout to the
    /// first call of each session. Later calls on the same store see the
    /// binding right away. A failed or cancelled write is logged and
    /// swallowed; the decision is still returned.
    ///
    /// # Errors
    /// - [`RoutingError::InvalidRequest`] for an empty client id or group name
    /// - [`RoutingError::Policy`] for a structurally invalid group
    /// - [`RoutingError::NoAvailableBranch`] / [`RoutingError::NoAvailableInstance`]
    ///   when nothing can serve the request
    /// - [`RoutingError::Coordination`] for store failures (binding writes excepted)
    /// - [`RoutingError::Cancelled`] when `cancel` fires first
    #[instrument(
        name = "route",
        skip_all,
        fields(client = %request.client_id, group = %request.group.name)
    )]
    pub async fn route_with_cancellation(
        &self,
        request: &RouteRequest,
        cancel: &CancellationToken,
    ) -> RoutingResult<RouteDecision> {
        let started = Instant::now();
        let result = self.decide(request, cancel).await;
        let elapsed = started.elapsed();
        let group = request.group.name.as_str();

        match &result {
            Ok(decision) => {
                debug!(
                    branch = %decision.trace.branch_name,
                    instance = %decision.trace.instance_id,
                    sticky = decision.trace.sticky_label(),
                    elapsed_us = elapsed.as_micros() as u64,
                    "Route decided"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_decision(
                        group,
                        &decision.trace.branch_name,
                        decision.trace.mode.as_str(),
                        decision.trace.sticky_label(),
                        elapsed,
                    );
                }
            }
            Err(e) => {
                if e.is_recoverable() || matches!(e, RoutingError::Cancelled) {
                    debug!(error = %e, "Route failed");
                } else {
                    warn!(error = %e, "Route failed");
                }
                if let Some(metrics) = &self.metrics {
                    metrics.record_failure(group, e.kind(), elapsed);
                }
            }
        }

        result
    }

    async fn decide(
        &self,
        request: &RouteRequest,
        cancel: &CancellationToken,
    ) -> RoutingResult<RouteDecision> {
        let group = request.group.as_ref();
        let client_id = request.client_id.trim();
        if client_id.is_empty() {
            return Err(RoutingError::invalid_request("client id is empty"));
        }
        if group.name.trim().is_empty() {
            return Err(RoutingError::invalid_request("policy group name is empty"));
        }
        group.validate()?;

        let mut pool = request.instances.clone();
        pool.sort_by(|a, b| a.id().cmp(b.id()));

        let candidates = build_candidates(group, &pool, self.health.as_ref());
        if candidates.is_empty() {
            return Err(RoutingError::no_available_branch(&group.name));
        }

        let sticky_value = request.sticky_value();
        let bkey = binding_key(client_id, &group.name);

        let mut sticky = StickyOutcome::NotAttempted;
        if let Some(value) = sticky_value {
            let stored = cancellable(cancel, self.store.get_binding(&bkey, value)).await?;
            if let Some((candidate, instance)) = stored
                .as_deref()
                .and_then(|raw| resolve_binding(raw, &candidates))
            {
                let trace = RouteTrace::new(client_id, group, candidate.branch, instance.id())
                    .with_sticky(StickyOutcome::Hit);
                return Ok(RouteDecision { instance, trace });
            }
            sticky = StickyOutcome::Fallback;
        }

        let ctx = SelectionContext {
            store: self.store.as_ref(),
            sequencers: &self.sequencers,
            cancel,
            client_id,
            group,
        };
        let candidate = ctx.select_branch(&candidates).await?;
        let instance = ctx.select_instance(candidate, sticky_value).await?;

        if let Some(value) = sticky_value {
            self.write_binding(&group.name, &bkey, value, candidate, &instance, cancel)
                .await;
        }

        let trace =
            RouteTrace::new(client_id, group, candidate.branch, instance.id()).with_sticky(sticky);
        Ok(RouteDecision { instance, trace })
    }

    async fn write_binding(
        &self,
        group_name: &str,
        bkey: &str,
        sticky_value: &str,
        candidate: &BranchCandidate<'_>,
        instance: &SharedInstance,
        cancel: &CancellationToken,
    ) {
        let target = BindingTarget::new(candidate.name(), instance.id()).encode();
        let write = self
            .store
            .set_binding(bkey, sticky_value, &target, self.binding_ttl);

        if let Err(e) = cancellable(cancel, write).await {
            warn!(
                binding_key = %bkey,
                backend = self.store.name(),
                error = %e,
                "Sticky binding write failed, continuing without it"
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_binding_write_failure(group_name);
            }
        }
    }
}

/// Candidate and instance a stored binding still points at
fn resolve_binding<'c, 'b>(
    raw: &str,
    candidates: &'c [BranchCandidate<'b>],
) -> Option<(&'c BranchCandidate<'b>, SharedInstance)> {
    let Some(target) = BindingTarget::decode(raw) else {
        warn!("Stored sticky binding is malformed, ignoring it");
        return None;
    };

    let found = candidates
        .iter()
        .find(|c| c.branch.name == target.branch)
        .and_then(|c| {
            c.instances
                .iter()
                .find(|i| i.id() == target.instance)
                .map(|i| (c, Arc::clone(i)))
        });

    if found.is_none() {
        debug!(
            branch = %target.branch,
            instance = %target.instance,
            "Bound target no longer available"
        );
    }
    found
}

impl std::fmt::Debug for RoutingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingEngine")
            .field("store", &self.store.name())
            .field("sequencers", &self.sequencers.len())
            .field("binding_ttl", &self.binding_ttl)
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`RoutingEngine`]
pub struct RoutingEngineBuilder {
    store: Arc<dyn CoordinationStore>,
    health: Arc<dyn HealthFilter>,
    binding_ttl: Duration,
    metrics: Option<RoutingMetrics>,
}

impl RoutingEngineBuilder {
    fn new(store: Arc<dyn CoordinationStore>) -> Self {
        Self {
            store,
            health: Arc::new(PassThroughHealth),
            binding_ttl: DEFAULT_BINDING_TTL,
            metrics: None,
        }
    }

    /// Set the health filter applied to each branch's instances
    #[must_use]
    pub fn health_filter(mut self, filter: impl HealthFilter + 'static) -> Self {
        self.health = Arc::new(filter);
        self
    }

    /// Set a shared health filter
    #[must_use]
    pub fn shared_health_filter(mut self, filter: Arc<dyn HealthFilter>) -> Self {
        self.health = filter;
        self
    }

    /// Set the sticky binding expiry; zero means the default
    #[must_use]
    pub fn binding_ttl(mut self, ttl: Duration) -> Self {
        self.binding_ttl = effective_ttl(ttl);
        self
    }

    /// Record metrics
    #[must_use]
    pub fn metrics(mut self, metrics: RoutingMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the engine
    #[must_use]
    pub fn build(self) -> RoutingEngine {
        debug!(
            backend = self.store.name(),
            distributed = self.store.is_distributed(),
            binding_ttl = ?self.binding_ttl,
            "Routing engine created"
        );
        RoutingEngine {
            store: self.store,
            health: self.health,
            sequencers: SwrrRegistry::new(),
            binding_ttl: self.binding_ttl,
            metrics: self.metrics,
        }
    }
}

impl std::fmt::Debug for RoutingEngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingEngineBuilder")
            .field("store", &self.store.name())
            .field("binding_ttl", &self.binding_ttl)
            .finish_non_exhaustive()
    }
}
