//! Sticky session integration tests

use crate::fixtures::*;
use crate::helpers::*;
use gateway_core::{BranchStrategy, RequestMetadata, RouteRequest};
use gateway_routing::BindingTarget;
use gateway_coordination::CoordinationStore;
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::time::Duration;

fn sticky_request(session_id: &str) -> RouteRequest {
    RouteRequest::new(TENANT, sticky_group(BranchStrategy::RoundRobin))
        .with_instances(pool_of(&["primary"], 4))
        .with_metadata(session(session_id))
}

/// A session bound by one replica is honored by every other replica
#[tokio::test]
async fn test_session_pinned_across_replicas() {
    let fleet = Fleet::new(3);
    let request = sticky_request("sess-42");

    let first = fleet.replica(0).route(&request).await.expect("route should succeed");
    assert!(first.trace.sticky_attempted);
    assert!(first.trace.sticky_fallback);

    for index in [1, 2, 0, 1] {
        let decision = fleet.replica(index).route(&request).await.expect("route should succeed");
        assert_eq!(decision.instance.id(), first.instance.id());
        assert!(decision.trace.sticky_hit);
        assert!(!decision.trace.sticky_fallback);
    }

    assert_eq!(fleet.store.binding_writes(), 1);
    assert_eq!(fleet.store.counter_calls(), 0);
}

/// Both the prefixed and the bare header name resolve the sticky value
#[tokio::test]
async fn test_header_prefix_lookup() {
    let fleet = Fleet::new(1);
    let engine = fleet.replica(0);

    let bare = sticky_request("sess-7");
    let prefixed = sticky_request("ignored")
        .with_metadata(RequestMetadata::new().with("HEADER.x-session-id", "sess-7"));

    let first = engine.route(&bare).await.expect("route should succeed");
    let second = engine.route(&prefixed).await.expect("route should succeed");
    assert_eq!(second.instance.id(), first.instance.id());
    assert!(second.trace.sticky_hit);
}

/// A removed instance is replaced and the binding rewritten
#[tokio::test]
async fn test_rebind_after_instance_removed() {
    let fleet = Fleet::new(2);
    let request = sticky_request("sess-9");

    let first = fleet.replica(0).route(&request).await.expect("route should succeed");
    let survivors: Vec<_> = pool_of(&["primary"], 4)
        .into_iter()
        .filter(|i| i.id() != first.instance.id())
        .collect();
    let shrunk = request.clone().with_instances(survivors);

    let moved = fleet.replica(1).route(&shrunk).await.expect("route should succeed");
    assert_ne!(moved.instance.id(), first.instance.id());
    assert!(moved.trace.sticky_fallback);

    let raw = fleet
        .store
        .inner()
        .get_binding("tenant-a:assistants", "sess-9")
        .await
        .expect("read")
        .expect("binding present");
    assert_eq!(
        BindingTarget::decode(&raw),
        Some(BindingTarget::new("primary", moved.instance.id()))
    );

    let again = fleet.replica(0).route(&shrunk).await.expect("route should succeed");
    assert_eq!(again.instance.id(), moved.instance.id());
    assert!(again.trace.sticky_hit);
}

/// Expired bindings are misses; placement stays put thanks to hashing
#[tokio::test]
async fn test_binding_expiry() {
    let fleet = Fleet::with_binding_ttl(1, Duration::from_millis(200));
    let engine = fleet.replica(0);
    let request = sticky_request("sess-expiring");

    let first = engine.route(&request).await.expect("route should succeed");
    let pinned = engine.route(&request).await.expect("route should succeed");
    assert!(pinned.trace.sticky_hit);

    tokio::time::sleep(Duration::from_millis(350)).await;

    let after = engine.route(&request).await.expect("route should succeed");
    assert!(after.trace.sticky_fallback);
    assert_eq!(after.instance.id(), first.instance.id());
}

/// Failed binding writes never fail the call
#[tokio::test]
async fn test_write_failures_are_swallowed() {
    let fleet = Fleet::new(1);
    fleet.store.fail_writes(true);
    let request = sticky_request("sess-ro");

    let decisions = route_many(fleet.replica(0), &request, 3).await;
    let ids: HashSet<_> = decisions.iter().map(|d| d.instance.id().to_string()).collect();
    assert_eq!(ids.len(), 1);
    assert!(decisions.iter().all(|d| d.trace.sticky_fallback));
    assert_eq!(fleet.store.binding_writes(), 3);

    fleet.store.fail_writes(false);
    route_many(fleet.replica(0), &request, 1).await;
    let hit = route_many(fleet.replica(0), &request, 1).await;
    assert!(hit[0].trace.sticky_hit);
}

/// Initial placement is a pure function of the session, across unrelated stores
#[tokio::test]
async fn test_initial_placement_is_deterministic() {
    for strategy in [BranchStrategy::RoundRobin, BranchStrategy::ConsistentHash] {
        for session_id in ["a", "b", "c", "user-1234"] {
            let request = RouteRequest::new(TENANT, sticky_group(strategy))
                .with_instances(pool_of(&["primary"], 5))
                .with_metadata(session(session_id));

            let left = Fleet::new(1).replica(0).route(&request).await.expect("route").instance;
            let right = Fleet::new(1).replica(0).route(&request).await.expect("route").instance;
            assert_eq!(left.id(), right.id(), "{strategy} {session_id}");
        }
    }
}

/// Distinct sessions spread over the branch
#[tokio::test]
async fn test_sessions_spread_over_instances() {
    let fleet = Fleet::new(1);
    let mut used = HashSet::new();

    for n in 0..200 {
        let decision = fleet
            .replica(0)
            .route(&sticky_request(&format!("session-{n}")))
            .await
            .expect("route should succeed");
        used.insert(decision.instance.id().to_string());
    }

    assert_eq!(used.len(), 4);
}

/// A binding outranks the weighted sequence
#[tokio::test]
async fn test_binding_beats_weighted_rotation() {
    let fleet = Fleet::new(1);
    let group = canary_group().with_sticky_key(SESSION_HEADER);
    let request = RouteRequest::new(TENANT, group)
        .with_instances(pool_of(&["stable", "canary"], 1))
        .with_metadata(session("sess-w"));

    let decisions = route_many(fleet.replica(0), &request, 8).await;
    let branches: HashSet<_> = decisions.iter().map(|d| d.trace.branch_name.clone()).collect();
    assert_eq!(branches.len(), 1);
    assert!(decisions[1..].iter().all(|d| d.trace.sticky_hit));
}
