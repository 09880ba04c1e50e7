//! Routing integration tests
//!
//! Weighted and priority routing end to end, label partitioning, and
//! several replicas sharing one coordination store.

use crate::fixtures::*;
use crate::helpers::*;
use gateway_coordination::{CoordinationStore, MemoryCoordinationStore};
use gateway_core::{LabelRequirement, LabelSelector, PolicyBranch, PolicyGroup, PolicyMode, RouteRequest, SharedInstance};
use gateway_routing::{RoutingEngine, RoutingError};
use gateway_telemetry::RoutingMetrics;
use pretty_assertions::assert_eq;
use prometheus::Registry;
use std::sync::Arc;

/// Weighted split over 100 calls on one replica
#[tokio::test]
async fn test_canary_split_end_to_end() {
    let fleet = Fleet::new(1);
    let request = RouteRequest::new(TENANT, canary_group()).with_instances(pool_of(&["stable", "canary"], 2));

    let decisions = route_many(fleet.replica(0), &request, 100).await;
    let branches = branch_histogram(&decisions);

    let stable = branches.get("stable").copied().unwrap_or(0);
    let canary = branches.get("canary").copied().unwrap_or(0);
    assert!((70..=80).contains(&stable), "stable {stable}");
    assert!((20..=30).contains(&canary), "canary {canary}");

    // instances inside a branch rotate through the shared counter
    let instances = instance_histogram(&decisions);
    for id in ["stable-0", "stable-1"] {
        let count = instances.get(id).copied().unwrap_or(0);
        assert!((35..=40).contains(&count), "{id} {count}");
    }
}

/// Each replica converges on the ratio independently
#[tokio::test]
async fn test_weighted_state_is_per_replica() {
    let fleet = Fleet::new(3);
    let request = RouteRequest::new(TENANT, canary_group()).with_instances(pool_of(&["stable", "canary"], 1));

    for replica in &fleet.replicas {
        let decisions = route_many(replica, &request, 40).await;
        let branches = branch_histogram(&decisions);
        assert_eq!(branches.get("stable").copied(), Some(30));
        assert_eq!(branches.get("canary").copied(), Some(10));
        assert_eq!(decisions[0].trace.branch_name, "stable");
        assert_eq!(replica.sequencers().len(), 1);
    }

    // weighted branch choice never touches the store; instance rotation does
    assert_eq!(fleet.store.counter_calls(), 120);
}

/// Tied priority branches alternate across replicas sharing a store
#[tokio::test]
async fn test_priority_rotation_shared_by_fleet() {
    let fleet = Fleet::new(2);
    let request =
        RouteRequest::new(TENANT, failover_group()).with_instances(pool_of(&["east", "west", "backup"], 1));

    let mut branches = Vec::new();
    for call in 0..6 {
        let decision = fleet
            .replica(call % 2)
            .route(&request)
            .await
            .expect("route should succeed");
        branches.push(decision.trace.branch_name);
    }

    assert_eq!(branches, vec!["west", "east", "west", "east", "west", "east"]);
}

/// Lower tiers take over only when higher tiers are empty
#[tokio::test]
async fn test_priority_failover() {
    let fleet = Fleet::new(1);
    let engine = fleet.replica(0);

    let backup_only =
        RouteRequest::new(TENANT, failover_group()).with_instances(pool_of(&["backup"], 2));
    let decision = engine.route(&backup_only).await.expect("route should succeed");
    assert_eq!(decision.trace.branch_name, "backup");
    assert_eq!(decision.trace.branch_priority, 2);

    let west_and_backup =
        RouteRequest::new(TENANT, failover_group()).with_instances(pool_of(&["west", "backup"], 1));
    for decision in route_many(engine, &west_and_backup, 4).await {
        assert_eq!(decision.trace.branch_name, "west");
    }
}

/// Unhealthy instances are removed before branch selection
#[tokio::test]
async fn test_health_filter_drives_failover() {
    let engine = RoutingEngine::builder(Arc::new(MemoryCoordinationStore::new()))
        .health_filter(|instances: Vec<SharedInstance>| -> Vec<SharedInstance> {
            instances
                .into_iter()
                .filter(|i| i.label("pool") != Some("east") && i.label("pool") != Some("west"))
                .collect()
        })
        .build();
    let request =
        RouteRequest::new(TENANT, failover_group()).with_instances(pool_of(&["east", "west", "backup"], 2));

    for decision in route_many(&engine, &request, 5).await {
        assert_eq!(decision.trace.branch_name, "backup");
        assert_eq!(decision.instance.label("pool"), Some("backup"));
    }
}

/// Selectors partition a mixed pool
#[tokio::test]
async fn test_label_selector_partitioning() {
    let group = PolicyGroup::new("embeddings", TENANT, PolicyMode::Weighted).with_branch(
        PolicyBranch::new("americas").with_selector(LabelSelector::new(vec![
            LabelRequirement::not_in("region", ["EU-WEST", "ap-south"]),
            LabelRequirement::exists("MODEL"),
            LabelRequirement::does_not_exist("draining"),
        ])),
    );
    let pool = vec![
        instance("use-1", "a", "us-east"),
        instance("usw-1", "a", "us-west"),
        instance("euw-1", "a", "eu-west"),
        instance("aps-1", "a", "ap-south"),
    ];
    let engine = RoutingEngine::new(Arc::new(MemoryCoordinationStore::new()));
    let request = RouteRequest::new(TENANT, group).with_instances(pool);

    let decisions = route_many(&engine, &request, 10).await;
    let instances = instance_histogram(&decisions);
    assert_eq!(instances.keys().cloned().collect::<Vec<_>>(), vec!["use-1", "usw-1"]);
    assert_eq!(instances.values().sum::<usize>(), 10);
}

/// No matching branch is a recoverable, counted failure
#[tokio::test]
async fn test_no_available_branch_is_counted() {
    let registry = Registry::new();
    let metrics = RoutingMetrics::new(&registry).expect("metrics should register");
    let engine = RoutingEngine::builder(Arc::new(MemoryCoordinationStore::new()))
        .metrics(metrics.clone())
        .build();
    let request = RouteRequest::new(TENANT, canary_group()).with_instances(pool_of(&["legacy"], 3));

    let err = engine.route(&request).await.expect_err("no branch matches");
    assert!(matches!(err, RoutingError::NoAvailableBranch { ref group } if group == "chat"));
    assert!(err.is_recoverable());
    assert_eq!(metrics.failure_count("chat", "no_branch"), 1);

    let ok = RouteRequest::new(TENANT, canary_group()).with_instances(pool_of(&["stable"], 1));
    engine.route(&ok).await.expect("route should succeed");
    assert_eq!(metrics.decision_count("chat", "stable", "weighted", "none"), 1);
}

/// Concurrent callers on one engine still follow the exact weighted sequence
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_routing_keeps_ratio() {
    let engine = Arc::new(RoutingEngine::new(Arc::new(MemoryCoordinationStore::new())));
    let request = Arc::new(
        RouteRequest::new(TENANT, canary_group()).with_instances(pool_of(&["stable", "canary"], 2)),
    );

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let request = Arc::clone(&request);
            tokio::spawn(async move { route_many(&engine, &request, 50).await })
        })
        .collect();

    let mut decisions = Vec::new();
    for task in futures::future::join_all(tasks).await {
        decisions.extend(task.expect("task should not panic"));
    }

    let branches = branch_histogram(&decisions);
    assert_eq!(branches.get("stable").copied(), Some(300));
    assert_eq!(branches.get("canary").copied(), Some(100));
}

/// Store errors on a required call surface verbatim
#[tokio::test]
async fn test_store_read_errors_propagate() {
    let fleet = Fleet::new(1);
    fleet.store.fail_reads(true);
    let request = RouteRequest::new(TENANT, sticky_group(Default::default()))
        .with_instances(pool_of(&["primary"], 2))
        .with_metadata(session("s-1"));

    let err = fleet.replica(0).route(&request).await.expect_err("read failure");
    assert!(matches!(err, RoutingError::Coordination(_)));
    assert!(!err.is_recoverable());
    assert_eq!(fleet.store.name(), "instrumented");
}
