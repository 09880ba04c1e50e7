//! Configuration to engine

use crate::fixtures::*;
use gateway_config::{BackendKind, RoutingConfig};
use gateway_core::RouteRequest;
use llm_traffic_router::{build_engine, build_engine_with_metrics, BootstrapError};
use prometheus::Registry;
use std::time::Duration;

#[tokio::test]
async fn test_engine_from_yaml_routes() {
    let yaml = r#"
coordination:
  backend: memory
sticky:
  binding_ttl: 2m
logging:
  level: warn
"#;
    let config = RoutingConfig::from_yaml_str(yaml).expect("valid yaml");
    let engine = build_engine(&config).await.expect("engine");
    assert_eq!(engine.binding_ttl(), Duration::from_secs(120));

    let request = RouteRequest::new(TENANT, canary_group()).with_instances(pool_of(&["stable", "canary"], 1));
    let decision = engine.route(&request).await.expect("route should succeed");
    assert_eq!(decision.trace.branch_name, "stable");
}

#[tokio::test]
async fn test_engine_from_toml_with_env_overrides() {
    let mut config = RoutingConfig::from_toml_str("[sticky]\nbinding_ttl = \"5m\"\n").expect("valid toml");
    config
        .apply_overrides_from(|name| match name {
            "ROUTER_BINDING_TTL" => Some("45s".to_string()),
            _ => None,
        })
        .expect("overrides");

    let engine = build_engine(&config).await.expect("engine");
    assert_eq!(engine.binding_ttl(), Duration::from_secs(45));
}

#[tokio::test]
async fn test_metrics_exposed_after_routing() {
    let registry = Registry::new();
    let engine = build_engine_with_metrics(&RoutingConfig::default(), &registry)
        .await
        .expect("engine");
    let request = RouteRequest::new(TENANT, canary_group()).with_instances(pool_of(&["stable", "canary"], 1));
    engine.route(&request).await.expect("route should succeed");

    let exposition = prometheus::TextEncoder::new()
        .encode_to_string(&registry.gather())
        .expect("encodable");
    assert!(exposition.contains("routing_decisions_total"));
    assert!(exposition.contains("group=\"chat\""));
}

#[tokio::test]
async fn test_invalid_backend_settings_rejected() {
    let mut config = RoutingConfig::default();
    config.coordination.backend = BackendKind::Etcd;

    match build_engine(&config).await {
        Err(BootstrapError::Config(_)) => {}
        Err(other) => panic!("expected a configuration error, got {other}"),
        Ok(_) => panic!("etcd without endpoints must not build"),
    }
}
