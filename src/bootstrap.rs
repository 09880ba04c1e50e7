//! Turning a [`RoutingConfig`] into a ready [`RoutingEngine`].

use gateway_config::{BackendKind, ConfigError, CoordinationSettings, RoutingConfig};
use gateway_coordination::{CoordinationError, CoordinationStore, MemoryCoordinationStore};
use gateway_routing::RoutingEngine;
use gateway_telemetry::{RoutingMetrics, TelemetryError};
use prometheus::Registry;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Result type for bootstrapping
pub type BootstrapResult<T> = Result<T, BootstrapError>;

/// Errors raised while assembling the router
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The configuration is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The coordination store could not be reached
    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    /// Metrics could not be registered
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The selected backend was not compiled in
    #[error("coordination backend {0} is not enabled in this build")]
    BackendUnavailable(BackendKind),
}

/// Connect the configured coordination store
///
/// Remote backends are health-checked once; a failing check is logged but
/// does not abort startup, since the engine surfaces store errors per call.
///
/// # Errors
/// Returns error if the backend is not compiled in or the connection fails
pub async fn connect_store(settings: &CoordinationSettings) -> BootstrapResult<Arc<dyn CoordinationStore>> {
    let store: Arc<dyn CoordinationStore> = match settings.backend {
        BackendKind::Memory => Arc::new(MemoryCoordinationStore::new()),
        BackendKind::Redis => connect_redis(settings).await?,
        BackendKind::Etcd => connect_etcd(settings).await?,
    };

    if store.is_distributed() {
        if let Err(e) = store.health_check().await {
            warn!(backend = store.name(), error = %e, "Coordination store health check failed");
        }
    }

    info!(
        backend = store.name(),
        distributed = store.is_distributed(),
        "Coordination store ready"
    );
    Ok(store)
}

#[cfg(feature = "redis")]
async fn connect_redis(settings: &CoordinationSettings) -> BootstrapResult<Arc<dyn CoordinationStore>> {
    let store = gateway_coordination::RedisCoordinationStore::connect(&settings.redis_store_config()).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
async fn connect_redis(_: &CoordinationSettings) -> BootstrapResult<Arc<dyn CoordinationStore>> {
    Err(BootstrapError::BackendUnavailable(BackendKind::Redis))
}

#[cfg(feature = "etcd")]
async fn connect_etcd(settings: &CoordinationSettings) -> BootstrapResult<Arc<dyn CoordinationStore>> {
    let store = gateway_coordination::EtcdCoordinationStore::connect(&settings.etcd_store_config()).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "etcd"))]
async fn connect_etcd(_: &CoordinationSettings) -> BootstrapResult<Arc<dyn CoordinationStore>> {
    Err(BootstrapError::BackendUnavailable(BackendKind::Etcd))
}

/// Validate `config`, connect its store and build an engine
///
/// # Errors
/// Returns error if validation or the store connection fails
pub async fn build_engine(config: &RoutingConfig) -> BootstrapResult<RoutingEngine> {
    config.validate()?;
    let store = connect_store(&config.coordination).await?;

    Ok(RoutingEngine::builder(store)
        .binding_ttl(config.sticky.binding_ttl)
        .build())
}

/// Like [`build_engine`], recording routing metrics into `registry`
///
/// # Errors
/// Returns error if validation, metric registration or the store connection fails
pub async fn build_engine_with_metrics(
    config: &RoutingConfig,
    registry: &Registry,
) -> BootstrapResult<RoutingEngine> {
    config.validate()?;
    let metrics = RoutingMetrics::new(registry)?;
    let store = connect_store(&config.coordination).await?;

    Ok(RoutingEngine::builder(store)
        .binding_ttl(config.sticky.binding_ttl)
        .metrics(metrics)
        .build())
}
