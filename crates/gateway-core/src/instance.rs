//! Routable model instances.

use crate::labels::Labels;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Backend model instance handle
///
/// The router only relies on `id`; the remaining fields travel with the
/// decision so the caller can dispatch without a second lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInstance {
    /// Stable instance identifier
    pub id: String,

    /// Upstream model name served by this instance
    #[serde(default)]
    pub model: String,

    /// Provider or vendor name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Endpoint the gateway forwards to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl ModelInstance {
    /// Create an instance handle with only an id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model: String::new(),
            provider: None,
            endpoint: None,
        }
    }

    /// Set the model name
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the provider
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Set the endpoint
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// Instance handle plus the labels the inventory attached to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingModelInstance {
    /// Opaque instance handle
    pub instance: ModelInstance,

    /// Case-insensitive labels
    #[serde(default)]
    pub labels: Labels,
}

/// Instances are shared between the pool and every branch candidate
pub type SharedInstance = Arc<RoutingModelInstance>;

impl RoutingModelInstance {
    /// Wrap an instance with labels
    #[must_use]
    pub fn new(instance: ModelInstance, labels: Labels) -> Self {
        Self { instance, labels }
    }

    /// Instance identifier
    #[must_use]
    pub fn id(&self) -> &str {
        &self.instance.id
    }

    /// Label lookup, ignoring key case
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key)
    }

    /// Convert into a shared handle
    #[must_use]
    pub fn shared(self) -> SharedInstance {
        Arc::new(self)
    }
}
