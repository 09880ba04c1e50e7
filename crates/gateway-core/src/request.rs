//! Route requests.
//!
//! A route request is the pre-resolved input of one routing decision: the
//! client, its policy group, the instance pool visible to that client, and
//! the request metadata the sticky key is read from.

use crate::instance::{RoutingModelInstance, SharedInstance};
use crate::labels::eq_ignore_case;
use crate::policy::PolicyGroup;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Prefix marking a sticky key that names an HTTP header
pub const HEADER_KEY_PREFIX: &str = "header.";

/// Request context values, queried case-insensitively
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, String>", into = "HashMap<String, String>")]
pub struct RequestMetadata {
    values: HashMap<String, String>,
}

impl RequestMetadata {
    /// Create empty metadata
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.values
            .insert(key.as_ref().to_lowercase(), value.into());
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Case-insensitive lookup
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&key.to_lowercase())
            .map(String::as_str)
    }

    /// Resolve the value of a sticky key
    ///
    /// A `header.`-prefixed key that misses is retried with the bare
    /// header name. Empty values count as missing.
    #[must_use]
    pub fn sticky_value(&self, sticky_key: &str) -> Option<&str> {
        let key = sticky_key.trim();
        if key.is_empty() {
            return None;
        }

        let direct = self.get(key).filter(|v| !v.is_empty());
        if direct.is_some() {
            return direct;
        }

        strip_prefix_ignore_case(key, HEADER_KEY_PREFIX)
            .filter(|bare| !bare.is_empty())
            .and_then(|bare| self.get(bare))
            .filter(|v| !v.is_empty())
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    if eq_ignore_case(head, prefix) {
        value.get(prefix.len()..)
    } else {
        None
    }
}

impl From<HashMap<String, String>> for RequestMetadata {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<RequestMetadata> for HashMap<String, String> {
    fn from(metadata: RequestMetadata) -> Self {
        metadata.values
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RequestMetadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Self::new();
        for (key, value) in iter {
            metadata.insert(key, value);
        }
        metadata
    }
}

/// Input of one routing decision
#[derive(Debug, Clone)]
pub struct RouteRequest {
    /// Client identifier
    pub client_id: String,

    /// Policy group resolved for this request
    pub group: Arc<PolicyGroup>,

    /// Instances visible to the client
    pub instances: Vec<SharedInstance>,

    /// Request metadata
    pub metadata: RequestMetadata,
}

impl RouteRequest {
    /// Create a request with an empty pool and no metadata
    pub fn new(client_id: impl Into<String>, group: impl Into<Arc<PolicyGroup>>) -> Self {
        Self {
            client_id: client_id.into(),
            group: group.into(),
            instances: Vec::new(),
            metadata: RequestMetadata::new(),
        }
    }

    /// Set the instance pool
    #[must_use]
    pub fn with_instances(mut self, instances: Vec<SharedInstance>) -> Self {
        self.instances = instances;
        self
    }

    /// Add one instance
    #[must_use]
    pub fn with_instance(mut self, instance: RoutingModelInstance) -> Self {
        self.instances.push(Arc::new(instance));
        self
    }

    /// Set the metadata
    #[must_use]
    pub fn with_metadata(mut self, metadata: RequestMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sticky value for this request, if the group declares a sticky key
    #[must_use]
    pub fn sticky_value(&self) -> Option<&str> {
        self.group
            .sticky_key()
            .and_then(|key| self.metadata.sticky_value(key))
    }
}
