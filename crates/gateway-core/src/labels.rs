//! Label sets and label selectors.
//!
//! Label keys are case-insensitive: they are normalized to lowercase on
//! insertion so lookups never depend on the casing used by the inventory
//! that attached them. Values keep their original casing; comparisons
//! against selector values are done case-insensitively by the selector
//! engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unicode-aware case-insensitive equality
#[must_use]
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Case-insensitive label mapping attached to a model instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct Labels {
    entries: BTreeMap<String, String>,
}

impl Labels {
    /// Create an empty label set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a label, replacing any previous value under the same key
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.entries
            .insert(key.as_ref().to_lowercase(), value.into());
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a label value, ignoring key case
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_lowercase())
            .map(String::as_str)
    }

    /// Check whether a label key is present, ignoring key case
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_lowercase())
    }

    /// Number of labels
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the label set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over normalized keys and values
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for Labels {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<Labels> for BTreeMap<String, String> {
    fn from(labels: Labels) -> Self {
        labels.entries
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Labels {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut labels = Self::new();
        for (key, value) in iter {
            labels.insert(key, value);
        }
        labels
    }
}

/// Kind of requirement inside a selector
///
/// Only label requirements exist today. Unknown kinds coming from a
/// persisted policy deserialize to `Unsupported` and never match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    /// Match against instance labels
    #[default]
    Label,
    /// Unrecognized requirement kind
    #[serde(other)]
    Unsupported,
}

/// Operator of a label requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LabelOperator {
    /// Label value must equal one of the listed values
    In,
    /// Label must be absent or differ from every listed value
    NotIn,
    /// Label key must be present
    Exists,
    /// Label key must be absent
    DoesNotExist,
    /// Unrecognized operator
    Unsupported,
}

impl LabelOperator {
    /// Canonical snake_case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Exists => "exists",
            Self::DoesNotExist => "does_not_exist",
            Self::Unsupported => "unsupported",
        }
    }

    /// Parse an operator name leniently (case, `-` and `_` are ignored)
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "in" => Self::In,
            "notin" => Self::NotIn,
            "exists" => Self::Exists,
            "doesnotexist" | "notexists" => Self::DoesNotExist,
            _ => Self::Unsupported,
        }
    }
}

impl From<String> for LabelOperator {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<LabelOperator> for String {
    fn from(op: LabelOperator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for LabelOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requirement of a label selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRequirement {
    /// Requirement kind
    #[serde(default, rename = "type")]
    pub kind: RequirementKind,
    /// Label key (case-insensitive)
    pub key: String,
    /// Operator
    pub operator: LabelOperator,
    /// Values used by `in` / `not_in`, compared case-insensitively
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl LabelRequirement {
    /// Create a label requirement, dropping duplicate values while keeping order
    pub fn new<I, S>(key: impl Into<String>, operator: LabelOperator, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut deduped: Vec<String> = Vec::new();
        for value in values {
            let value = value.into();
            if !deduped.iter().any(|v| eq_ignore_case(v, &value)) {
                deduped.push(value);
            }
        }
        Self {
            kind: RequirementKind::Label,
            key: key.into(),
            operator,
            values: deduped,
        }
    }

    /// `key in (values...)`
    pub fn in_values<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(key, LabelOperator::In, values)
    }

    /// `key notin (values...)`
    pub fn not_in<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(key, LabelOperator::NotIn, values)
    }

    /// `key` exists
    pub fn exists(key: impl Into<String>) -> Self {
        Self::new(key, LabelOperator::Exists, Vec::<String>::new())
    }

    /// `!key`
    pub fn does_not_exist(key: impl Into<String>) -> Self {
        Self::new(key, LabelOperator::DoesNotExist, Vec::<String>::new())
    }
}

/// Conjunction of label requirements
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelector {
    /// Requirements that must all hold
    #[serde(default)]
    pub requirements: Vec<LabelRequirement>,
}

impl LabelSelector {
    /// Selector that matches every instance
    #[must_use]
    pub fn everything() -> Self {
        Self::default()
    }

    /// Create a selector from requirements
    #[must_use]
    pub fn new(requirements: Vec<LabelRequirement>) -> Self {
        Self { requirements }
    }

    /// Add a requirement
    #[must_use]
    pub fn with(mut self, requirement: LabelRequirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// Whether the selector has no requirements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}
