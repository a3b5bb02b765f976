//! Matching dimensions, condition sets and their weights
//!
//! A [`Conditions`] set maps a known dimension (a "label") to a value. The
//! [`Labels`] ordering assigns each dimension the weight `2^index`; the weight
//! of a condition set is the sum of the weights of its present dimensions.
//! Higher weights are more specific and are applied later, so they win
//! conflicts when rules are merged.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ENVIRONMENT_TYPE: &str = "environmentType";
pub const ENVIRONMENT: &str = "environment";
pub const CONTEXT_TYPE: &str = "contextType";
pub const CONTEXT_NAME: &str = "contextName";
pub const APPLICATION_NAME: &str = "applicationName";

/// Default dimension order, least specific first
pub const DEFAULT_LABELS: [&str; 5] = [
    ENVIRONMENT_TYPE,
    ENVIRONMENT,
    CONTEXT_TYPE,
    CONTEXT_NAME,
    APPLICATION_NAME,
];

/// Largest number of labels whose weights still fit in a `u64`
pub const MAX_LABELS: usize = 63;

/// Set of dimension/value pairs
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conditions(BTreeMap<String, String>);

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// True when every pair of `self` is present, with the same value, in `other`
    ///
    /// The empty set is a subset of everything; callers that must not match
    /// on empty conditions go through [`crate::Predicate::contains`].
    pub fn is_subset_of(&self, other: &Conditions) -> bool {
        self.0
            .iter()
            .all(|(key, value)| other.0.get(key) == Some(value))
    }

    /// Sum of the weights of the present dimensions
    pub fn weight(&self, labels: &Labels) -> u64 {
        self.keys().map(|key| labels.weight_of(key)).sum()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl From<BTreeMap<String, String>> for Conditions {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Conditions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl std::fmt::Display for Conditions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pairs: Vec<String> = self.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

/// A label with a caller-chosen sort weight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedLabel {
    pub name: String,
    #[serde(default)]
    pub weight: i64,
}

/// Ordered matching dimensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels(Vec<String>);

impl Default for Labels {
    fn default() -> Self {
        Self(DEFAULT_LABELS.iter().map(|l| l.to_string()).collect())
    }
}

impl Labels {
    /// Labels in the given order, least specific first
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut labels: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !labels.contains(&name) {
                labels.push(name);
            }
        }
        Self(labels)
    }

    /// Labels ordered by ascending weight
    ///
    /// Equal weights keep their declaration order. `contextName` and
    /// `applicationName` are always derived from the deploy target, so they
    /// are appended when missing.
    pub fn from_weighted(mut labels: Vec<WeightedLabel>) -> Self {
        labels.sort_by_key(|label| label.weight);

        let mut names: Vec<String> = labels.into_iter().map(|l| l.name).collect();
        for implicit in [CONTEXT_NAME, APPLICATION_NAME] {
            if !names.iter().any(|n| n == implicit) {
                names.push(implicit.to_string());
            }
        }
        Self::new(names)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|l| l == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|l| l == name)
    }

    /// `2^index` for a known label, 0 otherwise
    pub fn weight_of(&self, name: &str) -> u64 {
        match self.index_of(name) {
            Some(index) if index < MAX_LABELS => 1u64 << index,
            _ => 0,
        }
    }

    /// Mapping from label to weight
    pub fn weights(&self) -> BTreeMap<String, u64> {
        self.0
            .iter()
            .map(|label| (label.clone(), self.weight_of(label)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}
