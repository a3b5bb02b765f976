//! Rules excluding releases from a context, and the record of what was excluded

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::conditions::{Conditions, Labels};
use crate::context::{Conditional, Predicate, collate_by};
use crate::error::Result;

/// Reason recorded for releases removed by an ignore rule
pub const EXPLICIT_IGNORE: &str = "explicit ignore";

/// Reason recorded for releases of a manifest that does not target the context
pub fn not_applicable(context_name: &str) -> String {
    format!("not applicable for context '{}'", context_name)
}

/// A release named by an ignore rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoredReleaseRule {
    pub name: String,
    /// Free-form note from the rule author
    #[serde(default)]
    pub reason: String,
}

/// Releases to skip wherever the conditions match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ignore {
    pub matches: Conditions,
    #[serde(default)]
    pub releases: Vec<IgnoredReleaseRule>,
}

impl Conditional for Ignore {
    fn matches(&self) -> &Conditions {
        &self.matches
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ignores(pub Vec<Ignore>);

impl Ignores {
    pub fn new(ignores: Vec<Ignore>) -> Self {
        Self(ignores)
    }

    /// Parse an ignore file: a plain list of rules
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let parsed: Option<Vec<Ignore>> = serde_yaml::from_str(content)?;
        Ok(Self(parsed.unwrap_or_default()))
    }

    pub fn collate_by(&self, predicate: &Predicate, labels: &Labels) -> Ignores {
        Ignores(collate_by(&self.0, predicate, labels))
    }

    /// Union of the release names of every rule
    pub fn release_names(&self) -> BTreeSet<String> {
        self.0
            .iter()
            .flat_map(|ignore| ignore.releases.iter().map(|r| r.name.clone()))
            .collect()
    }

    pub fn extend(&mut self, other: Ignores) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// A release left out of the plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoredRelease {
    pub file: String,
    pub name: String,
    pub reason: String,
}

/// Every release left out of the plan, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IgnoredReleases(pub Vec<IgnoredRelease>);

impl IgnoredReleases {
    pub fn push(&mut self, file: &str, name: &str, reason: impl Into<String>) {
        self.0.push(IgnoredRelease {
            file: file.to_string(),
            name: name.to_string(),
            reason: reason.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IgnoredRelease> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|r| r.name.as_str()).collect()
    }
}
