//! Substitution variables selected by condition

use serde::{Deserialize, Serialize};

use crate::conditions::{Conditions, Labels};
use crate::context::{Conditional, Predicate, collate_by};
use crate::document::{Kind, parse_documents};
use crate::error::Result;
use crate::substitute::Substitute;

/// Variables made available to every release the conditions match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvSpecification {
    pub matches: Conditions,
    #[serde(default, alias = "values")]
    pub env: Substitute,
}

impl Conditional for EnvSpecification {
    fn matches(&self) -> &Conditions {
        &self.matches
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envs(pub Vec<EnvSpecification>);

#[derive(Debug, Deserialize)]
struct EnvDocument {
    #[serde(default)]
    spec: Vec<EnvSpecification>,
}

impl Envs {
    pub fn new(specs: Vec<EnvSpecification>) -> Self {
        Self(specs)
    }

    /// Parse a `StevedoreEnv` file (one or more documents)
    pub fn from_yaml(file: &str, content: &str) -> Result<Self> {
        let documents: Vec<EnvDocument> = parse_documents(file, content, Kind::StevedoreEnv)?;
        Ok(Self(documents.into_iter().flat_map(|d| d.spec).collect()))
    }

    /// Matching env specifications in application order
    pub fn collate_by(&self, predicate: &Predicate, labels: &Labels) -> Envs {
        Envs(collate_by(&self.0, predicate, labels))
    }

    /// Flat merge in list order, later specifications winning
    pub fn merged(&self) -> Substitute {
        Substitute::merge_all(self.0.iter().map(|spec| &spec.env))
    }

    pub fn extend(&mut self, other: Envs) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
