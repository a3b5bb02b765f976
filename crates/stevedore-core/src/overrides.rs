//! Value overrides layered onto releases by condition

use serde::{Deserialize, Serialize};

use crate::conditions::{Conditions, Labels};
use crate::context::{Conditional, Predicate, collate_by};
use crate::document::{Kind, parse_documents};
use crate::error::Result;
use crate::values::Values;

/// Values deep-merged into every release the conditions match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideSpecification {
    pub matches: Conditions,
    #[serde(default)]
    pub values: Values,
}

impl Conditional for OverrideSpecification {
    fn matches(&self) -> &Conditions {
        &self.matches
    }
}

/// Ordered override rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Overrides(pub Vec<OverrideSpecification>);

/// `StevedoreOverride` document body
#[derive(Debug, Deserialize)]
struct OverrideDocument {
    #[serde(default)]
    spec: Vec<OverrideSpecification>,
}

impl Overrides {
    pub fn new(specs: Vec<OverrideSpecification>) -> Self {
        Self(specs)
    }

    /// Parse a `StevedoreOverride` file (one or more documents)
    pub fn from_yaml(file: &str, content: &str) -> Result<Self> {
        let documents: Vec<OverrideDocument> =
            parse_documents(file, content, Kind::StevedoreOverride)?;
        Ok(Self(documents.into_iter().flat_map(|d| d.spec).collect()))
    }

    /// Matching overrides in application order
    pub fn collate_by(&self, predicate: &Predicate, labels: &Labels) -> Overrides {
        Overrides(collate_by(&self.0, predicate, labels))
    }

    /// `base` with every override merged on top, in list order
    pub fn merge_values_into(&self, base: &Values) -> Values {
        let mut merged = base.clone();
        for spec in &self.0 {
            merged.merge(&spec.values);
        }
        merged
    }

    pub fn extend(&mut self, other: Overrides) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OverrideSpecification> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{APPLICATION_NAME, CONTEXT_NAME, ENVIRONMENT, ENVIRONMENT_TYPE};
    use crate::context::Context;
    use proptest::prelude::*;
    use serde_json::json;

    fn predicate() -> Predicate {
        let context = Context::new("components", "gke")
            .with_label(ENVIRONMENT_TYPE, "staging")
            .with_label(ENVIRONMENT, "staging-a");
        Predicate::from_context(&context).with_application("orders")
    }

    fn spec(matches: Conditions, values: serde_json::Value) -> OverrideSpecification {
        OverrideSpecification {
            matches,
            values: Values(values),
        }
    }

    #[test]
    fn test_higher_weight_wins() {
        let overrides = Overrides::new(vec![
            spec(Conditions::new().with(ENVIRONMENT, "staging-a"), json!({"key": "b"})),
            spec(Conditions::new().with(ENVIRONMENT_TYPE, "staging"), json!({"key": "a"})),
        ]);

        let collated = overrides.collate_by(&predicate(), &Labels::default());
        let merged = collated.merge_values_into(&Values::new());

        assert_eq!(merged.get("key").unwrap(), "b");
    }

    #[test]
    fn test_equal_weight_uses_declaration_order() {
        let overrides = Overrides::new(vec![
            spec(Conditions::new().with(CONTEXT_NAME, "components"), json!({"key": "first"})),
            spec(Conditions::new().with(CONTEXT_NAME, "components"), json!({"key": "second"})),
        ]);

        let merged = overrides
            .collate_by(&predicate(), &Labels::default())
            .merge_values_into(&Values::new());
        assert_eq!(merged.get("key").unwrap(), "second");
    }

    #[test]
    fn test_non_matching_and_empty_rules_skipped() {
        let overrides = Overrides::new(vec![
            spec(Conditions::new().with(APPLICATION_NAME, "payments"), json!({"key": "payments"})),
            spec(Conditions::new(), json!({"key": "everything"})),
        ]);

        let collated = overrides.collate_by(&predicate(), &Labels::default());
        assert!(collated.is_empty());
    }

    #[test]
    fn test_deep_merge_into_base() {
        let base = Values(json!({"image": {"repository": "orders", "tag": "1.0"}, "hosts": ["a", "b"]}));
        let overrides = Overrides::new(vec![spec(
            Conditions::new().with(APPLICATION_NAME, "orders"),
            json!({"image": {"tag": "2.0"}, "hosts": ["c"]}),
        )]);

        let merged = overrides
            .collate_by(&predicate(), &Labels::default())
            .merge_values_into(&base);

        assert_eq!(merged.get("image.repository").unwrap(), "orders");
        assert_eq!(merged.get("image.tag").unwrap(), "2.0");
        assert_eq!(merged.get("hosts").unwrap(), &json!(["c"]));
    }

    #[test]
    fn test_from_yaml() {
        let content = r#"
kind: StevedoreOverride
version: "2"
spec:
  - matches:
      contextName: components
    values:
      replicas: 2
"#;
        let overrides = Overrides::from_yaml("overrides.yaml", content).unwrap();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides.0[0].values.get("replicas").unwrap(), 2);
    }

    fn arbitrary_overrides() -> impl Strategy<Value = Overrides> {
        let dimension = prop_oneof![
            Just((ENVIRONMENT_TYPE, "staging")),
            Just((ENVIRONMENT, "staging-a")),
            Just((CONTEXT_NAME, "components")),
            Just((APPLICATION_NAME, "orders")),
        ];
        let rule = (proptest::collection::vec(dimension, 1..3), "[a-c]", 0i64..10)
            .prop_map(|(dims, key, value)| {
                let matches: Conditions = dims.into_iter().collect();
                spec(matches, json!({ key: value, "nested": { "v": value } }))
            });
        proptest::collection::vec(rule, 0..8).prop_map(Overrides::new)
    }

    proptest! {
        #[test]
        fn test_merge_is_idempotent(overrides in arbitrary_overrides()) {
            let labels = Labels::default();
            let collated = overrides.collate_by(&predicate(), &labels);

            let once = collated.merge_values_into(&Values::new());
            let twice = collated.merge_values_into(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
