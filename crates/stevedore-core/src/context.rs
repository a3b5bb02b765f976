//! Deploy targets and the predicates derived from them

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::conditions::{APPLICATION_NAME, CONTEXT_NAME, Conditions, Labels};

/// A named deploy target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    /// Context name, exposed to rules as `contextName`
    pub name: String,

    /// Underlying cluster handle (kubeconfig context)
    #[serde(default)]
    pub kube_context: String,

    /// Free-form labels such as `environmentType` or `contextType`
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Context {
    pub fn new(name: impl Into<String>, kube_context: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kube_context: kube_context.into(),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Labels combined with the fixed `contextName` key
    pub fn conditions(&self) -> Conditions {
        let mut conditions: Conditions = self.labels.clone().into();
        conditions.insert(CONTEXT_NAME, self.name.clone());
        conditions
    }
}

/// Concrete condition set a rule is tested against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    conditions: Conditions,
}

impl Predicate {
    pub fn new(conditions: Conditions) -> Self {
        Self { conditions }
    }

    pub fn from_context(context: &Context) -> Self {
        Self::new(context.conditions())
    }

    /// Narrow the predicate to one application
    pub fn with_application(&self, application: &str) -> Self {
        let mut conditions = self.conditions.clone();
        conditions.insert(APPLICATION_NAME, application);
        Self { conditions }
    }

    /// True iff `conditions` is non-empty and each of its pairs is present here
    pub fn contains(&self, conditions: &Conditions) -> bool {
        !conditions.is_empty() && conditions.is_subset_of(&self.conditions)
    }

    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }
}

/// A rule guarded by a condition set
pub trait Conditional {
    fn matches(&self) -> &Conditions;
}

/// Keep the rules matching `predicate`, ordered by ascending weight
///
/// The sort is stable: rules of equal weight keep their declaration order.
/// The result is the order in which rules must be applied so that the most
/// specific one wins.
pub fn collate_by<T>(rules: &[T], predicate: &Predicate, labels: &Labels) -> Vec<T>
where
    T: Conditional + Clone,
{
    let mut matching: Vec<T> = rules
        .iter()
        .filter(|rule| predicate.contains(rule.matches()))
        .cloned()
        .collect();
    matching.sort_by_key(|rule| rule.matches().weight(labels));
    matching
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{CONTEXT_TYPE, DEFAULT_LABELS, ENVIRONMENT_TYPE};
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    struct Rule {
        matches: Conditions,
        id: usize,
    }

    impl Conditional for Rule {
        fn matches(&self) -> &Conditions {
            &self.matches
        }
    }

    fn staging() -> Context {
        Context::new("components", "gke_components")
            .with_label(ENVIRONMENT_TYPE, "staging")
            .with_label(CONTEXT_TYPE, "components")
    }

    #[test]
    fn test_context_conditions_include_name() {
        let conditions = staging().conditions();
        assert_eq!(conditions.get(CONTEXT_NAME), Some("components"));
        assert_eq!(conditions.get(ENVIRONMENT_TYPE), Some("staging"));
    }

    #[test]
    fn test_predicate_contains() {
        let predicate = Predicate::from_context(&staging());

        assert!(predicate.contains(&Conditions::new().with(ENVIRONMENT_TYPE, "staging")));
        assert!(!predicate.contains(&Conditions::new().with(ENVIRONMENT_TYPE, "production")));
        assert!(!predicate.contains(&Conditions::new().with(APPLICATION_NAME, "orders")));
        assert!(!predicate.contains(&Conditions::new()));
    }

    #[test]
    fn test_with_application() {
        let predicate = Predicate::from_context(&staging()).with_application("orders");
        assert!(predicate.contains(&Conditions::new().with(APPLICATION_NAME, "orders")));
        assert!(!predicate.contains(&Conditions::new().with(APPLICATION_NAME, "payments")));
    }

    #[test]
    fn test_collate_filters_and_sorts_stably() {
        let predicate = Predicate::from_context(&staging()).with_application("orders");
        let rules = vec![
            Rule { matches: Conditions::new().with(APPLICATION_NAME, "orders"), id: 0 },
            Rule { matches: Conditions::new().with(ENVIRONMENT_TYPE, "staging"), id: 1 },
            Rule { matches: Conditions::new().with(ENVIRONMENT_TYPE, "production"), id: 2 },
            Rule { matches: Conditions::new().with(ENVIRONMENT_TYPE, "staging"), id: 3 },
            Rule { matches: Conditions::new().with(CONTEXT_NAME, "components"), id: 4 },
            Rule { matches: Conditions::new(), id: 5 },
        ];

        let collated = collate_by(&rules, &predicate, &Labels::default());
        let ids: Vec<usize> = collated.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3, 4, 0]);
    }

    proptest! {
        #[test]
        fn test_empty_conditions_never_match(
            labels in proptest::collection::btree_map("[a-zA-Z]{1,8}", "[a-z0-9]{0,8}", 0..6),
            name in "[a-z]{1,10}",
        ) {
            let mut context = Context::new(name, "cluster");
            context.labels = labels;
            let predicate = Predicate::from_context(&context);
            prop_assert!(!predicate.contains(&Conditions::new()));
            prop_assert!(!predicate.with_application("app").contains(&Conditions::new()));
        }

        #[test]
        fn test_own_dimensions_always_match(index in 0usize..4) {
            let context = staging()
                .with_label(DEFAULT_LABELS[1], "staging-a");
            let predicate = Predicate::from_context(&context);
            let key = DEFAULT_LABELS[index];
            if let Some(value) = predicate.conditions().get(key) {
                let single = Conditions::new().with(key, value);
                prop_assert!(predicate.contains(&single));
            }
        }
    }
}
