//! Releases and release specifications
//!
//! A [`ReleaseSpecification`] is immutable input: every resolution stage
//! (override enrichment, variable replacement, config mounting) returns a new,
//! fully formed copy rather than mutating in place.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::conditions::Labels;
use crate::context::Predicate;
use crate::error::{ReleaseError, ResolutionErrors};
use crate::overrides::Overrides;
use crate::substitute::{PatternSet, Substitute, SubstitutionError};
use crate::values::Values;

/// Namespace every privileged release is deployed to
pub const PRIVILEGED_NAMESPACE: &str = "kube-system";

/// Requests to named config providers: provider name to request payload
pub type ConfigRequests = BTreeMap<String, JsonValue>;

/// A chart dependency of a dynamically composed chart
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub repository: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Dependency {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            alias: None,
            version: version.into(),
            repository: repository.into(),
            condition: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Effective name (alias or original name)
    pub fn effective_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Chart assembled at deploy time from dependencies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub name: String,

    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

/// The deployable unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub name: String,

    #[serde(default)]
    pub namespace: String,

    /// Chart reference such as `chartmuseum/orders`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,

    /// Chart to compose from dependencies, exclusive with `chart`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_spec: Option<ChartSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_version: Option<String>,

    /// Release version the manifest was written against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_release_version: Option<i64>,

    #[serde(default)]
    pub values: Values,

    /// Deploy to [`PRIVILEGED_NAMESPACE`] regardless of `namespace`
    #[serde(default)]
    pub privileged: bool,

    /// Overrides applied to produce `values`
    #[serde(default, skip_serializing_if = "Overrides::is_empty")]
    pub overrides: Overrides,

    /// Variables consumed while producing `values`
    #[serde(default, skip_serializing_if = "Substitute::is_empty")]
    pub substituted_vars: Substitute,
}

impl Release {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn with_chart(mut self, chart: impl Into<String>, version: Option<String>) -> Self {
        self.chart = Some(chart.into());
        self.chart_version = version;
        self
    }

    pub fn with_chart_spec(mut self, spec: ChartSpec) -> Self {
        self.chart_spec = Some(spec);
        self
    }

    pub fn with_values(mut self, values: Values) -> Self {
        self.values = values;
        self
    }

    /// Namespace the release is actually deployed to
    pub fn effective_namespace(&self) -> &str {
        if self.privileged {
            PRIVILEGED_NAMESPACE
        } else {
            &self.namespace
        }
    }

    /// True when the chart must be composed from `chartSpec` before deploying
    pub fn has_build_dependency(&self) -> bool {
        self.chart.as_deref().is_none_or(str::is_empty)
            && self
                .chart_spec
                .as_ref()
                .is_some_and(|spec| !spec.dependencies.is_empty())
    }

    /// Chart reference, or the chart spec name when the chart is composed
    pub fn chart_name(&self) -> &str {
        match (&self.chart, &self.chart_spec) {
            (Some(chart), _) if !chart.is_empty() => chart,
            (_, Some(spec)) => &spec.name,
            _ => "",
        }
    }

    /// Copy pointing at a built chart instead of the chart spec
    pub fn built_from(&self, chart: impl Into<String>, version: impl Into<String>) -> Release {
        Release {
            chart: Some(chart.into()),
            chart_version: Some(version.into()),
            ..self.clone()
        }
    }
}

/// A release plus the inputs needed to resolve it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSpecification {
    pub release: Release,

    /// Providers whose results feed variable substitution
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub configs: ConfigRequests,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Providers whose results are merged into the values
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mounts: ConfigRequests,
}

impl ReleaseSpecification {
    pub fn new(release: Release) -> Self {
        Self {
            release,
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.release.name
    }

    /// Copy with the matching overrides merged into the values
    pub fn enrich_with(
        &self,
        overrides: &Overrides,
        predicate: &Predicate,
        labels: &Labels,
    ) -> ReleaseSpecification {
        let application = predicate.with_application(&self.release.name);
        let collated = overrides.collate_by(&application, labels);
        let values = collated.merge_values_into(&self.release.values);

        ReleaseSpecification {
            release: Release {
                values,
                overrides: collated,
                ..self.release.clone()
            },
            ..self.clone()
        }
    }

    /// Copy with every `${VAR}` of the values replaced from `substitute`
    pub fn replace(
        &self,
        patterns: &PatternSet,
        substitute: &Substitute,
    ) -> Result<ReleaseSpecification, SubstitutionError> {
        let replaced = patterns.replace(&self.release.values, substitute)?;

        Ok(ReleaseSpecification {
            release: Release {
                values: replaced.values,
                substituted_vars: replaced.used,
                ..self.release.clone()
            },
            ..self.clone()
        })
    }

    /// Copy with provider results deep-merged into the values
    pub fn mount(&self, mounted: &Values) -> ReleaseSpecification {
        ReleaseSpecification {
            release: self.release.clone().with_values(self.release.values.merged(mounted)),
            ..self.clone()
        }
    }
}

/// Release specifications of one manifest, in file order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseSpecifications(pub Vec<ReleaseSpecification>);

impl ReleaseSpecifications {
    pub fn new(specs: Vec<ReleaseSpecification>) -> Self {
        Self(specs)
    }

    /// Replace variables in every specification
    ///
    /// Failures do not stop the batch; every release that cannot be
    /// resolved is reported in the returned error.
    pub fn replace(
        &self,
        patterns: &PatternSet,
        substitute: &Substitute,
    ) -> Result<ReleaseSpecifications, ResolutionErrors> {
        let mut replaced = Vec::with_capacity(self.0.len());
        let mut errors = ResolutionErrors::default();

        for spec in &self.0 {
            match spec.replace(patterns, substitute) {
                Ok(spec) => replaced.push(spec),
                Err(source) => errors.errors.push(ReleaseError::Substitution {
                    release: spec.release.name.clone(),
                    source,
                }),
            }
        }

        if errors.is_empty() {
            Ok(ReleaseSpecifications(replaced))
        } else {
            Err(errors)
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|spec| spec.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReleaseSpecification> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl IntoIterator for ReleaseSpecifications {
    type Item = ReleaseSpecification;
    type IntoIter = std::vec::IntoIter<ReleaseSpecification>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{APPLICATION_NAME, Conditions, ENVIRONMENT_TYPE};
    use crate::context::Context;
    use crate::overrides::OverrideSpecification;
    use serde_json::json;

    fn spec(name: &str, values: serde_json::Value) -> ReleaseSpecification {
        ReleaseSpecification::new(
            Release::new(name, "commerce")
                .with_chart("chartmuseum/orders", Some("1.0.0".into()))
                .with_values(Values(values)),
        )
    }

    #[test]
    fn test_effective_namespace() {
        let mut release = Release::new("dns", "platform");
        assert_eq!(release.effective_namespace(), "platform");

        release.privileged = true;
        assert_eq!(release.effective_namespace(), PRIVILEGED_NAMESPACE);
    }

    #[test]
    fn test_has_build_dependency() {
        let direct = Release::new("orders", "commerce").with_chart("repo/orders", None);
        assert!(!direct.has_build_dependency());

        let composed = Release::new("orders", "commerce").with_chart_spec(ChartSpec {
            name: "orders-deps".into(),
            dependencies: vec![Dependency::new("postgresql", "12.1.0", "https://charts.example.com")],
        });
        assert!(composed.has_build_dependency());
        assert_eq!(composed.chart_name(), "orders-deps");

        let built = composed.built_from("chartmuseum/orders-deps", "0.0.1");
        assert_eq!(built.chart_name(), "chartmuseum/orders-deps");
        assert!(!built.has_build_dependency());
        // The original is untouched
        assert!(composed.chart.is_none());
    }

    #[test]
    fn test_enrich_with_records_applied_overrides() {
        let original = spec("orders", json!({"replicas": 1, "image": {"tag": "1.0"}}));
        let overrides = Overrides::new(vec![
            OverrideSpecification {
                matches: Conditions::new().with(APPLICATION_NAME, "orders"),
                values: Values(json!({"replicas": 3})),
            },
            OverrideSpecification {
                matches: Conditions::new().with(APPLICATION_NAME, "payments"),
                values: Values(json!({"replicas": 9})),
            },
        ]);
        let context = Context::new("components", "gke").with_label(ENVIRONMENT_TYPE, "staging");

        let enriched = original.enrich_with(&overrides, &Predicate::from_context(&context), &Labels::default());

        assert_eq!(enriched.release.values.get("replicas").unwrap(), 3);
        assert_eq!(enriched.release.values.get("image.tag").unwrap(), "1.0");
        assert_eq!(enriched.release.overrides.len(), 1);
        assert_eq!(original.release.values.get("replicas").unwrap(), 1);
    }

    #[test]
    fn test_replace_records_used_variables() {
        let original = spec("orders", json!({"host": "${HOST}"}));
        let substitute = Substitute::new().with("HOST", "db").with("OTHER", "x");

        let replaced = original.replace(&PatternSet::new(), &substitute).unwrap();
        assert_eq!(replaced.release.values.get("host").unwrap(), "db");
        assert_eq!(replaced.release.substituted_vars, Substitute::new().with("HOST", "db"));
        assert_eq!(original.release.values.get("host").unwrap(), "${HOST}");
    }

    #[test]
    fn test_batch_replace_collects_every_failure() {
        let specs = ReleaseSpecifications::new(vec![
            spec("orders", json!({"host": "${ORDERS_HOST}"})),
            spec("payments", json!({"host": "${PAYMENTS_HOST}", "port": "${PORT}"})),
            spec("search", json!({"host": "${SEARCH_HOST}"})),
        ]);
        let substitute = Substitute::new().with("ORDERS_HOST", "orders");

        let err = specs.replace(&PatternSet::new(), &substitute).unwrap_err();
        assert_eq!(err.len(), 2);
        assert_eq!(
            err.to_string(),
            "Unable to resolve 2 release(s):\n\t1. release 'payments': Unable to replace 2 variable(s):\n\t1. ${PAYMENTS_HOST}\n\t2. ${PORT}\n\t2. release 'search': Unable to replace 1 variable(s):\n\t1. ${SEARCH_HOST}"
        );
    }

    #[test]
    fn test_mount_merges_values() {
        let original = spec("orders", json!({"db": {"host": "a"}}));
        let mounted = original.mount(&Values(json!({"db": {"password": "secret"}})));

        assert_eq!(mounted.release.values.get("db.host").unwrap(), "a");
        assert_eq!(mounted.release.values.get("db.password").unwrap(), "secret");
    }

    #[test]
    fn test_deserialize_specification() {
        let yaml = r#"
release:
  name: orders
  namespace: commerce
  chart: chartmuseum/orders
  chartVersion: 1.2.0
  currentReleaseVersion: 4
  values:
    host: ${ORDERS_HOST}
configs:
  vault:
    path: secret/orders
dependsOn: [postgres]
"#;
        let spec: ReleaseSpecification = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.release.chart_version.as_deref(), Some("1.2.0"));
        assert_eq!(spec.release.current_release_version, Some(4));
        assert_eq!(spec.depends_on, vec!["postgres"]);
        assert_eq!(spec.configs["vault"], json!({"path": "secret/orders"}));
        assert!(spec.mounts.is_empty());
    }
}
