//! Structural validation of documents before resolution
//!
//! Validation never stops at the first problem: every issue of a unit is
//! collected so a file can be fixed in one pass.

use crate::conditions::{Conditions, Labels, MAX_LABELS};
use crate::envs::Envs;
use crate::error::ValidationErrors;
use crate::ignores::Ignores;
use crate::manifest::{Manifest, ManifestFile};
use crate::overrides::Overrides;
use crate::release::{ChartSpec, Release, ReleaseSpecification};

/// Validation rules parameterized by the known matching labels
#[derive(Debug, Clone, Default)]
pub struct Validator {
    labels: Labels,
}

impl Validator {
    pub fn new(labels: Labels) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Too many labels would overflow the weight range
    pub fn validate_labels(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.labels.len() > MAX_LABELS {
            errors.push(
                "labels",
                format!("at most {} labels are supported, found {}", MAX_LABELS, self.labels.len()),
            );
        }
        errors
    }

    pub fn validate_conditions(&self, conditions: &Conditions) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for (key, value) in conditions.iter() {
            if !self.labels.contains(key) {
                errors.push("", format!("unknown condition '{}'", key));
            } else if value.trim().is_empty() {
                errors.push("", format!("condition '{}' has an empty value", key));
            }
        }
        errors
    }

    pub fn validate_release(&self, release: &Release) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if release.name.trim().is_empty() {
            errors.push("", "name is required");
        }
        if !release.privileged && release.namespace.trim().is_empty() {
            errors.push("", "namespace is required");
        }

        let has_chart = release.chart.as_deref().is_some_and(|c| !c.trim().is_empty());
        let has_spec = release
            .chart_spec
            .as_ref()
            .is_some_and(|spec| !spec.dependencies.is_empty());
        match (has_chart, has_spec) {
            (true, true) => errors.push("", "EitherChartOrChartSpec: chart and chartSpec are mutually exclusive"),
            (false, false) => errors.push("", "EitherChartOrChartSpec: one of chart or chartSpec.dependencies is required"),
            _ => {}
        }

        if let Some(spec) = &release.chart_spec {
            errors.extend(self.validate_chart_spec(spec));
        }

        errors
    }

    fn validate_chart_spec(&self, spec: &ChartSpec) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if !spec.dependencies.is_empty() && spec.name.trim().is_empty() {
            errors.push("chartSpec", "name is required");
        }

        for (index, dependency) in spec.dependencies.iter().enumerate() {
            let location = format!("chartSpec.dependencies[{}]", index);
            for (field, value) in [
                ("name", &dependency.name),
                ("version", &dependency.version),
                ("repository", &dependency.repository),
            ] {
                if value.trim().is_empty() {
                    errors.push(location.clone(), format!("{} is required", field));
                }
            }
        }

        errors
    }

    pub fn validate_specification(&self, spec: &ReleaseSpecification) -> ValidationErrors {
        let mut errors = self.validate_release(&spec.release);

        if spec.depends_on.iter().any(|name| name == &spec.release.name) {
            errors.push("dependsOn", "a release cannot depend on itself");
        }
        for (name, _) in spec.configs.iter().chain(spec.mounts.iter()) {
            if name.trim().is_empty() {
                errors.push("configs", "provider name is required");
            }
        }

        errors
    }

    pub fn validate_manifest(&self, manifest: &Manifest) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if manifest.deploy_to.is_empty() {
            errors.push("deployTo", "at least one matcher is required");
        }
        for (index, matcher) in manifest.deploy_to.iter().enumerate() {
            let location = format!("deployTo[{}]", index);
            if matcher.is_empty() {
                errors.push(location.clone(), "matcher has no conditions");
            }
            errors.extend(self.validate_conditions(matcher).scoped(&location));
        }

        for (index, spec) in manifest.spec.iter().enumerate() {
            let scope = if spec.release.name.is_empty() {
                format!("spec[{}]", index)
            } else {
                format!("release '{}'", spec.release.name)
            };
            errors.extend(self.validate_specification(spec).scoped(&scope));
        }

        errors
    }

    /// Every issue of a manifest file, scoped by file name
    pub fn validate_manifest_file(&self, file: &ManifestFile) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        let multi = file.manifests.len() > 1;

        for (index, manifest) in file.manifests.iter().enumerate() {
            let issues = self.validate_manifest(manifest);
            if multi {
                errors.extend(issues.scoped(&format!("document[{}]", index)));
            } else {
                errors.extend(issues);
            }
        }

        errors.scoped(&file.file)
    }

    pub fn validate_overrides(&self, overrides: &Overrides) -> ValidationErrors {
        self.validate_rules(overrides.iter().map(|o| &o.matches), "overrides")
    }

    pub fn validate_envs(&self, envs: &Envs) -> ValidationErrors {
        self.validate_rules(envs.0.iter().map(|e| &e.matches), "envs")
    }

    pub fn validate_ignores(&self, ignores: &Ignores) -> ValidationErrors {
        let mut errors = self.validate_rules(ignores.0.iter().map(|i| &i.matches), "ignores");
        for (index, ignore) in ignores.0.iter().enumerate() {
            for release in &ignore.releases {
                if release.name.trim().is_empty() {
                    errors.push(format!("ignores[{}]", index), "release name is required");
                }
            }
        }
        errors
    }

    fn validate_rules<'a, I>(&self, rules: I, kind: &str) -> ValidationErrors
    where
        I: Iterator<Item = &'a Conditions>,
    {
        let mut errors = ValidationErrors::new();
        for (index, matches) in rules.enumerate() {
            let location = format!("{}[{}].matches", kind, index);
            if matches.is_empty() {
                errors.push(location.clone(), "no conditions, the rule would never apply");
            }
            errors.extend(self.validate_conditions(matches).scoped(&location));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{APPLICATION_NAME, ENVIRONMENT_TYPE, WeightedLabel};
    use crate::overrides::OverrideSpecification;
    use crate::release::{Dependency, ReleaseSpecifications};
    use crate::values::Values;

    fn chart_release(name: &str) -> Release {
        Release::new(name, "commerce").with_chart("chartmuseum/orders", None)
    }

    #[test]
    fn test_unknown_and_empty_conditions() {
        let validator = Validator::default();
        let conditions = Conditions::new()
            .with(ENVIRONMENT_TYPE, "")
            .with("team", "payments")
            .with(APPLICATION_NAME, "orders");

        let errors = validator.validate_conditions(&conditions);
        assert_eq!(errors.len(), 2);
        let rendered = errors.to_string();
        assert!(rendered.contains("condition 'environmentType' has an empty value"));
        assert!(rendered.contains("unknown condition 'team'"));
    }

    #[test]
    fn test_custom_labels_are_known() {
        let labels = Labels::from_weighted(vec![
            WeightedLabel { name: "region".into(), weight: 1 },
            WeightedLabel { name: ENVIRONMENT_TYPE.into(), weight: 2 },
        ]);
        let validator = Validator::new(labels);

        assert!(validator.validate_conditions(&Conditions::new().with("region", "eu")).is_empty());
        assert!(!validator.validate_conditions(&Conditions::new().with("environment", "a")).is_empty());
    }

    #[test]
    fn test_too_many_labels() {
        let labels = Labels::new((0..64).map(|i| format!("label{}", i)));
        assert_eq!(Validator::new(labels).validate_labels().len(), 1);
        assert!(Validator::default().validate_labels().is_empty());
    }

    #[test]
    fn test_either_chart_or_chart_spec() {
        let validator = Validator::default();

        assert!(validator.validate_release(&chart_release("orders")).is_empty());

        let neither = Release::new("orders", "commerce");
        let errors = validator.validate_release(&neither);
        assert_eq!(errors.len(), 1);
        assert!(errors.to_string().contains("EitherChartOrChartSpec"));

        let both = chart_release("orders").with_chart_spec(ChartSpec {
            name: "orders".into(),
            dependencies: vec![Dependency::new("redis", "17.0.0", "https://charts.example.com")],
        });
        assert!(validator.validate_release(&both).to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_release_required_fields() {
        let validator = Validator::default();
        let release = Release::new("", "").with_chart_spec(ChartSpec {
            name: "deps".into(),
            dependencies: vec![Dependency::new("redis", "", "")],
        });

        let errors = validator.validate_release(&release);
        let messages: Vec<String> = errors.issues.iter().map(|i| i.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "name is required",
                "namespace is required",
                "chartSpec.dependencies[0]: version is required",
                "chartSpec.dependencies[0]: repository is required",
            ]
        );
    }

    #[test]
    fn test_privileged_release_needs_no_namespace() {
        let mut release = Release::new("dns", "").with_chart("chartmuseum/dns", None);
        release.privileged = true;
        assert!(Validator::default().validate_release(&release).is_empty());
    }

    #[test]
    fn test_self_dependency() {
        let mut spec = ReleaseSpecification::new(chart_release("orders"));
        spec.depends_on = vec!["postgres".into(), "orders".into()];

        let errors = Validator::default().validate_specification(&spec);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.issues[0].location, "dependsOn");
    }

    #[test]
    fn test_manifest_file_collects_everything() {
        let manifest = Manifest::new(
            vec![Conditions::new().with("team", "x")],
            ReleaseSpecifications::new(vec![
                ReleaseSpecification::new(Release::new("orders", "commerce")),
                ReleaseSpecification::new(chart_release("payments")),
            ]),
        );
        let file = ManifestFile::new("apps.yaml", vec![manifest]);

        let errors = Validator::default().validate_manifest_file(&file);
        let messages: Vec<String> = errors.issues.iter().map(|i| i.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "apps.yaml deployTo[0]: unknown condition 'team'",
                "apps.yaml release 'orders': EitherChartOrChartSpec: one of chart or chartSpec.dependencies is required",
            ]
        );
    }

    #[test]
    fn test_manifest_without_matchers() {
        let errors = Validator::default().validate_manifest(&Manifest::default());
        assert_eq!(errors.issues[0].to_string(), "deployTo: at least one matcher is required");
    }

    #[test]
    fn test_rule_files() {
        let overrides = Overrides::new(vec![OverrideSpecification {
            matches: Conditions::new(),
            values: Values::new(),
        }]);
        let errors = Validator::default().validate_overrides(&overrides);
        assert_eq!(errors.issues[0].location, "overrides[0].matches");
    }
}
