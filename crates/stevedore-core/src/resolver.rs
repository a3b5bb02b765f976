//! Resolution of manifest files into a deployable plan
//!
//! For a given context, every release of every applicable manifest is
//! enriched with its matching overrides, has its `${VAR}` placeholders
//! replaced and its provider mounts merged in. Releases that do not apply are
//! accounted for in [`IgnoredReleases`] with a reason.

use std::collections::BTreeMap;

use crate::conditions::Labels;
use crate::context::{Context, Predicate};
use crate::envs::Envs;
use crate::error::{CoreError, ReleaseError, ResolutionErrors, Result, ValidationErrors};
use crate::ignores::{EXPLICIT_IGNORE, IgnoredReleases, Ignores, not_applicable};
use crate::manifest::ManifestFiles;
use crate::overrides::Overrides;
use crate::providers::Providers;
use crate::release::{ReleaseSpecification, ReleaseSpecifications};
use crate::substitute::{PatternSet, Substitute};
use crate::validate::Validator;

/// Resolved releases of one manifest file, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedFile {
    pub file: String,
    pub specs: ReleaseSpecifications,
}

/// Outcome of a resolution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub files: Vec<ResolvedFile>,
    pub ignored: IgnoredReleases,
}

impl Resolution {
    pub fn release_count(&self) -> usize {
        self.files.iter().map(|f| f.specs.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.release_count() == 0
    }
}

/// Resolution engine
///
/// All inputs are given at construction; a resolver holds no mutable state
/// and can resolve any number of contexts.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    validator: Validator,
    patterns: PatternSet,
    labels: Labels,
    overrides: Overrides,
    envs: Envs,
    ignores: Ignores,
    providers: Providers,
    env: Substitute,
}

impl Resolver {
    pub fn new(labels: Labels) -> Self {
        Self {
            validator: Validator::new(labels.clone()),
            labels,
            ..Default::default()
        }
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_envs(mut self, envs: Envs) -> Self {
        self.envs = envs;
        self
    }

    pub fn with_ignores(mut self, ignores: Ignores) -> Self {
        self.ignores = ignores;
        self
    }

    pub fn with_providers(mut self, providers: Providers) -> Self {
        self.providers = providers;
        self
    }

    /// Caller-supplied variables, overriding provider configs
    pub fn with_env(mut self, env: Substitute) -> Self {
        self.env = env;
        self
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Every validation issue of the rules and the manifest files
    pub fn validate(&self, files: &ManifestFiles) -> std::result::Result<(), ValidationErrors> {
        let mut errors = self.validator.validate_labels();
        errors.extend(self.validator.validate_overrides(&self.overrides));
        errors.extend(self.validator.validate_envs(&self.envs));
        errors.extend(self.validator.validate_ignores(&self.ignores));
        for file in files.iter() {
            errors.extend(self.validator.validate_manifest_file(file));
        }
        errors.into_result()
    }

    /// Resolve `files` for `context`
    ///
    /// Validation errors abort before anything is resolved. Per-release
    /// substitution and provider errors are collected over the whole batch.
    pub async fn resolve(&self, context: &Context, files: ManifestFiles) -> Result<Resolution> {
        self.validate(&files)?;

        let predicate = Predicate::from_context(context);
        let provider_context = predicate.conditions().as_map().clone();

        let ignore_rules = self.ignores.collate_by(&predicate, &self.labels);
        for rule in ignore_rules.0.iter() {
            for release in rule.releases.iter().filter(|r| !r.reason.is_empty()) {
                tracing::debug!(release = %release.name, note = %release.reason, "ignore rule applies");
            }
        }
        let ignored_names = ignore_rules.release_names();

        let mut resolution = Resolution::default();
        let mut errors = ResolutionErrors::default();

        for manifest_file in files {
            let mut resolved = Vec::new();

            for manifest in manifest_file.manifests {
                if !manifest.applies_to(&predicate) {
                    for spec in manifest.spec.iter() {
                        tracing::debug!(file = %manifest_file.file, release = %spec.name(), "manifest not applicable");
                        resolution
                            .ignored
                            .push(&manifest_file.file, spec.name(), not_applicable(&context.name));
                    }
                    continue;
                }

                for spec in manifest.spec {
                    if ignored_names.contains(spec.name()) {
                        tracing::debug!(file = %manifest_file.file, release = %spec.name(), "release ignored");
                        resolution
                            .ignored
                            .push(&manifest_file.file, spec.name(), EXPLICIT_IGNORE);
                        continue;
                    }

                    match self.resolve_release(&spec, &predicate, &provider_context).await {
                        Ok(spec) => resolved.push(spec),
                        Err(e) => errors.errors.push(e),
                    }
                }
            }

            resolution.files.push(ResolvedFile {
                file: manifest_file.file,
                specs: ReleaseSpecifications::new(resolved),
            });
        }

        if !errors.is_empty() {
            return Err(CoreError::Resolution(errors));
        }

        tracing::info!(
            context = %context.name,
            releases = resolution.release_count(),
            ignored = resolution.ignored.len(),
            "resolved manifests"
        );
        Ok(resolution)
    }

    async fn resolve_release(
        &self,
        spec: &ReleaseSpecification,
        predicate: &Predicate,
        provider_context: &BTreeMap<String, String>,
    ) -> std::result::Result<ReleaseSpecification, ReleaseError> {
        let name = spec.name().to_string();
        let provider_error = |source| ReleaseError::Provider {
            release: name.clone(),
            source,
        };

        let enriched = spec.enrich_with(&self.overrides, predicate, &self.labels);

        let fetched = self
            .providers
            .fetch_release(&spec.configs, &spec.mounts, provider_context)
            .await
            .map_err(provider_error)?;
        let matched = self
            .envs
            .collate_by(&predicate.with_application(&name), &self.labels)
            .merged();
        let substitute = Substitute::merge_all([&fetched.substitute, &self.env, &matched]);

        let replaced = enriched
            .replace(&self.patterns, &substitute)
            .map_err(|source| ReleaseError::Substitution {
                release: name.clone(),
                source,
            })?;

        if spec.mounts.is_empty() {
            return Ok(replaced);
        }
        Ok(replaced.mount(&fetched.values))
    }
}
