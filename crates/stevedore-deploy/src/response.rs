//! Per-release outcomes of a deploy run

use serde::{Deserialize, Serialize};

use stevedore_core::{Release, numbered};

/// Outcome of one attempted release
///
/// Created once per release and per run, never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Manifest file the release comes from
    pub file: String,
    pub release_name: String,
    pub namespace: String,
    pub chart: String,

    /// Chart version actually deployed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_version: Option<String>,

    /// Release version after the deploy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_version: Option<i64>,

    pub has_diff: bool,

    /// Unified diff between the deployed and the new manifests
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub diff: String,

    /// One-line summary of the diff
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,

    pub dry_run: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Response skeleton identifying `release`
    pub fn for_release(file: &str, release: &Release, dry_run: bool) -> Self {
        Self {
            file: file.to_string(),
            release_name: release.name.clone(),
            namespace: release.effective_namespace().to_string(),
            chart: release.chart_name().to_string(),
            chart_version: release.chart_version.clone(),
            dry_run,
            ..Default::default()
        }
    }

    /// Failed response for `release`
    pub fn failure(file: &str, release: &Release, dry_run: bool, error: impl std::fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::for_release(file, release, dry_run)
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Nothing changed and nothing failed
    pub fn is_noop(&self) -> bool {
        !self.has_diff && self.error.is_none()
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "release '{}' ({})", self.release_name, self.namespace)?;
        if let Some(error) = &self.error {
            write!(f, ": {}", error)?;
        }
        Ok(())
    }
}

/// Responses of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Responses(pub Vec<Response>);

impl Responses {
    pub fn new(responses: Vec<Response>) -> Self {
        Self(responses)
    }

    pub fn failed(&self) -> impl Iterator<Item = &Response> {
        self.0.iter().filter(|r| !r.succeeded())
    }

    pub fn has_failures(&self) -> bool {
        self.0.iter().any(|r| !r.succeeded())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Response> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sort by file then release name, for stable display of parallel runs
    pub fn sorted(mut self) -> Self {
        self.0
            .sort_by(|a, b| (&a.file, &a.release_name).cmp(&(&b.file, &b.release_name)));
        self
    }

    pub fn into_inner(self) -> Vec<Response> {
        self.0
    }
}

impl std::fmt::Display for Responses {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let failed: Vec<&Response> = self.failed().collect();
        let header = format!("Failed to deploy {} release(s):", failed.len());
        write!(f, "{}", numbered(&header, failed))
    }
}
