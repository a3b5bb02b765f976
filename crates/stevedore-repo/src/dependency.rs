//! Dependency charts
//!
//! A release declaring a `chartSpec` is deployed from a chart composed of its
//! dependencies only. The chart is published to the chart repository and
//! versioned by content:
//!
//! - **Checksum**: sha256 of the dependency list sorted by `(name, alias)`,
//!   first 8 hex characters, stored as the chart's `appVersion`
//! - **Reuse**: the latest published version is reused when its checksum matches
//! - **Version ladder**: patch up to 10, then minor up to 10, then major

use async_trait::async_trait;
use semver::Version;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use stevedore_core::{Dependency, Release};

use crate::archive::package_chart;
use crate::backend::{ChartRepository, latest};
use crate::chart::ChartMetadata;
use crate::error::{RepoError, Result};

/// Version of the first build of a dependency chart
pub const INITIAL_VERSION: Version = Version::new(0, 0, 1);

/// Length of the dependency checksum
pub const CHECKSUM_LENGTH: usize = 8;

/// Highest patch (then minor) before the next level is bumped
const LADDER_STEP: u64 = 10;

/// Order-independent checksum of a dependency list
pub fn checksum(dependencies: &[Dependency]) -> String {
    let mut sorted: Vec<&Dependency> = dependencies.iter().collect();
    sorted.sort_by(|a, b| (&a.name, &a.alias).cmp(&(&b.name, &b.alias)));

    let mut hasher = Sha256::new();
    for dependency in sorted {
        for field in [
            dependency.name.as_str(),
            dependency.alias.as_deref().unwrap_or_default(),
            dependency.version.as_str(),
            dependency.repository.as_str(),
            dependency.condition.as_deref().unwrap_or_default(),
        ] {
            hasher.update(field.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update(b"\n");
    }

    let digest = hex::encode(hasher.finalize());
    digest[..CHECKSUM_LENGTH].to_string()
}

/// Next version on the ladder
///
/// `0.0.9 -> 0.0.10 -> 0.1.0`, `0.10.10 -> 1.0.0`.
pub fn next_version(current: &Version) -> Version {
    if current.patch < LADDER_STEP {
        Version::new(current.major, current.minor, current.patch + 1)
    } else if current.minor < LADDER_STEP {
        Version::new(current.major, current.minor + 1, 0)
    } else {
        Version::new(current.major + 1, 0, 0)
    }
}

/// What has to happen for a release's dependency chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildPlan {
    /// The release uses a regular chart
    NoDependencies,
    /// An identical chart is already published
    Reuse { version: Version, checksum: String },
    /// A new chart version must be built and published
    Build { version: Version, checksum: String },
}

/// Decide the build for `release` given the published versions of its chart
pub fn plan(release: &Release, published: &[crate::backend::ChartInfo]) -> BuildPlan {
    let Some(spec) = release.chart_spec.as_ref().filter(|_| release.has_build_dependency()) else {
        return BuildPlan::NoDependencies;
    };

    let checksum = checksum(&spec.dependencies);

    match latest(published) {
        None => BuildPlan::Build {
            version: INITIAL_VERSION,
            checksum,
        },
        Some(existing) => {
            // latest() only returns parsable versions
            let version = existing.semver().unwrap_or(INITIAL_VERSION);
            if existing.app_version == checksum {
                BuildPlan::Reuse { version, checksum }
            } else {
                BuildPlan::Build {
                    version: next_version(&version),
                    checksum,
                }
            }
        }
    }
}

/// Fetches the dependencies of a chart directory into its `charts/`
#[async_trait]
pub trait DependencyUpdater: Send + Sync {
    async fn update(&self, chart_dir: &Path) -> Result<()>;
}

/// `helm dependency update`
#[derive(Debug, Clone)]
pub struct HelmDependencyUpdater {
    helm_binary: String,
}

impl HelmDependencyUpdater {
    pub fn new(helm_binary: impl Into<String>) -> Self {
        Self {
            helm_binary: helm_binary.into(),
        }
    }
}

impl Default for HelmDependencyUpdater {
    fn default() -> Self {
        Self::new("helm")
    }
}

#[async_trait]
impl DependencyUpdater for HelmDependencyUpdater {
    async fn update(&self, chart_dir: &Path) -> Result<()> {
        let chart = chart_dir.display().to_string();
        tracing::debug!(chart = %chart, "updating chart dependencies");

        let output = tokio::process::Command::new(&self.helm_binary)
            .args(["dependency", "update"])
            .arg(chart_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RepoError::DependencyUpdate {
                chart: chart.clone(),
                message: format!("failed to run {}: {}", self.helm_binary, e),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(RepoError::DependencyUpdate {
                chart,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// Turns a release into one that can be deployed from a repository chart
#[async_trait]
pub trait ChartBuilder: Send + Sync {
    /// The release pointing at its built chart, or unchanged when it has no
    /// dependency chart
    async fn build(&self, release: &Release) -> Result<Release>;
}

/// Builds dependency charts and publishes them to a chart repository
#[derive(Clone)]
pub struct DependencyBuilder {
    repository: Arc<dyn ChartRepository>,
    updater: Arc<dyn DependencyUpdater>,
}

impl DependencyBuilder {
    pub fn new(repository: Arc<dyn ChartRepository>, updater: Arc<dyn DependencyUpdater>) -> Self {
        Self { repository, updater }
    }

    async fn publish(&self, release: &Release, version: &Version, checksum: &str) -> Result<()> {
        let spec = release.chart_spec.as_ref().ok_or_else(|| RepoError::Build {
            chart: release.name.clone(),
            message: "release has no chartSpec".to_string(),
        })?;

        let workdir = tempfile::tempdir()?;
        let chart_dir = workdir.path().join(&spec.name);

        ChartMetadata::new(&spec.name, version.to_string(), checksum, spec.dependencies.clone())
            .write_to(&chart_dir)?;
        self.updater.update(&chart_dir).await?;

        let archive = package_chart(&chart_dir, &spec.name, &version.to_string(), workdir.path())?;
        self.repository.upload(&archive).await?;

        tracing::info!(chart = %spec.name, version = %version, checksum, "published dependency chart");
        Ok(())
    }
}

#[async_trait]
impl ChartBuilder for DependencyBuilder {
    async fn build(&self, release: &Release) -> Result<Release> {
        if !release.has_build_dependency() {
            return Ok(release.clone());
        }
        let chart_name = release.chart_name().to_string();

        let published = self.repository.get(&chart_name).await?;
        let reference = format!("{}/{}", self.repository.name(), chart_name);

        match plan(release, &published) {
            BuildPlan::NoDependencies => Ok(release.clone()),
            BuildPlan::Reuse { version, checksum } => {
                tracing::debug!(chart = %chart_name, version = %version, checksum, "reusing dependency chart");
                Ok(release.built_from(reference, version.to_string()))
            }
            BuildPlan::Build { version, checksum } => {
                self.publish(release, &version, &checksum).await?;
                Ok(release.built_from(reference, version.to_string()))
            }
        }
    }
}

/// Builder for setups without a chart repository
///
/// Releases with a regular chart pass through; dependency charts fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableBuilder;

#[async_trait]
impl ChartBuilder for UnavailableBuilder {
    async fn build(&self, release: &Release) -> Result<Release> {
        if release.has_build_dependency() {
            return Err(RepoError::Build {
                chart: release.chart_name().to_string(),
                message: "no chart repository configured".to_string(),
            });
        }
        Ok(release.clone())
    }
}
