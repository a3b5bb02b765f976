//! Upstalls through the `helm` binary

use async_trait::async_trait;
use serde::Deserialize;
use std::io::Write;
use std::process::Stdio;
use std::time::Duration;
use tokio::time::Instant;

use crate::diff::ManifestDiff;
use crate::error::{DeployError, Result};
use crate::upstall::{UpstallRequest, UpstallResult, Upstaller};

/// Deploys releases into one namespace with `helm upgrade --install`
#[derive(Debug, Clone)]
pub struct HelmUpstaller {
    helm_binary: String,
    kube_context: Option<String>,
}

impl HelmUpstaller {
    pub fn new(helm_binary: impl Into<String>) -> Self {
        Self {
            helm_binary: helm_binary.into(),
            kube_context: None,
        }
    }

    /// Target a specific kubeconfig context
    pub fn with_kube_context(mut self, kube_context: impl Into<String>) -> Self {
        self.kube_context = Some(kube_context.into());
        self
    }

    fn command(&self, namespace: &str) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.helm_binary);
        command.arg("--namespace").arg(namespace);
        if let Some(context) = &self.kube_context {
            command.arg("--kube-context").arg(context);
        }
        command.stdin(Stdio::null()).kill_on_drop(true);
        command
    }

    /// Run helm, returning stdout on success or stderr on failure
    async fn run(
        &self,
        request: &UpstallRequest,
        deadline: Instant,
        subcommand: &str,
        args: &[String],
    ) -> Result<std::result::Result<String, String>> {
        let mut command = self.command(&request.namespace);
        command.args(args);

        let output = tokio::time::timeout_at(deadline, command.output())
            .await
            .map_err(|_| DeployError::Helm {
                release: request.release_name.clone(),
                command: subcommand.to_string(),
                message: format!("timed out after {}s", request.timeout.as_secs()),
            })?
            .map_err(|e| DeployError::Helm {
                release: request.release_name.clone(),
                command: subcommand.to_string(),
                message: format!("failed to run {}: {}", self.helm_binary, e),
            })?;

        if output.status.success() {
            Ok(Ok(String::from_utf8_lossy(&output.stdout).into_owned()))
        } else {
            Ok(Err(String::from_utf8_lossy(&output.stderr).trim().to_string()))
        }
    }

    /// Deployed release version, `None` when the release does not exist yet
    async fn deployed_version(
        &self,
        request: &UpstallRequest,
        deadline: Instant,
    ) -> Result<Option<i64>> {
        let args = vec![
            "status".to_string(),
            request.release_name.clone(),
            "--output".to_string(),
            "json".to_string(),
        ];
        match self.run(request, deadline, "status", &args).await? {
            Ok(stdout) => Ok(Some(serde_json::from_str::<HelmStatus>(&stdout)?.version)),
            Err(stderr) if is_not_found(&stderr) => Ok(None),
            Err(stderr) => Err(helm_error(request, "status", stderr)),
        }
    }

    async fn existing_manifest(&self, request: &UpstallRequest, deadline: Instant) -> Result<String> {
        let args = vec![
            "get".to_string(),
            "manifest".to_string(),
            request.release_name.clone(),
        ];
        match self.run(request, deadline, "get manifest", &args).await? {
            Ok(stdout) => Ok(stdout),
            Err(stderr) if is_not_found(&stderr) => Ok(String::new()),
            Err(stderr) => Err(helm_error(request, "get manifest", stderr)),
        }
    }
}

impl Default for HelmUpstaller {
    fn default() -> Self {
        Self::new("helm")
    }
}

#[async_trait]
impl Upstaller for HelmUpstaller {
    async fn upstall(&self, request: &UpstallRequest) -> Result<UpstallResult> {
        // One ceiling for every helm call of this release
        let deadline = Instant::now() + request.timeout;

        let deployed = self.deployed_version(request, deadline).await?;
        check_release_version(request, deployed)?;

        let existing = if deployed.is_some() {
            self.existing_manifest(request, deadline).await?
        } else {
            String::new()
        };

        let mut values_file = tempfile::Builder::new()
            .prefix("stevedore-values-")
            .suffix(".yaml")
            .tempfile()?;
        values_file.write_all(request.values.as_bytes())?;
        values_file.flush()?;

        let args = upgrade_args(
            request,
            &values_file.path().display().to_string(),
            deadline.saturating_duration_since(Instant::now()),
        );
        tracing::debug!(
            release = %request.release_name,
            namespace = %request.namespace,
            dry_run = request.dry_run,
            "helm upgrade --install"
        );

        let stdout = self
            .run(request, deadline, "upgrade", &args)
            .await?
            .map_err(|stderr| helm_error(request, "upgrade", stderr))?;
        let upgraded: HelmRelease = serde_json::from_str(&stdout)?;

        let diff = ManifestDiff::between(&existing, &upgraded.manifest);
        Ok(UpstallResult {
            has_diff: diff.has_changes(),
            diff: diff.to_unified_diff(),
            summary: diff.summary(),
            existing_resources: existing,
            new_resources: upgraded.manifest,
            chart_version: upgraded.chart.metadata.version,
            release_version: upgraded.version,
        })
    }
}

fn check_release_version(request: &UpstallRequest, deployed: Option<i64>) -> Result<()> {
    match (request.current_release_version, deployed) {
        (Some(expected), Some(actual)) if expected != actual => Err(DeployError::VersionMismatch {
            release: request.release_name.clone(),
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}

fn upgrade_args(request: &UpstallRequest, values_path: &str, remaining: Duration) -> Vec<String> {
    let mut args = vec![
        "upgrade".to_string(),
        "--install".to_string(),
        request.release_name.clone(),
        request.chart.clone(),
        "--values".to_string(),
        values_path.to_string(),
        "--output".to_string(),
        "json".to_string(),
        "--timeout".to_string(),
        format!("{}s", timeout_seconds(remaining)),
    ];
    if let Some(version) = &request.chart_version {
        args.push("--version".to_string());
        args.push(version.clone());
    }
    if request.dry_run {
        args.push("--dry-run".to_string());
    }
    if request.atomic {
        args.push("--atomic".to_string());
    }
    args
}

fn timeout_seconds(timeout: Duration) -> u64 {
    timeout.as_secs().max(1)
}

/// Helm reports a missing release as `release: not found`
fn is_not_found(stderr: &str) -> bool {
    stderr.contains("release: not found")
}

fn helm_error(request: &UpstallRequest, command: &str, message: String) -> DeployError {
    DeployError::Helm {
        release: request.release_name.clone(),
        command: command.to_string(),
        message,
    }
}

#[derive(Debug, Deserialize)]
struct HelmStatus {
    version: i64,
}

#[derive(Debug, Deserialize)]
struct HelmRelease {
    #[serde(default)]
    manifest: String,
    version: i64,
    chart: HelmChart,
}

#[derive(Debug, Deserialize)]
struct HelmChart {
    metadata: HelmChartMetadata,
}

#[derive(Debug, Deserialize)]
struct HelmChartMetadata {
    version: String,
}
