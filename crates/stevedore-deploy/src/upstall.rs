//! The install-or-upgrade capability
//!
//! An [`Upstaller`] deploys one release into the namespace it is bound to.
//! It is the only place that talks to a cluster.

use async_trait::async_trait;
use std::time::Duration;

use stevedore_core::Release;

use crate::error::Result;

/// Everything needed to install or upgrade one release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstallRequest {
    pub release_name: String,
    pub chart: String,
    pub chart_version: Option<String>,
    /// Release version the manifest was written against
    pub current_release_version: Option<i64>,
    pub namespace: String,
    /// Values rendered as YAML
    pub values: String,
    pub dry_run: bool,
    /// Hard ceiling for the whole operation
    pub timeout: Duration,
    /// Roll back on failure
    pub atomic: bool,
}

impl UpstallRequest {
    pub fn from_release(release: &Release, dry_run: bool, timeout: Duration, atomic: bool) -> Result<Self> {
        Ok(Self {
            release_name: release.name.clone(),
            chart: release.chart_name().to_string(),
            chart_version: release.chart_version.clone(),
            current_release_version: release.current_release_version,
            namespace: release.effective_namespace().to_string(),
            values: release.values.to_yaml()?,
            dry_run,
            timeout,
            atomic,
        })
    }
}

/// Outcome of a successful upstall
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstallResult {
    /// Manifest deployed before the call
    pub existing_resources: String,
    /// Manifest after the call (or that would be deployed, for dry runs)
    pub new_resources: String,
    pub has_diff: bool,
    pub diff: String,
    pub summary: String,
    pub chart_version: String,
    pub release_version: i64,
}

/// Install-or-upgrade
#[async_trait]
pub trait Upstaller: Send + Sync {
    async fn upstall(&self, request: &UpstallRequest) -> Result<UpstallResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use stevedore_core::Values;

    #[test]
    fn test_request_from_release() {
        let mut release = Release::new("dns", "platform")
            .with_chart("chartmuseum/coredns", Some("1.2.0".into()))
            .with_values(Values(serde_json::json!({"replicas": 2})));
        release.privileged = true;
        release.current_release_version = Some(7);

        let request = UpstallRequest::from_release(&release, true, Duration::from_secs(300), false).unwrap();

        assert_eq!(request.namespace, "kube-system");
        assert_eq!(request.chart, "chartmuseum/coredns");
        assert_eq!(request.chart_version.as_deref(), Some("1.2.0"));
        assert_eq!(request.current_release_version, Some(7));
        assert_eq!(request.values, "replicas: 2\n");
        assert!(request.dry_run);
    }

    #[test]
    fn test_empty_values_render_as_empty_map() {
        let release = Release::new("orders", "commerce").with_chart("chartmuseum/orders", None);
        let request = UpstallRequest::from_release(&release, false, Duration::from_secs(1), false).unwrap();
        assert_eq!(request.values, "{}\n");
    }
}
