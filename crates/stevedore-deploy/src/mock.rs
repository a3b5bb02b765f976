//! In-memory upstaller and chart builder for testing
//!
//! Lets the orchestrator run without a cluster, a helm binary or a chart
//! repository.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use stevedore_core::Release;
use stevedore_repo::{ChartBuilder, RepoError};

use crate::error::{DeployError, Result};
use crate::upstall::{UpstallRequest, UpstallResult, Upstaller};

/// Upstaller recording every request
#[derive(Clone, Default)]
pub struct MockUpstaller {
    requests: Arc<RwLock<Vec<UpstallRequest>>>,
    failing: HashSet<String>,
    unchanged: HashSet<String>,
    delay: Option<Duration>,
}

impl MockUpstaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upstalls of `release` fail
    pub fn failing(mut self, release: impl Into<String>) -> Self {
        self.failing.insert(release.into());
        self
    }

    /// Upstalls of `release` report no diff
    pub fn unchanged(mut self, release: impl Into<String>) -> Self {
        self.unchanged.insert(release.into());
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<UpstallRequest> {
        self.requests.read().unwrap().clone()
    }

    /// Release names in call order
    pub fn released(&self) -> Vec<String> {
        self.requests
            .read()
            .unwrap()
            .iter()
            .map(|r| r.release_name.clone())
            .collect()
    }
}

#[async_trait]
impl Upstaller for MockUpstaller {
    async fn upstall(&self, request: &UpstallRequest) -> Result<UpstallResult> {
        self.requests.write().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(&request.release_name) {
            return Err(DeployError::Helm {
                release: request.release_name.clone(),
                command: "upgrade".to_string(),
                message: "UPGRADE FAILED".to_string(),
            });
        }

        let has_diff = !self.unchanged.contains(&request.release_name);
        Ok(UpstallResult {
            existing_resources: String::new(),
            new_resources: request.values.clone(),
            has_diff,
            diff: if has_diff {
                format!("+{}", request.values)
            } else {
                String::new()
            },
            summary: if has_diff { "1 added" } else { "No changes" }.to_string(),
            chart_version: request.chart_version.clone().unwrap_or_else(|| "0.0.1".to_string()),
            release_version: request.current_release_version.unwrap_or(0) + 1,
        })
    }
}

/// Chart builder passing releases through, failing the configured ones
#[derive(Clone, Default)]
pub struct MockChartBuilder {
    failing: HashSet<String>,
    builds: Arc<RwLock<Vec<String>>>,
}

impl MockChartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, release: impl Into<String>) -> Self {
        self.failing.insert(release.into());
        self
    }

    /// Release names in build order
    pub fn builds(&self) -> Vec<String> {
        self.builds.read().unwrap().clone()
    }
}

#[async_trait]
impl ChartBuilder for MockChartBuilder {
    async fn build(&self, release: &Release) -> stevedore_repo::Result<Release> {
        self.builds.write().unwrap().push(release.name.clone());

        if self.failing.contains(&release.name) {
            return Err(RepoError::NetworkError {
                message: "Connection failed: chart repository unreachable".to_string(),
            });
        }
        Ok(release.clone())
    }
}
