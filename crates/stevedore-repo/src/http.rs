//! ChartMuseum HTTP API client
//!
//! - `GET  {url}/api/charts/{name}` lists every version of a chart
//! - `POST {url}/api/charts` publishes a chart archive

use async_trait::async_trait;
use reqwest::StatusCode;
use std::path::Path;
use std::time::Duration;

use crate::backend::{ChartInfo, ChartRepository};
use crate::config::Repository;
use crate::credentials::{ResolvedCredentials, same_origin};
use crate::error::{RepoError, Result};

/// HTTP chart repository client
pub struct HttpChartRepository {
    repo: Repository,
    client: reqwest::Client,
    credentials: Option<ResolvedCredentials>,
}

impl HttpChartRepository {
    /// Create a client, resolving the repository credentials
    pub fn new(repo: Repository) -> Result<Self> {
        Self::with_timeout(repo, Duration::from_secs(30))
    }

    pub fn with_timeout(repo: Repository, timeout: Duration) -> Result<Self> {
        repo.validate()?;

        let credentials = repo.credentials.as_ref().map(|c| c.resolve()).transpose()?;

        let client = reqwest::Client::builder()
            // Redirects could carry credentials to another origin
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| RepoError::NetworkError {
                message: e.to_string(),
            })?;

        Ok(Self {
            repo,
            client,
            credentials,
        })
    }

    pub fn url(&self) -> &str {
        &self.repo.url
    }

    fn authorized(&self, request: reqwest::RequestBuilder, url: &str) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some(credentials) if same_origin(url, &self.repo.url) => credentials.apply(request),
            _ => request,
        }
    }
}

#[async_trait]
impl ChartRepository for HttpChartRepository {
    fn name(&self) -> &str {
        &self.repo.name
    }

    async fn get(&self, chart: &str) -> Result<Vec<ChartInfo>> {
        let url = self.repo.chart_url(chart);
        let response = self.authorized(self.client.get(&url), &url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::debug!(chart, "chart not found in repository");
                Ok(Vec::new())
            }
            status if status.is_success() => {
                let bytes = response.bytes().await?;
                Ok(serde_json::from_slice(&bytes)?)
            }
            status => Err(RepoError::UnexpectedResponse {
                status: status.as_u16(),
                url,
            }),
        }
    }

    async fn upload(&self, archive: &Path) -> Result<()> {
        let url = self.repo.upload_url();
        let data = tokio::fs::read(archive).await?;

        tracing::info!(archive = %archive.display(), repository = %self.repo.name, "uploading chart");

        let request = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/gzip")
            .body(data);
        let response = self.authorized(request, &url).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RepoError::UnexpectedResponse {
                status: status.as_u16(),
                url,
            })
        }
    }
}
