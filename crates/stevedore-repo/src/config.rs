//! Chart repository definition

use serde::{Deserialize, Serialize};
use url::Url;

use crate::credentials::Credentials;
use crate::error::{RepoError, Result};

/// A ChartMuseum-compatible chart repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    /// Name the repository is registered under in helm (`<name>/<chart>`)
    pub name: String,

    /// Base URL of the repository server
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

impl Repository {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Validate the URL scheme
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.url).map_err(|e| RepoError::InvalidRepositoryUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(RepoError::InvalidRepositoryUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme '{}'", other),
            }),
        }
    }

    fn base(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// `GET` endpoint listing every version of a chart
    pub fn chart_url(&self, chart: &str) -> String {
        format!("{}/api/charts/{}", self.base(), chart)
    }

    /// `POST` endpoint accepting chart archives
    pub fn upload_url(&self) -> String {
        format!("{}/api/charts", self.base())
    }

    /// Reference helm uses for a chart of this repository
    pub fn chart_reference(&self, chart: &str) -> String {
        format!("{}/{}", self.name, chart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let repo = Repository::new("chartmuseum", "https://charts.example.com/");
        assert_eq!(repo.chart_url("orders"), "https://charts.example.com/api/charts/orders");
        assert_eq!(repo.upload_url(), "https://charts.example.com/api/charts");
        assert_eq!(repo.chart_reference("orders"), "chartmuseum/orders");
    }

    #[test]
    fn test_validate() {
        assert!(Repository::new("a", "https://charts.example.com").validate().is_ok());
        assert!(Repository::new("a", "oci://registry.example.com").validate().is_err());
        assert!(Repository::new("a", "not a url").validate().is_err());
    }
}
