//! Chart repository backend trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// One published version of a chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartInfo {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub app_version: String,
}

impl ChartInfo {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            app_version: app_version.into(),
        }
    }

    /// Parsed version, `None` when it is not valid semver
    pub fn semver(&self) -> Option<semver::Version> {
        semver::Version::parse(&self.version).ok()
    }
}

/// Repository charts are read from and published to
#[async_trait]
pub trait ChartRepository: Send + Sync {
    /// Name helm knows the repository by
    fn name(&self) -> &str;

    /// Every published version of `chart`; empty when the chart is unknown
    async fn get(&self, chart: &str) -> Result<Vec<ChartInfo>>;

    /// Publish a packaged chart archive
    async fn upload(&self, archive: &Path) -> Result<()>;
}

/// Latest version by semver ordering, ignoring unparsable versions
pub fn latest(charts: &[ChartInfo]) -> Option<&ChartInfo> {
    charts
        .iter()
        .filter_map(|chart| match chart.semver() {
            Some(version) => Some((version, chart)),
            None => {
                tracing::warn!(chart = %chart.name, version = %chart.version, "ignoring unparsable chart version");
                None
            }
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, chart)| chart)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_uses_semver_order() {
        let charts = vec![
            ChartInfo::new("orders", "0.1.9", "a"),
            ChartInfo::new("orders", "0.1.10", "b"),
            ChartInfo::new("orders", "not-a-version", "c"),
            ChartInfo::new("orders", "0.1.2", "d"),
        ];
        assert_eq!(latest(&charts).unwrap().version, "0.1.10");
    }

    #[test]
    fn test_latest_of_nothing() {
        assert!(latest(&[]).is_none());
    }

    #[test]
    fn test_deserialize_chartmuseum_entry() {
        let json = r#"{"name":"orders","version":"0.0.1","appVersion":"1a2b3c4d","urls":["charts/orders-0.0.1.tgz"]}"#;
        let info: ChartInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info, ChartInfo::new("orders", "0.0.1", "1a2b3c4d"));
    }
}
