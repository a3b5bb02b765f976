//! Chart.yaml of a dependency chart

use serde::{Deserialize, Serialize};
use std::path::Path;

use stevedore_core::Dependency;

use crate::error::Result;

/// Chart API version written to generated charts
pub const CHART_API_VERSION: &str = "v2";

/// `Chart.yaml` content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub api_version: String,
    pub name: String,
    pub version: String,
    /// Dependency checksum of the chart
    pub app_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
}

impl ChartMetadata {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        app_version: impl Into<String>,
        dependencies: Vec<Dependency>,
    ) -> Self {
        Self {
            api_version: CHART_API_VERSION.to_string(),
            name: name.into(),
            version: version.into(),
            app_version: app_version.into(),
            dependencies,
        }
    }

    /// Write `Chart.yaml` and an empty `values.yaml` into `dir`
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join("Chart.yaml"), serde_yaml::to_string(self)?)?;
        std::fs::write(dir.join("values.yaml"), "")?;
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(dir.join("Chart.yaml"))?;
        Ok(serde_yaml::from_str(&content)?)
    }
}
