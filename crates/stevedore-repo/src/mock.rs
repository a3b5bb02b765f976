//! In-memory chart repository and dependency updater for testing
//!
//! Useful for exercising the dependency chart builder without a ChartMuseum
//! server or a helm binary.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::archive::list_archive;
use crate::backend::{ChartInfo, ChartRepository};
use crate::chart::ChartMetadata;
use crate::dependency::DependencyUpdater;
use crate::error::{RepoError, Result};

/// In-memory chart repository
///
/// Uploaded archives are inspected immediately: their `Chart.yaml` is
/// registered as a new chart version and their file list recorded.
#[derive(Clone)]
pub struct MockChartRepository {
    name: String,
    charts: Arc<RwLock<HashMap<String, Vec<ChartInfo>>>>,
    uploads: Arc<RwLock<Vec<Vec<String>>>>,
    gets: Arc<RwLock<usize>>,
    failing: bool,
}

impl MockChartRepository {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            charts: Arc::new(RwLock::new(HashMap::new())),
            uploads: Arc::new(RwLock::new(Vec::new())),
            gets: Arc::new(RwLock::new(0)),
            failing: false,
        }
    }

    /// Pre-populate a published chart version
    pub fn with_chart(self, chart: ChartInfo) -> Self {
        self.charts
            .write()
            .unwrap()
            .entry(chart.name.clone())
            .or_default()
            .push(chart);
        self
    }

    /// Every request fails as if the server were unreachable
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Published versions of a chart
    pub fn charts(&self, name: &str) -> Vec<ChartInfo> {
        self.charts.read().unwrap().get(name).cloned().unwrap_or_default()
    }

    /// Sorted file list of every uploaded archive, in upload order
    pub fn uploaded_entries(&self) -> Vec<Vec<String>> {
        self.uploads.read().unwrap().clone()
    }

    pub fn get_calls(&self) -> usize {
        *self.gets.read().unwrap()
    }

    fn unreachable(&self) -> RepoError {
        RepoError::NetworkError {
            message: format!("Connection failed: repository '{}' unreachable", self.name),
        }
    }
}

#[async_trait]
impl ChartRepository for MockChartRepository {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, chart: &str) -> Result<Vec<ChartInfo>> {
        *self.gets.write().unwrap() += 1;
        if self.failing {
            return Err(self.unreachable());
        }
        Ok(self.charts(chart))
    }

    async fn upload(&self, archive: &Path) -> Result<()> {
        if self.failing {
            return Err(self.unreachable());
        }

        let mut entries = list_archive(archive)?;
        entries.sort();

        let extracted = tempfile::tempdir()?;
        let file = std::fs::File::open(archive)?;
        tar::Archive::new(flate2::read::GzDecoder::new(file)).unpack(extracted.path())?;

        let chart_dir = entries
            .iter()
            .find(|e| e.ends_with("/Chart.yaml"))
            .and_then(|e| e.split('/').next())
            .map(|prefix| extracted.path().join(prefix))
            .ok_or_else(|| RepoError::Build {
                chart: archive.display().to_string(),
                message: "archive has no Chart.yaml".to_string(),
            })?;
        let metadata = ChartMetadata::load(&chart_dir)?;

        self.charts
            .write()
            .unwrap()
            .entry(metadata.name.clone())
            .or_default()
            .push(ChartInfo::new(metadata.name, metadata.version, metadata.app_version));
        self.uploads.write().unwrap().push(entries);
        Ok(())
    }
}

/// Dependency updater that only counts its calls
#[derive(Clone, Default)]
pub struct MockDependencyUpdater {
    calls: Arc<RwLock<usize>>,
}

impl MockDependencyUpdater {
    pub fn calls(&self) -> usize {
        *self.calls.read().unwrap()
    }
}

#[async_trait]
impl DependencyUpdater for MockDependencyUpdater {
    async fn update(&self, chart_dir: &Path) -> Result<()> {
        *self.calls.write().unwrap() += 1;
        if !chart_dir.join("Chart.yaml").exists() {
            return Err(RepoError::DependencyUpdate {
                chart: chart_dir.display().to_string(),
                message: "Chart.yaml not found".to_string(),
            });
        }
        Ok(())
    }
}
