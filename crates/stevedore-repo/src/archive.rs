//! Chart packaging
//!
//! Produces the `<name>-<version>.tgz` archives helm and ChartMuseum expect:
//! every file of the chart directory under a `<name>/` prefix.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::path::{Path, PathBuf};
use tar::{Archive, Builder};

use crate::error::Result;

/// Archive file name for a chart
#[must_use]
pub fn archive_name(name: &str, version: &str) -> String {
    format!("{}-{}.tgz", name, version)
}

/// Package `chart_dir` into `output_dir/<name>-<version>.tgz`
///
/// Returns the path to the created archive file.
pub fn package_chart(chart_dir: &Path, name: &str, version: &str, output_dir: &Path) -> Result<PathBuf> {
    let output = output_dir.join(archive_name(name, version));

    let file = File::create(&output)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    builder.append_dir_all(name, chart_dir)?;

    let encoder = builder.into_inner()?;
    encoder.finish()?;

    Ok(output)
}

/// Paths of every file in an archive
pub fn list_archive(archive_path: &Path) -> Result<Vec<String>> {
    let file = File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let mut entries = Vec::new();
    for entry in archive.entries()? {
        let entry = entry?;
        if entry.header().entry_type().is_dir() {
            continue;
        }
        entries.push(entry.path()?.to_string_lossy().to_string());
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_chart_layout() {
        let temp = tempfile::tempdir().unwrap();
        let chart_dir = temp.path().join("build");
        std::fs::create_dir_all(chart_dir.join("charts")).unwrap();
        std::fs::write(chart_dir.join("Chart.yaml"), "name: orders-deps\n").unwrap();
        std::fs::write(chart_dir.join("values.yaml"), "").unwrap();
        std::fs::write(chart_dir.join("charts").join("redis-17.0.0.tgz"), b"dep").unwrap();

        let archive = package_chart(&chart_dir, "orders-deps", "0.1.0", temp.path()).unwrap();
        assert_eq!(archive.file_name().unwrap(), "orders-deps-0.1.0.tgz");

        let mut entries = list_archive(&archive).unwrap();
        entries.sort();
        assert_eq!(
            entries,
            vec![
                "orders-deps/Chart.yaml",
                "orders-deps/charts/redis-17.0.0.tgz",
                "orders-deps/values.yaml",
            ]
        );
    }
}
