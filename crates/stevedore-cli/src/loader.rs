//! Loading documents from files and directories

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use stevedore_core::{CoreError, Envs, Ignores, ManifestFile, ManifestFiles, Overrides, numbered};

use crate::error::{CliError, Result};

/// Every document a resolution needs
#[derive(Debug, Default)]
pub struct Documents {
    pub manifests: ManifestFiles,
    pub overrides: Overrides,
    pub envs: Envs,
    pub ignores: Ignores,
}

/// Document paths given on the command line
#[derive(Debug, Clone, Copy)]
pub struct Sources<'a> {
    pub manifests: &'a [PathBuf],
    pub overrides: &'a [PathBuf],
    pub envs: &'a [PathBuf],
    pub ignores: &'a [PathBuf],
}

/// Load every document, reporting all unreadable or malformed files at once
pub fn load(sources: Sources<'_>) -> Result<Documents> {
    let mut documents = Documents::default();
    let mut failures: Vec<String> = Vec::new();

    for (path, content) in read_all(sources.manifests, &mut failures) {
        match ManifestFile::from_yaml(&path, &content) {
            Ok(file) => documents.manifests.push(file),
            Err(e) => failures.push(describe(&path, e)),
        }
    }
    for (path, content) in read_all(sources.overrides, &mut failures) {
        match Overrides::from_yaml(&path, &content) {
            Ok(overrides) => documents.overrides.extend(overrides),
            Err(e) => failures.push(describe(&path, e)),
        }
    }
    for (path, content) in read_all(sources.envs, &mut failures) {
        match Envs::from_yaml(&path, &content) {
            Ok(envs) => documents.envs.extend(envs),
            Err(e) => failures.push(describe(&path, e)),
        }
    }
    for (path, content) in read_all(sources.ignores, &mut failures) {
        match Ignores::from_yaml(&content) {
            Ok(ignores) => documents.ignores.extend(ignores),
            Err(e) => failures.push(describe(&path, e)),
        }
    }

    if failures.is_empty() {
        tracing::debug!(
            manifests = documents.manifests.len(),
            overrides = documents.overrides.len(),
            envs = documents.envs.len(),
            ignores = documents.ignores.len(),
            "loaded documents"
        );
        Ok(documents)
    } else {
        let header = format!("Failed to load {} file(s):", failures.len());
        Err(CliError::Validation {
            message: numbered(&header, &failures),
            help: None,
        })
    }
}

/// Error line for a file, which header errors already name
fn describe(path: &str, error: CoreError) -> String {
    match error {
        CoreError::InvalidDocument { .. } => error.to_string(),
        other => format!("{}: {}", path, other),
    }
}

/// Contents of every YAML file below `paths`, in a stable order
fn read_all(paths: &[PathBuf], failures: &mut Vec<String>) -> Vec<(String, String)> {
    let mut contents = Vec::new();
    for file in expand(paths, failures) {
        match std::fs::read_to_string(&file) {
            Ok(content) => contents.push((file.display().to_string(), content)),
            Err(e) => failures.push(format!("{}: {}", file.display(), e)),
        }
    }
    contents
}

/// Files as given, directories walked recursively for `.yaml`/`.yml` files
pub fn expand(paths: &[PathBuf], failures: &mut Vec<String>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = Vec::new();
            for entry in WalkDir::new(path).follow_links(true) {
                match entry {
                    Ok(entry) if entry.file_type().is_file() && is_yaml(entry.path()) => {
                        found.push(entry.into_path())
                    }
                    Ok(_) => {}
                    Err(e) => failures.push(e.to_string()),
                }
            }
            found.sort();
            files.extend(found);
        } else if path.exists() {
            files.push(path.clone());
        } else {
            failures.push(format!("{}: No such file or directory", path.display()));
        }
    }

    files
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const MANIFEST: &str = r#"kind: StevedoreManifest
version: "2"
deployTo:
  - environmentType: staging
spec:
  - release:
      name: orders
      namespace: commerce
      chart: chartmuseum/orders
"#;

    #[test]
    fn test_expand_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.yaml"), "").unwrap();
        fs::write(dir.path().join("nested/a.yml"), "").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();

        let mut failures = Vec::new();
        let files = expand(&[dir.path().to_path_buf()], &mut failures);

        assert!(failures.is_empty());
        let names: Vec<String> = files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["b.yaml", "nested/a.yml"]);
    }

    #[test]
    fn test_load_documents() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("apps.yaml");
        fs::write(&manifest, MANIFEST).unwrap();
        let ignores = dir.path().join("ignores.yaml");
        fs::write(&ignores, "- matches: {contextName: production}\n  releases:\n    - name: orders\n").unwrap();

        let documents = load(Sources {
            manifests: &[manifest],
            overrides: &[],
            envs: &[],
            ignores: &[ignores],
        })
        .unwrap();

        assert_eq!(documents.manifests.release_count(), 1);
        assert_eq!(documents.ignores.len(), 1);
    }

    #[test]
    fn test_all_failures_reported() {
        let dir = tempfile::tempdir().unwrap();
        let wrong_kind = dir.path().join("wrong.yaml");
        fs::write(&wrong_kind, MANIFEST.replace("StevedoreManifest", "StevedoreEnv")).unwrap();
        let missing = dir.path().join("missing.yaml");

        let err = load(Sources {
            manifests: &[wrong_kind, missing],
            overrides: &[],
            envs: &[],
            ignores: &[],
        })
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("Failed to load 2 file(s):"));
        assert!(message.contains("1. "));
        assert!(message.contains("missing.yaml: No such file or directory"));
        assert!(message.contains("StevedoreManifest"));
    }
}
