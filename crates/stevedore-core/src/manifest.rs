//! Manifest documents: which releases go to which contexts

use serde::{Deserialize, Serialize};

use crate::conditions::Conditions;
use crate::context::Predicate;
use crate::document::{Kind, parse_documents};
use crate::error::Result;
use crate::release::ReleaseSpecifications;

/// Releases and the contexts they target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Matchers: the manifest applies when any one matches the context
    #[serde(default)]
    pub deploy_to: Vec<Conditions>,

    #[serde(default)]
    pub spec: ReleaseSpecifications,
}

impl Manifest {
    pub fn new(deploy_to: Vec<Conditions>, spec: ReleaseSpecifications) -> Self {
        Self { deploy_to, spec }
    }

    /// True iff one matcher is a subset of the predicate's conditions
    pub fn applies_to(&self, predicate: &Predicate) -> bool {
        self.deploy_to.iter().any(|matcher| predicate.contains(matcher))
    }
}

/// Manifests loaded from one file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub file: String,
    pub manifests: Vec<Manifest>,
}

impl ManifestFile {
    pub fn new(file: impl Into<String>, manifests: Vec<Manifest>) -> Self {
        Self {
            file: file.into(),
            manifests,
        }
    }

    /// Parse a `StevedoreManifest` file, one manifest per YAML document
    pub fn from_yaml(file: &str, content: &str) -> Result<Self> {
        let manifests = parse_documents(file, content, Kind::StevedoreManifest)?;
        Ok(Self::new(file, manifests))
    }

    /// Number of release specifications across every manifest of the file
    pub fn release_count(&self) -> usize {
        self.manifests.iter().map(|m| m.spec.len()).sum()
    }
}

/// Manifest files in load order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestFiles(pub Vec<ManifestFile>);

impl ManifestFiles {
    pub fn new(files: Vec<ManifestFile>) -> Self {
        Self(files)
    }

    pub fn push(&mut self, file: ManifestFile) {
        self.0.push(file);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManifestFile> {
        self.0.iter()
    }

    pub fn release_count(&self) -> usize {
        self.0.iter().map(ManifestFile::release_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl IntoIterator for ManifestFiles {
    type Item = ManifestFile;
    type IntoIter = std::vec::IntoIter<ManifestFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{CONTEXT_NAME, ENVIRONMENT_TYPE};
    use crate::context::Context;
    use crate::error::CoreError;

    const MANIFEST: &str = r#"
kind: StevedoreManifest
version: "2"
deployTo:
  - environmentType: staging
  - contextName: production-eu
spec:
  - release:
      name: orders
      namespace: commerce
      chart: chartmuseum/orders
      values:
        host: ${ORDERS_HOST}
  - release:
      name: payments
      namespace: commerce
      chart: chartmuseum/payments
---
kind: StevedoreManifest
version: "2"
deployTo:
  - environmentType: production
spec:
  - release:
      name: search
      namespace: search
      chart: chartmuseum/search
"#;

    #[test]
    fn test_from_yaml_multi_document() {
        let file = ManifestFile::from_yaml("apps.yaml", MANIFEST).unwrap();
        assert_eq!(file.manifests.len(), 2);
        assert_eq!(file.release_count(), 3);
        assert_eq!(file.manifests[0].spec.names(), vec!["orders", "payments"]);
        assert_eq!(file.manifests[0].deploy_to[1].get(CONTEXT_NAME), Some("production-eu"));
    }

    #[test]
    fn test_applies_to_any_matcher() {
        let file = ManifestFile::from_yaml("apps.yaml", MANIFEST).unwrap();

        let staging = Predicate::from_context(&Context::new("components", "gke").with_label(ENVIRONMENT_TYPE, "staging"));
        assert!(file.manifests[0].applies_to(&staging));
        assert!(!file.manifests[1].applies_to(&staging));

        let eu = Predicate::from_context(&Context::new("production-eu", "gke").with_label(ENVIRONMENT_TYPE, "production"));
        assert!(file.manifests[0].applies_to(&eu));
        assert!(file.manifests[1].applies_to(&eu));
    }

    #[test]
    fn test_manifest_without_matchers_applies_nowhere() {
        let manifest = Manifest::default();
        let predicate = Predicate::from_context(&Context::new("components", "gke"));
        assert!(!manifest.applies_to(&predicate));
    }

    #[test]
    fn test_wrong_kind_names_file() {
        let err = ManifestFile::from_yaml("envs.yaml", "kind: StevedoreEnv\nversion: \"2\"\n").unwrap_err();
        match err {
            CoreError::InvalidDocument { file, expected, found, .. } => {
                assert_eq!(file, "envs.yaml");
                assert_eq!(expected, "StevedoreManifest");
                assert_eq!(found, "StevedoreEnv");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
