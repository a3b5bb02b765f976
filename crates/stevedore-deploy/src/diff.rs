//! Manifest diffing
//!
//! Compares the manifest currently deployed with the one an upstall produces,
//! resource by resource, like `helm diff`.

use similar::TextDiff;
use std::collections::BTreeMap;

/// Type of resource change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeType::Added => write!(f, "added"),
            ChangeType::Modified => write!(f, "modified"),
            ChangeType::Removed => write!(f, "removed"),
        }
    }
}

/// A change to a single Kubernetes resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceChange {
    /// `namespace/Kind/name`, or `Kind/name` when cluster scoped
    pub resource: String,
    pub change_type: ChangeType,
    /// Unified diff of the resource
    pub diff: String,
}

/// Differences between two manifests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDiff {
    pub changes: Vec<ResourceChange>,
}

impl ManifestDiff {
    /// Compare two multi-document manifests
    pub fn between(old: &str, new: &str) -> Self {
        let old_resources = split_resources(old);
        let new_resources = split_resources(new);
        let mut changes = Vec::new();

        for (resource, new_content) in &new_resources {
            match old_resources.get(resource) {
                Some(old_content) if old_content == new_content => {}
                Some(old_content) => changes.push(ResourceChange {
                    resource: resource.clone(),
                    change_type: ChangeType::Modified,
                    diff: unified(resource, old_content, new_content),
                }),
                None => changes.push(ResourceChange {
                    resource: resource.clone(),
                    change_type: ChangeType::Added,
                    diff: unified(resource, "", new_content),
                }),
            }
        }

        for (resource, old_content) in &old_resources {
            if !new_resources.contains_key(resource) {
                changes.push(ResourceChange {
                    resource: resource.clone(),
                    change_type: ChangeType::Removed,
                    diff: unified(resource, old_content, ""),
                });
            }
        }

        Self { changes }
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Every resource diff, concatenated
    pub fn to_unified_diff(&self) -> String {
        self.changes.iter().map(|c| c.diff.as_str()).collect()
    }

    /// Human-readable summary such as `1 added, 2 modified`
    pub fn summary(&self) -> String {
        let count = |change_type| self.changes.iter().filter(|c| c.change_type == change_type).count();

        let parts: Vec<String> = [ChangeType::Added, ChangeType::Modified, ChangeType::Removed]
            .into_iter()
            .filter_map(|change_type| match count(change_type) {
                0 => None,
                n => Some(format!("{} {}", n, change_type)),
            })
            .collect();

        if parts.is_empty() {
            "No changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

fn unified(resource: &str, old: &str, new: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(resource, resource)
        .to_string()
}

/// Resources of a manifest keyed by identity, in a stable order
fn split_resources(manifest: &str) -> BTreeMap<String, String> {
    let mut resources = BTreeMap::new();

    for document in manifest.split("\n---") {
        let document = document.trim_start_matches("---").trim();
        if document.is_empty() {
            continue;
        }

        let Ok(yaml) = serde_yaml::from_str::<serde_yaml::Value>(document) else {
            continue;
        };
        if yaml.is_null() {
            continue;
        }

        let kind = yaml.get("kind").and_then(|v| v.as_str()).unwrap_or("Unknown");
        let metadata = yaml.get("metadata");
        let name = metadata
            .and_then(|m| m.get("name"))
            .and_then(|n| n.as_str())
            .unwrap_or("unnamed");
        let identity = match metadata.and_then(|m| m.get("namespace")).and_then(|n| n.as_str()) {
            Some(namespace) => format!("{}/{}/{}", namespace, kind, name),
            None => format!("{}/{}", kind, name),
        };

        // Helm prefixes each document with a `# Source:` comment
        let body: String = document
            .lines()
            .filter(|line| !line.starts_with("# Source:"))
            .map(|line| format!("{}\n", line))
            .collect();
        resources.insert(identity, body);
    }

    resources
}

#[cfg(test)]
mod tests {
    use super::*;

    const OLD: &str = r#"---
# Source: orders/templates/service.yaml
apiVersion: v1
kind: Service
metadata:
  name: orders
  namespace: commerce
spec:
  port: 80
---
# Source: orders/templates/configmap.yaml
apiVersion: v1
kind: ConfigMap
metadata:
  name: orders-config
data:
  mode: blue
"#;

    const NEW: &str = r#"---
# Source: orders/templates/service.yaml
apiVersion: v1
kind: Service
metadata:
  name: orders
  namespace: commerce
spec:
  port: 8080
---
# Source: orders/templates/deployment.yaml
apiVersion: apps/v1
kind: Deployment
metadata:
  name: orders
  namespace: commerce
"#;

    #[test]
    fn test_changes_by_resource() {
        let diff = ManifestDiff::between(OLD, NEW);

        let changes: Vec<(&str, ChangeType)> = diff
            .changes
            .iter()
            .map(|c| (c.resource.as_str(), c.change_type))
            .collect();
        assert_eq!(
            changes,
            vec![
                ("commerce/Deployment/orders", ChangeType::Added),
                ("commerce/Service/orders", ChangeType::Modified),
                ("ConfigMap/orders-config", ChangeType::Removed),
            ]
        );
        assert_eq!(diff.summary(), "1 added, 1 modified, 1 removed");
    }

    #[test]
    fn test_unified_diff_lines() {
        let diff = ManifestDiff::between(OLD, NEW);
        let text = diff.to_unified_diff();
        assert!(text.contains("-  port: 80\n"));
        assert!(text.contains("+  port: 8080\n"));
        assert!(text.contains("--- commerce/Service/orders"));
    }

    #[test]
    fn test_identical_manifests() {
        let diff = ManifestDiff::between(OLD, OLD);
        assert!(!diff.has_changes());
        assert_eq!(diff.summary(), "No changes");
        assert_eq!(diff.to_unified_diff(), "");
    }

    #[test]
    fn test_source_comments_ignored() {
        let renamed = OLD.replace("orders/templates/service.yaml", "orders/templates/svc.yaml");
        assert!(!ManifestDiff::between(OLD, &renamed).has_changes());
    }

    #[test]
    fn test_first_install_is_all_additions() {
        let diff = ManifestDiff::between("", NEW);
        assert_eq!(diff.changes.len(), 2);
        assert!(diff.changes.iter().all(|c| c.change_type == ChangeType::Added));
    }
}
