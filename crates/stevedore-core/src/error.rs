//! Core error types

use thiserror::Error;

use crate::substitute::SubstitutionError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    Substitution(#[from] SubstitutionError),

    #[error("{0}")]
    Resolution(#[from] ResolutionErrors),

    #[error("{0}")]
    Provider(#[from] ProviderError),

    #[error("Invalid document {file}: expected {field} '{expected}', found '{found}'")]
    InvalidDocument {
        file: String,
        field: &'static str,
        expected: String,
        found: String,
    },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Render a header followed by a numbered, tab-indented list
pub fn numbered<I, T>(header: &str, items: I) -> String
where
    I: IntoIterator<Item = T>,
    T: std::fmt::Display,
{
    let mut out = header.to_string();
    for (index, item) in items.into_iter().enumerate() {
        out.push_str(&format!("\n\t{}. {}", index + 1, item));
    }
    out
}

/// A single validation issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Where the issue was found (e.g. `release 'orders'` or `deployTo[0]`)
    pub location: String,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.location.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.location, self.message)
        }
    }
}

/// All validation issues found in one unit (file, manifest, release)
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, location: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            location: location.into(),
            message: message.into(),
        });
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.issues.extend(other.issues);
    }

    /// Prefix every issue location, used when nesting units
    pub fn scoped(mut self, scope: &str) -> Self {
        for issue in &mut self.issues {
            issue.location = if issue.location.is_empty() {
                scope.to_string()
            } else {
                format!("{} {}", scope, issue.location)
            };
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// `Ok(())` when no issue was collected
    pub fn into_result(self) -> std::result::Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header = format!("Found {} validation error(s):", self.issues.len());
        write!(f, "{}", numbered(&header, &self.issues))
    }
}

/// Failure of an external config provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("config provider '{name}' is not registered")]
    NotRegistered { name: String },

    #[error("config provider '{name}' failed: {message}")]
    Fetch { name: String, message: String },
}

/// A resolution failure scoped to one release
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("release '{release}': {source}")]
    Substitution {
        release: String,
        #[source]
        source: SubstitutionError,
    },

    #[error("release '{release}': {source}")]
    Provider {
        release: String,
        #[source]
        source: ProviderError,
    },
}

/// Every per-release error of a resolution batch
#[derive(Error, Debug, Default)]
pub struct ResolutionErrors {
    pub errors: Vec<ReleaseError>,
}

impl ResolutionErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }
}

impl std::fmt::Display for ResolutionErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header = format!("Unable to resolve {} release(s):", self.errors.len());
        write!(f, "{}", numbered(&header, &self.errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_rendering() {
        let rendered = numbered("Header:", ["first", "second"]);
        assert_eq!(rendered, "Header:\n\t1. first\n\t2. second");
    }

    #[test]
    fn test_validation_errors_scoped() {
        let mut errors = ValidationErrors::new();
        errors.push("", "name is required");
        errors.push("deployTo[0]", "unknown condition 'team'");

        let scoped = errors.scoped("manifest.yaml");
        assert_eq!(scoped.issues[0].location, "manifest.yaml");
        assert_eq!(scoped.issues[1].location, "manifest.yaml deployTo[0]");
        assert_eq!(
            scoped.to_string(),
            "Found 2 validation error(s):\n\t1. manifest.yaml: name is required\n\t2. manifest.yaml deployTo[0]: unknown condition 'team'"
        );
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut errors = ValidationErrors::new();
        errors.push("release", "missing chart");
        assert!(errors.into_result().is_err());
    }
}
