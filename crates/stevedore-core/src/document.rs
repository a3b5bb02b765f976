//! Versioned YAML documents
//!
//! Manifest, override and env files carry a `kind` and a `version`
//! discriminator. A document is only accepted when both match exactly.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// The only document version understood
pub const DOCUMENT_VERSION: &str = "2";

/// Document kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kind {
    StevedoreManifest,
    StevedoreOverride,
    StevedoreEnv,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::StevedoreManifest => "StevedoreManifest",
            Kind::StevedoreOverride => "StevedoreOverride",
            Kind::StevedoreEnv => "StevedoreEnv",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse every YAML document in `content` as a `kind` document body
///
/// `file` is only used in error messages.
pub fn parse_documents<T: DeserializeOwned>(file: &str, content: &str, kind: Kind) -> Result<Vec<T>> {
    let mut documents = Vec::new();

    for document in serde_yaml::Deserializer::from_str(content) {
        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        check_header(file, &value, kind)?;
        documents.push(serde_yaml::from_value(value)?);
    }

    Ok(documents)
}

fn check_header(file: &str, value: &serde_yaml::Value, kind: Kind) -> Result<()> {
    let found_kind = scalar(value.get("kind"));
    if found_kind != kind.as_str() {
        return Err(CoreError::InvalidDocument {
            file: file.to_string(),
            field: "kind",
            expected: kind.to_string(),
            found: found_kind,
        });
    }

    let found_version = scalar(value.get("version"));
    if found_version != DOCUMENT_VERSION {
        return Err(CoreError::InvalidDocument {
            file: file.to_string(),
            field: "version",
            expected: DOCUMENT_VERSION.to_string(),
            found: found_version,
        });
    }

    Ok(())
}

fn scalar(value: Option<&serde_yaml::Value>) -> String {
    match value {
        Some(serde_yaml::Value::String(s)) => s.clone(),
        Some(serde_yaml::Value::Number(n)) => n.to_string(),
        Some(serde_yaml::Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}
