//! Error types for stevedore-deploy

use thiserror::Error;

use crate::response::Responses;

/// Result type for stevedore-deploy operations
pub type Result<T> = std::result::Result<T, DeployError>;

/// Errors that can occur while deploying releases
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeployError {
    /// The helm binary failed
    #[error("helm {command} failed for release '{release}': {message}")]
    Helm {
        release: String,
        command: String,
        message: String,
    },

    /// The deployed release moved on since the manifest was written
    #[error("release '{release}' is at version {actual}, manifest expects {expected}\nHint: Update currentReleaseVersion after reviewing the deployed release")]
    VersionMismatch {
        release: String,
        expected: i64,
        actual: i64,
    },

    /// Dependency chart build failed
    #[error("failed to build chart for release '{release}': {source}")]
    Build {
        release: String,
        #[source]
        source: stevedore_repo::RepoError,
    },

    /// No deploy client for the namespace
    #[error("no deploy client for namespace '{namespace}'")]
    MissingClient { namespace: String },

    /// The run was cancelled before it started
    #[error("deployment cancelled")]
    Cancelled,

    /// At least one release failed
    #[error("{0}")]
    Failed(Responses),

    /// A worker task ended abnormally
    #[error("deploy worker failed: {0}")]
    Worker(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for DeployError {
    fn from(e: serde_json::Error) -> Self {
        DeployError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for DeployError {
    fn from(e: serde_yaml::Error) -> Self {
        DeployError::Serialization(e.to_string())
    }
}

impl From<stevedore_core::CoreError> for DeployError {
    fn from(e: stevedore_core::CoreError) -> Self {
        DeployError::Serialization(e.to_string())
    }
}

impl DeployError {
    /// Responses of a run that failed
    pub fn responses(&self) -> Option<&Responses> {
        match self {
            DeployError::Failed(responses) => Some(responses),
            _ => None,
        }
    }
}
