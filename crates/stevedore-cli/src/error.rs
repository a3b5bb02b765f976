//! CLI error types with exit code handling
//!
//! Every failure of a command ends up as a [`CliError`], which knows the
//! process exit code it maps to.

use miette::Diagnostic;
use thiserror::Error;

use stevedore_core::CoreError;
use stevedore_deploy::DeployError;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Documents failed validation
    #[error("Validation failed: {message}")]
    #[diagnostic(code(stevedore::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Placeholders or config providers could not be resolved
    #[error("Resolution failed: {message}")]
    #[diagnostic(code(stevedore::cli::resolution))]
    Resolution { message: String },

    /// At least one release failed
    #[error("{message}")]
    #[diagnostic(code(stevedore::cli::deploy))]
    Deploy { message: String },

    /// Invalid configuration or arguments
    #[error("Configuration error: {message}")]
    #[diagnostic(code(stevedore::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(stevedore::cli::io))]
    Io { message: String },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(stevedore::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Resolution { .. } => exit_codes::RESOLUTION_ERROR,
            CliError::Deploy { .. } => exit_codes::DEPLOY_ERROR,
            CliError::Config { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a configuration error with help text
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(errors) => CliError::Validation {
                message: errors.to_string(),
                help: Some("Fix the listed documents, nothing was deployed".to_string()),
            },
            CoreError::Substitution(_) | CoreError::Resolution(_) | CoreError::Provider(_) => {
                CliError::Resolution {
                    message: err.to_string(),
                }
            }
            CoreError::InvalidDocument { .. } | CoreError::YamlParse(_) | CoreError::JsonParse(_) => {
                CliError::validation(err.to_string())
            }
            CoreError::Io(e) => e.into(),
        }
    }
}

impl From<DeployError> for CliError {
    fn from(err: DeployError) -> Self {
        CliError::Deploy {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
