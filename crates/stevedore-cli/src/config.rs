//! CLI configuration file
//!
//! Lives at `<config_dir>/stevedore/config.yaml` unless `--config` says
//! otherwise. Holds the deploy targets, custom labels, config provider
//! plugins and the chart repository dependency charts are published to.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use stevedore_core::{CommandProvider, Context, Labels, Providers, WeightedLabel};
use stevedore_repo::Repository;

use crate::error::{CliError, Result};

/// An external config provider executable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Context used when `--context` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_context: Option<String>,

    #[serde(default)]
    pub contexts: Vec<Context>,

    /// Custom label ordering, the default five labels when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<WeightedLabel>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub plugins: BTreeMap<String, PluginConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_repository: Option<Repository>,

    #[serde(default = "default_helm_timeout", with = "humantime_serde")]
    pub helm_timeout: Duration,

    #[serde(default = "default_helm_binary")]
    pub helm_binary: String,

    #[serde(default)]
    pub atomic: bool,
}

fn default_helm_timeout() -> Duration {
    stevedore_deploy::DEFAULT_TIMEOUT
}

fn default_helm_binary() -> String {
    "helm".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            current_context: None,
            contexts: Vec::new(),
            labels: Vec::new(),
            plugins: BTreeMap::new(),
            chart_repository: None,
            helm_timeout: default_helm_timeout(),
            helm_binary: default_helm_binary(),
            atomic: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location, defaults when absent
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CliError::Io {
            message: format!("{}: {}", path.display(), e),
        })?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| CliError::config(format!("{}: {}", path.display(), e)))?;

        if let Some(repository) = &config.chart_repository {
            repository
                .validate()
                .map_err(|e| CliError::config(format!("{}: {}", path.display(), e)))?;
        }
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            serde_yaml::to_string(self).map_err(|e| CliError::internal(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::config("Could not determine config directory"))?;
        Ok(config_dir.join("stevedore").join("config.yaml"))
    }

    /// The named context, or the current one
    pub fn context(&self, name: Option<&str>) -> Result<&Context> {
        let name = name.or(self.current_context.as_deref()).ok_or_else(|| {
            CliError::config_with_help(
                "No context selected",
                "Pass --context or set currentContext in the config file",
            )
        })?;

        self.contexts.iter().find(|c| c.name == name).ok_or_else(|| {
            let known: Vec<&str> = self.contexts.iter().map(|c| c.name.as_str()).collect();
            CliError::config_with_help(
                format!("Context not found: {}", name),
                format!("Known contexts: {}", known.join(", ")),
            )
        })
    }

    pub fn labels(&self) -> Labels {
        if self.labels.is_empty() {
            Labels::default()
        } else {
            Labels::from_weighted(self.labels.clone())
        }
    }

    /// Registry of every configured plugin
    pub fn providers(&self) -> Providers {
        let mut providers = Providers::new();
        for (name, plugin) in &self.plugins {
            providers.register(
                name.clone(),
                Arc::new(CommandProvider::new(name.clone(), plugin.command.clone(), plugin.args.clone())),
            );
        }
        providers
    }
}
