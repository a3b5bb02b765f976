//! External configuration providers
//!
//! A release references providers by name in its `configs` block (results feed
//! variable substitution) and its `mounts` block (results are merged into the
//! values). Providers are called once per referenced name.

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::ProviderError;
use crate::release::ConfigRequests;
use crate::substitute::Substitute;
use crate::values::Values;

/// Data returned by a provider
pub type ProviderData = BTreeMap<String, JsonValue>;

/// A named source of configuration
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Fetch configuration for `context` (the deploy target conditions)
    async fn fetch(
        &self,
        context: &BTreeMap<String, String>,
        payload: &JsonValue,
    ) -> Result<ProviderData, ProviderError>;
}

/// Provider returning a fixed map
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    data: ProviderData,
}

impl StaticProvider {
    pub fn new(data: ProviderData) -> Self {
        Self { data }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

#[async_trait]
impl ConfigProvider for StaticProvider {
    async fn fetch(
        &self,
        _context: &BTreeMap<String, String>,
        _payload: &JsonValue,
    ) -> Result<ProviderData, ProviderError> {
        Ok(self.data.clone())
    }
}

/// Provider backed by a plugin executable
///
/// The plugin receives `{"context": {...}, "data": <payload>}` on stdin and
/// must print a JSON object on stdout.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    name: String,
    command: String,
    args: Vec<String>,
}

impl CommandProvider {
    pub fn new(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args,
        }
    }

    fn failure(&self, message: impl Into<String>) -> ProviderError {
        ProviderError::Fetch {
            name: self.name.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl ConfigProvider for CommandProvider {
    async fn fetch(
        &self,
        context: &BTreeMap<String, String>,
        payload: &JsonValue,
    ) -> Result<ProviderData, ProviderError> {
        let request = serde_json::json!({ "context": context, "data": payload });
        let input = serde_json::to_vec(&request).map_err(|e| self.failure(e.to_string()))?;

        tracing::debug!(provider = %self.name, command = %self.command, "running config provider");

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.failure(format!("failed to start '{}': {}", self.command, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&input)
                .await
                .map_err(|e| self.failure(format!("failed to write request: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.failure(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(format!("exited with {}: {}", output.status, stderr.trim())));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| self.failure(format!("invalid response: {}", e)))
    }
}

/// Registry of providers by name
#[derive(Clone, Default)]
pub struct Providers {
    providers: BTreeMap<String, Arc<dyn ConfigProvider>>,
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers")
            .field("names", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Providers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn ConfigProvider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn with(mut self, name: impl Into<String>, provider: impl ConfigProvider + 'static) -> Self {
        self.register(name, Arc::new(provider));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Call one provider
    pub async fn fetch(
        &self,
        name: &str,
        context: &BTreeMap<String, String>,
        payload: &JsonValue,
    ) -> Result<ProviderData, ProviderError> {
        let provider = self.providers.get(name).ok_or_else(|| ProviderError::NotRegistered {
            name: name.to_string(),
        })?;

        provider.fetch(context, payload).await.map_err(|e| match e {
            ProviderError::Fetch { message, .. } => ProviderError::Fetch {
                name: name.to_string(),
                message,
            },
            other => other,
        })
    }

    /// Fetch a release's `configs` and `mounts` blocks
    ///
    /// A name requested with the same payload in both blocks is called once.
    /// Any failure fails the whole release; there is no partial result.
    /// Keys returned by more than one `configs` provider have no guaranteed
    /// winner.
    pub async fn fetch_release(
        &self,
        configs: &ConfigRequests,
        mounts: &ConfigRequests,
        context: &BTreeMap<String, String>,
    ) -> Result<Fetched, ProviderError> {
        let mut distinct: Vec<(&str, &JsonValue)> = Vec::new();
        for (name, payload) in configs.iter().chain(mounts) {
            if !distinct.iter().any(|(n, p)| *n == name && *p == payload) {
                distinct.push((name.as_str(), payload));
            }
        }

        let calls = distinct
            .iter()
            .map(|(name, payload)| self.fetch(name, context, payload));
        let results = try_join_all(calls).await?;

        let data = |name: &str, payload: &JsonValue| {
            distinct
                .iter()
                .position(|(n, p)| *n == name && *p == payload)
                .map(|i| results[i].clone())
                .unwrap_or_default()
        };

        let mut fetched = Fetched::default();
        for (name, payload) in configs {
            fetched.substitute.merge(&Substitute::from(data(name, payload)));
        }
        for (name, payload) in mounts {
            let map = data(name, payload).into_iter().collect();
            fetched.values.merge(&Values(JsonValue::Object(map)));
        }
        Ok(fetched)
    }
}

/// Provider results for one release
#[derive(Debug, Clone, Default)]
pub struct Fetched {
    /// Flat merge of the `configs` providers, for substitution
    pub substitute: Substitute,
    /// Deep merge of the `mounts` providers, merged into the values
    pub values: Values,
}
