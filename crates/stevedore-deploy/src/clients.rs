//! Deploy clients keyed by namespace

use std::collections::HashMap;
use std::sync::Arc;

use crate::upstall::Upstaller;

/// Namespace to upstaller map
///
/// Built once before a run and only read while releases deploy.
#[derive(Clone, Default)]
pub struct DeployClients {
    clients: HashMap<String, Arc<dyn Upstaller>>,
}

impl DeployClients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, namespace: impl Into<String>, client: Arc<dyn Upstaller>) {
        self.clients.insert(namespace.into(), client);
    }

    pub fn with(mut self, namespace: impl Into<String>, client: Arc<dyn Upstaller>) -> Self {
        self.insert(namespace, client);
        self
    }

    pub fn get(&self, namespace: &str) -> Option<Arc<dyn Upstaller>> {
        self.clients.get(namespace).cloned()
    }

    /// Sorted namespaces with a client
    pub fn namespaces(&self) -> Vec<&str> {
        let mut namespaces: Vec<&str> = self.clients.keys().map(String::as_str).collect();
        namespaces.sort_unstable();
        namespaces
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl std::fmt::Debug for DeployClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployClients")
            .field("namespaces", &self.namespaces())
            .finish()
    }
}
