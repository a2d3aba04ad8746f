//! Name-keyed provider loading.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use docbridge_shared::{DocBridgeError, Result};

use crate::Provider;

/// Loads named providers and lists what is installed.
///
/// Loading is async because real registries resolve manifests and
/// credentials lazily; lookups may therefore fail per name without
/// poisoning the registry as a whole.
#[async_trait]
pub trait ProviderRegistry: Send + Sync {
    /// Names of every installed provider.
    fn registered_providers(&self) -> Vec<String>;

    /// Load one provider by name.
    async fn load_provider(&self, name: &str) -> Result<Arc<dyn Provider>>;
}

/// Fixed name → instance registry backing the CLI and tests.
#[derive(Default)]
pub struct StaticRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name, replacing any previous entry.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }
}

#[async_trait]
impl ProviderRegistry for StaticRegistry {
    fn registered_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    async fn load_provider(&self, name: &str) -> Result<Arc<dyn Provider>> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| DocBridgeError::ProviderNotFound { name: name.into() })
    }
}
