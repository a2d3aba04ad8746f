//! Adapter construction and per-provider caching.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use docbridge_provider::{Provider, ProviderRegistry};
use docbridge_shared::{AppConfig, ContentType, DocumentCapability, Result};

use crate::DocumentAdapter;
use crate::binary::BinaryFileAdapter;
use crate::profiles::ProviderProfile;
use crate::structured::StructuredContentAdapter;

// ---------------------------------------------------------------------------
// AdapterCache
// ---------------------------------------------------------------------------

/// Process-wide memo of one adapter per provider name.
///
/// Injectable so tests get per-instance isolation; clearable and
/// individually evictable so a provider upgrade can recompute its adapter
/// without a restart.
#[derive(Clone, Default)]
pub struct AdapterCache {
    inner: Arc<RwLock<HashMap<String, Arc<dyn DocumentAdapter>>>>,
}

impl AdapterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, provider_name: &str) -> Option<Arc<dyn DocumentAdapter>> {
        self.inner
            .read()
            .expect("adapter cache lock")
            .get(provider_name)
            .cloned()
    }

    pub fn insert(&self, provider_name: &str, adapter: Arc<dyn DocumentAdapter>) {
        self.inner
            .write()
            .expect("adapter cache lock")
            .insert(provider_name.to_string(), adapter);
    }

    pub fn evict(&self, provider_name: &str) {
        self.inner
            .write()
            .expect("adapter cache lock")
            .remove(provider_name);
    }

    pub fn clear(&self) {
        self.inner.write().expect("adapter cache lock").clear();
    }
}

// ---------------------------------------------------------------------------
// AdapterFactory
// ---------------------------------------------------------------------------

/// Builds the right strategy for a provider's detected capability.
pub struct AdapterFactory {
    registry: Arc<dyn ProviderRegistry>,
    config: AppConfig,
    cache: AdapterCache,
}

impl AdapterFactory {
    pub fn new(registry: Arc<dyn ProviderRegistry>) -> Self {
        Self::with_config(registry, AppConfig::default())
    }

    /// Factory whose provider profiles honor configuration overrides.
    pub fn with_config(registry: Arc<dyn ProviderRegistry>, config: AppConfig) -> Self {
        Self {
            registry,
            config,
            cache: AdapterCache::new(),
        }
    }

    /// Share an externally owned cache.
    pub fn with_cache(mut self, cache: AdapterCache) -> Self {
        self.cache = cache;
        self
    }

    /// Build the strategy for an already loaded provider.
    ///
    /// `mixed` routes to the binary strategy: its items are individually
    /// downloadable, and markdown conversion only applies to pure page
    /// stores.
    pub fn create_adapter(
        &self,
        provider: Arc<dyn Provider>,
        capability: &DocumentCapability,
    ) -> Arc<dyn DocumentAdapter> {
        let profile = ProviderProfile::resolve(provider.name(), &self.config);
        debug!(
            provider = provider.name(),
            content_type = %capability.content_type,
            "creating adapter"
        );

        match capability.content_type {
            ContentType::Structured => Arc::new(StructuredContentAdapter::new(
                provider,
                capability.clone(),
                profile,
            )),
            ContentType::Binary | ContentType::Mixed => Arc::new(BinaryFileAdapter::new(
                provider,
                capability.clone(),
                profile,
            )),
        }
    }

    /// Cached adapter for `provider_name`, loading the provider through the
    /// registry on first use.
    pub async fn adapter_for(
        &self,
        provider_name: &str,
        capability: &DocumentCapability,
    ) -> Result<Arc<dyn DocumentAdapter>> {
        if let Some(adapter) = self.cache.get(provider_name) {
            return Ok(adapter);
        }

        let provider = self.registry.load_provider(provider_name).await?;
        let adapter = self.create_adapter(provider, capability);
        self.cache.insert(provider_name, adapter.clone());
        Ok(adapter)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn evict(&self, provider_name: &str) {
        self.cache.evict(provider_name);
    }
}
