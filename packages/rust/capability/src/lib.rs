//! Capability detection over provider operation catalogs.
//!
//! Before the import pipeline touches a provider, DocBridge inspects the
//! provider's declared operations and decides whether (and how) it can serve
//! documents: which operation enumerates content, which one downloads it,
//! whether search exists, and whether the content is binary files or
//! structured pages. Detection is heuristic alias matching, so unknown
//! providers work out of the box as long as their catalogs use recognizable
//! operation names.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{debug, instrument, warn};

use docbridge_provider::{ConnectionStore, Provider, ProviderRegistry};
use docbridge_shared::{
    AppConfig, Connection, ConnectionStatus, ContentType, DocumentCapability, Result,
};

/// Ordered aliases for the list (enumerate children) category. A bare
/// `search` counts: page stores browse through their search operation.
const LIST_OPERATION_ALIASES: &[&str] = &[
    "listFiles",
    "listItems",
    "listObjects",
    "listDocuments",
    "listPages",
    "list",
    "search",
];

/// Ordered aliases for the download (fetch raw content) category.
const DOWNLOAD_OPERATION_ALIASES: &[&str] = &[
    "downloadFile",
    "download",
    "getFileContent",
    "downloadItem",
    "export",
];

/// Ordered aliases for the search category.
const SEARCH_OPERATION_ALIASES: &[&str] =
    &["search", "searchFiles", "searchItems", "searchPages", "query"];

/// Ordered aliases for the get-structured-content category.
const GET_CONTENT_OPERATION_ALIASES: &[&str] = &[
    "getPage",
    "getPageContent",
    "getBlocks",
    "getBlockChildren",
    "getDocumentContent",
];

/// Providers known to serve page/block trees.
const STRUCTURED_PROVIDERS: &[&str] = &["notion", "confluence", "coda"];

/// Providers known to serve opaque files.
const BINARY_PROVIDERS: &[&str] = &["google-drive", "dropbox", "onedrive", "box", "s3"];

/// Providers serving both files and pages.
const MIXED_PROVIDERS: &[&str] = &["sharepoint", "slack"];

// ---------------------------------------------------------------------------
// CapabilityCache
// ---------------------------------------------------------------------------

/// Shared memo of detection results, keyed by provider name.
///
/// `None` entries are negative results and cache too: a provider judged not
/// capable is not re-introspected until an explicit clear/evict.
#[derive(Clone, Default)]
pub struct CapabilityCache {
    inner: Arc<RwLock<HashMap<String, Option<DocumentCapability>>>>,
}

impl CapabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outer `None` means "never detected"; inner `None` is a cached
    /// not-capable verdict.
    pub fn get(&self, provider_name: &str) -> Option<Option<DocumentCapability>> {
        self.inner
            .read()
            .expect("capability cache lock")
            .get(provider_name)
            .cloned()
    }

    pub fn insert(&self, provider_name: &str, capability: Option<DocumentCapability>) {
        self.inner
            .write()
            .expect("capability cache lock")
            .insert(provider_name.to_string(), capability);
    }

    pub fn evict(&self, provider_name: &str) {
        self.inner
            .write()
            .expect("capability cache lock")
            .remove(provider_name);
    }

    pub fn clear(&self) {
        self.inner.write().expect("capability cache lock").clear();
    }
}

// ---------------------------------------------------------------------------
// CapabilityDetector
// ---------------------------------------------------------------------------

/// An active connection paired with its provider's detected capability.
#[derive(Debug, Clone, Serialize)]
pub struct CapableConnection {
    pub connection: Connection,
    pub capability: DocumentCapability,
}

/// Detects and memoizes per-provider document capabilities.
pub struct CapabilityDetector {
    registry: Arc<dyn ProviderRegistry>,
    cache: CapabilityCache,
    overrides: BTreeMap<String, ContentType>,
}

impl CapabilityDetector {
    pub fn new(registry: Arc<dyn ProviderRegistry>) -> Self {
        Self {
            registry,
            cache: CapabilityCache::new(),
            overrides: BTreeMap::new(),
        }
    }

    /// Share a cache across detector instances.
    pub fn with_cache(mut self, cache: CapabilityCache) -> Self {
        self.cache = cache;
        self
    }

    /// Apply per-provider content-type overrides from the app config.
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        for (name, entry) in &config.providers {
            if let Some(content_type) = entry.content_type {
                self.overrides
                    .insert(name.to_ascii_lowercase(), content_type);
            }
        }
        self
    }

    /// Inspect a loaded provider's catalog and decide how it can serve
    /// documents. Memoized by provider name; introspection failures are
    /// logged and cached as not-capable rather than propagated.
    #[instrument(skip_all, fields(provider = provider.name()))]
    pub fn detect(&self, provider: &dyn Provider) -> Option<DocumentCapability> {
        let name = provider.name().to_string();

        if let Some(cached) = self.cache.get(&name) {
            debug!("capability cache hit");
            return cached;
        }

        let capability = self.compute(provider);
        self.cache.insert(&name, capability.clone());
        capability
    }

    /// Load a provider through the registry and detect, with the same
    /// memoization as [`detect`](Self::detect). Load failures propagate;
    /// they mean the name is wrong, not that the provider lacks support.
    pub async fn detect_by_name(&self, provider_name: &str) -> Result<Option<DocumentCapability>> {
        if let Some(cached) = self.cache.get(provider_name) {
            return Ok(cached);
        }

        let provider = self.registry.load_provider(provider_name).await?;
        Ok(self.detect(provider.as_ref()))
    }

    /// Names of every registered provider that detects as capable.
    /// Providers that fail to load are skipped, not fatal.
    #[instrument(skip_all)]
    pub async fn capable_provider_ids(&self) -> Vec<String> {
        let mut capable = Vec::new();
        for name in self.registry.registered_providers() {
            match self.detect_by_name(&name).await {
                Ok(Some(_)) => capable.push(name),
                Ok(None) => {}
                Err(e) => {
                    debug!(provider = %name, error = %e, "skipping provider that failed to load");
                }
            }
        }
        capable
    }

    /// Active connections of a workspace whose providers detect as capable.
    #[instrument(skip_all, fields(workspace_id = %workspace_id))]
    pub async fn capable_connections(
        &self,
        store: &dyn ConnectionStore,
        workspace_id: &str,
    ) -> Result<Vec<CapableConnection>> {
        let connections = store
            .find_by_workspace(workspace_id, Some(ConnectionStatus::Active))
            .await?;

        let mut capable = Vec::new();
        for connection in connections {
            match self.detect_by_name(&connection.provider_name).await {
                Ok(Some(capability)) => capable.push(CapableConnection {
                    connection,
                    capability,
                }),
                Ok(None) => {
                    debug!(provider = %connection.provider_name, "provider not capable");
                }
                Err(e) => {
                    debug!(
                        provider = %connection.provider_name,
                        error = %e,
                        "skipping connection whose provider failed to load"
                    );
                }
            }
        }
        Ok(capable)
    }

    /// Drop every memoized result.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drop one provider's memoized result.
    pub fn evict(&self, provider_name: &str) {
        self.cache.evict(provider_name);
    }

    fn compute(&self, provider: &dyn Provider) -> Option<DocumentCapability> {
        let operations = match provider.operations() {
            Ok(ops) => ops,
            Err(e) => {
                warn!(error = %e, "operation introspection failed, caching as not capable");
                return None;
            }
        };

        let ids: Vec<String> = operations.into_iter().map(|op| op.id).collect();

        let list_operation = match_alias(&ids, LIST_OPERATION_ALIASES);
        let download_operation = match_alias(&ids, DOWNLOAD_OPERATION_ALIASES);
        let search_operation = match_alias(&ids, SEARCH_OPERATION_ALIASES);
        let get_content_operation = match_alias(&ids, GET_CONTENT_OPERATION_ALIASES);

        // Without a way to enumerate content there is nothing to import.
        if list_operation.is_none() && search_operation.is_none() {
            debug!(operations = ids.len(), "no list or search operation, not capable");
            return None;
        }

        let content_type = self.resolve_content_type(
            provider.name(),
            download_operation.is_some(),
            get_content_operation.is_some(),
        );

        debug!(
            %content_type,
            list = list_operation.as_deref(),
            download = download_operation.as_deref(),
            search = search_operation.as_deref(),
            get_content = get_content_operation.as_deref(),
            "capability detected"
        );

        Some(DocumentCapability {
            supports_browsing: list_operation.is_some(),
            supports_search: search_operation.is_some(),
            content_type,
            list_operation,
            download_operation,
            search_operation,
            get_content_operation,
        })
    }

    /// Name tables win over operation-shape inference, so a known provider
    /// keeps its category even when its catalog looks ambiguous.
    fn resolve_content_type(
        &self,
        provider_name: &str,
        has_download: bool,
        has_get_content: bool,
    ) -> ContentType {
        let lowered = provider_name.to_ascii_lowercase();

        if let Some(content_type) = self.overrides.get(&lowered) {
            return *content_type;
        }
        if STRUCTURED_PROVIDERS.contains(&lowered.as_str()) {
            return ContentType::Structured;
        }
        if BINARY_PROVIDERS.contains(&lowered.as_str()) {
            return ContentType::Binary;
        }
        if MIXED_PROVIDERS.contains(&lowered.as_str()) {
            return ContentType::Mixed;
        }

        match (has_download, has_get_content) {
            (true, true) => ContentType::Mixed,
            (true, false) => ContentType::Binary,
            (false, true) => ContentType::Structured,
            (false, false) => ContentType::Binary,
        }
    }
}

/// First alias with a case-insensitive catalog match wins; the recorded id
/// keeps the catalog's original casing.
fn match_alias(operation_ids: &[String], aliases: &[&str]) -> Option<String> {
    for alias in aliases {
        let lowered_alias = alias.to_ascii_lowercase();
        if let Some(found) = operation_ids
            .iter()
            .find(|id| id.to_ascii_lowercase() == lowered_alias)
        {
            return Some(found.clone());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docbridge_provider::{InMemoryConnectionStore, ReplayProvider, StaticRegistry};
    use docbridge_shared::ConnectionId;

    fn registry_with(providers: Vec<ReplayProvider>) -> Arc<StaticRegistry> {
        let mut registry = StaticRegistry::new();
        for provider in providers {
            registry.register(Arc::new(provider));
        }
        Arc::new(registry)
    }

    fn connection_for(provider: &str, workspace: &str, status: ConnectionStatus) -> Connection {
        Connection {
            id: ConnectionId::new(),
            provider_name: provider.into(),
            workspace_id: workspace.into(),
            display_name: None,
            status,
            credentials: None,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    #[test]
    fn list_only_catalog_supports_browsing_not_search() {
        let provider =
            ReplayProvider::new("files-r-us", "Files R Us").with_operations(&["listFiles"]);
        let detector = CapabilityDetector::new(registry_with(vec![]));

        let capability = detector.detect(&provider).expect("capable");
        assert!(capability.supports_browsing);
        assert!(!capability.supports_search);
        assert_eq!(capability.list_operation.as_deref(), Some("listFiles"));
        assert_eq!(capability.search_operation, None);
    }

    #[test]
    fn catalog_without_list_or_search_is_not_capable() {
        let provider =
            ReplayProvider::new("webhook-only", "Webhooks").with_operations(&["sendWebhook", "downloadFile"]);
        let detector = CapabilityDetector::new(registry_with(vec![]));

        assert!(detector.detect(&provider).is_none());
    }

    #[test]
    fn structured_allow_list_beats_operation_inference() {
        // Catalog shape alone would infer binary; the name table wins.
        let provider =
            ReplayProvider::new("notion", "Notion").with_operations(&["listFiles", "downloadFile"]);
        let detector = CapabilityDetector::new(registry_with(vec![]));

        let capability = detector.detect(&provider).expect("capable");
        assert_eq!(capability.content_type, ContentType::Structured);
    }

    #[test]
    fn unknown_name_infers_from_operation_shape() {
        let detector = CapabilityDetector::new(registry_with(vec![]));

        let both = ReplayProvider::new("hybrid-x", "Hybrid")
            .with_operations(&["search", "downloadFile", "getPage"]);
        assert_eq!(
            detector.detect(&both).expect("capable").content_type,
            ContentType::Mixed
        );

        let pages = ReplayProvider::new("pages-x", "Pages").with_operations(&["search", "getPage"]);
        assert_eq!(
            detector.detect(&pages).expect("capable").content_type,
            ContentType::Structured
        );

        let neither = ReplayProvider::new("plain-x", "Plain").with_operations(&["listItems"]);
        assert_eq!(
            detector.detect(&neither).expect("capable").content_type,
            ContentType::Binary
        );
    }

    #[test]
    fn drive_x_catalog_detects_as_binary() {
        let provider = ReplayProvider::new("drive-x", "Drive X")
            .with_operations(&["listFiles", "downloadFile", "getFile"]);
        let detector = CapabilityDetector::new(registry_with(vec![]));

        let capability = detector.detect(&provider).expect("capable");
        assert_eq!(capability.content_type, ContentType::Binary);
        assert_eq!(capability.list_operation.as_deref(), Some("listFiles"));
        assert_eq!(capability.download_operation.as_deref(), Some("downloadFile"));
        assert_eq!(capability.get_content_operation, None);
    }

    #[test]
    fn matching_is_case_insensitive_but_records_original_casing() {
        let provider =
            ReplayProvider::new("shouty", "Shouty").with_operations(&["ListFiles", "DOWNLOAD"]);
        let detector = CapabilityDetector::new(registry_with(vec![]));

        let capability = detector.detect(&provider).expect("capable");
        assert_eq!(capability.list_operation.as_deref(), Some("ListFiles"));
        assert_eq!(capability.download_operation.as_deref(), Some("DOWNLOAD"));
    }

    #[test]
    fn detection_is_memoized_per_provider_name() {
        let provider = ReplayProvider::new("drive-x", "Drive X")
            .with_operations(&["listFiles", "downloadFile"]);
        let detector = CapabilityDetector::new(registry_with(vec![]));

        let first = detector.detect(&provider);
        let second = detector.detect(&provider);

        assert_eq!(first, second);
        assert_eq!(provider.introspection_count(), 1);
    }

    #[test]
    fn introspection_failure_caches_as_not_capable() {
        let provider = ReplayProvider::new("flaky", "Flaky").with_failing_introspection();
        let detector = CapabilityDetector::new(registry_with(vec![]));

        assert!(detector.detect(&provider).is_none());
        assert!(detector.detect(&provider).is_none());
        assert_eq!(provider.introspection_count(), 1);
    }

    #[test]
    fn evict_forces_re_detection() {
        let provider = ReplayProvider::new("drive-x", "Drive X").with_operations(&["listFiles"]);
        let detector = CapabilityDetector::new(registry_with(vec![]));

        detector.detect(&provider);
        detector.evict("drive-x");
        detector.detect(&provider);

        assert_eq!(provider.introspection_count(), 2);
    }

    #[test]
    fn config_override_wins_over_name_tables() {
        let toml_str = r#"
[providers.dropbox]
content_type = "mixed"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse config");
        let provider = ReplayProvider::new("dropbox", "Dropbox")
            .with_operations(&["listFiles", "downloadFile"]);
        let detector = CapabilityDetector::new(registry_with(vec![])).with_config(&config);

        let capability = detector.detect(&provider).expect("capable");
        assert_eq!(capability.content_type, ContentType::Mixed);
    }

    #[tokio::test]
    async fn detect_by_name_loads_through_registry() {
        let registry = registry_with(vec![
            ReplayProvider::new("drive-x", "Drive X").with_operations(&["listFiles"]),
        ]);
        let detector = CapabilityDetector::new(registry);

        let capability = detector
            .detect_by_name("drive-x")
            .await
            .expect("load")
            .expect("capable");
        assert!(capability.supports_browsing);

        assert!(detector.detect_by_name("missing").await.is_err());
    }

    #[tokio::test]
    async fn capable_provider_ids_skips_incapable_providers() {
        let registry = registry_with(vec![
            ReplayProvider::new("drive-x", "Drive X").with_operations(&["listFiles"]),
            ReplayProvider::new("webhook-only", "Webhooks").with_operations(&["sendWebhook"]),
            ReplayProvider::new("notion", "Notion").with_operations(&["search", "getPage"]),
        ]);
        let detector = CapabilityDetector::new(registry);

        let ids = detector.capable_provider_ids().await;
        assert_eq!(ids, vec!["drive-x", "notion"]);
    }

    #[tokio::test]
    async fn capable_connections_joins_active_connections_only() {
        let registry = registry_with(vec![
            ReplayProvider::new("drive-x", "Drive X").with_operations(&["listFiles"]),
        ]);
        let detector = CapabilityDetector::new(registry);

        let store = InMemoryConnectionStore::new();
        store.insert(connection_for("drive-x", "ws-1", ConnectionStatus::Active));
        store.insert(connection_for("drive-x", "ws-1", ConnectionStatus::Revoked));
        store.insert(connection_for("gone", "ws-1", ConnectionStatus::Active));

        let capable = detector
            .capable_connections(&store, "ws-1")
            .await
            .expect("query");
        assert_eq!(capable.len(), 1);
        assert_eq!(capable[0].connection.provider_name, "drive-x");
        assert_eq!(capable[0].capability.content_type, ContentType::Binary);
    }
}
