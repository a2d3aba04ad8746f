//! Integration document service: connection resolution, capability lookup,
//! adapter dispatch, and folder draining for the import pipeline.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use docbridge_adapters::{AdapterFactory, DocumentAdapter};
use docbridge_capability::{CapabilityDetector, CapableConnection};
use docbridge_provider::{ConnectionStore, ProviderRegistry};
use docbridge_shared::{
    AppConfig, Breadcrumbs, BrowseOptions, Connection, ConnectionId, DocBridgeError,
    DocumentCapability, IntegrationBrowseResult, IntegrationDownloadResult, IntegrationFile,
    ROOT_FOLDER_ID, Result,
};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Pre-flight check result. Never an `Err`; failures land in `error`.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionValidation {
    /// Whether the connection can serve document imports right now.
    pub valid: bool,
    /// Failure description when not valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The provider's detected capability when valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability: Option<DocumentCapability>,
}

/// Knobs for [`IntegrationDocumentService::list_source_files`].
#[derive(Debug, Clone, Default)]
pub struct ListSourceOptions {
    /// Folder to start from; the provider root when unset.
    pub folder_id: Option<String>,
    /// Descend into subfolders depth-first.
    pub recursive: bool,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// A connection resolved all the way to its adapter, ready to serve one
/// request.
struct ResolvedConnection {
    connection: Connection,
    adapter: Arc<dyn DocumentAdapter>,
}

/// The import-facing orchestration surface.
///
/// Every content access resolves the connection with decrypted credentials,
/// rejects non-active states, requires a detected capability, and signals
/// mark-as-used in the background. Capability queries and pre-flight
/// validation stay read-only.
pub struct IntegrationDocumentService {
    store: Arc<dyn ConnectionStore>,
    detector: CapabilityDetector,
    factory: AdapterFactory,
}

impl IntegrationDocumentService {
    pub fn new(registry: Arc<dyn ProviderRegistry>, store: Arc<dyn ConnectionStore>) -> Self {
        Self::with_config(registry, store, AppConfig::default())
    }

    /// Service whose detector and adapter profiles honor configuration
    /// overrides.
    pub fn with_config(
        registry: Arc<dyn ProviderRegistry>,
        store: Arc<dyn ConnectionStore>,
        config: AppConfig,
    ) -> Self {
        let detector = CapabilityDetector::new(registry.clone()).with_config(&config);
        let factory = AdapterFactory::with_config(registry, config);
        Self {
            store,
            detector,
            factory,
        }
    }

    // -- content accesses ---------------------------------------------------

    /// One page of a folder listing.
    #[instrument(skip_all, fields(connection = %connection_id))]
    pub async fn browse_connection(
        &self,
        connection_id: &ConnectionId,
        options: &BrowseOptions,
    ) -> Result<IntegrationBrowseResult> {
        let resolved = self.resolve(connection_id).await?;
        self.mark_used_in_background(&resolved.connection);
        resolved.adapter.browse(&resolved.connection, options).await
    }

    /// One page of search results.
    #[instrument(skip_all, fields(connection = %connection_id, query = %query))]
    pub async fn search_connection(
        &self,
        connection_id: &ConnectionId,
        query: &str,
        options: &BrowseOptions,
    ) -> Result<IntegrationBrowseResult> {
        let resolved = self.resolve(connection_id).await?;
        self.mark_used_in_background(&resolved.connection);
        resolved
            .adapter
            .search(&resolved.connection, query, options)
            .await
    }

    /// One item's normalized record.
    #[instrument(skip_all, fields(connection = %connection_id, file = %file_id))]
    pub async fn get_file_info(
        &self,
        connection_id: &ConnectionId,
        file_id: &str,
    ) -> Result<Option<IntegrationFile>> {
        let resolved = self.resolve(connection_id).await?;
        self.mark_used_in_background(&resolved.connection);
        resolved
            .adapter
            .get_file_info(&resolved.connection, file_id)
            .await
    }

    /// One item's content, downloaded or converted per the provider's
    /// content type.
    #[instrument(skip_all, fields(connection = %connection_id, file = %file_id))]
    pub async fn download_file(
        &self,
        connection_id: &ConnectionId,
        file_id: &str,
        mime_type: Option<&str>,
    ) -> Result<IntegrationDownloadResult> {
        let resolved = self.resolve(connection_id).await?;
        self.mark_used_in_background(&resolved.connection);
        resolved
            .adapter
            .download(&resolved.connection, file_id, mime_type)
            .await
    }

    /// Root-to-folder navigation path.
    #[instrument(skip_all, fields(connection = %connection_id, folder = %folder_id))]
    pub async fn build_breadcrumbs(
        &self,
        connection_id: &ConnectionId,
        folder_id: &str,
    ) -> Result<Breadcrumbs> {
        let resolved = self.resolve(connection_id).await?;
        self.mark_used_in_background(&resolved.connection);
        Ok(resolved
            .adapter
            .build_breadcrumbs(&resolved.connection, folder_id)
            .await)
    }

    /// Every importable file reachable from a folder.
    ///
    /// Drains all pages of each folder (`next_page_token == None` is the
    /// sole termination signal), keeps only non-folder downloadable files,
    /// and descends depth-first when recursive. A visited set guards
    /// against cyclic folder graphs; the same file reachable under several
    /// distinct folders is kept once per sighting.
    #[instrument(skip_all, fields(connection = %connection_id))]
    pub async fn list_source_files(
        &self,
        connection_id: &ConnectionId,
        options: &ListSourceOptions,
    ) -> Result<Vec<IntegrationFile>> {
        let resolved = self.resolve(connection_id).await?;
        self.mark_used_in_background(&resolved.connection);

        let mut collected = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(
            options
                .folder_id
                .clone()
                .unwrap_or_else(|| ROOT_FOLDER_ID.to_string()),
        );

        let mut stack: Vec<Option<String>> = vec![options.folder_id.clone()];

        while let Some(folder) = stack.pop() {
            let (files, subfolders) = self.drain_folder(&resolved, folder.as_deref()).await?;
            collected.extend(files);

            if options.recursive {
                // Reversed so the first-encountered subfolder is drained next.
                for subfolder in subfolders.into_iter().rev() {
                    if visited.insert(subfolder.clone()) {
                        stack.push(Some(subfolder));
                    }
                }
            }
        }

        info!(files = collected.len(), "source file listing complete");
        Ok(collected)
    }

    // -- capability queries -------------------------------------------------

    /// Detected capability of a connection's provider; `None` when the
    /// provider cannot serve documents.
    pub async fn get_connection_capability(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<Option<DocumentCapability>> {
        let connection = self
            .store
            .find_by_id(connection_id)
            .await?
            .ok_or_else(|| DocBridgeError::connection_not_found(connection_id.to_string()))?;

        self.detector.detect_by_name(&connection.provider_name).await
    }

    /// Names of every registered provider that detects as capable.
    pub async fn get_capable_provider_ids(&self) -> Vec<String> {
        self.detector.capable_provider_ids().await
    }

    /// Active connections of a workspace whose providers detect as capable.
    pub async fn get_capable_connections(
        &self,
        workspace_id: &str,
    ) -> Result<Vec<CapableConnection>> {
        self.detector
            .capable_connections(self.store.as_ref(), workspace_id)
            .await
    }

    /// Pre-flight check; converts every failure into a structured result
    /// instead of an error.
    #[instrument(skip_all, fields(connection = %connection_id))]
    pub async fn validate_connection(&self, connection_id: &ConnectionId) -> ConnectionValidation {
        match self.check_connection(connection_id).await {
            Ok(capability) => ConnectionValidation {
                valid: true,
                error: None,
                capability: Some(capability),
            },
            Err(error) => ConnectionValidation {
                valid: false,
                error: Some(error.to_string()),
                capability: None,
            },
        }
    }

    // -- cache control ------------------------------------------------------

    /// Drop both process-wide memos (capability and adapter).
    pub fn clear_caches(&self) {
        self.detector.clear_cache();
        self.factory.clear_cache();
    }

    /// Recompute one provider's capability and adapter on next use.
    pub fn evict_provider(&self, provider_name: &str) {
        self.detector.evict(provider_name);
        self.factory.evict(provider_name);
    }

    // -- internals ----------------------------------------------------------

    /// Resolve a connection to its adapter: with-data lookup, active-state
    /// gate, capability requirement, factory dispatch.
    async fn resolve(&self, connection_id: &ConnectionId) -> Result<ResolvedConnection> {
        let connection = self
            .store
            .find_by_id_with_data(connection_id)
            .await?
            .ok_or_else(|| DocBridgeError::connection_not_found(connection_id.to_string()))?;

        if !connection.is_active() {
            return Err(DocBridgeError::ConnectionInactive {
                id: connection.id.to_string(),
                status: connection.status.to_string(),
            });
        }

        let capability = self
            .detector
            .detect_by_name(&connection.provider_name)
            .await?
            .ok_or_else(|| {
                DocBridgeError::not_supported(
                    connection.provider_name.as_str(),
                    "document import",
                )
            })?;

        let adapter = self
            .factory
            .adapter_for(&connection.provider_name, &capability)
            .await?;

        Ok(ResolvedConnection {
            connection,
            adapter,
        })
    }

    /// The validation body behind `validate_connection`; plain lookup only,
    /// no adapter construction and no usage signal.
    async fn check_connection(&self, connection_id: &ConnectionId) -> Result<DocumentCapability> {
        let connection = self
            .store
            .find_by_id(connection_id)
            .await?
            .ok_or_else(|| DocBridgeError::connection_not_found(connection_id.to_string()))?;

        if !connection.is_active() {
            return Err(DocBridgeError::ConnectionInactive {
                id: connection.id.to_string(),
                status: connection.status.to_string(),
            });
        }

        self.detector
            .detect_by_name(&connection.provider_name)
            .await?
            .ok_or_else(|| {
                DocBridgeError::not_supported(
                    connection.provider_name.as_str(),
                    "document import",
                )
            })
    }

    /// All pages of one folder: importable files plus subfolder ids, both
    /// in encounter order.
    async fn drain_folder(
        &self,
        resolved: &ResolvedConnection,
        folder_id: Option<&str>,
    ) -> Result<(Vec<IntegrationFile>, Vec<String>)> {
        let mut files = Vec::new();
        let mut subfolders = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let options = BrowseOptions {
                folder_id: folder_id.map(str::to_string),
                page_token: page_token.take(),
                page_size: None,
            };

            let page = resolved.adapter.browse(&resolved.connection, &options).await?;

            for file in page.files {
                if file.is_folder {
                    subfolders.push(file.id);
                } else if file.downloadable {
                    files.push(file);
                }
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok((files, subfolders))
    }

    /// Fire-and-forget usage signal; a failure logs a warning and never
    /// fails the caller's request.
    fn mark_used_in_background(&self, connection: &Connection) {
        let store = Arc::clone(&self.store);
        let id = connection.id.clone();
        tokio::spawn(async move {
            if let Err(error) = store.mark_used(&id).await {
                warn!(connection = %id, %error, "mark-as-used failed");
            }
        });
    }
}
