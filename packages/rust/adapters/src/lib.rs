//! Adapter strategies that normalize provider responses into the shared
//! document model.
//!
//! Two strategies cover every capable provider: [`BinaryFileAdapter`] for
//! file stores whose items download as byte buffers, and
//! [`StructuredContentAdapter`] for page stores whose content is converted
//! to markdown. [`AdapterFactory`] picks the strategy from a provider's
//! detected capability and caches one adapter per provider name.

pub mod content;

mod binary;
mod factory;
mod profiles;
mod structured;

pub use binary::BinaryFileAdapter;
pub use factory::{AdapterCache, AdapterFactory};
pub use profiles::ProviderProfile;
pub use structured::StructuredContentAdapter;

use async_trait::async_trait;

use docbridge_shared::{
    Breadcrumbs, BrowseOptions, Connection, IntegrationBrowseResult, IntegrationDownloadResult,
    IntegrationFile, Result,
};

/// One normalization strategy bound to a loaded provider and its detected
/// capability. Stateless across calls beyond that pairing.
#[async_trait]
pub trait DocumentAdapter: Send + Sync {
    /// Enumerate one page of a folder's children (the root when
    /// `options.folder_id` is unset).
    async fn browse(
        &self,
        connection: &Connection,
        options: &BrowseOptions,
    ) -> Result<IntegrationBrowseResult>;

    /// Text search across the provider's content.
    async fn search(
        &self,
        connection: &Connection,
        query: &str,
        options: &BrowseOptions,
    ) -> Result<IntegrationBrowseResult>;

    /// Fetch one item's content as bytes. `mime_type` is the caller's hint
    /// of the item's reported type, used to route workspace-native
    /// documents through export.
    async fn download(
        &self,
        connection: &Connection,
        file_id: &str,
        mime_type: Option<&str>,
    ) -> Result<IntegrationDownloadResult>;

    /// Fetch one item's normalized record. `None` when the provider has no
    /// by-id lookup operation.
    async fn get_file_info(
        &self,
        connection: &Connection,
        file_id: &str,
    ) -> Result<Option<IntegrationFile>>;

    /// Root-to-folder navigation path. The default covers providers without
    /// parent traversal; walk failures degrade to a partial trail rather
    /// than erroring.
    async fn build_breadcrumbs(&self, _connection: &Connection, _folder_id: &str) -> Breadcrumbs {
        Breadcrumbs::default()
    }
}
