//! Core domain types for DocBridge integrations.
//!
//! Everything a provider returns is normalized into the types here before it
//! crosses the adapter boundary; consumers never see provider-specific shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Synthetic identifier for the root of a provider's content hierarchy.
pub const ROOT_FOLDER_ID: &str = "root";

// ---------------------------------------------------------------------------
// ConnectionId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for connection identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Generate a new time-sortable connection identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ConnectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Lifecycle state of a stored connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Active,
    Inactive,
    Expired,
    Revoked,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        };
        write!(f, "{s}")
    }
}

/// A stored link between a workspace and a provider account.
///
/// `credentials` is populated only by the with-data lookup on the connection
/// store; this layer passes it through to the provider opaquely and never
/// mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Unique connection identifier (UUID v7).
    pub id: ConnectionId,
    /// Name of the provider this connection authenticates against.
    pub provider_name: String,
    /// Owning workspace.
    pub workspace_id: String,
    /// Human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Lifecycle state; only `active` connections may serve content.
    pub status: ConnectionStatus,
    /// Decrypted credential payload, present only on with-data lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<serde_json::Value>,
    /// When the connection was created.
    pub created_at: DateTime<Utc>,
    /// When the connection last served a content access.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Connection {
    /// Whether this connection may serve content accesses.
    pub fn is_active(&self) -> bool {
        self.status == ConnectionStatus::Active
    }
}

// ---------------------------------------------------------------------------
// DocumentCapability
// ---------------------------------------------------------------------------

/// Content category a provider serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Opaque files downloaded as byte buffers.
    Binary,
    /// Page/block trees converted to markdown.
    Structured,
    /// Both; items are individually downloadable, so the binary strategy applies.
    Mixed,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Binary => "binary",
            Self::Structured => "structured",
            Self::Mixed => "mixed",
        };
        write!(f, "{s}")
    }
}

/// How a provider's list operation addresses a folder's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStyle {
    /// Relational query string (`'<id>' in parents and trashed = false`).
    Relational,
    /// Path-keyed listing with a cursor (`path` is empty for root).
    Path,
    /// Plain `folderId` parameter; the fallback for unknown providers.
    FolderParam,
}

/// What the capability detector inferred about a provider's document support.
///
/// Produced once per provider name and cached for the process lifetime; the
/// recorded operation ids keep their original casing from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCapability {
    /// Whether a list-category operation matched.
    pub supports_browsing: bool,
    /// Whether a search-category operation matched.
    pub supports_search: bool,
    /// Normalization strategy category.
    pub content_type: ContentType,
    /// Operation id used to enumerate folder children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_operation: Option<String>,
    /// Operation id used to fetch raw file content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_operation: Option<String>,
    /// Operation id used for text search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_operation: Option<String>,
    /// Operation id used to fetch structured page content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_content_operation: Option<String>,
}

// ---------------------------------------------------------------------------
// IntegrationFile
// ---------------------------------------------------------------------------

/// Normalized file/page record returned by every adapter.
///
/// `id` is opaque and provider-scoped, never assumed globally unique. A
/// folder is never downloadable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationFile {
    /// Provider-scoped item identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// MIME type, when the provider reported or implied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Size in bytes, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Whether the item is a container of other items.
    pub is_folder: bool,
    /// Last modification time, when reported in a parseable form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
    /// Provider-native display path, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Whether the import pipeline can fetch this item's content.
    pub downloadable: bool,
    /// Identifier of the containing folder, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Provider-specific extras carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Browse / download results
// ---------------------------------------------------------------------------

/// One `{id, name}` step in a navigation path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub id: String,
    pub name: String,
}

/// A root-to-folder navigation path.
///
/// `truncated` is set when the parent walk hit its depth cap with a parent
/// link still pending, so callers can render a partial-path marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumbs {
    pub trail: Vec<Breadcrumb>,
    #[serde(default)]
    pub truncated: bool,
}

/// One page of browse/search results.
///
/// `next_page_token == None` is the sole pagination termination signal; an
/// empty page with a token present means more pages are still pending.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationBrowseResult {
    /// Normalized items in provider order.
    pub files: Vec<IntegrationFile>,
    /// Opaque token for the next page, if any.
    pub next_page_token: Option<String>,
    /// Path to the browsed folder; empty when browsing from the root.
    pub breadcrumbs: Vec<Breadcrumb>,
    /// Total match count, when the provider reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

/// A downloaded (or converted) document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationDownloadResult {
    /// Raw content bytes; not serialized, callers persist it themselves.
    #[serde(skip)]
    pub buffer: Vec<u8>,
    /// Effective MIME type of `buffer`.
    pub content_type: String,
    /// Reported or synthesized filename.
    pub filename: String,
    /// Byte length of `buffer`.
    pub size: u64,
    /// Identifier of the downloaded item.
    pub file_id: String,
    /// Last modification time, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
    /// FNV-1a 32-bit hex fingerprint of `buffer` for cheap change detection.
    /// Never a cryptographic guarantee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

/// Caller-supplied knobs for one browse/search call.
#[derive(Debug, Clone, Default)]
pub struct BrowseOptions {
    /// Folder to enumerate; `None` browses from the provider root.
    pub folder_id: Option<String>,
    /// Continuation token from a previous page.
    pub page_token: Option<String>,
    /// Page size hint passed through to the provider.
    pub page_size: Option<u32>,
}

impl BrowseOptions {
    /// Options scoped to one folder, first page.
    pub fn in_folder(folder_id: impl Into<String>) -> Self {
        Self {
            folder_id: Some(folder_id.into()),
            ..Self::default()
        }
    }
}
