//! Structured content adapter: normalizes page-store providers whose
//! content is a tree of blocks, downloaded as rendered markdown.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use docbridge_markdown::{extract_title, render_page, sanitize_filename};
use docbridge_provider::Provider;
use docbridge_shared::{
    BrowseOptions, Connection, DocBridgeError, DocumentCapability, IntegrationBrowseResult,
    IntegrationDownloadResult, IntegrationFile, Result,
};

use crate::DocumentAdapter;
use crate::content;
use crate::profiles::ProviderProfile;

/// Block-children operation candidates, scanned in catalog order once at
/// construction.
const BLOCK_OPERATIONS: &[&str] = &["getBlockChildren", "getBlocks", "getPageContent", "listBlocks"];

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Strategy for `structured` providers.
///
/// Page stores typically expose no separate list operation, so browse and
/// search both resolve to the search-like operation; downloading converts
/// the page's block tree to markdown.
pub struct StructuredContentAdapter {
    provider: Arc<dyn Provider>,
    capability: DocumentCapability,
    profile: ProviderProfile,
    blocks_operation: Option<String>,
}

impl StructuredContentAdapter {
    /// Bind the adapter to a loaded provider and its detected capability.
    pub fn new(
        provider: Arc<dyn Provider>,
        capability: DocumentCapability,
        profile: ProviderProfile,
    ) -> Self {
        let catalog: Vec<String> = provider
            .operations()
            .map(|ops| ops.into_iter().map(|op| op.id).collect())
            .unwrap_or_default();

        let blocks_operation = BLOCK_OPERATIONS.iter().find_map(|candidate| {
            catalog
                .iter()
                .find(|id| id.eq_ignore_ascii_case(candidate))
                .cloned()
        });

        Self {
            provider,
            capability,
            profile,
            blocks_operation,
        }
    }

    /// Shared body of browse and search; both are one query against the
    /// provider's search-like operation.
    async fn query_pages(
        &self,
        connection: &Connection,
        query_text: Option<&str>,
        options: &BrowseOptions,
    ) -> Result<IntegrationBrowseResult> {
        let operation = self
            .capability
            .search_operation
            .as_deref()
            .or(self.capability.list_operation.as_deref())
            .ok_or_else(|| DocBridgeError::not_supported(self.provider.name(), "browse"))?;

        let mut params = Map::new();
        if let Some(text) = query_text {
            if !text.is_empty() {
                params.insert("query".into(), text.into());
            }
        }
        if self.profile.page_filter {
            // Restrict results to pages; databases/containers are not importable.
            params.insert(
                "filter".into(),
                json!({ "property": "object", "value": "page" }),
            );
        }
        if let Some(size) = options.page_size {
            params.insert("page_size".into(), size.into());
        }
        if let Some(cursor) = options.page_token.as_deref() {
            params.insert("start_cursor".into(), cursor.into());
        }

        let data = self
            .provider
            .execute(operation, Value::Object(params), connection)
            .await?
            .into_data(self.provider.name())?;

        let files = page_items(&data)
            .iter()
            .filter_map(|page| self.normalize_page(page))
            .collect();

        Ok(IntegrationBrowseResult {
            files,
            next_page_token: guarded_cursor(&data),
            breadcrumbs: Vec::new(),
            total_count: data.get("total").and_then(Value::as_u64),
        })
    }

    /// Map one raw page record into the shared model. Every page is a
    /// markdown-convertible leaf.
    fn normalize_page(&self, page: &Value) -> Option<IntegrationFile> {
        let id = page.get("id").and_then(Value::as_str)?.to_string();

        let title = extract_title(page);
        let name = if title.is_empty() {
            "Untitled".to_string()
        } else {
            title
        };

        let parent_id = page
            .get("parent")
            .and_then(|parent| {
                parent
                    .get("page_id")
                    .or_else(|| parent.get("database_id"))
            })
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(IntegrationFile {
            id,
            name,
            mime_type: Some("text/markdown".to_string()),
            size: None,
            is_folder: false,
            modified_time: content::parse_timestamp(page.get("last_edited_time")),
            path: page.get("url").and_then(Value::as_str).map(str::to_string),
            downloadable: true,
            parent_id,
            metadata: None,
        })
    }

    /// Fetch the page's ordered block list, draining pagination with the
    /// same has-more guard. Failures are logged and degrade to an empty
    /// list so conversion can fall back to the property bag.
    async fn fetch_blocks(&self, connection: &Connection, page_id: &str) -> Vec<Value> {
        let Some(operation) = self.blocks_operation.as_deref() else {
            return Vec::new();
        };

        let mut block_list = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut params = Map::new();
            params.insert("blockId".into(), page_id.into());
            if let Some(cursor) = cursor.as_deref() {
                params.insert("start_cursor".into(), cursor.into());
            }

            let fetched = self
                .provider
                .execute(operation, Value::Object(params), connection)
                .await
                .and_then(|outcome| outcome.into_data(self.provider.name()));

            let data = match fetched {
                Ok(data) => data,
                Err(error) => {
                    warn!(
                        provider = self.provider.name(),
                        page = page_id,
                        %error,
                        "block fetch failed, converting without blocks"
                    );
                    return Vec::new();
                }
            };

            if let Some(results) = data.get("results").and_then(Value::as_array) {
                block_list.extend(results.iter().cloned());
            }

            cursor = guarded_cursor(&data);
            if cursor.is_none() {
                break;
            }
        }

        debug!(page = page_id, blocks = block_list.len(), "blocks fetched");
        block_list
    }
}

#[async_trait::async_trait]
impl DocumentAdapter for StructuredContentAdapter {
    async fn browse(
        &self,
        connection: &Connection,
        options: &BrowseOptions,
    ) -> Result<IntegrationBrowseResult> {
        self.query_pages(connection, None, options).await
    }

    async fn search(
        &self,
        connection: &Connection,
        query: &str,
        options: &BrowseOptions,
    ) -> Result<IntegrationBrowseResult> {
        self.query_pages(connection, Some(query), options).await
    }

    /// Download is conversion: fetch the page record and its blocks, render
    /// markdown, and return the UTF-8 buffer.
    async fn download(
        &self,
        connection: &Connection,
        file_id: &str,
        _mime_type: Option<&str>,
    ) -> Result<IntegrationDownloadResult> {
        let get_op = self
            .capability
            .get_content_operation
            .as_deref()
            .ok_or_else(|| DocBridgeError::not_supported(self.provider.name(), "download"))?;

        let page = self
            .provider
            .execute(get_op, json!({ "pageId": file_id }), connection)
            .await?
            .into_data(self.provider.name())?;

        let block_list = self.fetch_blocks(connection, file_id).await;
        let rendered = render_page(&page, &block_list);

        let filename = format!("{}.md", sanitize_filename(&rendered.title));
        let buffer = rendered.markdown.into_bytes();
        let size = buffer.len() as u64;
        let content_hash = Some(content::content_hash(&buffer));

        Ok(IntegrationDownloadResult {
            buffer,
            content_type: "text/markdown".to_string(),
            filename,
            size,
            file_id: file_id.to_string(),
            modified_time: content::parse_timestamp(page.get("last_edited_time")),
            content_hash,
        })
    }

    async fn get_file_info(
        &self,
        connection: &Connection,
        file_id: &str,
    ) -> Result<Option<IntegrationFile>> {
        let Some(get_op) = self.capability.get_content_operation.as_deref() else {
            return Ok(None);
        };

        let page = self
            .provider
            .execute(get_op, json!({ "pageId": file_id }), connection)
            .await?
            .into_data(self.provider.name())?;

        let mut file = self.normalize_page(&page);
        if let Some(file) = file.as_mut() {
            // Single-item lookups carry the raw record for the caller.
            file.metadata = Some(page);
        }
        Ok(file)
    }
}

// ---------------------------------------------------------------------------
// Response-shape helpers
// ---------------------------------------------------------------------------

/// The page list from a search response: a `results` array or a bare array.
fn page_items(data: &Value) -> &[Value] {
    if let Some(items) = data.get("results").and_then(Value::as_array) {
        return items;
    }
    data.as_array().map(|items| items.as_slice()).unwrap_or(&[])
}

/// A page is terminal unless `has_more` is true and a cursor is present.
/// Some providers set one without the other.
fn guarded_cursor(data: &Value) -> Option<String> {
    let has_more = data.get("has_more").and_then(Value::as_bool).unwrap_or(false);
    let cursor = data.get("next_cursor").and_then(Value::as_str);
    match (has_more, cursor) {
        (true, Some(cursor)) => Some(cursor.to_string()),
        _ => None,
    }
}
