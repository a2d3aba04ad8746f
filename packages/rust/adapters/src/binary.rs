//! Binary file adapter: normalizes file-store providers whose items are
//! downloaded as opaque byte buffers.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};
use tracing::{debug, warn};

use docbridge_provider::Provider;
use docbridge_shared::{
    Breadcrumb, Breadcrumbs, BrowseOptions, Connection, DocBridgeError, DocumentCapability,
    IntegrationBrowseResult, IntegrationDownloadResult, IntegrationFile, QueryStyle,
    ROOT_FOLDER_ID, Result,
};

use crate::DocumentAdapter;
use crate::content;
use crate::profiles::ProviderProfile;

/// By-id metadata lookup candidates, scanned in catalog order once at
/// construction.
const METADATA_OPERATIONS: &[&str] = &["getFile", "getItem", "getFileInfo", "getMetadata", "get"];

/// Export-operation candidates for workspace-native documents.
const EXPORT_OPERATIONS: &[&str] = &["exportFile", "export", "exportDocument"];

/// Parent-walk depth cap; guarantees termination on cyclic or malformed
/// parent graphs.
const MAX_BREADCRUMB_DEPTH: usize = 10;

const DEFAULT_PAGE_SIZE: u32 = 50;

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Strategy for `binary` and `mixed` providers.
///
/// All per-provider variance is resolved up front: the query style comes
/// from the [`ProviderProfile`], and the optional metadata/export operations
/// are found in the catalog at construction, so no method branches on
/// provider name.
pub struct BinaryFileAdapter {
    provider: Arc<dyn Provider>,
    capability: DocumentCapability,
    profile: ProviderProfile,
    metadata_operation: Option<String>,
    export_operation: Option<String>,
}

impl BinaryFileAdapter {
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

        let metadata_operation = find_operation(&catalog, METADATA_OPERATIONS);
        let export_operation = find_operation(&catalog, EXPORT_OPERATIONS);

        Self {
            provider,
            capability,
            profile,
            metadata_operation,
            export_operation,
        }
    }

    /// Query parameters for one list call, keyed per the provider's style.
    fn list_params(&self, options: &BrowseOptions) -> Value {
        let folder_id = options.folder_id.as_deref().unwrap_or(ROOT_FOLDER_ID);
        let page_size = options.page_size.unwrap_or(DEFAULT_PAGE_SIZE);

        let mut params = match self.profile.query_style {
            QueryStyle::Relational => json!({
                "q": format!("'{folder_id}' in parents and trashed = false"),
                "pageSize": page_size,
                "fields": "nextPageToken, files(id, name, mimeType, size, modifiedTime, parents)",
            }),
            QueryStyle::Path => json!({
                // Path stores address the root as the empty path.
                "path": if folder_id == ROOT_FOLDER_ID { "" } else { folder_id },
                "limit": page_size,
            }),
            QueryStyle::FolderParam => json!({
                "folderId": folder_id,
                "pageSize": page_size,
            }),
        };

        if let Some(token) = options.page_token.as_deref() {
            let key = match self.profile.query_style {
                QueryStyle::Path => "cursor",
                _ => "pageToken",
            };
            params[key] = token.into();
        }

        params
    }

    /// Parameters addressing one item by id, keyed per the query style.
    fn item_params(&self, file_id: &str) -> Value {
        match self.profile.query_style {
            QueryStyle::Path => json!({ "path": file_id }),
            _ => json!({ "fileId": file_id }),
        }
    }

    fn normalize_file_list(&self, data: &Value) -> Vec<IntegrationFile> {
        raw_items(data)
            .iter()
            .filter_map(|item| self.normalize_file(item))
            .collect()
    }

    /// Map one raw item into the shared model. Items without a usable id
    /// are skipped.
    fn normalize_file(&self, item: &Value) -> Option<IntegrationFile> {
        let Some(id) = first_string(item, &["id", "path_lower", "path"]) else {
            debug!(
                provider = self.provider.name(),
                "skipping item without a usable id"
            );
            return None;
        };

        let name = item
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(id)
            .to_string();

        let is_folder = is_folder_marker(item);

        let mut mime_type = first_string(item, &["mimeType", "mime_type"]).map(str::to_string);
        if mime_type.is_none() && !is_folder {
            mime_type = content::mime_for_filename(&name).map(str::to_string);
        }

        let downloadable = !is_folder
            && mime_type
                .as_deref()
                .is_some_and(content::is_importable_mime);

        let parent_id = item
            .get("parents")
            .and_then(Value::as_array)
            .and_then(|parents| parents.first())
            .and_then(Value::as_str)
            .or_else(|| first_string(item, &["parentId", "parent_id"]))
            .map(str::to_string);

        Some(IntegrationFile {
            id: id.to_string(),
            name,
            mime_type,
            size: content::parse_size(item.get("size")),
            is_folder,
            modified_time: content::parse_timestamp(first_value(
                item,
                &["modifiedTime", "server_modified", "modified_time"],
            )),
            path: first_string(item, &["path_display", "path"]).map(str::to_string),
            downloadable,
            parent_id,
            metadata: None,
        })
    }

    /// Decode the base64 payload out of a download/export response.
    fn decode_payload(&self, data: &Value) -> Result<Vec<u8>> {
        let encoded = first_string(data, &["content", "data", "fileContent"]).ok_or_else(|| {
            DocBridgeError::decode("download response carried no content field")
        })?;
        BASE64
            .decode(encoded)
            .map_err(|e| DocBridgeError::decode(format!("invalid base64 content: {e}")))
    }

    fn finish_download(
        &self,
        data: &Value,
        file_id: &str,
        content_type: &str,
    ) -> Result<IntegrationDownloadResult> {
        let buffer = self.decode_payload(data)?;
        let filename = first_string(data, &["filename", "name"])
            .map(str::to_string)
            .unwrap_or_else(|| synthesized_filename(file_id, content_type));

        let size = buffer.len() as u64;
        let content_hash = Some(content::content_hash(&buffer));

        Ok(IntegrationDownloadResult {
            buffer,
            content_type: content_type.to_string(),
            filename,
            size,
            file_id: file_id.to_string(),
            modified_time: content::parse_timestamp(first_value(
                data,
                &["modifiedTime", "server_modified", "modified_time"],
            )),
            content_hash,
        })
    }

    /// Native editor documents have no raw bytes; route through the export
    /// operation with the type-specific target format.
    async fn export_native(
        &self,
        connection: &Connection,
        file_id: &str,
        native_mime: &str,
    ) -> Result<IntegrationDownloadResult> {
        let target = export_target(native_mime).ok_or_else(|| {
            DocBridgeError::operation(
                self.provider.name(),
                format!("no export target for native type {native_mime}"),
            )
        })?;

        let operation = self
            .export_operation
            .as_deref()
            .or(self.capability.download_operation.as_deref())
            .ok_or_else(|| DocBridgeError::not_supported(self.provider.name(), "export"))?;

        debug!(operation, file = file_id, target, "exporting native document");

        let params = json!({ "fileId": file_id, "mimeType": target });
        let data = self
            .provider
            .execute(operation, params, connection)
            .await?
            .into_data(self.provider.name())?;

        self.finish_download(&data, file_id, target)
    }
}

#[async_trait::async_trait]
impl DocumentAdapter for BinaryFileAdapter {
    async fn browse(
        &self,
        connection: &Connection,
        options: &BrowseOptions,
    ) -> Result<IntegrationBrowseResult> {
        let list_op = self
            .capability
            .list_operation
            .as_deref()
            .ok_or_else(|| DocBridgeError::not_supported(self.provider.name(), "browse"))?;

        debug!(
            operation = list_op,
            folder = options.folder_id.as_deref(),
            "browsing folder"
        );

        let data = self
            .provider
            .execute(list_op, self.list_params(options), connection)
            .await?
            .into_data(self.provider.name())?;

        let breadcrumbs = match options.folder_id.as_deref() {
            Some(folder_id) => self.build_breadcrumbs(connection, folder_id).await.trail,
            None => Vec::new(),
        };

        Ok(IntegrationBrowseResult {
            files: self.normalize_file_list(&data),
            next_page_token: next_page_token(&data),
            breadcrumbs,
            total_count: total_count(&data),
        })
    }

    async fn search(
        &self,
        connection: &Connection,
        query: &str,
        options: &BrowseOptions,
    ) -> Result<IntegrationBrowseResult> {
        let search_op = self
            .capability
            .search_operation
            .as_deref()
            .ok_or_else(|| DocBridgeError::not_supported(self.provider.name(), "search"))?;

        let mut params = json!({ "query": query });
        if let Some(size) = options.page_size {
            params["pageSize"] = size.into();
        }
        if let Some(token) = options.page_token.as_deref() {
            params["pageToken"] = token.into();
        }

        let data = self
            .provider
            .execute(search_op, params, connection)
            .await?
            .into_data(self.provider.name())?;

        Ok(IntegrationBrowseResult {
            files: self.normalize_file_list(&data),
            next_page_token: next_page_token(&data),
            breadcrumbs: Vec::new(),
            total_count: total_count(&data),
        })
    }

    async fn download(
        &self,
        connection: &Connection,
        file_id: &str,
        mime_type: Option<&str>,
    ) -> Result<IntegrationDownloadResult> {
        if let Some(mime) = mime_type {
            if content::is_native_doc(mime) {
                return self.export_native(connection, file_id, mime).await;
            }
        }

        let download_op = self
            .capability
            .download_operation
            .as_deref()
            .ok_or_else(|| DocBridgeError::not_supported(self.provider.name(), "download"))?;

        let data = self
            .provider
            .execute(download_op, self.item_params(file_id), connection)
            .await?
            .into_data(self.provider.name())?;

        let content_type = first_string(&data, &["contentType", "mimeType"])
            .or(mime_type)
            .unwrap_or("application/octet-stream")
            .to_string();

        self.finish_download(&data, file_id, &content_type)
    }

    async fn get_file_info(
        &self,
        connection: &Connection,
        file_id: &str,
    ) -> Result<Option<IntegrationFile>> {
        let Some(operation) = self.metadata_operation.as_deref() else {
            return Ok(None);
        };

        let data = self
            .provider
            .execute(operation, self.item_params(file_id), connection)
            .await?
            .into_data(self.provider.name())?;

        let mut file = self.normalize_file(&data);
        if let Some(file) = file.as_mut() {
            // Single-item lookups carry the raw record for the caller.
            file.metadata = Some(data);
        }
        Ok(file)
    }

    /// Walk upward through parent links, prepending one crumb per step.
    /// The trail always starts with a synthetic root entry named after the
    /// provider; lookup failures end the walk with the partial trail.
    async fn build_breadcrumbs(&self, connection: &Connection, folder_id: &str) -> Breadcrumbs {
        let root_crumb = Breadcrumb {
            id: ROOT_FOLDER_ID.to_string(),
            name: self.provider.display_name().to_string(),
        };

        if folder_id == ROOT_FOLDER_ID || folder_id.is_empty() {
            return Breadcrumbs {
                trail: vec![root_crumb],
                truncated: false,
            };
        }

        let Some(operation) = self.metadata_operation.as_deref() else {
            return Breadcrumbs::default();
        };

        let mut trail: Vec<Breadcrumb> = Vec::new();
        let mut current = Some(folder_id.to_string());

        for _ in 0..MAX_BREADCRUMB_DEPTH {
            let Some(folder) = current.take() else {
                break;
            };
            if folder == ROOT_FOLDER_ID {
                break;
            }

            let lookup = self
                .provider
                .execute(operation, self.item_params(&folder), connection)
                .await
                .and_then(|outcome| outcome.into_data(self.provider.name()));

            let data = match lookup {
                Ok(data) => data,
                Err(error) => {
                    warn!(
                        provider = self.provider.name(),
                        folder = %folder,
                        %error,
                        "breadcrumb walk failed, returning partial trail"
                    );
                    break;
                }
            };

            let name = data
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(&folder)
                .to_string();
            trail.insert(0, Breadcrumb { id: folder, name });

            current = data
                .get("parents")
                .and_then(Value::as_array)
                .and_then(|parents| parents.first())
                .and_then(Value::as_str)
                .or_else(|| first_string(&data, &["parentId", "parent_id"]))
                .map(str::to_string);
        }

        // The cap fired with a parent link still pending.
        let truncated = current.is_some();

        trail.insert(0, root_crumb);
        Breadcrumbs { trail, truncated }
    }
}

// ---------------------------------------------------------------------------
// Response-shape helpers
// ---------------------------------------------------------------------------

/// First catalog id matching any candidate, case-insensitively; the
/// original casing is preserved.
fn find_operation(catalog: &[String], candidates: &[&str]) -> Option<String> {
    for candidate in candidates {
        if let Some(id) = catalog.iter().find(|id| id.eq_ignore_ascii_case(candidate)) {
            return Some(id.clone());
        }
    }
    None
}

/// The item list out of any of the four known response shapes: a bare
/// array, or an object keyed `files`, `entries`, or `items`.
fn raw_items(data: &Value) -> &[Value] {
    if let Some(items) = data.as_array() {
        return items;
    }
    for key in ["files", "entries", "items"] {
        if let Some(items) = data.get(key).and_then(Value::as_array) {
            return items;
        }
    }
    &[]
}

/// Folder markers across the known response dialects.
fn is_folder_marker(item: &Value) -> bool {
    if item.get("mimeType").and_then(Value::as_str) == Some(content::FOLDER_MIME_TYPE) {
        return true;
    }
    if item.get(".tag").and_then(Value::as_str) == Some("folder") {
        return true;
    }
    item.get("type").and_then(Value::as_str) == Some("folder")
}

fn next_page_token(data: &Value) -> Option<String> {
    first_string(data, &["nextPageToken", "cursor", "next_cursor"]).map(str::to_string)
}

fn total_count(data: &Value) -> Option<u64> {
    first_value(data, &["totalCount", "total"]).and_then(Value::as_u64)
}

fn first_string<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
}

fn first_value<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| value.get(key))
}

/// Export target per native editor type; only these four are convertible.
fn export_target(native_mime: &str) -> Option<&'static str> {
    let editor_type = native_mime.strip_prefix(content::NATIVE_DOC_PREFIX)?;
    match editor_type {
        "document" | "presentation" | "drawing" => Some("application/pdf"),
        "spreadsheet" => Some("text/csv"),
        _ => None,
    }
}

fn synthesized_filename(file_id: &str, mime: &str) -> String {
    match content::extension_for_mime(mime) {
        Some(ext) => format!("{file_id}.{ext}"),
        None => file_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docbridge_provider::{OperationOutcome, ReplayProvider};
    use docbridge_shared::{ConnectionId, ConnectionStatus, ContentType};
    use serde_json::json;

    fn connection_for(provider: &str) -> Connection {
        Connection {
            id: ConnectionId::new(),
            provider_name: provider.to_string(),
            workspace_id: "ws-1".into(),
            display_name: None,
            status: ConnectionStatus::Active,
            credentials: Some(json!({"token": "secret"})),
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    fn binary_capability(
        list: Option<&str>,
        download: Option<&str>,
        search: Option<&str>,
    ) -> DocumentCapability {
        DocumentCapability {
            supports_browsing: list.is_some(),
            supports_search: search.is_some(),
            content_type: ContentType::Binary,
            list_operation: list.map(str::to_string),
            download_operation: download.map(str::to_string),
            search_operation: search.map(str::to_string),
            get_content_operation: None,
        }
    }

    fn drive_adapter(provider: Arc<ReplayProvider>) -> BinaryFileAdapter {
        BinaryFileAdapter::new(
            provider,
            binary_capability(Some("listFiles"), Some("downloadFile"), None),
            ProviderProfile::default(),
        )
    }

    #[tokio::test]
    async fn browse_normalizes_file_store_listing() {
        let provider = Arc::new(
            ReplayProvider::new("drive-x", "Drive X").with_operations(&[
                "listFiles",
                "downloadFile",
                "getFile",
            ]),
        );
        provider.enqueue_data(
            "listFiles",
            json!({
                "files": [{"id": "1", "name": "a.pdf", "mimeType": "application/pdf"}],
                "nextPageToken": null
            }),
        );

        let adapter = drive_adapter(provider.clone());
        let connection = connection_for("drive-x");

        let result = adapter
            .browse(&connection, &BrowseOptions::in_folder("root"))
            .await
            .expect("browse");

        assert_eq!(result.files.len(), 1);
        let file = &result.files[0];
        assert_eq!(file.id, "1");
        assert_eq!(file.name, "a.pdf");
        assert!(file.downloadable);
        assert!(!file.is_folder);
        assert!(result.next_page_token.is_none());

        // Unknown provider falls back to the plain folderId query.
        let call = &provider.calls()[0];
        assert_eq!(call.operation_id, "listFiles");
        assert_eq!(call.params["folderId"], "root");
    }

    #[tokio::test]
    async fn relational_style_builds_parent_query() {
        let provider =
            Arc::new(ReplayProvider::new("relstore", "Rel Store").with_operations(&["listFiles"]));
        provider.enqueue_data("listFiles", json!({"files": []}));

        let adapter = BinaryFileAdapter::new(
            provider.clone(),
            binary_capability(Some("listFiles"), None, None),
            ProviderProfile {
                query_style: QueryStyle::Relational,
                page_filter: false,
            },
        );

        adapter
            .browse(
                &connection_for("relstore"),
                &BrowseOptions::in_folder("abc123"),
            )
            .await
            .expect("browse");

        let call = &provider.calls()[0];
        assert_eq!(call.params["q"], "'abc123' in parents and trashed = false");
        assert!(call.params.get("pageSize").is_some());
    }

    #[tokio::test]
    async fn path_style_normalizes_entries_shape() {
        let provider =
            Arc::new(ReplayProvider::new("boxlike", "Box Like").with_operations(&["listItems"]));
        provider.enqueue_data(
            "listItems",
            json!({
                "entries": [
                    {".tag": "folder", "name": "Docs", "path_lower": "/docs", "path_display": "/Docs"},
                    {".tag": "file", "name": "spec.docx", "path_lower": "/docs/spec.docx",
                     "size": "12345", "server_modified": "2024-01-15T10:00:00Z"}
                ],
                "cursor": "cur-2"
            }),
        );

        let adapter = BinaryFileAdapter::new(
            provider.clone(),
            binary_capability(Some("listItems"), None, None),
            ProviderProfile {
                query_style: QueryStyle::Path,
                page_filter: false,
            },
        );

        let result = adapter
            .browse(&connection_for("boxlike"), &BrowseOptions::default())
            .await
            .expect("browse");

        // Root browse addresses the empty path.
        let call = &provider.calls()[0];
        assert_eq!(call.params["path"], "");
        assert!(call.params.get("limit").is_some());

        let folder = &result.files[0];
        assert!(folder.is_folder);
        assert!(!folder.downloadable);
        assert_eq!(folder.id, "/docs");
        assert_eq!(folder.path.as_deref(), Some("/Docs"));

        // MIME inferred from the filename the provider left untyped.
        let file = &result.files[1];
        assert!(!file.is_folder);
        assert!(file.downloadable);
        assert_eq!(file.size, Some(12345));
        assert!(file.modified_time.is_some());

        assert_eq!(result.next_page_token.as_deref(), Some("cur-2"));
    }

    #[test]
    fn raw_items_accepts_known_shapes() {
        assert_eq!(raw_items(&json!([{"id": "1"}])).len(), 1);
        assert_eq!(raw_items(&json!({"files": [{}, {}]})).len(), 2);
        assert_eq!(raw_items(&json!({"entries": [{}]})).len(), 1);
        assert_eq!(raw_items(&json!({"items": [{}]})).len(), 1);
        assert!(raw_items(&json!({"unrelated": [{}]})).is_empty());
    }

    #[tokio::test]
    async fn browse_without_list_operation_is_not_supported() {
        let provider = Arc::new(ReplayProvider::new("drive-x", "Drive X"));
        let adapter = BinaryFileAdapter::new(
            provider,
            binary_capability(None, Some("downloadFile"), None),
            ProviderProfile::default(),
        );

        let err = adapter
            .browse(&connection_for("drive-x"), &BrowseOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DocBridgeError::NotSupported { .. }));
    }

    #[tokio::test]
    async fn provider_failure_surfaces_its_message() {
        let provider =
            Arc::new(ReplayProvider::new("drive-x", "Drive X").with_operations(&["listFiles"]));
        provider.enqueue("listFiles", OperationOutcome::failure("rate limited"));

        let adapter = drive_adapter(provider);
        let err = adapter
            .browse(&connection_for("drive-x"), &BrowseOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DocBridgeError::Operation { .. }));
        assert!(err.to_string().contains("rate limited"));
    }

    #[tokio::test]
    async fn download_decodes_base64_payload() {
        let provider = Arc::new(
            ReplayProvider::new("drive-x", "Drive X")
                .with_operations(&["listFiles", "downloadFile"]),
        );
        provider.enqueue_data(
            "downloadFile",
            json!({
                "content": "aGVsbG8gd29ybGQ=",
                "filename": "hello.txt",
                "contentType": "text/plain"
            }),
        );

        let adapter = drive_adapter(provider);
        let result = adapter
            .download(&connection_for("drive-x"), "f1", None)
            .await
            .expect("download");

        assert_eq!(result.buffer, b"hello world");
        assert_eq!(result.size, 11);
        assert_eq!(result.filename, "hello.txt");
        assert_eq!(result.content_type, "text/plain");
        assert_eq!(
            result.content_hash,
            Some(content::content_hash(b"hello world"))
        );
    }

    #[tokio::test]
    async fn invalid_base64_is_a_decode_error() {
        let provider = Arc::new(
            ReplayProvider::new("drive-x", "Drive X")
                .with_operations(&["listFiles", "downloadFile"]),
        );
        provider.enqueue_data("downloadFile", json!({"content": "@@not-base64@@"}));

        let adapter = drive_adapter(provider);
        let err = adapter
            .download(&connection_for("drive-x"), "f1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DocBridgeError::Decode { .. }));
    }

    #[tokio::test]
    async fn native_document_routes_through_export() {
        let provider = Arc::new(ReplayProvider::new("drive-x", "Drive X").with_operations(&[
            "listFiles",
            "downloadFile",
            "exportFile",
        ]));
        provider.enqueue_data("exportFile", json!({"content": "aGVsbG8gd29ybGQ="}));

        let adapter = drive_adapter(provider.clone());
        let result = adapter
            .download(
                &connection_for("drive-x"),
                "doc-9",
                Some("application/vnd.google-apps.document"),
            )
            .await
            .expect("export");

        assert_eq!(provider.calls_for("exportFile"), 1);
        assert_eq!(provider.calls_for("downloadFile"), 0);
        let call = &provider.calls()[0];
        assert_eq!(call.params["mimeType"], "application/pdf");

        assert_eq!(result.content_type, "application/pdf");
        assert_eq!(result.filename, "doc-9.pdf");
    }

    #[tokio::test]
    async fn unknown_native_type_is_an_error() {
        let provider = Arc::new(
            ReplayProvider::new("drive-x", "Drive X")
                .with_operations(&["listFiles", "downloadFile", "exportFile"]),
        );
        let adapter = drive_adapter(provider);

        let err = adapter
            .download(
                &connection_for("drive-x"),
                "form-1",
                Some("application/vnd.google-apps.form"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DocBridgeError::Operation { .. }));
    }

    #[tokio::test]
    async fn breadcrumb_walk_prepends_synthetic_root() {
        let provider = Arc::new(
            ReplayProvider::new("drive-x", "Drive X").with_operations(&["listFiles", "getFile"]),
        );
        provider.enqueue_data(
            "getFile",
            json!({"id": "f3", "name": "Reports", "parents": ["f2"]}),
        );
        provider.enqueue_data(
            "getFile",
            json!({"id": "f2", "name": "Finance", "parents": ["root"]}),
        );

        let adapter = drive_adapter(provider);
        let crumbs = adapter
            .build_breadcrumbs(&connection_for("drive-x"), "f3")
            .await;

        assert!(!crumbs.truncated);
        let names: Vec<&str> = crumbs.trail.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Drive X", "Finance", "Reports"]);
        assert_eq!(crumbs.trail[0].id, ROOT_FOLDER_ID);
    }

    #[tokio::test]
    async fn breadcrumb_cycle_hits_depth_cap() {
        let provider = Arc::new(
            ReplayProvider::new("drive-x", "Drive X").with_operations(&["listFiles", "getFile"]),
        );
        for _ in 0..MAX_BREADCRUMB_DEPTH {
            provider.enqueue_data("getFile", json!({"name": "Loop", "parentId": "loop"}));
        }

        let adapter = drive_adapter(provider);
        let crumbs = adapter
            .build_breadcrumbs(&connection_for("drive-x"), "loop")
            .await;

        assert!(crumbs.truncated);
        assert_eq!(crumbs.trail.len(), MAX_BREADCRUMB_DEPTH + 1);
        assert_eq!(crumbs.trail[0].id, ROOT_FOLDER_ID);
    }

    #[tokio::test]
    async fn breadcrumb_lookup_failure_keeps_partial_trail() {
        let provider = Arc::new(
            ReplayProvider::new("drive-x", "Drive X").with_operations(&["listFiles", "getFile"]),
        );
        // One good hop; the next lookup has no scripted response and fails.
        provider.enqueue_data("getFile", json!({"name": "Child", "parentId": "p1"}));

        let adapter = drive_adapter(provider);
        let crumbs = adapter
            .build_breadcrumbs(&connection_for("drive-x"), "c1")
            .await;

        assert!(!crumbs.truncated);
        let names: Vec<&str> = crumbs.trail.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Drive X", "Child"]);
    }

    #[tokio::test]
    async fn root_breadcrumbs_need_no_lookup() {
        let provider = Arc::new(
            ReplayProvider::new("drive-x", "Drive X").with_operations(&["listFiles", "getFile"]),
        );
        let adapter = drive_adapter(provider.clone());

        let crumbs = adapter
            .build_breadcrumbs(&connection_for("drive-x"), ROOT_FOLDER_ID)
            .await;

        assert_eq!(crumbs.trail.len(), 1);
        assert_eq!(crumbs.trail[0].name, "Drive X");
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn get_file_info_uses_metadata_operation() {
        let provider = Arc::new(
            ReplayProvider::new("drive-x", "Drive X").with_operations(&["listFiles", "getFile"]),
        );
        provider.enqueue_data(
            "getFile",
            json!({"id": "f1", "name": "a.pdf", "mimeType": "application/pdf", "size": 100}),
        );

        let adapter = drive_adapter(provider.clone());
        let info = adapter
            .get_file_info(&connection_for("drive-x"), "f1")
            .await
            .expect("lookup")
            .expect("file");

        assert_eq!(provider.calls_for("getFile"), 1);
        assert_eq!(info.name, "a.pdf");
        assert!(info.downloadable);
        assert!(info.metadata.is_some());
    }

    #[tokio::test]
    async fn get_file_info_without_lookup_operation_is_none() {
        let provider =
            Arc::new(ReplayProvider::new("drive-x", "Drive X").with_operations(&["listFiles"]));
        let adapter = drive_adapter(provider.clone());

        let info = adapter
            .get_file_info(&connection_for("drive-x"), "f1")
            .await
            .expect("lookup");
        assert!(info.is_none());
        assert!(provider.calls().is_empty());
    }
}
