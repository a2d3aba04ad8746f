//! Content utilities shared by both adapter strategies: the importable MIME
//! allow-list, filename/extension mapping, the content fingerprint, and
//! lenient parsing of provider-reported fields.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// MIME prefix of workspace-native editor documents. These have no raw byte
/// representation and must be exported to a concrete format.
pub const NATIVE_DOC_PREFIX: &str = "application/vnd.google-apps.";

/// Folder sentinel MIME type used by relational file stores.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Non-`text/*` MIME types the import pipeline accepts.
pub const IMPORTABLE_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
    "text/markdown",
    "text/html",
    "application/json",
    "text/csv",
    "application/vnd.google-apps.document",
    "application/vnd.google-apps.spreadsheet",
    "application/vnd.google-apps.presentation",
];

/// Extension table for synthesized filenames, also used in reverse to infer
/// a MIME type from a filename the provider left untyped.
const MIME_EXTENSIONS: &[(&str, &str)] = &[
    ("application/pdf", "pdf"),
    ("application/msword", "doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
    ("text/plain", "txt"),
    ("text/markdown", "md"),
    ("text/html", "html"),
    ("application/json", "json"),
    ("text/csv", "csv"),
];

/// Whether the import pipeline can ingest `mime`.
///
/// Any `text/*` type passes; everything else must be on the allow-list.
pub fn is_importable_mime(mime: &str) -> bool {
    mime.starts_with("text/") || IMPORTABLE_MIME_TYPES.contains(&mime)
}

/// Whether `mime` is a workspace-native editor type (folder sentinel
/// excluded), which must go through the export path instead of a raw
/// download.
pub fn is_native_doc(mime: &str) -> bool {
    mime.starts_with(NATIVE_DOC_PREFIX) && mime != FOLDER_MIME_TYPE
}

/// File extension for a known MIME type.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    MIME_EXTENSIONS
        .iter()
        .find(|(known, _)| *known == mime)
        .map(|(_, ext)| *ext)
}

/// MIME type inferred from a filename's extension.
pub fn mime_for_filename(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    MIME_EXTENSIONS
        .iter()
        .find(|(_, known)| known.eq_ignore_ascii_case(ext))
        .map(|(mime, _)| *mime)
}

/// FNV-1a 32-bit fingerprint of `data`, rendered as 8 hex digits.
///
/// A fast change-detection digest only, never a cryptographic guarantee.
pub fn content_hash(data: &[u8]) -> String {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in data {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    format!("{hash:08x}")
}

/// Parse an RFC 3339 timestamp field; `None` when absent or malformed.
pub fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let raw = value?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a size reported as either a JSON number or a numeric string.
pub fn parse_size(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
