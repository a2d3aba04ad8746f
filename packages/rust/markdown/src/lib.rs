//! Block-tree to Markdown conversion for structured providers.
//!
//! Page-store providers return a page record plus an ordered list of content
//! blocks (paragraphs, headings, lists, code, ...) with rich-text runs inside.
//! This crate flattens that model into plain markdown: an H1 title, a YAML
//! frontmatter block with the page's identity, then one fragment per block.
//! Conversion is deliberately infallible; anything unrecognized degrades to
//! salvaged text or is skipped.

mod blocks;

use serde_json::Value;
use tracing::debug;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Result of rendering one page to Markdown.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// The final Markdown content (with frontmatter).
    pub markdown: String,
    /// Extracted page title, `Untitled` when the page carries none.
    pub title: String,
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Render a page record and its block list to Markdown.
///
/// Layout: `# <title>`, then frontmatter with id/url/created/modified, then
/// one fragment per block joined by blank lines. When the block list is empty
/// (none retrievable), the page's property bag is rendered as a
/// `- **Key:** value` list instead so the document is never bodyless for a
/// page that has metadata.
pub fn render_page(page: &Value, block_list: &[Value]) -> RenderedPage {
    let raw_title = extract_title(page);
    let title = if raw_title.is_empty() {
        "Untitled".to_string()
    } else {
        raw_title
    };

    let frontmatter = build_frontmatter(page);

    let fragments: Vec<String> = if block_list.is_empty() {
        blocks::render_properties(page.get("properties"))
    } else {
        block_list
            .iter()
            .filter_map(blocks::block_to_markdown)
            .filter(|fragment| !fragment.is_empty())
            .collect()
    };

    debug!(
        title = %title,
        blocks = block_list.len(),
        fragments = fragments.len(),
        "page rendered"
    );

    let body = fragments.join("\n\n");
    let markdown = if body.is_empty() {
        format!("# {title}\n\n{frontmatter}")
    } else {
        format!("# {title}\n\n{frontmatter}\n{body}\n")
    };

    RenderedPage { markdown, title }
}

/// Extract a page title, trying in order: a title-typed property under a
/// common key, a direct string `title`, an array-of-rich-text `title`, a
/// string `name`. Returns empty when nothing matches.
pub fn extract_title(page: &Value) -> String {
    if let Some(props) = page.get("properties").and_then(Value::as_object) {
        for key in ["title", "Title", "Name", "name"] {
            let Some(prop) = props.get(key) else { continue };
            if prop.get("type").and_then(Value::as_str) != Some("title") {
                continue;
            }
            if let Some(first) = prop
                .get("title")
                .and_then(Value::as_array)
                .and_then(|runs| runs.first())
            {
                if let Some(text) = blocks::run_plain_text(first) {
                    return text.to_string();
                }
            }
        }
    }

    if let Some(title) = page.get("title").and_then(Value::as_str) {
        return title.to_string();
    }

    if let Some(runs) = page.get("title").and_then(Value::as_array) {
        let joined: String = runs
            .iter()
            .filter_map(blocks::run_plain_text)
            .collect::<Vec<_>>()
            .concat();
        if !joined.is_empty() {
            return joined;
        }
    }

    if let Some(name) = page.get("name").and_then(Value::as_str) {
        return name.to_string();
    }

    String::new()
}

/// Turn a page title into a safe kebab-case file stem.
pub fn sanitize_filename(title: &str) -> String {
    let mut stem = String::new();
    let mut last_dash = true;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            stem.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            stem.push('-');
            last_dash = true;
        }
    }

    let stem = stem.trim_matches('-').to_string();
    if stem.is_empty() { "untitled".into() } else { stem }
}

// ---------------------------------------------------------------------------
// Frontmatter
// ---------------------------------------------------------------------------

/// Build the YAML frontmatter block from the page's identity fields.
/// Only fields actually present on the record are emitted.
fn build_frontmatter(page: &Value) -> String {
    let mut fm = String::from("---\n");
    if let Some(id) = page.get("id").and_then(Value::as_str) {
        fm.push_str(&format!("id: {id}\n"));
    }
    if let Some(url) = page.get("url").and_then(Value::as_str) {
        fm.push_str(&format!("url: \"{}\"\n", escape_yaml_string(url)));
    }
    if let Some(created) = page.get("created_time").and_then(Value::as_str) {
        fm.push_str(&format!("created: {created}\n"));
    }
    if let Some(modified) = page.get("last_edited_time").and_then(Value::as_str) {
        fm.push_str(&format!("modified: {modified}\n"));
    }
    fm.push_str("---\n");
    fm
}

/// Escape special characters in a YAML string value.
fn escape_yaml_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
