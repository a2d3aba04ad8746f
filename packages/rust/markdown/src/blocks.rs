//! Block-type dispatch and rich-text run rendering.

use serde_json::Value;
use tracing::debug;

/// Render one block to a markdown fragment.
///
/// Returns `None` for blocks that produce nothing (unknown types without any
/// salvageable text, images without a URL). Content lives under the key named
/// by the block's `type` field.
pub(crate) fn block_to_markdown(block: &Value) -> Option<String> {
    let block_type = block.get("type").and_then(Value::as_str)?;
    let content = block.get(block_type).unwrap_or(&Value::Null);
    let text = render_rich_text(content.get("rich_text"));

    let fragment = match block_type {
        "paragraph" => text,
        "heading_1" => format!("# {text}"),
        "heading_2" => format!("## {text}"),
        "heading_3" => format!("### {text}"),
        "bulleted_list_item" => format!("- {text}"),
        "numbered_list_item" => format!("1. {text}"),
        "to_do" => {
            let checked = content
                .get("checked")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let mark = if checked { "x" } else { " " };
            format!("- [{mark}] {text}")
        }
        "toggle" => format!("<details>\n<summary>{text}</summary>\n</details>"),
        "code" => {
            let language = content
                .get("language")
                .and_then(Value::as_str)
                .unwrap_or("");
            format!("```{language}\n{text}\n```")
        }
        "quote" => format!("> {text}"),
        "divider" => "---".to_string(),
        "callout" => {
            let icon = content
                .get("icon")
                .and_then(|icon| icon.get("emoji"))
                .and_then(Value::as_str)
                .unwrap_or("💡");
            format!("> {icon} {text}")
        }
        "image" => {
            let url = file_or_external_url(content)?;
            let caption = render_rich_text(content.get("caption"));
            format!("![{caption}]({url})")
        }
        "bookmark" => {
            let url = content.get("url").and_then(Value::as_str)?;
            let caption = render_rich_text(content.get("caption"));
            let label = if caption.is_empty() { url } else { &caption };
            format!("[{label}]({url})")
        }
        "link_preview" => {
            let url = content.get("url").and_then(Value::as_str)?;
            format!("[{url}]({url})")
        }
        "table_of_contents" => "[TOC]".to_string(),
        other => {
            // Unknown block: salvage any embedded rich text before giving up.
            if text.is_empty() {
                debug!(block_type = other, "skipping unsupported block type");
                return None;
            }
            text
        }
    };

    Some(fragment)
}

/// URL of an uploaded (`file`) or linked (`external`) asset.
fn file_or_external_url(content: &Value) -> Option<&str> {
    for source in ["file", "external"] {
        if let Some(url) = content
            .get(source)
            .and_then(|s| s.get("url"))
            .and_then(Value::as_str)
        {
            return Some(url);
        }
    }
    None
}

/// Concatenate rich-text runs with their annotations applied.
pub(crate) fn render_rich_text(runs: Option<&Value>) -> String {
    let Some(runs) = runs.and_then(Value::as_array) else {
        return String::new();
    };
    runs.iter().map(render_run).collect::<Vec<_>>().concat()
}

/// Bare text of a single run, without annotations.
pub(crate) fn run_plain_text(run: &Value) -> Option<&str> {
    run.get("plain_text")
        .and_then(Value::as_str)
        .or_else(|| {
            run.get("text")
                .and_then(|text| text.get("content"))
                .and_then(Value::as_str)
        })
}

/// Annotation wrap order is fixed: bold, italic, strikethrough, code.
/// A hyperlink wraps last, outermost.
fn render_run(run: &Value) -> String {
    let mut text = run_plain_text(run).unwrap_or("").to_string();
    if text.is_empty() {
        return text;
    }

    let annotations = run.get("annotations").cloned().unwrap_or(Value::Null);
    let flag = |key: &str| {
        annotations
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    };

    if flag("bold") {
        text = format!("**{text}**");
    }
    if flag("italic") {
        text = format!("_{text}_");
    }
    if flag("strikethrough") {
        text = format!("~~{text}~~");
    }
    if flag("code") {
        text = format!("`{text}`");
    }

    let href = run.get("href").and_then(Value::as_str).or_else(|| {
        run.get("text")
            .and_then(|t| t.get("link"))
            .and_then(|l| l.get("url"))
            .and_then(Value::as_str)
    });
    if let Some(href) = href {
        text = format!("[{text}]({href})");
    }

    text
}

/// Render a page's property bag as a `- **Key:** value` list.
///
/// Unknown property types are skipped, never an error; keys come out in
/// sorted order because the underlying map is ordered.
pub(crate) fn render_properties(properties: Option<&Value>) -> Vec<String> {
    let Some(props) = properties.and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    for (key, prop) in props {
        let Some(prop_type) = prop.get("type").and_then(Value::as_str) else {
            continue;
        };

        let value = match prop_type {
            "title" | "rich_text" => render_rich_text(prop.get(prop_type)),
            "number" => prop
                .get("number")
                .filter(|n| !n.is_null())
                .map(Value::to_string)
                .unwrap_or_default(),
            "select" => prop
                .get("select")
                .and_then(|s| s.get("name"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            "multi_select" => prop
                .get("multi_select")
                .and_then(Value::as_array)
                .map(|options| {
                    options
                        .iter()
                        .filter_map(|o| o.get("name").and_then(Value::as_str))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default(),
            "date" => {
                let date = prop.get("date");
                let start = date
                    .and_then(|d| d.get("start"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                match date.and_then(|d| d.get("end")).and_then(Value::as_str) {
                    Some(end) if !start.is_empty() => format!("{start} to {end}"),
                    _ => start.to_string(),
                }
            }
            "url" | "email" => prop
                .get(prop_type)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            "phone" | "phone_number" => prop
                .get(prop_type)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            "checkbox" => {
                let checked = prop
                    .get("checkbox")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if checked { "Yes" } else { "No" }.to_string()
            }
            other => {
                debug!(property = %key, property_type = other, "skipping property type");
                continue;
            }
        };

        if value.is_empty() {
            continue;
        }
        lines.push(format!("- **{key}:** {value}"));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rich(content: &str) -> Value {
        json!([{"plain_text": content}])
    }

    #[test]
    fn list_and_todo_blocks() {
        let bullet = json!({"type": "bulleted_list_item", "bulleted_list_item": {"rich_text": rich("first")}});
        assert_eq!(block_to_markdown(&bullet).as_deref(), Some("- first"));

        let numbered = json!({"type": "numbered_list_item", "numbered_list_item": {"rich_text": rich("second")}});
        assert_eq!(block_to_markdown(&numbered).as_deref(), Some("1. second"));

        let done = json!({"type": "to_do", "to_do": {"rich_text": rich("ship it"), "checked": true}});
        assert_eq!(block_to_markdown(&done).as_deref(), Some("- [x] ship it"));

        let open = json!({"type": "to_do", "to_do": {"rich_text": rich("later")}});
        assert_eq!(block_to_markdown(&open).as_deref(), Some("- [ ] later"));
    }

    #[test]
    fn toggle_renders_as_details() {
        let toggle = json!({"type": "toggle", "toggle": {"rich_text": rich("More info")}});
        assert_eq!(
            block_to_markdown(&toggle).as_deref(),
            Some("<details>\n<summary>More info</summary>\n</details>")
        );
    }

    #[test]
    fn code_block_keeps_language_tag() {
        let code = json!({
            "type": "code",
            "code": {"rich_text": rich("let x = 1;"), "language": "rust"}
        });
        assert_eq!(
            block_to_markdown(&code).as_deref(),
            Some("```rust\nlet x = 1;\n```")
        );
    }

    #[test]
    fn quote_divider_and_callout() {
        let quote = json!({"type": "quote", "quote": {"rich_text": rich("wise words")}});
        assert_eq!(block_to_markdown(&quote).as_deref(), Some("> wise words"));

        let divider = json!({"type": "divider", "divider": {}});
        assert_eq!(block_to_markdown(&divider).as_deref(), Some("---"));

        let callout = json!({
            "type": "callout",
            "callout": {"rich_text": rich("watch out"), "icon": {"emoji": "⚠️"}}
        });
        assert_eq!(block_to_markdown(&callout).as_deref(), Some("> ⚠️ watch out"));

        let default_icon = json!({"type": "callout", "callout": {"rich_text": rich("note")}});
        assert_eq!(block_to_markdown(&default_icon).as_deref(), Some("> 💡 note"));
    }

    #[test]
    fn image_prefers_stored_file_over_external() {
        let stored = json!({
            "type": "image",
            "image": {
                "file": {"url": "https://cdn.example/a.png"},
                "external": {"url": "https://elsewhere.example/b.png"},
                "caption": rich("diagram")
            }
        });
        assert_eq!(
            block_to_markdown(&stored).as_deref(),
            Some("![diagram](https://cdn.example/a.png)")
        );

        let external = json!({
            "type": "image",
            "image": {"external": {"url": "https://elsewhere.example/b.png"}}
        });
        assert_eq!(
            block_to_markdown(&external).as_deref(),
            Some("![](https://elsewhere.example/b.png)")
        );

        let missing = json!({"type": "image", "image": {}});
        assert_eq!(block_to_markdown(&missing), None);
    }

    #[test]
    fn bookmark_and_link_preview() {
        let labeled = json!({
            "type": "bookmark",
            "bookmark": {"url": "https://example.com", "caption": rich("Example")}
        });
        assert_eq!(
            block_to_markdown(&labeled).as_deref(),
            Some("[Example](https://example.com)")
        );

        let bare = json!({"type": "bookmark", "bookmark": {"url": "https://example.com"}});
        assert_eq!(
            block_to_markdown(&bare).as_deref(),
            Some("[https://example.com](https://example.com)")
        );

        let preview = json!({"type": "link_preview", "link_preview": {"url": "https://preview.example"}});
        assert_eq!(
            block_to_markdown(&preview).as_deref(),
            Some("[https://preview.example](https://preview.example)")
        );
    }

    #[test]
    fn table_of_contents_placeholder() {
        let toc = json!({"type": "table_of_contents", "table_of_contents": {}});
        assert_eq!(block_to_markdown(&toc).as_deref(), Some("[TOC]"));
    }

    #[test]
    fn unknown_block_salvages_rich_text() {
        let synced = json!({
            "type": "synced_block",
            "synced_block": {"rich_text": rich("shared content")}
        });
        assert_eq!(block_to_markdown(&synced).as_deref(), Some("shared content"));

        let opaque = json!({"type": "child_database", "child_database": {"title": "Tasks"}});
        assert_eq!(block_to_markdown(&opaque), None);
    }

    #[test]
    fn annotation_wrapping_order_is_stable() {
        let run = json!({
            "plain_text": "x",
            "annotations": {"bold": true, "italic": true, "strikethrough": true, "code": true},
            "href": "https://example.com"
        });
        let runs = json!([run]);
        assert_eq!(
            render_rich_text(Some(&runs)),
            "[`~~_**x**_~~`](https://example.com)"
        );
    }

    #[test]
    fn link_from_text_payload() {
        let runs = json!([{
            "text": {"content": "docs", "link": {"url": "https://docs.example"}}
        }]);
        assert_eq!(render_rich_text(Some(&runs)), "[docs](https://docs.example)");
    }

    #[test]
    fn properties_render_known_types_and_skip_unknown() {
        let properties = json!({
            "Assignee": {"type": "people", "people": []},
            "Due": {"type": "date", "date": {"start": "2024-03-01", "end": "2024-03-05"}},
            "Estimate": {"type": "number", "number": 3.5},
            "Contact": {"type": "email", "email": "team@example.com"},
            "Phone": {"type": "phone_number", "phone_number": "+1-555-0100"},
            "Tags": {"type": "multi_select", "multi_select": [{"name": "infra"}, {"name": "q3"}]},
            "Site": {"type": "url", "url": "https://example.com"},
            "Summary": {"type": "rich_text", "rich_text": [{"plain_text": "short note"}]}
        });

        let lines = render_properties(Some(&properties));
        assert_eq!(
            lines,
            vec![
                "- **Contact:** team@example.com",
                "- **Due:** 2024-03-01 to 2024-03-05",
                "- **Estimate:** 3.5",
                "- **Phone:** +1-555-0100",
                "- **Site:** https://example.com",
                "- **Summary:** short note",
                "- **Tags:** infra, q3",
            ]
        );
    }
}
