//! Application configuration for DocBridge.
//!
//! User config lives at `~/.docbridge/docbridge.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocBridgeError, Result};
use crate::types::{ContentType, QueryStyle};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docbridge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docbridge";

// ---------------------------------------------------------------------------
// Config structs (matching docbridge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Per-provider overrides, keyed by provider name.
    ///
    /// New providers are taught to the detector and adapters by adding a
    /// table entry here; no code change is involved.
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderOverride>,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Log output format: "pretty" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Page size hint sent with list/search operations.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            page_size: default_page_size(),
        }
    }
}

fn default_log_format() -> String {
    "pretty".into()
}
fn default_page_size() -> u32 {
    50
}

/// `[providers.<name>]` entry — overrides for one provider.
///
/// Unset fields fall through to the built-in tables and, past those, to
/// runtime inference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderOverride {
    /// Force the content category instead of allow-list/inference resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,

    /// Force the list-operation query style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_style: Option<QueryStyle>,

    /// Whether search calls attach the pages-only type filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_filter: Option<bool>,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docbridge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocBridgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docbridge/docbridge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocBridgeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DocBridgeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocBridgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocBridgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocBridgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
