//! Shared types, error model, and configuration for DocBridge.
//!
//! This crate is the foundation depended on by all other DocBridge crates.
//! It provides:
//! - [`DocBridgeError`] — the unified error type
//! - Domain types ([`DocumentCapability`], [`IntegrationFile`],
//!   [`IntegrationBrowseResult`], [`IntegrationDownloadResult`],
//!   [`Connection`])
//! - Configuration ([`AppConfig`], provider overrides, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, ProviderOverride, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{DocBridgeError, Result};
pub use types::{
    Breadcrumb, Breadcrumbs, BrowseOptions, Connection, ConnectionId, ConnectionStatus,
    ContentType, DocumentCapability, IntegrationBrowseResult, IntegrationDownloadResult,
    IntegrationFile, QueryStyle, ROOT_FOLDER_ID,
};
