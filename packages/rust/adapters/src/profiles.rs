//! Per-provider variance tables.
//!
//! Everything that differs between providers of the same content category
//! (how a folder query is keyed, whether search results need a page-type
//! filter) lives in a [`ProviderProfile`] resolved once at adapter
//! construction, so the adapter bodies never branch on provider name.

use docbridge_shared::{AppConfig, QueryStyle};

/// Query and filter knobs for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderProfile {
    /// How the list operation addresses a folder's children.
    pub query_style: QueryStyle,
    /// Whether search requests attach a filter restricting results to pages.
    pub page_filter: bool,
}

impl Default for ProviderProfile {
    fn default() -> Self {
        Self {
            query_style: QueryStyle::FolderParam,
            page_filter: false,
        }
    }
}

/// Built-in profiles for the reference providers. Unknown providers fall
/// back to the plain `folderId` style with no page filter.
const BUILTIN_PROFILES: &[(&str, ProviderProfile)] = &[
    (
        "google-drive",
        ProviderProfile {
            query_style: QueryStyle::Relational,
            page_filter: false,
        },
    ),
    (
        "dropbox",
        ProviderProfile {
            query_style: QueryStyle::Path,
            page_filter: false,
        },
    ),
    (
        "notion",
        ProviderProfile {
            query_style: QueryStyle::FolderParam,
            page_filter: true,
        },
    ),
];

impl ProviderProfile {
    /// Profile for `provider_name` from the built-in table alone.
    pub fn builtin(provider_name: &str) -> Self {
        let name = provider_name.to_lowercase();
        BUILTIN_PROFILES
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, profile)| *profile)
            .unwrap_or_default()
    }

    /// Built-in profile with configuration overrides applied on top.
    pub fn resolve(provider_name: &str, config: &AppConfig) -> Self {
        let mut profile = Self::builtin(provider_name);
        if let Some(overrides) = config.providers.get(&provider_name.to_lowercase()) {
            if let Some(style) = overrides.query_style {
                profile.query_style = style;
            }
            if let Some(page_filter) = overrides.page_filter {
                profile.page_filter = page_filter;
            }
        }
        profile
    }
}
