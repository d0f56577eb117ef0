//! Enumeration of locally installed assets and their update sources.

use crate::classify::AssetType;
use std::collections::BTreeMap;

/// Metadata the registry knows about one installed plugin or theme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetInfo {
    /// Contents of the asset's Update-URI metadata header, if any.
    pub update_uri: Option<String>,
}

impl AssetInfo {
    /// Whether the asset declares its own update source and must be kept out
    /// of proxied update traffic.
    pub fn has_custom_source(&self) -> bool {
        self.update_uri.as_deref().is_some_and(|uri| !uri.is_empty())
    }
}

/// Enumerates installed plugins and themes.
///
/// Implementations must reflect the installation state at call time; the
/// interceptor re-queries on every interception and never caches the result.
pub trait AssetRegistry: Send + Sync {
    /// Installed plugins keyed by plugin file path (e.g. `dir/plugin.php`).
    fn plugins(&self) -> BTreeMap<String, AssetInfo>;

    /// Installed themes keyed by theme slug.
    fn themes(&self) -> BTreeMap<String, AssetInfo>;
}

/// Assets of the given type that manage their own updates, keyed by
/// identifier; the value carries the declared source for diagnostics.
pub fn non_api_assets(
    registry: &dyn AssetRegistry,
    asset_type: AssetType,
) -> BTreeMap<String, String> {
    let assets = match asset_type {
        AssetType::Plugin => registry.plugins(),
        AssetType::Theme => registry.themes(),
        AssetType::None => return BTreeMap::new(),
    };

    assets
        .into_iter()
        .filter_map(|(id, info)| match info.update_uri {
            Some(uri) if !uri.is_empty() => Some((id, uri)),
            _ => None,
        })
        .collect()
}

/// Fixed registry snapshot, for tests and the dry-run binary.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    plugins: BTreeMap<String, AssetInfo>,
    themes: BTreeMap<String, AssetInfo>,
}

impl StaticRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plugin, optionally with a custom update source.
    pub fn with_plugin(mut self, file: &str, update_uri: Option<&str>) -> Self {
        self.plugins.insert(
            file.to_string(),
            AssetInfo {
                update_uri: update_uri.map(str::to_string),
            },
        );
        self
    }

    /// Add a theme, optionally with a custom update source.
    pub fn with_theme(mut self, slug: &str, update_uri: Option<&str>) -> Self {
        self.themes.insert(
            slug.to_string(),
            AssetInfo {
                update_uri: update_uri.map(str::to_string),
            },
        );
        self
    }
}

impl AssetRegistry for StaticRegistry {
    fn plugins(&self) -> BTreeMap<String, AssetInfo> {
        self.plugins.clone()
    }

    fn themes(&self) -> BTreeMap<String, AssetInfo> {
        self.themes.clone()
    }
}
