//! URL classification for intercepted API calls.

use serde::Serialize;

/// Kind of API call, derived from the URL path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    /// Update-check call (`/update-check/`)
    Update,
    /// Info/details lookup (`/info/`)
    Info,
    /// Anything else
    Other,
}

/// Kind of asset an API call concerns, derived from the URL path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    /// Plugin endpoints (`/plugins/`)
    Plugin,
    /// Theme endpoints (`/themes/`)
    Theme,
    /// Neither
    None,
}

impl AssetType {
    /// Outer JSON key the upstream API uses for this asset type in request
    /// and response payloads.
    pub fn body_key(self) -> Option<&'static str> {
        match self {
            AssetType::Plugin => Some("plugins"),
            AssetType::Theme => Some("themes"),
            AssetType::None => None,
        }
    }
}

/// Classify a URL into a request type.
///
/// Case-insensitive substring match; `Update` wins over `Info` when both
/// markers appear.
pub fn request_type(url: &str) -> RequestType {
    let url = url.to_ascii_lowercase();
    if url.contains("/update-check/") {
        RequestType::Update
    } else if url.contains("/info/") {
        RequestType::Info
    } else {
        RequestType::Other
    }
}

/// Classify a URL into an asset type.
///
/// Case-insensitive substring match; `Plugin` wins over `Theme` when both
/// markers appear.
pub fn asset_type(url: &str) -> AssetType {
    let url = url.to_ascii_lowercase();
    if url.contains("/plugins/") {
        AssetType::Plugin
    } else if url.contains("/themes/") {
        AssetType::Theme
    } else {
        AssetType::None
    }
}
