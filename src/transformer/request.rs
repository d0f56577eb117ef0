//! Outgoing update-check body filtering.

use super::strip_asset_entries;
use crate::classify::AssetType;
use crate::transport::RequestBody;
use serde_json::Value;
use std::collections::BTreeMap;

/// Remove non-API identifiers from an outgoing update-check body.
///
/// The upstream update-check endpoints accept the asset payload as a JSON
/// object keyed by the asset type (`plugins` or `themes`), either as the
/// whole request body or as a form field of that name. Returns the number of
/// entries removed; malformed payloads are left untouched.
pub fn strip_non_api_entries(
    body: &mut RequestBody,
    asset_type: AssetType,
    non_api: &BTreeMap<String, String>,
) -> usize {
    let Some(asset_key) = asset_type.body_key() else {
        return 0;
    };
    if non_api.is_empty() {
        return 0;
    }

    match body {
        RequestBody::Empty => 0,
        RequestBody::Raw(bytes) => {
            let Ok(mut json) = serde_json::from_slice::<Value>(bytes) else {
                return 0;
            };
            let removed = strip_asset_entries(&mut json, asset_key, non_api);
            if removed > 0 {
                if let Ok(serialized) = serde_json::to_vec(&json) {
                    *bytes = serialized;
                }
            }
            removed
        }
        RequestBody::Form(fields) => {
            let Some(field) = fields.get_mut(asset_key) else {
                return 0;
            };
            let Ok(mut json) = serde_json::from_str::<Value>(field) else {
                return 0;
            };
            let removed = strip_asset_entries(&mut json, asset_key, non_api);
            if removed > 0 {
                if let Ok(serialized) = serde_json::to_string(&json) {
                    *field = serialized;
                }
            }
            removed
        }
    }
}
