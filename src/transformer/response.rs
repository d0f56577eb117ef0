//! Response body filtering for rerouted API calls.

use super::strip_asset_entries;
use crate::classify::{AssetType, RequestType};
use crate::transport::HttpResponse;
use serde_json::Value;
use std::collections::BTreeMap;

/// What the response filter removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Non-API entries removed from an update-check response
    pub non_api_removed: usize,
    /// Self-referential entries removed from an info listing
    pub self_removed: usize,
}

impl FilterOutcome {
    /// Whether anything was removed at all.
    pub fn changed(&self) -> bool {
        self.non_api_removed > 0 || self.self_removed > 0
    }
}

/// Post-process a successful rerouted response.
///
/// Best-effort: malformed bodies and absent sub-keys pass through
/// unmodified, never as an error.
pub fn filter_response(
    response: &mut HttpResponse,
    url: &str,
    request_type: RequestType,
    asset_type: AssetType,
    non_api: &BTreeMap<String, String>,
    own_slug: &str,
) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();
    let Some(asset_key) = asset_type.body_key() else {
        return outcome;
    };
    let Ok(mut json) = serde_json::from_slice::<Value>(&response.body) else {
        return outcome;
    };

    match request_type {
        RequestType::Update => {
            outcome.non_api_removed = strip_asset_entries(&mut json, asset_key, non_api);
        }
        RequestType::Info => {
            // Single-slug lookups carry a `slug` parameter; only listing
            // calls can resurface this component as a marketplace plugin.
            if asset_type == AssetType::Plugin && !url.to_ascii_lowercase().contains("slug") {
                outcome.self_removed = strip_self_entries(&mut json, own_slug);
            }
        }
        RequestType::Other => {}
    }

    if outcome.changed() {
        if let Ok(serialized) = serde_json::to_vec(&json) {
            response.body = serialized;
        }
    }
    outcome
}

/// Remove every entry of the `plugins` collection whose slug matches
/// `own_slug`, case-insensitively. Duplicated entries are all removed.
fn strip_self_entries(json: &mut Value, own_slug: &str) -> usize {
    let Some(Value::Array(entries)) = json.get_mut("plugins") else {
        return 0;
    };
    let before = entries.len();
    entries.retain(|entry| {
        !entry
            .get("slug")
            .and_then(Value::as_str)
            .is_some_and(|slug| slug.eq_ignore_ascii_case(own_slug))
    });
    before - entries.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const UPDATE_URL: &str = "https://my.api.org/plugins/update-check/1.1/";
    const INFO_URL: &str = "https://my.api.org/plugins/info/1.2/";

    fn non_api() -> BTreeMap<String, String> {
        BTreeMap::from([("b/b.php".to_string(), "https://example.com/b".to_string())])
    }

    fn response_with(body: Value) -> HttpResponse {
        HttpResponse::with_body(200, serde_json::to_vec(&body).unwrap())
    }

    #[test]
    fn test_update_response_filtered() {
        let mut response = response_with(json!({
            "plugins": {"a/a.php": {"new_version": "2.0"}, "b/b.php": {"new_version": "3.0"}}
        }));

        let outcome = filter_response(
            &mut response,
            UPDATE_URL,
            RequestType::Update,
            AssetType::Plugin,
            &non_api(),
            "wp-api-rewrite",
        );

        assert_eq!(outcome.non_api_removed, 1);
        let parsed: Value = serde_json::from_slice(&response.body).unwrap();
        assert!(parsed["plugins"].get("a/a.php").is_some());
        assert!(parsed["plugins"].get("b/b.php").is_none());
    }

    #[test]
    fn test_info_listing_removes_self_including_duplicates() {
        let mut response = response_with(json!({
            "plugins": [
                {"slug": "some-plugin"},
                {"slug": "WP-API-Rewrite"},
                {"slug": "another"},
                {"slug": "wp-api-rewrite"}
            ]
        }));

        let outcome = filter_response(
            &mut response,
            INFO_URL,
            RequestType::Info,
            AssetType::Plugin,
            &BTreeMap::new(),
            "wp-api-rewrite",
        );

        assert_eq!(outcome.self_removed, 2);
        let parsed: Value = serde_json::from_slice(&response.body).unwrap();
        let slugs: Vec<&str> = parsed["plugins"]
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["slug"].as_str().unwrap())
            .collect();
        assert_eq!(slugs, vec!["some-plugin", "another"]);
    }

    #[test]
    fn test_info_single_slug_lookup_untouched() {
        let url = "https://my.api.org/plugins/info/1.2/?action=plugin_information&slug=wp-api-rewrite";
        let mut response = response_with(json!({"plugins": [{"slug": "wp-api-rewrite"}]}));

        let outcome = filter_response(
            &mut response,
            url,
            RequestType::Info,
            AssetType::Plugin,
            &BTreeMap::new(),
            "wp-api-rewrite",
        );

        assert_eq!(outcome, FilterOutcome::default());
    }

    #[test]
    fn test_info_theme_listing_untouched() {
        let body = json!({"plugins": [{"slug": "wp-api-rewrite"}]});
        let mut response = response_with(body.clone());

        let outcome = filter_response(
            &mut response,
            "https://my.api.org/themes/info/1.2/",
            RequestType::Info,
            AssetType::Theme,
            &BTreeMap::new(),
            "wp-api-rewrite",
        );

        assert_eq!(outcome, FilterOutcome::default());
        let parsed: Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(parsed, body);
    }

    #[test]
    fn test_malformed_body_passes_through() {
        let mut response = HttpResponse::with_body(200, b"<html>not json</html>".to_vec());
        let original = response.clone();

        let outcome = filter_response(
            &mut response,
            UPDATE_URL,
            RequestType::Update,
            AssetType::Plugin,
            &non_api(),
            "wp-api-rewrite",
        );

        assert_eq!(outcome, FilterOutcome::default());
        assert_eq!(response, original);
    }

    #[test]
    fn test_missing_sub_key_passes_through() {
        let body = json!({"translations": []});
        let mut response = response_with(body.clone());

        let outcome = filter_response(
            &mut response,
            UPDATE_URL,
            RequestType::Update,
            AssetType::Plugin,
            &non_api(),
            "wp-api-rewrite",
        );

        assert_eq!(outcome, FilterOutcome::default());
        let parsed: Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(parsed, body);
    }

    #[test]
    fn test_none_asset_type_untouched() {
        let mut response = response_with(json!({"offers": []}));
        let original = response.clone();

        let outcome = filter_response(
            &mut response,
            "https://my.api.org/core/version-check/1.7/",
            RequestType::Other,
            AssetType::None,
            &BTreeMap::new(),
            "wp-api-rewrite",
        );

        assert_eq!(outcome, FilterOutcome::default());
        assert_eq!(response, original);
    }
}
