//! Request and response body filtering for rerouted API calls.

mod request;
mod response;

pub use request::strip_non_api_entries;
pub use response::{filter_response, FilterOutcome};

use serde_json::Value;
use std::collections::BTreeMap;

/// Remove every entry under `asset_key` whose identifier appears in
/// `non_api`. Returns the number of entries removed; missing or non-object
/// sub-keys remove nothing.
pub(crate) fn strip_asset_entries(
    json: &mut Value,
    asset_key: &str,
    non_api: &BTreeMap<String, String>,
) -> usize {
    let Some(Value::Object(entries)) = json.get_mut(asset_key) else {
        return 0;
    };
    let before = entries.len();
    entries.retain(|id, _| !non_api.contains_key(id));
    before - entries.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_asset_entries() {
        let mut body = json!({
            "plugins": {"a/a.php": {}, "b/b.php": {}},
            "translations": []
        });
        let non_api = BTreeMap::from([("b/b.php".to_string(), "https://example.com".to_string())]);

        let removed = strip_asset_entries(&mut body, "plugins", &non_api);

        assert_eq!(removed, 1);
        assert!(body["plugins"].get("a/a.php").is_some());
        assert!(body["plugins"].get("b/b.php").is_none());
        assert!(body.get("translations").is_some());
    }

    #[test]
    fn test_strip_missing_key_is_noop() {
        let mut body = json!({"themes": {}});
        let non_api = BTreeMap::from([("x".to_string(), String::new())]);
        assert_eq!(strip_asset_entries(&mut body, "plugins", &non_api), 0);
    }

    #[test]
    fn test_strip_non_object_is_noop() {
        let mut body = json!({"plugins": ["a/a.php"]});
        let non_api = BTreeMap::from([("a/a.php".to_string(), String::new())]);
        assert_eq!(strip_asset_entries(&mut body, "plugins", &non_api), 0);
    }
}
