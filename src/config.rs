//! Configuration types for the rewrite engine.

use crate::diagnostics::LogCategory;
use serde::{Deserialize, Serialize};
use url::Url;

/// Upstream host whose outbound traffic is intercepted.
pub const DEFAULT_API_HOST: &str = "api.wordpress.org";

/// Target-host sentinel that enables diagnostics without rerouting.
pub const DEBUG_HOST: &str = "debug";

/// Main configuration for the rewrite engine.
///
/// Immutable for the lifetime of one interceptor instance; reconstruct the
/// interceptor when settings change instead of re-reading shared state per
/// call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Host whose calls are intercepted.
    pub default_host: String,
    /// Substitute API host, scheme included (e.g. `https://my.api.org`).
    /// The literal value `debug` keeps traffic on the default host.
    pub target_host: String,
    /// Bearer token attached to rerouted requests when non-empty.
    pub api_key: String,
    /// Force `sslverify = false` on rerouted requests.
    pub disable_ssl_verify: bool,
    /// This component's own slug, scrubbed from info listings.
    pub own_slug: String,
    /// Cooperation with other interceptors
    pub compat: CompatSettings,
    /// Diagnostic logging
    pub debug: DebugSettings,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            default_host: DEFAULT_API_HOST.to_string(),
            target_host: String::new(),
            api_key: String::new(),
            disable_ssl_verify: false,
            own_slug: "wp-api-rewrite".to_string(),
            compat: CompatSettings::default(),
            debug: DebugSettings::default(),
        }
    }
}

/// Compatibility settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatSettings {
    /// Leave a call alone when another interceptor already produced a
    /// response for it.
    pub skip_if_response_preset: bool,
}

/// Diagnostic logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    /// Master switch for the diagnostics channel.
    pub enabled: bool,
    /// Entry categories to record; empty records nothing.
    pub types: Vec<LogCategory>,
    /// Append a `cache_buster` query parameter to rerouted URLs.
    pub cache_buster: bool,
}

/// Configuration parse errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RewriteConfig {
    /// Parse from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether rewriting is configured at all. An empty default or target
    /// host disables interception entirely.
    pub fn is_active(&self) -> bool {
        !self.default_host.is_empty() && !self.target_host.is_empty()
    }

    /// Target host with the `debug` sentinel resolved onto the default host.
    pub fn effective_target(&self) -> String {
        if self.target_host == DEBUG_HOST {
            format!("https://{}", self.default_host)
        } else {
            self.target_host.clone()
        }
    }

    /// Parsed form of the effective target, if it is a well-formed absolute
    /// URL with a host component.
    pub fn target_url(&self) -> Option<Url> {
        let parsed = Url::parse(&self.effective_target()).ok()?;
        parsed.host_str()?;
        Some(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_inactive() {
        let config = RewriteConfig::default();
        assert_eq!(config.default_host, DEFAULT_API_HOST);
        assert!(!config.is_active());
        assert!(!config.compat.skip_if_response_preset);
        assert!(!config.debug.enabled);
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
target_host: "https://my.api.org"
api_key: "secret"
disable_ssl_verify: true
compat:
  skip_if_response_preset: true
debug:
  enabled: true
  types: [string, request]
"#;
        let config = RewriteConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.target_host, "https://my.api.org");
        assert_eq!(config.api_key, "secret");
        assert!(config.disable_ssl_verify);
        assert!(config.compat.skip_if_response_preset);
        assert!(config.debug.enabled);
        assert_eq!(
            config.debug.types,
            vec![LogCategory::String, LogCategory::Request]
        );
        assert!(config.is_active());
    }

    #[test]
    fn test_json_parsing() {
        let json = r#"{"target_host": "https://my.api.org", "debug": {"cache_buster": true}}"#;
        let config = RewriteConfig::from_json(json).unwrap();
        assert_eq!(config.target_host, "https://my.api.org");
        assert!(config.debug.cache_buster);
        assert_eq!(config.default_host, DEFAULT_API_HOST);
    }

    #[test]
    fn test_debug_sentinel_resolves_to_default_host() {
        let config = RewriteConfig {
            target_host: DEBUG_HOST.to_string(),
            ..RewriteConfig::default()
        };
        assert_eq!(config.effective_target(), "https://api.wordpress.org");
        let url = config.target_url().unwrap();
        assert_eq!(url.host_str(), Some("api.wordpress.org"));
    }

    #[test]
    fn test_target_url_rejects_malformed_hosts() {
        let mut config = RewriteConfig {
            target_host: "not-a-url".to_string(),
            ..RewriteConfig::default()
        };
        assert!(config.target_url().is_none());

        config.target_host = "https://".to_string();
        assert!(config.target_url().is_none());

        config.target_host = "https://my.api.org".to_string();
        assert!(config.target_url().is_some());
    }
}
