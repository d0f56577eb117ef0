//! The request interception and rewriting engine.

use crate::classify::{self, AssetType, RequestType};
use crate::config::RewriteConfig;
use crate::diagnostics::{Diagnostics, LogSink};
use crate::registry::{self, AssetRegistry};
use crate::transformer::{filter_response, strip_non_api_entries};
use crate::transport::{HttpResponse, HttpTransport, OutboundRequest};
use regex::Regex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};
use url::Url;

/// Paths ending in a `.php` file or a trailing slash are JSON API calls,
/// as opposed to static asset fetches.
static API_PATH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/[^/]+(\.php|/)$").unwrap());

/// Errors terminal for an intercepted call.
///
/// Neither is retried here; retry policy belongs to the caller.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    /// The configured target host is not a well-formed URL.
    #[error("invalid target host: {host}")]
    InvalidHost { host: String },

    /// The substitute request returned an unexpected status, or did not
    /// complete at all.
    #[error("rewritten request failed: {message}")]
    FailedRequest {
        status: Option<u16>,
        message: String,
    },
}

/// Outcome of one interception.
#[derive(Debug, PartialEq, Eq)]
pub enum Interception {
    /// The call is not ours. Hand back whatever result was already present
    /// and let the host perform the original request.
    PassThrough(Option<HttpResponse>),
    /// The substitute request completed; the host treats this as the
    /// response to its original call.
    Handled(HttpResponse),
}

/// Dry-run description of how a URL would be handled.
#[derive(Debug, Clone, Serialize)]
pub struct RewritePlan {
    /// Whether the call would be rerouted
    pub eligible: bool,
    /// Substitute URL, when eligible
    pub rewritten_url: Option<String>,
    /// Derived request type
    pub request_type: RequestType,
    /// Derived asset type
    pub asset_type: AssetType,
}

/// Intercepts outbound calls to the default API host and reroutes them to
/// the configured target.
///
/// One instance per effective configuration; reconstruct on configuration
/// change. The instance is single-owner apart from the in-flight dispatch
/// flag, which exists only to keep the substitute call from re-entering the
/// interceptor.
pub struct ApiRewrite {
    config: RewriteConfig,
    transport: Arc<dyn HttpTransport>,
    registry: Arc<dyn AssetRegistry>,
    diagnostics: Diagnostics,
    /// Set for the duration of the substitute dispatch; a nested
    /// interception observing the flag passes through untouched.
    dispatching: AtomicBool,
}

impl ApiRewrite {
    /// Create an interceptor over the given collaborators. Diagnostic
    /// entries go to `sink`, gated by the configuration's debug settings.
    pub fn new(
        mut config: RewriteConfig,
        transport: Arc<dyn HttpTransport>,
        registry: Arc<dyn AssetRegistry>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        config.target_host = config.target_host.trim().to_ascii_lowercase();
        config.default_host = config.default_host.trim().to_ascii_lowercase();
        let diagnostics = Diagnostics::new(config.debug.enabled, &config.debug.types, sink);

        info!(
            default_host = %config.default_host,
            target_host = %config.target_host,
            active = config.is_active(),
            "API rewrite initialized"
        );

        Self {
            config,
            transport,
            registry,
            diagnostics,
            dispatching: AtomicBool::new(false),
        }
    }

    /// Intercept one outbound HTTP attempt.
    ///
    /// `previous` is non-empty only when an earlier interceptor already
    /// produced a response for this call. Returns `PassThrough` when the
    /// call is not eligible for rewriting, `Handled` with the substitute
    /// response when it is, or an error terminal for the call.
    pub async fn intercept(
        &self,
        previous: Option<HttpResponse>,
        mut request: OutboundRequest,
        url: &str,
    ) -> Result<Interception, RewriteError> {
        if self.dispatching.load(Ordering::SeqCst) {
            debug!(url, "substitute dispatch in flight, passing through");
            return Ok(Interception::PassThrough(previous));
        }

        if !self.config.is_active() {
            return Ok(Interception::PassThrough(previous));
        }

        if !url.contains(&self.config.default_host) {
            return Ok(Interception::PassThrough(previous));
        }
        self.diagnostics.log_string(format!("Default API Found: {url}"));

        if previous.is_some() && self.config.compat.skip_if_response_preset {
            self.diagnostics
                .log_string("Skipped rewrite: another handler already supplied a response.");
            debug!(url, "existing response present, compatibility skip");
            return Ok(Interception::PassThrough(previous));
        }

        let target = self.config.effective_target();
        let Some(target_url) = self.config.target_url() else {
            self.diagnostics
                .log_string(format!("Invalid API Host: {target}"));
            warn!(host = %target, "target host failed validation");
            return Err(RewriteError::InvalidHost { host: target });
        };

        if self.target_matches_default(&target_url) {
            debug!(url, "target host equals default host, nothing to rewrite");
            return Ok(Interception::PassThrough(previous));
        }

        if self.config.disable_ssl_verify {
            self.diagnostics.log_string("SSL Verification Disabled");
            request.sslverify = false;
        }

        self.add_authorization_header(&mut request);
        self.add_accept_json_header(&mut request, url);

        let mut url = url.to_string();
        if self.config.debug.cache_buster {
            url = add_cache_buster(&url);
            self.diagnostics.log_string("Cache Buster Added to URL");
        }

        let rewritten = self.rewrite_url(&url, &target_url);
        self.diagnostics
            .log_string(format!("API Rerouted to: {rewritten}"));

        let request_type = classify::request_type(&rewritten);
        let asset_type = classify::asset_type(&rewritten);
        let non_api = registry::non_api_assets(self.registry.as_ref(), asset_type);

        if request_type == RequestType::Update {
            let removed = strip_non_api_entries(&mut request.body, asset_type, &non_api);
            if removed > 0 {
                self.diagnostics.log_string(format!(
                    "Removed {removed} entries with a custom update source from the outgoing update check."
                ));
            }
        }

        self.diagnostics.log_request(format!("{request:?}"));
        debug!(
            url = %rewritten,
            request_type = ?request_type,
            asset_type = ?asset_type,
            "dispatching substitute request"
        );

        let result = {
            let _guard = DispatchGuard::engage(&self.dispatching);
            self.transport.request(&rewritten, &request).await
        };

        let mut response = match result {
            Ok(response) => response,
            Err(error) => {
                self.diagnostics.log_string(error.to_string());
                warn!(%error, url = %rewritten, "substitute request failed");
                return Err(RewriteError::FailedRequest {
                    status: None,
                    message: error.to_string(),
                });
            }
        };

        self.diagnostics.log_response(format!("{response:?}"));

        if !matches!(response.status, 200 | 404) {
            self.diagnostics.log_string(response.status_message.clone());
            warn!(status = response.status, url = %rewritten, "unexpected upstream status");
            return Err(RewriteError::FailedRequest {
                status: Some(response.status),
                message: response.status_message,
            });
        }

        let outcome = filter_response(
            &mut response,
            &rewritten,
            request_type,
            asset_type,
            &non_api,
            &self.config.own_slug,
        );
        if outcome.non_api_removed > 0 {
            self.diagnostics.log_string(format!(
                "Removed {} entries with a custom update source from the update check response.",
                outcome.non_api_removed
            ));
        }
        if outcome.self_removed > 0 {
            self.diagnostics.log_string(format!(
                "Removed {} self-referential entries from the info response.",
                outcome.self_removed
            ));
        }

        Ok(Interception::Handled(response))
    }

    /// Describe how `url` would be handled, without dispatching anything.
    pub fn plan(&self, url: &str) -> Result<RewritePlan, RewriteError> {
        let request_type = classify::request_type(url);
        let asset_type = classify::asset_type(url);

        let ineligible = RewritePlan {
            eligible: false,
            rewritten_url: None,
            request_type,
            asset_type,
        };

        if !self.config.is_active() || !url.contains(&self.config.default_host) {
            return Ok(ineligible);
        }

        let Some(target_url) = self.config.target_url() else {
            return Err(RewriteError::InvalidHost {
                host: self.config.effective_target(),
            });
        };

        if self.target_matches_default(&target_url) {
            return Ok(ineligible);
        }

        Ok(RewritePlan {
            eligible: true,
            rewritten_url: Some(self.rewrite_url(url, &target_url)),
            request_type,
            asset_type,
        })
    }

    /// Whether the normalized target host is the default host, making the
    /// rewrite a no-op.
    fn target_matches_default(&self, target: &Url) -> bool {
        target
            .host_str()
            .is_some_and(|host| host.eq_ignore_ascii_case(&self.config.default_host))
    }

    /// Replace the `{scheme}://{default_host}` prefix with the target host,
    /// trailing slash on the target stripped.
    fn rewrite_url(&self, url: &str, target: &Url) -> String {
        let base = self.config.effective_target();
        let base = base.trim_end_matches('/');

        for scheme in ["https://", "http://"] {
            let prefix = format!("{scheme}{}", self.config.default_host);
            if let Some(rest) = url.strip_prefix(&prefix) {
                return format!("{base}{rest}");
            }
        }

        // Host present somewhere other than the prefix; swap the authority
        // only and keep the original scheme.
        match target.host_str() {
            Some(host) => url.replacen(&self.config.default_host, host, 1),
            None => url.to_string(),
        }
    }

    /// Attach `Authorization: Bearer <key>` when an API key is configured.
    /// An existing header is replaced.
    fn add_authorization_header(&self, request: &mut OutboundRequest) {
        if self.config.api_key.is_empty() {
            return;
        }
        self.diagnostics
            .log_string("API Key Authorization header added.");
        request.headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.config.api_key),
        );
    }

    /// Attach `Accept: application/json` when the URL path points at a
    /// `.php` endpoint or ends in a slash; file asset fetches are left
    /// untouched.
    fn add_accept_json_header(&self, request: &mut OutboundRequest, url: &str) {
        let path = match Url::parse(url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => url.to_string(),
        };
        if API_PATH_REGEX.is_match(&path) {
            self.diagnostics
                .log_string("Accept JSON Header added for API calls.");
            request
                .headers
                .insert("Accept".to_string(), "application/json".to_string());
        }
    }
}

/// Append the debug-only `cache_buster` query parameter.
fn add_cache_buster(url: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}cache_buster={timestamp}")
}

/// Marks a substitute dispatch as in flight for its scope, including early
/// returns and panics.
struct DispatchGuard<'a>(&'a AtomicBool);

impl<'a> DispatchGuard<'a> {
    fn engage(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::registry::StaticRegistry;
    use crate::transport::TransportError;
    use async_trait::async_trait;

    struct NoTransport;

    #[async_trait]
    impl HttpTransport for NoTransport {
        async fn request(
            &self,
            _url: &str,
            _request: &OutboundRequest,
        ) -> Result<HttpResponse, TransportError> {
            Err(TransportError::Connection("no transport".to_string()))
        }
    }

    fn rewriter(target: &str) -> ApiRewrite {
        let config = RewriteConfig {
            target_host: target.to_string(),
            ..RewriteConfig::default()
        };
        ApiRewrite::new(
            config,
            Arc::new(NoTransport),
            Arc::new(StaticRegistry::new()),
            Arc::new(MemorySink::new()),
        )
    }

    #[test]
    fn test_plan_rewrites_prefix() {
        let rewriter = rewriter("https://my.api.org/");
        let plan = rewriter
            .plan("https://api.wordpress.org/plugins/update-check/1.1/")
            .unwrap();
        assert!(plan.eligible);
        assert_eq!(
            plan.rewritten_url.as_deref(),
            Some("https://my.api.org/plugins/update-check/1.1/")
        );
        assert_eq!(plan.request_type, RequestType::Update);
        assert_eq!(plan.asset_type, AssetType::Plugin);
    }

    #[test]
    fn test_plan_foreign_url_not_eligible() {
        let rewriter = rewriter("https://my.api.org");
        let plan = rewriter.plan("https://example.com/feed/").unwrap();
        assert!(!plan.eligible);
        assert!(plan.rewritten_url.is_none());
    }

    #[test]
    fn test_plan_same_host_not_eligible() {
        let rewriter = rewriter("https://api.wordpress.org");
        let plan = rewriter
            .plan("https://api.wordpress.org/plugins/info/1.2/")
            .unwrap();
        assert!(!plan.eligible);
        assert_eq!(plan.request_type, RequestType::Info);
    }

    #[test]
    fn test_plan_invalid_host_errors() {
        let rewriter = rewriter("not-a-url");
        let error = rewriter
            .plan("https://api.wordpress.org/plugins/info/1.2/")
            .unwrap_err();
        assert!(matches!(error, RewriteError::InvalidHost { .. }));
    }

    #[test]
    fn test_target_host_is_normalized() {
        let rewriter = rewriter("  HTTPS://My.Api.Org ");
        let plan = rewriter
            .plan("https://api.wordpress.org/themes/update-check/1.1/")
            .unwrap();
        assert_eq!(
            plan.rewritten_url.as_deref(),
            Some("https://my.api.org/themes/update-check/1.1/")
        );
        assert_eq!(plan.asset_type, AssetType::Theme);
    }

    #[test]
    fn test_cache_buster_separator() {
        assert!(add_cache_buster("https://h/p/").contains("/p/?cache_buster="));
        assert!(add_cache_buster("https://h/p/?a=1").contains("&cache_buster="));
    }

    #[test]
    fn test_api_path_regex() {
        assert!(API_PATH_REGEX.is_match("/plugins/update-check/1.1/"));
        assert!(API_PATH_REGEX.is_match("/stats/wordpress.php"));
        assert!(!API_PATH_REGEX.is_match("/file.zip"));
        assert!(!API_PATH_REGEX.is_match("/file.png"));
        assert!(!API_PATH_REGEX.is_match("/file"));
        assert!(!API_PATH_REGEX.is_match("/"));
    }
}
