//! Update-API rewrite engine.
//!
//! Intercepts outbound HTTP calls the host application makes to the default
//! update API host (`api.wordpress.org`) and reroutes eligible calls to a
//! user-configured mirror:
//!
//! - URL prefix rewriting onto the target host
//! - Auth and content-negotiation headers on rerouted requests
//! - Update-check payload filtering for assets with their own update source
//! - Self-reference scrubbing in info listings
//! - Diagnostic logging of every rewrite decision
//!
//! The host supplies the collaborators as trait objects: an [`HttpTransport`]
//! to perform the substitute call, an [`AssetRegistry`] enumerating installed
//! plugins/themes, and a [`LogSink`] for diagnostics. To the rest of the host
//! the interception looks like a single synchronous HTTP call.
//!
//! ## Configuration Example
//!
//! ```yaml
//! target_host: "https://my.api.org"
//! api_key: "secret"
//! debug:
//!   enabled: true
//!   types: [string, request]
//! ```

pub mod classify;
pub mod config;
pub mod diagnostics;
pub mod interceptor;
pub mod registry;
pub mod transformer;
pub mod transport;

pub use classify::{asset_type, request_type, AssetType, RequestType};
pub use config::{ConfigError, RewriteConfig, DEFAULT_API_HOST};
pub use diagnostics::{Diagnostics, LogCategory, LogEntry, LogSink};
pub use interceptor::{ApiRewrite, Interception, RewriteError, RewritePlan};
pub use registry::{AssetInfo, AssetRegistry, StaticRegistry};
pub use transport::{HttpResponse, HttpTransport, OutboundRequest, RequestBody, TransportError};
