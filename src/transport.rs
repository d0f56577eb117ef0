//! Outbound HTTP dispatch surface.
//!
//! The host application hands the interceptor an [`OutboundRequest`] it was
//! about to send; the interceptor dispatches the substitute call through an
//! [`HttpTransport`] implementation the host supplies.

use async_trait::async_trait;
use std::collections::BTreeMap;

/// Body of an outbound request.
///
/// The host hands over either an opaque byte payload or already-structured
/// form fields. Both pass through untouched unless the update-check filter
/// rewrites them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    /// No body
    #[default]
    Empty,
    /// Opaque byte payload (usually JSON)
    Raw(Vec<u8>),
    /// Structured form fields
    Form(BTreeMap<String, String>),
}

impl RequestBody {
    /// Whether there is anything to send.
    pub fn is_empty(&self) -> bool {
        match self {
            RequestBody::Empty => true,
            RequestBody::Raw(bytes) => bytes.is_empty(),
            RequestBody::Form(fields) => fields.is_empty(),
        }
    }
}

/// An outbound HTTP request as attempted by the host application.
///
/// Owned exclusively by the interceptor for the duration of one
/// interception; transport options the interceptor does not understand stay
/// with the host's transport implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    /// HTTP method
    pub method: String,
    /// Request headers
    pub headers: BTreeMap<String, String>,
    /// Request body
    pub body: RequestBody,
    /// Whether the transport should verify TLS certificates
    pub sslverify: bool,
}

impl Default for OutboundRequest {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            headers: BTreeMap::new(),
            body: RequestBody::Empty,
            sslverify: true,
        }
    }
}

impl OutboundRequest {
    /// Create a request with the given method and no body.
    pub fn new(method: &str) -> Self {
        Self {
            method: method.to_string(),
            ..Self::default()
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Response bag returned by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Status reason phrase
    pub status_message: String,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// Response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create an empty response with the canonical reason phrase.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            status_message: status_text(status),
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Create a response carrying `body`.
    pub fn with_body(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            ..Self::new(status)
        }
    }
}

/// Errors raised by a transport implementation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out")]
    Timeout,
}

/// Generic "perform HTTP request" primitive.
///
/// The interceptor calls this directly for the substitute request; routing
/// it back through the host's hooked pipeline would re-enter the
/// interceptor. Timeout and retry behavior belong to the implementation.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform the request and return the response bag.
    async fn request(
        &self,
        url: &str,
        request: &OutboundRequest,
    ) -> Result<HttpResponse, TransportError>;
}

/// Canonical reason phrase for a status code.
pub fn status_text(code: u16) -> String {
    match code {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
    .to_string()
}
