//! Logical request handed to the gateway transport.
//!
//! # Responsibilities
//! - Carry the prepared HTTP request (method, URI, headers, body)
//! - Carry the classification used for timeout policy selection
//! - Own the request's identity and lifecycle timeline
//!
//! # Design Decisions
//! - Body is buffered `Bytes`, so every attempt replays it without copying
//! - Request ID is generated at construction and sent unless the caller set one

use std::fmt;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONNECTION};
use http::{HeaderMap, Method, Uri};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::observability::RequestTimeline;
use crate::policy::{OperationKind, PolicyKind, ResourceKind};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Unique identifier of a logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One logical database call, consumed by the orchestrator.
#[derive(Debug, Clone)]
pub struct LogicalRequest {
    id: RequestId,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    resource_kind: ResourceKind,
    operation_kind: OperationKind,
    read_only: bool,
    assigned_policy: Option<PolicyKind>,
    timeline: RequestTimeline,
}

impl LogicalRequest {
    pub fn new(method: Method, uri: Uri, resource: ResourceKind, operation: OperationKind) -> Self {
        Self {
            id: RequestId::new(),
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            resource_kind: resource,
            operation_kind: operation,
            read_only: operation.is_read_only(),
            assigned_policy: None,
            timeline: RequestTimeline::new(),
        }
    }

    /// Adopt an HTTP request produced by the serialization layer.
    pub fn from_http_request(
        request: http::Request<Bytes>,
        resource: ResourceKind,
        operation: OperationKind,
    ) -> Self {
        let (parts, body) = request.into_parts();
        let mut logical = Self::new(parts.method, parts.uri, resource, operation);
        logical.headers = parts.headers;
        logical.body = body;
        logical
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Override the read/write classification derived from the operation.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Pin the timeout policy instead of letting the selector choose.
    pub fn with_policy(mut self, kind: PolicyKind) -> Self {
        self.assigned_policy = Some(kind);
        self
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Target port, falling back to the scheme's default.
    pub fn port(&self) -> Option<u16> {
        self.uri.port_u16().or_else(|| match self.uri.scheme_str() {
            Some("https") => Some(443),
            Some("http") => Some(80),
            _ => None,
        })
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn resource_kind(&self) -> ResourceKind {
        self.resource_kind
    }

    pub fn operation_kind(&self) -> OperationKind {
        self.operation_kind
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn assigned_policy(&self) -> Option<PolicyKind> {
        self.assigned_policy
    }

    pub fn timeline(&self) -> &RequestTimeline {
        &self.timeline
    }

    /// Build the HTTP request for one attempt around the given body.
    pub fn to_http_request<B>(
        &self,
        body: B,
        keep_alive: bool,
    ) -> Result<http::Request<B>, GatewayError> {
        if self.uri.scheme().is_none() || self.uri.authority().is_none() {
            return Err(GatewayError::InvalidRequest(format!(
                "target URI {} is not absolute",
                self.uri
            )));
        }

        let mut request = http::Request::builder()
            .method(self.method.clone())
            .uri(self.uri.clone())
            .body(body)
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;

        let headers = request.headers_mut();
        headers.extend(self.headers.clone());
        if !headers.contains_key(X_REQUEST_ID) {
            let value = HeaderValue::from_str(&self.id.to_string())
                .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
            headers.insert(X_REQUEST_ID, value);
        }
        if !keep_alive {
            headers.insert(CONNECTION, HeaderValue::from_static("close"));
        }

        Ok(request)
    }
}
