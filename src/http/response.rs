//! Raw response produced by an attempt.
//!
//! # Design Decisions
//! - The body is buffered exactly once by the transport, inside the attempt,
//!   so the attempt timeout covers it and a cancelled attempt frees it
//! - `BufferedBody` shares one reference-counted buffer; every reader gets
//!   its own cursor and none can release the buffer under another

use bytes::Bytes;
use http::{HeaderMap, StatusCode, Version};
use http_body_util::Full;

/// A fully received response body that can be read any number of times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferedBody {
    bytes: Bytes,
}

impl BufferedBody {
    pub fn new(bytes: Bytes) -> Self {
        Self { bytes }
    }

    /// A handle to the shared buffer.
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// A fresh `http_body::Body` replaying the buffer from the start.
    pub fn reader(&self) -> Full<Bytes> {
        Full::new(self.bytes.clone())
    }
}

/// Status, headers and buffered body of one attempt.
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: BufferedBody,
}

impl RawResponse {
    pub fn new(status: StatusCode, version: Version, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            version,
            headers,
            body: BufferedBody::new(body),
        }
    }

    /// Empty HTTP/1.1 response with the given status.
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status, Version::HTTP_11, HeaderMap::new(), Bytes::new())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &BufferedBody {
        &self.body
    }

    pub fn is_request_timeout(&self) -> bool {
        self.status == StatusCode::REQUEST_TIMEOUT
    }

    /// The `(status, headers, body)` triple handed to the response decoder.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        (self.status, self.headers, self.body.bytes)
    }
}
