//! Serialization boundary between logical database requests and HTTP.
//!
//! The wire encoding of the database protocol lives outside this crate. A
//! codec turns a logical request into the HTTP request the transport sends,
//! and turns the raw `(status, headers, body)` triple back into a domain
//! response.

use bytes::Bytes;
use http::{HeaderMap, StatusCode, Uri};

use crate::http::LogicalRequest;

pub trait GatewayCodec {
    type Response;
    type Error;

    fn wrap_in_request(
        &self,
        request: &LogicalRequest,
        target: &Uri,
    ) -> Result<http::Request<Bytes>, Self::Error>;

    fn unwrap_to_response(
        &self,
        endpoint: &Uri,
        request: &LogicalRequest,
        status: StatusCode,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Self::Response, Self::Error>;
}
