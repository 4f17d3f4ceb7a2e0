//! HTTP request/response model.
//!
//! # Data Flow
//! ```text
//! serialization layer (codec.rs boundary)
//!     → request.rs (LogicalRequest: prepared request + classification)
//!     → [orchestrator + transport]
//!     → response.rs (RawResponse: status, headers, buffered body)
//!     → serialization layer decodes the domain response
//! ```

pub mod codec;
pub mod request;
pub mod response;

pub use codec::GatewayCodec;
pub use request::{LogicalRequest, RequestId, X_REQUEST_ID};
pub use response::{BufferedBody, RawResponse};
