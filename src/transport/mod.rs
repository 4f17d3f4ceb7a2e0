//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! LogicalRequest + attempt timeout
//!     → pooled.rs (acquire pool slot, bounded wait)
//!     → connector.rs (TCP → proxy tunnel → TLS), only when no idle connection
//!     → hyper client (HTTP/1.1, or HTTP/2 when negotiated)
//!     → trace.rs (connection instants and last write → request timeline)
//!     → headers.rs (HTTP/2 header value trimming)
//!     → body.rs (buffer response once, bounded size)
//!     → RawResponse
//! ```
//!
//! Transports are shared between logical clients through shared.rs.

pub mod body;
pub mod connector;
pub mod headers;
pub mod pooled;
pub mod shared;
pub mod tls;
pub mod trace;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::GatewayError;
use crate::http::{LogicalRequest, RawResponse};

pub use connector::{DialError, GatewayConnector};
pub use pooled::{PooledTransport, TransportId};
pub use shared::{SharedTransportHandle, SharedTransportRegistry, TransportFactory};
pub use trace::ConnectionTrace;

/// Sends single attempts of logical requests.
pub trait Transport: Send + Sync {
    /// Send one attempt. `timeout` is the attempt's budget; implementations
    /// use it to bound internal waits such as pool acquisition.
    fn send(
        &self,
        request: &LogicalRequest,
        timeout: Duration,
    ) -> impl Future<Output = Result<RawResponse, GatewayError>> + Send;

    /// Stop accepting requests and release pooled connections. Idempotent.
    fn shutdown(&self);
}

impl<T: Transport> Transport for Arc<T> {
    fn send(
        &self,
        request: &LogicalRequest,
        timeout: Duration,
    ) -> impl Future<Output = Result<RawResponse, GatewayError>> + Send {
        (**self).send(request, timeout)
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }
}
