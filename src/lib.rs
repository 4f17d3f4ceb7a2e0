//! Resilient HTTP transport for a database gateway client.
//!
//! A pooled asynchronous HTTP sender, a fixed set of timeout/retry policies,
//! a retry orchestrator that drives one logical request through its policy,
//! and a reference-counted registry that shares transports between clients.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod policy;
pub mod resilience;
pub mod transport;

pub use crate::config::schema::{GatewayConfig, TransportConfig};
pub use crate::error::{ConnectionErrorKind, GatewayError};
pub use crate::http::{LogicalRequest, RawResponse};
pub use crate::lifecycle::{CancelHandle, CancelToken};
pub use crate::policy::{PolicyKind, PolicyRegistry, TimeoutPolicy};
pub use crate::resilience::{GatewayResponse, RetryOrchestrator};
pub use crate::transport::{PooledTransport, SharedTransportRegistry, Transport};
