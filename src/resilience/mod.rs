//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! LogicalRequest
//!     → orchestrator.rs (pick policy, run attempts in sequence)
//!         → per attempt: tokio::time::timeout(spec.timeout, transport.send)
//!         → 408 response becomes a RequestTimeout failure
//!     → retries.rs (AttemptCursor decides retry / exhausted / terminal)
//!     → delay timer, next attempt
//!     → GatewayResponse or GatewayError
//! ```
//!
//! # Design Decisions
//! - Exactly one attempt in flight per logical request
//! - Every wait (attempt, delay, cancellation) is a tokio timer or channel,
//!   never a blocked thread
//! - Only the orchestrator synthesizes `ServiceUnavailable`

pub mod orchestrator;
pub mod retries;

pub use orchestrator::{GatewayResponse, RetryOrchestrator};
pub use retries::{AttemptCursor, RetryDecision};
