//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Transport connection events (connected, configured, sent, received)
//!     → timeline.rs (RequestTimeline, per logical request)
//!     → snapshot on completion, logged by the orchestrator
//!
//! Orchestrator and transport
//!     → metrics.rs (counters, gauges, histograms)
//!     → logging.rs (structured events via tracing)
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Request ID flows through every attempt's log events
//! - Metrics are cheap (facade calls, no-op without a recorder)

pub mod logging;
pub mod metrics;
pub mod timeline;

pub use timeline::{RequestTimeline, TimelineEvent, TimelineMark, TimelinePhase, TimelineSnapshot};
