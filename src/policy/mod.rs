//! Timeout policy subsystem.
//!
//! # Data Flow
//! ```text
//! LogicalRequest (resource kind, operation kind, read-only, assigned policy)
//!     → registry.rs (assigned policy wins)
//!     → selector.rs (pure classification rules)
//!     → timeout.rs (TimeoutPolicy: schedule + exhaustion behaviour)
//!     → attempt.rs (AttemptSpec per attempt)
//!     → consumed by resilience::orchestrator
//! ```
//!
//! # Design Decisions
//! - Policies are a closed set of kinds carrying their schedule as data
//! - The registry is built once and passed by reference; nothing is mutable
//!   after construction
//! - The overall retry time limit is reported, never enforced, here

pub mod attempt;
pub mod classify;
pub mod registry;
pub mod selector;
pub mod timeout;

pub use attempt::AttemptSpec;
pub use classify::{OperationKind, ResourceKind};
pub use registry::PolicyRegistry;
pub use selector::{gateway_v2_kind, is_metadata_request, select_policy_kind};
pub use timeout::{PolicyCategory, PolicyKind, TimeoutPolicy};
