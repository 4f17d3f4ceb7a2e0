//! Request lifecycle control.
//!
//! # Data Flow
//! ```text
//! caller holds CancelHandle
//!     → CancelToken passed to RetryOrchestrator::execute_until
//!     → cancel() drops the in-flight attempt and stops further attempts
//! ```

pub mod cancel;

pub use cancel::{CancelHandle, CancelToken};
