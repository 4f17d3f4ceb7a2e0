//! Metrics collection.
//!
//! # Metrics
//! - `gateway_attempts_total` (counter): attempts by policy, outcome
//! - `gateway_retries_total` (counter): retries by policy, failure reason
//! - `gateway_exhausted_total` (counter): exhausted schedules by policy
//! - `gateway_attempt_duration_seconds` (histogram): per-attempt latency
//! - `gateway_pool_acquire_wait_seconds` (histogram): wait for a pool slot
//! - `gateway_shared_transports` (gauge): live shared registry entries
//! - `gateway_transport_teardowns_total` (counter): shared transports torn down
//!
//! # Design Decisions
//! - Only the `metrics` facade is used; the embedding process installs a
//!   recorder (without one every call is a no-op)
//! - Label values are static strings to keep cardinality bounded

use std::time::Duration;

pub fn record_attempt(policy: &'static str, outcome: &'static str, elapsed: Duration) {
    metrics::counter!("gateway_attempts_total", "policy" => policy, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("gateway_attempt_duration_seconds", "policy" => policy)
        .record(elapsed.as_secs_f64());
}

pub fn record_retry(policy: &'static str, reason: &'static str) {
    metrics::counter!("gateway_retries_total", "policy" => policy, "reason" => reason)
        .increment(1);
}

pub fn record_exhausted(policy: &'static str, unavailable: bool) {
    let unavailable = if unavailable { "true" } else { "false" };
    metrics::counter!("gateway_exhausted_total", "policy" => policy, "unavailable" => unavailable)
        .increment(1);
}

pub fn record_acquire_wait(elapsed: Duration) {
    metrics::histogram!("gateway_pool_acquire_wait_seconds").record(elapsed.as_secs_f64());
}

pub fn record_shared_transports(live: usize) {
    metrics::gauge!("gateway_shared_transports").set(live as f64);
}

pub fn record_teardown() {
    metrics::counter!("gateway_transport_teardowns_total").increment(1);
}
