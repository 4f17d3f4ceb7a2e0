//! Per-request attempt state machine.
//!
//! ```text
//! PENDING_ATTEMPT → IN_FLIGHT → SUCCESS
//!                             → RETRYABLE_FAILURE → DELAY → PENDING_ATTEMPT
//!                             → TERMINAL_FAILURE
//! ```
//!
//! A failure is retryable only if it is a connection error, an attempt
//! timeout or a 408 response, the policy considers the method safe to
//! retry, and the schedule has attempts left.

use std::time::Duration;

use http::Method;

use crate::error::GatewayError;
use crate::policy::{AttemptSpec, TimeoutPolicy};

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then run the next attempt.
    Retry { delay: Duration },
    /// The failure was retryable but no attempts remain.
    Exhausted,
    /// The failure is not retryable.
    Terminal,
}

/// Position within a policy's attempt schedule.
#[derive(Debug, Clone)]
pub struct AttemptCursor<'p> {
    policy: &'p TimeoutPolicy,
    index: usize,
}

impl<'p> AttemptCursor<'p> {
    pub fn new(policy: &'p TimeoutPolicy) -> Self {
        Self { policy, index: 0 }
    }

    pub fn policy(&self) -> &'p TimeoutPolicy {
        self.policy
    }

    /// Zero-based index of the current attempt.
    pub fn index(&self) -> usize {
        self.index
    }

    /// One-based number of the current attempt.
    pub fn attempt_number(&self) -> usize {
        self.index + 1
    }

    pub fn spec(&self) -> AttemptSpec {
        self.policy.attempts()[self.index]
    }

    /// Attempts left after the current one.
    pub fn remaining(&self) -> usize {
        self.policy.total_retry_count() - self.attempt_number()
    }

    pub fn decide(&self, method: &Method, error: &GatewayError) -> RetryDecision {
        if !error.is_retryable() || !self.policy.is_safe_to_retry(method) {
            return RetryDecision::Terminal;
        }
        match self.policy.attempt(self.index + 1) {
            Some(next) => RetryDecision::Retry {
                delay: next.retry_delay(),
            },
            None => RetryDecision::Exhausted,
        }
    }

    /// Move to the next attempt. Returns `false` at the end of the schedule.
    pub fn advance(&mut self) -> bool {
        if self.remaining() == 0 {
            return false;
        }
        self.index += 1;
        true
    }
}
