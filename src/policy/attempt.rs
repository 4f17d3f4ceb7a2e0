//! Per-attempt schedule entry.

use std::time::Duration;

/// One bounded try in a timeout policy's schedule.
///
/// `retry_delay` is the wait observed before this attempt when it follows a
/// failed attempt. The first attempt of a schedule never waits, so its delay
/// is carried only for completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptSpec {
    timeout: Duration,
    retry_delay: Duration,
}

impl AttemptSpec {
    pub const fn new(timeout: Duration, retry_delay: Duration) -> Self {
        Self {
            timeout,
            retry_delay,
        }
    }

    pub const fn from_millis(timeout_ms: u64, retry_delay_secs: u64) -> Self {
        Self::new(
            Duration::from_millis(timeout_ms),
            Duration::from_secs(retry_delay_secs),
        )
    }

    /// Upper bound for the attempt, from dispatch to fully buffered response.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}
