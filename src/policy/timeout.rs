//! Timeout policy categories and their attempt schedules.
//!
//! # Schedules (timeout, retry delay)
//! ```text
//! ControlPlaneHotPath          (0.5s, 0s) → (5s, 1s)  → (10s, 0s)
//! Default                      (65s, 0s)  → (65s, 1s) → (65s, 0s)
//! ControlPlaneRead             (60s, 0s)  → (60s, 1s) → (60s, 0s)
//! GatewayV2PointRead           (6s, 0s)   → (6s, 0s)  → (10s, 0s)
//! GatewayV2QueryOrChangeFeed   (6s, 0s)   → (6s, 0s)  → (10s, 0s)
//! ```

use std::fmt;
use std::time::Duration;

use http::Method;

use crate::error::GatewayError;
use crate::policy::attempt::AttemptSpec;

const CONTROL_PLANE_HOT_PATH: [AttemptSpec; 3] = [
    AttemptSpec::from_millis(500, 0),
    AttemptSpec::from_millis(5_000, 1),
    AttemptSpec::from_millis(10_000, 0),
];

const DEFAULT: [AttemptSpec; 3] = [
    AttemptSpec::from_millis(65_000, 0),
    AttemptSpec::from_millis(65_000, 1),
    AttemptSpec::from_millis(65_000, 0),
];

const CONTROL_PLANE_READ: [AttemptSpec; 3] = [
    AttemptSpec::from_millis(60_000, 0),
    AttemptSpec::from_millis(60_000, 1),
    AttemptSpec::from_millis(60_000, 0),
];

const GATEWAY_V2: [AttemptSpec; 3] = [
    AttemptSpec::from_millis(6_000, 0),
    AttemptSpec::from_millis(6_000, 0),
    AttemptSpec::from_millis(10_000, 0),
];

/// Identifies one of the process-wide timeout policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    /// Latency-critical control-plane calls (query plans, partition key ranges).
    ControlPlaneHotPath { unavailable_on_exhaustion: bool },
    /// Everything that is not otherwise classified.
    Default { unavailable_on_exhaustion: bool },
    /// Control-plane metadata reads.
    ControlPlaneRead,
    GatewayV2PointRead,
    GatewayV2QueryOrChangeFeed,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 7] = [
        PolicyKind::ControlPlaneHotPath {
            unavailable_on_exhaustion: true,
        },
        PolicyKind::ControlPlaneHotPath {
            unavailable_on_exhaustion: false,
        },
        PolicyKind::Default {
            unavailable_on_exhaustion: true,
        },
        PolicyKind::Default {
            unavailable_on_exhaustion: false,
        },
        PolicyKind::ControlPlaneRead,
        PolicyKind::GatewayV2PointRead,
        PolicyKind::GatewayV2QueryOrChangeFeed,
    ];

    /// Position of this kind in [`PolicyKind::ALL`].
    pub(crate) fn index(self) -> usize {
        match self {
            PolicyKind::ControlPlaneHotPath {
                unavailable_on_exhaustion: true,
            } => 0,
            PolicyKind::ControlPlaneHotPath {
                unavailable_on_exhaustion: false,
            } => 1,
            PolicyKind::Default {
                unavailable_on_exhaustion: true,
            } => 2,
            PolicyKind::Default {
                unavailable_on_exhaustion: false,
            } => 3,
            PolicyKind::ControlPlaneRead => 4,
            PolicyKind::GatewayV2PointRead => 5,
            PolicyKind::GatewayV2QueryOrChangeFeed => 6,
        }
    }

    pub fn category(self) -> PolicyCategory {
        match self {
            PolicyKind::ControlPlaneHotPath { .. } => PolicyCategory::ControlPlaneHotPath,
            PolicyKind::Default { .. } => PolicyCategory::Default,
            PolicyKind::ControlPlaneRead => PolicyCategory::ControlPlaneRead,
            PolicyKind::GatewayV2PointRead | PolicyKind::GatewayV2QueryOrChangeFeed => {
                PolicyCategory::GatewayV2
            }
        }
    }

    pub fn unavailable_on_exhaustion(self) -> bool {
        match self {
            PolicyKind::ControlPlaneHotPath {
                unavailable_on_exhaustion,
            }
            | PolicyKind::Default {
                unavailable_on_exhaustion,
            } => unavailable_on_exhaustion,
            PolicyKind::ControlPlaneRead
            | PolicyKind::GatewayV2PointRead
            | PolicyKind::GatewayV2QueryOrChangeFeed => false,
        }
    }

    pub fn schedule(self) -> &'static [AttemptSpec] {
        match self.category() {
            PolicyCategory::ControlPlaneHotPath => &CONTROL_PLANE_HOT_PATH,
            PolicyCategory::Default => &DEFAULT,
            PolicyCategory::ControlPlaneRead => &CONTROL_PLANE_READ,
            PolicyCategory::GatewayV2 => &GATEWAY_V2,
        }
    }

    /// Stable name for logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::ControlPlaneHotPath {
                unavailable_on_exhaustion: true,
            } => "control_plane_hot_path",
            PolicyKind::ControlPlaneHotPath {
                unavailable_on_exhaustion: false,
            } => "control_plane_hot_path_passthrough",
            PolicyKind::Default {
                unavailable_on_exhaustion: true,
            } => "default",
            PolicyKind::Default {
                unavailable_on_exhaustion: false,
            } => "default_passthrough",
            PolicyKind::ControlPlaneRead => "control_plane_read",
            PolicyKind::GatewayV2PointRead => "gateway_v2_point_read",
            PolicyKind::GatewayV2QueryOrChangeFeed => "gateway_v2_query_or_change_feed",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behavioural family of a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyCategory {
    ControlPlaneHotPath,
    Default,
    ControlPlaneRead,
    GatewayV2,
}

/// An immutable bounded retry schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutPolicy {
    kind: PolicyKind,
    attempts: &'static [AttemptSpec],
    maximum_retry_time_limit: Duration,
}

impl TimeoutPolicy {
    pub(crate) fn new(kind: PolicyKind, maximum_retry_time_limit: Duration) -> Self {
        let attempts = kind.schedule();
        assert!(!attempts.is_empty(), "timeout policy {kind} has an empty schedule");
        Self {
            kind,
            attempts,
            maximum_retry_time_limit,
        }
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    /// Ordered, non-empty attempt schedule.
    pub fn attempts(&self) -> &[AttemptSpec] {
        self.attempts
    }

    pub fn attempt(&self, index: usize) -> Option<&AttemptSpec> {
        self.attempts.get(index)
    }

    /// Maximum number of attempts, including the first.
    pub fn total_retry_count(&self) -> usize {
        self.attempts.len()
    }

    pub fn throw_unavailable_on_exhaustion(&self) -> bool {
        self.kind.unavailable_on_exhaustion()
    }

    /// Whether a request with this method may be re-sent.
    ///
    /// Every category currently answers `true`, including for non-idempotent
    /// methods.
    pub fn is_safe_to_retry(&self, _method: &Method) -> bool {
        match self.kind.category() {
            PolicyCategory::ControlPlaneHotPath => true,
            PolicyCategory::Default => true,
            PolicyCategory::ControlPlaneRead => true,
            PolicyCategory::GatewayV2 => true,
        }
    }

    /// Overall budget callers apply on top of the schedule. Not enforced here.
    pub fn maximum_retry_time_limit(&self) -> Duration {
        self.maximum_retry_time_limit
    }

    /// Final error once the schedule is used up without success.
    pub fn exhausted(&self, last: GatewayError, attempts: usize) -> GatewayError {
        if self.throw_unavailable_on_exhaustion() {
            GatewayError::ServiceUnavailable {
                attempts,
                last: Box::new(last),
            }
        } else {
            last
        }
    }
}
