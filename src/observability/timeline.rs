//! Per-request connection lifecycle timeline.
//!
//! # Phases
//! ```text
//! created ─connectionCreated─▶ connected ─connectionConfigured─▶ configured
//!   ─requestSent─▶ sent ─transitTime─▶ received ─received─▶ completed (or now)
//! ```
//!
//! # Design Decisions
//! - Boundaries are written from the transport's I/O path, so a write only
//!   takes a short uncontended lock and never waits
//! - A write that would break the ordering of recorded boundaries is ignored
//! - Recording a boundary fills unrecorded earlier connection boundaries with
//!   the same instant, so snapshots stay contiguous
//! - Unreached boundaries resolve to the completion time, or now while the
//!   request is still in flight

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::time::Instant;

/// A lifecycle boundary of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimelineMark {
    Created,
    Connected,
    Configured,
    Sent,
    Received,
    Completed,
}

impl TimelineMark {
    const COUNT: usize = 6;

    fn index(self) -> usize {
        self as usize
    }

    fn is_connection_phase(self) -> bool {
        matches!(
            self,
            TimelineMark::Connected
                | TimelineMark::Configured
                | TimelineMark::Sent
                | TimelineMark::Received
        )
    }
}

/// A named span between two boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimelinePhase {
    ConnectionCreated,
    ConnectionConfigured,
    RequestSent,
    TransitTime,
    Received,
}

impl TimelinePhase {
    pub const ALL: [TimelinePhase; 5] = [
        TimelinePhase::ConnectionCreated,
        TimelinePhase::ConnectionConfigured,
        TimelinePhase::RequestSent,
        TimelinePhase::TransitTime,
        TimelinePhase::Received,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TimelinePhase::ConnectionCreated => "connectionCreated",
            TimelinePhase::ConnectionConfigured => "connectionConfigured",
            TimelinePhase::RequestSent => "requestSent",
            TimelinePhase::TransitTime => "transitTime",
            TimelinePhase::Received => "received",
        }
    }
}

impl fmt::Display for TimelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug)]
struct TimelineState {
    marks: [Option<Instant>; TimelineMark::COUNT],
}

impl TimelineState {
    fn get(&self, mark: TimelineMark) -> Option<Instant> {
        self.marks[mark.index()]
    }

    fn keeps_order(&self, mark: TimelineMark, at: Instant) -> bool {
        let i = mark.index();
        let earlier_ok = self.marks[..i].iter().flatten().all(|t| *t <= at);
        let later_ok = self.marks[i + 1..].iter().flatten().all(|t| at <= *t);
        earlier_ok && later_ok
    }
}

/// Shared, mutable lifecycle record of one logical request.
///
/// Clones refer to the same record, so the transport can hand one to the
/// request body while the orchestrator keeps another.
#[derive(Debug, Clone)]
pub struct RequestTimeline {
    inner: Arc<Mutex<TimelineState>>,
}

impl RequestTimeline {
    pub fn new() -> Self {
        Self::created_at(Instant::now())
    }

    pub fn created_at(at: Instant) -> Self {
        let mut marks = [None; TimelineMark::COUNT];
        marks[TimelineMark::Created.index()] = Some(at);
        Self {
            inner: Arc::new(Mutex::new(TimelineState { marks })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TimelineState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a boundary. Returns `false` if the write was ignored because it
    /// would put the boundary out of order.
    ///
    /// Overwriting an already recorded boundary with a later observation is
    /// allowed as long as ordering holds.
    pub fn record(&self, mark: TimelineMark, at: Instant) -> bool {
        let mut state = self.lock();
        if !state.keeps_order(mark, at) {
            tracing::trace!(?mark, "Ignoring out-of-order timeline write");
            return false;
        }

        state.marks[mark.index()] = Some(at);
        if mark.is_connection_phase() {
            for earlier in TimelineMark::Connected.index()..mark.index() {
                if state.marks[earlier].is_none() {
                    state.marks[earlier] = Some(at);
                }
            }
        }
        true
    }

    /// Record a boundary at the current instant.
    pub fn mark(&self, mark: TimelineMark) -> bool {
        self.record(mark, Instant::now())
    }

    /// Record a boundary only if it has not been observed yet.
    pub fn mark_once(&self, mark: TimelineMark) -> bool {
        if self.get(mark).is_some() {
            return false;
        }
        self.mark(mark)
    }

    pub fn set_connected(&self, at: Instant) -> bool {
        self.record(TimelineMark::Connected, at)
    }

    pub fn set_configured(&self, at: Instant) -> bool {
        self.record(TimelineMark::Configured, at)
    }

    pub fn set_sent(&self, at: Instant) -> bool {
        self.record(TimelineMark::Sent, at)
    }

    pub fn set_received(&self, at: Instant) -> bool {
        self.record(TimelineMark::Received, at)
    }

    pub fn set_completed(&self, at: Instant) -> bool {
        self.record(TimelineMark::Completed, at)
    }

    pub fn get(&self, mark: TimelineMark) -> Option<Instant> {
        self.lock().get(mark)
    }

    pub fn created(&self) -> Instant {
        // Created is set at construction and `begin_attempt` never clears it.
        self.get(TimelineMark::Created).unwrap_or_else(Instant::now)
    }

    pub fn is_completed(&self) -> bool {
        self.get(TimelineMark::Completed).is_some()
    }

    /// Clear connection boundaries before a new attempt; `created` is kept.
    pub fn begin_attempt(&self) {
        let mut state = self.lock();
        for slot in &mut state.marks[TimelineMark::Connected.index()..] {
            *slot = None;
        }
    }

    /// Ordered, contiguous phase events as of now.
    pub fn snapshot(&self) -> TimelineSnapshot {
        self.snapshot_at(Instant::now())
    }

    /// Ordered, contiguous phase events, resolving unreached boundaries to the
    /// completion time or to `now`.
    pub fn snapshot_at(&self, now: Instant) -> TimelineSnapshot {
        let marks = self.lock().marks;
        let created = marks[TimelineMark::Created.index()].unwrap_or(now);
        let end = marks[TimelineMark::Completed.index()].unwrap_or(now);

        let mut boundaries = [created; TimelinePhase::ALL.len() + 1];
        let mut previous = created;
        for (slot, mark) in boundaries.iter_mut().zip([
            TimelineMark::Created,
            TimelineMark::Connected,
            TimelineMark::Configured,
            TimelineMark::Sent,
            TimelineMark::Received,
            TimelineMark::Completed,
        ]) {
            let value = marks[mark.index()].unwrap_or(end);
            previous = previous.max(value);
            *slot = previous;
        }

        let events = TimelinePhase::ALL
            .iter()
            .enumerate()
            .map(|(i, phase)| TimelineEvent {
                phase: *phase,
                start: boundaries[i],
                end: boundaries[i + 1],
            })
            .collect();

        TimelineSnapshot { created, events }
    }
}

impl Default for RequestTimeline {
    fn default() -> Self {
        Self::new()
    }
}

/// One phase of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEvent {
    pub phase: TimelinePhase,
    pub start: Instant,
    pub end: Instant,
}

impl TimelineEvent {
    pub fn duration(&self) -> std::time::Duration {
        self.end.saturating_duration_since(self.start)
    }
}

/// Immutable, ordered phase events of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineSnapshot {
    created: Instant,
    events: Vec<TimelineEvent>,
}

#[derive(Serialize)]
struct EventRecord {
    name: &'static str,
    start_offset_ms: f64,
    duration_ms: f64,
}

fn millis(d: std::time::Duration) -> f64 {
    d.as_micros() as f64 / 1000.0
}

impl TimelineSnapshot {
    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn event(&self, phase: TimelinePhase) -> Option<&TimelineEvent> {
        self.events.iter().find(|e| e.phase == phase)
    }

    /// Span from creation to the end of the last phase.
    pub fn total(&self) -> std::time::Duration {
        self.events
            .last()
            .map(|e| e.end.saturating_duration_since(self.created))
            .unwrap_or_default()
    }

    /// JSON form for diagnostics and logs.
    pub fn to_diagnostics(&self) -> serde_json::Value {
        let records: Vec<EventRecord> = self
            .events
            .iter()
            .map(|e| EventRecord {
                name: e.phase.label(),
                start_offset_ms: millis(e.start.saturating_duration_since(self.created)),
                duration_ms: millis(e.duration()),
            })
            .collect();
        serde_json::to_value(records).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for TimelineSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, event) in self.events.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={:?}", event.phase, event.duration())?;
        }
        Ok(())
    }
}
