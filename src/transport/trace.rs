//! Per-connection I/O timestamps and their projection onto a request timeline.
//!
//! The connector attaches a [`ConnectionTrace`] to every dialed connection as
//! connection metadata, and hyper-util copies it into the extensions of every
//! response that connection carries. The stream stamps each write, so once a
//! response head has arrived the last write is when the request finished
//! leaving the client.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::observability::RequestTimeline;

/// Establishment and write instants of one connection.
#[derive(Debug, Clone)]
pub struct ConnectionTrace {
    inner: Arc<TraceState>,
}

#[derive(Debug)]
struct TraceState {
    established: Instant,
    ready: Instant,
    /// Nanoseconds after `established` of the latest write, plus one.
    /// Zero until something is written.
    last_write: AtomicU64,
    unclaimed: AtomicBool,
}

impl ConnectionTrace {
    /// `established` is when the socket connected, `ready` when the proxy
    /// tunnel and TLS handshake (if any) completed.
    pub fn new(established: Instant, ready: Instant) -> Self {
        Self {
            inner: Arc::new(TraceState {
                established,
                ready: ready.max(established),
                last_write: AtomicU64::new(0),
                unclaimed: AtomicBool::new(true),
            }),
        }
    }

    pub fn established(&self) -> Instant {
        self.inner.established
    }

    pub fn ready(&self) -> Instant {
        self.inner.ready
    }

    pub fn record_write(&self) {
        self.record_write_at(Instant::now());
    }

    pub fn record_write_at(&self, at: Instant) {
        let offset = at.saturating_duration_since(self.inner.established).as_nanos();
        let encoded = u64::try_from(offset).unwrap_or(u64::MAX).saturating_add(1);
        self.inner.last_write.fetch_max(encoded, Ordering::AcqRel);
    }

    pub fn last_write(&self) -> Option<Instant> {
        match self.inner.last_write.load(Ordering::Acquire) {
            0 => None,
            encoded => Some(self.inner.established + Duration::from_nanos(encoded - 1)),
        }
    }

    /// `true` exactly once: for the first exchange carried by the connection.
    pub fn claim_first_exchange(&self) -> bool {
        self.inner.unclaimed.swap(false, Ordering::AcqRel)
    }
}

/// Instants one `send` observed around a single exchange.
#[derive(Debug, Clone, Copy)]
pub struct ExchangeInstants {
    /// When the transport started working on the attempt.
    pub started: Instant,
    /// When the client handed a connection to the request, if seen.
    pub checked_out: Option<Instant>,
    /// When the response head arrived.
    pub received: Instant,
}

/// Record the connection phases of one exchange.
///
/// A connection dialed for this exchange contributes its own establishment
/// and readiness instants. A reused connection is connected and configured
/// the moment it is checked out. The last write before the response head
/// marks the request as sent.
pub fn record_exchange(
    timeline: &RequestTimeline,
    trace: Option<&ConnectionTrace>,
    at: ExchangeInstants,
) {
    let sent = trace
        .and_then(ConnectionTrace::last_write)
        .filter(|sent| at.started <= *sent && *sent <= at.received);
    let checked_out = at
        .checked_out
        .into_iter()
        .chain(sent)
        .min()
        .unwrap_or(at.received);

    let fresh = trace
        .filter(|trace| trace.claim_first_exchange())
        .filter(|trace| trace.established() >= at.started);
    let (connected, configured) = match fresh {
        Some(trace) => (trace.established(), trace.ready()),
        None => (checked_out, checked_out),
    };

    timeline.set_connected(connected);
    timeline.set_configured(configured);
    if let Some(sent) = sent {
        timeline.set_sent(sent);
    }
    timeline.set_received(at.received);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::{TimelineMark, TimelinePhase};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn writes_keep_the_latest_instant() {
        let t0 = Instant::now();
        let trace = ConnectionTrace::new(t0, t0 + ms(2));
        assert_eq!(trace.last_write(), None);

        trace.record_write_at(t0 + ms(5));
        trace.record_write_at(t0 + ms(3));
        assert_eq!(trace.last_write(), Some(t0 + ms(5)));
    }

    #[test]
    fn only_the_first_exchange_claims_the_connection() {
        let t0 = Instant::now();
        let trace = ConnectionTrace::new(t0, t0);
        assert!(trace.claim_first_exchange());
        assert!(!trace.claim_first_exchange());
    }

    #[test]
    fn fresh_connection_reports_every_phase() {
        let t0 = Instant::now();
        let timeline = RequestTimeline::created_at(t0);
        let trace = ConnectionTrace::new(t0 + ms(4), t0 + ms(10));
        trace.record_write_at(t0 + ms(12));

        record_exchange(
            &timeline,
            Some(&trace),
            ExchangeInstants {
                started: t0 + ms(1),
                checked_out: Some(t0 + ms(11)),
                received: t0 + ms(312),
            },
        );
        timeline.set_completed(t0 + ms(315));

        let snapshot = timeline.snapshot_at(t0 + ms(400));
        let duration = |phase| snapshot.event(phase).unwrap().duration();
        assert_eq!(duration(TimelinePhase::ConnectionCreated), ms(4));
        assert_eq!(duration(TimelinePhase::ConnectionConfigured), ms(6));
        assert_eq!(duration(TimelinePhase::RequestSent), ms(2));
        assert_eq!(duration(TimelinePhase::TransitTime), ms(300));
        assert_eq!(duration(TimelinePhase::Received), ms(3));
    }

    #[test]
    fn reused_connection_is_configured_at_checkout() {
        let t0 = Instant::now();
        let trace = ConnectionTrace::new(t0, t0 + ms(1));
        trace.record_write_at(t0 + ms(2));
        assert!(trace.claim_first_exchange());

        let timeline = RequestTimeline::created_at(t0 + ms(50));
        trace.record_write_at(t0 + ms(53));
        record_exchange(
            &timeline,
            Some(&trace),
            ExchangeInstants {
                started: t0 + ms(50),
                checked_out: Some(t0 + ms(52)),
                received: t0 + ms(90),
            },
        );

        assert_eq!(timeline.get(TimelineMark::Connected), Some(t0 + ms(52)));
        assert_eq!(timeline.get(TimelineMark::Configured), Some(t0 + ms(52)));
        assert_eq!(timeline.get(TimelineMark::Sent), Some(t0 + ms(53)));
        assert_eq!(timeline.get(TimelineMark::Received), Some(t0 + ms(90)));
    }

    #[test]
    fn late_checkout_observation_never_hides_the_send() {
        let t0 = Instant::now();
        let trace = ConnectionTrace::new(t0, t0);
        assert!(trace.claim_first_exchange());

        let timeline = RequestTimeline::created_at(t0 + ms(10));
        trace.record_write_at(t0 + ms(11));
        record_exchange(
            &timeline,
            Some(&trace),
            ExchangeInstants {
                started: t0 + ms(10),
                checked_out: Some(t0 + ms(13)),
                received: t0 + ms(40),
            },
        );

        assert_eq!(timeline.get(TimelineMark::Configured), Some(t0 + ms(11)));
        assert_eq!(timeline.get(TimelineMark::Sent), Some(t0 + ms(11)));
    }

    #[test]
    fn connection_dialed_before_the_attempt_counts_as_reused() {
        let t0 = Instant::now();
        let trace = ConnectionTrace::new(t0, t0 + ms(1));
        let timeline = RequestTimeline::created_at(t0 + ms(5));
        trace.record_write_at(t0 + ms(7));

        record_exchange(
            &timeline,
            Some(&trace),
            ExchangeInstants {
                started: t0 + ms(5),
                checked_out: Some(t0 + ms(6)),
                received: t0 + ms(20),
            },
        );

        assert_eq!(timeline.get(TimelineMark::Connected), Some(t0 + ms(6)));
        assert_eq!(timeline.get(TimelineMark::Sent), Some(t0 + ms(7)));
    }

    #[test]
    fn missing_trace_falls_back_to_the_receive_instant() {
        let t0 = Instant::now();
        let timeline = RequestTimeline::created_at(t0);
        record_exchange(
            &timeline,
            None,
            ExchangeInstants {
                started: t0,
                checked_out: Some(t0 + ms(2)),
                received: t0 + ms(9),
            },
        );

        assert_eq!(timeline.get(TimelineMark::Connected), Some(t0 + ms(2)));
        assert_eq!(timeline.get(TimelineMark::Sent), Some(t0 + ms(9)));
    }
}
