//! Pooled HTTP transport built on the hyper-util client.
//!
//! # Responsibilities
//! - Bound the number of in-flight requests with pool slots
//! - Reuse idle connections and evict them after the idle timeout
//! - Send one attempt and buffer its response
//! - Report connection progress to the request timeline
//!
//! # Design Decisions
//! - Configuration is fixed at construction; a different configuration is a
//!   different transport
//! - Shutdown closes the slot semaphore and drops the client, so waiting
//!   acquirers fail fast and idle connections close
//! - Requests already in flight keep their own handle to the client and
//!   complete normally

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use bytes::Bytes;
use http::{Uri, Version};
use http_body_util::Full;
use hyper_util::client::legacy::connect::{capture_connection, CaptureConnection};
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

use crate::config::{validate_transport, PoolMode, TransportConfig};
use crate::error::{ConnectionErrorKind, GatewayError};
use crate::http::{LogicalRequest, RawResponse};
use crate::observability::metrics;
use crate::transport::body::{buffer_body, classify_error};
use crate::transport::connector::GatewayConnector;
use crate::transport::headers::trim_header_values;
use crate::transport::trace::{record_exchange, ConnectionTrace, ExchangeInstants};
use crate::transport::{tls, Transport};

/// hyper refuses read buffers smaller than this.
const MIN_READ_BUFFER: usize = 8192;

static TRANSPORT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a transport instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportId(u64);

impl TransportId {
    fn next() -> Self {
        Self(TRANSPORT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport-{}", self.0)
    }
}

type HttpClient = Client<GatewayConnector, Full<Bytes>>;

/// HTTP sender over a bounded pool of persistent connections.
pub struct PooledTransport {
    id: TransportId,
    config: TransportConfig,
    client: ArcSwapOption<HttpClient>,
    slots: Option<Arc<Semaphore>>,
}

impl PooledTransport {
    pub fn new(config: TransportConfig) -> Result<Self, GatewayError> {
        validate_transport(&config).map_err(|errors| {
            let reasons: Vec<String> = errors.iter().map(ToString::to_string).collect();
            GatewayError::Configuration(reasons.join("; "))
        })?;

        let proxy = config
            .proxy
            .as_deref()
            .map(str::parse::<Uri>)
            .transpose()
            .map_err(|e| GatewayError::Configuration(format!("proxy: {e}")))?;
        let tls = tls::client_config(&config.tls, config.http2.enabled)?;
        let connector =
            GatewayConnector::new(tls, proxy, config.connect_timeout(), config.keep_alive);
        let client = build_client(&config, connector);

        let slots = config
            .slot_capacity()
            .map(|n| Arc::new(Semaphore::new(n.min(Semaphore::MAX_PERMITS))));

        let id = TransportId::next();
        tracing::info!(
            transport_id = %id,
            mode = ?config.pool.mode,
            max_pool_size = config.pool.max_pool_size,
            http2 = config.http2.enabled,
            keep_alive = config.keep_alive,
            proxy = ?config.proxy,
            "Transport created"
        );

        Ok(Self {
            id,
            config,
            client: ArcSwapOption::from_pointee(client),
            slots,
        })
    }

    pub fn id(&self) -> TransportId {
        self.id
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn is_shut_down(&self) -> bool {
        self.client.load().is_none()
    }

    /// Free pool slots, or `None` for an unpooled transport.
    pub fn available_slots(&self) -> Option<usize> {
        self.slots.as_ref().map(|s| s.available_permits())
    }

    /// Wait for a pool slot, bounded by the acquire timeout and the attempt's
    /// own timeout, whichever is shorter.
    async fn acquire_slot(
        &self,
        attempt_timeout: Duration,
    ) -> Result<Option<OwnedSemaphorePermit>, GatewayError> {
        let Some(slots) = &self.slots else {
            return Ok(None);
        };

        let wait = self.config.pool.acquire_timeout().min(attempt_timeout);
        let started = Instant::now();
        let permit = tokio::time::timeout(wait, slots.clone().acquire_owned())
            .await
            .map_err(|_| {
                GatewayError::connection(
                    ConnectionErrorKind::AcquireTimeout,
                    format!("no pool slot became free within {wait:?}"),
                )
            })?
            .map_err(|_| closed())?;

        metrics::record_acquire_wait(started.elapsed());
        Ok(Some(permit))
    }
}

impl Transport for PooledTransport {
    async fn send(
        &self,
        request: &LogicalRequest,
        timeout: Duration,
    ) -> Result<RawResponse, GatewayError> {
        let started = Instant::now();
        let client = self.client.load_full().ok_or_else(closed)?;
        // Held until the body is buffered, which is when hyper returns the
        // connection to the pool.
        let _slot = self.acquire_slot(timeout).await?;

        let body = Full::new(request.body().clone());
        let mut http_request = request.to_http_request(body, self.config.keep_alive)?;
        let mut capture = capture_connection(&mut http_request);

        let (response, checked_out) =
            observe_checkout(client.request(http_request), &mut capture).await;
        let received = Instant::now();
        let response = response.map_err(|e| classify_error(&e))?;

        record_exchange(
            request.timeline(),
            response.extensions().get::<ConnectionTrace>(),
            ExchangeInstants {
                started,
                checked_out,
                received,
            },
        );

        let (mut parts, body) = response.into_parts();
        if parts.version == Version::HTTP_2 {
            trim_header_values(&mut parts.headers);
        }
        let body = buffer_body(body, self.config.decoder.max_response_body_bytes).await?;

        tracing::debug!(
            transport_id = %self.id,
            request_id = %request.id(),
            status = parts.status.as_u16(),
            version = ?parts.version,
            body_bytes = body.len(),
            "Response received"
        );

        Ok(RawResponse::new(parts.status, parts.version, parts.headers, body))
    }

    fn shutdown(&self) {
        if let Some(slots) = &self.slots {
            slots.close();
        }
        if self.client.swap(None).is_some() {
            tracing::info!(transport_id = %self.id, "Transport shut down");
        }
    }
}

/// Drive `exchange` to completion, noting when the client hands it a
/// connection.
async fn observe_checkout<F: Future>(
    exchange: F,
    capture: &mut CaptureConnection,
) -> (F::Output, Option<Instant>) {
    let checkout = async {
        let connected = capture.wait_for_connection_metadata().await.is_some();
        connected.then(Instant::now)
    };
    tokio::pin!(exchange);
    tokio::pin!(checkout);

    let mut checked_out = None;
    let mut watching = true;
    loop {
        tokio::select! {
            biased;
            at = &mut checkout, if watching => {
                watching = false;
                checked_out = at;
            }
            output = &mut exchange => return (output, checked_out),
        }
    }
}

fn closed() -> GatewayError {
    GatewayError::connection(ConnectionErrorKind::PoolClosed, "transport is shut down")
}

fn build_client(config: &TransportConfig, connector: GatewayConnector) -> HttpClient {
    let decoder = &config.decoder;
    let read_buffer = decoder
        .max_initial_line_length
        .saturating_add(decoder.max_header_size)
        .saturating_add(decoder.max_chunk_size)
        .max(MIN_READ_BUFFER);

    let mut builder = Client::builder(TokioExecutor::new());
    builder
        .pool_timer(TokioTimer::new())
        .timer(TokioTimer::new())
        .http1_max_buf_size(read_buffer);

    match config.pool.mode {
        PoolMode::Fixed if config.keep_alive => {
            let idle_per_host = if config.http2.enabled {
                config.http2.max_pool_size
            } else {
                config.pool.max_pool_size
            };
            builder
                .pool_idle_timeout(config.pool.max_idle_timeout())
                .pool_max_idle_per_host(idle_per_host);
        }
        _ => {
            builder.pool_max_idle_per_host(0);
        }
    }

    builder.build(connector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::policy::{OperationKind, ResourceKind};
    use http::Method;

    fn config(max_pool_size: usize, acquire_timeout_ms: u64) -> TransportConfig {
        TransportConfig {
            pool: PoolConfig {
                max_pool_size,
                acquire_timeout_ms,
                ..PoolConfig::default()
            },
            ..TransportConfig::default()
        }
    }

    fn request() -> LogicalRequest {
        LogicalRequest::new(
            Method::GET,
            "http://127.0.0.1:9/dbs".parse().unwrap(),
            ResourceKind::Database,
            OperationKind::Read,
        )
    }

    #[tokio::test]
    async fn invalid_configuration_is_rejected() {
        let result = PooledTransport::new(config(0, 10));
        assert!(matches!(result, Err(GatewayError::Configuration(_))));
    }

    #[tokio::test]
    async fn ids_are_unique_per_instance() {
        let a = PooledTransport::new(TransportConfig::default()).unwrap();
        let b = PooledTransport::new(TransportConfig::default()).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn unpooled_transport_has_no_slots() {
        let mut unpooled = TransportConfig::default();
        unpooled.pool.mode = PoolMode::Unpooled;
        let transport = PooledTransport::new(unpooled).unwrap();
        assert_eq!(transport.available_slots(), None);
    }

    #[tokio::test]
    async fn acquire_times_out_when_every_slot_is_taken() {
        let transport = PooledTransport::new(config(1, 20)).unwrap();
        let _held = transport.acquire_slot(Duration::from_secs(1)).await.unwrap();
        assert_eq!(transport.available_slots(), Some(0));

        let err = transport.acquire_slot(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Connection {
                kind: ConnectionErrorKind::AcquireTimeout,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn send_after_shutdown_fails_with_pool_closed() {
        let transport = PooledTransport::new(TransportConfig::default()).unwrap();
        transport.shutdown();
        transport.shutdown();
        assert!(transport.is_shut_down());

        let err = transport.send(&request(), Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Connection {
                kind: ConnectionErrorKind::PoolClosed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn shutdown_wakes_waiting_acquirers() {
        let transport = Arc::new(PooledTransport::new(config(1, 5_000)).unwrap());
        let held = transport.acquire_slot(Duration::from_secs(5)).await.unwrap();

        let waiter = {
            let transport = transport.clone();
            tokio::spawn(async move { transport.acquire_slot(Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        transport.shutdown();
        drop(held);

        let err = waiter.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Connection {
                kind: ConnectionErrorKind::PoolClosed,
                ..
            }
        ));
    }
}
