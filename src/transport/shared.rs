//! Reference-counted registry of shared transports.
//!
//! Several logical clients in one process that use the same transport
//! configuration share one pooled transport. The registry counts
//! acquisitions per configuration and tears the transport down when the
//! last holder releases it.
//!
//! # Invariants
//! - At most one live transport per configuration
//! - Creation, increment, decrement and teardown all happen under one lock,
//!   so an `acquire` never observes a transport that is being shut down
//! - Releases never outnumber acquisitions (asserted)

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use crate::config::TransportConfig;
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::transport::pooled::PooledTransport;
use crate::transport::Transport;

/// Builds a transport for a configuration the registry has not seen live.
pub type TransportFactory<T> =
    Box<dyn Fn(&TransportConfig) -> Result<T, GatewayError> + Send + Sync>;

struct Entry<T> {
    transport: Arc<T>,
    ref_count: usize,
}

/// A counted reference to a shared transport.
///
/// Hand it back with [`SharedTransportRegistry::release`]. A handle that is
/// dropped without being released keeps its transport alive.
pub struct SharedTransportHandle<T = PooledTransport> {
    key: TransportConfig,
    transport: Arc<T>,
}

impl<T> SharedTransportHandle<T> {
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn config(&self) -> &TransportConfig {
        &self.key
    }
}

impl<T> std::ops::Deref for SharedTransportHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.transport
    }
}

pub struct SharedTransportRegistry<T = PooledTransport> {
    entries: Mutex<HashMap<TransportConfig, Entry<T>>>,
    factory: TransportFactory<T>,
}

impl SharedTransportRegistry<PooledTransport> {
    pub fn new() -> Self {
        Self::with_factory(Box::new(|config| PooledTransport::new(config.clone())))
    }

    /// The process-wide registry of pooled transports.
    pub fn global() -> &'static SharedTransportRegistry<PooledTransport> {
        static GLOBAL: OnceLock<SharedTransportRegistry<PooledTransport>> = OnceLock::new();
        GLOBAL.get_or_init(SharedTransportRegistry::new)
    }
}

impl Default for SharedTransportRegistry<PooledTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> SharedTransportRegistry<T> {
    pub fn with_factory(factory: TransportFactory<T>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            factory,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TransportConfig, Entry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the live transport for `config`, creating it if needed.
    pub fn acquire(
        &self,
        config: &TransportConfig,
    ) -> Result<SharedTransportHandle<T>, GatewayError> {
        let mut entries = self.lock();

        if let Some(entry) = entries.get_mut(config) {
            entry.ref_count += 1;
            tracing::debug!(ref_count = entry.ref_count, "Reusing shared transport");
            return Ok(SharedTransportHandle {
                key: config.clone(),
                transport: entry.transport.clone(),
            });
        }

        let transport = Arc::new((self.factory)(config)?);
        entries.insert(
            config.clone(),
            Entry {
                transport: transport.clone(),
                ref_count: 1,
            },
        );
        metrics::record_shared_transports(entries.len());
        tracing::info!(live = entries.len(), "Shared transport created");

        Ok(SharedTransportHandle {
            key: config.clone(),
            transport,
        })
    }

    /// Give back a handle. The last release shuts the transport down before
    /// the entry is removed, with the registry lock held throughout.
    pub fn release(&self, handle: SharedTransportHandle<T>) {
        let mut entries = self.lock();

        let entry = entries.get_mut(&handle.key);
        assert!(
            entry
                .as_ref()
                .is_some_and(|e| Arc::ptr_eq(&e.transport, &handle.transport)),
            "released a transport that has no live registry entry"
        );
        let Some(entry) = entry else {
            return;
        };
        assert!(entry.ref_count > 0, "shared transport reference count underflow");

        entry.ref_count -= 1;
        if entry.ref_count > 0 {
            tracing::debug!(ref_count = entry.ref_count, "Released shared transport");
            return;
        }

        entry.transport.shutdown();
        entries.remove(&handle.key);
        metrics::record_teardown();
        metrics::record_shared_transports(entries.len());
        tracing::info!(live = entries.len(), "Shared transport torn down");
    }

    /// Current reference count for `config` (zero when not live).
    pub fn ref_count(&self, config: &TransportConfig) -> usize {
        self.lock().get(config).map_or(0, |e| e.ref_count)
    }

    pub fn live_transports(&self) -> usize {
        self.lock().len()
    }
}
