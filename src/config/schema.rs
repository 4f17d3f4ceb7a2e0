//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway
//! transport. All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Pooled HTTP transport settings.
    pub transport: TransportConfig,

    /// Timeout policy settings.
    pub policy: PolicyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Transport configuration.
///
/// Two transports built from equal configurations are interchangeable, so this
/// type is also the key of the shared transport registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Connection pool bounds.
    pub pool: PoolConfig,

    /// HTTP/2 settings.
    pub http2: Http2Config,

    /// Response decoder limits.
    pub decoder: DecoderLimits,

    /// Optional HTTP proxy (e.g., "http://127.0.0.1:3128").
    pub proxy: Option<String>,

    /// TLS trust configuration.
    pub tls: TlsConfig,

    /// Reuse connections between requests.
    pub keep_alive: bool,

    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            http2: Http2Config::default(),
            decoder: DecoderLimits::default(),
            proxy: None,
            tls: TlsConfig::default(),
            keep_alive: true,
            connect_timeout_ms: 45_000,
        }
    }
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Number of requests that may be in flight at once, or `None` when the
    /// transport is unpooled.
    pub fn slot_capacity(&self) -> Option<usize> {
        match self.pool.mode {
            PoolMode::Unpooled => None,
            PoolMode::Fixed if self.http2.enabled => Some(
                self.http2
                    .max_pool_size
                    .saturating_mul(self.http2.max_concurrent_streams),
            ),
            PoolMode::Fixed => Some(self.pool.max_pool_size),
        }
    }
}

/// How connections are managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PoolMode {
    /// Bounded connection count, idle eviction, bounded acquire wait.
    #[default]
    Fixed,
    /// Always dial a fresh connection.
    Unpooled,
}

/// Connection pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    pub mode: PoolMode,

    /// Maximum number of connections.
    pub max_pool_size: usize,

    /// Lower bound on the pool size, checked against `max_pool_size` and
    /// part of the transport's identity. Connections are dialed on demand;
    /// none are opened ahead of the first request.
    pub min_pool_size: usize,

    /// Idle connections are evicted after this many seconds.
    pub max_idle_timeout_secs: u64,

    /// Maximum wait for a free pool slot in milliseconds.
    pub acquire_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            mode: PoolMode::Fixed,
            max_pool_size: 1000,
            min_pool_size: 1,
            max_idle_timeout_secs: 60,
            acquire_timeout_ms: 45_000,
        }
    }
}

impl PoolConfig {
    pub fn max_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.max_idle_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

/// HTTP/2 configuration. Only used for TLS connections that negotiate `h2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(default)]
pub struct Http2Config {
    pub enabled: bool,
    pub max_pool_size: usize,
    /// Validated and part of the transport's identity like
    /// `PoolConfig::min_pool_size`; connections are not pre-dialed.
    pub min_pool_size: usize,
    pub max_concurrent_streams: usize,
}

impl Default for Http2Config {
    fn default() -> Self {
        Self {
            enabled: false,
            max_pool_size: 1000,
            min_pool_size: 1,
            max_concurrent_streams: 30,
        }
    }
}

/// Limits applied while decoding responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(default)]
pub struct DecoderLimits {
    pub max_initial_line_length: usize,
    pub max_header_size: usize,
    pub max_chunk_size: usize,
    /// Responses with larger bodies fail with a protocol error.
    pub max_response_body_bytes: usize,
}

impl Default for DecoderLimits {
    fn default() -> Self {
        Self {
            max_initial_line_length: 4096,
            max_header_size: 16 * 1024,
            max_chunk_size: 8 * 1024,
            max_response_body_bytes: 256 * 1024 * 1024,
        }
    }
}

/// TLS trust configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Trust the bundled Mozilla root store.
    pub use_webpki_roots: bool,

    /// Additional PEM bundle of trusted CA certificates.
    pub ca_bundle_path: Option<PathBuf>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            use_webpki_roots: true,
            ca_bundle_path: None,
        }
    }
}

/// Timeout policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Overall retry budget callers apply on top of the per-attempt schedule.
    pub max_retry_time_limit_secs: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_retry_time_limit_secs: 60,
        }
    }
}

impl PolicyConfig {
    pub fn max_retry_time_limit(&self) -> Duration {
        Duration::from_secs(self.max_retry_time_limit_secs)
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default `tracing` filter when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "gateway_transport=info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_configs_hash_to_the_same_key() {
        use std::collections::HashSet;

        let mut keys = HashSet::new();
        keys.insert(TransportConfig::default());
        keys.insert(TransportConfig::default());
        assert_eq!(keys.len(), 1);

        let mut other = TransportConfig::default();
        other.pool.max_pool_size = 5;
        keys.insert(other);
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn slot_capacity_follows_pool_mode() {
        let mut config = TransportConfig::default();
        config.pool.max_pool_size = 8;
        assert_eq!(config.slot_capacity(), Some(8));

        config.http2.enabled = true;
        config.http2.max_pool_size = 2;
        config.http2.max_concurrent_streams = 10;
        assert_eq!(config.slot_capacity(), Some(20));

        config.pool.mode = PoolMode::Unpooled;
        assert_eq!(config.slot_capacity(), None);
    }
}
