//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, deserialize, env override)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → TransportConfig handed to PooledTransport / shared registry
//!     → PolicyConfig handed to PolicyRegistry
//! ```
//!
//! # Design Decisions
//! - Config is immutable once a transport is built from it
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    DecoderLimits, GatewayConfig, Http2Config, ObservabilityConfig, PolicyConfig, PoolConfig,
    PoolMode, TlsConfig, TransportConfig,
};
pub use validation::{validate_config, validate_transport, ValidationError};
