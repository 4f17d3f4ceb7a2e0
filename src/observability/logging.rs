//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` wins over the configured default filter
//! - Installing twice is not an error, so tests and host applications can
//!   both call `init`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Install a global `fmt` subscriber filtered by `RUST_LOG` or `default_filter`.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

/// Install the global subscriber with the configured `log_filter` as the
/// default.
pub fn init_from(config: &ObservabilityConfig) -> bool {
    init(&config.log_filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        init("gateway_transport=debug");
        assert!(!init("gateway_transport=debug"));
    }

    #[test]
    fn configured_filter_installs_once() {
        let config = ObservabilityConfig {
            log_filter: "gateway_transport=trace".to_string(),
        };
        init_from(&config);
        assert!(!init_from(&config));
    }
}
