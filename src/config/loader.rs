//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `policy.max_retry_time_limit_secs`.
pub const MAX_RETRY_TIME_LIMIT_ENV: &str = "GATEWAY_MAX_RETRY_TIME_LIMIT_SECS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {name}: {value}")]
    Env { name: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, std::env::var(MAX_RETRY_TIME_LIMIT_ENV).ok().as_deref())
}

/// Parse TOML, apply the optional retry-limit override, then validate.
pub fn parse_config(
    content: &str,
    retry_limit_override: Option<&str>,
) -> Result<GatewayConfig, ConfigError> {
    let mut config: GatewayConfig = toml::from_str(content)?;

    if let Some(raw) = retry_limit_override {
        config.policy.max_retry_time_limit_secs =
            raw.trim().parse().map_err(|_| ConfigError::Env {
                name: MAX_RETRY_TIME_LIMIT_ENV,
                value: raw.to_string(),
            })?;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    tracing::debug!(
        max_pool_size = config.transport.pool.max_pool_size,
        http2 = config.transport.http2.enabled,
        proxy = ?config.transport.proxy,
        max_retry_time_limit_secs = config.policy.max_retry_time_limit_secs,
        "Configuration loaded"
    );

    Ok(config)
}
