//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (sizes and timeouts > 0, min <= max)
//! - Check the proxy address parses as an absolute http URI
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use http::Uri;
use thiserror::Error;

use crate::config::schema::{GatewayConfig, TransportConfig};

/// A single semantic violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Validate the whole configuration tree.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_transport(&config.transport)
        .err()
        .unwrap_or_default();

    if config.policy.max_retry_time_limit_secs == 0 {
        errors.push(ValidationError::new(
            "policy.max_retry_time_limit_secs",
            "must be greater than zero",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a transport configuration on its own.
pub fn validate_transport(config: &TransportConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let pool = &config.pool;
    if pool.max_pool_size == 0 {
        errors.push(ValidationError::new("pool.max_pool_size", "must be greater than zero"));
    }
    if pool.min_pool_size > pool.max_pool_size {
        errors.push(ValidationError::new(
            "pool.min_pool_size",
            format!("{} exceeds max_pool_size {}", pool.min_pool_size, pool.max_pool_size),
        ));
    }
    if pool.acquire_timeout_ms == 0 {
        errors.push(ValidationError::new("pool.acquire_timeout_ms", "must be greater than zero"));
    }
    if pool.max_idle_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "pool.max_idle_timeout_secs",
            "must be greater than zero",
        ));
    }
    if config.connect_timeout_ms == 0 {
        errors.push(ValidationError::new("connect_timeout_ms", "must be greater than zero"));
    }

    let http2 = &config.http2;
    if http2.enabled {
        if http2.max_pool_size == 0 {
            errors.push(ValidationError::new("http2.max_pool_size", "must be greater than zero"));
        }
        if http2.min_pool_size > http2.max_pool_size {
            errors.push(ValidationError::new(
                "http2.min_pool_size",
                format!("{} exceeds max_pool_size {}", http2.min_pool_size, http2.max_pool_size),
            ));
        }
        if http2.max_concurrent_streams == 0 {
            errors.push(ValidationError::new(
                "http2.max_concurrent_streams",
                "must be greater than zero",
            ));
        }
    }

    let decoder = &config.decoder;
    for (field, value) in [
        ("decoder.max_initial_line_length", decoder.max_initial_line_length),
        ("decoder.max_header_size", decoder.max_header_size),
        ("decoder.max_chunk_size", decoder.max_chunk_size),
        ("decoder.max_response_body_bytes", decoder.max_response_body_bytes),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if let Some(proxy) = &config.proxy {
        match proxy.parse::<Uri>() {
            Ok(uri) if uri.scheme_str() == Some("http") && uri.host().is_some() => {}
            Ok(_) => errors.push(ValidationError::new(
                "proxy",
                format!("{proxy} must be an absolute http:// address"),
            )),
            Err(e) => errors.push(ValidationError::new("proxy", format!("{proxy}: {e}"))),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn reports_every_violation() {
        let mut config = GatewayConfig::default();
        config.transport.pool.max_pool_size = 0;
        config.transport.pool.acquire_timeout_ms = 0;
        config.transport.proxy = Some("socks5://proxy:1080".into());
        config.policy.max_retry_time_limit_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"pool.max_pool_size"));
        assert!(fields.contains(&"pool.min_pool_size"));
        assert!(fields.contains(&"pool.acquire_timeout_ms"));
        assert!(fields.contains(&"proxy"));
        assert!(fields.contains(&"policy.max_retry_time_limit_secs"));
    }

    #[test]
    fn http2_limits_only_checked_when_enabled() {
        let mut config = TransportConfig::default();
        config.http2.max_concurrent_streams = 0;
        assert!(validate_transport(&config).is_ok());

        config.http2.enabled = true;
        let errors = validate_transport(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "http2.max_concurrent_streams");
    }
}
