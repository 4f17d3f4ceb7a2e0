//! TLS client configuration.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use rustls::{ClientConfig, RootCertStore};

use crate::config::TlsConfig;
use crate::error::GatewayError;

/// Build the rustls client configuration for a transport.
///
/// ALPN offers `h2` ahead of `http/1.1` only when HTTP/2 is enabled.
pub fn client_config(tls: &TlsConfig, offer_h2: bool) -> Result<Arc<ClientConfig>, GatewayError> {
    let mut roots = RootCertStore::empty();
    if tls.use_webpki_roots {
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    if let Some(path) = &tls.ca_bundle_path {
        let file = File::open(path).map_err(|e| {
            GatewayError::Configuration(format!("CA bundle {}: {e}", path.display()))
        })?;
        let mut reader = BufReader::new(file);
        for cert in rustls_pemfile::certs(&mut reader) {
            let cert = cert.map_err(|e| {
                GatewayError::Configuration(format!("CA bundle {}: {e}", path.display()))
            })?;
            roots.add(cert).map_err(|e| {
                GatewayError::Configuration(format!("CA bundle {}: {e}", path.display()))
            })?;
        }
    }

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| GatewayError::Configuration(format!("TLS: {e}")))?
        .with_root_certificates(roots)
        .with_no_client_auth();

    config.alpn_protocols = if offer_h2 {
        vec![b"h2".to_vec(), b"http/1.1".to_vec()]
    } else {
        vec![b"http/1.1".to_vec()]
    };

    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpn_follows_http2_setting() {
        let config = client_config(&TlsConfig::default(), false).unwrap();
        assert_eq!(config.alpn_protocols, vec![b"http/1.1".to_vec()]);

        let config = client_config(&TlsConfig::default(), true).unwrap();
        assert_eq!(config.alpn_protocols[0], b"h2".to_vec());
    }

    #[test]
    fn missing_ca_bundle_is_a_configuration_error() {
        let tls = TlsConfig {
            use_webpki_roots: false,
            ca_bundle_path: Some("/nonexistent/gateway-ca.pem".into()),
        };
        assert!(matches!(
            client_config(&tls, false),
            Err(GatewayError::Configuration(_))
        ));
    }
}
