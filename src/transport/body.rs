//! Response buffering and client error classification.

use std::error::Error as StdError;

use bytes::Bytes;
use http_body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};

use crate::error::{ConnectionErrorKind, GatewayError};
use crate::transport::connector::DialError;

/// Buffer a response body in full, failing if it exceeds `limit` bytes.
///
/// Dropping the returned future releases whatever was received so far.
pub async fn buffer_body<B>(body: B, limit: usize) -> Result<Bytes, GatewayError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.is::<LengthLimitError>() => Err(GatewayError::Protocol(format!(
            "response body exceeds {limit} bytes"
        ))),
        Err(err) => Err(classify_error(&*err)),
    }
}

/// Map a client or body error to the transport's error taxonomy by walking
/// its source chain.
pub fn classify_error(err: &(dyn StdError + 'static)) -> GatewayError {
    let message = error_chain(err);
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(dial) = e.downcast_ref::<DialError>() {
            return GatewayError::connection(dial.kind(), message);
        }
        if let Some(hyper_err) = e.downcast_ref::<hyper::Error>() {
            if hyper_err.is_parse()
                || hyper_err.is_parse_status()
                || hyper_err.is_parse_too_large()
            {
                return GatewayError::Protocol(message);
            }
            return GatewayError::connection(ConnectionErrorKind::Io, message);
        }
        current = e.source();
    }
    GatewayError::connection(ConnectionErrorKind::Io, message)
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(e) = current {
        message.push_str(": ");
        message.push_str(&e.to_string());
        current = e.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;

    #[tokio::test]
    async fn buffering_enforces_the_limit() {
        let ok = buffer_body(Full::new(Bytes::from_static(b"12345")), 5).await.unwrap();
        assert_eq!(ok.as_ref(), b"12345");

        let err = buffer_body(Full::new(Bytes::from_static(b"123456")), 5).await.unwrap_err();
        assert!(matches!(err, GatewayError::Protocol(_)));
    }

    #[test]
    fn dial_errors_in_the_chain_keep_their_kind() {
        let dial = DialError::Proxy("407".into());
        match classify_error(&dial) {
            GatewayError::Connection { kind, .. } => assert_eq!(kind, ConnectionErrorKind::Proxy),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_errors_are_io() {
        let err = std::io::Error::from(std::io::ErrorKind::ConnectionReset);
        assert!(matches!(
            classify_error(&err),
            GatewayError::Connection {
                kind: ConnectionErrorKind::Io,
                ..
            }
        ));
    }
}
