//! Outbound connector: TCP, optional HTTP proxy, optional TLS.
//!
//! # Responsibilities
//! - Dial the target (or the proxy) with a bounded connect timeout
//! - Tunnel HTTPS targets through the proxy with `CONNECT`
//! - Run the rustls handshake and report whether `h2` was negotiated
//! - Stamp establishment and every write on the connection's trace
//! - Classify every dial failure so the transport can surface a distinct
//!   `ConnectionErrorKind`
//!
//! # Design Decisions
//! - Plain-HTTP targets behind a proxy are marked as proxied, so hyper sends
//!   the request line in absolute form
//! - The connector is a `tower::Service<Uri>`, which is what the hyper-util
//!   pooled client expects

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use http::uri::Scheme;
use http::Uri;
use hyper_util::client::legacy::connect::{Connected, Connection, HttpConnector};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use rustls::ClientConfig;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tower::{Service, ServiceExt};

use crate::error::{BoxError, ConnectionErrorKind};
use crate::transport::trace::ConnectionTrace;

/// Largest proxy reply to a `CONNECT` we are willing to buffer.
const MAX_TUNNEL_RESPONSE: usize = 8 * 1024;

/// Failure while establishing a connection.
#[derive(Debug, Error)]
pub enum DialError {
    #[error("connect failed: {0}")]
    Connect(#[source] BoxError),

    #[error("TLS handshake failed: {0}")]
    Tls(#[source] io::Error),

    #[error("proxy tunnel failed: {0}")]
    Proxy(String),

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("I/O error while dialing: {0}")]
    Io(#[from] io::Error),
}

impl DialError {
    pub fn kind(&self) -> ConnectionErrorKind {
        match self {
            DialError::Connect(_) | DialError::InvalidTarget(_) => ConnectionErrorKind::Connect,
            DialError::Tls(_) => ConnectionErrorKind::Tls,
            DialError::Proxy(_) => ConnectionErrorKind::Proxy,
            DialError::Io(_) => ConnectionErrorKind::Io,
        }
    }
}

/// Connector settings shared by every dial of one transport.
#[derive(Clone)]
pub struct GatewayConnector {
    http: HttpConnector,
    tls: TlsConnector,
    proxy: Option<Uri>,
}

impl GatewayConnector {
    pub fn new(
        tls: Arc<ClientConfig>,
        proxy: Option<Uri>,
        connect_timeout: Duration,
        keep_alive: bool,
    ) -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_nodelay(true);
        http.set_connect_timeout(Some(connect_timeout));
        http.set_keepalive(keep_alive.then_some(Duration::from_secs(60)));

        Self {
            http,
            tls: TlsConnector::from(tls),
            proxy,
        }
    }

    async fn dial(self, target: Uri) -> Result<GatewayStream, DialError> {
        let https = target.scheme() == Some(&Scheme::HTTPS);
        let host = target
            .host()
            .ok_or_else(|| DialError::InvalidTarget(format!("{target} has no host")))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = target
            .port_u16()
            .unwrap_or(if https { 443 } else { 80 });

        match (self.proxy.clone(), https) {
            (Some(proxy), false) => {
                let tcp = self.tcp(proxy).await?;
                Ok(GatewayStream::plain(tcp, true, Instant::now()))
            }
            (Some(proxy), true) => {
                let mut tcp = self.tcp(proxy).await?;
                let established = Instant::now();
                tunnel(&mut tcp, &host, port).await?;
                self.handshake(tcp, host, established).await
            }
            (None, false) => {
                let tcp = self.tcp(target).await?;
                Ok(GatewayStream::plain(tcp, false, Instant::now()))
            }
            (None, true) => {
                let tcp = self.tcp(target).await?;
                self.handshake(tcp, host, Instant::now()).await
            }
        }
    }

    async fn tcp(&self, uri: Uri) -> Result<TcpStream, DialError> {
        let io = self
            .http
            .clone()
            .oneshot(uri)
            .await
            .map_err(|e| DialError::Connect(Box::new(e)))?;
        Ok(io.into_inner())
    }

    async fn handshake(
        &self,
        tcp: TcpStream,
        host: String,
        established: Instant,
    ) -> Result<GatewayStream, DialError> {
        let server_name = ServerName::try_from(host)
            .map_err(|e| DialError::InvalidTarget(e.to_string()))?;
        let tls = self
            .tls
            .connect(server_name, tcp)
            .await
            .map_err(DialError::Tls)?;
        Ok(GatewayStream::tls(tls, established))
    }
}

impl Service<Uri> for GatewayConnector {
    type Response = GatewayStream;
    type Error = DialError;
    type Future = Pin<Box<dyn Future<Output = Result<GatewayStream, DialError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, target: Uri) -> Self::Future {
        let this = self.clone();
        Box::pin(this.dial(target))
    }
}

/// Open a `CONNECT` tunnel to `host:port` over an established proxy connection.
async fn tunnel(stream: &mut TcpStream, host: &str, port: u16) -> Result<(), DialError> {
    let authority = if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };
    let request = format!("CONNECT {authority} HTTP/1.1\r\nHost: {authority}\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut reply = Vec::with_capacity(256);
    let mut chunk = [0u8; 512];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(DialError::Proxy("proxy closed the connection during CONNECT".into()));
        }
        reply.extend_from_slice(&chunk[..n]);
        if reply.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        if reply.len() > MAX_TUNNEL_RESPONSE {
            return Err(DialError::Proxy("CONNECT reply headers too large".into()));
        }
    }

    let status_line = reply
        .split(|b| *b == b'\n')
        .next()
        .map(|line| String::from_utf8_lossy(line).trim().to_string())
        .unwrap_or_default();
    let status = status_line.split_whitespace().nth(1);
    if status_line.starts_with("HTTP/1.") && status == Some("200") {
        Ok(())
    } else {
        Err(DialError::Proxy(format!("CONNECT {authority} refused: {status_line}")))
    }
}

enum Inner {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for Inner {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Inner::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Inner::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Inner {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Inner::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Inner::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Inner::Plain(s) => Pin::new(s).poll_flush(cx),
            Inner::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Inner::Plain(s) => Pin::new(s).poll_shutdown(cx),
            Inner::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// A dialed connection, plain or TLS.
///
/// Readiness is stamped on construction, once every dial step is done.
pub struct GatewayStream {
    io: TokioIo<Inner>,
    proxied: bool,
    h2: bool,
    trace: ConnectionTrace,
    unflushed: bool,
}

impl GatewayStream {
    fn plain(tcp: TcpStream, proxied: bool, established: Instant) -> Self {
        Self {
            io: TokioIo::new(Inner::Plain(tcp)),
            proxied,
            h2: false,
            trace: ConnectionTrace::new(established, Instant::now()),
            unflushed: false,
        }
    }

    fn tls(stream: TlsStream<TcpStream>, established: Instant) -> Self {
        let h2 = stream.get_ref().1.alpn_protocol() == Some(b"h2".as_slice());
        Self {
            io: TokioIo::new(Inner::Tls(Box::new(stream))),
            proxied: false,
            h2,
            trace: ConnectionTrace::new(established, Instant::now()),
            unflushed: false,
        }
    }

    pub fn trace(&self) -> &ConnectionTrace {
        &self.trace
    }
}

impl Connection for GatewayStream {
    fn connected(&self) -> Connected {
        let connected = Connected::new()
            .proxy(self.proxied)
            .extra(self.trace.clone());
        if self.h2 {
            connected.negotiated_h2()
        } else {
            connected
        }
    }
}

impl hyper::rt::Read for GatewayStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: hyper::rt::ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        hyper::rt::Read::poll_read(Pin::new(&mut self.get_mut().io), cx, buf)
    }
}

impl hyper::rt::Write for GatewayStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let written = hyper::rt::Write::poll_write(Pin::new(&mut this.io), cx, buf);
        if let Poll::Ready(Ok(n)) = written {
            if n > 0 {
                this.trace.record_write();
                this.unflushed = true;
            }
        }
        written
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let flushed = hyper::rt::Write::poll_flush(Pin::new(&mut this.io), cx);
        if matches!(flushed, Poll::Ready(Ok(()))) && this.unflushed {
            this.unflushed = false;
            this.trace.record_write();
        }
        flushed
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        hyper::rt::Write::poll_shutdown(Pin::new(&mut self.get_mut().io), cx)
    }
}
