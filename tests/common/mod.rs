//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gateway_transport::error::ConnectionErrorKind;
use gateway_transport::http::{LogicalRequest, RawResponse};
use gateway_transport::policy::{OperationKind, ResourceKind};
use gateway_transport::{GatewayError, Transport};
use http::{Method, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;

/// What a mock backend does with one request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// A well-formed response; the connection stays open unless the client
    /// asked to close it.
    Status(u16, String),
    /// Wait, then reply with the status.
    Delayed(Duration, u16),
    /// Write these bytes verbatim and close.
    Raw(&'static [u8]),
    /// Never answer.
    Hang,
}

/// What a mock backend has seen.
#[derive(Debug, Default)]
pub struct BackendStats {
    connections: AtomicUsize,
    heads: Mutex<Vec<String>>,
}

impl BackendStats {
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.heads.lock().unwrap().len()
    }

    /// Request line and headers of every request, lowercased.
    pub fn heads(&self) -> Vec<String> {
        self.heads.lock().unwrap().clone()
    }
}

/// Start a programmable backend on an ephemeral port. `f` receives the
/// zero-based request index.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, Arc<BackendStats>)
where
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Reply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let stats = Arc::new(BackendStats::default());
    let f = Arc::new(f);

    {
        let stats = stats.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                stats.connections.fetch_add(1, Ordering::SeqCst);
                let stats = stats.clone();
                let f = f.clone();
                tokio::spawn(serve_connection(socket, stats, f));
            }
        });
    }

    (addr, stats)
}

/// Backend that answers every request with the same reply.
pub async fn start_mock_backend(reply: Reply) -> (SocketAddr, Arc<BackendStats>) {
    start_programmable_backend(move |_| {
        let reply = reply.clone();
        async move { reply }
    })
    .await
}

async fn serve_connection<F, Fut>(mut socket: TcpStream, stats: Arc<BackendStats>, f: Arc<F>)
where
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Reply> + Send + 'static,
{
    loop {
        let Some(head) = read_request(&mut socket).await else {
            return;
        };
        let close_requested = head.contains("connection: close");
        let index = {
            let mut heads = stats.heads.lock().unwrap();
            heads.push(head);
            heads.len() - 1
        };

        let (status, body) = match f(index).await {
            Reply::Status(status, body) => (status, body),
            Reply::Delayed(delay, status) => {
                tokio::time::sleep(delay).await;
                (status, String::new())
            }
            Reply::Raw(bytes) => {
                let _ = socket.write_all(bytes).await;
                let _ = socket.shutdown().await;
                return;
            }
            Reply::Hang => {
                std::future::pending::<()>().await;
                return;
            }
        };

        let connection = if close_requested { "close" } else { "keep-alive" };
        let response = format!(
            "HTTP/1.1 {status} {}\r\nContent-Length: {}\r\nConnection: {connection}\r\n\r\n{body}",
            reason(status),
            body.len(),
        );
        if socket.write_all(response.as_bytes()).await.is_err() || close_requested {
            let _ = socket.shutdown().await;
            return;
        }
    }
}

/// Read one request head (and discard its body). `None` on EOF.
async fn read_request(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut remaining = content_length.saturating_sub(buf.len() - header_end);
    while remaining > 0 {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        remaining = remaining.saturating_sub(n);
    }
    Some(head)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        404 => "Not Found",
        408 => "Request Timeout",
        409 => "Conflict",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn request(
    addr: SocketAddr,
    method: Method,
    resource: ResourceKind,
    operation: OperationKind,
) -> LogicalRequest {
    let uri = format!("http://{addr}/dbs/db/colls/coll/docs").parse().unwrap();
    LogicalRequest::new(method, uri, resource, operation)
}

/// One scripted outcome of [`ScriptedTransport`].
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Status(StatusCode),
    Malformed,
    Refused,
    Hang,
}

/// In-memory transport replaying a script of outcomes; the last step repeats.
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Step>,
    calls: Mutex<Vec<(Instant, Duration)>>,
    shutdowns: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        let last = *steps.last().expect("script needs at least one step");
        Self {
            steps: Mutex::new(steps.into()),
            last: Mutex::new(last),
            calls: Mutex::new(Vec::new()),
            shutdowns: AtomicUsize::new(0),
        }
    }

    pub fn always(step: Step) -> Self {
        Self::new(vec![step])
    }

    /// Start instant and timeout of every attempt, in order.
    pub fn calls(&self) -> Vec<(Instant, Duration)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        match steps.pop_front() {
            Some(step) => {
                *self.last.lock().unwrap() = step;
                step
            }
            None => *self.last.lock().unwrap(),
        }
    }
}

impl Transport for ScriptedTransport {
    async fn send(
        &self,
        _request: &LogicalRequest,
        timeout: Duration,
    ) -> Result<RawResponse, GatewayError> {
        self.calls.lock().unwrap().push((Instant::now(), timeout));
        match self.next_step() {
            Step::Status(status) => Ok(RawResponse::from_status(status)),
            Step::Malformed => Err(GatewayError::Protocol("invalid HTTP status line".into())),
            Step::Refused => Err(GatewayError::connection(
                ConnectionErrorKind::Connect,
                "connection refused",
            )),
            Step::Hang => std::future::pending().await,
        }
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}
