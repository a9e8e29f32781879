//! HTTP scrape endpoint for a metrics registry.
//!
//! A small HTTP/1.1 responder: it reads the request line, skips
//! the headers, answers `GET /metrics` with the text exposition of the
//! registry and anything else with `404`. Every response closes the
//! connection.

use crate::error::MetricsError;
use prometheus::{Encoder, Registry, TextEncoder};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const METRICS_PATH: &str = "/metrics";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle to a running scrape endpoint.
pub struct MetricsServer {
    local_addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl MetricsServer {
    /// Address the listener is bound to (useful when binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the accept loop to exit after cancellation.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            warn!("Metrics server task failed: {e}");
        }
    }
}

/// Render the registry in the Prometheus text format.
pub fn render(registry: &Registry) -> Result<Vec<u8>, MetricsError> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    Ok(buffer)
}

/// Bind `addr` and serve `registry` until `cancel` fires.
///
/// The listener is bound before this returns; bind errors surface here.
pub async fn serve_metrics(
    addr: &str,
    registry: Registry,
    cancel: CancellationToken,
) -> Result<MetricsServer, MetricsError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| MetricsError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    let local_addr = listener.local_addr()?;
    info!("Serving metrics on http://{local_addr}{METRICS_PATH}");

    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Metrics server on {local_addr} shutting down");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let registry = registry.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, &registry).await {
                                debug!("Error handling metrics request from {peer}: {e}");
                            }
                        });
                    }
                    Err(e) => warn!("Error accepting metrics connection: {e}"),
                },
            }
        }
    });

    Ok(MetricsServer { local_addr, handle })
}

async fn handle_connection(mut stream: TcpStream, registry: &Registry) -> Result<(), MetricsError> {
    let request_line = match tokio::time::timeout(REQUEST_TIMEOUT, read_request_line(&mut stream)).await
    {
        Ok(line) => line?,
        Err(_) => return Ok(()),
    };

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let path = parts.next().unwrap_or_default();

    let (status, content_type, body) = if method == "GET" && path == METRICS_PATH {
        ("200 OK", TextEncoder::new().format_type().to_string(), render(registry)?)
    } else {
        (
            "404 Not Found",
            "text/plain; charset=utf-8".to_string(),
            b"Not Found\n".to_vec(),
        )
    };

    let header = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(header.as_bytes()).await?;
    stream.write_all(&body).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Read the request line and discard headers up to the blank line.
async fn read_request_line(stream: &mut TcpStream) -> Result<String, MetricsError> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    let mut header = String::new();
    loop {
        header.clear();
        let read = reader.read_line(&mut header).await?;
        if read == 0 || header.trim_end().is_empty() {
            break;
        }
    }

    Ok(request_line.trim_end().to_string())
}
