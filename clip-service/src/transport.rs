//! Newline-delimited JSON over Unix sockets
//!
//! Both the dispatcher and the page agent listen with `serve`; every process
//! that talks to them uses `ServiceClient`.

use crate::message::{Request, Response};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest request line a server accepts, matching the native-messaging cap
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Timed out waiting for {0:?}")]
    Timeout(PathBuf),
    #[error("Connection closed before a response arrived")]
    Closed,
}

/// Something that answers protocol requests
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, request: Request) -> Response;
}

/// Bind `socket_path`, replacing a stale socket file
pub fn bind(socket_path: &Path) -> std::io::Result<UnixListener> {
    if socket_path.exists() {
        std::fs::remove_file(socket_path)?;
    }
    if let Some(parent) = socket_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    UnixListener::bind(socket_path)
}

/// Accept connections forever, serving each on its own task
pub async fn serve<H: Handler>(listener: UnixListener, handler: Arc<H>) -> std::io::Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, handler).await {
                        error!("Connection error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Accept error: {}", e);
            }
        }
    }
}

/// Serve one client connection until it hangs up
async fn handle_connection<H: Handler>(
    stream: UnixStream,
    handler: Arc<H>,
) -> Result<(), TransportError> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    // One JSON request per line
    loop {
        let limit = MAX_REQUEST_BYTES as u64 + 1;
        if (&mut reader).take(limit).read_line(&mut line).await? == 0 {
            break;
        }

        if line.len() > MAX_REQUEST_BYTES && !line.ends_with('\n') {
            warn!("Dropping connection after a request over {} bytes", MAX_REQUEST_BYTES);
            let response = Response::error(&format!(
                "Parse error: request exceeds {} bytes",
                MAX_REQUEST_BYTES
            ));
            write_response(&mut writer, &response).await?;
            break;
        }

        if line.trim().is_empty() {
            line.clear();
            continue;
        }

        let response = match Request::from_json(&line) {
            Ok(request) => {
                debug!("Received request: {:?}", request);
                handler.handle(request).await
            }
            Err(e) => {
                warn!("Failed to parse request: {}", e);
                Response::error(&format!("Parse error: {}", e))
            }
        };

        write_response(&mut writer, &response).await?;
        line.clear();
    }

    Ok(())
}

async fn write_response(writer: &mut OwnedWriteHalf, response: &Response) -> Result<(), TransportError> {
    let response_json = serde_json::to_string(response)?;
    writer.write_all(response_json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Client for a service socket; one connection per request
#[derive(Debug, Clone)]
pub struct ServiceClient {
    socket_path: PathBuf,
}

impl ServiceClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    /// Send one request and wait for its response
    pub async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let line = serde_json::to_string(request)?;
        let raw = self.send_raw(&line).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Send one already-encoded JSON line and return the raw response line
    pub async fn send_raw(&self, line: &str) -> Result<String, TransportError> {
        tokio::time::timeout(DEFAULT_CLIENT_TIMEOUT, self.exchange(line))
            .await
            .map_err(|_| TransportError::Timeout(self.socket_path.clone()))?
    }

    async fn exchange(&self, line: &str) -> Result<String, TransportError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (reader, mut writer) = stream.into_split();

        writer.write_all(line.trim_end().as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        let mut reader = BufReader::new(reader);
        let mut response = String::new();
        if reader.read_line(&mut response).await? == 0 {
            return Err(TransportError::Closed);
        }
        Ok(response.trim_end().to_string())
    }
}

/// Remove a socket file on shutdown
pub fn cleanup_socket(socket_path: &Path) {
    if socket_path.exists() {
        match std::fs::remove_file(socket_path) {
            Ok(()) => info!("Removed socket {:?}", socket_path),
            Err(e) => warn!("Failed to remove socket {:?}: {}", socket_path, e),
        }
    }
}
