use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {path:?}: {source}")]
    Connect { path: PathBuf, source: io::Error },
    #[error("send failed: {source}")]
    Send { source: io::Error },
    #[error("not connected")]
    NotConnected,
}

/// Trait for message delivery adapters.
///
/// An implementation owns at most one live connection. It never
/// reconnects on its own: a failed `send` leaves the broken handle in
/// place for the caller to `close` and `connect` again, so every failure
/// stays visible and counted.
pub trait Transport: Send {
    fn name(&self) -> &'static str;

    /// Establish a fresh connection, closing any existing one first.
    fn connect(&mut self)
        -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>>;

    /// Write the payload plus a single `\n` terminator as one frame.
    /// Returns the number of bytes written, newline included.
    fn send<'a>(
        &'a mut self,
        payload: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<u64, TransportError>> + Send + 'a>>;

    /// Drop the connection if any; idempotent.
    fn close(&mut self);
}

/// Production transport: a Unix-domain stream socket.
pub struct UnixSocketTransport {
    path: PathBuf,
    stream: Option<UnixStream>,
    buf: Vec<u8>,
}

impl UnixSocketTransport {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            stream: None,
            buf: Vec::new(),
        }
    }
}

impl Transport for UnixSocketTransport {
    fn name(&self) -> &'static str {
        "unix"
    }

    fn connect(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>> {
        Box::pin(async move {
            self.stream = None;
            let stream =
                UnixStream::connect(&self.path)
                    .await
                    .map_err(|source| TransportError::Connect {
                        path: self.path.clone(),
                        source,
                    })?;
            self.stream = Some(stream);
            Ok(())
        })
    }

    fn send<'a>(
        &'a mut self,
        payload: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<u64, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            let Self { stream, buf, .. } = self;
            let stream = stream.as_mut().ok_or(TransportError::NotConnected)?;

            buf.clear();
            buf.extend_from_slice(payload.as_bytes());
            buf.push(b'\n');

            stream
                .write_all(buf.as_slice())
                .await
                .map_err(|source| TransportError::Send { source })?;
            Ok(buf.len() as u64)
        })
    }

    fn close(&mut self) {
        self.stream = None;
    }
}

/// In-memory transport for exercising the scheduler without a socket.
/// Every send succeeds; payloads and connect calls are recorded.
#[derive(Debug, Default)]
pub struct MockTransport {
    pub sent: Vec<String>,
    pub connects: u64,
    connected: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for MockTransport {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn connect(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>> {
        Box::pin(async move {
            self.connects += 1;
            self.connected = true;
            Ok(())
        })
    }

    fn send<'a>(
        &'a mut self,
        payload: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<u64, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            if !self.connected {
                return Err(TransportError::NotConnected);
            }
            self.sent.push(payload.to_string());
            Ok(payload.len() as u64 + 1)
        })
    }

    fn close(&mut self) {
        self.connected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_to_missing_socket_fails() {
        let mut transport = UnixSocketTransport::new("/nonexistent/ingest.sock");
        let err = transport.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }

    #[tokio::test]
    async fn test_send_without_connection_fails() {
        let mut transport = UnixSocketTransport::new("/tmp/ingest.sock");
        let err = transport.send("payload").await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut transport = UnixSocketTransport::new("/tmp/ingest.sock");
        transport.close();
        transport.close();
    }

    #[tokio::test]
    async fn test_mock_counts_newline_in_bytes_written() {
        let mut transport = MockTransport::new();
        transport.connect().await.unwrap();
        let written = transport.send("12345").await.unwrap();
        assert_eq!(written, 6);
        assert_eq!(transport.sent, vec!["12345".to_string()]);
    }
}
