//! TCP transport for OFS requests.
//!
//! Every request opens its own connection, writes one encoded request, reads
//! one response and closes the connection again. Nothing is pooled or
//! reused, and nothing is retried at this layer.

use std::future::Future;
use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default bound on connecting, writing, and each read.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default cap on the size of a response; anything beyond it is dropped.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 16384;

const READ_CHUNK_SIZE: usize = 4096;

/// Errors raised while exchanging bytes with the server.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A connect, write, or read did not finish in time.
    #[error("timeout after {}ms while {}", .after.as_millis(), .phase)]
    Timeout {
        /// What the transport was doing.
        phase: &'static str,
        /// The bound that was exceeded.
        after: Duration,
    },

    /// The server could not be reached.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        /// The configured `host:port`.
        address: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// The connection failed after it was established.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The server closed the connection without sending anything.
    #[error("server closed the connection without responding")]
    EmptyResponse,
}

/// Something that can carry one request to the server and bring back one
/// response.
pub trait Transport: Send + Sync {
    /// Send `payload` and return the raw response bytes.
    fn exchange(
        &self,
        payload: &[u8],
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;
}

/// One-connection-per-request TCP transport.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    address: String,
    timeout: Duration,
    max_response_bytes: usize,
}

impl TcpTransport {
    /// Create a transport for `host:port` with the default limits.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: DEFAULT_TIMEOUT,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    /// Set the bound applied to connecting, writing, and each read.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the response size cap.
    pub fn with_max_response_bytes(mut self, max_response_bytes: usize) -> Self {
        self.max_response_bytes = max_response_bytes;
        self
    }

    /// The configured `host:port`.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The configured response size cap.
    pub fn max_response_bytes(&self) -> usize {
        self.max_response_bytes
    }

    fn timed_out(&self, phase: &'static str) -> TransportError {
        TransportError::Timeout {
            phase,
            after: self.timeout,
        }
    }

    async fn connect(&self) -> Result<TcpStream, TransportError> {
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(self.address.as_str()))
            .await
            .map_err(|_| self.timed_out("connecting"))?;

        stream.map_err(|source| {
            if source.kind() == io::ErrorKind::TimedOut {
                self.timed_out("connecting")
            } else {
                TransportError::Connect {
                    address: self.address.clone(),
                    source,
                }
            }
        })
    }

    async fn round_trip(
        &self,
        stream: &mut TcpStream,
        payload: &[u8],
    ) -> Result<Vec<u8>, TransportError> {
        tokio::time::timeout(self.timeout, async {
            stream.write_all(payload).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| self.timed_out("sending the request"))??;

        self.read_response(stream).await
    }

    /// Read until EOF or the size cap.
    ///
    /// A read that times out after something has arrived ends the response;
    /// one that times out before anything arrived is an error.
    async fn read_response(&self, stream: &mut TcpStream) -> Result<Vec<u8>, TransportError> {
        let mut response = Vec::with_capacity(READ_CHUNK_SIZE);
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        while response.len() < self.max_response_bytes {
            let want = READ_CHUNK_SIZE.min(self.max_response_bytes - response.len());
            match tokio::time::timeout(self.timeout, stream.read(&mut chunk[..want])).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => response.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => return Err(TransportError::Io(e)),
                Err(_) if !response.is_empty() => {
                    tracing::debug!(
                        "Server left connection open after {} bytes; treating as complete",
                        response.len()
                    );
                    break;
                }
                Err(_) => return Err(self.timed_out("waiting for the response")),
            }
        }

        if response.is_empty() {
            return Err(TransportError::EmptyResponse);
        }

        if response.len() >= self.max_response_bytes {
            tracing::warn!(
                "Response reached the {} byte limit; any remainder is discarded",
                self.max_response_bytes
            );
        }

        Ok(response)
    }
}

impl Transport for TcpTransport {
    async fn exchange(&self, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
        let mut stream = self.connect().await?;
        let result = self.round_trip(&mut stream, payload).await;

        // The stream is dropped here either way; shutdown just sends the FIN early.
        let _ = tokio::time::timeout(self.timeout, stream.shutdown()).await;

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        (listener, address)
    }

    #[tokio::test]
    async fn test_exchange_round_trip() {
        let (listener, address) = listener().await;

        let server_handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = stream.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"ping");
            stream.write_all(b"pong").await.unwrap();
        });

        let transport = TcpTransport::new(address);
        let response = transport.exchange(b"ping").await.unwrap();
        assert_eq!(response, b"pong");

        server_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_each_exchange_uses_new_connection() {
        let (listener, address) = listener().await;

        let server_handle = tokio::spawn(async move {
            for reply in [&b"first"[..], &b"second"[..]] {
                let (mut stream, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 64];
                let _ = stream.read(&mut buf).await.unwrap();
                stream.write_all(reply).await.unwrap();
            }
        });

        let transport = TcpTransport::new(address);
        assert_eq!(transport.exchange(b"a").await.unwrap(), b"first");
        assert_eq!(transport.exchange(b"b").await.unwrap(), b"second");

        server_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_timeout_when_server_never_responds() {
        let (listener, address) = listener().await;

        // Server that accepts but never answers
        let _server_handle = tokio::spawn(async move {
            let _conn = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let transport = TcpTransport::new(address).with_timeout(Duration::from_millis(100));
        let err = transport.exchange(b"ping").await.unwrap_err();

        assert!(matches!(err, TransportError::Timeout { .. }));
        assert!(err.to_string().contains("timeout"));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let (listener, address) = listener().await;
        drop(listener);

        let transport = TcpTransport::new(address.clone());
        let err = transport.exchange(b"ping").await.unwrap_err();

        match err {
            TransportError::Connect { address: reported, .. } => assert_eq!(reported, address),
            other => panic!("Expected Connect error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_response_truncated_at_limit() {
        let (listener, address) = listener().await;

        let server_handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64];
            let _ = stream.read(&mut buf).await.unwrap();
            // The client stops reading at its limit, so the tail may hit a reset.
            let _ = stream.write_all(&vec![b'x'; 20_000]).await;
        });

        let transport = TcpTransport::new(address);
        let response = transport.exchange(b"ping").await.unwrap();
        assert_eq!(response.len(), DEFAULT_MAX_RESPONSE_BYTES);

        server_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_partial_response_ends_on_read_timeout() {
        let (listener, address) = listener().await;

        let _server_handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64];
            let _ = stream.read(&mut buf).await.unwrap();
            stream.write_all(br#"{"status":"success"}"#).await.unwrap();
            // Keep the connection open
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let transport = TcpTransport::new(address).with_timeout(Duration::from_millis(100));
        let response = transport.exchange(b"ping").await.unwrap();
        assert_eq!(response, br#"{"status":"success"}"#);
    }

    #[tokio::test]
    async fn test_empty_response() {
        let (listener, address) = listener().await;

        let server_handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64];
            let _ = stream.read(&mut buf).await.unwrap();
            // Close without writing
        });

        let transport = TcpTransport::new(address);
        let err = transport.exchange(b"ping").await.unwrap_err();
        assert!(matches!(err, TransportError::EmptyResponse));

        server_handle.await.unwrap();
    }

    #[test]
    fn test_builder_settings() {
        let transport = TcpTransport::new("127.0.0.1:8081")
            .with_timeout(Duration::from_millis(500))
            .with_max_response_bytes(1024);
        assert_eq!(transport.address(), "127.0.0.1:8081");
        assert_eq!(transport.timeout(), Duration::from_millis(500));
        assert_eq!(transport.max_response_bytes(), 1024);
    }

    #[test]
    fn test_timeout_display() {
        let err = TransportError::Timeout {
            phase: "connecting",
            after: Duration::from_secs(2),
        };
        assert_eq!(err.to_string(), "timeout after 2000ms while connecting");
    }
}
