//! Connection Handler Module
//!
//! This module handles individual client connections to FlashProxy.
//! Each client gets its own handler task that runs in a loop,
//! decoding requests and sending replies.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Decode one request      │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Hand it to the handler  │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Send reply              │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / decode error / idle timeout
//!        │
//!        ▼
//! 5. Handler task ends
//! ```
//!
//! ## Decode Errors
//!
//! A decode error means we no longer know where the next request starts.
//! The client gets one `-ERR Protocol error: ...` line and the connection is
//! closed. There is no attempt to resynchronize.

use crate::protocol::{DecodeError, Request, RequestDecoder};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total requests decoded
    pub requests_decoded: AtomicU64,
    /// Connections closed because of a malformed request
    pub decode_errors: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn request_decoded(&self) {
        self.requests_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Receives every request decoded on a connection.
///
/// This is where a proxy forwards to its backend. The returned bytes are
/// written to the client verbatim, so the handler owns the reply encoding.
pub trait RequestHandler: Send {
    fn handle(&mut self, request: Request) -> Bytes;
}

/// Replies to each request with the request itself, normalized and
/// re-encoded as a multibulk frame.
///
/// Useful for seeing exactly what the decoder made of a client's bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoHandler;

impl RequestHandler for EchoHandler {
    fn handle(&mut self, request: Request) -> Bytes {
        Bytes::from(request.encode())
    }
}

/// Handles a single client connection.
///
/// This struct owns both halves of the socket, the decoder and the request
/// handler for one connected client.
pub struct ConnectionHandler<H> {
    /// Buffered read half; the decoder pulls from here
    reader: BufReader<OwnedReadHalf>,

    /// Buffered write half for replies
    writer: BufWriter<OwnedWriteHalf>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Request decoder
    decoder: RequestDecoder,

    /// Where decoded requests go
    handler: H,

    /// How long to wait for the next request, if bounded
    idle_timeout: Option<Duration>,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<H: RequestHandler> ConnectionHandler<H> {
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The TCP stream for this connection
    /// * `addr` - The client's socket address
    /// * `decoder` - The decoder, carrying the configured limits
    /// * `handler` - Receives each decoded request
    /// * `stats` - Shared connection statistics
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        decoder: RequestDecoder,
        handler: H,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            addr,
            decoder,
            handler,
            idle_timeout: None,
            stats,
        }
    }

    /// Closes the connection if no request starts arriving within `timeout`.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Runs the main connection loop.
    ///
    /// This method decodes requests from the client, hands them to the
    /// request handler, and sends back replies until the client disconnects
    /// or an error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::Io(io_err)
                | ConnectionError::Decode(DecodeError::Io(io_err))
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The decode-handle-reply loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            let request = match self.next_request().await {
                Ok(request) => request,
                Err(ConnectionError::Decode(DecodeError::Closed)) => return Ok(()),
                Err(ConnectionError::Decode(e)) if e.is_protocol_error() => {
                    self.stats.decode_error();
                    warn!(client = %self.addr, error = %e, "Malformed request");
                    self.send_error(&e).await?;
                    return Err(ConnectionError::Decode(e));
                }
                Err(e) => return Err(e),
            };

            self.stats.request_decoded();
            trace!(
                client = %self.addr,
                command = %request.name(),
                argc = request.argc(),
                "Decoded request"
            );

            let reply = self.handler.handle(request);
            self.send_reply(&reply).await?;
        }
    }

    /// Decodes the next request, bounded by the idle timeout if one is set.
    async fn next_request(&mut self) -> Result<Request, ConnectionError> {
        let decode = self.decoder.decode(&mut self.reader);
        match self.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, decode).await {
                Ok(result) => Ok(result?),
                Err(_) => Err(ConnectionError::IdleTimeout(limit)),
            },
            None => Ok(decode.await?),
        }
    }

    /// Reports a decode error to the client.
    async fn send_error(&mut self, err: &DecodeError) -> Result<(), ConnectionError> {
        let line = format!("-ERR Protocol error: {}\r\n", err);
        self.send_reply(line.as_bytes()).await
    }

    /// Sends a reply to the client.
    async fn send_reply(&mut self, reply: &[u8]) -> Result<(), ConnectionError> {
        self.writer.write_all(reply).await?;
        self.writer.flush().await?;
        self.stats.bytes_written(reply.len());
        trace!(
            client = %self.addr,
            bytes = reply.len(),
            "Sent reply"
        );
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error while writing a reply
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The request could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// No request arrived within the idle timeout
    #[error("Idle for more than {0:?}")]
    IdleTimeout(Duration),
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion.
///
/// # Arguments
///
/// * `stream` - The TCP stream for this connection
/// * `addr` - The client's socket address
/// * `decoder` - The decoder, carrying the configured limits
/// * `handler` - Receives each decoded request
/// * `idle_timeout` - How long to wait for each request, if bounded
/// * `stats` - Shared connection statistics
pub async fn handle_connection<H: RequestHandler>(
    stream: TcpStream,
    addr: SocketAddr,
    decoder: RequestDecoder,
    handler: H,
    idle_timeout: Option<Duration>,
    stats: Arc<ConnectionStats>,
) {
    let connection = ConnectionHandler::new(stream, addr, decoder, handler, stats)
        .with_idle_timeout(idle_timeout);
    if let Err(e) = connection.run().await {
        debug!(client = %addr, error = %e, "Connection ended with error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::DecodeLimits;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn create_test_server(
        decoder: RequestDecoder,
        idle_timeout: Option<Duration>,
    ) -> (SocketAddr, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stats = Arc::new(ConnectionStats::new());

        let stats_clone = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let stats = Arc::clone(&stats_clone);
                tokio::spawn(handle_connection(
                    stream,
                    client_addr,
                    decoder,
                    EchoHandler,
                    idle_timeout,
                    stats,
                ));
            }
        });

        (addr, stats)
    }

    async fn read_until_closed(client: &mut TcpStream) -> Vec<u8> {
        let mut buf = Vec::new();
        tokio::time::timeout(Duration::from_secs(2), client.read_to_end(&mut buf))
            .await
            .unwrap()
            .unwrap();
        buf
    }

    #[test]
    fn test_echo_handler_reencodes() {
        let mut handler = EchoHandler;
        let reply = handler.handle(Request::new("PING", vec![]));
        assert_eq!(&reply[..], b"*1\r\n$4\r\nping\r\n");
    }

    #[tokio::test]
    async fn test_echo_multibulk() {
        let (addr, _) = create_test_server(RequestDecoder::new(), None).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"*3\r\n$3\r\nSET\r\n$4\r\nname\r\n$4\r\nAriz\r\n")
            .await
            .unwrap();

        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"*3\r\n$3\r\nset\r\n$4\r\nname\r\n$4\r\nAriz\r\n");
    }

    #[tokio::test]
    async fn test_echo_inline() {
        let (addr, _) = create_test_server(RequestDecoder::new(), None).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"PING\r\n").await.unwrap();

        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"*1\r\n$4\r\nping\r\n");
    }

    #[tokio::test]
    async fn test_pipelined_requests() {
        let (addr, _) = create_test_server(RequestDecoder::new(), None).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"*2\r\n$3\r\nGET\r\n$2\r\nk1\r\nGET k2\r\n")
            .await
            .unwrap();
        client.shutdown().await.unwrap();

        let response = read_until_closed(&mut client).await;
        assert_eq!(
            response,
            b"*2\r\n$3\r\nget\r\n$2\r\nk1\r\n*2\r\n$3\r\nget\r\n$2\r\nk2\r\n"
        );
    }

    #[tokio::test]
    async fn test_malformed_request_closes_connection() {
        let (addr, stats) = create_test_server(RequestDecoder::new(), None).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"*X\r\n").await.unwrap();

        let response = read_until_closed(&mut client).await;
        let response = String::from_utf8(response).unwrap();
        assert!(response.starts_with("-ERR Protocol error: malformed request"));
        assert!(response.ends_with("\r\n"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(stats.decode_errors.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_limits_are_enforced() {
        let decoder = RequestDecoder::with_limits(DecodeLimits {
            max_argument_len: 8,
            ..DecodeLimits::default()
        });
        let (addr, _) = create_test_server(decoder, None).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"*2\r\n$3\r\nGET\r\n$9\r\n").await.unwrap();

        let response = read_until_closed(&mut client).await;
        assert_eq!(
            response,
            b"-ERR Protocol error: argument too large: 9 bytes (max: 8)\r\n"
        );
    }

    #[tokio::test]
    async fn test_idle_timeout_closes_connection() {
        let (addr, _) =
            create_test_server(RequestDecoder::new(), Some(Duration::from_millis(50))).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        let response = read_until_closed(&mut client).await;
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let (addr, stats) = create_test_server(RequestDecoder::new(), None).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);

        let mut client = TcpStream::connect(addr).await.unwrap();

        // Give the server time to accept the connection
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);

        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
        let mut buf = [0u8; 64];
        let _ = client.read(&mut buf).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.requests_decoded.load(Ordering::Relaxed), 1);
        assert!(stats.bytes_written.load(Ordering::Relaxed) > 0);
        assert_eq!(stats.decode_errors.load(Ordering::Relaxed), 0);

        drop(client);

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }
}
