//! # FlashProxy - A Binary-Safe RESP Request Decoder
//!
//! FlashProxy decodes client requests for Redis-compatible servers and
//! proxies. It reads the request side of the RESP protocol, multibulk and
//! inline, from any buffered async byte stream and produces one typed
//! [`Request`] per call.
//!
//! ## Features
//!
//! - **Binary-Safe**: Multibulk arguments may contain any byte, CRLF and NUL included
//! - **Exact Framing**: Each decode consumes exactly one request's bytes
//! - **Bounded**: Line, argument count and argument size limits are checked
//!   before anything is allocated
//! - **Classified Errors**: Malformed headers, truncated payloads and missing
//!   terminators are distinct error variants with full context
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                             FlashProxy                                  │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Request    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └─────────────┘                  │
//! │                            │                                            │
//! │                            ▼                                            │
//! │  ┌──────────────────────────────────────────────────────────────────┐   │
//! │  │                       RequestDecoder                             │   │
//! │  │  ┌──────────────┐   ┌──────────────────┐   ┌─────────────────┐   │   │
//! │  │  │ read_line    │──>│ *<count> header  │──>│ read_argument   │   │   │
//! │  │  │ (frame)      │   │ or inline split  │   │ $<len> payload  │   │   │
//! │  │  └──────────────┘   └──────────────────┘   └─────────────────┘   │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use flashproxy::connection::{handle_connection, ConnectionStats, EchoHandler};
//! use flashproxy::protocol::RequestDecoder;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let decoder = RequestDecoder::new();
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:6380").await.unwrap();
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         let stats = Arc::clone(&stats);
//!
//!         tokio::spawn(handle_connection(stream, addr, decoder, EchoHandler, None, stats));
//!     }
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: the request decoder, the `Request` type and decode errors
//! - [`connection`]: per-client connection tasks and the `RequestHandler` seam
//!
//! ## Design Highlights
//!
//! ### Stateless Decoding
//!
//! `RequestDecoder` holds only its limits. All progress lives in the stream
//! position, so a decoder is `Copy` and can be shared by every connection.
//!
//! ### Errors Carry Context, Not Logs
//!
//! The decoder never logs. Errors hold the raw header line or the byte
//! counts involved, and the connection layer decides what to log and what to
//! tell the client.

pub mod connection;
pub mod protocol;

// Re-export commonly used types for convenience
pub use connection::{handle_connection, ConnectionStats, EchoHandler, RequestHandler};
pub use protocol::{DecodeError, DecodeLimits, Request, RequestDecoder};

/// The default port FlashProxy listens on
pub const DEFAULT_PORT: u16 = 6380;

/// The default host FlashProxy binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of FlashProxy
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
