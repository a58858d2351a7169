//! Connection Handler Module
//!
//! This module manages individual client connections to FlashProxy.
//! Each client connection is handled by its own async task with its own
//! decoder, so connections share nothing but the statistics counters.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (main.rs)                                │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept()
//!                        ▼
//!           ┌────────────────────────┐
//!           │   For each client...   │
//!           └────────────┬───────────┘
//!                        │
//!                        │ spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ Read bytes  │───>│ Decode req  │───>│  Handler    │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      ┌─────────────┐        │
//! │                                      │ Send reply  │        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Async I/O**: Uses Tokio for non-blocking network operations
//! - **Exact Framing**: The decoder consumes one request per call, so
//!   pipelined requests are served in order
//! - **Fail Closed**: A malformed request gets one `-ERR` reply, then the
//!   connection is closed
//! - **Idle Timeout**: Optional bound on the wait for each request
//! - **Statistics**: Tracks connection and request metrics
//!
//! ## Example
//!
//! ```ignore
//! use flashproxy::connection::{handle_connection, ConnectionStats, EchoHandler};
//! use flashproxy::protocol::RequestDecoder;
//! use std::sync::Arc;
//!
//! let stats = Arc::new(ConnectionStats::new());
//! let decoder = RequestDecoder::new();
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, decoder, EchoHandler, None, stats));
//! ```

pub mod handler;

// Re-export commonly used types
pub use handler::{
    handle_connection, ConnectionError, ConnectionHandler, ConnectionStats, EchoHandler,
    RequestHandler,
};
