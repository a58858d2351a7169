//! RESP Request Decoding
//!
//! This module turns the bytes a client sends into [`Request`] values, one
//! request per call, following the request side of the Redis Serialization
//! Protocol (RESP).
//!
//! ## Overview
//!
//! Clients send commands in one of two forms. The multibulk form declares an
//! argument count and then the byte length of every argument, so arguments
//! can hold arbitrary binary data. The inline form is a plain line of
//! space-separated words, handy for `telnet` sessions.
//!
//! ## Modules
//!
//! - `decoder`: `RequestDecoder`, which picks the form and assembles the request
//! - `frame`: bounded line reading and header parsing
//! - `argument`: length-prefixed, binary-safe argument reading
//! - `request`: the `Request` type and its multibulk encoding
//! - `error`: the `DecodeError` taxonomy
//!
//! ## Example
//!
//! ```ignore
//! use flashproxy::protocol::{RequestDecoder, DecodeError};
//! use tokio::io::BufReader;
//!
//! let mut reader = BufReader::new(stream);
//! let decoder = RequestDecoder::new();
//!
//! loop {
//!     match decoder.decode(&mut reader).await {
//!         Ok(request) => dispatch(request),
//!         Err(DecodeError::Closed) => break,
//!         Err(e) => return Err(e),
//!     }
//! }
//! ```

pub mod argument;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod request;

// Re-export commonly used types for convenience
pub use decoder::{decode_request, DecodeLimits, RequestDecoder};
pub use error::{DecodeError, DecodeResult};
pub use request::Request;
