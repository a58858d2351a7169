//! Decode Errors
//!
//! Every way a request can fail to decode is a variant of [`DecodeError`].
//! Variants carry the raw context (the offending line, the byte counts) rather
//! than a pre-rendered message, so the connection layer decides when and how
//! to render and log them.
//!
//! Any decode error leaves the stream at an unknown position inside a frame,
//! so callers must close the connection after one.

use bytes::Bytes;
use thiserror::Error;

/// Expected pattern of a multibulk count header.
pub const EXPECTED_ARG_COUNT: &str = "*<numberOfArguments>";

/// Expected pattern of an argument length header.
pub const EXPECTED_ARG_LENGTH: &str = "$<argumentLength>";

/// Errors that can occur while decoding a request.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A count or length header line does not match `*<int>\r\n` / `$<int>\r\n`
    #[error("malformed request: '{}' does not match {expected}\\r\\n", escaped(.line))]
    MalformedHeader {
        /// The pattern the line should have matched
        expected: &'static str,
        /// The raw line as read from the stream
        line: Bytes,
    },

    /// The stream ended before the declared number of payload bytes arrived
    #[error("malformed request: argument length {actual} does not match {expected}")]
    TruncatedPayload { expected: usize, actual: usize },

    /// The payload was not followed by `\r\n`
    #[error("malformed request: argument should end with \\r\\n{}", found_suffix(.found))]
    MissingTerminator {
        /// The byte found instead, or `None` if the stream failed or ended
        found: Option<u8>,
    },

    /// A line exceeded the configured maximum without a `\n`
    #[error("line exceeds {max} bytes")]
    LineTooLong { max: usize },

    /// Declared argument count above the configured maximum
    #[error("too many arguments: {count} (max: {max})")]
    TooManyArguments { count: usize, max: usize },

    /// Declared argument length above the configured maximum
    #[error("argument too large: {len} bytes (max: {max})")]
    ArgumentTooLarge { len: usize, max: usize },

    /// The stream ended cleanly before the first byte of a new request
    #[error("connection closed")]
    Closed,

    /// The underlying read failed or the stream ended mid-request
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// Builds a `MalformedHeader` error from the offending line.
    pub fn malformed(expected: &'static str, line: impl Into<Bytes>) -> Self {
        DecodeError::MalformedHeader {
            expected,
            line: line.into(),
        }
    }

    /// Returns true if the peer closed the stream between requests.
    pub fn is_closed(&self) -> bool {
        matches!(self, DecodeError::Closed)
    }

    /// Returns true for errors caused by the bytes the client sent, as opposed
    /// to the transport failing underneath the decoder.
    pub fn is_protocol_error(&self) -> bool {
        !matches!(self, DecodeError::Closed | DecodeError::Io(_))
    }
}

fn escaped(line: &Bytes) -> std::slice::EscapeAscii<'_> {
    line.escape_ascii()
}

fn found_suffix(found: &Option<u8>) -> String {
    match found {
        Some(b) => format!(", found {:?}", char::from(*b)),
        None => String::new(),
    }
}

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_header_escapes_line() {
        let err = DecodeError::malformed(EXPECTED_ARG_COUNT, &b"*x\r\n"[..]);
        assert_eq!(
            err.to_string(),
            "malformed request: '*x\\r\\n' does not match *<numberOfArguments>\\r\\n"
        );
    }

    #[test]
    fn test_truncated_payload_message() {
        let err = DecodeError::TruncatedPayload {
            expected: 5,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "malformed request: argument length 3 does not match 5"
        );
    }

    #[test]
    fn test_missing_terminator_message() {
        let err = DecodeError::MissingTerminator { found: Some(b'x') };
        assert_eq!(
            err.to_string(),
            "malformed request: argument should end with \\r\\n, found 'x'"
        );

        let err = DecodeError::MissingTerminator { found: None };
        assert_eq!(
            err.to_string(),
            "malformed request: argument should end with \\r\\n"
        );
    }

    #[test]
    fn test_classification() {
        assert!(DecodeError::Closed.is_closed());
        assert!(!DecodeError::Closed.is_protocol_error());

        let io = DecodeError::from(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        assert!(!io.is_protocol_error());

        assert!(DecodeError::LineTooLong { max: 8 }.is_protocol_error());
        assert!(DecodeError::malformed(EXPECTED_ARG_LENGTH, "x").is_protocol_error());
    }
}
