//! Line Framing
//!
//! Reads one logical line from the stream: every byte up to and including the
//! next `\n`. Header lines (`*<count>`, `$<length>`) and inline commands are
//! all framed this way; argument payloads are not (see [`super::argument`]).
//!
//! Lines are bounded. The reader never pulls more than `max_len` bytes looking
//! for a newline, so a client cannot make us buffer an endless line.

use crate::protocol::error::{DecodeError, DecodeResult};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// The line feed that ends every line
pub const LF: u8 = b'\n';

/// The carriage return expected before every `\n`
pub const CR: u8 = b'\r';

/// Outcome of reading one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// A complete line ending in `\n`
    Complete(Vec<u8>),
    /// The stream ended after these bytes, before any `\n`
    Incomplete(Vec<u8>),
    /// The stream ended before any byte was read
    End,
}

impl Line {
    /// Treats a line cut short by the end of the stream as an I/O error.
    pub fn into_complete(self) -> DecodeResult<Option<Vec<u8>>> {
        match self {
            Line::Complete(line) => Ok(Some(line)),
            Line::Incomplete(_) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream ended in the middle of a line",
            )
            .into()),
            Line::End => Ok(None),
        }
    }
}

/// Reads one line, including its trailing `\n`.
///
/// A `max_len` of zero still allows one byte to be read, so pending input is
/// reported as `LineTooLong` rather than mistaken for the end of the stream.
///
/// # Returns
///
/// - `Ok(Line)` - a complete line, a partial line cut short by the end of
///   the stream, or the end of the stream
/// - `Err(LineTooLong)` - `max_len` bytes arrived without a `\n`
/// - `Err(Io)` - the read failed
pub async fn read_line<R>(reader: &mut R, max_len: usize) -> DecodeResult<Line>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let n = (&mut *reader)
        .take(max_len.max(1) as u64)
        .read_until(LF, &mut line)
        .await?;

    if n == 0 {
        return Ok(Line::End);
    }

    let complete = line.last() == Some(&LF);
    if line.len() > max_len || (!complete && line.len() == max_len) {
        return Err(DecodeError::LineTooLong { max: max_len });
    }

    if !complete {
        return Ok(Line::Incomplete(line));
    }

    Ok(Line::Complete(line))
}

/// Parses a header line of the form `<prefix><integer>\r\n`.
///
/// The integer may carry a leading `+` or `-` sign; range checks are left to
/// the caller. Returns `None` if the line does not match the grammar.
pub fn parse_header(line: &[u8], prefix: u8) -> Option<i64> {
    let digits = line.strip_prefix(&[prefix])?.strip_suffix(&[CR, LF])?;

    std::str::from_utf8(digits).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_line_crlf() {
        let mut input: &[u8] = b"*1\r\nrest";
        let line = read_line(&mut input, 64).await.unwrap();
        assert_eq!(line, Line::Complete(b"*1\r\n".to_vec()));
        assert_eq!(input, b"rest");
    }

    #[tokio::test]
    async fn test_read_line_bare_lf() {
        let mut input: &[u8] = b"PING\n";
        let line = read_line(&mut input, 64).await.unwrap();
        assert_eq!(line, Line::Complete(b"PING\n".to_vec()));
        assert!(input.is_empty());
    }

    #[tokio::test]
    async fn test_read_line_empty_stream() {
        let mut input: &[u8] = b"";
        assert_eq!(read_line(&mut input, 64).await.unwrap(), Line::End);
    }

    #[tokio::test]
    async fn test_read_line_partial_keeps_bytes() {
        let mut input: &[u8] = b"*3\r";
        let line = read_line(&mut input, 64).await.unwrap();
        assert_eq!(line, Line::Incomplete(b"*3\r".to_vec()));

        let err = line.into_complete().unwrap_err();
        assert!(
            matches!(err, DecodeError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof)
        );
    }

    #[tokio::test]
    async fn test_read_line_failure_is_propagated() {
        let mut input = tokio::io::BufReader::new(
            tokio_test::io::Builder::new()
                .read(b"$1")
                .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
                .build(),
        );
        let err = read_line(&mut input, 64).await.unwrap_err();
        assert!(
            matches!(err, DecodeError::Io(ref e) if e.kind() == io::ErrorKind::ConnectionReset)
        );
    }

    #[tokio::test]
    async fn test_read_line_too_long() {
        let mut input: &[u8] = b"GET aaaaaaaaaaaaaaaa\r\n";
        let err = read_line(&mut input, 8).await.unwrap_err();
        assert!(matches!(err, DecodeError::LineTooLong { max: 8 }));
    }

    #[tokio::test]
    async fn test_read_line_exactly_max_len() {
        let mut input: &[u8] = b"PING\r\n";
        let line = read_line(&mut input, 6).await.unwrap();
        assert_eq!(line, Line::Complete(b"PING\r\n".to_vec()));
    }

    #[tokio::test]
    async fn test_zero_max_len_rejects_pending_input() {
        let mut input: &[u8] = b"PING\r\n";
        let err = read_line(&mut input, 0).await.unwrap_err();
        assert!(matches!(err, DecodeError::LineTooLong { max: 0 }));

        let mut input: &[u8] = b"\n";
        let err = read_line(&mut input, 0).await.unwrap_err();
        assert!(matches!(err, DecodeError::LineTooLong { max: 0 }));

        let mut input: &[u8] = b"";
        assert_eq!(read_line(&mut input, 0).await.unwrap(), Line::End);
    }

    #[tokio::test]
    async fn test_read_line_across_chunks() {
        let mut input = tokio::io::BufReader::new(
            tokio_test::io::Builder::new()
                .read(b"*1")
                .read(b"2\r")
                .read(b"\n")
                .build(),
        );
        let line = read_line(&mut input, 64).await.unwrap();
        assert_eq!(line, Line::Complete(b"*12\r\n".to_vec()));
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(parse_header(b"*3\r\n", b'*'), Some(3));
        assert_eq!(parse_header(b"$0\r\n", b'$'), Some(0));
        assert_eq!(parse_header(b"*-1\r\n", b'*'), Some(-1));
        assert_eq!(parse_header(b"*+2\r\n", b'*'), Some(2));
    }

    #[test]
    fn test_parse_header_rejects() {
        assert_eq!(parse_header(b"*x\r\n", b'*'), None);
        assert_eq!(parse_header(b"*\r\n", b'*'), None);
        assert_eq!(parse_header(b"*3\n", b'*'), None);
        assert_eq!(parse_header(b"*3 \r\n", b'*'), None);
        assert_eq!(parse_header(b"$3\r\n", b'*'), None);
        assert_eq!(parse_header(b"*99999999999999999999\r\n", b'*'), None);
    }
}
