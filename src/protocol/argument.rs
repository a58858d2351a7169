//! Bulk Argument Reader
//!
//! Reads one length-prefixed argument of a multibulk request:
//!
//! ```text
//! $<length>\r\n<length bytes>\r\n
//! ```
//!
//! The length is declared up front, so the payload may contain any byte,
//! including `\r`, `\n` and NUL. Exactly `length + 2` bytes are consumed after
//! the header line and nothing more.

use crate::protocol::decoder::DecodeLimits;
use crate::protocol::error::{DecodeError, DecodeResult, EXPECTED_ARG_LENGTH};
use crate::protocol::frame::{parse_header, read_line, Line, CR, LF};
use bytes::Bytes;
use tokio::io::{AsyncBufRead, AsyncReadExt};

/// Argument length header prefix
pub const BULK_PREFIX: u8 = b'$';

/// Upper bound on the buffer reserved up front for a payload. Larger payloads
/// grow as their bytes actually arrive, so a lying length header costs nothing.
const PREALLOC_LIMIT: usize = 64 * 1024;

/// Reads one `$<length>\r\n<payload>\r\n` argument and returns the payload.
pub async fn read_argument<R>(reader: &mut R, limits: &DecodeLimits) -> DecodeResult<Bytes>
where
    R: AsyncBufRead + Unpin,
{
    let len = read_length(reader, limits).await?;

    let mut payload = Vec::with_capacity(len.min(PREALLOC_LIMIT));
    let got = (&mut *reader)
        .take(len as u64)
        .read_to_end(&mut payload)
        .await?;

    if got != len {
        return Err(DecodeError::TruncatedPayload {
            expected: len,
            actual: got,
        });
    }

    match reader.read_u8().await {
        Ok(CR) => {}
        Ok(other) => return Err(DecodeError::MissingTerminator { found: Some(other) }),
        // The stream ended right where the terminator belongs. If the payload
        // itself ends in CRLF, the client sent fewer bytes than it declared
        // and we consumed its terminator as data.
        Err(_) if payload.ends_with(&[CR, LF]) => {
            return Err(DecodeError::TruncatedPayload {
                expected: len,
                actual: len - 2,
            });
        }
        Err(_) => return Err(DecodeError::MissingTerminator { found: None }),
    }

    match reader.read_u8().await {
        Ok(LF) => Ok(Bytes::from(payload)),
        Ok(other) => Err(DecodeError::MissingTerminator { found: Some(other) }),
        Err(_) => Err(DecodeError::MissingTerminator { found: None }),
    }
}

/// Reads and validates the `$<length>\r\n` header line.
async fn read_length<R>(reader: &mut R, limits: &DecodeLimits) -> DecodeResult<usize>
where
    R: AsyncBufRead + Unpin,
{
    // A header cut short by the end of the stream is reported with whatever
    // part of it arrived. Read failures propagate as they are.
    let line = match read_line(reader, limits.max_line_len).await? {
        Line::Complete(line) => line,
        Line::Incomplete(partial) => {
            return Err(DecodeError::malformed(EXPECTED_ARG_LENGTH, partial));
        }
        Line::End => return Err(DecodeError::malformed(EXPECTED_ARG_LENGTH, Bytes::new())),
    };

    let len = match parse_header(&line, BULK_PREFIX)
        .and_then(|n| usize::try_from(n).ok())
    {
        Some(n) => n,
        None => return Err(DecodeError::malformed(EXPECTED_ARG_LENGTH, line)),
    };

    if len > limits.max_argument_len {
        return Err(DecodeError::ArgumentTooLarge {
            len,
            max: limits.max_argument_len,
        });
    }

    Ok(len)
}
