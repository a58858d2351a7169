//! RESP Request Decoder
//!
//! Decodes exactly one client request from a buffered byte stream, in either
//! of the two request forms the protocol allows:
//!
//! - **Multibulk**: `*<count>\r\n` followed by `count` bulk arguments, the
//!   first of which is the command name. Binary-safe.
//! - **Inline**: a single line of space-separated tokens, e.g. `PING\r\n`.
//!   Tokens cannot contain spaces or line breaks.
//!
//! ## How the Decoder Works
//!
//! `decode()` reads one line. A leading `*` selects the multibulk path, which
//! then reads each argument with [`read_argument`]. Anything else is an inline
//! command. The call returns once the last byte of the request has been read,
//! leaving the stream positioned at the start of the next request:
//!
//! 1. Wrap the connection in a `BufReader`
//! 2. Call `decode()` to read the next request
//! 3. On `Ok(request)`, dispatch it and call `decode()` again
//! 4. On `Err(Closed)`, the client hung up between requests
//! 5. On any other error, report it and close the connection. The stream is
//!    somewhere inside a frame and cannot be resynchronized.

use crate::protocol::argument::{read_argument, BULK_PREFIX};
use crate::protocol::error::{DecodeError, DecodeResult, EXPECTED_ARG_COUNT};
use crate::protocol::frame::{parse_header, read_line, CR, LF};
use crate::protocol::request::{Request, MULTIBULK_PREFIX};
use bytes::Bytes;
use tokio::io::AsyncBufRead;

/// Maximum length of an inline command or header line (64 KB, same as Redis)
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Maximum number of arguments in a multibulk request (same as Redis)
pub const MAX_ARGUMENTS: usize = 1024 * 1024;

/// Maximum size of a single argument (512 MB, same as Redis)
pub const MAX_ARGUMENT_LEN: usize = 512 * 1024 * 1024;

/// Upper bound on argument slots reserved from a declared count.
const PREALLOC_ARGS: usize = 1024;

/// Size limits enforced while decoding.
///
/// Each limit is checked against the declared value before anything is
/// allocated for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Longest header or inline line, including its terminator
    pub max_line_len: usize,
    /// Largest multibulk argument count, command name included
    pub max_arguments: usize,
    /// Largest single argument payload
    pub max_argument_len: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_line_len: MAX_LINE_LEN,
            max_arguments: MAX_ARGUMENTS,
            max_argument_len: MAX_ARGUMENT_LEN,
        }
    }
}

/// A stateless request decoder.
///
/// Holds nothing but its limits, so one decoder can serve any number of
/// streams and nothing carries over between calls.
///
/// # Example
///
/// ```
/// use flashproxy::protocol::RequestDecoder;
///
/// # tokio_test::block_on(async {
/// let decoder = RequestDecoder::new();
/// let mut input: &[u8] = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
///
/// let request = decoder.decode(&mut input).await.unwrap();
/// assert_eq!(request.name(), "get");
/// assert_eq!(request.args()[0], "name");
/// # });
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestDecoder {
    limits: DecodeLimits,
}

impl RequestDecoder {
    /// Creates a decoder with the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder with custom limits.
    pub fn with_limits(limits: DecodeLimits) -> Self {
        Self { limits }
    }

    /// Returns the limits this decoder enforces.
    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// Decodes the next request from the stream.
    ///
    /// Consumes exactly the bytes of one request on success. On error the
    /// stream position is undefined and the connection should be closed.
    pub async fn decode<R>(&self, reader: &mut R) -> DecodeResult<Request>
    where
        R: AsyncBufRead + Unpin,
    {
        let line = read_line(reader, self.limits.max_line_len)
            .await?
            .into_complete()?
            .ok_or(DecodeError::Closed)?;

        match line[0] {
            MULTIBULK_PREFIX => self.decode_multibulk(reader, line).await,
            // A bulk header where the count should be: the client lost track
            // of the framing.
            BULK_PREFIX => Err(DecodeError::malformed(EXPECTED_ARG_COUNT, line)),
            _ => Ok(decode_inline(&line)),
        }
    }

    /// Decodes the arguments of a multibulk request whose `*<count>` header
    /// has already been read.
    async fn decode_multibulk<R>(&self, reader: &mut R, header: Vec<u8>) -> DecodeResult<Request>
    where
        R: AsyncBufRead + Unpin,
    {
        // A count of zero or less leaves no room for a command name.
        let count = match parse_header(&header, MULTIBULK_PREFIX)
            .and_then(|n| usize::try_from(n).ok())
        {
            Some(n) if n > 0 => n,
            _ => return Err(DecodeError::malformed(EXPECTED_ARG_COUNT, header)),
        };

        if count > self.limits.max_arguments {
            return Err(DecodeError::TooManyArguments {
                count,
                max: self.limits.max_arguments,
            });
        }

        let name = read_argument(reader, &self.limits).await?;

        let mut args = Vec::with_capacity((count - 1).min(PREALLOC_ARGS));
        for _ in 1..count {
            args.push(read_argument(reader, &self.limits).await?);
        }

        Ok(Request::from_raw_name(&name, args))
    }
}

/// Splits an inline command line on single spaces.
///
/// Consecutive spaces yield empty arguments. An empty line yields an empty
/// name and no arguments.
fn decode_inline(line: &[u8]) -> Request {
    let end = line
        .iter()
        .rposition(|&b| b != CR && b != LF)
        .map_or(0, |pos| pos + 1);

    let mut tokens = line[..end].split(|&b| b == b' ');
    let name = tokens.next().unwrap_or_default();
    let args = tokens.map(Bytes::copy_from_slice).collect();

    Request::from_raw_name(name, args)
}

/// Helper function to decode a single request with the default limits.
///
/// This is a convenience function for simple use cases.
pub async fn decode_request<R>(reader: &mut R) -> DecodeResult<Request>
where
    R: AsyncBufRead + Unpin,
{
    RequestDecoder::new().decode(reader).await
}
