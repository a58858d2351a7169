//! Decoded Requests
//!
//! A [`Request`] is what one decode call produces: a lowercased command name
//! and the ordered, binary-safe arguments that followed it on the wire.
//!
//! ## Wire Forms
//!
//! ```text
//! Multibulk:  *3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n
//! Inline:     SET foo bar\r\n
//! ```
//!
//! Both decode to `Request { name: "set", args: ["foo", "bar"] }`.

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// Multibulk count header prefix
pub const MULTIBULK_PREFIX: u8 = b'*';

/// A single client command request.
///
/// The argument list is fixed when the request is built; there is no way to
/// push to or truncate it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Command name, always lowercase
    name: String,

    /// Arguments in wire order, byte-for-byte as sent
    args: Vec<Bytes>,
}

impl Request {
    /// Creates a new request. The name is lowercased; arguments are kept
    /// verbatim.
    ///
    /// # Example
    /// ```
    /// use flashproxy::protocol::Request;
    /// use bytes::Bytes;
    ///
    /// let req = Request::new("GET", vec![Bytes::from("Name")]);
    /// assert_eq!(req.name(), "get");
    /// assert_eq!(req.args()[0], "Name");
    /// ```
    pub fn new(name: impl AsRef<str>, args: Vec<Bytes>) -> Self {
        Self {
            name: name.as_ref().to_lowercase(),
            args,
        }
    }

    /// Builds a request from the raw first token or argument.
    pub(crate) fn from_raw_name(name: &[u8], args: Vec<Bytes>) -> Self {
        Self::new(String::from_utf8_lossy(name), args)
    }

    /// Returns the lowercased command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the arguments following the command name.
    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    /// Returns the argument at `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&Bytes> {
        self.args.get(index)
    }

    /// Number of arguments, not counting the command name.
    pub fn argc(&self) -> usize {
        self.args.len()
    }

    /// Consumes the request and returns its name and arguments.
    pub fn into_parts(self) -> (String, Vec<Bytes>) {
        (self.name, self.args)
    }

    /// Encodes the request as a multibulk frame.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    /// Encodes the request as a multibulk frame into an existing buffer.
    ///
    /// The name is written first, as argument zero, so the count header is
    /// `args.len() + 1`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.push(MULTIBULK_PREFIX);
        buf.extend_from_slice((self.args.len() + 1).to_string().as_bytes());
        buf.extend_from_slice(CRLF);

        encode_bulk(buf, self.name.as_bytes());
        for arg in &self.args {
            encode_bulk(buf, arg);
        }
    }
}

fn encode_bulk(buf: &mut Vec<u8>, data: &[u8]) {
    buf.push(b'$');
    buf.extend_from_slice(data.len().to_string().as_bytes());
    buf.extend_from_slice(CRLF);
    buf.extend_from_slice(data);
    buf.extend_from_slice(CRLF);
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " \"{}\"", arg.escape_ascii())?;
        }
        Ok(())
    }
}
