//! A PROXY protocol header codec.
//! Reads version 1 (text) and version 2 (binary) headers from peekable byte streams,
//! and writes headers back out in either version for forwarding.
//!
//! See <https://haproxy.org/download/1.8/doc/proxy-protocol.txt>
//!
//! ## Examples
//! ```rust
//! use std::io::Read;
//! use proxyproto::{read_header, Command, PeekReader, TransportProtocol};
//!
//! let stream: &[u8] = b"PROXY TCP4 192.168.0.1 192.168.0.11 56324 443\r\nGET / HTTP/1.1\r\n";
//! let mut reader = PeekReader::new(stream);
//! let header = read_header(&mut reader).unwrap();
//!
//! assert_eq!(header.command(), Command::Proxy);
//! assert_eq!(header.protocol(), TransportProtocol::Tcp4);
//! assert_eq!(header.source(), Some("192.168.0.1:56324".parse().unwrap()));
//!
//! let mut request = String::new();
//! reader.read_to_string(&mut request).unwrap();
//!
//! assert_eq!(request, "GET / HTTP/1.1\r\n");
//! ```

mod error;
mod ip;
mod model;
mod reader;

pub mod v1;
pub mod v2;

pub use error::{Error, HeaderError, Recoverable};
pub use ip::{Addresses, IPv4, IPv6, Unix, UNIX_PATH_LENGTH};
pub use model::{equal, AddressFamily, Command, Header, Protocol, TransportProtocol, Version};
pub use reader::{PeekRead, PeekReader};

use std::io;
use tracing::{debug, trace};

/// The number of bytes peeked to detect a signature.
pub const SIGNATURE_LENGTH: usize = 13;

/// The signature found at the start of a stream.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum Signature {
    /// The text signature `PROXY`.
    V1,
    /// The 12-byte binary signature.
    V2,
    /// Neither signature; the stream is untouched.
    Absent,
}

/// Looks at the start of the stream, without consuming it, to determine which version of header follows.
/// A stream that ends before a full signature is available has no signature.
///
/// ## Examples
/// ```rust
/// use proxyproto::{detect, Signature};
///
/// let mut stream: &[u8] = b"GET / HTTP/1.1\r\n";
///
/// assert_eq!(detect(&mut stream).unwrap(), Signature::Absent);
/// assert_eq!(stream, b"GET / HTTP/1.1\r\n");
/// ```
pub fn detect<R: PeekRead + ?Sized>(reader: &mut R) -> io::Result<Signature> {
    let signature = reader.peek(SIGNATURE_LENGTH)?;

    if signature.starts_with(v1::PROTOCOL_PREFIX.as_bytes()) {
        Ok(Signature::V1)
    } else if signature.starts_with(v2::PROTOCOL_PREFIX) {
        Ok(Signature::V2)
    } else {
        Ok(Signature::Absent)
    }
}

/// Reads a header of either version from the start of the stream.
///
/// Without a signature, returns `Error::NoProxyProtocol` and leaves the stream untouched,
/// so that it is safe to read outside of this crate.
/// Any other error leaves the stream partially consumed; the connection should be closed.
pub fn read_header<R: PeekRead + ?Sized>(reader: &mut R) -> Result<Header, Error> {
    let signature = detect(reader)?;
    trace!(?signature, "detected PROXY protocol signature");

    let result = match signature {
        Signature::V1 => v1::read(reader),
        Signature::V2 => v2::read(reader),
        Signature::Absent => return Err(Error::NoProxyProtocol),
    };

    match &result {
        Ok(header) => debug!(
            version = ?header.version(),
            command = ?header.command(),
            protocol = ?header.protocol(),
            "read PROXY protocol header"
        ),
        Err(error) => debug!(?signature, %error, "invalid PROXY protocol header"),
    }

    result
}
