//! Errors for reading and constructing headers.

use crate::model::{AddressFamily, TransportProtocol};
use crate::{v1, v2};

/// An error in reading a PROXY protocol header from a stream.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Stream does not start with a PROXY protocol signature.")]
    NoProxyProtocol,
    #[error(transparent)]
    V1(#[from] v1::ParseError),
    #[error(transparent)]
    V2(#[from] v2::ParseError),
    #[error("Unable to read from the stream.")]
    Io(#[from] std::io::Error),
}

/// An error in constructing a header from its parts.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum HeaderError {
    #[error("Unknown proxy protocol version {0}. Version must be one of: 1, 2.")]
    UnknownVersion(u8),
    #[error("Invalid command {0:X}. Command must be one of: Local, Proxy.")]
    UnknownCommand(u8),
    #[error("Unsupported address family and protocol {0:#04X}.")]
    UnsupportedTransportProtocol(u8),
    #[error("Address family {addresses:?} does not match the transport protocol {protocol:?}.")]
    AddressFamilyMismatch {
        protocol: TransportProtocol,
        addresses: AddressFamily,
    },
    #[error("Unix socket path of {0} bytes must fit in 108 bytes and contain no NUL bytes.")]
    InvalidUnixPath(usize),
}

/// Distinguishes a stream that was left untouched from one that was partially consumed.
/// The only untouched outcome of a failed read is the absence of a signature;
/// a caller may then hand the stream to any other reader.
/// Every other failure leaves the stream at an unknown position and the connection must be closed.
pub trait Recoverable {
    /// Tests whether the stream is still positioned at its first byte.
    fn is_untouched(&self) -> bool;

    /// Tests whether the stream was partially consumed and can no longer be used.
    fn is_tainted(&self) -> bool {
        !self.is_untouched()
    }
}

impl<T, E: Recoverable> Recoverable for Result<T, E> {
    fn is_untouched(&self) -> bool {
        match self {
            Ok(_) => false,
            Err(error) => error.is_untouched(),
        }
    }

    fn is_tainted(&self) -> bool {
        match self {
            Ok(_) => false,
            Err(error) => error.is_tainted(),
        }
    }
}

impl Recoverable for Error {
    fn is_untouched(&self) -> bool {
        matches!(self, Error::NoProxyProtocol)
    }
}
