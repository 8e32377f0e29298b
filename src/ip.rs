//! Models for storing IPv4, IPv6 and Unix socket addresses and ports.

use crate::error::HeaderError;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

/// The maximum length in bytes of a Unix socket path.
pub const UNIX_PATH_LENGTH: usize = 108;

/// The source and destination IPv4 addresses and ports of a header.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct IPv4 {
    pub source_address: Ipv4Addr,
    pub source_port: u16,
    pub destination_address: Ipv4Addr,
    pub destination_port: u16,
}

impl IPv4 {
    /// Create a new IPv4 addresses.
    pub fn new<T: Into<Ipv4Addr>>(
        source_address: T,
        destination_address: T,
        source_port: u16,
        destination_port: u16,
    ) -> Self {
        IPv4 {
            source_address: source_address.into(),
            source_port,
            destination_address: destination_address.into(),
            destination_port,
        }
    }

    pub fn source(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.source_address, self.source_port)
    }

    pub fn destination(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.destination_address, self.destination_port)
    }
}

impl From<(SocketAddrV4, SocketAddrV4)> for IPv4 {
    fn from((source, destination): (SocketAddrV4, SocketAddrV4)) -> Self {
        IPv4::new(
            *source.ip(),
            *destination.ip(),
            source.port(),
            destination.port(),
        )
    }
}

/// The source and destination IPv6 addresses and ports of a header.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct IPv6 {
    pub source_address: Ipv6Addr,
    pub source_port: u16,
    pub destination_address: Ipv6Addr,
    pub destination_port: u16,
}

impl IPv6 {
    /// Create a new IPv6 addresses.
    pub fn new<T: Into<Ipv6Addr>>(
        source_address: T,
        destination_address: T,
        source_port: u16,
        destination_port: u16,
    ) -> Self {
        IPv6 {
            source_address: source_address.into(),
            source_port,
            destination_address: destination_address.into(),
            destination_port,
        }
    }

    pub fn source(&self) -> SocketAddrV6 {
        SocketAddrV6::new(self.source_address, self.source_port, 0, 0)
    }

    pub fn destination(&self) -> SocketAddrV6 {
        SocketAddrV6::new(self.destination_address, self.destination_port, 0, 0)
    }
}

impl From<(SocketAddrV6, SocketAddrV6)> for IPv6 {
    fn from((source, destination): (SocketAddrV6, SocketAddrV6)) -> Self {
        IPv6::new(
            *source.ip(),
            *destination.ip(),
            source.port(),
            destination.port(),
        )
    }
}

/// The source and destination Unix socket paths of a header.
/// Paths are at most 108 bytes and contain no NUL bytes.
///
/// ## Examples
/// ```rust
/// use proxyproto::Unix;
///
/// let unix = Unix::new("/run/client.sock", "/run/server.sock").unwrap();
///
/// assert_eq!(unix.source(), "/run/client.sock");
/// assert!(Unix::new("/run/\0.sock", "/run/server.sock").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Unix {
    source: String,
    destination: String,
}

impl Unix {
    /// Create a new pair of Unix socket paths.
    pub fn new<S: Into<String>>(source: S, destination: S) -> Result<Self, HeaderError> {
        let source = source.into();
        let destination = destination.into();

        validate_path(&source)?;
        validate_path(&destination)?;

        Ok(Unix {
            source,
            destination,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }
}

fn validate_path(path: &str) -> Result<(), HeaderError> {
    if path.len() > UNIX_PATH_LENGTH || path.bytes().any(|byte| byte == 0) {
        return Err(HeaderError::InvalidUnixPath(path.len()));
    }

    Ok(())
}

/// The addresses carried by a header, tagged by address family.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Addresses {
    Unspecified,
    IPv4(IPv4),
    IPv6(IPv6),
    Unix(Unix),
}

impl Addresses {
    /// The source address of an IP family as a socket address.
    pub fn source(&self) -> Option<SocketAddr> {
        match self {
            Addresses::IPv4(a) => Some(a.source().into()),
            Addresses::IPv6(a) => Some(a.source().into()),
            Addresses::Unix(..) | Addresses::Unspecified => None,
        }
    }

    /// The destination address of an IP family as a socket address.
    pub fn destination(&self) -> Option<SocketAddr> {
        match self {
            Addresses::IPv4(a) => Some(a.destination().into()),
            Addresses::IPv6(a) => Some(a.destination().into()),
            Addresses::Unix(..) | Addresses::Unspecified => None,
        }
    }
}

impl From<IPv4> for Addresses {
    fn from(addresses: IPv4) -> Self {
        Addresses::IPv4(addresses)
    }
}

impl From<IPv6> for Addresses {
    fn from(addresses: IPv6) -> Self {
        Addresses::IPv6(addresses)
    }
}

impl From<Unix> for Addresses {
    fn from(addresses: Unix) -> Self {
        Addresses::Unix(addresses)
    }
}

impl fmt::Display for Addresses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => write!(f, "unspecified"),
            Self::IPv4(a) => write!(f, "{} -> {}", a.source(), a.destination()),
            Self::IPv6(a) => write!(f, "{} -> {}", a.source(), a.destination()),
            Self::Unix(a) => write!(f, "{} -> {}", a.source, a.destination),
        }
    }
}
