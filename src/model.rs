//! The structured representation of a PROXY protocol header, shared by both versions.

use crate::error::HeaderError;
use crate::ip::{Addresses, IPv4, IPv6};
use crate::{v1, v2};
use std::convert::TryFrom;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::ops::BitOr;

/// The version of the proxy protocol header.
#[derive(Debug, Eq, PartialEq, PartialOrd, Ord, Copy, Clone, Hash)]
pub enum Version {
    One = 1,
    Two = 2,
}

impl TryFrom<u8> for Version {
    type Error = HeaderError;

    fn try_from(version: u8) -> Result<Self, Self::Error> {
        match version {
            1 => Ok(Version::One),
            2 => Ok(Version::Two),
            _ => Err(HeaderError::UnknownVersion(version)),
        }
    }
}

/// The type of connection received by the server from the proxy.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub enum Command {
    /// The connection was established by the proxy itself (e.g. a health check).
    Local = 0,
    /// The connection was relayed on behalf of another node.
    Proxy = 1,
}

impl Command {
    pub fn is_local(&self) -> bool {
        *self == Command::Local
    }

    pub fn is_proxy(&self) -> bool {
        *self == Command::Proxy
    }
}

impl TryFrom<u8> for Command {
    type Error = HeaderError;

    fn try_from(command: u8) -> Result<Self, Self::Error> {
        match command {
            0 => Ok(Command::Local),
            1 => Ok(Command::Proxy),
            _ => Err(HeaderError::UnknownCommand(command)),
        }
    }
}

/// The binary version and command byte.
impl BitOr<Command> for Version {
    type Output = u8;

    fn bitor(self, command: Command) -> Self::Output {
        ((self as u8) << 4) | command as u8
    }
}

/// The address family of a transport protocol, as the high nibble of its binary representation.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub enum AddressFamily {
    Unspecified = 0x00,
    IPv4 = 0x10,
    IPv6 = 0x20,
    Unix = 0x30,
}

/// The kind of socket of a transport protocol, as the low nibble of its binary representation.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub enum Protocol {
    Unspecified = 0x00,
    Stream = 0x01,
    Datagram = 0x02,
}

/// The combined address family and protocol of the proxied connection.
///
/// ## Examples
/// ```rust
/// use std::convert::TryFrom;
/// use proxyproto::{AddressFamily, Protocol, TransportProtocol};
///
/// let protocol = TransportProtocol::try_from(0x21).unwrap();
///
/// assert_eq!(protocol, TransportProtocol::Tcp6);
/// assert_eq!(protocol.family(), AddressFamily::IPv6);
/// assert_eq!(protocol.kind(), Protocol::Stream);
/// assert!(TransportProtocol::try_from(0x13).is_err());
/// ```
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub enum TransportProtocol {
    Unspecified = 0x00,
    Tcp4 = 0x11,
    Udp4 = 0x12,
    Tcp6 = 0x21,
    Udp6 = 0x22,
    UnixStream = 0x31,
    UnixDatagram = 0x32,
}

impl TransportProtocol {
    pub fn family(&self) -> AddressFamily {
        match self {
            Self::Unspecified => AddressFamily::Unspecified,
            Self::Tcp4 | Self::Udp4 => AddressFamily::IPv4,
            Self::Tcp6 | Self::Udp6 => AddressFamily::IPv6,
            Self::UnixStream | Self::UnixDatagram => AddressFamily::Unix,
        }
    }

    pub fn kind(&self) -> Protocol {
        match self {
            Self::Unspecified => Protocol::Unspecified,
            Self::Tcp4 | Self::Tcp6 | Self::UnixStream => Protocol::Stream,
            Self::Udp4 | Self::Udp6 | Self::UnixDatagram => Protocol::Datagram,
        }
    }

    pub fn is_unspecified(&self) -> bool {
        *self == Self::Unspecified
    }

    pub fn is_ipv4(&self) -> bool {
        self.family() == AddressFamily::IPv4
    }

    pub fn is_ipv6(&self) -> bool {
        self.family() == AddressFamily::IPv6
    }

    pub fn is_unix(&self) -> bool {
        self.family() == AddressFamily::Unix
    }

    pub fn is_stream(&self) -> bool {
        self.kind() == Protocol::Stream
    }

    pub fn is_datagram(&self) -> bool {
        self.kind() == Protocol::Datagram
    }
}

impl TryFrom<u8> for TransportProtocol {
    type Error = HeaderError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x00 => Ok(Self::Unspecified),
            0x11 => Ok(Self::Tcp4),
            0x12 => Ok(Self::Udp4),
            0x21 => Ok(Self::Tcp6),
            0x22 => Ok(Self::Udp6),
            0x31 => Ok(Self::UnixStream),
            0x32 => Ok(Self::UnixDatagram),
            _ => Err(HeaderError::UnsupportedTransportProtocol(byte)),
        }
    }
}

impl Addresses {
    /// The address family of these addresses.
    pub fn family(&self) -> AddressFamily {
        match self {
            Addresses::Unspecified => AddressFamily::Unspecified,
            Addresses::IPv4(..) => AddressFamily::IPv4,
            Addresses::IPv6(..) => AddressFamily::IPv6,
            Addresses::Unix(..) => AddressFamily::Unix,
        }
    }
}

/// A PROXY protocol header, independent of the version it is read from or written as.
/// Headers are immutable; the constructors ensure the addresses belong to the family of the transport protocol.
///
/// ## Examples
/// ```rust
/// use proxyproto::{Command, Header, IPv4, TransportProtocol, Version};
///
/// let header = Header::proxy(
///     Version::Two,
///     TransportProtocol::Tcp4,
///     IPv4::new([192, 168, 0, 1], [192, 168, 0, 11], 56324, 443).into(),
/// )
/// .unwrap();
///
/// assert_eq!(header.command(), Command::Proxy);
/// assert_eq!(header.source(), Some("192.168.0.1:56324".parse().unwrap()));
/// assert!(header.equal_to(&header.clone()));
/// ```
///
/// ### Family Mismatch
/// ```rust
/// use std::net::Ipv6Addr;
/// use proxyproto::{Header, IPv6, TransportProtocol, Version};
///
/// let addresses = IPv6::new(Ipv6Addr::LOCALHOST, Ipv6Addr::LOCALHOST, 80, 443).into();
///
/// assert!(Header::proxy(Version::One, TransportProtocol::Tcp4, addresses).is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Header {
    version: Version,
    command: Command,
    protocol: TransportProtocol,
    addresses: Addresses,
}

impl Header {
    /// Create a new instance of a header.
    /// Unspecified addresses are allowed for local commands and unspecified protocols;
    /// otherwise, the addresses must belong to the family of the protocol.
    pub fn new(
        version: Version,
        command: Command,
        protocol: TransportProtocol,
        addresses: Addresses,
    ) -> Result<Self, HeaderError> {
        let family = addresses.family();
        let matches = family == protocol.family()
            || (family == AddressFamily::Unspecified && command.is_local());

        if !matches {
            return Err(HeaderError::AddressFamilyMismatch {
                protocol,
                addresses: family,
            });
        }

        Ok(Header {
            version,
            command,
            protocol,
            addresses,
        })
    }

    /// Create a new header for a connection established by the proxy itself.
    pub fn local(version: Version) -> Self {
        Header {
            version,
            command: Command::Local,
            protocol: TransportProtocol::Unspecified,
            addresses: Addresses::Unspecified,
        }
    }

    /// Create a new header for a connection relayed on behalf of a client.
    pub fn proxy(
        version: Version,
        protocol: TransportProtocol,
        addresses: Addresses,
    ) -> Result<Self, HeaderError> {
        Header::new(version, Command::Proxy, protocol, addresses)
    }

    /// Create a new header for a TCP connection relayed from `source` to `destination`.
    /// Both socket addresses must be of the same IP family.
    pub fn from_addrs(
        version: Version,
        source: SocketAddr,
        destination: SocketAddr,
    ) -> Result<Self, HeaderError> {
        match (source, destination) {
            (SocketAddr::V4(source), SocketAddr::V4(destination)) => Header::proxy(
                version,
                TransportProtocol::Tcp4,
                IPv4::from((source, destination)).into(),
            ),
            (SocketAddr::V6(source), SocketAddr::V6(destination)) => Header::proxy(
                version,
                TransportProtocol::Tcp6,
                IPv6::from((source, destination)).into(),
            ),
            (SocketAddr::V4(..), SocketAddr::V6(..)) => Err(HeaderError::AddressFamilyMismatch {
                protocol: TransportProtocol::Tcp4,
                addresses: AddressFamily::IPv6,
            }),
            (SocketAddr::V6(..), SocketAddr::V4(..)) => Err(HeaderError::AddressFamilyMismatch {
                protocol: TransportProtocol::Tcp6,
                addresses: AddressFamily::IPv4,
            }),
        }
    }

    /// The version this header is read from or written as.
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn protocol(&self) -> TransportProtocol {
        self.protocol
    }

    /// The addresses of the client and server connected to by the proxy.
    pub fn addresses(&self) -> &Addresses {
        &self.addresses
    }

    /// The address of the client, for IP families.
    pub fn source(&self) -> Option<SocketAddr> {
        self.addresses.source()
    }

    /// The address of the server the client connected to, for IP families.
    pub fn destination(&self) -> Option<SocketAddr> {
        self.addresses.destination()
    }

    /// Tests whether two headers convey the same connection.
    /// Any two local headers are equivalent, since neither carries a forwarded identity.
    /// Otherwise, the protocols, addresses and ports must match; the versions are ignored.
    pub fn equal_to(&self, other: &Header) -> bool {
        if self.command.is_local() && other.command.is_local() {
            return true;
        }

        self.protocol == other.protocol && self.addresses == other.addresses
    }

    /// Renders this header in the wire format of its version.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self.version {
            Version::One => v1::to_string(self).into_bytes(),
            Version::Two => v2::Builder::from_header(self).build(),
        }
    }

    /// Writes this header to the given sink in the wire format of its version.
    /// Returns the number of bytes written.
    /// A failed write may leave part of the header in the sink.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<usize> {
        let bytes = self.to_bytes();

        writer.write_all(&bytes)?;

        Ok(bytes.len())
    }
}

/// Tests whether two optional headers convey the same connection.
/// A missing header is never equal to anything, not even another missing header.
pub fn equal(left: Option<&Header>, right: Option<&Header>) -> bool {
    match (left, right) {
        (Some(left), Some(right)) => left.equal_to(right),
        _ => false,
    }
}
