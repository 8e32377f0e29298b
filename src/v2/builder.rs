use crate::ip::{Addresses, UNIX_PATH_LENGTH};
use crate::model::{Header, Version};
use crate::v2::{LENGTH, MINIMUM_LENGTH, PROTOCOL_PREFIX};

/// Renders the binary format of a header.
/// The length is derived from the addresses written; no TLVs are written.
///
/// ## Examples
/// ```rust
/// use proxyproto::{v2, Addresses, Command, IPv4, TransportProtocol, Version};
///
/// let addresses: Addresses = IPv4::new([127, 0, 0, 1], [192, 168, 1, 1], 80, 443).into();
/// let header = v2::Builder::new(Version::Two | Command::Proxy, TransportProtocol::Udp4 as u8)
///     .write_addresses(&addresses)
///     .build();
///
/// assert_eq!(&header[12..], [0x21, 0x12, 0, 12, 127, 0, 0, 1, 192, 168, 1, 1, 0, 80, 1, 187]);
/// ```
#[derive(Debug)]
pub struct Builder {
    header: Vec<u8>,
}

impl Builder {
    /// Starts a header with the given version and command byte and transport protocol byte.
    pub fn new(version_command: u8, transport_protocol: u8) -> Self {
        let mut header = Vec::with_capacity(MINIMUM_LENGTH);

        header.extend(PROTOCOL_PREFIX);
        header.push(version_command);
        header.push(transport_protocol);
        header.extend([0, 0]);

        Builder { header }
    }

    /// Starts a binary header with the command, protocol and addresses of the given header.
    pub fn from_header(header: &Header) -> Self {
        Builder::new(
            Version::Two | header.command(),
            header.protocol() as u8,
        )
        .write_addresses(header.addresses())
    }

    /// Appends the fixed-size payload of the addresses' family.
    /// Unix paths are padded with NUL bytes.
    pub fn write_addresses(mut self, addresses: &Addresses) -> Self {
        match addresses {
            Addresses::Unspecified => (),
            Addresses::IPv4(a) => {
                self.header.extend(a.source_address.octets());
                self.header.extend(a.destination_address.octets());
                self.header.extend(a.source_port.to_be_bytes());
                self.header.extend(a.destination_port.to_be_bytes());
            }
            Addresses::IPv6(a) => {
                self.header.extend(a.source_address.octets());
                self.header.extend(a.destination_address.octets());
                self.header.extend(a.source_port.to_be_bytes());
                self.header.extend(a.destination_port.to_be_bytes());
            }
            Addresses::Unix(a) => {
                self.write_unix_path(a.source());
                self.write_unix_path(a.destination());
            }
        }

        self
    }

    fn write_unix_path(&mut self, path: &str) {
        let end = self.header.len() + UNIX_PATH_LENGTH;

        self.header.extend(path.as_bytes());
        self.header.resize(end, 0);
    }

    /// Fills in the length and returns the rendered header.
    pub fn build(mut self) -> Vec<u8> {
        let length = (self.header.len() - MINIMUM_LENGTH) as u16;

        self.header[LENGTH..MINIMUM_LENGTH].copy_from_slice(&length.to_be_bytes());
        self.header
    }
}
