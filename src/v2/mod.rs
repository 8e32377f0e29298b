//! Version 2 of the HAProxy protocol (binary version).
//!
//! See <https://haproxy.org/download/1.8/doc/proxy-protocol.txt>

mod builder;
mod error;

pub use builder::Builder;
pub use error::ParseError;

use crate::error::Error;
use crate::ip::{Addresses, IPv4, IPv6, Unix, UNIX_PATH_LENGTH};
use crate::model::{AddressFamily, Command, Header, TransportProtocol, Version};
use crate::reader::PeekRead;
use nom::bytes::complete::{tag, take};
use nom::combinator::map;
use nom::number::complete::{be_u128, be_u16, be_u32, be_u8};
use nom::sequence::tuple;
use nom::IResult;
use std::convert::TryFrom;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::from_utf8;
use tracing::trace;

pub const PROTOCOL_PREFIX: &[u8] = b"\r\n\r\n\0\r\nQUIT\n";
pub const VERSION_COMMAND: usize = PROTOCOL_PREFIX.len();
pub const ADDRESS_FAMILY_PROTOCOL: usize = VERSION_COMMAND + 1;
pub const LENGTH: usize = ADDRESS_FAMILY_PROTOCOL + 1;
pub const MINIMUM_LENGTH: usize = LENGTH + 2;
pub const IPV4_ADDRESSES_BYTES: usize = 12;
pub const IPV6_ADDRESSES_BYTES: usize = 36;
pub const UNIX_ADDRESSES_BYTES: usize = UNIX_PATH_LENGTH * 2;

/// The binary version nibble.
const VERSION: u8 = 0x2;

/// The validated 4 bytes following the prefix.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Fixed {
    command: Command,
    protocol: TransportProtocol,
    length: u16,
}

/// The number of bytes of addresses required by an address family.
fn address_bytes(family: AddressFamily) -> usize {
    match family {
        AddressFamily::Unspecified => 0,
        AddressFamily::IPv4 => IPV4_ADDRESSES_BYTES,
        AddressFamily::IPv6 => IPV6_ADDRESSES_BYTES,
        AddressFamily::Unix => UNIX_ADDRESSES_BYTES,
    }
}

/// Runs a nom parser, replacing any failure with the given error.
fn field<'a, O>(
    mut parser: impl FnMut(&'a [u8]) -> IResult<&'a [u8], O>,
    input: &'a [u8],
    error: ParseError,
) -> Result<(&'a [u8], O), ParseError> {
    parser(input).map_err(|_| error)
}

/// Parses and validates the prefix, version, command, transport protocol and length.
/// For proxied connections, the length is checked against the address family before any address bytes are read.
/// A local block of any length is discarded unread.
fn parse_fixed(input: &[u8]) -> Result<Fixed, ParseError> {
    let (input, _) = field(tag(PROTOCOL_PREFIX), input, ParseError::Prefix)?;
    let (input, version_command) = field(be_u8, input, ParseError::UnreadableVersionCommand)?;

    let version = version_command >> 4;
    if version != VERSION {
        return Err(ParseError::Version(version));
    }

    let command = Command::try_from(version_command & 0x0F)
        .map_err(|_| ParseError::Command(version_command & 0x0F))?;

    let (input, family_protocol) = field(be_u8, input, ParseError::UnreadableAddressFamily)?;
    let protocol = TransportProtocol::try_from(family_protocol)
        .map_err(|_| ParseError::AddressFamilyProtocol(family_protocol))?;

    let (_, length) = field(be_u16, input, ParseError::UnreadableLength)?;

    let required = address_bytes(protocol.family());
    if command.is_proxy() && (length as usize) < required {
        return Err(ParseError::InvalidLength(required, length));
    }

    Ok(Fixed {
        command,
        protocol,
        length,
    })
}

fn ipv4(input: &[u8]) -> IResult<&[u8], IPv4> {
    map(
        tuple((be_u32, be_u32, be_u16, be_u16)),
        |(source_address, destination_address, source_port, destination_port)| {
            IPv4::new(
                Ipv4Addr::from(source_address),
                Ipv4Addr::from(destination_address),
                source_port,
                destination_port,
            )
        },
    )(input)
}

fn ipv6(input: &[u8]) -> IResult<&[u8], IPv6> {
    map(
        tuple((be_u128, be_u128, be_u16, be_u16)),
        |(source_address, destination_address, source_port, destination_port)| {
            IPv6::new(
                Ipv6Addr::from(source_address),
                Ipv6Addr::from(destination_address),
                source_port,
                destination_port,
            )
        },
    )(input)
}

fn unix_path(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take(UNIX_PATH_LENGTH)(input)
}

/// Converts a NUL-padded socket path into text, ending at the first NUL.
fn resolve_unix_path(path: &[u8]) -> Option<&str> {
    let end = path.iter().position(|byte| *byte == 0).unwrap_or(path.len());

    from_utf8(&path[..end]).ok()
}

fn unix(input: &[u8]) -> Result<Unix, ParseError> {
    let (input, source) = field(
        unix_path,
        input,
        ParseError::UnresolvableSourceUnixAddress,
    )?;
    let (_, destination) = field(
        unix_path,
        input,
        ParseError::UnresolvableDestinationUnixAddress,
    )?;

    let source =
        resolve_unix_path(source).ok_or(ParseError::UnresolvableSourceUnixAddress)?;
    let destination = resolve_unix_path(destination)
        .ok_or(ParseError::UnresolvableDestinationUnixAddress)?;

    Ok(Unix::new(source, destination)?)
}

/// Parses the addresses at the front of the advertised block.
/// Any bytes after the addresses are TLVs and are ignored.
fn parse_addresses(fixed: &Fixed, block: &[u8]) -> Result<Header, ParseError> {
    let partial = |_| ParseError::Partial(fixed.length, block.len());

    let addresses = if fixed.command.is_local() {
        Addresses::Unspecified
    } else {
        match fixed.protocol.family() {
            AddressFamily::Unspecified => Addresses::Unspecified,
            AddressFamily::IPv4 => Addresses::IPv4(ipv4(block).map_err(partial)?.1),
            AddressFamily::IPv6 => Addresses::IPv6(ipv6(block).map_err(partial)?.1),
            AddressFamily::Unix => Addresses::Unix(unix(block)?),
        }
    };

    let skipped = block.len() - address_bytes(addresses.family());
    if skipped > 0 {
        trace!(length = skipped, command = ?fixed.command, "skipping bytes after the addresses");
    }

    Ok(Header::new(
        Version::Two,
        fixed.command,
        fixed.protocol,
        addresses,
    )?)
}

/// Reads a binary PROXY protocol header from a stream positioned at the prefix.
/// On success, the stream is positioned at the first byte after the advertised length,
/// having skipped any TLVs.
/// On failure, an unknown number of bytes have been consumed.
///
/// ## Examples
/// ```rust
/// use proxyproto::{v2, TransportProtocol, Version};
///
/// let mut input: &[u8] = b"\r\n\r\n\0\r\nQUIT\n\x21\x11\x00\x0C\xC0\xA8\x00\x01\xC0\xA8\x00\x0B\xDC\x04\x01\xBBdata";
/// let header = v2::read(&mut input).unwrap();
///
/// assert_eq!(header.version(), Version::Two);
/// assert_eq!(header.protocol(), TransportProtocol::Tcp4);
/// assert_eq!(header.source(), Some("192.168.0.1:56324".parse().unwrap()));
/// assert_eq!(input, b"data");
/// ```
pub fn read<R: PeekRead + ?Sized>(reader: &mut R) -> Result<Header, Error> {
    let fixed = parse_fixed(reader.peek(MINIMUM_LENGTH)?)?;
    reader.consume(MINIMUM_LENGTH);

    let length = fixed.length as usize;
    let header = {
        let block = reader.peek(length)?;

        if block.len() < length {
            return Err(ParseError::Partial(fixed.length, block.len()).into());
        }

        parse_addresses(&fixed, block)?
    };
    reader.consume(length);

    Ok(header)
}
