//! Version 1 of the HAProxy protocol (text version).
//!
//! See <https://haproxy.org/download/1.8/doc/proxy-protocol.txt>

mod error;

pub use error::ParseError;

use crate::error::Error;
use crate::ip::{Addresses, IPv4, IPv6};
use crate::model::{Command, Header, TransportProtocol, Version};
use std::fmt;
use std::io::{self, BufRead};
use std::net::{AddrParseError, Ipv4Addr, Ipv6Addr};
use std::str::{from_utf8, FromStr};

pub const PROTOCOL_PREFIX: &str = "PROXY";
pub const PROTOCOL_SUFFIX: &str = "\r\n";
pub const SEPARATOR: char = ' ';
pub const TCP4: &str = "TCP4";
pub const TCP6: &str = "TCP6";
pub const UNKNOWN: &str = "UNKNOWN";

/// The maximum length of a header in bytes, including the trailing `\r\n`.
pub const MAX_LENGTH: usize = 107;

const ZERO: &str = "0";

/// Parses a port of decimal digits only, rejecting signs and leading zeroes.
fn parse_port(port: &str) -> Result<u16, Option<std::num::ParseIntError>> {
    if !port.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(None);
    }

    if port.starts_with(ZERO) && port != ZERO {
        return Err(None);
    }

    port.parse::<u16>().map_err(Some)
}

/// Parses the addresses and ports from a PROXY protocol header for IPv4 and IPv6.
fn parse_addresses<'a, T: FromStr<Err = AddrParseError>, I: Iterator<Item = &'a str>>(
    iterator: &mut I,
) -> Result<(T, T, u16, u16), ParseError> {
    let source_address = iterator.next().ok_or(ParseError::MissingSourceAddress)?;
    let destination_address = iterator
        .next()
        .ok_or(ParseError::MissingDestinationAddress)?;
    let source_port = iterator.next().ok_or(ParseError::MissingSourcePort)?;
    let destination_port = iterator.next().ok_or(ParseError::MissingDestinationPort)?;

    let source_address = source_address
        .parse::<T>()
        .map_err(ParseError::InvalidSourceAddress)?;
    let destination_address = destination_address
        .parse::<T>()
        .map_err(ParseError::InvalidDestinationAddress)?;
    let source_port = parse_port(source_port).map_err(ParseError::InvalidSourcePort)?;
    let destination_port =
        parse_port(destination_port).map_err(ParseError::InvalidDestinationPort)?;

    Ok((
        source_address,
        destination_address,
        source_port,
        destination_port,
    ))
}

/// Parses a header line with the trailing `\r\n` already stripped.
fn parse_line(line: &str) -> Result<Header, ParseError> {
    let mut iterator = line.split(SEPARATOR);

    if Some(PROTOCOL_PREFIX) != iterator.next() {
        return Err(ParseError::InvalidPrefix);
    }

    let (protocol, addresses) = match iterator.next() {
        Some(TCP4) => {
            let (source_address, destination_address, source_port, destination_port) =
                parse_addresses::<Ipv4Addr, _>(&mut iterator)?;

            (
                TransportProtocol::Tcp4,
                Addresses::IPv4(IPv4 {
                    source_address,
                    source_port,
                    destination_address,
                    destination_port,
                }),
            )
        }
        Some(TCP6) => {
            let (source_address, destination_address, source_port, destination_port) =
                parse_addresses::<Ipv6Addr, _>(&mut iterator)?;

            (
                TransportProtocol::Tcp6,
                Addresses::IPv6(IPv6 {
                    source_address,
                    source_port,
                    destination_address,
                    destination_port,
                }),
            )
        }
        Some(UNKNOWN) => return Ok(Header::local(Version::One)),
        Some(protocol) if !protocol.is_empty() => return Err(ParseError::InvalidProtocol),
        _ => return Err(ParseError::MissingProtocol),
    };

    if iterator.next().is_some() {
        return Err(ParseError::UnexpectedCharacters);
    }

    Header::proxy(Version::One, protocol, addresses).map_err(|_| ParseError::InvalidProtocol)
}

/// Parses a text PROXY protocol header from the start of the input.
/// Any input after the first `\r\n` is ignored.
///
/// ## Examples
/// ```rust
/// use proxyproto::{v1, Command, TransportProtocol};
///
/// let header = v1::parse("PROXY TCP4 192.168.0.1 192.168.0.11 56324 443\r\n").unwrap();
///
/// assert_eq!(header.command(), Command::Proxy);
/// assert_eq!(header.protocol(), TransportProtocol::Tcp4);
/// assert_eq!(header.source(), Some("192.168.0.1:56324".parse().unwrap()));
/// assert_eq!(header.destination(), Some("192.168.0.11:443".parse().unwrap()));
/// ```
pub fn parse(input: &str) -> Result<Header, ParseError> {
    let end = input.find(PROTOCOL_SUFFIX).ok_or_else(|| {
        if input.len() >= MAX_LENGTH {
            ParseError::HeaderTooLong
        } else {
            ParseError::MissingNewLine
        }
    })?;

    if end + PROTOCOL_SUFFIX.len() > MAX_LENGTH {
        return Err(ParseError::HeaderTooLong);
    }

    parse_line(&input[..end])
}

/// Reads the header line from the stream, up to and including the first `\n`.
/// Never consumes bytes past the `\n`, nor more than the maximum header length.
fn read_line<R: BufRead + ?Sized>(reader: &mut R) -> Result<Vec<u8>, Error> {
    let mut line = Vec::with_capacity(MAX_LENGTH);

    loop {
        let (done, used) = {
            let available = match reader.fill_buf() {
                Ok(available) => available,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(error.into()),
            };

            if available.is_empty() {
                return Err(ParseError::MissingNewLine.into());
            }

            let remaining = MAX_LENGTH - line.len();
            let window = &available[..available.len().min(remaining)];

            match window.iter().position(|byte| *byte == b'\n') {
                Some(index) => {
                    line.extend_from_slice(&window[..=index]);
                    (true, index + 1)
                }
                None => {
                    line.extend_from_slice(window);
                    (false, window.len())
                }
            }
        };

        reader.consume(used);

        if done {
            return Ok(line);
        }

        if line.len() >= MAX_LENGTH {
            return Err(ParseError::HeaderTooLong.into());
        }
    }
}

/// Reads a text PROXY protocol header from a stream positioned at the `PROXY` signature.
/// On success, the stream is positioned at the first byte after the header.
/// On failure, an unknown number of bytes have been consumed.
pub fn read<R: BufRead + ?Sized>(reader: &mut R) -> Result<Header, Error> {
    let line = read_line(reader)?;
    let line = from_utf8(&line).map_err(ParseError::from)?;
    let line = line
        .strip_suffix(PROTOCOL_SUFFIX)
        .ok_or(ParseError::InvalidSuffix)?;

    Ok(parse_line(line)?)
}

/// Renders a header in the text format.
struct Text<'a>(&'a Header);

impl fmt::Display for Text<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.0;

        write!(f, "{}{}", PROTOCOL_PREFIX, SEPARATOR)?;

        match (header.command(), header.protocol(), header.addresses()) {
            (Command::Proxy, TransportProtocol::Tcp4, Addresses::IPv4(a)) => write!(
                f,
                "{} {} {} {} {}",
                TCP4, a.source_address, a.destination_address, a.source_port, a.destination_port
            )?,
            (Command::Proxy, TransportProtocol::Tcp6, Addresses::IPv6(a)) => write!(
                f,
                "{} {} {} {} {}",
                TCP6, a.source_address, a.destination_address, a.source_port, a.destination_port
            )?,
            _ => write!(f, "{}", UNKNOWN)?,
        }

        write!(f, "{}", PROTOCOL_SUFFIX)
    }
}

/// Renders a header in the text format, regardless of its version.
/// Only proxied TCP connections have addresses in the text format; anything else is `UNKNOWN`.
///
/// ## Examples
/// ```rust
/// use proxyproto::{v1, Header, Version};
///
/// assert_eq!(v1::to_string(&Header::local(Version::One)), "PROXY UNKNOWN\r\n");
/// ```
pub fn to_string(header: &Header) -> String {
    Text(header).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ip::Unix;

    fn tcp4(
        source_address: [u8; 4],
        destination_address: [u8; 4],
        source_port: u16,
        destination_port: u16,
    ) -> Header {
        Header::proxy(
            Version::One,
            TransportProtocol::Tcp4,
            IPv4::new(
                source_address,
                destination_address,
                source_port,
                destination_port,
            )
            .into(),
        )
        .unwrap()
    }

    fn tcp6(source_address: &str, destination_address: &str, port: u16) -> Header {
        Header::proxy(
            Version::One,
            TransportProtocol::Tcp6,
            IPv6::new(
                source_address.parse::<Ipv6Addr>().unwrap(),
                destination_address.parse::<Ipv6Addr>().unwrap(),
                port,
                port,
            )
            .into(),
        )
        .unwrap()
    }

    #[test]
    fn exact_tcp4() {
        let text = "PROXY TCP4 192.168.0.1 192.168.0.11 56324 443\r\n";
        let expected = tcp4([192, 168, 0, 1], [192, 168, 0, 11], 56324, 443);

        assert_eq!(parse(text), Ok(expected.clone()));
        assert_eq!(read(&mut text.as_bytes()).unwrap(), expected);
    }

    #[test]
    fn read_stops_after_header() {
        let mut input: &[u8] = b"PROXY TCP4 255.255.255.255 255.255.255.255 65535 65535\r\nFoobar";
        let expected = tcp4([255; 4], [255; 4], 65535, 65535);

        assert_eq!(read(&mut input).unwrap(), expected);
        assert_eq!(input, b"Foobar");
    }

    #[test]
    fn zero_ports() {
        let text = "PROXY TCP4 0.0.0.0 0.0.0.0 0 0\r\n";

        assert_eq!(parse(text), Ok(tcp4([0; 4], [0; 4], 0, 0)));
    }

    #[test]
    fn parse_partial() {
        let text = "PROXY TCP4 255.255.255.255 255.255.255.255 65535 65535";

        assert_eq!(parse(text), Err(ParseError::MissingNewLine));
        assert!(matches!(
            read(&mut text.as_bytes()),
            Err(Error::V1(ParseError::MissingNewLine))
        ));
    }

    #[test]
    fn parse_bare_newline() {
        let text = "PROXY UNKNOWN\n";

        assert!(matches!(
            read(&mut text.as_bytes()),
            Err(Error::V1(ParseError::InvalidSuffix))
        ));
    }

    #[test]
    fn parse_invalid_utf8() {
        let mut input: &[u8] = b"PROXY \xF0\x90\x80 TCP4\r\n";

        assert!(matches!(
            read(&mut input),
            Err(Error::V1(ParseError::InvalidUtf8(..)))
        ));
    }

    #[test]
    fn parse_invalid() {
        assert_eq!(parse("PROXY \r\n"), Err(ParseError::MissingProtocol));
        assert_eq!(parse("PROXY\r\n"), Err(ParseError::MissingProtocol));
    }

    #[test]
    fn parse_tcp4_invalid() {
        let text = "PROXY TCP4 255.255.255.255 256.255.255.255 65535 65535\r\n";

        assert_eq!(
            parse(text),
            Err(ParseError::InvalidDestinationAddress(
                "".parse::<Ipv4Addr>().unwrap_err()
            ))
        );
    }

    #[test]
    fn parse_tcp4_leading_zeroes() {
        let text = "PROXY TCP4 255.0255.255.255 255.255.255.255 65535 65535\r\n";

        assert_eq!(
            parse(text),
            Err(ParseError::InvalidSourceAddress(
                "".parse::<Ipv4Addr>().unwrap_err()
            ))
        );
    }

    #[test]
    fn parse_tcp4_with_ipv6_address() {
        let text = "PROXY TCP4 ::1 127.0.0.1 80 443\r\n";

        assert_eq!(
            parse(text),
            Err(ParseError::InvalidSourceAddress(
                "".parse::<Ipv4Addr>().unwrap_err()
            ))
        );
    }

    #[test]
    fn parse_tcp6_with_ipv4_address() {
        let text = "PROXY TCP6 ::1 127.0.0.1 80 443\r\n";

        assert_eq!(
            parse(text),
            Err(ParseError::InvalidDestinationAddress(
                "".parse::<Ipv6Addr>().unwrap_err()
            ))
        );
    }

    #[test]
    fn parse_unknown_connection() {
        let mut input: &[u8] = b"PROXY UNKNOWN\r\nTwo";
        let header = read(&mut input).unwrap();

        assert_eq!(header, Header::local(Version::One));
        assert_eq!(header.command(), Command::Local);
        assert_eq!(header.protocol(), TransportProtocol::Unspecified);
        assert_eq!(input, b"Two");
    }

    #[test]
    fn parse_worst_case() {
        let text = "PROXY UNKNOWN ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff 65535 65535\r\n";

        assert_eq!(text.len(), MAX_LENGTH);
        assert_eq!(parse(text), Ok(Header::local(Version::One)));
        assert_eq!(read(&mut text.as_bytes()).unwrap(), Header::local(Version::One));
    }

    #[test]
    fn valid_tcp6() {
        let ip = "ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff";
        let text = "PROXY TCP6 ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff 65535 65535\r\nHi!";

        assert_eq!(parse(text), Ok(tcp6(ip, ip, 65535)));
    }

    #[test]
    fn parse_tcp6_shortened_connection() {
        let ip = "ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff";
        let text = "PROXY TCP6 ffff::ffff ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff 65535 65535\r\n";

        assert_eq!(parse(text), Ok(tcp6("ffff::ffff", ip, 65535)));
    }

    #[test]
    fn parse_tcp6_wildcard() {
        let ip = "ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff";
        let text = "PROXY TCP6 :: ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff 65535 65535\r\n";

        assert_eq!(parse(text), Ok(tcp6("::", ip, 65535)));
    }

    #[test]
    fn parse_tcp6_invalid() {
        let text = "PROXY TCP6 ffff:gggg:ffff:ffff:ffff:ffff:ffff:ffff ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff 65535 65535\r\n";

        assert_eq!(
            parse(text),
            Err(ParseError::InvalidSourceAddress(
                "".parse::<Ipv6Addr>().unwrap_err()
            ))
        );
    }

    #[test]
    fn parse_tcp6_over_shortened() {
        let text = "PROXY TCP6 ffff::ffff:ffff:ffff:ffff::ffff ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff 65535 65535\r\n";

        assert_eq!(
            parse(text),
            Err(ParseError::InvalidSourceAddress(
                "".parse::<Ipv6Addr>().unwrap_err()
            ))
        );
    }

    #[test]
    fn parse_leading_zeroes_in_ports() {
        assert_eq!(
            parse("PROXY TCP4 255.255.255.255 255.255.255.255 05535 65535\r\n"),
            Err(ParseError::InvalidSourcePort(None))
        );
        assert_eq!(
            parse("PROXY TCP4 255.255.255.255 255.255.255.255 65535 05535\r\n"),
            Err(ParseError::InvalidDestinationPort(None))
        );
    }

    #[test]
    fn parse_ports_too_large() {
        assert_eq!(
            parse("PROXY TCP4 1.1.1.1 1.1.1.1 65536 65535\r\n"),
            Err(ParseError::InvalidSourcePort(Some(
                "65536".parse::<u16>().unwrap_err()
            )))
        );
        assert_eq!(
            parse("PROXY TCP4 1.1.1.1 1.1.1.1 65535 65536\r\n"),
            Err(ParseError::InvalidDestinationPort(Some(
                "65536".parse::<u16>().unwrap_err()
            )))
        );
    }

    #[test]
    fn parse_port_garbage() {
        assert_eq!(
            parse("PROXY TCP4 1.1.1.1 1.1.1.1 80a 443\r\n"),
            Err(ParseError::InvalidSourcePort(None))
        );
        assert_eq!(
            parse("PROXY TCP4 1.1.1.1 1.1.1.1 80 -443\r\n"),
            Err(ParseError::InvalidDestinationPort(None))
        );
        assert_eq!(
            parse("PROXY TCP4 1.1.1.1 1.1.1.1 +80 443\r\n"),
            Err(ParseError::InvalidSourcePort(None))
        );
        assert_eq!(
            parse("PROXY TCP4 1.1.1.1 1.1.1.1 80 +443\r\n"),
            Err(ParseError::InvalidDestinationPort(None))
        );
    }

    #[test]
    fn parse_missing_fields() {
        assert_eq!(
            parse("PROXY TCP4\r\n"),
            Err(ParseError::MissingSourceAddress)
        );
        assert_eq!(
            parse("PROXY TCP4 1.1.1.1\r\n"),
            Err(ParseError::MissingDestinationAddress)
        );
        assert_eq!(
            parse("PROXY TCP4 1.1.1.1 1.1.1.1\r\n"),
            Err(ParseError::MissingSourcePort)
        );
        assert_eq!(
            parse("PROXY TCP4 1.1.1.1 1.1.1.1 80\r\n"),
            Err(ParseError::MissingDestinationPort)
        );
    }

    #[test]
    fn parse_trailing_characters() {
        assert_eq!(
            parse("PROXY TCP4 1.1.1.1 1.1.1.1 80 443 extra\r\n"),
            Err(ParseError::UnexpectedCharacters)
        );
        assert_eq!(
            parse("PROXY TCP4 1.1.1.1 1.1.1.1 80 443 \r\n"),
            Err(ParseError::UnexpectedCharacters)
        );
    }

    #[test]
    fn parse_lowercase_proxy() {
        assert_eq!(parse("proxy UNKNOWN\r\n"), Err(ParseError::InvalidPrefix));
    }

    #[test]
    fn parse_lowercase_protocol_family() {
        assert_eq!(parse("PROXY tcp4\r\n"), Err(ParseError::InvalidProtocol));
    }

    #[test]
    fn parse_unsupported_protocol_family() {
        assert_eq!(
            parse("PROXY UDP4 1.1.1.1 1.1.1.1 80 443\r\n"),
            Err(ParseError::InvalidProtocol)
        );
    }

    #[test]
    fn parse_too_long() {
        let text = "PROXY UNKNOWN ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff 65535 65535  \r\n";

        assert_eq!(parse(text), Err(ParseError::HeaderTooLong));
        assert!(matches!(
            read(&mut text.as_bytes()),
            Err(Error::V1(ParseError::HeaderTooLong))
        ));
    }

    #[test]
    fn read_does_not_consume_past_limit() {
        let text = format!("PROXY UNKNOWN {}\r\n", "a".repeat(200));
        let mut input = text.as_bytes();

        assert!(read(&mut input).is_err());
        assert_eq!(input.len(), text.len() - MAX_LENGTH);
    }

    #[test]
    fn parse_more_than_one_space() {
        assert_eq!(
            parse("PROXY  TCP4 255.255.255.255 255.255.255.255 65535 65535\r\n"),
            Err(ParseError::MissingProtocol)
        );
        assert_eq!(
            parse("PROXY TCP4  255.255.255.255 255.255.255.255 65535 65535\r\n"),
            Err(ParseError::InvalidSourceAddress(
                "".parse::<Ipv4Addr>().unwrap_err()
            ))
        );
    }

    #[test]
    fn parse_partial_prefix() {
        assert_eq!(parse("PROX\r\n"), Err(ParseError::InvalidPrefix));
    }

    #[test]
    fn canonical_round_trip() {
        let lines = [
            "PROXY TCP4 192.168.0.1 192.168.0.11 56324 443\r\n",
            "PROXY TCP4 0.0.0.0 255.255.255.255 0 65535\r\n",
            "PROXY TCP6 1234:5678:90ab:cdef:fedc:ba09:8765:4321 4321:8765:ba09:fedc:cdef:90ab:5678:1234 443 65535\r\n",
            "PROXY TCP6 ::1 ffff:: 80 8080\r\n",
            "PROXY UNKNOWN\r\n",
        ];

        for line in lines {
            assert_eq!(to_string(&parse(line).unwrap()), line);
        }
    }

    #[test]
    fn to_string_unknown_shapes() {
        let udp = Header::proxy(
            Version::One,
            TransportProtocol::Udp4,
            IPv4::new([1, 1, 1, 1], [2, 2, 2, 2], 1, 2).into(),
        )
        .unwrap();
        let unix = Header::proxy(
            Version::One,
            TransportProtocol::UnixStream,
            Unix::new("/a", "/b").unwrap().into(),
        )
        .unwrap();
        let local = Header::new(
            Version::One,
            Command::Local,
            TransportProtocol::Tcp4,
            IPv4::new([1, 1, 1, 1], [2, 2, 2, 2], 1, 2).into(),
        )
        .unwrap();

        assert_eq!(to_string(&udp), "PROXY UNKNOWN\r\n");
        assert_eq!(to_string(&unix), "PROXY UNKNOWN\r\n");
        assert_eq!(to_string(&local), "PROXY UNKNOWN\r\n");
    }
}
