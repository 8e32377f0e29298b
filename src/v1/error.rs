//! Errors for the text proxy protocol.

/// An error in parsing a text PROXY protocol header.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Header must start with 'PROXY'.")]
    InvalidPrefix,
    #[error("Header does not end with the string '\\r\\n'.")]
    MissingNewLine,
    #[error("Header must end in '\\r\\n', not a bare '\\n'.")]
    InvalidSuffix,
    #[error("Header missing protocol.")]
    MissingProtocol,
    #[error("Header has an invalid protocol. Protocol must be one of: TCP4, TCP6, UNKNOWN.")]
    InvalidProtocol,
    #[error("Header missing source address.")]
    MissingSourceAddress,
    #[error("Header missing destination address.")]
    MissingDestinationAddress,
    #[error("Header missing source port.")]
    MissingSourcePort,
    #[error("Header missing destination port.")]
    MissingDestinationPort,
    #[error("Header contains invalid IP address for the source.")]
    InvalidSourceAddress(#[source] std::net::AddrParseError),
    #[error("Header contains invalid IP address for the destination.")]
    InvalidDestinationAddress(#[source] std::net::AddrParseError),
    #[error("Header contains invalid TCP port for the source.")]
    InvalidSourcePort(#[source] Option<std::num::ParseIntError>),
    #[error("Header contains invalid TCP port for the destination.")]
    InvalidDestinationPort(#[source] Option<std::num::ParseIntError>),
    #[error("Header contains unexpected characters after the destination port.")]
    UnexpectedCharacters,
    #[error("Header does not fit within the maximum length of 107 bytes.")]
    HeaderTooLong,
    #[error("Header is not valid UTF-8.")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}
