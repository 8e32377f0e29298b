use crate::error::HeaderError;

/// An error in parsing a binary PROXY protocol header.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Expected header to start with a prefix of '\\r\\n\\r\\n\\0\\r\\nQUIT\\n'.")]
    Prefix,
    #[error("Unable to read the version and command byte after the prefix.")]
    UnreadableVersionCommand,
    #[error("Unable to read the address family and protocol byte.")]
    UnreadableAddressFamily,
    #[error("Unable to read the 2-byte length of the addresses.")]
    UnreadableLength,
    #[error("Expected version {0:X} to be equal to 2.")]
    Version(u8),
    #[error("Invalid command {0:X}. Command must be one of: Local, Proxy.")]
    Command(u8),
    #[error("Invalid address family and protocol {0:#04X}. Must be one of: UNSPEC, TCP4, UDP4, TCP6, UDP6, UNIX_STREAM, UNIX_DGRAM.")]
    AddressFamilyProtocol(u8),
    #[error("Header length of {1} bytes is too short for the {0} bytes of its address family.")]
    InvalidLength(usize, u16),
    #[error("Header does not contain the advertised length of the addresses and TLVs (contains {1} out of {0} bytes).")]
    Partial(u16, usize),
    #[error("Unable to resolve the source Unix address.")]
    UnresolvableSourceUnixAddress,
    #[error("Unable to resolve the destination Unix address.")]
    UnresolvableDestinationUnixAddress,
    #[error(transparent)]
    Header(#[from] HeaderError),
}
