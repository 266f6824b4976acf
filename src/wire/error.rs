use std::fmt;

/// Error produced while decoding a message or option from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer ran out before the declared field could be read.
    TooShort,
    /// An option's declared length fell outside its type's min/max window.
    InvalidLength { code: u16, len: usize },
    /// A domain name label was empty (other than the terminator) or exceeded 63 bytes.
    InvalidDomainLabel,
    /// A domain name's encoded form exceeded 255 bytes.
    DomainTooLong,
    /// A domain name was missing its terminating zero-length label.
    MissingTerminator,
    /// The message type byte did not match any known DHCPv6 message type.
    UnknownMessageType(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::TooShort => write!(f, "buffer shorter than declared field"),
            DecodeError::InvalidLength { code, len } => {
                write!(f, "option {code} has invalid length {len}")
            }
            DecodeError::InvalidDomainLabel => write!(f, "invalid domain name label"),
            DecodeError::DomainTooLong => write!(f, "domain name encodes to more than 255 bytes"),
            DecodeError::MissingTerminator => write!(f, "domain name missing terminating label"),
            DecodeError::UnknownMessageType(t) => write!(f, "unknown message type {t}"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Error produced while encoding a message, option, or domain name to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// A label exceeded 63 bytes.
    LabelTooLong,
    /// The encoded domain name would exceed 255 bytes.
    DomainTooLong,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::LabelTooLong => write!(f, "domain label longer than 63 bytes"),
            EncodeError::DomainTooLong => write!(f, "domain name encodes to more than 255 bytes"),
        }
    }
}

impl std::error::Error for EncodeError {}

pub type DecodeResult<T> = Result<T, DecodeError>;
pub type EncodeResult<T> = Result<T, EncodeError>;
