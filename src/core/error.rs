/// Error taxonomy for the claim checker
///
/// Wire-level problems are kept apart from session-level problems so the
/// retry policy can tell a flaky network from a server that changed shape.

use thiserror::Error;

/// Errors raised while encoding, decoding or framing protobuf wire data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Buffer ended before a varint or a declared length was satisfied
    #[error("truncated input at offset {offset} (field {field:?})")]
    TruncatedInput { offset: usize, field: Option<u32> },

    /// Wire type outside {0, 2}
    #[error("unknown wire type {wire_type} for field {field} at offset {offset}")]
    UnknownWireType {
        wire_type: u8,
        field: u32,
        offset: usize,
    },

    /// Field number 0 is never valid on the wire
    #[error("invalid field number 0 at offset {offset}")]
    InvalidFieldNumber { offset: usize },

    /// gRPC-Web response shorter than the 5-byte frame prefix
    #[error("gRPC-Web frame too short: {len} bytes")]
    FrameTooShort { len: usize },

    /// Compressed frames and trailer frames are not supported
    #[error("unsupported gRPC-Web frame flag {flag:#04x}")]
    UnsupportedCompression { flag: u8 },
}

/// Network and HTTP failures. All of them are retryable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {message}")]
    Connection { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
}

/// Errors that end the processing of a single wallet
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Expected field absent or of the wrong kind
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Malformed secret key or signing failure
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl ClaimError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto(message.into())
    }
}

/// Classifies errors for the retry policy
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for TransportError {
    fn is_retryable(&self) -> bool {
        true
    }
}

impl Retryable for ClaimError {
    fn is_retryable(&self) -> bool {
        matches!(self, ClaimError::Transport(_))
    }
}

pub type ClaimResult<T> = std::result::Result<T, ClaimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_errors_are_retryable() {
        let timeout = TransportError::Timeout {
            url: "https://example.invalid".to_string(),
        };
        assert!(timeout.is_retryable());
        assert!(ClaimError::from(timeout).is_retryable());

        assert!(!ClaimError::protocol("challenge missing").is_retryable());
        assert!(!ClaimError::crypto("bad key").is_retryable());
        assert!(!ClaimError::from(WireError::FrameTooShort { len: 2 }).is_retryable());
    }

    #[test]
    fn test_wire_error_messages_carry_position() {
        let err = WireError::UnknownWireType {
            wire_type: 5,
            field: 3,
            offset: 7,
        };
        assert_eq!(err.to_string(), "unknown wire type 5 for field 3 at offset 7");
    }
}
