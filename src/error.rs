//! Error types for the benchmark server.
//!
//! Every error here is scoped to the place it occurs: a parse or transport
//! error ends one connection, a clock error skips one refresh.

use thiserror::Error;

/// Malformed or out-of-protocol request bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A delimiter was missing, a token was empty or held control bytes, or
    /// `Content-Length` was not a single decimal value.
    #[error("malformed request")]
    Malformed,

    /// The request line named a version other than HTTP/1.0 or HTTP/1.1.
    #[error("unsupported HTTP version")]
    UnsupportedVersion,

    /// A line or the whole request head exceeded its scan bound.
    #[error("request head too large")]
    TooLarge,
}

/// Why a connection loop stopped early.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Read or write on the transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The peer sent bytes the parser rejected.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The JSON body could not be serialized.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The clock could not produce a formattable timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("system time cannot be represented as an HTTP date")]
    Unrepresentable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_failure_converts_into_connection_error() {
        let json = serde_json::from_str::<u8>("\"x\"").unwrap_err();
        let err = ConnectionError::from(json);

        assert!(matches!(err, ConnectionError::Encode(_)));
        assert!(err.to_string().starts_with("encode error: "));
    }
}
