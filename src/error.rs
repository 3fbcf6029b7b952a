//! Error types
//!
//! Only startup and configuration problems surface as [`Error`]. Per-frame
//! and per-datagram failures are contained by the worker that hit them.

use std::net::SocketAddr;

/// Crate-level error type
#[derive(Debug)]
pub enum Error {
    /// Generic I/O failure
    Io(std::io::Error),
    /// A required socket could not be bound
    Bind {
        /// Which channel the socket serves ("frames", "registration", "control")
        role: &'static str,
        /// Address we tried to bind
        addr: SocketAddr,
        /// Underlying error
        source: std::io::Error,
    },
    /// The frame source could not be opened
    SourceUnavailable(String),
    /// Configuration is unusable
    Config(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Bind { role, addr, source } => {
                write!(f, "Failed to bind {} socket on {}: {}", role, addr, source)
            }
            Error::SourceUnavailable(msg) => write!(f, "Frame source unavailable: {}", msg),
            Error::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Bind { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Result alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Encoder failure for a single frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeError(pub String);

impl EncodeError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Encoding failed: {}", self.0)
    }
}

impl std::error::Error for EncodeError {}

/// A control value was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A color channel is outside 0..=255
    ChannelOutOfRange { channel: &'static str, value: i64 },
    /// A field could not be parsed as a number
    InvalidNumber(String),
    /// Wrong number of comma-separated fields
    FieldCount { expected: usize, actual: usize },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::ChannelOutOfRange { channel, value } => {
                write!(f, "Color channel {} out of range: {}", channel, value)
            }
            ValidationError::InvalidNumber(s) => write!(f, "Invalid number: '{}'", s),
            ValidationError::FieldCount { expected, actual } => {
                write!(f, "Expected {} fields, got {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_display() {
        let err = Error::Bind {
            role: "control",
            addr: "127.0.0.1:8890".parse().unwrap(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        let msg = err.to_string();
        assert!(msg.contains("control"));
        assert!(msg.contains("127.0.0.1:8890"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
