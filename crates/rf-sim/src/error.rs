//! Device error types

use std::io;

use rf_protocol::{CodecError, BROADCAST_ADDRESS};
use thiserror::Error;

/// Errors that end a running device
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The transport could not be used or was closed by the peer
    #[error("connection failure: {0}")]
    ConnectionFailure(#[from] io::Error),

    /// A received frame could not be decoded
    #[error("malformed packet: {0}")]
    Codec(#[from] CodecError),

    /// An outgoing frame does not fit the 16-bit length prefix
    #[error("frame of {len} bytes exceeds the {} byte limit", u16::MAX)]
    FrameTooLarge { len: usize },
}

/// Errors raised by the RF scene
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    /// Every address below the broadcast address has been handed out
    #[error("no RF device address left, {} devices already accepted", BROADCAST_ADDRESS)]
    AddressesExhausted,
}

impl DeviceError {
    /// Returns true if the peer closed the connection
    pub fn is_disconnect(&self) -> bool {
        matches!(self, DeviceError::ConnectionFailure(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DeviceError::FrameTooLarge { len: 70_000 };
        assert_eq!(
            err.to_string(),
            "frame of 70000 bytes exceeds the 65535 byte limit"
        );

        let err = DeviceError::from(CodecError::TrailingData { remaining: 2 });
        assert!(err.to_string().starts_with("malformed packet"));

        assert_eq!(
            SceneError::AddressesExhausted.to_string(),
            "no RF device address left, 65535 devices already accepted"
        );
    }

    #[test]
    fn test_disconnect() {
        let eof = DeviceError::from(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(eof.is_disconnect());
        let refused = DeviceError::from(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(!refused.is_disconnect());
    }
}
