//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when decoding a radio message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame is too short to be valid.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Frame is too long.
    #[error("frame too long: maximum {max} bytes, got {actual}")]
    FrameTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Unknown command code.
    #[error("unknown command code: 0x{0:02X}")]
    UnknownCommand(u8),

    /// Unknown response code.
    #[error("unknown response code: 0x{0:02X}")]
    UnknownResponse(u8),

    /// RSVP carried a connect type outside the defined range.
    #[error("invalid connect type: 0x{0:02X}")]
    InvalidConnectType(u8),
}
