//! Wire protocol error types.

use thiserror::Error;

/// Wire protocol errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Incomplete frame (need more data)
    #[error("incomplete frame")]
    Incomplete,

    /// Frame checksum does not fold to zero
    #[error("checksum mismatch")]
    Checksum,

    /// No bytes supplied
    #[error("empty frame")]
    Empty,

    /// Frame length disagrees with the opcode length class
    #[error("length mismatch: expected {expected}, got {actual}")]
    Length {
        /// Length implied by the opcode
        expected: usize,
        /// Bytes actually supplied
        actual: usize,
    },

    /// Byte is not a known opcode
    #[error("unknown opcode {0:#04x}")]
    Opcode(u8),

    /// Byte is not a valid value for a field enumeration
    #[error("invalid {0} value {1:#04x}")]
    Value(&'static str, u8),
}
