//! Error types for the LocoNet interface.

use thiserror::Error;

/// Errors raised by the interface and its driver
#[derive(Debug, Error)]
pub enum SessionError {
    /// No transmit collaborator is attached
    #[error("interface is detached")]
    Detached,

    /// The transmit collaborator refused a frame
    #[error("transmit failed: {0}")]
    Transmit(String),

    /// The driver task has stopped
    #[error("interface driver closed")]
    Closed,

    /// I/O error on the byte stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
