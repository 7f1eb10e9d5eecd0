//! LocoNet message model.
//!
//! A [`Message`] is a frame with its checksum stripped. It is immutable once
//! built; its semantic type is computed on first use and memoized.

use crate::checksum::{checksum, is_checksum_ok};
use crate::classify::classify;
use crate::message_type::MessageType;
use crate::opcode::{frame_length, Opcode};
use crate::WireError;
use bytes::Bytes;
use once_cell::sync::OnceCell;
use std::fmt;
use std::time::{Duration, SystemTime};

/// A decoded or synthesized LocoNet message (checksum stripped)
#[derive(Clone)]
pub struct Message {
    bytes: Bytes,
    timestamp: Option<SystemTime>,
    time_since_last: Duration,
    message_type: OnceCell<MessageType>,
}

impl Message {
    /// Create a message from bytes that carry no checksum.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            timestamp: None,
            time_since_last: Duration::ZERO,
            message_type: OnceCell::new(),
        }
    }

    /// Create a message from a complete frame, validating its length against
    /// the opcode and stripping the checksum.
    pub fn from_frame(frame: &[u8]) -> Result<Self, WireError> {
        if frame.is_empty() {
            return Err(WireError::Empty);
        }
        let expected = frame_length(frame[0], frame.get(1).copied()).ok_or(WireError::Incomplete)?;
        if expected != frame.len() {
            return Err(WireError::Length {
                expected,
                actual: frame.len(),
            });
        }
        if !is_checksum_ok(frame) {
            return Err(WireError::Checksum);
        }
        Ok(Self::new(Bytes::copy_from_slice(&frame[..frame.len() - 1])))
    }

    /// Create a message from an opcode and its data bytes.
    pub fn from_opcode(opcode: Opcode, data: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(data.len() + 1);
        bytes.push(opcode.into());
        bytes.extend_from_slice(data);
        Self::new(bytes)
    }

    /// Stamp capture time and the gap since the previous message.
    pub fn with_timing(mut self, timestamp: SystemTime, time_since_last: Duration) -> Self {
        self.timestamp = Some(timestamp);
        self.time_since_last = time_since_last;
        self
    }

    /// Message bytes without checksum
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes without checksum
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the message holds no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Message bytes followed by the checksum, ready for the wire
    pub fn frame(&self) -> Bytes {
        let mut frame = Vec::with_capacity(self.bytes.len() + 1);
        frame.extend_from_slice(&self.bytes);
        frame.push(checksum(&self.bytes));
        Bytes::from(frame)
    }

    /// Opcode byte
    pub fn opcode_byte(&self) -> u8 {
        self.at(0)
    }

    /// Known opcode, if the first byte is one
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::try_from(self.opcode_byte()).ok()
    }

    /// Frame length (checksum included) implied by the opcode
    pub fn message_length(&self) -> Option<usize> {
        if self.bytes.is_empty() {
            return None;
        }
        frame_length(self.at(0), self.bytes.get(1).copied())
    }

    /// Capture time, set for messages read from the bus
    pub fn timestamp(&self) -> Option<SystemTime> {
        self.timestamp
    }

    /// Time since the previously received message
    pub fn time_since_last(&self) -> Duration {
        self.time_since_last
    }

    /// Semantic type (computed once)
    pub fn message_type(&self) -> MessageType {
        *self.message_type.get_or_init(|| classify(&self.bytes))
    }

    /// Bytes as space separated upper case hex
    pub fn hex(&self) -> String {
        self.bytes
            .iter()
            .map(|byte| hex::encode_upper([*byte]))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Byte at `index`, zero past the end.
    pub(crate) fn at(&self, index: usize) -> u8 {
        self.bytes.get(index).copied().unwrap_or(0)
    }

    /// Byte at `index` with its 8th bit restored from bit `bit` of the PXCT
    /// byte at `pxct`.
    pub(crate) fn at_with_high_bit(&self, index: usize, pxct: usize, bit: u8) -> u8 {
        let high = if self.at(pxct) & (1 << bit) != 0 { 0x80 } else { 0x00 };
        self.at(index) | high
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Message {}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("type", &self.message_type())
            .field("bytes", &self.hex())
            .finish()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.message_type(), self.hex())
    }
}
