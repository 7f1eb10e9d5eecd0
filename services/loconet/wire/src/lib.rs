//! LocoNet wire protocol: framing, classification, field access and command encoding.
//!
//! This crate holds everything that can be done with LocoNet bytes without
//! touching a transport: reassembling frames from a byte stream, naming what
//! a frame is, reading its fields and building outbound commands.
//!
//! ## Features
//!
//! - **Reassembly**: Resynchronising decoder that survives garbage and false starts
//! - **Classification**: Every frame maps to a [`MessageType`], unknown ones included
//! - **Field Access**: Typed accessors gated on the message type
//! - **Command Encoding**: Range-checked factories for slots, switches, IMM and IPL
//! - **Drafts**: Copy-on-write editing of option-switch blocks and TRK bits
//!
//! ## Wire Format
//!
//! ```text
//! +----------+---------------------------+----------+
//! | opcode   | payload (7-bit bytes)     | checksum |
//! | 1xxxxxxx | 0xxxxxxx ...              | 0xxxxxxx |
//! +----------+---------------------------+----------+
//!
//! opcode bits 6..5 give the length class:
//!   00 -> 2 bytes   01 -> 4 bytes   10 -> 6 bytes
//!   11 -> next byte holds the length (0 means 128)
//!
//! checksum = !(xor of all preceding bytes)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checksum;
pub mod classify;
pub mod commands;
pub mod dcc;
pub mod decoder;
pub mod device;
pub mod draft;
pub mod error;
pub mod fields;
pub mod functions;
pub mod message;
pub mod message_type;
pub mod opcode;
pub mod provisional;
pub mod types;

// Re-export main types
pub use checksum::{append_checksum, checksum, is_checksum_ok};
pub use classify::classify;
pub use commands::{
    encode_peer_xfer, IplDescriptor, LOCONET_ID_RANGE, LOCO_ADDRESS_RANGE, QUERY_SLOT_RANGE,
    SLOT_BANK_RANGE, SLOT_RANGE, SPEED_RANGE, SWITCH_ADDRESS_RANGE,
};
pub use dcc::{DccPacket, FunctionBlock, MAX_IMM_PACKET_LEN, MAX_LONG_ADDRESS, MAX_SHORT_ADDRESS};
pub use decoder::{DecoderStats, MessageDecoder};
pub use draft::MessageDraft;
pub use error::WireError;
pub use functions::{FunctionGroup, MAX_FUNCTION};
pub use message::Message;
pub use message_type::MessageType;
pub use opcode::{frame_length, is_opcode, Opcode, OPCODE_MASK};
pub use types::{
    CommandStationType, ConsistState, DecoderProtocol, Direction, ImmRepeat, ProductCode,
    SlotState, SwitchState, TrackStatus,
};
