//! LocoNet opcodes and the length class carried in their top bits.

use serde::{Deserialize, Serialize};

/// Bit marking a byte as an opcode.
pub const OPCODE_MASK: u8 = 0x80;

/// Known LocoNet opcodes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// Master busy
    Busy = 0x81,
    /// Global power off
    GpOff = 0x82,
    /// Global power on
    GpOn = 0x83,
    /// Force idle state
    Idle = 0x85,
    /// Locomotive reset
    LocoReset = 0x8a,
    /// Set slot speed
    LocoSpd = 0xa0,
    /// Set slot direction and F0-F4
    LocoDirF = 0xa1,
    /// Set slot F5-F8
    LocoSnd = 0xa2,
    /// Set slot F9-F12
    LocoSnd2 = 0xa3,
    /// Switch request
    SwReq = 0xb0,
    /// Turnout sensor report
    SwRep = 0xb1,
    /// General sensor input report
    InputRep = 0xb2,
    /// Long acknowledge
    LongAck = 0xb4,
    /// Write slot status byte 1
    SlotStat1 = 0xb5,
    /// Consist function
    ConsistFunc = 0xb6,
    /// Unlink slots
    UnlinkSlots = 0xb8,
    /// Link slots
    LinkSlots = 0xb9,
    /// Move slot data
    MoveSlots = 0xba,
    /// Request slot data
    RqSlData = 0xbb,
    /// Request switch state
    SwState = 0xbc,
    /// Switch request with acknowledge
    SwAck = 0xbd,
    /// Request locomotive address (expanded slots)
    LocoAdrP2 = 0xbe,
    /// Request locomotive address
    LocoAdr = 0xbf,
    /// Transponding and power manager group
    D0Group = 0xd0,
    /// Programmer mode
    PrMode = 0xd3,
    /// Expanded slot group D4
    D4Group = 0xd4,
    /// Expanded slot group D5
    D5Group = 0xd5,
    /// Duplex receiver group
    D7Group = 0xd7,
    /// Duplex receiver configuration group
    DfGroup = 0xdf,
    /// Peer transfer
    PeerXfer = 0xe5,
    /// Slot data read (expanded slots)
    SlRdDataP2 = 0xe6,
    /// Slot data read
    SlRdData = 0xe7,
    /// Send packet immediate
    ImmPacket = 0xed,
    /// Write slot data (expanded slots)
    WrSlDataP2 = 0xee,
    /// Write slot data
    WrSlData = 0xef,
}

impl TryFrom<u8> for Opcode {
    type Error = crate::WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x81 => Ok(Opcode::Busy),
            0x82 => Ok(Opcode::GpOff),
            0x83 => Ok(Opcode::GpOn),
            0x85 => Ok(Opcode::Idle),
            0x8a => Ok(Opcode::LocoReset),
            0xa0 => Ok(Opcode::LocoSpd),
            0xa1 => Ok(Opcode::LocoDirF),
            0xa2 => Ok(Opcode::LocoSnd),
            0xa3 => Ok(Opcode::LocoSnd2),
            0xb0 => Ok(Opcode::SwReq),
            0xb1 => Ok(Opcode::SwRep),
            0xb2 => Ok(Opcode::InputRep),
            0xb4 => Ok(Opcode::LongAck),
            0xb5 => Ok(Opcode::SlotStat1),
            0xb6 => Ok(Opcode::ConsistFunc),
            0xb8 => Ok(Opcode::UnlinkSlots),
            0xb9 => Ok(Opcode::LinkSlots),
            0xba => Ok(Opcode::MoveSlots),
            0xbb => Ok(Opcode::RqSlData),
            0xbc => Ok(Opcode::SwState),
            0xbd => Ok(Opcode::SwAck),
            0xbe => Ok(Opcode::LocoAdrP2),
            0xbf => Ok(Opcode::LocoAdr),
            0xd0 => Ok(Opcode::D0Group),
            0xd3 => Ok(Opcode::PrMode),
            0xd4 => Ok(Opcode::D4Group),
            0xd5 => Ok(Opcode::D5Group),
            0xd7 => Ok(Opcode::D7Group),
            0xdf => Ok(Opcode::DfGroup),
            0xe5 => Ok(Opcode::PeerXfer),
            0xe6 => Ok(Opcode::SlRdDataP2),
            0xe7 => Ok(Opcode::SlRdData),
            0xed => Ok(Opcode::ImmPacket),
            0xee => Ok(Opcode::WrSlDataP2),
            0xef => Ok(Opcode::WrSlData),
            _ => Err(crate::WireError::Opcode(value)),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> u8 {
        opcode as u8
    }
}

/// Whether a byte can start a frame.
pub fn is_opcode(byte: u8) -> bool {
    byte & OPCODE_MASK == OPCODE_MASK
}

/// Frame length (checksum included) implied by an opcode.
///
/// Opcodes in the variable length class carry their length in the next byte,
/// with zero meaning 128. Returns `None` when that byte is not available.
pub fn frame_length(opcode: u8, length_byte: Option<u8>) -> Option<usize> {
    match (opcode & 0b0110_0000) >> 5 {
        0b00 => Some(2),
        0b01 => Some(4),
        0b10 => Some(6),
        _ => length_byte.map(|len| if len == 0 { 128 } else { len as usize }),
    }
}
