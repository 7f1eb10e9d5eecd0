//! Minimal DCC packet support for send packet immediate payloads.
//!
//! A DCC packet is a short run of instruction bytes followed by an error
//! detection byte, the XOR of every instruction byte.

use crate::functions::FunctionGroup;
use crate::WireError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Largest short (primary) DCC address.
pub const MAX_SHORT_ADDRESS: u16 = 127;

/// Largest long (extended) DCC address.
pub const MAX_LONG_ADDRESS: u16 = 10239;

/// Longest packet, error byte included, that fits a send packet immediate.
pub const MAX_IMM_PACKET_LEN: usize = 6;

/// Feature expansion function blocks and their instruction bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionBlock {
    /// F13 to F20
    F13F20,
    /// F21 to F28
    F21F28,
    /// F29 to F36
    F29F36,
    /// F37 to F44
    F37F44,
    /// F45 to F52
    F45F52,
    /// F53 to F60
    F53F60,
    /// F61 to F68
    F61F68,
}

impl FunctionBlock {
    /// Feature expansion instruction byte
    pub fn instruction(self) -> u8 {
        match self {
            FunctionBlock::F13F20 => 0xde,
            FunctionBlock::F21F28 => 0xdf,
            FunctionBlock::F29F36 => 0xd8,
            FunctionBlock::F37F44 => 0xd9,
            FunctionBlock::F45F52 => 0xda,
            FunctionBlock::F53F60 => 0xdb,
            FunctionBlock::F61F68 => 0xdc,
        }
    }

    /// Lowest function number in the block
    pub fn first_function(self) -> usize {
        match self {
            FunctionBlock::F13F20 => 13,
            FunctionBlock::F21F28 => 21,
            FunctionBlock::F29F36 => 29,
            FunctionBlock::F37F44 => 37,
            FunctionBlock::F45F52 => 45,
            FunctionBlock::F53F60 => 53,
            FunctionBlock::F61F68 => 61,
        }
    }
}

/// A DCC packet with its trailing error detection byte
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DccPacket {
    bytes: Bytes,
}

impl DccPacket {
    /// Wrap a packet that already carries its error byte.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < 2 {
            return Err(WireError::Empty);
        }
        let packet = Self {
            bytes: Bytes::copy_from_slice(bytes),
        };
        if !packet.is_checksum_ok() {
            return Err(WireError::Checksum);
        }
        Ok(packet)
    }

    /// Build a packet from instruction bytes, appending the error byte.
    pub fn from_payload(payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(payload.len() + 1);
        bytes.extend_from_slice(payload);
        bytes.push(Self::error_byte(payload));
        Self {
            bytes: Bytes::from(bytes),
        }
    }

    /// The DCC idle packet
    pub fn idle() -> Self {
        Self::from_payload(&[0xff, 0x00])
    }

    /// Feature expansion function packet for `address`.
    ///
    /// Addresses up to 127 use the one byte short form, larger ones the two
    /// byte long form. Returns `None` for address 0 or above 10239.
    pub fn function_expansion(
        address: u16,
        block: FunctionBlock,
        functions: &FunctionGroup,
    ) -> Option<Self> {
        let mut payload = Self::address_bytes(address)?;
        payload.push(block.instruction());
        payload.push(functions.pack(block.first_function(), 8));
        Some(Self::from_payload(&payload))
    }

    /// All bytes, error byte included
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Instruction bytes without the error byte
    pub fn payload(&self) -> &[u8] {
        &self.bytes[..self.bytes.len().saturating_sub(1)]
    }

    /// Number of bytes, error byte included
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the packet holds no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the error byte matches the instruction bytes
    pub fn is_checksum_ok(&self) -> bool {
        !self.bytes.is_empty() && self.bytes.iter().fold(0u8, |acc, byte| acc ^ byte) == 0
    }

    fn error_byte(payload: &[u8]) -> u8 {
        payload.iter().fold(0u8, |acc, byte| acc ^ byte)
    }

    fn address_bytes(address: u16) -> Option<Vec<u8>> {
        match address {
            1..=MAX_SHORT_ADDRESS => Some(vec![address as u8]),
            128..=MAX_LONG_ADDRESS => Some(vec![0xc0 | (address >> 8) as u8, (address & 0xff) as u8]),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_packet() {
        let idle = DccPacket::idle();
        assert_eq!(idle.bytes(), &[0xff, 0x00, 0xff]);
        assert!(idle.is_checksum_ok());
    }

    #[test]
    fn test_from_bytes_validates_error_byte() {
        assert!(DccPacket::from_bytes(&[0x03, 0x3f, 0x3c]).is_ok());
        assert_eq!(
            DccPacket::from_bytes(&[0x03, 0x3f, 0x00]),
            Err(WireError::Checksum)
        );
        assert_eq!(DccPacket::from_bytes(&[0x03]), Err(WireError::Empty));
    }

    #[test]
    fn test_function_expansion_short_address() {
        let functions = FunctionGroup::new().with(13, true).with(20, true);
        let packet = DccPacket::function_expansion(3, FunctionBlock::F13F20, &functions).unwrap();
        assert_eq!(packet.payload(), &[0x03, 0xde, 0b1000_0001]);
        assert!(packet.is_checksum_ok());
    }

    #[test]
    fn test_function_expansion_long_address() {
        let functions = FunctionGroup::new().with(61, true);
        let packet =
            DccPacket::function_expansion(1234, FunctionBlock::F61F68, &functions).unwrap();
        assert_eq!(packet.payload(), &[0xc4, 0xd2, 0xdc, 0x01]);
        assert_eq!(packet.len(), 5);
    }

    #[test]
    fn test_function_expansion_rejects_bad_address() {
        let functions = FunctionGroup::new();
        assert!(DccPacket::function_expansion(0, FunctionBlock::F21F28, &functions).is_none());
        assert!(DccPacket::function_expansion(10240, FunctionBlock::F21F28, &functions).is_none());
    }
}
