//! Typed field accessors for slot, locomotive, switch and sensor messages.
//!
//! Every accessor returns `None` when the field does not exist in the
//! message's semantic type.

use crate::dcc::DccPacket;
use crate::functions::FunctionGroup;
use crate::message::Message;
use crate::message_type::MessageType;
use crate::opcode::Opcode;
use crate::types::{
    ConsistState, DecoderProtocol, Direction, ImmRepeat, SlotState, SwitchState, TrackStatus,
};

/// Byte index of the TRK byte in slot data frames.
pub(crate) const TRK_INDEX: usize = 7;

/// Location of an option switch inside an op-switch data block.
///
/// Returns the byte index and bit for switch `number`, or `None` when the
/// switch does not belong to the block of `message_type`.
pub(crate) fn op_sw_position(message_type: MessageType, number: usize) -> Option<(usize, u8)> {
    let index = match message_type {
        MessageType::OpSwDataAP1 if (1..=64).contains(&number) => number - 1,
        MessageType::OpSwDataBP1 if (65..=128).contains(&number) => number - 65,
        _ => return None,
    };
    let byte = index / 8 + if index < 4 { 3 } else { 4 };
    Some((byte, (index % 8) as u8))
}

impl Message {
    /// Slot payload of slot data replies
    pub fn slot_data(&self) -> Option<&[u8]> {
        match self.message_type() {
            MessageType::LocoSlotDataP1 | MessageType::LocoSlotDataP2 => {
                let end = self.message_length()?.checked_sub(3)?;
                self.bytes().get(2..end)
            }
            _ => None,
        }
    }

    /// Repeat count of a send packet immediate
    pub fn imm_repeat_count(&self) -> Option<ImmRepeat> {
        match self.message_type() {
            MessageType::ImmPacket => ImmRepeat::try_from(self.at(3) & 0b0000_1111).ok(),
            _ => None,
        }
    }

    /// DCC packet embedded in a send packet immediate, error byte restored
    pub fn dcc_packet(&self) -> Option<DccPacket> {
        if self.message_type() != MessageType::ImmPacket {
            return None;
        }
        let count = ((self.at(3) & 0b0111_0000) >> 4) as usize;
        if count == 0 || count > 5 {
            return None;
        }
        let payload: Vec<u8> = (0..count)
            .map(|index| self.at_with_high_bit(5 + index, 4, index as u8))
            .collect();
        Some(DccPacket::from_payload(&payload))
    }

    /// TRK byte of P1 slot read and write frames
    pub fn track_status(&self) -> Option<TrackStatus> {
        match self.opcode() {
            Some(Opcode::SlRdData) | Some(Opcode::WrSlData) if self.len() > TRK_INDEX => {
                Some(TrackStatus::from_bits_truncate(self.at(TRK_INDEX)))
            }
            _ => None,
        }
    }

    /// Command station implements expanded slots
    pub fn is_p2_implemented(&self) -> Option<bool> {
        self.track_status()
            .map(|trk| trk.contains(TrackStatus::P2_IMPLEMENTED))
    }

    /// Command station implements the original slot protocol
    pub fn is_p1_implemented(&self) -> Option<bool> {
        self.track_status()
            .map(|trk| trk.contains(TrackStatus::P1_IMPLEMENTED))
    }

    /// Programming track busy
    pub fn is_programming_track_busy(&self) -> Option<bool> {
        self.track_status()
            .map(|trk| trk.contains(TrackStatus::PROGRAMMING_BUSY))
    }

    /// Track paused
    pub fn is_track_paused(&self) -> Option<bool> {
        self.track_status()
            .map(|trk| trk.contains(TrackStatus::TRACK_PAUSED))
    }

    /// Track power on
    pub fn is_power_up(&self) -> Option<bool> {
        self.track_status()
            .map(|trk| trk.contains(TrackStatus::POWER_UP))
    }

    /// Locomotive address
    pub fn locomotive_address(&self) -> Option<u16> {
        let hi = |index: usize| (self.at(index) as u16) << 7;
        match self.message_type() {
            MessageType::LocoRep => {
                let high = if self.at(3) == 0x7d { 0 } else { hi(3) };
                Some(self.at(4) as u16 | high)
            }
            MessageType::LocoSlotDataP1 => {
                let high = if self.at(9) == 0x7f { 0 } else { hi(9) };
                Some(self.at(4) as u16 | high)
            }
            MessageType::TransRep => Some(self.at(4) as u16 | hi(3)),
            MessageType::LocoSlotDataP2 => Some(self.at(5) as u16 | hi(6)),
            MessageType::GetLocoSlotDataAdrP1 | MessageType::GetLocoSlotDataAdrP2 => {
                Some(self.at(2) as u16 | hi(1))
            }
            _ => None,
        }
    }

    /// Transponding zone
    pub fn transponder_zone(&self) -> Option<u16> {
        match self.message_type() {
            MessageType::LocoRep => Some(self.at(6) as u16 | (self.at(5) as u16) << 7),
            MessageType::TransRep => {
                Some(self.at(2) as u16 | ((self.at(1) & 0b0000_1111) as u16) << 7)
            }
            _ => None,
        }
    }

    /// One based transponding section address
    pub fn transponder_address(&self) -> Option<u16> {
        match self.message_type() {
            MessageType::TransRep => {
                Some((self.at(2) as u16 | ((self.at(1) & 0b0000_1111) as u16) << 7) + 1)
            }
            _ => None,
        }
    }

    /// One based sensor address
    pub fn sensor_address(&self) -> Option<u16> {
        match self.message_type() {
            MessageType::SensRepGenIn => {
                let address = (self.at(1) as u16) << 1
                    | ((self.at(2) & 0b0000_1111) as u16) << 8
                    | ((self.at(2) & 0b0010_0000) as u16) >> 5;
                Some(address + 1)
            }
            MessageType::SensRepTurnIn => {
                Some((self.at(1) as u16 | ((self.at(2) & 0b0000_1111) as u16) << 7) + 1)
            }
            _ => None,
        }
    }

    /// Sensor occupied or active
    pub fn sensor_state(&self) -> Option<bool> {
        match self.message_type() {
            MessageType::SensRepGenIn | MessageType::SensRepTurnIn => {
                Some(self.at(2) & 0b0001_0000 != 0)
            }
            MessageType::TransRep => Some(self.at(1) & 0b0010_0000 != 0),
            _ => None,
        }
    }

    /// One based switch address
    pub fn switch_address(&self) -> Option<u16> {
        match self.message_type() {
            MessageType::SetSw | MessageType::SetSwWithAck | MessageType::GetSwState => {
                Some((self.at(1) as u16 | ((self.at(2) & 0x0f) as u16) << 7) + 1)
            }
            _ => None,
        }
    }

    /// Reported switch position
    pub fn switch_state(&self) -> Option<SwitchState> {
        match self.message_type() {
            MessageType::SwState | MessageType::BrdOpSwState => {
                if self.at(2) & 0b0011_0000 == 0b0011_0000 {
                    Some(SwitchState::Closed)
                } else {
                    Some(SwitchState::Thrown)
                }
            }
            _ => None,
        }
    }

    /// Slot bank (expanded slot messages)
    pub fn slot_bank(&self) -> Option<u8> {
        let index = match self.message_type() {
            MessageType::LocoSlotDataP2
            | MessageType::SetLocoSlotDataP2
            | MessageType::GetLocoSlotData => 2,
            MessageType::SetLocoSlotInUseP2 => 3,
            MessageType::LocoSpdDirP2
            | MessageType::LocoF0F6P2
            | MessageType::LocoF7F13P2
            | MessageType::LocoF14F20P2
            | MessageType::LocoF21F28P2
            | MessageType::SetLocoSlotStat1P2
            | MessageType::LinkSlotsP2
            | MessageType::UnlinkSlotsP2 => 1,
            _ => return None,
        };
        Some(self.at(index) & 0b0000_0011)
    }

    /// Slot number
    pub fn slot_number(&self) -> Option<u8> {
        let index = match self.message_type() {
            MessageType::LocoSlotDataP1
            | MessageType::SetLocoSlotInUseP1
            | MessageType::SetLocoSlotDataP1
            | MessageType::SetLocoSlotStat1P1 => 2,
            MessageType::LocoSlotDataP2 | MessageType::SetLocoSlotDataP2 => 3,
            MessageType::SetLocoSlotInUseP2 => 4,
            MessageType::GetLocoSlotData
            | MessageType::LocoSpdP1
            | MessageType::LocoDirF0F4P1
            | MessageType::LocoF5F8P1
            | MessageType::LocoF9F12P1
            | MessageType::LinkSlotsP1
            | MessageType::UnlinkSlotsP1
            | MessageType::ConsistDirF0F4 => 1,
            MessageType::LocoSpdDirP2
            | MessageType::LocoF0F6P2
            | MessageType::LocoF7F13P2
            | MessageType::LocoF14F20P2
            | MessageType::LocoF21F28P2
            | MessageType::SetLocoSlotStat1P2
            | MessageType::LinkSlotsP2
            | MessageType::UnlinkSlotsP2 => 2,
            _ => return None,
        };
        Some(self.at(index))
    }

    /// Whether the message changes a slot rather than reporting or
    /// requesting it
    pub fn is_slot_update(&self) -> bool {
        self.slot_number().is_some()
            && !matches!(
                self.message_type(),
                MessageType::LocoSlotDataP1
                    | MessageType::LocoSlotDataP2
                    | MessageType::GetLocoSlotData
            )
    }

    /// Source bank of an expanded move
    pub fn source_slot_bank(&self) -> Option<u8> {
        match self.message_type() {
            MessageType::MoveSlotP2 => Some(self.at(1) & 0b0000_0011),
            _ => None,
        }
    }

    /// Destination bank of an expanded move
    pub fn destination_slot_bank(&self) -> Option<u8> {
        match self.message_type() {
            MessageType::MoveSlotP2 => Some(self.at(3) & 0b0000_0011),
            _ => None,
        }
    }

    /// Source slot of a move
    pub fn source_slot_number(&self) -> Option<u8> {
        match self.message_type() {
            MessageType::MoveSlotP1 => Some(self.at(1)),
            MessageType::MoveSlotP2 => Some(self.at(2)),
            _ => None,
        }
    }

    /// Destination slot of a move
    pub fn destination_slot_number(&self) -> Option<u8> {
        match self.message_type() {
            MessageType::MoveSlotP1 => Some(self.at(2)),
            MessageType::MoveSlotP2 => Some(self.at(4)),
            _ => None,
        }
    }

    /// Slot status byte 1
    pub fn slot_status1(&self) -> Option<u8> {
        match self.message_type() {
            MessageType::LocoSlotDataP1 => Some(self.at(3)),
            MessageType::LocoSlotDataP2 | MessageType::SetLocoSlotStat1P2 => Some(self.at(4)),
            MessageType::SetLocoSlotStat1P1 => Some(self.at(2)),
            _ => None,
        }
    }

    /// Slot activity state
    pub fn slot_state(&self) -> Option<SlotState> {
        let stat1 = self.slot_status1()?;
        SlotState::try_from(stat1 & !SlotState::PROTECT_MASK).ok()
    }

    /// Consist linkage
    pub fn consist_state(&self) -> Option<ConsistState> {
        let stat1 = self.slot_status1()?;
        ConsistState::try_from(stat1 & !ConsistState::PROTECT_MASK).ok()
    }

    /// Decoder speed-step protocol
    pub fn decoder_protocol(&self) -> Option<DecoderProtocol> {
        let stat1 = self.slot_status1()?;
        DecoderProtocol::try_from(stat1 & !DecoderProtocol::PROTECT_MASK).ok()
    }

    /// Locomotive direction
    pub fn direction(&self) -> Option<Direction> {
        let dirf = match self.message_type() {
            MessageType::LocoSlotDataP1 => self.at(6),
            MessageType::LocoSlotDataP2 => self.at(10),
            MessageType::LocoDirF0F4P1 => self.at(2),
            MessageType::LocoSpdDirP2 => {
                return Some(if self.at(1) & 0b0000_1000 != 0 {
                    Direction::Reverse
                } else {
                    Direction::Forward
                });
            }
            _ => return None,
        };
        Direction::try_from(dirf & !Direction::PROTECT_MASK).ok()
    }

    /// Locomotive speed
    pub fn speed(&self) -> Option<u8> {
        match self.message_type() {
            MessageType::LocoSlotDataP1 => Some(self.at(5)),
            MessageType::LocoSlotDataP2 => Some(self.at(8)),
            MessageType::LocoSpdP1 => Some(self.at(2)),
            MessageType::LocoSpdDirP2 => Some(self.at(4)),
            _ => None,
        }
    }

    /// Identifier of the throttle that owns the slot
    pub fn throttle_id(&self) -> Option<u16> {
        match self.message_type() {
            MessageType::LocoSlotDataP1 => {
                let low = self.at(11) as u16;
                let high = self.at(12) as u16;
                if self.at(9) == 0x7f && self.at(8) & 0b100 != 0 {
                    Some(low | high << 7)
                } else {
                    Some(low | high << 8)
                }
            }
            MessageType::LocoSlotDataP2 => Some(self.at(18) as u16 | (self.at(19) as u16) << 8),
            MessageType::IplDevData => {
                Some(self.partial_serial_number_high()? << 8 | self.partial_serial_number_low()?)
            }
            MessageType::Zapped => Some(self.at(2) as u16),
            MessageType::LocoSpdDirP2
            | MessageType::LocoF0F6P2
            | MessageType::LocoF7F13P2
            | MessageType::LocoF14F20P2
            | MessageType::LocoF21F28P2 => Some(self.at(3) as u16),
            _ => None,
        }
    }

    /// Function states carried by the message
    pub fn functions(&self) -> Option<FunctionGroup> {
        let mut functions = FunctionGroup::new();
        // copy `count` bits of `byte` starting at `bit` into consecutive functions
        let mut load = |byte: usize, bit: u8, first: usize, count: usize| {
            for offset in 0..count {
                let mask = 1u8 << (bit as usize + offset);
                functions.set(first + offset, self.at(byte) & mask != 0);
            }
        };

        match self.message_type() {
            MessageType::LocoDirF0F4P1 => {
                load(2, 4, 0, 1);
                load(2, 0, 1, 4);
            }
            MessageType::LocoF5F8P1 => load(2, 0, 5, 4),
            MessageType::LocoF9F12P1 => load(2, 0, 9, 4),
            MessageType::LocoF0F6P2 => {
                load(4, 0, 1, 4);
                load(4, 4, 0, 1);
                load(4, 5, 5, 2);
            }
            MessageType::LocoF7F13P2 => load(4, 0, 7, 7),
            MessageType::LocoF14F20P2 => load(4, 0, 14, 7),
            MessageType::LocoF21F28P2 => {
                load(4, 0, 21, 7);
                load(1, 4, 28, 1);
            }
            MessageType::LocoSlotDataP1 => {
                load(6, 4, 0, 1);
                load(6, 0, 1, 4);
                load(10, 0, 5, 4);
            }
            MessageType::LocoSlotDataP2 => {
                load(10, 4, 0, 1);
                load(10, 0, 1, 4);
                load(11, 0, 5, 7);
                load(9, 4, 12, 1);
                load(12, 0, 13, 7);
                load(9, 5, 20, 1);
                load(13, 0, 21, 7);
                load(9, 6, 28, 1);
            }
            _ => return None,
        }
        Some(functions)
    }

    /// Fast clock rate multiplier
    pub fn fast_clock_scale_factor(&self) -> Option<u8> {
        match self.message_type() {
            MessageType::FastClockData | MessageType::SetFastClockData => Some(self.at(3)),
            _ => None,
        }
    }

    /// State of command station option switch `number` (1 to 64 in block A,
    /// 65 to 128 in block B)
    pub fn op_sw_state(&self, number: usize) -> Option<bool> {
        let (byte, bit) = op_sw_position(self.message_type(), number)?;
        Some(self.at(byte) & (1 << bit) != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_p1() -> Message {
        // slot 5, in use, dcc128, address 3, speed 0x20, reverse with F0 F2, F6
        Message::new(vec![
            0xe7, 0x0e, 0x05, 0x33, 0x03, 0x20, 0x32, 0x07, 0x00, 0x00, 0x02, 0x11, 0x22,
        ])
    }

    #[test]
    fn test_slot_data_p1_fields() {
        let message = slot_p1();
        assert_eq!(message.message_type(), MessageType::LocoSlotDataP1);
        assert_eq!(message.slot_number(), Some(5));
        assert_eq!(message.slot_state(), Some(SlotState::InUse));
        assert_eq!(message.decoder_protocol(), Some(DecoderProtocol::Dcc128));
        assert_eq!(message.consist_state(), Some(ConsistState::NotLinked));
        assert_eq!(message.locomotive_address(), Some(3));
        assert_eq!(message.speed(), Some(0x20));
        assert_eq!(message.direction(), Some(Direction::Reverse));
        assert_eq!(message.throttle_id(), Some(0x11 | 0x22 << 8));
        assert_eq!(message.slot_data(), Some(&message.bytes()[2..11]));
        assert!(!message.is_slot_update());

        let functions = message.functions().unwrap();
        assert_eq!(functions.active(), vec![0, 2, 6]);
    }

    #[test]
    fn test_track_status_bits() {
        let message = slot_p1();
        assert_eq!(message.is_power_up(), Some(true));
        assert_eq!(message.is_track_paused(), Some(true));
        assert_eq!(message.is_p1_implemented(), Some(true));
        assert_eq!(message.is_programming_track_busy(), Some(false));
        assert_eq!(message.is_p2_implemented(), Some(false));
        assert_eq!(Message::new(vec![0x83]).is_power_up(), None);
    }

    #[test]
    fn test_long_address_in_slot_p1() {
        let mut bytes = slot_p1().bytes().to_vec();
        bytes[4] = 0x52;
        bytes[9] = 0x09;
        let message = Message::new(bytes);
        assert_eq!(message.locomotive_address(), Some(0x52 | 0x09 << 7));
    }

    #[test]
    fn test_speed_direction_p2() {
        let message = Message::new(vec![0xd5, 0x0a, 0x07, 0x11, 0x40]);
        assert_eq!(message.message_type(), MessageType::LocoSpdDirP2);
        assert_eq!(message.slot_bank(), Some(2));
        assert_eq!(message.slot_number(), Some(7));
        assert_eq!(message.direction(), Some(Direction::Reverse));
        assert_eq!(message.throttle_id(), Some(0x11));
        assert_eq!(message.speed(), Some(0x40));
        assert!(message.is_slot_update());
    }

    #[test]
    fn test_function_p2_groups() {
        let f0f6 = Message::new(vec![0xd5, 0x10, 0x07, 0x11, 0b0101_0001]);
        assert_eq!(f0f6.functions().unwrap().active(), vec![0, 1, 6]);

        let f21f28 = Message::new(vec![0xd5, 0x30, 0x07, 0x11, 0b0000_0011]);
        assert_eq!(f21f28.functions().unwrap().active(), vec![21, 22, 28]);
    }

    #[test]
    fn test_sensor_and_switch_addresses() {
        let general = Message::new(vec![0xb2, 0x05, 0x71]);
        assert_eq!(general.message_type(), MessageType::SensRepGenIn);
        assert_eq!(general.sensor_address(), Some((0x05 << 1 | 0x01 << 8 | 1) + 1));
        assert_eq!(general.sensor_state(), Some(true));

        let set_sw = Message::new(vec![0xb0, 0x09, 0x31]);
        assert_eq!(set_sw.switch_address(), Some((0x09 | 0x01 << 7) + 1));

        let sw_state = Message::new(vec![0xb4, 0x3c, 0x30]);
        assert_eq!(sw_state.switch_state(), Some(SwitchState::Closed));
    }

    #[test]
    fn test_move_slot_fields() {
        let p1 = Message::new(vec![0xba, 0x05, 0x06]);
        assert_eq!(p1.slot_number(), None);
        assert_eq!(p1.source_slot_number(), Some(5));
        assert_eq!(p1.destination_slot_number(), Some(6));

        let p2 = Message::new(vec![0xd4, 0x39, 0x05, 0x02, 0x06]);
        assert_eq!(p2.source_slot_bank(), Some(1));
        assert_eq!(p2.destination_slot_bank(), Some(2));
        assert_eq!(p2.destination_slot_number(), Some(6));
    }

    #[test]
    fn test_op_sw_positions() {
        assert_eq!(op_sw_position(MessageType::OpSwDataAP1, 1), Some((3, 0)));
        assert_eq!(op_sw_position(MessageType::OpSwDataAP1, 5), Some((4, 4)));
        assert_eq!(op_sw_position(MessageType::OpSwDataAP1, 9), Some((5, 0)));
        assert_eq!(op_sw_position(MessageType::OpSwDataBP1, 65), Some((3, 0)));
        assert_eq!(op_sw_position(MessageType::OpSwDataAP1, 65), None);
        assert_eq!(op_sw_position(MessageType::LocoSlotDataP1, 1), None);
    }
}
