//! Mutable working copy of a message.
//!
//! A [`Message`] never changes once built. To produce a modified outbound
//! frame (for example an option-switch block with a few switches flipped),
//! copy it into a [`MessageDraft`], apply the setters and call
//! [`MessageDraft::build`].

use crate::fields::{op_sw_position, TRK_INDEX};
use crate::message::Message;
use crate::message_type::MessageType;
use crate::opcode::Opcode;
use crate::types::{CommandStationType, TrackStatus};

/// Type byte no command station reports.
const UNASSIGNED_STATION_TYPE: u8 = 0x7f;

/// Editable copy of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    bytes: Vec<u8>,
    message_type: MessageType,
}

impl MessageDraft {
    /// Copy `message` into a draft.
    pub fn from_message(message: &Message) -> Self {
        Self {
            bytes: message.bytes().to_vec(),
            message_type: message.message_type(),
        }
    }

    /// Current bytes (checksum excluded)
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Type of the message the draft was copied from
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Freeze the draft into a new message.
    pub fn build(&self) -> Message {
        Message::new(self.bytes.clone())
    }

    /// Set option switch `number`. Returns `false`, leaving the draft
    /// untouched, when the switch is not part of this block.
    pub fn set_op_sw_state(&mut self, number: usize, on: bool) -> bool {
        let Some((byte, bit)) = op_sw_position(self.message_type, number) else {
            return false;
        };
        // bit 7 of a data byte cannot be carried on the wire
        let mask = if bit == 7 { 0 } else { 1u8 << bit };
        if on {
            self.bytes[byte] |= mask;
        } else {
            self.bytes[byte] &= !mask;
        }
        true
    }

    /// Set the command station type in an A option-switch block. A DT200
    /// has no type byte: it is written as an unassigned type with the P1
    /// implemented flag cleared.
    pub fn set_command_station_type(&mut self, station: CommandStationType) -> bool {
        if self.message_type != MessageType::OpSwDataAP1 {
            return false;
        }
        if station == CommandStationType::Dt200 {
            self.bytes[11] = UNASSIGNED_STATION_TYPE;
            self.set_track_status(TrackStatus::P1_IMPLEMENTED, false)
        } else {
            self.bytes[11] = station.into();
            true
        }
    }

    /// Set or clear `flags` in the TRK byte of a P1 slot frame.
    pub fn set_track_status(&mut self, flags: TrackStatus, on: bool) -> bool {
        let is_slot_frame = matches!(
            Opcode::try_from(self.bytes.first().copied().unwrap_or(0)),
            Ok(Opcode::SlRdData) | Ok(Opcode::WrSlData)
        );
        if !is_slot_frame || self.bytes.len() <= TRK_INDEX {
            return false;
        }
        let mut trk = TrackStatus::from_bits_retain(self.bytes[TRK_INDEX]);
        trk.set(flags, on);
        self.bytes[TRK_INDEX] = trk.bits();
        true
    }

    /// Mark expanded slots implemented
    pub fn set_p2_implemented(&mut self, on: bool) -> bool {
        self.set_track_status(TrackStatus::P2_IMPLEMENTED, on)
    }

    /// Mark the original slot protocol implemented
    pub fn set_p1_implemented(&mut self, on: bool) -> bool {
        self.set_track_status(TrackStatus::P1_IMPLEMENTED, on)
    }

    /// Mark the programming track busy
    pub fn set_programming_track_busy(&mut self, on: bool) -> bool {
        self.set_track_status(TrackStatus::PROGRAMMING_BUSY, on)
    }

    /// Mark the track paused
    pub fn set_track_paused(&mut self, on: bool) -> bool {
        self.set_track_status(TrackStatus::TRACK_PAUSED, on)
    }

    /// Mark track power on
    pub fn set_power_up(&mut self, on: bool) -> bool {
        self.set_track_status(TrackStatus::POWER_UP, on)
    }
}

impl From<&Message> for MessageDraft {
    fn from(message: &Message) -> Self {
        Self::from_message(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_sw_round_trip() {
        let mut draft = MessageDraft::from(&Message::op_sw_data_a_p1());
        assert!(draft.set_op_sw_state(1, true));
        assert!(draft.set_op_sw_state(9, true));
        assert!(draft.set_op_sw_state(12, true));
        assert!(!draft.set_op_sw_state(65, true));

        let message = draft.build();
        assert_eq!(message.op_sw_state(1), Some(true));
        assert_eq!(message.op_sw_state(2), Some(false));
        assert_eq!(message.op_sw_state(9), Some(true));
        assert_eq!(message.op_sw_state(12), Some(true));

        draft.set_op_sw_state(9, false);
        assert_eq!(draft.build().op_sw_state(9), Some(false));
    }

    #[test]
    fn test_bit_seven_is_not_written() {
        let mut draft = MessageDraft::from(&Message::op_sw_data_a_p1());
        // switch 8 maps to bit 7 of byte 4
        assert!(draft.set_op_sw_state(8, true));
        assert_eq!(draft.bytes()[4], 0x00);
    }

    #[test]
    fn test_source_message_is_unchanged() {
        let source = Message::op_sw_data_b_p1();
        let mut draft = MessageDraft::from(&source);
        draft.set_op_sw_state(65, true);
        assert_eq!(source.op_sw_state(65), Some(false));
        assert_eq!(draft.build().op_sw_state(65), Some(true));
    }

    #[test]
    fn test_track_status_setters() {
        let mut draft = MessageDraft::from(&Message::op_sw_data_a_p1());
        assert!(draft.set_power_up(true));
        assert!(draft.set_p1_implemented(true));
        assert!(draft.set_track_paused(true));
        assert!(draft.set_track_paused(false));
        let message = draft.build();
        assert_eq!(message.is_power_up(), Some(true));
        assert_eq!(message.is_p1_implemented(), Some(true));
        assert_eq!(message.is_track_paused(), Some(false));

        let mut power = MessageDraft::from(&Message::power_on());
        assert!(!power.set_power_up(true));
    }

    #[test]
    fn test_command_station_type() {
        let mut draft = MessageDraft::from(&Message::op_sw_data_a_p1());
        assert!(draft.set_command_station_type(CommandStationType::Dcs52));
        assert_eq!(
            draft.build().command_station_type(),
            Some(CommandStationType::Dcs52)
        );

        draft.set_p1_implemented(true);
        assert!(draft.set_command_station_type(CommandStationType::Dt200));
        let message = draft.build();
        assert_eq!(message.is_p1_implemented(), Some(false));
        assert_eq!(
            message.command_station_type(),
            Some(CommandStationType::Dt200)
        );
    }
}
