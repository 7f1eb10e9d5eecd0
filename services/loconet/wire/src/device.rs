//! Device, command station and radio accessors.
//!
//! Covers IPL identity replies, command station query slots, Series 7
//! configuration, BXP88 reports and duplex radio group data.

use crate::message::Message;
use crate::message_type::MessageType;
use crate::types::{CommandStationType, ProductCode};

/// Products that report a hardware version in query slot 1.
const HARDWARE_VERSION_PRODUCTS: [ProductCode; 5] = [
    ProductCode::Dcs210,
    ProductCode::Dcs240,
    ProductCode::Dcs210Plus,
    ProductCode::Dcs240Plus,
    ProductCode::Pr4,
];

/// Decode a `major.minor` version byte: five bits of major, three of minor.
fn version(byte: u8) -> f64 {
    ((byte & 0b1111_1000) >> 3) as f64 + (byte & 0b0000_0111) as f64 / 10.0
}

/// Decode a query slot version byte: four bits of major, three of minor.
fn query_slot_version(byte: u8) -> f64 {
    (byte & 0b0111_1000) as f64 / 8.0 + (byte & 0b0000_0111) as f64 / 10.0
}

impl Message {
    /// Product that sent or is addressed by the message
    pub fn product_code(&self) -> Option<ProductCode> {
        let raw = match self.message_type() {
            MessageType::IplDevData => self.at_with_high_bit(5, 4, 0),
            MessageType::QuerySlot1 => self.at(14),
            MessageType::QuerySlot2
            | MessageType::QuerySlot3
            | MessageType::QuerySlot4
            | MessageType::QuerySlot5 => self.at(16),
            MessageType::S7Info | MessageType::SetS7BaseAddr => self.at(9),
            _ => return None,
        };
        ProductCode::try_from(raw).ok()
    }

    /// Device serial number
    pub fn serial_number(&self) -> Option<u16> {
        match self.message_type() {
            MessageType::IplDevData => {
                let low = self.at_with_high_bit(11, 9, 1) as u16;
                let high = self.at_with_high_bit(12, 9, 2) as u16;
                Some(low | high << 8)
            }
            t if t.is_query_slot() => {
                Some(((self.at(19) & 0b0011_1111) as u16) << 7 | self.at(18) as u16)
            }
            MessageType::S7Info | MessageType::SetS7BaseAddr => {
                Some(self.at(11) as u16 | (self.at(12) as u16) << 7)
            }
            _ => None,
        }
    }

    /// Low seven bits of the serial number
    pub fn partial_serial_number_low(&self) -> Option<u16> {
        self.serial_number().map(|serial| serial & 0x7f)
    }

    /// Seven bits of the serial number starting at bit 8
    pub fn partial_serial_number_high(&self) -> Option<u16> {
        self.serial_number().map(|serial| (serial >> 8) & 0x7f)
    }

    /// Firmware version as `major.minor`
    pub fn software_version(&self) -> Option<f64> {
        match self.message_type() {
            MessageType::IplDevData => Some(version(self.at_with_high_bit(8, 4, 3))),
            MessageType::QuerySlot1 => Some(query_slot_version(self.at(16))),
            _ => None,
        }
    }

    /// Hardware revision, reported by command stations and the PR4 only
    pub fn hardware_version(&self) -> Option<f64> {
        if self.message_type() != MessageType::QuerySlot1 {
            return None;
        }
        let product = self.product_code()?;
        HARDWARE_VERSION_PRODUCTS
            .contains(&product)
            .then(|| query_slot_version(self.at(17)))
    }

    /// One based board identifier
    pub fn board_id(&self) -> Option<u16> {
        match self.message_type() {
            MessageType::PmRepBxp88 => Some(self.at_with_high_bit(2, 1, 0) as u16 + 1),
            MessageType::IplDevData => Some(self.at_with_high_bit(15, 14, 0) as u16 + 1),
            t if t.is_query_slot() && self.product_code() == Some(ProductCode::Bxp88) => {
                Some(self.at(17) as u16 + 1)
            }
            _ => None,
        }
    }

    /// One based Series 7 base address
    pub fn base_address(&self) -> Option<u16> {
        match self.message_type() {
            MessageType::S7Info | MessageType::SetS7BaseAddr => {
                Some((self.at(13) as u16 | (self.at(14) as u16) << 7) + 1)
            }
            _ => None,
        }
    }

    /// Short circuit flags of the eight BXP88 detection sections
    pub fn detection_section_shorted(&self) -> Option<[bool; 8]> {
        if self.message_type() != MessageType::PmRepBxp88
            || self.at(3) & 0b0110_0000 != 0b0010_0000
        {
            return None;
        }
        let mut shorted = [false; 8];
        for bit in 0..4 {
            shorted[bit + 4] = self.at(3) & (1 << bit) != 0;
            shorted[bit] = self.at(4) & (1 << bit) != 0;
        }
        Some(shorted)
    }

    /// Command station model from the A option-switch block
    pub fn command_station_type(&self) -> Option<CommandStationType> {
        if self.message_type() != MessageType::OpSwDataAP1 {
            return None;
        }
        match CommandStationType::try_from(self.at(11)) {
            Ok(station) => Some(station),
            Err(_) if self.is_p1_implemented() == Some(false) => Some(CommandStationType::Dt200),
            Err(_) => None,
        }
    }

    /// Query slot requested by a query slot read (1 to 5)
    pub fn query_slot_number(&self) -> Option<u8> {
        match self.message_type() {
            MessageType::GetQuerySlot => Some((self.at(1) & 0b0000_0111) + 1),
            _ => None,
        }
    }

    /// Flag `bit` of query slot 1, where bits 40 to 46 and 50 to 56 are
    /// defined
    pub fn query_slot_flag(&self, bit: u8) -> Option<bool> {
        if self.message_type() != MessageType::QuerySlot1 {
            return None;
        }
        let (index, shift) = match bit {
            40..=46 => (4, bit - 40),
            50..=56 => (5, bit - 50),
            _ => return None,
        };
        Some(self.at(index) & (1 << shift) != 0)
    }

    fn query_slot_value(&self, message_type: MessageType, index: usize) -> Option<u8> {
        (self.message_type() == message_type).then(|| self.at(index))
    }

    fn query_slot_count(&self, message_type: MessageType, index: usize) -> Option<u16> {
        (self.message_type() == message_type)
            .then(|| self.at(index) as u16 | ((self.at(index + 1) & 0b0011_1111) as u16) << 7)
    }

    /// Track voltage in volts
    pub fn track_voltage(&self) -> Option<f64> {
        self.query_slot_value(MessageType::QuerySlot2, 4)
            .map(|raw| raw as f64 * 2.0 / 10.0)
    }

    /// Input voltage in volts
    pub fn input_voltage(&self) -> Option<f64> {
        self.query_slot_value(MessageType::QuerySlot2, 5)
            .map(|raw| raw as f64 * 2.0 / 10.0)
    }

    /// Current drawn in amperes
    pub fn current_drawn(&self) -> Option<f64> {
        self.query_slot_value(MessageType::QuerySlot2, 6)
            .map(|raw| raw as f64 / 10.0)
    }

    /// Current limit in amperes
    pub fn current_limit(&self) -> Option<f64> {
        self.query_slot_value(MessageType::QuerySlot2, 7)
            .map(|raw| raw as f64 / 10.0)
    }

    /// RailSync voltage in volts
    pub fn rail_sync_voltage(&self) -> Option<f64> {
        self.query_slot_value(MessageType::QuerySlot2, 10)
            .map(|raw| raw as f64 * 2.0 / 10.0)
    }

    /// LocoNet voltage in volts
    pub fn loconet_voltage(&self) -> Option<f64> {
        self.query_slot_value(MessageType::QuerySlot2, 12)
            .map(|raw| raw as f64 * 2.0 / 10.0)
    }

    /// Slots in use
    pub fn slots_used(&self) -> Option<u16> {
        self.query_slot_count(MessageType::QuerySlot3, 4)
    }

    /// Idle slots
    pub fn idle_slots(&self) -> Option<u16> {
        self.query_slot_count(MessageType::QuerySlot3, 6)
    }

    /// Free slots
    pub fn free_slots(&self) -> Option<u16> {
        self.query_slot_count(MessageType::QuerySlot3, 8)
    }

    /// Consists
    pub fn consists(&self) -> Option<u16> {
        self.query_slot_count(MessageType::QuerySlot3, 10)
    }

    /// Consist sub-members
    pub fn sub_members(&self) -> Option<u16> {
        self.query_slot_count(MessageType::QuerySlot3, 12)
    }

    /// Good LocoNet messages counted by the command station
    pub fn good_loconet_messages(&self) -> Option<u16> {
        self.query_slot_count(MessageType::QuerySlot4, 4)
    }

    /// Bad LocoNet messages counted by the command station
    pub fn bad_loconet_messages(&self) -> Option<u16> {
        self.query_slot_count(MessageType::QuerySlot4, 6)
    }

    /// Track faults
    pub fn track_faults(&self) -> Option<u16> {
        (self.message_type() == MessageType::QuerySlot5)
            .then(|| self.at(4) as u16 | (self.at(5) as u16) << 7)
    }

    /// Duplex group layout shared by group data replies and writes.
    fn is_duplex_group_data(&self) -> bool {
        matches!(
            self.message_type(),
            MessageType::DuplexGroupData | MessageType::SetDuplexGroupData
        )
    }

    /// Duplex group name, space padded to eight characters
    pub fn duplex_group_name(&self) -> Option<String> {
        if !self.is_duplex_group_data() {
            return None;
        }
        let name: Vec<u8> = (0..4)
            .map(|bit| self.at_with_high_bit(5 + bit, 4, bit as u8))
            .chain((0..4).map(|bit| self.at_with_high_bit(10 + bit, 9, bit as u8)))
            .collect();
        String::from_utf8(name).ok()
    }

    /// Duplex group password as four hex digits
    pub fn duplex_group_password(&self) -> Option<String> {
        if !self.is_duplex_group_data() {
            return None;
        }
        let first = self.at_with_high_bit(15, 14, 0);
        let second = self.at_with_high_bit(16, 14, 1);
        Some(format!(
            "{:X}{:X}{:X}{:X}",
            first >> 4,
            first & 0x0f,
            second >> 4,
            second & 0x0f
        ))
    }

    /// Duplex radio channel
    pub fn duplex_group_channel(&self) -> Option<u8> {
        self.is_duplex_group_data().then(|| self.at(17))
    }

    /// Duplex group identifier
    pub fn duplex_group_id(&self) -> Option<u8> {
        self.is_duplex_group_data().then(|| self.at(18))
    }
}
