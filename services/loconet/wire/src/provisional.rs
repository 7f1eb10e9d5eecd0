//! Query slot counters whose byte positions are inferred rather than
//! documented.
//!
//! They follow the layout of their documented neighbours in query slots 4
//! and 5 but have not been confirmed against command station captures.

use crate::message::Message;
use crate::message_type::MessageType;

impl Message {
    /// Number of sleeps (query slot 4)
    pub fn number_of_sleeps(&self) -> Option<u16> {
        (self.message_type() == MessageType::QuerySlot4)
            .then(|| self.at(8) as u16 | ((self.at(9) & 0b0011_1111) as u16) << 7)
    }

    /// Auto-reverse events (query slot 5)
    pub fn auto_reverse_events(&self) -> Option<u16> {
        (self.message_type() == MessageType::QuerySlot5)
            .then(|| self.at(6) as u16 | (self.at(7) as u16) << 7)
    }

    /// Disturbances (query slot 5)
    pub fn disturbances(&self) -> Option<u16> {
        (self.message_type() == MessageType::QuerySlot5)
            .then(|| self.at(8) as u16 | (self.at(9) as u16) << 7)
    }
}
