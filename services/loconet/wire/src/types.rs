//! Field enumerations and flag sets carried inside LocoNet messages.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Declares a `#[repr(u8)]` field enumeration together with its `TryFrom<u8>`.
macro_rules! field_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $value, )+
        }

        impl TryFrom<u8> for $name {
            type Error = crate::WireError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $value => Ok($name::$variant), )+
                    _ => Err(crate::WireError::Value($kind, value)),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value as u8
            }
        }
    };
}

field_enum! {
    /// Requested switch position. The raw value is the bit pattern OR-ed into
    /// the second data byte of a switch request.
    SwitchState, "switch state" {
        /// Closed (straight)
        Closed = 0b0011_0000,
        /// Thrown (diverging)
        Thrown = 0b0001_0000,
    }
}

field_enum! {
    /// Send packet immediate repeat count.
    ImmRepeat, "repeat count" {
        /// Send once
        NoRepeat = 0x00,
        /// One repeat
        Repeat1 = 0x01,
        /// Two repeats
        Repeat2 = 0x02,
        /// Three repeats
        Repeat3 = 0x03,
        /// Four repeats
        Repeat4 = 0x04,
        /// Five repeats
        Repeat5 = 0x05,
        /// Six repeats
        Repeat6 = 0x06,
        /// Seven repeats
        Repeat7 = 0x07,
        /// Repeat until replaced
        Continuous = 0x0f,
    }
}

field_enum! {
    /// Decoder speed-step protocol held in the low bits of slot status 1.
    DecoderProtocol, "decoder protocol" {
        /// 28 speed steps
        Dcc28 = 0b000,
        /// Motorola trinary
        Trinary = 0b001,
        /// 14 speed steps
        Dcc14 = 0b010,
        /// 128 speed steps
        Dcc128 = 0b011,
        /// 28 speed steps, advanced consisting
        Dcc28Fx = 0b100,
        /// Trinary, advanced consisting
        TrinaryFx = 0b101,
        /// 14 speed steps, advanced consisting
        Dcc14Fx = 0b110,
        /// 128 speed steps, advanced consisting
        Dcc128Fx = 0b111,
    }
}

impl DecoderProtocol {
    /// Bits of slot status 1 that do not belong to the protocol.
    pub const PROTECT_MASK: u8 = 0b1111_1000;
}

field_enum! {
    /// Locomotive direction bit in the DIRF byte.
    Direction, "direction" {
        /// Forward
        Forward = 0b0000_0000,
        /// Reverse
        Reverse = 0b0010_0000,
    }
}

impl Direction {
    /// Bits of DIRF that do not belong to the direction.
    pub const PROTECT_MASK: u8 = 0b1101_1111;
}

field_enum! {
    /// Slot activity state held in slot status 1.
    SlotState, "slot state" {
        /// Free slot
        Free = 0b0000_0000,
        /// Refreshed but not owned by a throttle
        Common = 0b0001_0000,
        /// Not refreshed
        Idle = 0b0010_0000,
        /// Owned by a throttle
        InUse = 0b0011_0000,
    }
}

impl SlotState {
    /// Bits of slot status 1 that do not belong to the slot state.
    pub const PROTECT_MASK: u8 = 0b1100_1111;
}

field_enum! {
    /// Consist linkage held in slot status 1.
    ConsistState, "consist state" {
        /// Not part of a consist
        NotLinked = 0b0000_0000,
        /// Linked to another slot
        SubMember = 0b0100_0000,
        /// Top of a consist
        TopMember = 0b0000_1000,
        /// Linked and also the top of a sub-consist
        MidConsist = 0b0100_1000,
    }
}

impl ConsistState {
    /// Bits of slot status 1 that do not belong to the consist state.
    pub const PROTECT_MASK: u8 = 0b1011_0111;
}

field_enum! {
    /// Command station model reported in the A option-switch block.
    CommandStationType, "command station type" {
        /// DCS100
        Dcs100 = 0x78,
        /// DB150
        Db150 = 0x00,
        /// DCS50
        Dcs50 = 0x08,
        /// DCS51
        Dcs51 = 0x0c,
        /// DCS52
        Dcs52 = 0x0d,
        /// DCS210
        Dcs210 = 0x1b,
        /// DCS240
        Dcs240 = 0x1c,
        /// DCS210+
        Dcs210Plus = 0x1a,
        /// DCS240+
        Dcs240Plus = 0x1d,
        /// DT200 (reports no P1 support instead of a type byte)
        Dt200 = 0xff,
    }
}

field_enum! {
    /// Digitrax product codes used by IPL and query slot replies.
    ProductCode, "product code" {
        /// LNRP
        Lnrp = 0x01,
        /// UT4
        Ut4 = 0x04,
        /// UT6
        Ut6 = 0x06,
        /// WTL12
        Wtl12 = 0x0c,
        /// DB210 opto
        Db210Opto = 0x14,
        /// DB210
        Db210 = 0x15,
        /// DB220
        Db220 = 0x16,
        /// DCS210+
        Dcs210Plus = 0x1a,
        /// DCS210
        Dcs210 = 0x1b,
        /// DCS240
        Dcs240 = 0x1c,
        /// DCS240+
        Dcs240Plus = 0x1d,
        /// PR3
        Pr3 = 0x23,
        /// PR4
        Pr4 = 0x24,
        /// DT402
        Dt402 = 0x2a,
        /// DT500
        Dt500 = 0x32,
        /// DCS51
        Dcs51 = 0x33,
        /// DCS52
        Dcs52 = 0x34,
        /// DT602
        Dt602 = 0x3e,
        /// SE74
        Se74 = 0x46,
        /// PM74
        Pm74 = 0x4a,
        /// BXPA1
        Bxpa1 = 0x51,
        /// BXP88
        Bxp88 = 0x58,
        /// LNWI
        Lnwi = 0x63,
        /// UR92
        Ur92 = 0x5c,
        /// UR93
        Ur93 = 0x5d,
        /// DS74
        Ds74 = 0x74,
        /// DS78V
        Ds78V = 0x7c,
    }
}

bitflags! {
    /// TRK byte of slot data frames.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TrackStatus: u8 {
        /// Track power is on
        const POWER_UP = 1 << 0;
        /// Track is paused (emergency stop)
        const TRACK_PAUSED = 1 << 1;
        /// Command station implements the original slot protocol
        const P1_IMPLEMENTED = 1 << 2;
        /// Programming track is busy
        const PROGRAMMING_BUSY = 1 << 3;
        /// Command station implements expanded slots
        const P2_IMPLEMENTED = 1 << 6;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_known_values() {
        assert_eq!(SwitchState::try_from(0x30).unwrap(), SwitchState::Closed);
        assert_eq!(ImmRepeat::try_from(0x0f).unwrap(), ImmRepeat::Continuous);
        assert_eq!(
            CommandStationType::try_from(0x00).unwrap(),
            CommandStationType::Db150
        );
        assert_eq!(ProductCode::try_from(0x58).unwrap(), ProductCode::Bxp88);
        assert_eq!(u8::from(ProductCode::Ds78V), 0x7c);
    }

    #[test]
    fn test_try_from_rejects_unknown() {
        assert_eq!(
            ImmRepeat::try_from(0x08),
            Err(crate::WireError::Value("repeat count", 0x08))
        );
        assert!(ProductCode::try_from(0x00).is_err());
    }

    #[test]
    fn test_status_masks_partition_stat1() {
        // every bit of the low seven is owned by exactly one field or is reserved
        let owned = !DecoderProtocol::PROTECT_MASK
            | !SlotState::PROTECT_MASK
            | !ConsistState::PROTECT_MASK;
        assert_eq!(owned, 0b0111_1111);
    }

    #[test]
    fn test_track_status_bits() {
        let trk = TrackStatus::from_bits_truncate(0b0100_0101);
        assert!(trk.contains(TrackStatus::POWER_UP));
        assert!(trk.contains(TrackStatus::P1_IMPLEMENTED));
        assert!(trk.contains(TrackStatus::P2_IMPLEMENTED));
        assert!(!trk.contains(TrackStatus::TRACK_PAUSED));
    }
}
