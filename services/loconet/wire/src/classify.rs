//! Ordered classification rules.
//!
//! Each opcode owns a decision tree of structural tests on payload bytes. The
//! first rule that matches wins, so the order inside every arm is part of the
//! protocol contract and must not be rearranged.

use crate::message_type::MessageType;
use crate::opcode::{frame_length, Opcode};

/// Classify a message (checksum stripped).
///
/// Frames whose length disagrees with the opcode length class are `Unknown`,
/// which also guarantees that no rule reads past the end of the message.
pub fn classify(m: &[u8]) -> MessageType {
    let Some(&first) = m.first() else {
        return MessageType::Unknown;
    };
    match frame_length(first, m.get(1).copied()) {
        Some(expected) if expected == m.len() + 1 => {}
        _ => return MessageType::Unknown,
    }
    let Ok(opcode) = Opcode::try_from(first) else {
        return MessageType::Unknown;
    };

    match opcode {
        Opcode::Busy => MessageType::Busy,
        Opcode::GpOff => MessageType::PwrOff,
        Opcode::GpOn => MessageType::PwrOn,
        Opcode::Idle => MessageType::SetIdleState,
        Opcode::LocoReset => MessageType::Reset,
        Opcode::LocoSpd if is_slot(m[1]) => MessageType::LocoSpdP1,
        Opcode::LocoDirF if is_slot(m[1]) && m[2] & 0b0100_0000 == 0 => {
            MessageType::LocoDirF0F4P1
        }
        Opcode::LocoSnd if is_slot(m[1]) && m[2] & 0b1111_0000 == 0 => MessageType::LocoF5F8P1,
        Opcode::LocoSnd2 if is_slot(m[1]) && m[2] & 0b1111_0000 == 0 => {
            MessageType::LocoF9F12P1
        }
        Opcode::SwReq => {
            if m[1] & 0b0111_1000 == 0b0111_1000 && m[2] & 0b1101_1111 == 0b0000_0111 {
                MessageType::Interrogate
            } else if m[2] & 0b1100_0000 == 0 {
                MessageType::SetSw
            } else {
                MessageType::Unknown
            }
        }
        Opcode::SwRep => match m[2] & 0b1100_0000 {
            0b0100_0000 => MessageType::SensRepTurnIn,
            0b0000_0000 => MessageType::SensRepTurnOut,
            _ => MessageType::Unknown,
        },
        Opcode::InputRep if m[2] & 0b1100_0000 == 0b0100_0000 => MessageType::SensRepGenIn,
        Opcode::LongAck => long_ack(m[1], m[2]),
        Opcode::SlotStat1 if is_slot(m[1]) => MessageType::SetLocoSlotStat1P1,
        Opcode::ConsistFunc if is_slot(m[1]) && m[2] & 0b1110_0000 == 0 => {
            MessageType::ConsistDirF0F4
        }
        Opcode::UnlinkSlots if is_slot(m[1]) && is_slot(m[2]) => MessageType::UnlinkSlotsP1,
        Opcode::LinkSlots if is_slot(m[1]) && is_slot(m[2]) => MessageType::LinkSlotsP1,
        Opcode::MoveSlots => {
            if m[1] == 0x00 {
                MessageType::DispatchGetP1
            } else if m[2] == 0x00 && is_slot(m[1]) {
                MessageType::DispatchPutP1
            } else if m[1] == m[2] && is_slot(m[1]) {
                MessageType::SetLocoSlotInUseP1
            } else if m[1] < 0x78 && m[2] < 0x78 {
                MessageType::MoveSlotP1
            } else {
                MessageType::Unknown
            }
        }
        Opcode::RqSlData => request_slot_data(m),
        Opcode::SwState if m[2] & 0b0100_0000 == 0 => MessageType::GetSwState,
        Opcode::SwAck if m[2] & 0b1100_0000 == 0 => MessageType::SetSwWithAck,
        Opcode::LocoAdrP2 => MessageType::GetLocoSlotDataAdrP2,
        Opcode::LocoAdr => MessageType::GetLocoSlotDataAdrP1,
        Opcode::D0Group => d0_group(m),
        Opcode::PrMode
            if m[1] == 0x10 && m[2] & 0b1111_1100 == 0 && m[3] == 0x00 && m[4] == 0x00 =>
        {
            MessageType::PrMode
        }
        Opcode::D4Group => d4_group(m),
        Opcode::D5Group => d5_group(m),
        Opcode::D7Group
            if m[2] == 0 && m[3] & 0b1111_0000 == 0 && (m[4] == 0x20 || m[4] == 0x7f) =>
        {
            MessageType::ReceiverRep
        }
        Opcode::DfGroup => {
            if m[1] == 0x00 && m[2] == 0x00 && m[3] == 0x00 && m[4] == 0x00 {
                MessageType::FindReceiver
            } else if m[1] == 0x40 && m[2] == 0x1f && m[3] & 0b1111_1000 == 0 && m[4] == 0x00 {
                MessageType::SetLocoNetId
            } else {
                MessageType::Unknown
            }
        }
        Opcode::PeerXfer => peer_xfer(m),
        Opcode::SlRdDataP2 => slot_read_p2(m),
        Opcode::SlRdData => slot_read_p1(m),
        Opcode::ImmPacket if m[1] == 0x0b && m[2] == 0x7f => MessageType::ImmPacket,
        Opcode::WrSlDataP2 => slot_write_p2(m),
        Opcode::WrSlData => slot_write_p1(m),
        _ => MessageType::Unknown,
    }
}

/// Slot numbers usable for locomotives.
fn is_slot(byte: u8) -> bool {
    byte > 0 && byte < 0x78
}

/// Whether every listed byte is zero.
fn zeros(m: &[u8], indices: impl IntoIterator<Item = usize>) -> bool {
    indices.into_iter().all(|index| m[index] == 0x00)
}

fn long_ack(lopc: u8, ack1: u8) -> MessageType {
    match (lopc, ack1) {
        (0x30, 0x00) => MessageType::SetSwRejected,
        (0x30, 0x7f) => MessageType::SetSwAccepted,
        (0x38, 0x00) => MessageType::InvalidUnlinkP1,
        (0x39, 0x00) => MessageType::InvalidLinkP1,
        (0x3a, 0x00) => MessageType::IllegalMoveP1,
        (0x3b, 0x00) => MessageType::SlotNotImplemented,
        (0x3c, _) => MessageType::SwState,
        (0x3d, 0x00) => MessageType::SetSwWithAckRejected,
        (0x3d, 0x7f) => MessageType::SetSwWithAckAccepted,
        (0x3e, 0x00) => MessageType::NoFreeSlotsP2,
        (0x3f, 0x00) => MessageType::NoFreeSlotsP1,
        (0x50, ack) if ack & 0b0101_1111 == 0b0001_0000 => MessageType::BrdOpSwState,
        (0x50, 0x7f) => MessageType::SetBrdOpSwOk,
        (0x54, 0x00) => MessageType::D4Error,
        (0x55, _) => MessageType::Zapped,
        (0x6d, 0x00) => MessageType::ImmPacketBufferFull,
        (0x6d, 0x7f) => MessageType::ImmPacketOk,
        (0x6d, _) => MessageType::S7CvState,
        (0x6e, 0x00) => MessageType::RoutesDisabled,
        (0x6e, 0x7f) => MessageType::SetSlotDataOkP2,
        (0x6e, _) => MessageType::S7CvState,
        (0x6f, 0x00) => MessageType::ProgrammerBusy,
        (0x6f, 0x01) => MessageType::ProgCmdAccepted,
        (0x6f, 0x40) => MessageType::ProgCmdAcceptedBlind,
        (0x6f, 0x7f) => MessageType::SetSlotDataOkP1,
        (0x7e, _) => MessageType::ImmPacketLmOk,
        _ => MessageType::Unknown,
    }
}

fn request_slot_data(m: &[u8]) -> MessageType {
    if m[2] == 0x00 {
        match m[1] {
            0x78..=0x7a | 0x7d => MessageType::Unknown,
            0x7b => MessageType::GetFastClockData,
            0x7c => MessageType::GetProgSlotData,
            0x7e => MessageType::GetOpSwDataBP1,
            0x7f => MessageType::GetOpSwDataAP1,
            _ => MessageType::GetLocoSlotData,
        }
    } else if (0x78..=0x7c).contains(&m[1]) && m[2] == 0x41 {
        MessageType::GetQuerySlot
    } else if (m[1] == 0x7e || m[1] == 0x7f) && m[2] == 0x40 {
        MessageType::GetOpSwDataP2
    } else if m[1] < 0x78 && m[2] & 0b1011_1000 == 0 {
        MessageType::GetLocoSlotData
    } else {
        MessageType::Unknown
    }
}

fn d0_group(m: &[u8]) -> MessageType {
    if m[1] & 0b1111_1110 == 0b0110_0010 && m[3] & 0b1111_0000 == 0b0111_0000 {
        MessageType::GetBrdOpSwState
    } else if m[1] & 0b1111_1110 == 0b0111_0010 && m[3] & 0b1111_0000 == 0b0111_0000 {
        MessageType::SetBrdOpSwState
    } else if m[1] == 0x60 && m[4] & 0b1111_1110 == 0 {
        MessageType::TrkShortRep
    } else if m[1] & 0b1111_1110 == 0b0110_0010
        && m[3] & 0b1111_0000 == 0b0011_0000
        && m[4] & 0b1110_0000 == 0
    {
        MessageType::PmRep
    } else if m[1] & 0b0111_1110 == 0b0110_0010
        && m[3] & 0b1001_0000 == 0
        && m[4] & 0b1001_0000 == 0
    {
        MessageType::PmRepBxp88
    } else if m[1] & 0b1101_0000 == 0 {
        MessageType::TransRep
    } else {
        MessageType::Unknown
    }
}

fn d4_group(m: &[u8]) -> MessageType {
    if m[1] & 0b1111_1000 == 0b0010_0000 {
        return match m[3] {
            0x05 => MessageType::LocoF12F20F28P2,
            0x08 => MessageType::LocoF13F19P2,
            0x09 => MessageType::LocoF21F27P2,
            _ => MessageType::Unknown,
        };
    }
    if m[1] & 0b1111_1000 != 0b0011_1000 {
        return MessageType::Unknown;
    }

    let src_page = m[1] & 0b0000_0111;
    let src = m[2];
    let dst_page = m[3] & 0b0000_0111;
    let dst = m[4];
    match m[3] & 0b1111_1000 {
        0b0000_0000 => {
            if src == 0x00 {
                MessageType::DispatchGetP2
            } else if m[3] == 0 && dst == 0 && is_slot(src) {
                MessageType::DispatchPutP2
            } else if src_page == dst_page && src == dst && is_slot(src) {
                MessageType::SetLocoSlotInUseP2
            } else if is_slot(src) && is_slot(dst) {
                MessageType::MoveSlotP2
            } else {
                MessageType::Unknown
            }
        }
        0b0100_0000 if is_slot(src) && is_slot(dst) => MessageType::LinkSlotsP2,
        0b0110_0000 if is_slot(src) => MessageType::SetLocoSlotStat1P2,
        0b0101_0000 if is_slot(src) && is_slot(dst) => MessageType::UnlinkSlotsP2,
        _ => MessageType::Unknown,
    }
}

fn d5_group(m: &[u8]) -> MessageType {
    if !is_slot(m[2]) {
        return MessageType::Unknown;
    }
    match m[1] & 0b1111_1000 {
        0b0000_0000 | 0b0000_1000 => MessageType::LocoSpdDirP2,
        0b0001_0000 => MessageType::LocoF0F6P2,
        0b0001_1000 => MessageType::LocoF7F13P2,
        0b0010_0000 => MessageType::LocoF14F20P2,
        0b0010_1000 | 0b0011_0000 => MessageType::LocoF21F28P2,
        _ => MessageType::Unknown,
    }
}

fn peer_xfer(m: &[u8]) -> MessageType {
    match m[1] {
        0x09 => {
            if m[2] == 0x01 && m[3] == 0x00 {
                MessageType::EzRouteConfirm
            } else if m[2] == 0x40 && zeros(m, [5, 6, 7]) {
                MessageType::FindLoco
            } else if m[2] == 0x00 && m[5] & 0b1111_0000 == 0 && m[7] == 0x00 {
                MessageType::LocoRep
            } else {
                MessageType::Unknown
            }
        }
        0x10 => peer_xfer_16(m),
        0x14 => peer_xfer_20(m),
        _ => MessageType::Unknown,
    }
}

fn peer_xfer_16(m: &[u8]) -> MessageType {
    if m[2] == 0x22
        && m[3] == 0x22
        && m[4] == 0x01
        && m[5] == 0x00
        && m[8] & 0b1111_0000 == 0b0001_0000
        && m[10] == 0x00
    {
        MessageType::InterfaceData
    } else if m[2] == 0x50
        && m[3] == 0x50
        && m[4] == 0x01
        && m[5] & 0b1111_0000 == 0x00
        && m[10] & 0b1111_0000 == 0x00
    {
        MessageType::InterfaceDataLb
    } else if m[2] == 0x22 && m[3] == 0x22 && m[4] == 0x01 && m[5] == 0x00 && m[10] == 0x00 {
        MessageType::InterfaceDataPr3
    } else if m[2] == 0x7f && m[3] == 0x7f && m[4] == 0x7f && m[5] & 0b1111_0000 == 0b0100_0000 {
        match m[10] & 0b1111_0000 {
            0b0000_0000 if m[12] == 0x00 && m[14] == 0x00 => MessageType::IplSetup,
            0b0001_0000 if zeros(m, [9, 11, 12, 13, 14]) => MessageType::IplSetAddr,
            0b0010_0000 => MessageType::IplDataLoad,
            0b0100_0000 if zeros(m, [6, 7, 8, 9, 11, 12, 13, 14]) => MessageType::IplEndLoad,
            _ => MessageType::Unknown,
        }
    } else {
        MessageType::Unknown
    }
}

fn peer_xfer_20(m: &[u8]) -> MessageType {
    // payload bytes past the first data byte of single value transfers
    let tail = || zeros(m, 6..=18);
    let pxct_clean = |index: usize| m[index] & 0b1111_0000 == 0;

    match (m[2], m[3]) {
        (0x02, 0x00) if m[4] == 0x00 && tail() => MessageType::SetDuplexGroupChannel,
        (0x02, 0x08) if zeros(m, 4..=18) => MessageType::GetDuplexGroupChannel,
        (0x02, 0x10) if m[4] == 0x00 && tail() => MessageType::DuplexGroupChannel,
        (0x03, 0x00) if pxct_clean(4) && pxct_clean(9) && pxct_clean(14) => {
            MessageType::SetDuplexGroupData
        }
        (0x03, 0x08) if zeros(m, 4..=18) => MessageType::GetDuplexGroupData,
        (0x03, 0x10) if pxct_clean(4) && pxct_clean(9) && pxct_clean(14) => {
            MessageType::DuplexGroupData
        }
        (0x04, 0x00) if m[4] == 0x00 && tail() => MessageType::SetDuplexGroupId,
        (0x04, 0x08) if zeros(m, 4..=18) => MessageType::GetDuplexGroupId,
        (0x04, 0x10) if m[4] == 0x00 && tail() => MessageType::DuplexGroupId,
        (0x07, 0x00) if pxct_clean(4) && zeros(m, 9..=18) => MessageType::SetDuplexGroupPassword,
        (0x07, 0x08) if zeros(m, 4..=18) => MessageType::GetDuplexGroupPassword,
        (0x07, 0x10) if m[4] == 0x00 && zeros(m, 9..=18) => MessageType::DuplexGroupPassword,
        (0x0f, 0x08) if zeros(m, [4, 6, 7, 8, 9, 10]) && m[11] == 0x01 && zeros(m, 12..=18) => {
            MessageType::IplDiscover
        }
        (0x0f, 0x10) if pxct_clean(4) && pxct_clean(9) && pxct_clean(14) => {
            MessageType::IplDevData
        }
        (0x10, 0x08) if m[4] == 0x00 && tail() => MessageType::GetDuplexSignalStrength,
        (0x10, 0x10) => {
            if pxct_clean(4) && zeros(m, 9..=18) {
                MessageType::DuplexSignalStrength
            } else if pxct_clean(4)
                && [5, 6, 7, 8].iter().all(|&index| m[index] != 0x00)
                && pxct_clean(9)
                && [10, 11, 12, 13].iter().all(|&index| m[index] != 0x00)
                && pxct_clean(14)
            {
                MessageType::LnwiData
            } else {
                MessageType::Unknown
            }
        }
        _ => MessageType::Unknown,
    }
}

fn slot_read_p2(m: &[u8]) -> MessageType {
    if m[1] == 0x15 && m[2] & 0b1111_1000 == 0 {
        if is_slot(m[3]) && m[7] & 0b1011_0000 == 0 {
            return MessageType::LocoSlotDataP2;
        }
        if (0x78..=0x7c).contains(&m[3]) && m[2] == 0x01 {
            return match m[3] {
                0x78 => MessageType::QuerySlot1,
                0x79 => MessageType::QuerySlot2,
                0x7a => MessageType::QuerySlot3,
                0x7b => MessageType::QuerySlot4,
                _ => MessageType::QuerySlot5,
            };
        }
        if m[3] == 0x7f && m[2] == 0x00 {
            return MessageType::OpSwDataP2;
        }
        return MessageType::Unknown;
    }
    if m[1] != 0x10 {
        return MessageType::Unknown;
    }
    match m[2] {
        0x00 => {
            if zeros(m, [3, 10, 11, 12, 13, 14]) {
                MessageType::RosterTableInfo
            } else if m[3] == 0x02
                && m[4] & 0b1110_0000 == 0x00
                && m[5] == 0x00
                && m[6] == 0x0f
                && zeros(m, [10, 14])
            {
                MessageType::RosterEntry
            } else {
                MessageType::Unknown
            }
        }
        0x01 => {
            if zeros(m, [3, 10, 11, 12, 13, 14]) {
                MessageType::RouteTableInfoA
            } else if m[3] == 0x02 && m[5] & 0b1111_1110 == 0x00 && m[6] == 0x0f {
                MessageType::RouteTablePage
            } else {
                MessageType::Unknown
            }
        }
        0x02 if zeros(m, [3, 5, 6])
            && m[7] == 0x02
            && m[12] & 0b1100_0000 == 0x00
            && m[14] & 0b1111_0000 == 0x00 =>
        {
            MessageType::S7Info
        }
        _ => MessageType::Unknown,
    }
}

fn slot_read_p1(m: &[u8]) -> MessageType {
    if m[1] != 0x0e || m[7] & 0b0011_0000 != 0x00 {
        return MessageType::Unknown;
    }
    match m[2] {
        0x78..=0x7a | 0x7d => MessageType::Unknown,
        0x7b => MessageType::FastClockData,
        0x7c if m[4] & 0b1111_0000 == 0 => MessageType::ProgSlotDataP1,
        0x7c => MessageType::Unknown,
        0x7e => MessageType::OpSwDataBP1,
        0x7f => MessageType::OpSwDataAP1,
        slot if is_slot(slot)
            && m[7] & 0b1011_0000 == 0
            && m[8] & 0b1111_0010 == 0
            && m[10] & 0b1111_0000 == 0 =>
        {
            MessageType::LocoSlotDataP1
        }
        _ => MessageType::Unknown,
    }
}

fn slot_write_p2(m: &[u8]) -> MessageType {
    match m[1] {
        0x15 => {
            if m[2] == 0 && m[3] == 0x7f {
                MessageType::SetOpSwDataP2
            } else if m[2] == 0x19 && m[3] == 0x7b {
                MessageType::ResetQuerySlot4
            } else if is_slot(m[3]) {
                MessageType::SetLocoSlotDataP2
            } else {
                MessageType::Unknown
            }
        }
        0x10 => match m[2] {
            0x00 => {
                if zeros(m, 3..=13) {
                    MessageType::GetRosterTableInfo
                } else if m[3] == 0x02 && m[4] & 0b1110_0000 == 0x00 && zeros(m, [5, 10, 14]) {
                    MessageType::GetRosterEntry
                } else if m[3] == 0x43 && zeros(m, [5, 10, 14]) {
                    MessageType::SetRosterEntry
                } else {
                    MessageType::Unknown
                }
            }
            0x01 => {
                if zeros(m, 3..=13) {
                    MessageType::GetRouteTableInfoA
                } else if m[3] == 0x02 && m[5] & 0b1111_1110 == 0x00 {
                    MessageType::GetRouteTablePage
                } else if m[3] == 0x03 && m[5] & 0b1111_1110 == 0x00 {
                    MessageType::SetRouteTablePage
                } else {
                    MessageType::Unknown
                }
            }
            0x02 => {
                if zeros(m, 3..=14) {
                    MessageType::GetRouteTableInfoB
                } else if m[3] == 0x0f
                    && zeros(m, 4..=8)
                    && m[12] & 0b1100_0000 == 0x00
                    && m[14] & 0b1111_0000 == 0x00
                {
                    MessageType::SetS7BaseAddr
                } else {
                    MessageType::Unknown
                }
            }
            _ => MessageType::Unknown,
        },
        _ => MessageType::Unknown,
    }
}

fn slot_write_p1(m: &[u8]) -> MessageType {
    if m[1] != 0x0e {
        return MessageType::Unknown;
    }
    let slot = m[2];
    if is_slot(slot) && m[7] & 0b1011_0000 == 0x00 && m[8] & 0b1111_0010 == 0x00 && m[10] & 0b1111_0000 == 0x00
    {
        MessageType::SetLocoSlotDataP1
    } else if slot == 0x7b {
        MessageType::SetFastClockData
    } else if slot == 0x7c && zeros(m, [4, 7]) && m[8] & 0b1100_1100 == 0x00 {
        MessageType::ProgCv
    } else if slot == 0x7e {
        MessageType::SetOpSwDataBP1
    } else if slot == 0x7f {
        MessageType::SetOpSwDataAP1
    } else {
        MessageType::Unknown
    }
}
