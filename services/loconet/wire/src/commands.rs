//! Outbound command factories.
//!
//! Factories that take arguments validate them and return `None` when any is
//! out of range. Factories without arguments always succeed.

use crate::dcc::{DccPacket, FunctionBlock, MAX_IMM_PACKET_LEN};
use crate::functions::FunctionGroup;
use crate::message::Message;
use crate::message_type::MessageType;
use crate::opcode::Opcode;
use crate::types::{Direction, ImmRepeat, ProductCode, SwitchState};
use std::ops::RangeInclusive;

/// Slot numbers usable for locomotives.
pub const SLOT_RANGE: RangeInclusive<u8> = 1..=119;

/// Expanded slot banks.
pub const SLOT_BANK_RANGE: RangeInclusive<u8> = 0..=3;

/// Locomotive addresses.
pub const LOCO_ADDRESS_RANGE: RangeInclusive<u16> = 1..=10239;

/// Switch addresses.
pub const SWITCH_ADDRESS_RANGE: RangeInclusive<u16> = 1..=2048;

/// Tetherless receiver LocoNet IDs.
pub const LOCONET_ID_RANGE: RangeInclusive<u8> = 0..=7;

/// Locomotive speeds.
pub const SPEED_RANGE: RangeInclusive<u8> = 0..=127;

/// Command station query slots.
pub const QUERY_SLOT_RANGE: RangeInclusive<u8> = 1..=5;

/// Number of option switch data bytes in a P1 op-switch slot.
const OP_SW_DATA_LEN: usize = 10;

/// Payload of a firmware transfer setup frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IplDescriptor {
    /// Manufacturer code
    pub manufacturer: u8,
    /// Target product code
    pub product: u8,
    /// Hardware version
    pub hardware_version: u8,
    /// Software version being loaded
    pub software_version: u8,
    /// Load options
    pub options: u8,
    /// Number of flash blocks to erase
    pub blocks_to_erase: u8,
}

/// Pack 8-bit data for a peer transfer.
///
/// `data` excludes the opcode. Starting at `first`, each of `groups` groups
/// is a PXCT byte followed by four data bytes; bit `i` of the PXCT byte
/// receives the 8th bit of data byte `i`, which is then cleared. Returns
/// `None` when `data` is too short for the requested groups.
pub fn encode_peer_xfer(data: &[u8], groups: usize, first: usize) -> Option<Vec<u8>> {
    if first + groups * 5 > data.len() {
        return None;
    }
    let mut encoded = data.to_vec();
    for group in 0..groups {
        let pxct = first + group * 5;
        encoded[pxct] = 0;
        for bit in 0..4 {
            let index = pxct + 1 + bit;
            if encoded[index] & 0x80 != 0 {
                encoded[pxct] |= 1 << bit;
                encoded[index] &= 0x7f;
            }
        }
    }
    Some(encoded)
}

/// PXCT byte holding the 8th bits of `bytes`, bit `i` for byte `i`.
fn pxct_for(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .enumerate()
        .filter(|(_, byte)| **byte & 0x80 != 0)
        .fold(0, |pxct, (bit, _)| pxct | (1 << bit))
}

/// Send packet immediate with the 8th bits moved to the side-channel byte.
fn imm_frame(payload: &[u8], repeat: ImmRepeat) -> Message {
    let mut data = vec![0x0b, 0x7f, (payload.len() as u8) << 4 | u8::from(repeat)];
    data.push(pxct_for(payload));
    data.extend(payload.iter().map(|byte| byte & 0x7f));
    data.resize(4 + MAX_IMM_PACKET_LEN - 1, 0x00);
    Message::from_opcode(Opcode::ImmPacket, &data)
}

/// Peer transfer of 16 bytes in the firmware transfer layout.
fn ipl_frame(pxct1: u8, first: [u8; 4], pxct2: u8, second: [u8; 4]) -> Message {
    let mut data = vec![0x10, 0x7f, 0x7f, 0x7f, pxct1];
    data.extend(first.iter().map(|byte| byte & 0x7f));
    data.push(pxct2);
    data.extend(second.iter().map(|byte| byte & 0x7f));
    Message::from_opcode(Opcode::PeerXfer, &data)
}

/// Peer transfer of 20 bytes: fixed header followed by zero padding.
fn peer_xfer_20(header: &[u8]) -> Message {
    let mut data = vec![0x14];
    data.extend_from_slice(header);
    data.resize(18, 0x00);
    Message::from_opcode(Opcode::PeerXfer, &data)
}

fn is_slot(slot: u8) -> bool {
    SLOT_RANGE.contains(&slot)
}

fn is_bank_slot(bank: u8, slot: u8) -> bool {
    SLOT_BANK_RANGE.contains(&bank) && is_slot(slot)
}

impl Message {
    // Command station

    /// Global power on
    pub fn power_on() -> Message {
        Message::from_opcode(Opcode::GpOn, &[])
    }

    /// Global power off
    pub fn power_off() -> Message {
        Message::from_opcode(Opcode::GpOff, &[])
    }

    /// Read option switch block A
    pub fn get_op_sw_data_a_p1() -> Message {
        Message::from_opcode(Opcode::RqSlData, &[0x7f, 0x00])
    }

    /// Read option switch block B
    pub fn get_op_sw_data_b_p1() -> Message {
        Message::from_opcode(Opcode::RqSlData, &[0x7e, 0x00])
    }

    /// Read expanded option switches
    pub fn get_op_sw_data_p2() -> Message {
        Message::from_opcode(Opcode::RqSlData, &[0x7f, 0x40])
    }

    /// Blank option switch block A, a template for [`crate::MessageDraft`]
    pub fn op_sw_data_a_p1() -> Message {
        let mut data = vec![0x0e, 0x7f];
        data.resize(2 + OP_SW_DATA_LEN, 0x00);
        Message::from_opcode(Opcode::SlRdData, &data)
    }

    /// Blank option switch block B, a template for [`crate::MessageDraft`]
    pub fn op_sw_data_b_p1() -> Message {
        let mut data = vec![0x0e, 0x7e];
        data.resize(2 + OP_SW_DATA_LEN, 0x00);
        Message::from_opcode(Opcode::SlRdData, &data)
    }

    /// Write every option switch of block A on or off
    pub fn set_op_sw_data_a_p1(on: bool) -> Message {
        let mut data = vec![0x0e, 0x7f];
        data.resize(2 + OP_SW_DATA_LEN, if on { 0x7f } else { 0x00 });
        Message::from_opcode(Opcode::WrSlData, &data)
    }

    /// Write every option switch of block B on or off
    pub fn set_op_sw_data_b_p1(on: bool) -> Message {
        let mut data = vec![0x0e, 0x7e];
        data.resize(2 + OP_SW_DATA_LEN, if on { 0x7f } else { 0x00 });
        Message::from_opcode(Opcode::WrSlData, &data)
    }

    /// Read the programming slot
    pub fn get_prog_slot_data() -> Message {
        Message::from_opcode(Opcode::RqSlData, &[0x7c, 0x00])
    }

    /// Read the fast clock slot
    pub fn get_fast_clock() -> Message {
        Message::from_opcode(Opcode::RqSlData, &[0x7b, 0x00])
    }

    /// Read command station query slot `query_slot` (1 to 5)
    pub fn get_query_slot(query_slot: u8) -> Option<Message> {
        QUERY_SLOT_RANGE
            .contains(&query_slot)
            .then(|| Message::from_opcode(Opcode::RqSlData, &[0x77 + query_slot, 0x41]))
    }

    /// Clear the message counters of query slot 4
    pub fn reset_query_slot4() -> Message {
        let mut data = vec![0x15, 0x19, 0x7b];
        data.resize(19, 0x00);
        Message::from_opcode(Opcode::WrSlDataP2, &data)
    }

    /// Read a slot
    pub fn get_loco_slot_data_p1(slot: u8) -> Option<Message> {
        is_slot(slot).then(|| Message::from_opcode(Opcode::RqSlData, &[slot, 0x00]))
    }

    /// Read an expanded slot
    pub fn get_loco_slot_data_p2(bank: u8, slot: u8) -> Option<Message> {
        is_bank_slot(bank, slot)
            .then(|| Message::from_opcode(Opcode::RqSlData, &[slot, bank | 0b0100_0000]))
    }

    // Send packet immediate

    /// Inject 1 to 5 raw DCC bytes (error byte excluded) onto the track
    pub fn imm_packet(packet: &[u8], repeat: ImmRepeat) -> Option<Message> {
        (1..MAX_IMM_PACKET_LEN)
            .contains(&packet.len())
            .then(|| imm_frame(packet, repeat))
    }

    /// Inject a DCC packet; the error byte is left to the command station
    pub fn imm_packet_dcc(packet: &DccPacket, repeat: ImmRepeat) -> Option<Message> {
        if !packet.is_checksum_ok() {
            return None;
        }
        Message::imm_packet(packet.payload(), repeat)
    }

    // Locomotive control

    /// Request the slot of `address`
    pub fn get_loco_slot_data_adr_p1(address: u16) -> Option<Message> {
        LOCO_ADDRESS_RANGE.contains(&address).then(|| {
            Message::from_opcode(Opcode::LocoAdr, &[(address >> 7) as u8, (address & 0x7f) as u8])
        })
    }

    /// Request the expanded slot of `address`
    pub fn get_loco_slot_data_adr_p2(address: u16) -> Option<Message> {
        LOCO_ADDRESS_RANGE.contains(&address).then(|| {
            Message::from_opcode(
                Opcode::LocoAdrP2,
                &[(address >> 7) as u8, (address & 0x7f) as u8],
            )
        })
    }

    /// Write slot data copied from `base` (a slot read or write), or an
    /// empty slot 1
    pub fn set_loco_slot_data_p1(base: Option<&Message>) -> Option<Message> {
        let default = Message::from_opcode(
            Opcode::SlRdData,
            &[0x0e, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        );
        let base = base.unwrap_or(&default);
        match base.message_type() {
            MessageType::LocoSlotDataP1 | MessageType::SetLocoSlotDataP1 => {
                Some(Message::from_opcode(Opcode::WrSlData, &base.bytes()[1..]))
            }
            _ => None,
        }
    }

    /// Write expanded slot data copied from `base`, or an empty slot 1 of
    /// bank 0
    pub fn set_loco_slot_data_p2(base: Option<&Message>) -> Option<Message> {
        let mut data = vec![0x15, 0x00, 0x01];
        data.resize(19, 0x00);
        let default = Message::from_opcode(Opcode::SlRdDataP2, &data);
        let base = base.unwrap_or(&default);
        match base.message_type() {
            MessageType::LocoSlotDataP2 | MessageType::SetLocoSlotDataP2 => {
                Some(Message::from_opcode(Opcode::WrSlDataP2, &base.bytes()[1..]))
            }
            _ => None,
        }
    }

    /// Release a slot: free, address 0, forward
    pub fn clear_loco_slot_data_p1(slot: u8) -> Option<Message> {
        is_slot(slot).then(|| {
            Message::from_opcode(
                Opcode::WrSlData,
                &[0x0e, slot, 0b0000_0011, 0x00, 0x00, 0b0010_0000, 0, 0, 0, 0, 0, 0],
            )
        })
    }

    /// Release an expanded slot
    pub fn clear_loco_slot_data_p2(bank: u8, slot: u8) -> Option<Message> {
        is_bank_slot(bank, slot).then(|| {
            let mut data = vec![0x15, bank, slot, 0b0000_0011, 0, 0, 0, 0, 0, 0b0010_0000];
            data.resize(19, 0x00);
            Message::from_opcode(Opcode::WrSlDataP2, &data)
        })
    }

    /// Write slot status 1
    pub fn set_loco_slot_stat1_p1(slot: u8, stat1: u8) -> Option<Message> {
        (is_slot(slot) && stat1 < 0x80)
            .then(|| Message::from_opcode(Opcode::SlotStat1, &[slot, stat1]))
    }

    /// Write expanded slot status 1
    pub fn set_loco_slot_stat1_p2(bank: u8, slot: u8, stat1: u8) -> Option<Message> {
        (is_bank_slot(bank, slot) && stat1 < 0x80).then(|| {
            Message::from_opcode(Opcode::D4Group, &[0b0011_1000 | bank, slot, 0x60, stat1])
        })
    }

    /// Move a slot to another
    pub fn move_slot_p1(source: u8, destination: u8) -> Option<Message> {
        (is_slot(source) && is_slot(destination) && source != destination)
            .then(|| Message::from_opcode(Opcode::MoveSlots, &[source, destination]))
    }

    /// Move an expanded slot to another
    pub fn move_slot_p2(
        source_bank: u8,
        source: u8,
        destination_bank: u8,
        destination: u8,
    ) -> Option<Message> {
        (is_bank_slot(source_bank, source)
            && is_bank_slot(destination_bank, destination)
            && (source_bank, source) != (destination_bank, destination))
            .then(|| {
                Message::from_opcode(
                    Opcode::D4Group,
                    &[0b0011_1000 | source_bank, source, destination_bank, destination],
                )
            })
    }

    /// Mark a slot in use
    pub fn set_loco_slot_in_use_p1(slot: u8) -> Option<Message> {
        is_slot(slot).then(|| Message::from_opcode(Opcode::MoveSlots, &[slot, slot]))
    }

    /// Mark an expanded slot in use
    pub fn set_loco_slot_in_use_p2(bank: u8, slot: u8) -> Option<Message> {
        is_bank_slot(bank, slot).then(|| {
            Message::from_opcode(Opcode::D4Group, &[0b0011_1000 | bank, slot, bank, slot])
        })
    }

    /// Set slot speed
    pub fn loco_spd_p1(slot: u8, speed: u8) -> Option<Message> {
        (is_slot(slot) && SPEED_RANGE.contains(&speed))
            .then(|| Message::from_opcode(Opcode::LocoSpd, &[slot, speed]))
    }

    /// Set expanded slot speed and direction
    pub fn loco_spd_dir_p2(
        bank: u8,
        slot: u8,
        speed: u8,
        direction: Direction,
        throttle_id: u16,
    ) -> Option<Message> {
        (is_bank_slot(bank, slot) && SPEED_RANGE.contains(&speed)).then(|| {
            let reverse = if direction == Direction::Reverse { 0b0000_1000 } else { 0 };
            Message::from_opcode(
                Opcode::D5Group,
                &[bank | reverse, slot, (throttle_id & 0x7f) as u8, speed],
            )
        })
    }

    /// Set direction and F0 to F4
    pub fn loco_dir_f0f4_p1(
        slot: u8,
        direction: Direction,
        functions: &FunctionGroup,
    ) -> Option<Message> {
        is_slot(slot).then(|| {
            let f0 = if functions.get(0) { 0b0001_0000 } else { 0 };
            let dirf = u8::from(direction) | f0 | functions.pack(1, 4);
            Message::from_opcode(Opcode::LocoDirF, &[slot, dirf])
        })
    }

    /// Set F5 to F8
    pub fn loco_f5f8_p1(slot: u8, functions: &FunctionGroup) -> Option<Message> {
        is_slot(slot).then(|| Message::from_opcode(Opcode::LocoSnd, &[slot, functions.pack(5, 4)]))
    }

    fn loco_function_p2(
        bank: u8,
        slot: u8,
        group: u8,
        throttle_id: u16,
        fnx: u8,
    ) -> Option<Message> {
        is_bank_slot(bank, slot).then(|| {
            Message::from_opcode(
                Opcode::D5Group,
                &[bank | group, slot, (throttle_id & 0x7f) as u8, fnx],
            )
        })
    }

    /// Set F0 to F6 of an expanded slot
    pub fn loco_f0f6_p2(
        bank: u8,
        slot: u8,
        functions: &FunctionGroup,
        throttle_id: u16,
    ) -> Option<Message> {
        let f0 = if functions.get(0) { 0b0001_0000 } else { 0 };
        let fnx = functions.pack(1, 4) | f0 | functions.pack(5, 2) << 5;
        Message::loco_function_p2(bank, slot, 0b0001_0000, throttle_id, fnx)
    }

    /// Set F7 to F13 of an expanded slot
    pub fn loco_f7f13_p2(
        bank: u8,
        slot: u8,
        functions: &FunctionGroup,
        throttle_id: u16,
    ) -> Option<Message> {
        Message::loco_function_p2(bank, slot, 0b0001_1000, throttle_id, functions.pack(7, 7))
    }

    /// Set F14 to F20 of an expanded slot
    pub fn loco_f14f20_p2(
        bank: u8,
        slot: u8,
        functions: &FunctionGroup,
        throttle_id: u16,
    ) -> Option<Message> {
        Message::loco_function_p2(bank, slot, 0b0010_0000, throttle_id, functions.pack(14, 7))
    }

    /// Set F21 to F28 of an expanded slot
    pub fn loco_f21f28_p2(
        bank: u8,
        slot: u8,
        functions: &FunctionGroup,
        throttle_id: u16,
    ) -> Option<Message> {
        let group = if functions.get(28) { 0b0011_0000 } else { 0b0010_1000 };
        Message::loco_function_p2(bank, slot, group, throttle_id, functions.pack(21, 7))
    }

    fn dcc_functions(address: u16, block: FunctionBlock, functions: &FunctionGroup) -> Option<Message> {
        if !LOCO_ADDRESS_RANGE.contains(&address) {
            return None;
        }
        let packet = DccPacket::function_expansion(address, block, functions)?;
        Message::imm_packet_dcc(&packet, ImmRepeat::Repeat4)
    }

    /// F13 to F20 as a DCC packet sent immediately
    pub fn dcc_f13f20(address: u16, functions: &FunctionGroup) -> Option<Message> {
        Message::dcc_functions(address, FunctionBlock::F13F20, functions)
    }

    /// F21 to F28 as a DCC packet sent immediately
    pub fn dcc_f21f28(address: u16, functions: &FunctionGroup) -> Option<Message> {
        Message::dcc_functions(address, FunctionBlock::F21F28, functions)
    }

    /// F29 to F36 as a DCC packet sent immediately
    pub fn dcc_f29f36(address: u16, functions: &FunctionGroup) -> Option<Message> {
        Message::dcc_functions(address, FunctionBlock::F29F36, functions)
    }

    /// F37 to F44 as a DCC packet sent immediately
    pub fn dcc_f37f44(address: u16, functions: &FunctionGroup) -> Option<Message> {
        Message::dcc_functions(address, FunctionBlock::F37F44, functions)
    }

    /// F45 to F52 as a DCC packet sent immediately
    pub fn dcc_f45f52(address: u16, functions: &FunctionGroup) -> Option<Message> {
        Message::dcc_functions(address, FunctionBlock::F45F52, functions)
    }

    /// F53 to F60 as a DCC packet sent immediately
    pub fn dcc_f53f60(address: u16, functions: &FunctionGroup) -> Option<Message> {
        Message::dcc_functions(address, FunctionBlock::F53F60, functions)
    }

    /// F61 to F68 as a DCC packet sent immediately
    pub fn dcc_f61f68(address: u16, functions: &FunctionGroup) -> Option<Message> {
        Message::dcc_functions(address, FunctionBlock::F61F68, functions)
    }

    // Switches

    fn switch_request(opcode: Opcode, switch: u16, state: Option<SwitchState>) -> Option<Message> {
        if !SWITCH_ADDRESS_RANGE.contains(&switch) {
            return None;
        }
        let number = switch - 1;
        let state = state.map(u8::from).unwrap_or(0);
        Some(Message::from_opcode(
            opcode,
            &[(number & 0x7f) as u8, (number >> 7) as u8 | state],
        ))
    }

    /// Throw or close a switch
    pub fn set_sw(switch: u16, state: SwitchState) -> Option<Message> {
        Message::switch_request(Opcode::SwReq, switch, Some(state))
    }

    /// Throw or close a switch, asking the command station to acknowledge
    pub fn set_sw_with_ack(switch: u16, state: SwitchState) -> Option<Message> {
        Message::switch_request(Opcode::SwAck, switch, Some(state))
    }

    /// Request a switch position
    pub fn get_sw_state(switch: u16) -> Option<Message> {
        Message::switch_request(Opcode::SwState, switch, None)
    }

    /// Long acknowledgment of `opcode`
    pub fn ack(opcode: Opcode, status: u8) -> Message {
        Message::from_opcode(Opcode::LongAck, &[u8::from(opcode) & 0x7f, status])
    }

    /// Switch request accepted
    pub fn set_sw_accepted() -> Message {
        Message::ack(Opcode::SwReq, 0x7f)
    }

    /// Switch request rejected
    pub fn set_sw_rejected() -> Message {
        Message::ack(Opcode::SwReq, 0x00)
    }

    /// Acknowledged switch request accepted
    pub fn set_sw_with_ack_accepted() -> Message {
        Message::ack(Opcode::SwAck, 0x7f)
    }

    /// Acknowledged switch request rejected
    pub fn set_sw_with_ack_rejected() -> Message {
        Message::ack(Opcode::SwAck, 0x00)
    }

    // Devices and firmware

    /// Ask devices of `product` (all products when `None`) to identify
    pub fn ipl_discover(product: Option<ProductCode>) -> Message {
        let product = product.map(u8::from).unwrap_or(0x00);
        peer_xfer_20(&[0x0f, 0x08, 0x00, product, 0, 0, 0, 0, 0, 0x01])
    }

    /// Ask the interface to identify itself
    pub fn get_interface_data() -> Message {
        Message::from_opcode(Opcode::Busy, &[])
    }

    /// Start a firmware transfer
    pub fn ipl_setup(descriptor: &IplDescriptor) -> Message {
        let first = [
            descriptor.manufacturer,
            descriptor.product,
            descriptor.hardware_version,
            descriptor.software_version,
        ];
        let pxct2 = pxct_for(&[descriptor.options]) | pxct_for(&[0, 0, descriptor.blocks_to_erase]);
        ipl_frame(
            0b0100_0000 | pxct_for(&first),
            first,
            pxct2,
            [descriptor.options, 0x00, descriptor.blocks_to_erase, 0x00],
        )
    }

    /// Set the firmware load address (24 bits)
    pub fn ipl_set_addr(address: u32) -> Message {
        let first = [(address >> 16) as u8, (address >> 8) as u8, address as u8, 0x00];
        ipl_frame(
            0b0100_0000 | pxct_for(&first),
            first,
            0b0001_0000,
            [0x00; 4],
        )
    }

    /// Load eight bytes of firmware at the current address
    pub fn ipl_data_load(data: [u8; 8]) -> Message {
        let first = [data[0], data[1], data[2], data[3]];
        let second = [data[4], data[5], data[6], data[7]];
        ipl_frame(
            0b0100_0000 | pxct_for(&first),
            first,
            0b0010_0000 | pxct_for(&second),
            second,
        )
    }

    /// Finish a firmware transfer
    pub fn ipl_end_load() -> Message {
        ipl_frame(0b0100_0000, [0x00; 4], 0b0100_0000, [0x00; 4])
    }

    // Route and roster tables

    /// Read route table capabilities
    pub fn get_route_table_info_a() -> Message {
        let mut data = vec![0x10, 0x01];
        data.resize(14, 0x00);
        Message::from_opcode(Opcode::WrSlDataP2, &data)
    }

    /// Read extended route table capabilities
    pub fn get_route_table_info_b() -> Message {
        let mut data = vec![0x10, 0x02];
        data.resize(14, 0x00);
        Message::from_opcode(Opcode::WrSlDataP2, &data)
    }

    /// Read page `page` of route `route` (one based) when each route spans
    /// `pages_per_route` pages (2 or 4)
    pub fn get_route_table_page(route: u16, page: u16, pages_per_route: u16) -> Option<Message> {
        if route == 0 || !matches!(pages_per_route, 2 | 4) || page >= pages_per_route {
            return None;
        }
        let combined = page | (route - 1) << (pages_per_route / 2);
        if combined >> 7 > 1 {
            return None;
        }
        let mut data = vec![0x10, 0x01, 0x02, (combined & 0x7f) as u8, (combined >> 7) as u8, 0x0f];
        data.resize(14, 0x7f);
        Some(Message::from_opcode(Opcode::WrSlDataP2, &data))
    }

    /// Read roster table capabilities
    pub fn get_roster_table_info() -> Message {
        let mut data = vec![0x10, 0x00];
        data.resize(14, 0x00);
        Message::from_opcode(Opcode::WrSlDataP2, &data)
    }

    /// Read roster record `record` (0 to 31)
    pub fn get_roster_entry(record: u8) -> Option<Message> {
        (record < 32).then(|| {
            let mut data = vec![0x10, 0x00, 0x02, record, 0x00, 0x0f];
            data.resize(14, 0x00);
            Message::from_opcode(Opcode::WrSlDataP2, &data)
        })
    }

    /// Write a roster entry holding two extended and two primary addresses
    pub fn set_roster_entry(
        entry: u8,
        extended1: u16,
        primary1: u8,
        extended2: u16,
        primary2: u8,
    ) -> Option<Message> {
        let valid_extended = |address: u16| address < 0x4000;
        if entry >= 0x80
            || !valid_extended(extended1)
            || !valid_extended(extended2)
            || primary1 >= 0x80
            || primary2 >= 0x80
        {
            return None;
        }
        let flag = if entry & 0x01 != 0 { 0x04 } else { 0x00 };
        Some(Message::from_opcode(
            Opcode::WrSlDataP2,
            &[
                0x10,
                0x00,
                0x43,
                entry >> 1,
                0x00,
                flag,
                (extended1 & 0x7f) as u8,
                (extended1 >> 7) as u8,
                primary1,
                0x00,
                (extended2 & 0x7f) as u8,
                (extended2 >> 7) as u8,
                primary2,
                0x00,
            ],
        ))
    }

    // Tetherless receivers and duplex radio

    /// Locate tetherless receivers
    pub fn find_receiver() -> Message {
        Message::from_opcode(Opcode::DfGroup, &[0x00, 0x00, 0x00, 0x00])
    }

    /// Assign a receiver LocoNet ID (0 to 7)
    pub fn set_loconet_id(id: u8) -> Option<Message> {
        LOCONET_ID_RANGE
            .contains(&id)
            .then(|| Message::from_opcode(Opcode::DfGroup, &[0x40, 0x1f, id, 0x00]))
    }

    /// Read duplex group data
    pub fn get_duplex_data() -> Message {
        peer_xfer_20(&[0x03, 0x08])
    }

    /// Write duplex group name (truncated and space padded to eight bytes),
    /// channel and group id
    pub fn set_duplex_group_data(name: &str, channel: u8, group_id: u8) -> Option<Message> {
        let mut padded = Vec::with_capacity(8);
        for ch in name.chars() {
            let mut buf = [0u8; 4];
            let encoded = ch.encode_utf8(&mut buf).as_bytes();
            if padded.len() + encoded.len() > 8 {
                break;
            }
            padded.extend_from_slice(encoded);
        }
        padded.resize(8, b' ');

        let mut data = vec![0x14, 0x03, 0x00, 0x00];
        data.extend_from_slice(&padded[..4]);
        data.push(0x00);
        data.extend_from_slice(&padded[4..]);
        data.extend_from_slice(&[0x00, 0x00, 0x00, channel, group_id]);

        let encoded = encode_peer_xfer(&data, 3, 3)?;
        Some(Message::from_opcode(Opcode::PeerXfer, &encoded))
    }

    /// Read duplex signal strength on `channel`
    pub fn get_duplex_signal_strength(channel: u8) -> Message {
        peer_xfer_20(&[0x10, 0x08, 0x00, channel & 0x7f])
    }

    /// Set the duplex radio channel
    pub fn set_duplex_channel_number(channel: u8) -> Message {
        peer_xfer_20(&[0x02, 0x00, pxct_for(&[channel]), channel & 0x7f])
    }

    /// Set the duplex group id
    pub fn set_duplex_group_id(group_id: u8) -> Message {
        peer_xfer_20(&[0x04, 0x00, pxct_for(&[group_id]), group_id & 0x7f])
    }

    /// Read the duplex group id
    pub fn get_duplex_group_id() -> Message {
        peer_xfer_20(&[0x04, 0x08])
    }

    /// Report duplex signal strength on `channel`
    pub fn set_duplex_signal_strength(channel: u8, strength: u8) -> Message {
        peer_xfer_20(&[
            0x10,
            0x10,
            pxct_for(&[channel, strength]),
            channel & 0x7f,
            strength & 0x7f,
        ])
    }

    /// Set the duplex password: the first four characters, zero padded
    /// (ASCII only)
    pub fn set_duplex_password(password: &str) -> Option<Message> {
        if !password.is_ascii() {
            return None;
        }
        let mut digits: Vec<u8> = password.bytes().take(4).collect();
        digits.resize(4, b'0');
        let mut header = vec![0x07, 0x00, pxct_for(&digits)];
        header.extend(digits.iter().map(|digit| digit & 0x7f));
        Some(peer_xfer_20(&header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::is_checksum_ok;

    #[test]
    fn test_fixed_frames() {
        assert_eq!(Message::power_on().frame().as_ref(), &[0x83, 0x7c]);
        assert_eq!(Message::power_off().frame().as_ref(), &[0x82, 0x7d]);
        assert_eq!(
            Message::get_op_sw_data_a_p1().frame().as_ref(),
            &[0xbb, 0x7f, 0x00, 0x3b]
        );
        assert_eq!(
            Message::get_prog_slot_data().message_type(),
            MessageType::GetProgSlotData
        );
        assert_eq!(
            Message::get_fast_clock().message_type(),
            MessageType::GetFastClockData
        );
        assert_eq!(
            Message::op_sw_data_a_p1().message_type(),
            MessageType::OpSwDataAP1
        );
        assert_eq!(
            Message::set_op_sw_data_b_p1(true).message_type(),
            MessageType::SetOpSwDataBP1
        );
        assert_eq!(
            Message::reset_query_slot4().message_type(),
            MessageType::ResetQuerySlot4
        );
    }

    #[test]
    fn test_query_slot_bounds() {
        assert!(Message::get_query_slot(0).is_none());
        assert!(Message::get_query_slot(6).is_none());
        let query = Message::get_query_slot(3).unwrap();
        assert_eq!(query.bytes(), &[0xbb, 0x7a, 0x41]);
        assert_eq!(query.query_slot_number(), Some(3));
    }

    #[test]
    fn test_slot_bounds() {
        assert!(Message::get_loco_slot_data_p1(0).is_none());
        assert!(Message::get_loco_slot_data_p1(127).is_none());
        assert!(Message::get_loco_slot_data_p1(1).is_some());
        assert!(Message::get_loco_slot_data_p1(119).is_some());
        assert!(Message::get_loco_slot_data_p1(120).is_none());
        assert!(Message::get_loco_slot_data_p2(3, 5).is_some());
        assert!(Message::get_loco_slot_data_p2(4, 5).is_none());
        assert!(Message::loco_spd_p1(5, 127).is_some());
        assert!(Message::loco_spd_p1(5, 128).is_none());
        assert!(Message::get_loco_slot_data_adr_p1(0).is_none());
        assert!(Message::get_loco_slot_data_adr_p1(10239).is_some());
        assert!(Message::get_loco_slot_data_adr_p2(10240).is_none());
    }

    #[test]
    fn test_loco_address_request() {
        let request = Message::get_loco_slot_data_adr_p1(1234).unwrap();
        assert_eq!(request.bytes(), &[0xbf, 0x09, 0x52]);
        assert_eq!(request.locomotive_address(), Some(1234));
    }

    #[test]
    fn test_imm_packet_side_channel() {
        let message =
            Message::imm_packet(&[0x81, 0x82, 0x83, 0x84, 0x85], ImmRepeat::Repeat1).unwrap();
        assert_eq!(message.message_type(), MessageType::ImmPacket);
        assert_eq!(message.bytes()[3], 0x51);
        assert_eq!(message.bytes()[4], 0b0001_1111);
        assert_eq!(&message.bytes()[5..10], &[0x01, 0x02, 0x03, 0x04, 0x05]);
        assert_eq!(message.imm_repeat_count(), Some(ImmRepeat::Repeat1));
        assert!(Message::imm_packet(&[], ImmRepeat::Repeat1).is_none());
        assert!(Message::imm_packet(&[0; 6], ImmRepeat::Repeat1).is_none());
    }

    #[test]
    fn test_imm_packet_dcc_round_trip() {
        let packet = DccPacket::from_payload(&[0xc4, 0xd2, 0xdc, 0x81, 0x7f]);
        let message = Message::imm_packet_dcc(&packet, ImmRepeat::Continuous).unwrap();
        assert_eq!(message.dcc_packet(), Some(packet));

        let speed = DccPacket::from_bytes(&[0x03, 0x3f, 0x3c]).unwrap();
        let message = Message::imm_packet_dcc(&speed, ImmRepeat::NoRepeat).unwrap();
        assert_eq!(message.bytes()[3], 0x20);
    }

    #[test]
    fn test_set_loco_slot_data_requires_slot_base() {
        let default = Message::set_loco_slot_data_p1(None).unwrap();
        assert_eq!(default.message_type(), MessageType::SetLocoSlotDataP1);
        assert_eq!(default.bytes()[0], 0xef);

        let p2 = Message::set_loco_slot_data_p2(None).unwrap();
        assert_eq!(p2.message_type(), MessageType::SetLocoSlotDataP2);

        assert!(Message::set_loco_slot_data_p1(Some(&Message::power_on())).is_none());
    }

    #[test]
    fn test_slot_moves() {
        assert!(Message::move_slot_p1(5, 5).is_none());
        let moved = Message::move_slot_p1(5, 6).unwrap();
        assert_eq!(moved.message_type(), MessageType::MoveSlotP1);

        assert!(Message::move_slot_p2(1, 5, 1, 5).is_none());
        let moved = Message::move_slot_p2(1, 5, 2, 5).unwrap();
        assert_eq!(moved.message_type(), MessageType::MoveSlotP2);

        let in_use = Message::set_loco_slot_in_use_p2(2, 9).unwrap();
        assert_eq!(in_use.message_type(), MessageType::SetLocoSlotInUseP2);
        assert_eq!(in_use.slot_bank(), Some(2));
        assert_eq!(in_use.slot_number(), Some(9));

        let stat1 = Message::set_loco_slot_stat1_p2(1, 9, 0x13).unwrap();
        assert_eq!(stat1.message_type(), MessageType::SetLocoSlotStat1P2);
        assert!(Message::set_loco_slot_stat1_p1(9, 0x80).is_none());
    }

    #[test]
    fn test_function_commands_round_trip() {
        let functions = FunctionGroup::new().with(0, true).with(3, true).with(6, true);
        let message = Message::loco_f0f6_p2(1, 9, &functions, 0x1234).unwrap();
        assert_eq!(message.bytes(), &[0xd5, 0x11, 0x09, 0x34, 0b0101_0100]);
        assert_eq!(message.functions().unwrap().active(), vec![0, 3, 6]);

        let dirf = Message::loco_dir_f0f4_p1(9, Direction::Reverse, &functions).unwrap();
        assert_eq!(dirf.bytes(), &[0xa1, 0x09, 0b0011_0100]);
        assert_eq!(dirf.direction(), Some(Direction::Reverse));

        let high = FunctionGroup::new().with(21, true).with(28, true);
        let message = Message::loco_f21f28_p2(0, 9, &high, 0x01).unwrap();
        assert_eq!(message.bytes()[1], 0x30);
        assert_eq!(message.functions().unwrap().active(), vec![21, 28]);
    }

    #[test]
    fn test_dcc_function_commands() {
        let functions = FunctionGroup::new().with(13, true);
        let message = Message::dcc_f13f20(3, &functions).unwrap();
        assert_eq!(message.imm_repeat_count(), Some(ImmRepeat::Repeat4));
        let packet = message.dcc_packet().unwrap();
        assert_eq!(packet.payload(), &[0x03, 0xde, 0x01]);
        assert!(Message::dcc_f61f68(0, &functions).is_none());
    }

    #[test]
    fn test_switch_commands() {
        let message = Message::set_sw(130, SwitchState::Closed).unwrap();
        assert_eq!(message.bytes(), &[0xb0, 0x01, 0x31]);
        assert_eq!(message.switch_address(), Some(130));
        assert!(Message::set_sw(0, SwitchState::Closed).is_none());
        assert!(Message::set_sw(2049, SwitchState::Thrown).is_none());

        let with_ack = Message::set_sw_with_ack(2048, SwitchState::Thrown).unwrap();
        assert_eq!(with_ack.message_type(), MessageType::SetSwWithAck);

        assert_eq!(
            Message::set_sw_accepted().message_type(),
            MessageType::SetSwAccepted
        );
        assert_eq!(
            Message::set_sw_with_ack_rejected().message_type(),
            MessageType::SetSwWithAckRejected
        );
    }

    #[test]
    fn test_receiver_and_ipl_commands() {
        assert_eq!(Message::find_receiver().message_type(), MessageType::FindReceiver);
        assert_eq!(
            Message::set_loconet_id(7).unwrap().message_type(),
            MessageType::SetLocoNetId
        );
        assert!(Message::set_loconet_id(8).is_none());
        assert_eq!(
            Message::ipl_discover(None).message_type(),
            MessageType::IplDiscover
        );
        assert_eq!(Message::ipl_discover(Some(ProductCode::Bxp88)).bytes()[5], 0x58);
        assert_eq!(Message::get_interface_data().message_type(), MessageType::Busy);
    }

    #[test]
    fn test_ipl_transfer_frames() {
        let setup = Message::ipl_setup(&IplDescriptor {
            manufacturer: 0x01,
            product: 0x88,
            hardware_version: 0x02,
            software_version: 0x03,
            options: 0x00,
            blocks_to_erase: 0x81,
        });
        assert_eq!(setup.message_type(), MessageType::IplSetup);
        assert_eq!(setup.bytes()[5], 0b0100_0010);
        assert_eq!(setup.bytes()[10], 0b0000_0100);

        let addr = Message::ipl_set_addr(0x01_8000);
        assert_eq!(addr.message_type(), MessageType::IplSetAddr);
        assert_eq!(&addr.bytes()[5..9], &[0b0100_0010, 0x01, 0x00, 0x00]);

        let load = Message::ipl_data_load([0x80, 1, 2, 3, 4, 5, 6, 0xff]);
        assert_eq!(load.message_type(), MessageType::IplDataLoad);
        assert_eq!(load.bytes()[10], 0b0010_1000);

        assert_eq!(Message::ipl_end_load().message_type(), MessageType::IplEndLoad);
    }

    #[test]
    fn test_table_commands() {
        assert_eq!(
            Message::get_route_table_info_a().message_type(),
            MessageType::GetRouteTableInfoA
        );
        assert_eq!(
            Message::get_route_table_info_b().message_type(),
            MessageType::GetRouteTableInfoB
        );
        assert_eq!(
            Message::get_roster_table_info().message_type(),
            MessageType::GetRosterTableInfo
        );
        let page = Message::get_route_table_page(3, 1, 4).unwrap();
        assert_eq!(page.message_type(), MessageType::GetRouteTablePage);
        assert_eq!(page.bytes()[4], 0x09);
        assert!(Message::get_route_table_page(0, 0, 4).is_none());

        assert_eq!(
            Message::get_roster_entry(5).unwrap().message_type(),
            MessageType::GetRosterEntry
        );
        let entry = Message::set_roster_entry(3, 1234, 3, 0, 0).unwrap();
        assert_eq!(entry.message_type(), MessageType::SetRosterEntry);
        assert_eq!(entry.bytes()[6], 0x04);
    }

    #[test]
    fn test_duplex_group_data_round_trip() {
        let message = Message::set_duplex_group_data("Layout", 17, 42).unwrap();
        assert_eq!(message.len(), 19);
        assert!(is_checksum_ok(&message.frame()));
        assert_eq!(message.message_type(), MessageType::SetDuplexGroupData);
        assert_eq!(message.duplex_group_name().as_deref(), Some("Layout  "));
        assert_eq!(message.duplex_group_channel(), Some(17));
        assert_eq!(message.duplex_group_id(), Some(42));
        assert_eq!(message.duplex_group_password().as_deref(), Some("0000"));
    }

    #[test]
    fn test_duplex_single_value_commands() {
        assert_eq!(
            Message::get_duplex_data().message_type(),
            MessageType::GetDuplexGroupData
        );
        assert_eq!(
            Message::set_duplex_channel_number(20).message_type(),
            MessageType::SetDuplexGroupChannel
        );
        assert_eq!(
            Message::set_duplex_group_id(5).message_type(),
            MessageType::SetDuplexGroupId
        );
        assert_eq!(
            Message::get_duplex_group_id().message_type(),
            MessageType::GetDuplexGroupId
        );
        assert_eq!(
            Message::get_duplex_signal_strength(11).message_type(),
            MessageType::GetDuplexSignalStrength
        );
        assert_eq!(
            Message::set_duplex_signal_strength(11, 0x90).bytes()[4],
            0b0000_0010
        );

        let password = Message::set_duplex_password("12").unwrap();
        assert_eq!(password.message_type(), MessageType::SetDuplexGroupPassword);
        assert_eq!(&password.bytes()[5..9], b"1200");
        assert!(Message::set_duplex_password("é").is_none());
    }

    #[test]
    fn test_encode_peer_xfer() {
        let data = [0x00, 0x81, 0x02, 0x83, 0x04, 0x00, 0xff, 0, 0, 0];
        let encoded = encode_peer_xfer(&data, 2, 0).unwrap();
        assert_eq!(&encoded[..5], &[0b0101, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&encoded[5..], &[0b0001, 0x7f, 0, 0, 0]);
        assert!(encode_peer_xfer(&data, 3, 0).is_none());
    }
}
