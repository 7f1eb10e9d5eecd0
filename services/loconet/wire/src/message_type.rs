//! Semantic message types assigned by the classifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of a LocoNet message
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    #[default]
    Unknown,
    BrdOpSwState,
    Busy,
    ConsistDirF0F4,
    D4Error,
    DispatchGetP1,
    DispatchGetP2,
    DispatchPutP1,
    DispatchPutP2,
    DuplexGroupChannel,
    DuplexGroupData,
    DuplexGroupId,
    DuplexGroupPassword,
    DuplexSignalStrength,
    EzRouteConfirm,
    FastClockData,
    FindLoco,
    FindReceiver,
    GetBrdOpSwState,
    GetOpSwDataAP1,
    GetOpSwDataBP1,
    GetOpSwDataP2,
    GetDuplexGroupChannel,
    GetDuplexGroupData,
    GetDuplexGroupId,
    GetDuplexGroupPassword,
    GetDuplexSignalStrength,
    GetFastClockData,
    GetLocoSlotData,
    GetLocoSlotDataAdrP1,
    GetLocoSlotDataAdrP2,
    GetProgSlotData,
    GetQuerySlot,
    GetRosterEntry,
    GetRosterTableInfo,
    GetRouteTableInfoA,
    GetRouteTableInfoB,
    GetRouteTablePage,
    GetSwState,
    IllegalMoveP1,
    ImmPacket,
    ImmPacketOk,
    ImmPacketLmOk,
    ImmPacketBufferFull,
    InterfaceData,
    InterfaceDataLb,
    InterfaceDataPr3,
    Interrogate,
    InvalidLinkP1,
    InvalidUnlinkP1,
    IplDataLoad,
    IplDevData,
    IplDiscover,
    IplEndLoad,
    IplSetAddr,
    IplSetup,
    LinkSlotsP1,
    LinkSlotsP2,
    LnwiData,
    LocoDirF0F4P1,
    LocoF0F6P2,
    LocoF5F8P1,
    LocoF7F13P2,
    LocoF9F12P1,
    LocoF12F20F28P2,
    LocoF13F19P2,
    LocoF14F20P2,
    LocoF21F27P2,
    LocoF21F28P2,
    LocoRep,
    LocoSlotDataP1,
    LocoSlotDataP2,
    LocoSpdDirP2,
    LocoSpdP1,
    MoveSlotP1,
    MoveSlotP2,
    NoFreeSlotsP1,
    NoFreeSlotsP2,
    OpSwDataAP1,
    OpSwDataBP1,
    OpSwDataP2,
    PmRep,
    PmRepBxp88,
    PrMode,
    ProgCmdAccepted,
    ProgCmdAcceptedBlind,
    ProgCv,
    ProgSlotDataP1,
    ProgrammerBusy,
    PwrOff,
    PwrOn,
    QuerySlot1,
    QuerySlot2,
    QuerySlot3,
    QuerySlot4,
    QuerySlot5,
    ReceiverRep,
    Reset,
    ResetQuerySlot4,
    RosterEntry,
    RosterTableInfo,
    RouteTableInfoA,
    RouteTablePage,
    RoutesDisabled,
    S7CvState,
    S7Info,
    SensRepGenIn,
    SensRepTurnIn,
    SensRepTurnOut,
    SetBrdOpSwOk,
    SetBrdOpSwState,
    SetOpSwDataAP1,
    SetOpSwDataBP1,
    SetOpSwDataP2,
    SetDuplexGroupChannel,
    SetDuplexGroupData,
    SetDuplexGroupId,
    SetDuplexGroupPassword,
    SetFastClockData,
    SetIdleState,
    SetLocoNetId,
    SetLocoSlotDataP1,
    SetLocoSlotDataP2,
    SetLocoSlotInUseP1,
    SetLocoSlotInUseP2,
    SetLocoSlotStat1P1,
    SetLocoSlotStat1P2,
    SetRosterEntry,
    SetRouteTablePage,
    SetS7BaseAddr,
    SetSlotDataOkP1,
    SetSlotDataOkP2,
    SetSw,
    SetSwAccepted,
    SetSwRejected,
    SetSwWithAck,
    SetSwWithAckAccepted,
    SetSwWithAckRejected,
    SlotNotImplemented,
    SwState,
    TransRep,
    TrkShortRep,
    UnlinkSlotsP1,
    UnlinkSlotsP2,
    Zapped,
}

impl MessageType {
    /// Whether this is one of the five query slot replies
    pub fn is_query_slot(self) -> bool {
        matches!(
            self,
            MessageType::QuerySlot1
                | MessageType::QuerySlot2
                | MessageType::QuerySlot3
                | MessageType::QuerySlot4
                | MessageType::QuerySlot5
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
