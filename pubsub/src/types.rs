use solana_sdk::hash::Hash;

/// one notification of the recent blockhashes sysvar.
///
/// `anchors` is newest first, exactly as the sysvar orders them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorWindow {
    pub slot: u64,
    pub anchors: Vec<Hash>,
}

/// slot update kinds reported by `slotsUpdatesSubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotEventKind {
    FirstShredReceived,
    Completed,
    CreatedBank,
    Frozen,
    Dead,
    OptimisticConfirmation,
    Root,
}

impl SlotEventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            SlotEventKind::FirstShredReceived => "firstShredReceived",
            SlotEventKind::Completed => "completed",
            SlotEventKind::CreatedBank => "createdBank",
            SlotEventKind::Frozen => "frozen",
            SlotEventKind::Dead => "dead",
            SlotEventKind::OptimisticConfirmation => "optimisticConfirmation",
            SlotEventKind::Root => "root",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotEvent {
    pub slot: u64,
    pub kind: SlotEventKind,
}

impl SlotEvent {
    #[inline]
    pub const fn new(slot: u64, kind: SlotEventKind) -> Self {
        Self { slot, kind }
    }
}

/// signature notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureEvent {
    /// the node saw the transaction, nothing executed yet.
    Received,
    /// executed at the subscribed commitment. `err` is the debug rendering
    /// of the transaction error, if any.
    Processed { slot: u64, err: Option<String> },
}
