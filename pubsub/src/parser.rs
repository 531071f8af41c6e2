use crate::error::{Error, Result};
use crate::types::{AnchorWindow, SignatureEvent, SlotEvent, SlotEventKind};
use serde_json::Value;
use solana_client::rpc_response::{Response, RpcSignatureResult, SlotUpdate};
use solana_sdk::hash::Hash;
use std::str::FromStr;

// parse a jsonParsed recent blockhashes account:
// {"data":{"program":"sysvar","parsed":{"type":"recentBlockhashes","info":[{"blockhash":"...","feeCalculator":{...}}]}},...}
// returns the window tagged with the notification slot
pub fn parse_recent_blockhashes(slot: u64, account: &Value) -> Result<AnchorWindow> {
    let parsed = account
        .pointer("/data/parsed")
        .ok_or_else(|| Error::InvalidNotification("account data is not jsonParsed".to_string()))?;

    if let Some(kind) = parsed.get("type").and_then(Value::as_str) {
        if kind != "recentBlockhashes" {
            return Err(Error::InvalidNotification(format!("unexpected sysvar type: {}", kind)));
        }
    }

    let info = parsed
        .get("info")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::InvalidNotification("missing info array".to_string()))?;

    let anchors = info
        .iter()
        .map(|entry| {
            let text = entry
                .get("blockhash")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::InvalidNotification("entry without blockhash".to_string()))?;
            Hash::from_str(text)
                .map_err(|e| Error::InvalidNotification(format!("bad blockhash {}: {}", text, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    if anchors.is_empty() {
        return Err(Error::InvalidNotification("empty blockhash window".to_string()));
    }

    Ok(AnchorWindow { slot, anchors })
}

// map a slotsUpdatesNotification payload
pub fn slot_event(update: SlotUpdate) -> SlotEvent {
    let (slot, kind) = match update {
        SlotUpdate::FirstShredReceived { slot, .. } => (slot, SlotEventKind::FirstShredReceived),
        SlotUpdate::Completed { slot, .. } => (slot, SlotEventKind::Completed),
        SlotUpdate::CreatedBank { slot, .. } => (slot, SlotEventKind::CreatedBank),
        SlotUpdate::Frozen { slot, .. } => (slot, SlotEventKind::Frozen),
        SlotUpdate::Dead { slot, .. } => (slot, SlotEventKind::Dead),
        SlotUpdate::OptimisticConfirmation { slot, .. } => {
            (slot, SlotEventKind::OptimisticConfirmation)
        }
        SlotUpdate::Root { slot, .. } => (slot, SlotEventKind::Root),
    };
    SlotEvent::new(slot, kind)
}

// map a signatureNotification payload
pub fn signature_event(notification: Response<RpcSignatureResult>) -> SignatureEvent {
    match notification.value {
        RpcSignatureResult::ReceivedSignature(_) => SignatureEvent::Received,
        RpcSignatureResult::ProcessedSignature(result) => SignatureEvent::Processed {
            slot: notification.context.slot,
            err: result.err.map(|err| format!("{:?}", err)),
        },
    }
}
