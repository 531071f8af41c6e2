//! in-memory feeds for tests.

use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use parking_lot::Mutex;
use ping_pubsub::{AnchorWindow, NotificationSource, SlotEvent};
use ping_traits::{ChainError, ChainQuery, SignatureStatus};
use solana_sdk::signature::Signature;
use std::collections::VecDeque;
use std::future::{ready, Future};
use std::sync::atomic::{AtomicU32, Ordering};

type Feed<T> = ping_pubsub::Result<UnboundedReceiver<ping_pubsub::Result<T>>>;

/// notification source replaying prepared subscriptions in order. once they
/// run out every subscribe fails with a connect error.
#[derive(Default)]
pub struct FakeSource {
    anchors: Mutex<VecDeque<Feed<AnchorWindow>>>,
    slots: Mutex<VecDeque<Feed<SlotEvent>>>,
    pub anchor_subscribes: AtomicU32,
    pub slot_subscribes: AtomicU32,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_anchor_feed(&self) -> UnboundedSender<ping_pubsub::Result<AnchorWindow>> {
        let (tx, rx) = unbounded();
        self.anchors.lock().push_back(Ok(rx));
        tx
    }

    pub fn push_slot_feed(&self) -> UnboundedSender<ping_pubsub::Result<SlotEvent>> {
        let (tx, rx) = unbounded();
        self.slots.lock().push_back(Ok(rx));
        tx
    }

    pub fn push_slot_failure(&self, err: ping_pubsub::Error) {
        self.slots.lock().push_back(Err(err));
    }
}

fn exhausted<T>() -> Feed<T> {
    Err(ping_pubsub::Error::Connect("no prepared feed".to_string()))
}

impl NotificationSource for FakeSource {
    type Anchors = UnboundedReceiver<ping_pubsub::Result<AnchorWindow>>;
    type Slots = UnboundedReceiver<ping_pubsub::Result<SlotEvent>>;

    fn recent_anchors(&self) -> impl Future<Output = ping_pubsub::Result<Self::Anchors>> + Send {
        self.anchor_subscribes.fetch_add(1, Ordering::Relaxed);
        ready(self.anchors.lock().pop_front().unwrap_or_else(exhausted))
    }

    fn slot_updates(&self) -> impl Future<Output = ping_pubsub::Result<Self::Slots>> + Send {
        self.slot_subscribes.fetch_add(1, Ordering::Relaxed);
        ready(self.slots.lock().pop_front().unwrap_or_else(exhausted))
    }
}

/// chain with a fixed epoch position.
pub struct FakeChain {
    pub slot: u64,
    pub block_height: u64,
}

impl ChainQuery for FakeChain {
    fn slot_and_block_height(&self) -> impl Future<Output = Result<(u64, u64), ChainError>> + Send {
        ready(Ok((self.slot, self.block_height)))
    }

    fn block_height(&self) -> impl Future<Output = Result<u64, ChainError>> + Send {
        ready(Ok(self.block_height))
    }

    fn signature_status(
        &self,
        _signature: &Signature,
    ) -> impl Future<Output = Result<Option<SignatureStatus>, ChainError>> + Send {
        ready(Ok(None))
    }

    fn landed_slot(
        &self,
        _signature: &Signature,
    ) -> impl Future<Output = Result<Option<u64>, ChainError>> + Send {
        ready(Ok(None))
    }
}
