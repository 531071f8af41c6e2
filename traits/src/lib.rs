//! shared traits for ping_* crates.
//!
//! the live caches implement [`AnchorSource`] and [`SlotSource`], the rpc
//! adapters implement [`ChainQuery`]; the probe loop only sees these seams.

use solana_sdk::hash::Hash;
use solana_sdk::signature::Signature;
use std::future::Future;
use std::sync::Arc;

/// boxed error from a transport the seam does not know about.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// a recent blockhash together with the last block height it is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LifetimeAnchor {
    pub value: Hash,
    pub expiry_height: u64,
}

impl LifetimeAnchor {
    #[inline]
    pub const fn new(value: Hash, expiry_height: u64) -> Self {
        Self {
            value,
            expiry_height,
        }
    }
}

/// hands out lifetime anchors that were never handed out before.
pub trait AnchorSource: Send + Sync {
    /// next unused anchor of the live window.
    ///
    /// waits for the first window on a cold cache. an exhausted window is
    /// fatal: reusing an anchor would produce a duplicate transaction.
    fn acquire(&self) -> impl Future<Output = Result<LifetimeAnchor, AnchorError>> + Send;
}

/// one-shot view of slot progress.
pub trait SlotSource: Send + Sync {
    /// resolves on the next qualifying slot event.
    ///
    /// callers waiting at the same time all receive the same slot.
    fn next(&self) -> impl Future<Output = Result<u64, SlotError>> + Send;
}

/// status of a signature as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub slot: u64,
    /// debug rendering of the transaction error, if execution failed.
    pub err: Option<String>,
    /// reached the commitment the query was made with.
    pub confirmed: bool,
}

/// request/response queries against an rpc node.
pub trait ChainQuery: Send + Sync {
    /// current `(absolute_slot, block_height)`.
    fn slot_and_block_height(&self) -> impl Future<Output = Result<(u64, u64), ChainError>> + Send;

    /// current block height.
    fn block_height(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;

    /// status of one signature, `None` when the node has not seen it.
    fn signature_status(
        &self,
        signature: &Signature,
    ) -> impl Future<Output = Result<Option<SignatureStatus>, ChainError>> + Send;

    /// slot a transaction landed in, `None` when the node does not know it.
    fn landed_slot(
        &self,
        signature: &Signature,
    ) -> impl Future<Output = Result<Option<u64>, ChainError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum AnchorError {
    #[error("all {0} anchors in the live window are used")]
    Exhausted(usize),
    #[error("anchor feed stopped")]
    FeedStopped,
}

#[derive(Debug, thiserror::Error)]
pub enum SlotError {
    #[error("slot feed stopped before the next slot")]
    FeedStopped,
}

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("rpc error: {0}")]
    Rpc(#[source] BoxError),
    #[error("malformed rpc response: {0}")]
    Malformed(String),
}

impl ChainError {
    pub fn rpc(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        ChainError::Rpc(Box::new(err))
    }
}

/// blanket impls for Arc<T> - just forwards.
impl<T: AnchorSource> AnchorSource for Arc<T> {
    #[inline]
    fn acquire(&self) -> impl Future<Output = Result<LifetimeAnchor, AnchorError>> + Send {
        (**self).acquire()
    }
}

impl<T: SlotSource> SlotSource for Arc<T> {
    #[inline]
    fn next(&self) -> impl Future<Output = Result<u64, SlotError>> + Send {
        (**self).next()
    }
}

impl<T: ChainQuery> ChainQuery for Arc<T> {
    #[inline]
    fn slot_and_block_height(&self) -> impl Future<Output = Result<(u64, u64), ChainError>> + Send {
        (**self).slot_and_block_height()
    }

    #[inline]
    fn block_height(&self) -> impl Future<Output = Result<u64, ChainError>> + Send {
        (**self).block_height()
    }

    #[inline]
    fn signature_status(
        &self,
        signature: &Signature,
    ) -> impl Future<Output = Result<Option<SignatureStatus>, ChainError>> + Send {
        (**self).signature_status(signature)
    }

    #[inline]
    fn landed_slot(
        &self,
        signature: &Signature,
    ) -> impl Future<Output = Result<Option<u64>, ChainError>> + Send {
        (**self).landed_slot(signature)
    }
}
