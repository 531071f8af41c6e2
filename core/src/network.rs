//! submission and confirmation seams of the probe loop.

use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use std::future::Future;
use std::sync::Arc;

/// fire-and-forget transaction submission.
pub trait TransactionSender: Send + Sync {
    /// submit once: no preflight, no node side retries.
    fn send(
        &self,
        transaction: &VersionedTransaction,
    ) -> impl Future<Output = Result<Signature, SendError>> + Send;
}

/// waits for a signature to reach the configured commitment.
pub trait SignatureConfirmer: Send + Sync {
    /// resolves once `signature` is confirmed, rejected, or its blockhash
    /// expired at `expiry_height`.
    fn confirm(
        &self,
        signature: Signature,
        expiry_height: u64,
    ) -> impl Future<Output = Result<(), ConfirmError>> + Send;
}

impl<T: TransactionSender> TransactionSender for Arc<T> {
    #[inline]
    fn send(
        &self,
        transaction: &VersionedTransaction,
    ) -> impl Future<Output = Result<Signature, SendError>> + Send {
        (**self).send(transaction)
    }
}

impl<T: SignatureConfirmer> SignatureConfirmer for Arc<T> {
    #[inline]
    fn confirm(
        &self,
        signature: Signature,
        expiry_height: u64,
    ) -> impl Future<Output = Result<(), ConfirmError>> + Send {
        (**self).confirm(signature, expiry_height)
    }
}

/// true for any rendering of the `BlockhashNotFound` transaction error.
#[inline]
pub fn is_blockhash_not_found(message: &str) -> bool {
    message.contains("BlockhashNotFound") || message.contains("Blockhash not found")
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("blockhash not found")]
    BlockhashNotFound,
    #[error("send error: {0}")]
    Rpc(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    #[error("blockhash not found")]
    BlockhashNotFound,
    #[error("block height exceeded: {block_height} > {expiry_height}")]
    Expired { block_height: u64, expiry_height: u64 },
    #[error("transaction failed: {0}")]
    Failed(String),
    #[error("confirmation transport error: {0}")]
    Transport(String),
}

impl ConfirmError {
    /// classify a transaction error rendering.
    pub fn from_tx_error(err: String) -> Self {
        if is_blockhash_not_found(&err) {
            ConfirmError::BlockhashNotFound
        } else {
            ConfirmError::Failed(err)
        }
    }
}

impl From<ping_pubsub::Error> for ConfirmError {
    fn from(err: ping_pubsub::Error) -> Self {
        ConfirmError::Transport(err.to_string())
    }
}

impl From<ping_traits::ChainError> for ConfirmError {
    fn from(err: ping_traits::ChainError) -> Self {
        ConfirmError::Transport(err.to_string())
    }
}
