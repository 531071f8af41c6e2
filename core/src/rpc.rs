//! rpc node adapter for point queries and submission.

use crate::confirm::PubsubConfirmer;
use crate::network::{
    is_blockhash_not_found, ConfirmError, SendError, SignatureConfirmer, TransactionSender,
};
use ping_pubsub::PubsubSource;
use ping_traits::{ChainError, ChainQuery, SignatureStatus};
use serde::Deserialize;
use serde_json::json;
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_client::rpc_request::RpcRequest;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::{TransactionError, VersionedTransaction};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

// the only getTransaction field the probe reads
#[derive(Debug, Deserialize)]
struct LandedTransaction {
    slot: u64,
}

/// rpc client bound to one commitment level.
pub struct RpcChain {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl RpcChain {
    pub fn new(rpc_url: impl Into<String>, commitment: CommitmentConfig) -> Self {
        Self {
            client: Arc::new(RpcClient::new_with_commitment(rpc_url.into(), commitment)),
            commitment,
        }
    }

    #[inline]
    pub fn client(&self) -> Arc<RpcClient> {
        Arc::clone(&self.client)
    }

    async fn fetch_landed_slot(&self, signature: &Signature) -> Result<Option<u64>, ChainError> {
        // raw request: the typed helper turns "not found" into an error
        let params = json!([
            signature.to_string(),
            {
                "encoding": "json",
                "commitment": self.commitment.commitment.to_string(),
                "maxSupportedTransactionVersion": 0,
            }
        ]);
        let landed: Option<LandedTransaction> = self
            .client
            .send(RpcRequest::GetTransaction, params)
            .await
            .map_err(ChainError::rpc)?;
        Ok(landed.map(|tx| tx.slot))
    }

    async fn fetch_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, ChainError> {
        let response = self
            .client
            .get_signature_statuses(&[*signature])
            .await
            .map_err(ChainError::rpc)?;

        let status = response
            .value
            .into_iter()
            .next()
            .ok_or_else(|| ChainError::Malformed("empty signature status list".to_string()))?;

        Ok(status.map(|status| SignatureStatus {
            slot: status.slot,
            confirmed: status.satisfies_commitment(self.commitment),
            err: status.err.map(|err| format!("{:?}", err)),
        }))
    }
}

impl ChainQuery for RpcChain {
    fn slot_and_block_height(&self) -> impl Future<Output = Result<(u64, u64), ChainError>> + Send {
        async move {
            let info = self.client.get_epoch_info().await.map_err(ChainError::rpc)?;
            Ok((info.absolute_slot, info.block_height))
        }
    }

    fn block_height(&self) -> impl Future<Output = Result<u64, ChainError>> + Send {
        async move { self.client.get_block_height().await.map_err(ChainError::rpc) }
    }

    fn signature_status(
        &self,
        signature: &Signature,
    ) -> impl Future<Output = Result<Option<SignatureStatus>, ChainError>> + Send {
        self.fetch_signature_status(signature)
    }

    fn landed_slot(
        &self,
        signature: &Signature,
    ) -> impl Future<Output = Result<Option<u64>, ChainError>> + Send {
        self.fetch_landed_slot(signature)
    }
}

impl TransactionSender for RpcChain {
    fn send(
        &self,
        transaction: &VersionedTransaction,
    ) -> impl Future<Output = Result<Signature, SendError>> + Send {
        let config = RpcSendTransactionConfig {
            skip_preflight: true,
            preflight_commitment: Some(self.commitment.commitment),
            max_retries: Some(0),
            ..RpcSendTransactionConfig::default()
        };

        async move {
            self.client
                .send_transaction_with_config(transaction, config)
                .await
                .map_err(classify_send_error)
        }
    }
}

/// rpc chain plus websocket confirmation, everything the probe loop talks to.
pub struct RpcNetwork {
    chain: Arc<RpcChain>,
    confirmer: PubsubConfirmer<Arc<RpcChain>>,
}

impl RpcNetwork {
    pub fn new(chain: Arc<RpcChain>, pubsub: PubsubSource, block_height_poll: Duration) -> Self {
        Self {
            confirmer: PubsubConfirmer::new(pubsub, Arc::clone(&chain), block_height_poll),
            chain,
        }
    }
}

impl ChainQuery for RpcNetwork {
    fn slot_and_block_height(&self) -> impl Future<Output = Result<(u64, u64), ChainError>> + Send {
        self.chain.slot_and_block_height()
    }

    fn block_height(&self) -> impl Future<Output = Result<u64, ChainError>> + Send {
        self.chain.block_height()
    }

    fn signature_status(
        &self,
        signature: &Signature,
    ) -> impl Future<Output = Result<Option<SignatureStatus>, ChainError>> + Send {
        self.chain.signature_status(signature)
    }

    fn landed_slot(
        &self,
        signature: &Signature,
    ) -> impl Future<Output = Result<Option<u64>, ChainError>> + Send {
        self.chain.landed_slot(signature)
    }
}

impl TransactionSender for RpcNetwork {
    fn send(
        &self,
        transaction: &VersionedTransaction,
    ) -> impl Future<Output = Result<Signature, SendError>> + Send {
        self.chain.send(transaction)
    }
}

impl SignatureConfirmer for RpcNetwork {
    fn confirm(
        &self,
        signature: Signature,
        expiry_height: u64,
    ) -> impl Future<Output = Result<(), ConfirmError>> + Send {
        self.confirmer.confirm(signature, expiry_height)
    }
}

fn classify_send_error(err: ClientError) -> SendError {
    if let Some(TransactionError::BlockhashNotFound) = err.get_transaction_error() {
        return SendError::BlockhashNotFound;
    }
    let message = err.to_string();
    if is_blockhash_not_found(&message) {
        SendError::BlockhashNotFound
    } else {
        SendError::Rpc(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_client::client_error::ClientErrorKind;

    #[test]
    fn test_landed_transaction_from_response() {
        let found: Option<LandedTransaction> = serde_json::from_value(json!({
            "slot": 312_000_123u64,
            "blockTime": 1_700_000_000,
            "meta": { "err": null, "fee": 5000 },
            "transaction": ["...", "base64"],
            "version": 0,
        }))
        .unwrap();
        assert_eq!(found.map(|tx| tx.slot), Some(312_000_123));

        let missing: Option<LandedTransaction> =
            serde_json::from_value(serde_json::Value::Null).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_classify_send_error() {
        let rejected = ClientError::from(ClientErrorKind::TransactionError(
            TransactionError::BlockhashNotFound,
        ));
        assert!(matches!(
            classify_send_error(rejected),
            SendError::BlockhashNotFound
        ));

        let other = ClientError::from(ClientErrorKind::Custom("node is behind".to_string()));
        assert!(matches!(classify_send_error(other), SendError::Rpc(_)));
    }
}
