//! signature confirmation race.
//!
//! a signature subscription races a block height watch: whichever decides
//! first (confirmed, failed, expired) ends the wait.

use crate::network::{ConfirmError, SignatureConfirmer};
use futures::{Stream, StreamExt};
use ping_pubsub::{PubsubSource, SignatureEvent};
use ping_traits::ChainQuery;
use solana_sdk::signature::Signature;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// wait for `signature` on an established subscription.
///
/// the status query runs after the subscription is up, so a transaction that
/// confirmed before subscribing is still seen.
pub async fn await_signature<St, Q>(
    mut events: St,
    chain: &Q,
    signature: &Signature,
    expiry_height: u64,
    poll: Duration,
) -> Result<(), ConfirmError>
where
    St: Stream<Item = ping_pubsub::Result<SignatureEvent>> + Unpin,
    Q: ChainQuery,
{
    if let Some(status) = chain.signature_status(signature).await? {
        if let Some(err) = status.err {
            return Err(ConfirmError::from_tx_error(err));
        }
        if status.confirmed {
            tracing::debug!("{} already confirmed at slot {}", signature, status.slot);
            return Ok(());
        }
    }

    let mut ticker = tokio::time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(Ok(SignatureEvent::Processed { err: None, .. })) => return Ok(()),
                Some(Ok(SignatureEvent::Processed { err: Some(err), .. })) => {
                    return Err(ConfirmError::from_tx_error(err));
                }
                Some(Ok(SignatureEvent::Received)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => {
                    return Err(ConfirmError::Transport(
                        "signature subscription closed".to_string(),
                    ));
                }
            },
            _ = ticker.tick() => match chain.block_height().await {
                Ok(block_height) if block_height > expiry_height => {
                    return Err(ConfirmError::Expired {
                        block_height,
                        expiry_height,
                    });
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("block height poll failed: {}", e),
            },
        }
    }
}

/// confirmer backed by a websocket signature subscription.
pub struct PubsubConfirmer<Q> {
    pubsub: PubsubSource,
    chain: Q,
    poll: Duration,
}

impl<Q: ChainQuery> PubsubConfirmer<Q> {
    pub fn new(pubsub: PubsubSource, chain: Q, poll: Duration) -> Self {
        Self {
            pubsub,
            chain,
            poll,
        }
    }
}

impl<Q: ChainQuery> SignatureConfirmer for PubsubConfirmer<Q> {
    fn confirm(
        &self,
        signature: Signature,
        expiry_height: u64,
    ) -> impl Future<Output = Result<(), ConfirmError>> + Send {
        async move {
            let events = self.pubsub.subscribe_signature(signature).await?;
            await_signature(events, &self.chain, &signature, expiry_height, self.poll).await
        }
    }
}
