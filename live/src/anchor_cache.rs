//! recent blockhash cache.
//!
//! the feed task is the only writer of the window; readers load an immutable
//! snapshot. the used set sits behind a mutex because `acquire` and the
//! feed's garbage collection both mutate it.

use crate::config::Config;
use crate::error::{FeedError, LiveError};
use arc_swap::ArcSwap;
use futures::StreamExt;
use parking_lot::Mutex;
use ping_pubsub::{AnchorWindow, NotificationSource};
use ping_traits::{AnchorError, AnchorSource, ChainQuery, LifetimeAnchor};
use solana_sdk::hash::Hash;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// last block height a blockhash seen at `slot` is valid for.
///
/// `offset` converts slots to block heights (`absolute_slot - block_height`
/// at startup).
#[inline]
pub fn expiry_height(slot: u64, offset: u64, validity_window: u64) -> u64 {
    slot.saturating_sub(offset) + validity_window
}

/// published blockhash window, newest first.
#[derive(Debug)]
struct Window {
    slot: u64,
    anchors: Vec<LifetimeAnchor>,
}

/// cache of valid blockhashes that never hands one out twice.
pub struct AnchorCache {
    window: ArcSwap<Option<Window>>,
    /// anchors already handed out, limited to the live window.
    used: Mutex<HashSet<Hash>>,
    populated: watch::Sender<bool>,
}

impl AnchorCache {
    pub fn new() -> Self {
        Self {
            window: ArcSwap::new(Arc::new(None)),
            used: Mutex::new(HashSet::new()),
            populated: watch::Sender::new(false),
        }
    }

    /// replace the window with a fresh notification.
    ///
    /// used anchors that left the window are forgotten; they can never be
    /// issued again anyway.
    pub fn publish(&self, notification: &AnchorWindow, offset: u64, validity_window: u64) {
        let expiry = expiry_height(notification.slot, offset, validity_window);
        let anchors = notification
            .anchors
            .iter()
            .map(|hash| LifetimeAnchor::new(*hash, expiry))
            .collect();

        {
            let mut used = self.used.lock();
            used.retain(|hash| notification.anchors.contains(hash));
            self.window.store(Arc::new(Some(Window {
                slot: notification.slot,
                anchors,
            })));
        }

        self.populated.send_replace(true);
    }

    /// take the newest unused anchor, `Ok(None)` before the first window.
    pub fn try_acquire(&self) -> Result<Option<LifetimeAnchor>, AnchorError> {
        let mut used = self.used.lock();
        let window = self.window.load();
        let Some(window) = window.as_ref().as_ref() else {
            return Ok(None);
        };

        match window.anchors.iter().find(|anchor| !used.contains(&anchor.value)) {
            Some(anchor) => {
                used.insert(anchor.value);
                Ok(Some(*anchor))
            }
            None => Err(AnchorError::Exhausted(window.anchors.len())),
        }
    }

    /// take the newest unused anchor, waiting for the first window.
    pub async fn acquire(&self) -> Result<LifetimeAnchor, AnchorError> {
        let mut populated = self.populated.subscribe();
        populated
            .wait_for(|ready| *ready)
            .await
            .map_err(|_| AnchorError::FeedStopped)?;

        self.try_acquire()?.ok_or(AnchorError::FeedStopped)
    }

    /// slot of the current window.
    #[inline]
    pub fn window_slot(&self) -> Option<u64> {
        let window = self.window.load();
        window.as_ref().as_ref().map(|w| w.slot)
    }

    /// number of anchors in the current window.
    #[inline]
    pub fn window_len(&self) -> usize {
        let window = self.window.load();
        window.as_ref().as_ref().map_or(0, |w| w.anchors.len())
    }

    /// number of anchors handed out from the current window.
    #[inline]
    pub fn used_len(&self) -> usize {
        self.used.lock().len()
    }

    /// keep the cache fresh from the recent blockhashes feed.
    ///
    /// returns only when the attempt budget is spent; the caller is expected
    /// to shut the process down.
    pub async fn run_feed<N, Q>(&self, source: &N, chain: &Q, config: &Config) -> LiveError
    where
        N: NotificationSource,
        Q: ChainQuery,
    {
        let mut attempts = 0u32;
        let mut backoff = config.reconnect_backoff;

        loop {
            let err = match self.prime(source, chain, config).await {
                Ok((offset, mut stream)) => {
                    attempts = 0;
                    backoff = config.reconnect_backoff;
                    self.follow(&mut stream, offset, config).await
                }
                Err(e) => e,
            };

            attempts += 1;
            if err.is_timeout() {
                tracing::error!("blockhash fetch operation timed out");
            } else {
                tracing::error!("blockhash feed error: {}", err);
            }

            if attempts >= config.max_anchor_attempts {
                tracing::error!("max attempts for fetching blockhash reached, exiting");
                return LiveError::AnchorFeed {
                    attempts,
                    last: err,
                };
            }

            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(config.max_reconnect_backoff);
        }
    }

    // offset query, subscription and first notification under one deadline
    async fn prime<N, Q>(
        &self,
        source: &N,
        chain: &Q,
        config: &Config,
    ) -> Result<(u64, N::Anchors), FeedError>
    where
        N: NotificationSource,
        Q: ChainQuery,
    {
        let primed = tokio::time::timeout(config.prime_timeout, async {
            let (offset, mut stream) = tokio::try_join!(
                async {
                    let (slot, block_height) = chain.slot_and_block_height().await?;
                    Ok::<_, FeedError>(slot.saturating_sub(block_height))
                },
                async { Ok::<_, FeedError>(source.recent_anchors().await?) },
            )?;

            let first = stream
                .next()
                .await
                .unwrap_or(Err(ping_pubsub::Error::ConnectionClosed))?;
            self.publish(&first, offset, config.validity_window);

            Ok::<_, FeedError>((offset, stream))
        })
        .await;

        let (offset, stream) = primed.map_err(|_| FeedError::Timeout)??;
        tracing::debug!(
            "blockhash feed primed: offset {} window {} at slot {:?}",
            offset,
            self.window_len(),
            self.window_slot()
        );
        Ok((offset, stream))
    }

    // publish every notification until the stream fails
    async fn follow<S>(&self, stream: &mut S, offset: u64, config: &Config) -> FeedError
    where
        S: futures::Stream<Item = ping_pubsub::Result<AnchorWindow>> + Unpin,
    {
        while let Some(item) = stream.next().await {
            match item {
                Ok(window) => self.publish(&window, offset, config.validity_window),
                Err(e) => return e.into(),
            }
        }
        ping_pubsub::Error::ConnectionClosed.into()
    }
}

impl Default for AnchorCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AnchorSource for AnchorCache {
    fn acquire(&self) -> impl Future<Output = Result<LifetimeAnchor, AnchorError>> + Send {
        AnchorCache::acquire(self)
    }
}
