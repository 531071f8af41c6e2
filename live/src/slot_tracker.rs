//! slot progress tracker.
//!
//! exposes the next qualifying slot event as a shared one-shot future.

use crate::config::{Config, SlotSignal};
use crate::error::{FeedError, LiveError};
use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use futures::StreamExt;
use parking_lot::Mutex;
use ping_pubsub::{NotificationSource, SlotEvent, SlotEventKind};
use ping_traits::{SlotError, SlotSource};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

type PendingSlot = Shared<oneshot::Receiver<u64>>;

impl SlotSignal {
    /// slot a qualifying event resolves to, `None` for everything else.
    #[inline]
    pub fn qualifying_slot(self, event: SlotEvent) -> Option<u64> {
        match (event.kind, self) {
            (SlotEventKind::FirstShredReceived, _) => Some(event.slot),
            (SlotEventKind::Completed, SlotSignal::FirstShredOrCompleted) => Some(event.slot + 1),
            _ => None,
        }
    }
}

/// latest slot plus the pending "next slot" future.
pub struct SlotTracker {
    signal: SlotSignal,
    pending: Mutex<Option<(oneshot::Sender<u64>, PendingSlot)>>,
    latest: AtomicU64,
    closed: AtomicBool,
}

impl SlotTracker {
    pub fn new(signal: SlotSignal) -> Self {
        Self {
            signal,
            pending: Mutex::new(None),
            latest: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// future for the next qualifying slot.
    ///
    /// all callers before the next event share one future and see the same
    /// slot; the first call after it resolves starts a new one.
    pub fn next_slot(&self) -> impl Future<Output = Result<u64, SlotError>> + Send + 'static {
        let pending = {
            // checked under the lock so a racing close cannot miss the sender
            let mut guard = self.pending.lock();
            if self.closed.load(Ordering::Acquire) {
                None
            } else {
                let (_, pending) = guard.get_or_insert_with(|| {
                    let (tx, rx) = oneshot::channel();
                    (tx, rx.shared())
                });
                Some(pending.clone())
            }
        };

        async move {
            match pending {
                Some(pending) => pending.await.map_err(|_| SlotError::FeedStopped),
                None => Err(SlotError::FeedStopped),
            }
        }
    }

    /// feed one event. returns whether it advanced the slot.
    pub fn observe(&self, event: SlotEvent) -> bool {
        let Some(slot) = self.signal.qualifying_slot(event) else {
            return false;
        };

        self.latest.store(slot, Ordering::Release);
        if let Some((tx, _)) = self.pending.lock().take() {
            let _ = tx.send(slot);
        }
        true
    }

    /// last qualifying slot, `None` before the first one.
    #[inline]
    pub fn latest(&self) -> Option<u64> {
        match self.latest.load(Ordering::Acquire) {
            0 => None,
            slot => Some(slot),
        }
    }

    /// fail every current and future waiter.
    pub fn close(&self) {
        let mut guard = self.pending.lock();
        self.closed.store(true, Ordering::Release);
        // dropping the sender cancels the shared receiver
        guard.take();
    }

    /// drive the tracker from the slot updates feed.
    ///
    /// returns only when the feed stopped producing usable slots; the caller
    /// is expected to shut the process down.
    pub async fn run_feed<N>(&self, source: &N, config: &Config) -> LiveError
    where
        N: NotificationSource,
    {
        let mut attempts = 0u32;
        let mut backoff = config.reconnect_backoff;

        loop {
            let err = match source.slot_updates().await {
                Ok(mut stream) => {
                    tracing::debug!("slot feed subscribed");
                    backoff = config.reconnect_backoff;

                    loop {
                        match stream.next().await {
                            Some(Ok(event)) => {
                                if self.observe(event) {
                                    attempts = 0;
                                    continue;
                                }
                                attempts += 1;
                                if attempts >= config.max_slot_attempts {
                                    tracing::error!(
                                        "max attempts for fetching slot type \"completed\" or \"firstShredReceived\" reached, exiting"
                                    );
                                    self.close();
                                    return LiveError::SlotFeedStarved { events: attempts };
                                }
                            }
                            Some(Err(e)) => break FeedError::from(e),
                            None => break FeedError::from(ping_pubsub::Error::ConnectionClosed),
                        }
                    }
                }
                Err(e) => FeedError::from(e),
            };

            attempts += 1;
            tracing::error!("slot feed error: {}", err);

            if attempts >= config.max_slot_attempts {
                tracing::error!("max attempts for slot feed reached, exiting");
                self.close();
                return LiveError::SlotFeed {
                    attempts,
                    last: err,
                };
            }

            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(config.max_reconnect_backoff);
        }
    }
}

impl SlotSource for SlotTracker {
    fn next(&self) -> impl Future<Output = Result<u64, SlotError>> + Send {
        self.next_slot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSource;
    use futures::poll;
    use std::sync::Arc;
    use std::time::Duration;

    fn first_shred(slot: u64) -> SlotEvent {
        SlotEvent::new(slot, SlotEventKind::FirstShredReceived)
    }

    #[test]
    fn test_signal_policy() {
        let both = SlotSignal::FirstShredOrCompleted;
        assert_eq!(both.qualifying_slot(first_shred(50)), Some(50));
        assert_eq!(
            both.qualifying_slot(SlotEvent::new(50, SlotEventKind::Completed)),
            Some(51)
        );
        assert_eq!(
            both.qualifying_slot(SlotEvent::new(50, SlotEventKind::Frozen)),
            None
        );

        let first_only = SlotSignal::FirstShredOnly;
        assert_eq!(
            first_only.qualifying_slot(SlotEvent::new(50, SlotEventKind::Completed)),
            None
        );
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_slot() {
        let tracker = SlotTracker::new(SlotSignal::FirstShredOrCompleted);
        let a = tracker.next_slot();
        let b = tracker.next_slot();

        assert!(tracker.observe(first_shred(50)));
        assert_eq!(a.await.unwrap(), 50);
        assert_eq!(b.await.unwrap(), 50);

        // resolution cleared the pending future
        let mut c = Box::pin(tracker.next_slot());
        assert!(poll!(c.as_mut()).is_pending());
        assert!(tracker.observe(first_shred(51)));
        assert_eq!(c.await.unwrap(), 51);
        assert_eq!(tracker.latest(), Some(51));
    }

    #[tokio::test]
    async fn test_ignored_event_keeps_future_pending() {
        let tracker = SlotTracker::new(SlotSignal::FirstShredOnly);
        let mut next = Box::pin(tracker.next_slot());

        assert!(!tracker.observe(SlotEvent::new(7, SlotEventKind::Completed)));
        assert!(poll!(next.as_mut()).is_pending());
        assert_eq!(tracker.latest(), None);
    }

    #[tokio::test]
    async fn test_close_fails_waiters() {
        let tracker = SlotTracker::new(SlotSignal::FirstShredOrCompleted);
        let waiting = tracker.next_slot();
        tracker.close();

        assert!(matches!(waiting.await, Err(SlotError::FeedStopped)));
        assert!(matches!(tracker.next_slot().await, Err(SlotError::FeedStopped)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_close_racing_waiters_never_hangs() {
        let tracker = Arc::new(SlotTracker::new(SlotSignal::FirstShredOrCompleted));
        let waiters: Vec<_> = (0..64)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                tokio::spawn(async move { tracker.next_slot().await })
            })
            .collect();
        tracker.close();

        for waiter in waiters {
            let result = tokio::time::timeout(Duration::from_secs(5), waiter)
                .await
                .expect("waiter hung after close")
                .unwrap();
            assert!(matches!(result, Err(SlotError::FeedStopped)));
        }
    }

    #[tokio::test]
    async fn test_starved_feed_is_fatal() {
        let source = FakeSource::new();
        let feed = source.push_slot_feed();
        feed.unbounded_send(Ok(first_shred(10))).unwrap();
        for slot in 10..20 {
            feed.unbounded_send(Ok(SlotEvent::new(slot, SlotEventKind::Frozen)))
                .unwrap();
        }

        let tracker = SlotTracker::new(SlotSignal::FirstShredOrCompleted);
        let config = Config::default().with_max_slot_attempts(10);
        let err = tracker.run_feed(&source, &config).await;

        assert!(matches!(err, LiveError::SlotFeedStarved { events: 10 }));
        assert_eq!(tracker.latest(), Some(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubscribes_until_budget_spent() {
        let source = FakeSource::new();
        source.push_slot_failure(ping_pubsub::Error::Timeout);
        let feed = source.push_slot_feed();
        feed.unbounded_send(Ok(first_shred(99))).unwrap();
        drop(feed);

        let tracker = SlotTracker::new(SlotSignal::FirstShredOrCompleted);
        let config = Config::default().with_max_slot_attempts(3);
        let err = tracker.run_feed(&source, &config).await;

        // failure, reset by slot 99, closed stream, then connect errors
        assert!(matches!(err, LiveError::SlotFeed { attempts: 3, .. }));
        assert_eq!(
            source.slot_subscribes.load(std::sync::atomic::Ordering::Relaxed),
            4
        );
        assert_eq!(tracker.latest(), Some(99));
    }
}
