//! live state coordinator - owns the caches and their feed tasks.

use crate::anchor_cache::AnchorCache;
use crate::config::Config;
use crate::error::LiveError;
use crate::slot_tracker::SlotTracker;
use ping_pubsub::NotificationSource;
use ping_traits::ChainQuery;
use std::sync::Arc;
use tokio::task::JoinHandle;

struct FeedTasks {
    anchor_feed: JoinHandle<LiveError>,
    slot_feed: JoinHandle<LiveError>,
}

/// blockhash cache and slot tracker, kept fresh by two background feeds.
pub struct LiveState {
    config: Config,
    anchors: Arc<AnchorCache>,
    slots: Arc<SlotTracker>,
    tasks: Option<FeedTasks>,
}

impl LiveState {
    pub fn new(config: Config) -> Self {
        Self {
            anchors: Arc::new(AnchorCache::new()),
            slots: Arc::new(SlotTracker::new(config.slot_signal)),
            config,
            tasks: None,
        }
    }

    /// blockhash cache handle.
    #[inline]
    pub fn anchors(&self) -> Arc<AnchorCache> {
        Arc::clone(&self.anchors)
    }

    /// slot tracker handle.
    #[inline]
    pub fn slots(&self) -> Arc<SlotTracker> {
        Arc::clone(&self.slots)
    }

    /// spawn both feeds. they run until the process exits or they give up.
    pub fn start<N, Q>(&mut self, source: Arc<N>, chain: Arc<Q>) -> Result<(), LiveError>
    where
        N: NotificationSource + 'static,
        Q: ChainQuery + 'static,
    {
        if self.tasks.is_some() {
            return Err(LiveError::AlreadyRunning);
        }

        let anchor_feed = {
            let anchors = Arc::clone(&self.anchors);
            let source = Arc::clone(&source);
            let config = self.config.clone();
            tokio::spawn(async move { anchors.run_feed(&*source, &*chain, &config).await })
        };

        let slot_feed = {
            let slots = Arc::clone(&self.slots);
            let config = self.config.clone();
            tokio::spawn(async move { slots.run_feed(&*source, &config).await })
        };

        self.tasks = Some(FeedTasks {
            anchor_feed,
            slot_feed,
        });

        tracing::debug!("live feeds started");
        Ok(())
    }

    /// wait until either feed gives up and return why.
    pub async fn stopped(&mut self) -> LiveError {
        let Some(tasks) = self.tasks.as_mut() else {
            return LiveError::NotStarted;
        };

        let result = tokio::select! {
            result = &mut tasks.anchor_feed => result,
            result = &mut tasks.slot_feed => result,
        };

        self.stop();
        result.unwrap_or_else(|e| LiveError::Task(e.to_string()))
    }

    /// abort both feeds.
    pub fn stop(&mut self) {
        if let Some(tasks) = self.tasks.take() {
            tasks.anchor_feed.abort();
            tasks.slot_feed.abort();
            self.slots.close();
            tracing::debug!("live feeds stopped");
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.tasks.is_some()
    }
}

impl Drop for LiveState {
    fn drop(&mut self) {
        self.stop();
    }
}
