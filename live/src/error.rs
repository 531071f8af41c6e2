use ping_traits::ChainError;

/// failure of one subscribe/prime/follow round of a feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error(transparent)]
    Pubsub(#[from] ping_pubsub::Error),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("feed timed out")]
    Timeout,
}

impl FeedError {
    #[inline]
    pub fn is_timeout(&self) -> bool {
        match self {
            FeedError::Timeout => true,
            FeedError::Pubsub(e) => e.is_timeout(),
            FeedError::Chain(_) => false,
        }
    }
}

/// errors that end the live state. every variant is fatal for the process.
#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    #[error("blockhash feed gave up after {attempts} attempts: {last}")]
    AnchorFeed {
        attempts: u32,
        #[source]
        last: FeedError,
    },
    #[error("slot feed gave up after {attempts} attempts: {last}")]
    SlotFeed {
        attempts: u32,
        #[source]
        last: FeedError,
    },
    #[error("slot feed delivered {events} events without a usable slot")]
    SlotFeedStarved { events: u32 },
    #[error("live state already running")]
    AlreadyRunning,
    #[error("live state not started")]
    NotStarted,
    #[error("feed task failed: {0}")]
    Task(String),
}
