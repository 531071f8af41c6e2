//! live network state for the probe.
//!
//! keeps two fast-moving facts fresh from websocket feeds:
//!
//! - **AnchorCache**: the recent blockhash window with expiry heights, never
//!   handing out the same blockhash twice
//! - **SlotTracker**: the next slot signal as a shared one-shot future
//! - **LiveState**: owns both caches and runs their feeds as background tasks
//!
//! # usage
//!
//! ```no_run
//! use ping_live::{Config, LiveState};
//! use ping_pubsub::PubsubSource;
//! # use ping_traits::ChainQuery;
//! # use std::sync::Arc;
//!
//! # async fn run<Q: ChainQuery + 'static>(chain: Arc<Q>) {
//! let source = Arc::new(PubsubSource::new(
//!     "ws://localhost:8900",
//!     solana_sdk::commitment_config::CommitmentConfig::confirmed(),
//! ));
//! let mut live = LiveState::new(Config::default());
//! live.start(source, chain).expect("not running yet");
//!
//! let anchor = live.anchors().acquire().await.expect("fresh blockhash");
//! let slot = live.slots().next_slot().await.expect("slot feed alive");
//! println!("{} valid until {} (slot {})", anchor.value, anchor.expiry_height, slot);
//! # }
//! ```

pub mod anchor_cache;
pub mod config;
pub mod error;
pub mod slot_tracker;
pub mod tracker;

#[cfg(test)]
mod testing;

pub use anchor_cache::{expiry_height, AnchorCache};
pub use config::{Config, SlotSignal};
pub use error::{FeedError, LiveError};
pub use slot_tracker::SlotTracker;
pub use tracker::LiveState;
