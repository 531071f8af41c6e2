//! websocket notification feeds for solana.
//!
//! every subscription runs on its own tokio task that owns the websocket
//! client and forwards typed notifications into a bounded channel. the
//! returned [`Subscription`] is a `Stream` of those notifications; dropping it
//! unsubscribes.
//!
//! # example
//!
//! ```no_run
//! use futures::StreamExt;
//! use ping_pubsub::PubsubSource;
//! use solana_commitment_config::CommitmentConfig;
//!
//! # async fn run() -> ping_pubsub::Result<()> {
//! let source = PubsubSource::new("ws://localhost:8900", CommitmentConfig::confirmed());
//! let mut slots = source.subscribe_slot_updates().await?;
//!
//! while let Some(event) = slots.next().await {
//!     let event = event?;
//!     println!("slot {} {}", event.slot, event.kind.as_str());
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod parser;
mod subscriber;
mod types;

// public exports
pub use error::{Error, Result};
pub use parser::parse_recent_blockhashes;
pub use subscriber::{NotificationSource, PubsubSource, Subscription, RECENT_BLOCKHASHES};
pub use types::{AnchorWindow, SignatureEvent, SlotEvent, SlotEventKind};
