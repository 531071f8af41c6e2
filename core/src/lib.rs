//! ping thing: solana liveness prober.
//!
//! thin orchestration layer that wires together:
//! - **ping_live**: blockhash cache and slot tracker fed by websocket feeds
//! - **probe**: send/resend/confirm loop measuring confirmation latency
//! - **report**: posts each result to the collector
//!
//! # architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │  anchor feed    │     │   slot feed     │
//! │  (tokio task)   │     │  (tokio task)   │
//! └────────┬────────┘     └────────┬────────┘
//!          ▼                       ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │ Arc<AnchorCache>│     │ Arc<SlotTracker>│
//! └────────┬────────┘     └────────┬────────┘
//!          └───────────┬───────────┘
//!                      ▼
//!             ┌─────────────────┐     ┌─────────────────┐
//!             │    ProbeLoop    │────▶│    Reporter     │
//!             │ resend + confirm│     │  (http or log)  │
//!             └─────────────────┘     └─────────────────┘
//! ```

pub mod config;
pub mod confirm;
pub mod network;
pub mod probe;
pub mod report;
pub mod resend;
pub mod rpc;
pub mod transaction;

#[cfg(test)]
mod testing;

pub use config::{Config, ConfigError, PayloadConfig, ProbeConfig, ReportConfig, RpcConfig};
pub use network::{ConfirmError, SendError, SignatureConfirmer, TransactionSender};
pub use probe::{Abandoned, Outcome, ProbeAttempt, ProbeError, ProbeLoop};
pub use report::{ProbeResult, ReportError, ReportSink, Reporter, EXPIRED_SIGNATURE};
pub use rpc::{RpcChain, RpcNetwork};
pub use transaction::{keypair_from_base58, TransactionTemplate};
