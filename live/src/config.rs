//! configuration for the live caches.

use std::time::Duration;

/// slot events that advance the slot tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSignal {
    /// `firstShredReceived(s)` -> s.
    FirstShredOnly,
    /// `firstShredReceived(s)` -> s, `completed(s)` -> s + 1.
    FirstShredOrCompleted,
}

/// live state configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// epoch query + subscribe + first notification must finish within this.
    pub prime_timeout: Duration,
    /// consecutive anchor feed failures before giving up.
    pub max_anchor_attempts: u32,
    /// consecutive slot feed failures or useless events before giving up.
    pub max_slot_attempts: u32,
    /// blocks a blockhash stays valid for.
    pub validity_window: u64,
    /// which slot events count as progress.
    pub slot_signal: SlotSignal,
    /// first delay before resubscribing either feed, doubled per failure.
    pub reconnect_backoff: Duration,
    /// upper bound for the resubscribe delay.
    pub max_reconnect_backoff: Duration,
}

impl Config {
    /// set the maximum anchor feed attempts.
    pub fn with_max_anchor_attempts(mut self, attempts: u32) -> Self {
        self.max_anchor_attempts = attempts;
        self
    }

    /// set the maximum slot feed attempts.
    pub fn with_max_slot_attempts(mut self, attempts: u32) -> Self {
        self.max_slot_attempts = attempts;
        self
    }

    /// set the priming timeout.
    pub fn with_prime_timeout(mut self, timeout: Duration) -> Self {
        self.prime_timeout = timeout;
        self
    }

    /// set the blockhash validity window in blocks.
    pub fn with_validity_window(mut self, blocks: u64) -> Self {
        self.validity_window = blocks;
        self
    }

    /// set the slot signal policy.
    pub fn with_slot_signal(mut self, signal: SlotSignal) -> Self {
        self.slot_signal = signal;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prime_timeout: Duration::from_secs(5),
            max_anchor_attempts: 5,
            max_slot_attempts: 100,
            validity_window: 150,
            slot_signal: SlotSignal::FirstShredOrCompleted,
            reconnect_backoff: Duration::from_millis(100),
            max_reconnect_backoff: Duration::from_millis(5000),
        }
    }
}
