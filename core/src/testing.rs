//! in-memory collaborators for probe tests.

use crate::config::PayloadConfig;
use crate::network::{ConfirmError, SendError, SignatureConfirmer, TransactionSender};
use crate::report::{ProbeResult, ReportError, Reporter};
use crate::transaction::TransactionTemplate;
use parking_lot::Mutex;
use ping_traits::{
    AnchorError, AnchorSource, ChainError, ChainQuery, LifetimeAnchor, SignatureStatus, SlotError,
    SlotSource,
};
use solana_sdk::hash::Hash;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::transaction::VersionedTransaction;
use std::collections::VecDeque;
use std::future::{ready, Future};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

pub fn payload() -> PayloadConfig {
    PayloadConfig {
        compute_unit_limit: 500,
        lamports: 5000,
        priority_fee: None,
    }
}

/// counts sends; optionally slow or rejecting every send.
#[derive(Default)]
pub struct FakeSender {
    calls: AtomicU32,
    completed: AtomicU32,
    latency: Option<Duration>,
    reject: bool,
}

impl FakeSender {
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn rejecting(mut self) -> Self {
        self.reject = true;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Acquire)
    }

    pub fn completed(&self) -> u32 {
        self.completed.load(Ordering::Acquire)
    }

    pub fn transaction() -> VersionedTransaction {
        TransactionTemplate::new(Keypair::new(), &payload())
            .sign(Hash::new_unique())
            .unwrap()
    }
}

impl TransactionSender for FakeSender {
    fn send(
        &self,
        transaction: &VersionedTransaction,
    ) -> impl Future<Output = Result<Signature, SendError>> + Send {
        self.calls.fetch_add(1, Ordering::AcqRel);
        let signature = transaction.signatures[0];
        async move {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            self.completed.fetch_add(1, Ordering::AcqRel);
            if self.reject {
                Err(SendError::BlockhashNotFound)
            } else {
                Ok(signature)
            }
        }
    }
}

/// scripted confirmation of one attempt.
#[derive(Debug, Clone)]
pub enum Confirmation {
    After(Duration),
    ExpireAfter(Duration),
    Transport,
    Never,
}

/// sender, confirmer and chain in one; confirmations and lookup failures
/// are replayed in order and the last one repeats.
pub struct FakeNetwork {
    pub sender: FakeSender,
    confirmations: Mutex<VecDeque<Confirmation>>,
    landed: Option<u64>,
    failed_lookups: Mutex<VecDeque<bool>>,
    pub confirmed: Mutex<Vec<Signature>>,
}

impl FakeNetwork {
    pub fn new(sender: FakeSender, confirmations: &[Confirmation], landed: Option<u64>) -> Self {
        Self {
            sender,
            confirmations: Mutex::new(confirmations.iter().cloned().collect()),
            landed,
            failed_lookups: Mutex::new(VecDeque::new()),
            confirmed: Mutex::new(Vec::new()),
        }
    }

    /// script which `landed_slot` calls fail with an rpc error.
    pub fn with_failed_lookups(self, failed: &[bool]) -> Self {
        *self.failed_lookups.lock() = failed.iter().copied().collect();
        self
    }

    fn next_confirmation(&self) -> Confirmation {
        let mut confirmations = self.confirmations.lock();
        if confirmations.len() > 1 {
            confirmations.pop_front().unwrap_or(Confirmation::Never)
        } else {
            confirmations.front().cloned().unwrap_or(Confirmation::Never)
        }
    }

    fn next_lookup_fails(&self) -> bool {
        let mut failed = self.failed_lookups.lock();
        if failed.len() > 1 {
            failed.pop_front().unwrap_or(false)
        } else {
            failed.front().copied().unwrap_or(false)
        }
    }
}

impl TransactionSender for FakeNetwork {
    fn send(
        &self,
        transaction: &VersionedTransaction,
    ) -> impl Future<Output = Result<Signature, SendError>> + Send {
        self.sender.send(transaction)
    }
}

impl SignatureConfirmer for FakeNetwork {
    fn confirm(
        &self,
        signature: Signature,
        expiry_height: u64,
    ) -> impl Future<Output = Result<(), ConfirmError>> + Send {
        let confirmation = self.next_confirmation();
        async move {
            match confirmation {
                Confirmation::After(delay) => {
                    tokio::time::sleep(delay).await;
                    self.confirmed.lock().push(signature);
                    Ok(())
                }
                Confirmation::ExpireAfter(delay) => {
                    tokio::time::sleep(delay).await;
                    Err(ConfirmError::Expired {
                        block_height: expiry_height + 1,
                        expiry_height,
                    })
                }
                Confirmation::Transport => Err(ConfirmError::Transport("socket closed".into())),
                Confirmation::Never => std::future::pending().await,
            }
        }
    }
}

impl ChainQuery for FakeNetwork {
    fn slot_and_block_height(&self) -> impl Future<Output = Result<(u64, u64), ChainError>> + Send {
        ready(Ok((0, 0)))
    }

    fn block_height(&self) -> impl Future<Output = Result<u64, ChainError>> + Send {
        ready(Ok(0))
    }

    fn signature_status(
        &self,
        _signature: &Signature,
    ) -> impl Future<Output = Result<Option<SignatureStatus>, ChainError>> + Send {
        ready(Ok(None))
    }

    fn landed_slot(
        &self,
        _signature: &Signature,
    ) -> impl Future<Output = Result<Option<u64>, ChainError>> + Send {
        ready(if self.next_lookup_fails() {
            Err(ChainError::Rpc("node unavailable".into()))
        } else {
            Ok(self.landed)
        })
    }
}

/// fresh anchor per call until `limit` is reached.
pub struct FakeAnchors {
    issued: AtomicU32,
    limit: u32,
}

impl FakeAnchors {
    pub fn new(limit: u32) -> Self {
        Self {
            issued: AtomicU32::new(0),
            limit,
        }
    }
}

impl AnchorSource for FakeAnchors {
    fn acquire(&self) -> impl Future<Output = Result<LifetimeAnchor, AnchorError>> + Send {
        let issued = self.issued.fetch_add(1, Ordering::AcqRel);
        ready(if issued < self.limit {
            Ok(LifetimeAnchor::new(Hash::new_unique(), 1_000))
        } else {
            Err(AnchorError::Exhausted(self.limit as usize))
        })
    }
}

/// slots counting up from `start`, one per call.
pub struct FakeSlots {
    next: AtomicU64,
}

impl FakeSlots {
    pub fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl SlotSource for FakeSlots {
    fn next(&self) -> impl Future<Output = Result<u64, SlotError>> + Send {
        ready(Ok(self.next.fetch_add(1, Ordering::AcqRel)))
    }
}

/// collects results, failing every report when `fail` is set.
#[derive(Default)]
pub struct FakeReporter {
    pub results: Mutex<Vec<ProbeResult>>,
    pub fail: bool,
}

impl Reporter for FakeReporter {
    fn report(&self, result: &ProbeResult) -> impl Future<Output = Result<(), ReportError>> + Send {
        self.results.lock().push(result.clone());
        ready(if self.fail {
            Err(ReportError::Status {
                status: 503,
                body: "unavailable".into(),
            })
        } else {
            Ok(())
        })
    }
}
