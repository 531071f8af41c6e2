//! resend worker for one probe attempt.
//!
//! sends immediately, then cancels the outstanding send and reissues the same
//! transaction every interval until the attempt ends. dropping the state
//! cancels the worker and every send still in flight.

use crate::network::{SendError, TransactionSender};
use solana_sdk::transaction::VersionedTransaction;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// in-flight sends of one attempt.
pub struct ResendState {
    cancel: CancellationToken,
    sends: Arc<AtomicU32>,
    rejected: mpsc::Receiver<SendError>,
    worker: JoinHandle<()>,
}

impl ResendState {
    /// start sending `transaction` every `interval`, first send right away.
    pub fn start<T>(sender: Arc<T>, transaction: VersionedTransaction, interval: Duration) -> Self
    where
        T: TransactionSender + 'static,
    {
        let cancel = CancellationToken::new();
        let sends = Arc::new(AtomicU32::new(0));
        let (rejected_tx, rejected) = mpsc::channel(1);

        let worker = tokio::spawn(resend_loop(
            sender,
            Arc::new(transaction),
            interval,
            cancel.clone(),
            Arc::clone(&sends),
            rejected_tx,
        ));

        Self {
            cancel,
            sends,
            rejected,
            worker,
        }
    }

    /// sends issued so far.
    #[inline]
    pub fn sends(&self) -> u32 {
        self.sends.load(Ordering::Acquire)
    }

    /// resolves when a send reports the blockhash as unknown. pending forever
    /// otherwise.
    pub async fn rejected(&mut self) -> SendError {
        match self.rejected.recv().await {
            Some(err) => err,
            None => std::future::pending::<SendError>().await,
        }
    }

    /// cancel the worker and every send in flight.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ResendState {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.worker.abort();
    }
}

async fn resend_loop<T>(
    sender: Arc<T>,
    transaction: Arc<VersionedTransaction>,
    interval: Duration,
    cancel: CancellationToken,
    sends: Arc<AtomicU32>,
    rejected: mpsc::Sender<SendError>,
) where
    T: TransactionSender + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Some(send) = in_flight.take() {
                    send.abort();
                }

                let previous = sends.fetch_add(1, Ordering::AcqRel);
                if previous > 0 {
                    tracing::info!(
                        "not confirmed after {} ms, resending",
                        interval.as_millis() * previous as u128
                    );
                }

                in_flight = Some(tokio::spawn(send_once(
                    Arc::clone(&sender),
                    Arc::clone(&transaction),
                    cancel.child_token(),
                    rejected.clone(),
                )));
            }
        }
    }

    if let Some(send) = in_flight.take() {
        send.abort();
    }
}

async fn send_once<T>(
    sender: Arc<T>,
    transaction: Arc<VersionedTransaction>,
    cancel: CancellationToken,
    rejected: mpsc::Sender<SendError>,
) where
    T: TransactionSender + 'static,
{
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = sender.send(&transaction) => result,
    };

    match result {
        Ok(signature) => tracing::debug!("sent {}", signature),
        Err(SendError::BlockhashNotFound) => {
            let _ = rejected.try_send(SendError::BlockhashNotFound);
        }
        Err(e) => tracing::warn!("{}", e),
    }
}
