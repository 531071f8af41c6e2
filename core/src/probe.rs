//! probe loop.
//!
//! one attempt at a time: sign against a fresh blockhash, send and resend
//! until the confirmation race decides, verify where the transaction landed,
//! report. abandoned attempts are not reported; expired ones are reported as
//! failures under a placeholder signature.

use crate::config::{Config, ProbeConfig};
use crate::network::{ConfirmError, SendError, SignatureConfirmer, TransactionSender};
use crate::report::{ProbeResult, ReportError, Reporter, EXPIRED_SIGNATURE};
use crate::resend::ResendState;
use crate::transaction::TransactionTemplate;
use ping_traits::{AnchorError, AnchorSource, ChainError, ChainQuery, SlotError, SlotSource};
use solana_sdk::signature::Signature;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// per-attempt record, dropped once the attempt is reported or abandoned.
#[derive(Debug, Clone)]
pub struct ProbeAttempt {
    pub signature: Signature,
    pub sent_at: Instant,
    pub slot_sent: u64,
    pub slot_landed: Option<u64>,
    /// confirmed (`true`) or expired (`false`).
    pub landed: bool,
    /// first send to confirmation or expiry.
    pub elapsed: Duration,
}

/// why an attempt ended without a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Abandoned {
    /// the node did not know the blockhash.
    BlockhashRejected,
    /// confirmed, but the lookup after the settle delay found nothing.
    NotFound,
    /// landing slot before the send slot.
    LandedBeforeSent { slot_sent: u64, slot_landed: u64 },
    /// signing or confirmation failed for another reason.
    Other(String),
}

/// result of one iteration.
#[derive(Debug)]
pub enum Outcome {
    Reported(ProbeResult),
    /// the result was built but the reporter refused it.
    ReportFailed(ProbeResult, ReportError),
    Abandoned(Abandoned),
}

/// sequential probe driver.
pub struct ProbeLoop<A, S, N, R> {
    anchors: A,
    slots: S,
    network: Arc<N>,
    reporter: R,
    template: TransactionTemplate,
    config: ProbeConfig,
    commitment_level: String,
    application: String,
}

impl<A, S, N, R> ProbeLoop<A, S, N, R>
where
    A: AnchorSource,
    S: SlotSource,
    N: TransactionSender + SignatureConfirmer + ChainQuery + 'static,
    R: Reporter,
{
    pub fn new(
        anchors: A,
        slots: S,
        network: Arc<N>,
        reporter: R,
        template: TransactionTemplate,
        config: &Config,
    ) -> Self {
        Self {
            anchors,
            slots,
            network,
            reporter,
            template,
            config: config.probe.clone(),
            commitment_level: config.rpc.commitment.commitment.to_string(),
            application: config.report.application.clone(),
        }
    }

    /// probe until a fatal error; returns it.
    pub async fn run(&self) -> ProbeError {
        let mut failures = 0u32;

        loop {
            tokio::time::sleep(self.config.loop_delay).await;

            match self.run_once().await {
                Ok(Outcome::Reported(_)) => failures = 0,
                Ok(Outcome::ReportFailed(result, e)) => {
                    tracing::warn!("report for {} failed: {}", result.signature, e);
                }
                Ok(Outcome::Abandoned(_)) => {}
                Err(e) if e.is_fatal() => {
                    tracing::error!("probe stopped: {}", e);
                    return e;
                }
                Err(e) => {
                    failures += 1;
                    tracing::error!(
                        "probe failed ({}/{}): {}",
                        failures,
                        self.config.max_failures,
                        e
                    );
                    if failures >= self.config.max_failures {
                        return ProbeError::TooManyFailures {
                            failures,
                            last: Box::new(e),
                        };
                    }
                }
            }
        }
    }

    /// one attempt from blockhash to report.
    pub async fn run_once(&self) -> Result<Outcome, ProbeError> {
        let anchor = self.anchors.acquire().await?;
        let transaction = match self.template.sign(anchor.value) {
            Ok(transaction) => transaction,
            Err(e) => {
                tracing::error!("build failed: {}", e);
                return Ok(Outcome::Abandoned(Abandoned::Other(e.to_string())));
            }
        };
        let signature = transaction.signatures[0];
        let slot_sent = self.slots.next().await?;

        tracing::info!("sending {}", signature);
        let sent_at = Instant::now();
        let mut resend = ResendState::start(
            Arc::clone(&self.network),
            transaction,
            self.config.resend_interval,
        );

        let confirmed = tokio::select! {
            result = self.network.confirm(signature, anchor.expiry_height) => result,
            SendError::BlockhashNotFound = resend.rejected() => Err(ConfirmError::BlockhashNotFound),
        };
        let elapsed = sent_at.elapsed();
        tracing::debug!("{} settled after {} sends", signature, resend.sends());
        drop(resend);

        let mut attempt = ProbeAttempt {
            signature,
            sent_at,
            slot_sent,
            slot_landed: None,
            landed: true,
            elapsed,
        };

        match confirmed {
            Ok(()) => tracing::info!("confirmed {}", signature),
            Err(ConfirmError::BlockhashNotFound) => {
                tracing::warn!("{} blockhash not found", signature);
                return Ok(Outcome::Abandoned(Abandoned::BlockhashRejected));
            }
            Err(e @ ConfirmError::Expired { .. }) => {
                tracing::warn!("{} {}, reporting failure", signature, e);
                attempt.landed = false;
            }
            Err(e) => {
                tracing::error!("{} {}, not reporting", signature, e);
                return Ok(Outcome::Abandoned(Abandoned::Other(e.to_string())));
            }
        }

        tokio::time::sleep(self.config.settle_delay).await;

        let slot_landed = if attempt.landed {
            match self.network.landed_slot(&signature).await? {
                Some(slot) => slot,
                None => {
                    tracing::warn!(
                        "{} not found within {} ms, not reporting",
                        signature,
                        self.config.settle_delay.as_millis()
                    );
                    return Ok(Outcome::Abandoned(Abandoned::NotFound));
                }
            }
        } else {
            self.slots.next().await?
        };
        attempt.slot_landed = Some(slot_landed);

        if slot_landed < slot_sent {
            tracing::warn!(
                "{} slot {} < {}, not reporting",
                signature,
                slot_landed,
                slot_sent
            );
            return Ok(Outcome::Abandoned(Abandoned::LandedBeforeSent {
                slot_sent,
                slot_landed,
            }));
        }

        let result = self.result(&attempt, slot_landed);
        tracing::debug!(
            "{}",
            serde_json::to_string(&result).unwrap_or_else(|e| e.to_string())
        );

        match self.reporter.report(&result).await {
            Ok(()) => Ok(Outcome::Reported(result)),
            Err(e) => Ok(Outcome::ReportFailed(result, e)),
        }
    }

    fn result(&self, attempt: &ProbeAttempt, slot_landed: u64) -> ProbeResult {
        let signature = if attempt.landed {
            attempt.signature.to_string()
        } else {
            EXPIRED_SIGNATURE.to_string()
        };

        ProbeResult {
            time: attempt.elapsed.as_millis() as u64,
            signature,
            transaction_type: "transfer".to_string(),
            success: attempt.landed,
            application: self.application.clone(),
            commitment_level: self.commitment_level.clone(),
            slot_sent: attempt.slot_sent,
            slot_landed,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("blockhash cache: {0}")]
    Anchor(#[from] AnchorError),
    #[error("slot tracker: {0}")]
    Slot(#[from] SlotError),
    #[error("landing lookup: {0}")]
    Chain(#[from] ChainError),
    #[error("{failures} consecutive failures, last: {last}")]
    TooManyFailures {
        failures: u32,
        #[source]
        last: Box<ProbeError>,
    },
}

impl ProbeError {
    /// errors that end the loop without counting toward the failure budget.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProbeError::Anchor(_) | ProbeError::Slot(_) | ProbeError::TooManyFailures { .. }
        )
    }
}
