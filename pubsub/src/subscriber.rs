use crate::error::{Error, Result};
use crate::parser::{parse_recent_blockhashes, signature_event, slot_event};
use crate::types::{AnchorWindow, SignatureEvent, SlotEvent};
use futures::{Stream, StreamExt};
use solana_account_decoder::{UiAccount, UiAccountEncoding};
use solana_client::nonblocking::pubsub_client::PubsubClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcSignatureSubscribeConfig};
use solana_client::rpc_response::Response;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// recent blockhashes sysvar, the canonical registry of valid blockhashes.
pub const RECENT_BLOCKHASHES: Pubkey =
    solana_sdk::pubkey!("SysvarRecentB1ockHashes11111111111111111111");

// notifications buffered per subscription before the reader task waits
const CHANNEL_CAPACITY: usize = 64;

/// push feeds the live caches are built on.
pub trait NotificationSource: Send + Sync {
    type Anchors: Stream<Item = Result<AnchorWindow>> + Send + Unpin + 'static;
    type Slots: Stream<Item = Result<SlotEvent>> + Send + Unpin + 'static;

    /// account notifications of the recent blockhashes sysvar.
    fn recent_anchors(&self) -> impl Future<Output = Result<Self::Anchors>> + Send;

    /// `slotsUpdatesSubscribe` notifications.
    fn slot_updates(&self) -> impl Future<Output = Result<Self::Slots>> + Send;
}

/// live subscription handle.
///
/// notifications are read by a dedicated task that owns the websocket
/// client. dropping the handle unsubscribes and closes the connection.
pub struct Subscription<T> {
    rx: mpsc::Receiver<Result<T>>,
    cancel: CancellationToken,
}

impl<T> Subscription<T> {
    /// stop the subscription, same as dropping it.
    pub fn unsubscribe(self) {}
}

impl<T> Stream for Subscription<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// reader task side of a subscription
struct Link<T> {
    ready: oneshot::Sender<Result<()>>,
    tx: mpsc::Sender<Result<T>>,
    cancel: CancellationToken,
}

impl<T> Link<T> {
    // report the subscribe outcome, then pump notifications until the
    // handle is dropped or the server ends the stream
    async fn forward<M, E, S, U, F>(
        self,
        subscribed: std::result::Result<(S, U), E>,
        map: impl Fn(M) -> Result<T>,
    ) where
        E: Display,
        S: Stream<Item = M> + Unpin,
        U: FnOnce() -> F,
        F: Future<Output = ()>,
    {
        let Link { ready, tx, cancel } = self;

        let (mut stream, unsubscribe) = match subscribed {
            Ok(pair) => pair,
            Err(e) => {
                let _ = ready.send(Err(Error::Subscribe(e.to_string())));
                return;
            }
        };
        let _ = ready.send(Ok(()));

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                item = stream.next() => match item {
                    Some(message) => {
                        if tx.send(map(message)).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        let _ = tx.send(Err(Error::ConnectionClosed)).await;
                        break;
                    }
                },
            }
        }

        unsubscribe().await;
    }
}

/// websocket subscriber. every subscription gets its own connection so one
/// feed failing never takes the others down with it.
#[derive(Debug, Clone)]
pub struct PubsubSource {
    ws_url: String,
    commitment: CommitmentConfig,
    connect_timeout: Duration,
}

impl PubsubSource {
    pub fn new(ws_url: impl Into<String>, commitment: CommitmentConfig) -> Self {
        Self {
            ws_url: ws_url.into(),
            commitment,
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// set the connect + subscribe timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[inline]
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    #[inline]
    pub fn commitment(&self) -> CommitmentConfig {
        self.commitment
    }

    /// subscribe to the recent blockhashes sysvar.
    pub async fn subscribe_recent_anchors(&self) -> Result<Subscription<AnchorWindow>> {
        let config = RpcAccountInfoConfig {
            encoding: Some(UiAccountEncoding::JsonParsed),
            commitment: Some(self.commitment),
            ..RpcAccountInfoConfig::default()
        };

        self.open(move |client, link| async move {
            let subscribed = client.account_subscribe(&RECENT_BLOCKHASHES, Some(config)).await;
            link.forward(subscribed, |notification: Response<UiAccount>| {
                let account = serde_json::to_value(&notification.value)
                    .map_err(|e| Error::InvalidNotification(e.to_string()))?;
                parse_recent_blockhashes(notification.context.slot, &account)
            })
            .await;
            let _ = client.shutdown().await;
        })
        .await
    }

    /// subscribe to slot updates.
    pub async fn subscribe_slot_updates(&self) -> Result<Subscription<SlotEvent>> {
        self.open(|client, link| async move {
            let subscribed = client.slot_updates_subscribe().await;
            link.forward(subscribed, |update| Ok(slot_event(update))).await;
            let _ = client.shutdown().await;
        })
        .await
    }

    /// subscribe to status changes of one signature. returns once the node
    /// acknowledged the subscription, so a status check made afterwards
    /// cannot miss the notification.
    pub async fn subscribe_signature(
        &self,
        signature: Signature,
    ) -> Result<Subscription<SignatureEvent>> {
        let config = RpcSignatureSubscribeConfig {
            commitment: Some(self.commitment),
            enable_received_notification: Some(false),
        };

        self.open(move |client, link| async move {
            let subscribed = client.signature_subscribe(&signature, Some(config)).await;
            link.forward(subscribed, |notification| Ok(signature_event(notification)))
                .await;
            let _ = client.shutdown().await;
        })
        .await
    }

    // connect on a dedicated task and wait until `run` reports the
    // subscription as established
    async fn open<T, F, Fut>(&self, run: F) -> Result<Subscription<T>>
    where
        T: Send + 'static,
        F: FnOnce(PubsubClient, Link<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();
        let cancel = CancellationToken::new();

        let link = Link {
            ready: ready_tx,
            tx,
            cancel: cancel.clone(),
        };
        let ws_url = self.ws_url.clone();

        tokio::spawn(async move {
            match PubsubClient::new(&ws_url).await {
                Ok(client) => run(client, link).await,
                Err(e) => {
                    let _ = link.ready.send(Err(Error::Connect(e.to_string())));
                }
            }
        });

        // dropping the handle on any error path stops the task
        let subscription = Subscription { rx, cancel };

        match tokio::time::timeout(self.connect_timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => {
                tracing::debug!("subscribed via {}", self.ws_url);
                Ok(subscription)
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => Err(Error::Timeout),
        }
    }
}

impl NotificationSource for PubsubSource {
    type Anchors = Subscription<AnchorWindow>;
    type Slots = Subscription<SlotEvent>;

    fn recent_anchors(&self) -> impl Future<Output = Result<Self::Anchors>> + Send {
        self.subscribe_recent_anchors()
    }

    fn slot_updates(&self) -> impl Future<Output = Result<Self::Slots>> + Send {
        self.subscribe_slot_updates()
    }
}
