//! Reliable clients: blocking publishers and acknowledging subscribers.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use repub_core::channels::{self, ChannelSuffix};
use repub_core::notices;
use repub_transport::{Delivery, MessageHandler, SubscriptionId, Transport};

use crate::error::ClientError;
use crate::signal::AckSignal;

/// Per-call record for one in-flight blocking publish.
///
/// Owns the dynamic NAK/ACK subscriptions armed for the call. Normal
/// completion goes through [`teardown`](Self::teardown); if the record is
/// dropped instead — the publish future was cancelled mid-wait — a detached
/// cleanup task removes the subscriptions so they cannot outlive the call.
struct PendingPublish<T: Transport> {
    transport: Arc<T>,
    base: String,
    nak_channel: String,
    ack_channel: String,
    nak_sub: SubscriptionId,
    ack_sub: SubscriptionId,
    signal: AckSignal,
    torn_down: bool,
}

impl<T: Transport> PendingPublish<T> {
    /// Remove both dynamic subscriptions. Runs on every completion path,
    /// however many retransmissions occurred.
    async fn teardown(mut self) {
        self.torn_down = true;
        if let Err(e) = self.transport.unsubscribe(&self.nak_channel, self.nak_sub).await {
            warn!(base = %self.base, "failed to remove NAK subscription: {e}");
        }
        if let Err(e) = self.transport.unsubscribe(&self.ack_channel, self.ack_sub).await {
            warn!(base = %self.base, "failed to remove ACK subscription: {e}");
        }
    }
}

impl<T: Transport> Drop for PendingPublish<T> {
    fn drop(&mut self) {
        if self.torn_down {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let transport = Arc::clone(&self.transport);
                let nak_channel = std::mem::take(&mut self.nak_channel);
                let ack_channel = std::mem::take(&mut self.ack_channel);
                let (nak_sub, ack_sub) = (self.nak_sub, self.ack_sub);
                handle.spawn(async move {
                    let _ = transport.unsubscribe(&nak_channel, nak_sub).await;
                    let _ = transport.unsubscribe(&ack_channel, ack_sub).await;
                });
            }
            Err(_) => {
                warn!(base = %self.base, "publish record dropped outside a runtime; subscriptions leak");
            }
        }
    }
}

/// A protocol participant that publishes with blocking acknowledgment and
/// subscribes with per-delivery peer acknowledgment.
///
/// One client may run any number of concurrent publish calls; each gets its
/// own [`PendingPublish`] record and its own pair of dynamic subscriptions.
pub struct ReliableClient<T: Transport> {
    id: String,
    transport: Arc<T>,
}

impl<T: Transport> ReliableClient<T> {
    pub fn new(id: impl Into<String>, transport: Arc<T>) -> Self {
        Self {
            id: id.into(),
            transport,
        }
    }

    /// This client's identifier, used in peer-ack notices and logs.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Publish `payload` on `base` and block until the repository
    /// acknowledges one of the delivery attempts.
    ///
    /// Rejections are absorbed: every NAK triggers exactly one retransmission
    /// and the wait stays armed. There is **no timeout** — a permanently
    /// faulty repository stalls the caller forever; use
    /// [`publish_with_deadline`](Self::publish_with_deadline) to opt into one.
    ///
    /// Limitation: ACK/NAK delivery is channel-scoped, not message-scoped.
    /// Two concurrent `publish` calls on the same base channel from the same
    /// client each observe every ACK on that channel, so either call may
    /// complete on the other's acknowledgment.
    pub async fn publish(&self, base: &str, payload: &[u8]) -> Result<(), ClientError> {
        self.publish_with_deadline(base, payload, None).await
    }

    /// [`publish`](Self::publish) with an opt-in deadline.
    ///
    /// `None` preserves the unbounded wait of the base protocol. `Some`
    /// surfaces [`ClientError::DeliveryTimedOut`] — a distinct condition from
    /// rejection, which is never caller-visible.
    pub async fn publish_with_deadline(
        &self,
        base: &str,
        payload: &[u8],
        deadline: Option<Duration>,
    ) -> Result<(), ClientError> {
        let pending = self.arm(base, payload).await?;
        let order_channel = channels::derive(base, ChannelSuffix::Order);

        let outcome = match self.transport.publish(&order_channel, payload).await {
            Ok(()) => match deadline {
                None => {
                    pending.signal.wait().await;
                    Ok(())
                }
                Some(limit) => match tokio::time::timeout(limit, pending.signal.wait()).await {
                    Ok(()) => Ok(()),
                    Err(_) => Err(ClientError::DeliveryTimedOut {
                        channel: base.to_string(),
                        after: limit,
                    }),
                },
            },
            Err(e) => Err(e.into()),
        };

        pending.teardown().await;
        if outcome.is_ok() {
            info!(client_id = %self.id, base, "publish confirmed");
        }
        outcome
    }

    /// Arm the per-call NAK/ACK subscriptions for one publish.
    async fn arm(&self, base: &str, payload: &[u8]) -> Result<PendingPublish<T>, ClientError> {
        let signal = AckSignal::new();
        let nak_channel = channels::derive(base, ChannelSuffix::RepoNak);
        let ack_channel = channels::derive(base, ChannelSuffix::RepoAck);

        // On NAK: one plain re-send on the retransmit channel. The waiter
        // stays armed; the retransmit re-enters the repository with a fresh
        // fault draw.
        let nak_handler: MessageHandler = {
            let transport = Arc::clone(&self.transport);
            let retransmit_channel = channels::derive(base, ChannelSuffix::Retransmit);
            let payload = payload.to_vec();
            let client_id = self.id.clone();
            let base = base.to_string();
            Arc::new(move |_delivery: Delivery| {
                debug!(client_id = %client_id, base = %base, "NAK received, retransmitting");
                let transport = Arc::clone(&transport);
                let retransmit_channel = retransmit_channel.clone();
                let payload = payload.clone();
                Box::pin(async move { transport.publish(&retransmit_channel, &payload).await })
            })
        };
        let nak_sub = self.transport.subscribe(&nak_channel, nak_handler).await?;

        let ack_handler: MessageHandler = {
            let signal = signal.clone();
            let client_id = self.id.clone();
            Arc::new(move |delivery: Delivery| {
                if signal.fire() {
                    debug!(client_id = %client_id, channel = %delivery.channel, "ACK received from repository");
                }
                Box::pin(async { Ok(()) })
            })
        };
        let ack_sub = match self.transport.subscribe(&ack_channel, ack_handler).await {
            Ok(id) => id,
            Err(e) => {
                if let Err(cleanup) = self.transport.unsubscribe(&nak_channel, nak_sub).await {
                    warn!(base, "failed to remove NAK subscription: {cleanup}");
                }
                return Err(e.into());
            }
        };

        Ok(PendingPublish {
            transport: Arc::clone(&self.transport),
            base: base.to_string(),
            nak_channel,
            ack_channel,
            nak_sub,
            ack_sub,
            signal,
            torn_down: false,
        })
    }

    /// Subscribe to `base`'s archived feed.
    ///
    /// Every delivery is handed to `consumer` and then peer-acknowledged
    /// toward the repository, fire-and-forget. Duplicate deliveries produce
    /// duplicate peer-acks; no deduplication is attempted.
    pub async fn subscribe<F>(&self, base: &str, consumer: F) -> Result<SubscriptionId, ClientError>
    where
        F: Fn(Delivery) + Send + Sync + 'static,
    {
        let archived_channel = channels::derive(base, ChannelSuffix::Archived);
        let transport = Arc::clone(&self.transport);
        let peer_ack_channel = channels::derive(base, ChannelSuffix::PeerAck);
        let client_id = self.id.clone();

        let handler: MessageHandler = Arc::new(move |delivery: Delivery| {
            debug!(client_id = %client_id, channel = %delivery.channel, "archived delivery");
            let notice = notices::peer_ack(&client_id, &delivery.payload);
            consumer(delivery);
            let transport = Arc::clone(&transport);
            let peer_ack_channel = peer_ack_channel.clone();
            Box::pin(async move { transport.publish(&peer_ack_channel, notice.as_bytes()).await })
        });

        let id = self.transport.subscribe(&archived_channel, handler).await?;
        info!(client_id = %self.id, base, "subscribed to archived feed");
        Ok(id)
    }

    /// Remove an archived-feed subscription created by
    /// [`subscribe`](Self::subscribe).
    pub async fn unsubscribe(&self, base: &str, id: SubscriptionId) -> Result<(), ClientError> {
        let archived_channel = channels::derive(base, ChannelSuffix::Archived);
        self.transport.unsubscribe(&archived_channel, id).await?;
        Ok(())
    }
}
