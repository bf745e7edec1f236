//! The central sequencing and acknowledgment authority.
//!
//! One [`Repository`] manages any number of base channels. For every inbound
//! order/retransmit message it draws a fault decision and either
//! acknowledges-and-forwards or rejects. It keeps no per-message state: the
//! managed-channel set and the fault probability are its only state.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use repub_core::channels::{self, ChannelSuffix};
use repub_core::notices;
use repub_transport::{Delivery, MessageHandler, Transport};

use crate::error::RepositoryError;
use crate::fault::{self, FaultDecision};

/// The accept/reject/forward authority for a set of base channels.
pub struct Repository<T: Transport> {
    transport: Arc<T>,
    fault_probability: f64,
    managed: Mutex<HashSet<String>>,
}

impl<T: Transport> Repository<T> {
    /// Create a repository with the given rejection probability.
    ///
    /// `fault_probability` is expected to lie in `[0, 1)`; a value of 1.0
    /// rejects every attempt and stalls all publishers forever.
    pub fn new(transport: Arc<T>, fault_probability: f64) -> Self {
        Self {
            transport,
            fault_probability,
            managed: Mutex::new(HashSet::new()),
        }
    }

    /// The configured rejection probability.
    pub fn fault_probability(&self) -> f64 {
        self.fault_probability
    }

    /// Whether `base` is currently managed.
    pub async fn is_managed(&self, base: &str) -> bool {
        self.managed.lock().await.contains(base)
    }

    /// Begin managing `base`: subscribe its order and retransmit channels,
    /// both bound to the same accept/reject handler.
    ///
    /// Idempotent per base channel.
    pub async fn manage(&self, base: &str) -> Result<(), RepositoryError> {
        {
            let mut managed = self.managed.lock().await;
            if !managed.insert(base.to_string()) {
                debug!(base, "already managed");
                return Ok(());
            }
        }

        let handler = self.accept_handler(base);
        let order = channels::derive(base, ChannelSuffix::Order);
        let retransmit = channels::derive(base, ChannelSuffix::Retransmit);

        let order_sub = match self.transport.subscribe(&order, Arc::clone(&handler)).await {
            Ok(id) => id,
            Err(e) => {
                self.managed.lock().await.remove(base);
                return Err(e.into());
            }
        };
        if let Err(e) = self.transport.subscribe(&retransmit, handler).await {
            // Roll back the half-wired channel.
            if let Err(cleanup) = self.transport.unsubscribe(&order, order_sub).await {
                warn!(base, "failed to roll back order subscription: {cleanup}");
            }
            self.managed.lock().await.remove(base);
            return Err(e.into());
        }

        info!(base, "managing channel");
        Ok(())
    }

    /// Build the shared order/retransmit handler for one base channel.
    fn accept_handler(&self, base: &str) -> MessageHandler {
        let transport = Arc::clone(&self.transport);
        let fault_probability = self.fault_probability;
        let ack_channel = channels::derive(base, ChannelSuffix::RepoAck);
        let nak_channel = channels::derive(base, ChannelSuffix::RepoNak);
        let archived_channel = channels::derive(base, ChannelSuffix::Archived);

        Arc::new(move |delivery: Delivery| {
            let transport = Arc::clone(&transport);
            let ack_channel = ack_channel.clone();
            let nak_channel = nak_channel.clone();
            let archived_channel = archived_channel.clone();
            Box::pin(async move {
                let score = fault::draw_score();
                match fault::decide(score, fault_probability) {
                    FaultDecision::Accept => {
                        debug!(channel = %delivery.channel, score, "attempt accepted");
                        // ACK before the archived copy: the publisher's block
                        // must release no later than subscriber delivery
                        // becomes observable.
                        let ack = notices::repo_ack(&delivery.payload);
                        transport.publish(&ack_channel, ack.as_bytes()).await?;
                        transport.publish(&archived_channel, &delivery.payload).await?;
                    }
                    FaultDecision::Reject => {
                        debug!(channel = %delivery.channel, score, "fault injected, attempt rejected");
                        let nak = notices::repo_nak(&delivery.payload);
                        transport.publish(&nak_channel, nak.as_bytes()).await?;
                    }
                }
                Ok(())
            })
        })
    }
}
