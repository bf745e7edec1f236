//! In-process reference transport.
//!
//! [`InMemoryTransport`] delivers published messages to all current
//! subscribers of the exact channel name, FIFO per channel, with no replay
//! for late subscribers. A single dispatch task drains an unbounded queue;
//! handlers run to completion in queue order, so any publishes a handler
//! performs are observed after the message that triggered them.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, error, trace};

use crate::error::TransportError;
use crate::shutdown::ShutdownToken;
use crate::traits::{Delivery, MessageHandler, SubscriptionId, Transport};

/// One registered handler on a channel.
#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    handler: MessageHandler,
}

/// A queued publish awaiting dispatch.
struct Queued {
    channel: String,
    payload: Vec<u8>,
}

/// Shared interior state for the in-memory transport.
struct Inner {
    /// Channel name -> registered handlers, in subscription order.
    subscriptions: Mutex<HashMap<String, Vec<Subscriber>>>,
    /// Publish side of the dispatch queue.
    queue_tx: mpsc::UnboundedSender<Queued>,
    /// Dispatch side, taken by the dispatch task on listener start.
    queue_rx: Mutex<Option<mpsc::UnboundedReceiver<Queued>>>,
    /// Monotonic subscription id source.
    next_id: AtomicU64,
    /// Whether the dispatch task has been spawned.
    started: AtomicBool,
    /// Stop signal and dispatch task handle.
    shutdown: ShutdownToken,
}

/// An in-process publish/subscribe bus satisfying the minimum [`Transport`]
/// contract.
///
/// Messages published before [`start_listener`](Transport::start_listener)
/// queue up and flow once dispatching begins. Messages dispatched while a
/// channel has no subscribers are dropped; there is no replay.
pub struct InMemoryTransport {
    inner: Arc<Inner>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                subscriptions: Mutex::new(HashMap::new()),
                queue_tx,
                queue_rx: Mutex::new(Some(queue_rx)),
                next_id: AtomicU64::new(0),
                started: AtomicBool::new(false),
                shutdown: ShutdownToken::new(),
            }),
        }
    }

    async fn dispatch_loop(
        inner: Arc<Inner>,
        mut queue_rx: mpsc::UnboundedReceiver<Queued>,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        debug!("dispatch loop started");
        loop {
            tokio::select! {
                queued = queue_rx.recv() => {
                    let Some(queued) = queued else { break };
                    Self::dispatch(&inner, queued).await;
                }
                _ = stop_rx.changed() => break,
            }
        }
        debug!("dispatch loop stopped");
    }

    async fn dispatch(inner: &Inner, queued: Queued) {
        let subscribers: Vec<Subscriber> = {
            let subscriptions = inner.subscriptions.lock().await;
            subscriptions.get(&queued.channel).cloned().unwrap_or_default()
        };

        if subscribers.is_empty() {
            trace!(channel = %queued.channel, "no subscribers, message dropped");
            return;
        }

        for subscriber in subscribers {
            let delivery = Delivery {
                channel: queued.channel.clone(),
                payload: queued.payload.clone(),
            };
            // Handler failures surface here; masking them would hide
            // acked-but-never-archived anomalies upstream.
            if let Err(e) = (subscriber.handler)(delivery).await {
                error!(
                    channel = %queued.channel,
                    subscription = subscriber.id.0,
                    "handler failed: {e}"
                );
            }
        }
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for InMemoryTransport {
    fn name(&self) -> &str {
        "memory"
    }

    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<(), TransportError> {
        if self.inner.shutdown.is_stopped() {
            return Err(TransportError::Closed);
        }
        trace!(channel, len = payload.len(), "queued publish");
        self.inner
            .queue_tx
            .send(Queued {
                channel: channel.to_string(),
                payload: payload.to_vec(),
            })
            .map_err(|_| TransportError::Closed)
    }

    async fn subscribe(
        &self,
        channel: &str,
        handler: MessageHandler,
    ) -> Result<SubscriptionId, TransportError> {
        if self.inner.shutdown.is_stopped() {
            return Err(TransportError::Closed);
        }
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .subscriptions
            .lock()
            .await
            .entry(channel.to_string())
            .or_default()
            .push(Subscriber {
                id,
                handler,
            });
        debug!(channel, id = id.0, "subscribed");
        Ok(id)
    }

    async fn unsubscribe(&self, channel: &str, id: SubscriptionId) -> Result<(), TransportError> {
        let mut subscriptions = self.inner.subscriptions.lock().await;
        if let Some(handlers) = subscriptions.get_mut(channel) {
            let before = handlers.len();
            handlers.retain(|s| s.id != id);
            if handlers.len() != before {
                debug!(channel, id = id.0, "unsubscribed");
            }
            if handlers.is_empty() {
                subscriptions.remove(channel);
            }
        }
        Ok(())
    }

    async fn unsubscribe_all(&self, channel: &str) -> Result<(), TransportError> {
        if let Some(handlers) = self.inner.subscriptions.lock().await.remove(channel) {
            debug!(channel, removed = handlers.len(), "unsubscribed all");
        }
        Ok(())
    }

    async fn start_listener(&self) -> Result<(), TransportError> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let Some(queue_rx) = self.inner.queue_rx.lock().await.take() else {
            return Ok(());
        };
        let inner = Arc::clone(&self.inner);
        let stop_rx = self.inner.shutdown.subscribe();
        let handle = tokio::spawn(Self::dispatch_loop(inner, queue_rx, stop_rx));
        self.inner.shutdown.add_task(handle).await;
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.inner.shutdown.signal_stop();
        self.inner.shutdown.join_all().await;
        Ok(())
    }
}
