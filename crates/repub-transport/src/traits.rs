//! The transport contract consumed by the protocol core.
//!
//! Backends differ wildly in native guarantees — ephemeral at-most-once
//! pub/sub, durable replayable logs, fanout exchanges with per-subscriber
//! queues. The protocol assumes nothing stronger than this contract:
//! `subscribe` does not deliver messages published before it returned, and
//! any delivery may be duplicated. The only ordering requirement is FIFO per
//! channel with respect to publishes the transport has already returned from.

use std::pin::Pin;
use std::sync::Arc;

use crate::error::TransportError;

/// A message delivered to a subscription handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// The concrete (derived) channel the message arrived on.
    pub channel: String,
    /// The opaque payload, untouched by the transport.
    pub payload: Vec<u8>,
}

/// Identifies one subscription so it can be removed without disturbing other
/// handlers registered on the same channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Future returned by a subscription handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send>>;

/// A subscription callback.
///
/// Handlers must tolerate concurrent invocation for different channels and
/// repeated invocation for logically the same message. A handler error is
/// surfaced to the transport's dispatch loop and must never be silently
/// dropped there.
pub type MessageHandler = Arc<dyn Fn(Delivery) -> HandlerFuture + Send + Sync>;

/// Best-effort publish/subscribe transport.
///
/// Implementations bridge the protocol to a concrete backend. All methods
/// must be safe to call concurrently from multiple tasks.
pub trait Transport: Send + Sync + 'static {
    /// Human-readable backend name, for logging.
    fn name(&self) -> &str;

    /// Publish `payload` on `channel`.
    fn publish(
        &self,
        channel: &str,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Register `handler` for deliveries on `channel`.
    ///
    /// May be called many times for the same channel; each registration gets
    /// its own [`SubscriptionId`]. Messages published before this call
    /// returns are not guaranteed to be delivered to the new handler.
    fn subscribe(
        &self,
        channel: &str,
        handler: MessageHandler,
    ) -> impl Future<Output = Result<SubscriptionId, TransportError>> + Send;

    /// Remove one subscription. Unknown ids are ignored.
    fn unsubscribe(
        &self,
        channel: &str,
        id: SubscriptionId,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Remove every subscription on `channel`.
    fn unsubscribe_all(
        &self,
        channel: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Begin dispatching deliveries. Idempotent.
    fn start_listener(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Stop dispatching and release resources. Best-effort, idempotent.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}
