//! Error types for the transport layer.

/// Errors that can occur during transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The transport has been closed; no further publishes or deliveries.
    #[error("transport closed")]
    Closed,
    #[error("publish to \"{channel}\" failed: {reason}")]
    PublishFailed { channel: String, reason: String },
    #[error("subscribe to \"{channel}\" failed: {reason}")]
    SubscribeFailed { channel: String, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
