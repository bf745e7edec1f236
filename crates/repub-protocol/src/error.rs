//! Error types for the reliable-delivery protocol layer.
//!
//! Rejection (a NAK) is not an error anywhere in this module: it is an
//! expected, recoverable protocol event that triggers retransmission and
//! never reaches a caller.

use std::time::Duration;

use repub_transport::TransportError;

/// Errors surfaced by the repository.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Errors surfaced by a reliable client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Only produced when a deadline was explicitly requested; the default
    /// publish path blocks without limit instead.
    #[error("delivery on \"{channel}\" timed out after {after:?}")]
    DeliveryTimedOut { channel: String, after: Duration },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display_names_the_channel() {
        let err = ClientError::DeliveryTimedOut {
            channel: "orders".into(),
            after: Duration::from_millis(250),
        };
        assert!(err.to_string().contains("orders"));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn transport_errors_convert() {
        let err: ClientError = TransportError::Closed.into();
        assert!(matches!(err, ClientError::Transport(TransportError::Closed)));

        let err: RepositoryError = TransportError::Closed.into();
        assert!(matches!(err, RepositoryError::Transport(TransportError::Closed)));
    }
}
