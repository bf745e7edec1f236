//! Error types for the node runner.

use repub_protocol::{ClientError, RepositoryError};
use repub_transport::TransportError;

/// Errors that can occur while wiring or running a node.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("client error: {0}")]
    Client(#[from] ClientError),
    #[error("node already running")]
    AlreadyRunning,
}
