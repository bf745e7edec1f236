//! Transport abstraction for the repub protocol.
//!
//! Defines the minimal publish/subscribe contract the protocol core consumes,
//! an in-process reference transport for testing, and generic conformance
//! assertions for backend implementations.

pub mod error;
pub mod memory;
pub mod shutdown;
pub mod testing;
pub mod traits;

pub use error::TransportError;
pub use memory::InMemoryTransport;
pub use traits::{Delivery, HandlerFuture, MessageHandler, SubscriptionId, Transport};
