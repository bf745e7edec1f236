//! The reliable, acknowledged delivery protocol.
//!
//! A [`Repository`] is the central accept/reject/forward authority for a set
//! of base channels; [`ReliableClient`]s publish by blocking until the
//! repository acknowledges one of their delivery attempts, retransmit on
//! rejection, and acknowledge every archived delivery they receive.

pub mod client;
pub mod error;
pub mod fault;
pub mod repository;
pub mod signal;

pub use client::ReliableClient;
pub use error::{ClientError, RepositoryError};
pub use fault::{DEFAULT_FAULT_PROBABILITY, FaultDecision};
pub use repository::Repository;
pub use signal::AckSignal;
