//! Protocol vocabulary for the repub reliable pub/sub protocol.
//!
//! This crate is pure: the channel-suffix algebra that names every derived
//! channel, and the acknowledgment notice texts echoed back to protocol
//! participants. No I/O, no async, no protocol state.

pub mod channels;
pub mod notices;

pub use channels::{ChannelSuffix, derive, parse};
