//! Repository fault injection.
//!
//! The fault draw is the only source of repository-level rejection: a fresh
//! uniform score per inbound message, compared against the configured
//! probability. Retransmits re-enter the same path and get an independent
//! draw, so the expected number of attempts before success is `1/(1-p)`.

use rand::Rng;

/// Default probability that the repository rejects an attempt.
pub const DEFAULT_FAULT_PROBABILITY: f64 = 0.05;

/// Outcome of a fault draw for one order/retransmit message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultDecision {
    /// Acknowledge the attempt and forward it to the archived feed.
    Accept,
    /// Reject this attempt: the message is dropped and a NAK is sent.
    Reject,
}

/// Decide acceptance from a drawn score.
///
/// `score > fault_probability` accepts, anything else rejects. Scores are
/// drawn from `[0, 1)`, so a probability of 1.0 rejects every attempt.
pub fn decide(score: f64, fault_probability: f64) -> FaultDecision {
    if score > fault_probability {
        FaultDecision::Accept
    } else {
        FaultDecision::Reject
    }
}

/// Draw a fresh uniform score from `[0, 1)`.
pub fn draw_score() -> f64 {
    rand::thread_rng().gen_range(0.0..1.0)
}
