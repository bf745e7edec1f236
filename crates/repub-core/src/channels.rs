//! The channel-suffix algebra.
//!
//! Every protocol event travels on a *derived channel*: a base channel name
//! with a fixed suffix appended. Centralizing the mapping here keeps suffix
//! strings out of the rest of the codebase, so the protocol can be retargeted
//! to new suffixes without touching callers.

/// A protocol suffix appended to a base channel name.
///
/// Wire strings encode the direction of travel: publisher-to-repository
/// (`P2R`), repository-to-publisher (`R2P`), repository-to-subscriber
/// (`R2S`), and subscriber-to-repository (`S2R`).
///
/// [`Rectify`](Self::Rectify), [`PeerRetransmit`](Self::PeerRetransmit),
/// [`Sync`](Self::Sync), and [`PeerNak`](Self::PeerNak) are reserved for a
/// future rectify/resync extension and currently have no consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelSuffix {
    /// First delivery attempt from a publisher to the repository.
    Order,
    /// Re-delivery attempt from a publisher after a NAK.
    Retransmit,
    /// Repository rejection notice back to the publisher.
    RepoNak,
    /// Repository acceptance notice back to the publisher.
    RepoAck,
    /// Accepted message re-broadcast to all subscribers.
    Archived,
    /// Reserved: repository-driven correction of a subscriber's state.
    Rectify,
    /// Reserved: repository-driven re-delivery toward a subscriber.
    PeerRetransmit,
    /// Reserved: repository/subscriber state synchronization.
    Sync,
    /// Subscriber acknowledgment of an archived delivery.
    PeerAck,
    /// Reserved: subscriber rejection of an archived delivery.
    PeerNak,
}

impl ChannelSuffix {
    /// Every suffix, in declaration order.
    pub const ALL: [ChannelSuffix; 10] = [
        ChannelSuffix::Order,
        ChannelSuffix::Retransmit,
        ChannelSuffix::RepoNak,
        ChannelSuffix::RepoAck,
        ChannelSuffix::Archived,
        ChannelSuffix::Rectify,
        ChannelSuffix::PeerRetransmit,
        ChannelSuffix::Sync,
        ChannelSuffix::PeerAck,
        ChannelSuffix::PeerNak,
    ];

    /// The wire string appended to a base channel name.
    pub const fn as_str(self) -> &'static str {
        match self {
            ChannelSuffix::Order => "/P2R-Order",
            ChannelSuffix::Retransmit => "/P2R-Retransmit",
            ChannelSuffix::RepoNak => "/R2P-NAK",
            ChannelSuffix::RepoAck => "/R2P-ACK",
            ChannelSuffix::Archived => "/R2S-Archived",
            ChannelSuffix::Rectify => "/R2S-Rectify",
            ChannelSuffix::PeerRetransmit => "/R2S-Retransmit",
            ChannelSuffix::Sync => "/R2S-Sync",
            ChannelSuffix::PeerAck => "/S2R-ACK",
            ChannelSuffix::PeerNak => "/S2R-NAK",
        }
    }
}

/// Derive the concrete channel name for a protocol event on `base`.
///
/// Pure and total: any base string (including the empty string) produces a
/// valid derived name.
pub fn derive(base: &str, suffix: ChannelSuffix) -> String {
    format!("{base}{}", suffix.as_str())
}

/// Split a derived channel name back into its base and suffix.
///
/// Returns `None` for names that carry no protocol suffix. No suffix string
/// is a trailing substring of another, so the split is unambiguous.
pub fn parse(channel: &str) -> Option<(&str, ChannelSuffix)> {
    for suffix in ChannelSuffix::ALL {
        if let Some(base) = channel.strip_suffix(suffix.as_str()) {
            return Some((base, suffix));
        }
    }
    tracing::trace!(channel, "channel carries no protocol suffix");
    None
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn derive_appends_wire_suffix() {
        assert_eq!(derive("orders", ChannelSuffix::Order), "orders/P2R-Order");
        assert_eq!(derive("orders", ChannelSuffix::RepoAck), "orders/R2P-ACK");
        assert_eq!(
            derive("orders", ChannelSuffix::Archived),
            "orders/R2S-Archived"
        );
        assert_eq!(derive("orders", ChannelSuffix::PeerAck), "orders/S2R-ACK");
    }

    #[test]
    fn derive_is_total_over_empty_base() {
        assert_eq!(derive("", ChannelSuffix::Order), "/P2R-Order");
    }

    #[test]
    fn parse_splits_every_suffix() {
        for suffix in ChannelSuffix::ALL {
            let channel = derive("telemetry", suffix);
            assert_eq!(parse(&channel), Some(("telemetry", suffix)));
        }
    }

    #[test]
    fn parse_rejects_unsuffixed_names() {
        assert_eq!(parse("orders"), None);
        assert_eq!(parse(""), None);
        assert_eq!(parse("orders/P2R-Orderly"), None);
    }

    #[test]
    fn parse_keeps_suffix_like_bases_intact() {
        // A base that itself looks like a derived name splits at the
        // outermost suffix only.
        let base = "orders/R2P-ACK";
        let channel = derive(base, ChannelSuffix::Order);
        assert_eq!(parse(&channel), Some((base, ChannelSuffix::Order)));
    }

    #[test]
    fn wire_strings_are_distinct() {
        for a in ChannelSuffix::ALL {
            for b in ChannelSuffix::ALL {
                if a != b {
                    assert_ne!(a.as_str(), b.as_str());
                }
            }
        }
    }

    #[test]
    fn no_wire_string_is_a_suffix_of_another() {
        // parse() relies on this to be unambiguous.
        for a in ChannelSuffix::ALL {
            for b in ChannelSuffix::ALL {
                if a != b {
                    assert!(!a.as_str().ends_with(b.as_str()));
                }
            }
        }
    }

    proptest! {
        #[test]
        fn derive_parse_roundtrip(base in ".*") {
            for suffix in ChannelSuffix::ALL {
                let channel = derive(&base, suffix);
                prop_assert_eq!(parse(&channel), Some((base.as_str(), suffix)));
            }
        }
    }
}
