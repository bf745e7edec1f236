//! Human-readable acknowledgment notices.
//!
//! ACK, NAK, and peer-ack payloads are confirmation text that echoes the
//! message they refer to. Payload bytes are echoed via lossy UTF-8; this is
//! the only place the protocol looks at payload content at all.

use std::borrow::Cow;

fn echoed(payload: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(payload)
}

/// Repository acceptance notice, published on the repo-ack channel.
pub fn repo_ack(payload: &[u8]) -> String {
    format!("Repository ACK for message: \"{}\"", echoed(payload))
}

/// Repository rejection notice, published on the repo-nak channel.
pub fn repo_nak(payload: &[u8]) -> String {
    format!("Repository NAK for message: \"{}\"", echoed(payload))
}

/// Subscriber acknowledgment of an archived delivery, published on the
/// peer-ack channel.
pub fn peer_ack(client_id: &str, payload: &[u8]) -> String {
    format!("ACK from {client_id} to Repository for message \"{}\"", echoed(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_ack_echoes_payload() {
        assert_eq!(repo_ack(b"m0"), "Repository ACK for message: \"m0\"");
    }

    #[test]
    fn repo_nak_echoes_payload() {
        assert_eq!(repo_nak(b"m0"), "Repository NAK for message: \"m0\"");
    }

    #[test]
    fn peer_ack_names_the_acking_client() {
        assert_eq!(
            peer_ack("client-7", b"m1"),
            "ACK from client-7 to Repository for message \"m1\""
        );
    }

    #[test]
    fn non_utf8_payloads_are_echoed_lossily() {
        let notice = repo_ack(&[0xff, 0xfe]);
        assert!(notice.starts_with("Repository ACK for message: \""));
        assert!(notice.contains('\u{fffd}'));
    }
}
