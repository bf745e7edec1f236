//! Repository-focused tests: accept/reject behavior and notice formats.

use std::sync::Arc;
use std::time::Duration;

use repub_core::channels::{self, ChannelSuffix};
use repub_core::notices;
use repub_protocol::{DEFAULT_FAULT_PROBABILITY, Repository};
use repub_transport::testing::{recording_handler, settled, wait_for_count};
use repub_transport::{Delivery, InMemoryTransport, Transport};

const WAIT: Duration = Duration::from_secs(2);
const SETTLE: Duration = Duration::from_millis(100);

async fn started_transport() -> Arc<InMemoryTransport> {
    let transport = Arc::new(InMemoryTransport::new());
    transport.start_listener().await.expect("start listener");
    transport
}

async fn recorder_on(
    transport: &Arc<InMemoryTransport>,
    base: &str,
    suffix: ChannelSuffix,
) -> Arc<std::sync::Mutex<Vec<Delivery>>> {
    let (handler, recorded) = recording_handler();
    transport
        .subscribe(&channels::derive(base, suffix), handler)
        .await
        .expect("subscribe recorder");
    recorded
}

#[test]
fn default_fault_probability_is_five_percent() {
    assert_eq!(DEFAULT_FAULT_PROBABILITY, 0.05);
}

#[tokio::test]
async fn order_and_retransmit_share_the_accept_path() {
    let transport = started_transport().await;
    let repository = Repository::new(Arc::clone(&transport), 0.0);
    repository.manage("orders").await.expect("manage");

    let acks = recorder_on(&transport, "orders", ChannelSuffix::RepoAck).await;

    transport
        .publish(&channels::derive("orders", ChannelSuffix::Order), b"first")
        .await
        .expect("publish order");
    transport
        .publish(&channels::derive("orders", ChannelSuffix::Retransmit), b"second")
        .await
        .expect("publish retransmit");

    wait_for_count(&acks, 2, WAIT).await;
    let acks = settled(&acks, SETTLE).await;
    assert_eq!(acks[0].payload, notices::repo_ack(b"first").as_bytes());
    assert_eq!(acks[1].payload, notices::repo_ack(b"second").as_bytes());
}

#[tokio::test]
async fn rejected_attempts_nak_and_drop_the_message() {
    let transport = started_transport().await;
    let repository = Repository::new(Arc::clone(&transport), 1.0);
    repository.manage("orders").await.expect("manage");

    let naks = recorder_on(&transport, "orders", ChannelSuffix::RepoNak).await;
    let acks = recorder_on(&transport, "orders", ChannelSuffix::RepoAck).await;
    let archived = recorder_on(&transport, "orders", ChannelSuffix::Archived).await;

    // No NAK handler is armed, so a single order message draws a single
    // rejection and nothing else happens.
    transport
        .publish(&channels::derive("orders", ChannelSuffix::Order), b"m0")
        .await
        .expect("publish order");

    wait_for_count(&naks, 1, WAIT).await;
    let naks = settled(&naks, SETTLE).await;
    assert_eq!(naks.len(), 1);
    assert_eq!(naks[0].payload, notices::repo_nak(b"m0").as_bytes());
    assert!(settled(&acks, SETTLE).await.is_empty());
    assert!(settled(&archived, SETTLE).await.is_empty());
}

#[tokio::test]
async fn ack_is_published_before_the_archived_copy() {
    let transport = started_transport().await;
    let repository = Repository::new(Arc::clone(&transport), 0.0);
    repository.manage("orders").await.expect("manage");

    // One recorder watching both channels preserves dispatch order.
    let (handler, recorded) = recording_handler();
    transport
        .subscribe(
            &channels::derive("orders", ChannelSuffix::RepoAck),
            Arc::clone(&handler),
        )
        .await
        .expect("subscribe ack");
    transport
        .subscribe(&channels::derive("orders", ChannelSuffix::Archived), handler)
        .await
        .expect("subscribe archived");

    transport
        .publish(&channels::derive("orders", ChannelSuffix::Order), b"m1")
        .await
        .expect("publish order");

    wait_for_count(&recorded, 2, WAIT).await;
    let deliveries = settled(&recorded, SETTLE).await;
    assert_eq!(deliveries[0].channel, channels::derive("orders", ChannelSuffix::RepoAck));
    assert_eq!(deliveries[1].channel, channels::derive("orders", ChannelSuffix::Archived));
}

#[tokio::test]
async fn distinct_base_channels_are_handled_independently() {
    let transport = started_transport().await;
    let repository = Repository::new(Arc::clone(&transport), 0.0);
    repository.manage("alpha").await.expect("manage alpha");
    repository.manage("beta").await.expect("manage beta");

    let alpha_archived = recorder_on(&transport, "alpha", ChannelSuffix::Archived).await;
    let beta_archived = recorder_on(&transport, "beta", ChannelSuffix::Archived).await;

    transport
        .publish(&channels::derive("alpha", ChannelSuffix::Order), b"a")
        .await
        .expect("publish alpha");

    wait_for_count(&alpha_archived, 1, WAIT).await;
    assert!(settled(&beta_archived, SETTLE).await.is_empty());
}
