//! Generic conformance assertions for [`Transport`] implementations.
//!
//! These validate the minimum contract the protocol core relies on,
//! regardless of backend. Call them against a transport whose listener has
//! already been started.
//!
//! # Usage
//!
//! ```rust,ignore
//! use repub_transport::testing;
//!
//! let transport = MyTransport::new();
//! transport.start_listener().await?;
//! testing::assert_delivers_to_all_subscribers(&transport).await;
//! testing::assert_fifo_per_channel(&transport).await;
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::traits::{Delivery, MessageHandler, Transport};

/// Default patience for conformance waits.
pub const CONFORMANCE_TIMEOUT: Duration = Duration::from_secs(2);

/// Pause long enough for in-flight dispatch to settle.
pub const CONFORMANCE_SETTLE: Duration = Duration::from_millis(100);

/// A handler that records every delivery it receives.
pub fn recording_handler() -> (MessageHandler, Arc<Mutex<Vec<Delivery>>>) {
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&recorded);
    let handler: MessageHandler = Arc::new(move |delivery| {
        let sink = Arc::clone(&sink);
        Box::pin(async move {
            sink.lock().expect("recorder lock poisoned").push(delivery);
            Ok(())
        })
    });
    (handler, recorded)
}

/// Await until `recorded` holds at least `count` deliveries, panicking after
/// `timeout`.
pub async fn wait_for_count(
    recorded: &Arc<Mutex<Vec<Delivery>>>,
    count: usize,
    timeout: Duration,
) {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let seen = recorded.lock().expect("recorder lock poisoned").len();
        if seen >= count {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("expected {count} deliveries within {timeout:?}, got {seen}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Let in-flight dispatch settle, then return a snapshot of the recorded
/// deliveries.
pub async fn settled(recorded: &Arc<Mutex<Vec<Delivery>>>, settle: Duration) -> Vec<Delivery> {
    tokio::time::sleep(settle).await;
    recorded.lock().expect("recorder lock poisoned").clone()
}

/// Assert that one publish reaches every current subscriber of the channel.
pub async fn assert_delivers_to_all_subscribers(transport: &impl Transport) {
    let channel = "conformance/fanout";
    let (first_handler, first) = recording_handler();
    let (second_handler, second) = recording_handler();
    let first_id = transport
        .subscribe(channel, first_handler)
        .await
        .expect("subscribe first");
    let second_id = transport
        .subscribe(channel, second_handler)
        .await
        .expect("subscribe second");

    transport
        .publish(channel, b"fanout")
        .await
        .expect("publish");

    wait_for_count(&first, 1, CONFORMANCE_TIMEOUT).await;
    wait_for_count(&second, 1, CONFORMANCE_TIMEOUT).await;
    assert_eq!(first.lock().expect("recorder lock poisoned")[0].payload, b"fanout");
    assert_eq!(second.lock().expect("recorder lock poisoned")[0].payload, b"fanout");

    transport.unsubscribe(channel, first_id).await.expect("unsubscribe");
    transport.unsubscribe(channel, second_id).await.expect("unsubscribe");
}

/// Assert that an unsubscribed handler receives no further deliveries.
pub async fn assert_unsubscribed_handler_not_invoked(transport: &impl Transport) {
    let channel = "conformance/unsubscribe";
    let (handler, recorded) = recording_handler();
    let id = transport.subscribe(channel, handler).await.expect("subscribe");

    transport.publish(channel, b"before").await.expect("publish");
    wait_for_count(&recorded, 1, CONFORMANCE_TIMEOUT).await;

    transport.unsubscribe(channel, id).await.expect("unsubscribe");
    transport.publish(channel, b"after").await.expect("publish");

    let deliveries = settled(&recorded, CONFORMANCE_SETTLE).await;
    assert_eq!(
        deliveries.len(),
        1,
        "unsubscribed handler must not see later publishes"
    );
}

/// Assert per-channel FIFO ordering for publishes the transport already
/// returned from.
pub async fn assert_fifo_per_channel(transport: &impl Transport) {
    let channel = "conformance/fifo";
    let (handler, recorded) = recording_handler();
    let id = transport.subscribe(channel, handler).await.expect("subscribe");

    for i in 0..10u8 {
        transport.publish(channel, &[i]).await.expect("publish");
    }

    wait_for_count(&recorded, 10, CONFORMANCE_TIMEOUT).await;
    let deliveries = recorded.lock().expect("recorder lock poisoned").clone();
    for (i, delivery) in deliveries.iter().enumerate() {
        assert_eq!(delivery.payload, [i as u8], "out-of-order delivery at {i}");
    }

    transport.unsubscribe(channel, id).await.expect("unsubscribe");
}

/// Assert that a second `start_listener` call neither fails nor doubles
/// deliveries.
pub async fn assert_start_listener_idempotent(transport: &impl Transport) {
    transport.start_listener().await.expect("restart listener");

    let channel = "conformance/idempotent-start";
    let (handler, recorded) = recording_handler();
    let id = transport.subscribe(channel, handler).await.expect("subscribe");

    transport.publish(channel, b"once").await.expect("publish");
    wait_for_count(&recorded, 1, CONFORMANCE_TIMEOUT).await;

    let deliveries = settled(&recorded, CONFORMANCE_SETTLE).await;
    assert_eq!(deliveries.len(), 1, "duplicate dispatch after restarted listener");

    transport.unsubscribe(channel, id).await.expect("unsubscribe");
}

/// Assert that a subscriber joining after a message was dispatched never
/// sees it (no replay).
pub async fn assert_no_replay_for_late_subscriber(transport: &impl Transport) {
    let channel = "conformance/no-replay";
    transport.publish(channel, b"gone").await.expect("publish");
    tokio::time::sleep(CONFORMANCE_SETTLE).await;

    let (handler, recorded) = recording_handler();
    let id = transport.subscribe(channel, handler).await.expect("subscribe");

    let deliveries = settled(&recorded, CONFORMANCE_SETTLE).await;
    assert!(
        deliveries.is_empty(),
        "late subscriber must not see previously dispatched messages"
    );

    transport.unsubscribe(channel, id).await.expect("unsubscribe");
}
