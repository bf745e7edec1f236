//! End-to-end tests of the configuration-driven node runner.

use std::time::Duration;

use repub_core::channels::{self, ChannelSuffix};
use repub_node::{Node, NodeConfig, NodeError};
use repub_transport::Transport;
use repub_transport::testing::{recording_handler, wait_for_count};

fn two_client_config() -> NodeConfig {
    NodeConfig::parse(
        r#"
        [repository]
        fault_probability = 0.0

        [[clients]]
        id = "publisher"

        [[clients.publish]]
        channel = "orders"
        message = "tick"
        frequency_ms = 20

        [[clients]]
        id = "subscriber"
        subscribe = ["orders"]
        "#,
    )
    .expect("parse config")
}

#[tokio::test]
async fn node_drives_publishes_through_the_repository() {
    repub_node::logging::init_for_tests();

    let mut node = Node::new(two_client_config());
    node.start().await.expect("start");

    // Watch the archived feed directly on the node's transport.
    let transport = node.transport().expect("transport").clone();
    let (handler, archived) = recording_handler();
    transport
        .subscribe(&channels::derive("orders", ChannelSuffix::Archived), handler)
        .await
        .expect("subscribe");

    wait_for_count(&archived, 2, Duration::from_secs(2)).await;
    assert_eq!(archived.lock().expect("recorder")[0].payload, b"tick");

    node.shutdown().await;
}

#[tokio::test]
async fn node_wires_a_client_per_config_entry() {
    let mut node = Node::new(two_client_config());
    node.start().await.expect("start");

    assert!(node.client("publisher").is_some());
    assert!(node.client("subscriber").is_some());
    assert!(node.client("nobody").is_none());

    // No explicit channel list, so the repository manages the client union.
    let repository = node.repository().expect("repository");
    assert!(repository.is_managed("orders").await);

    node.shutdown().await;
}

#[tokio::test]
async fn starting_twice_is_an_error() {
    let mut node = Node::new(two_client_config());
    node.start().await.expect("first start");

    let err = node.start().await.unwrap_err();
    assert!(matches!(err, NodeError::AlreadyRunning));

    node.shutdown().await;
}

#[tokio::test]
async fn shutdown_handle_releases_run() {
    let mut node = Node::new(two_client_config());
    node.start().await.expect("start");

    let handle = node.shutdown_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.shutdown();
    });

    tokio::time::timeout(Duration::from_secs(2), node.run())
        .await
        .expect("run should return once shutdown is signaled");
    node.shutdown().await;
}

#[tokio::test]
async fn shutdown_without_start_is_clean() {
    let mut node = Node::new(NodeConfig::default());
    node.shutdown().await;
}
