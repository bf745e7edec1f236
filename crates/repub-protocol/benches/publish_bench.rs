//! Round-trip throughput of the blocking publish path.
//!
//! Measures publish-to-ACK latency over the in-process reference transport
//! with fault injection disabled, so every attempt is accepted on the first
//! try.

use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};

use repub_protocol::{ReliableClient, Repository};
use repub_transport::{InMemoryTransport, Transport};

fn publish_roundtrip(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("build runtime");

    let client = rt.block_on(async {
        let transport = Arc::new(InMemoryTransport::new());
        transport.start_listener().await.expect("start listener");

        let repository = Repository::new(Arc::clone(&transport), 0.0);
        repository.manage("bench").await.expect("manage");

        ReliableClient::new("bench", transport)
    });

    c.bench_function("publish_ack_roundtrip", |b| {
        b.to_async(&rt)
            .iter(|| async { client.publish("bench", b"m0").await.expect("publish") });
    });
}

criterion_group!(benches, publish_roundtrip);
criterion_main!(benches);
