//! Node runner: wires the transport, repository, and reliable clients from
//! configuration and drives the periodic publish jobs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use repub_protocol::{ReliableClient, Repository};
use repub_transport::shutdown::ShutdownToken;
use repub_transport::{InMemoryTransport, Transport};

use crate::config::{NodeConfig, TransportBackend};
use crate::error::NodeError;

/// Signals a running [`Node`] to shut down.
#[derive(Clone)]
pub struct ShutdownHandle {
    token: Arc<ShutdownToken>,
}

impl ShutdownHandle {
    /// Request shutdown. Idempotent.
    pub fn shutdown(&self) {
        self.token.signal_stop();
    }
}

/// A configured messaging process: one transport, one repository, and N
/// reliable clients with their periodic publish jobs.
pub struct Node {
    config: NodeConfig,
    token: Arc<ShutdownToken>,
    transport: Option<Arc<InMemoryTransport>>,
    repository: Option<Arc<Repository<InMemoryTransport>>>,
    clients: HashMap<String, Arc<ReliableClient<InMemoryTransport>>>,
    publish_tasks: Vec<JoinHandle<()>>,
}

impl Node {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            token: Arc::new(ShutdownToken::new()),
            transport: None,
            repository: None,
            clients: HashMap::new(),
            publish_tasks: Vec::new(),
        }
    }

    /// A handle other tasks (e.g. a signal handler) can use to stop the node.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            token: Arc::clone(&self.token),
        }
    }

    /// The transport this node runs on, once started.
    pub fn transport(&self) -> Option<&Arc<InMemoryTransport>> {
        self.transport.as_ref()
    }

    /// The repository this node runs, once started.
    pub fn repository(&self) -> Option<&Arc<Repository<InMemoryTransport>>> {
        self.repository.as_ref()
    }

    /// Look up a wired client by id, once started.
    pub fn client(&self, id: &str) -> Option<&Arc<ReliableClient<InMemoryTransport>>> {
        self.clients.get(id)
    }

    /// Wire everything up and start the publish jobs.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        if self.transport.is_some() {
            return Err(NodeError::AlreadyRunning);
        }

        let transport = match self.config.transport.backend {
            TransportBackend::Memory => Arc::new(InMemoryTransport::new()),
        };
        transport.start_listener().await?;
        info!(backend = transport.name(), "transport listener started");

        let repository = Arc::new(Repository::new(
            Arc::clone(&transport),
            self.config.repository.fault_probability,
        ));
        for base in self.config.managed_channels() {
            repository.manage(&base).await?;
        }
        self.repository = Some(repository);

        for entry in &self.config.clients {
            let client = Arc::new(ReliableClient::new(
                entry.id.clone(),
                Arc::clone(&transport),
            ));

            for base in &entry.subscribe {
                let client_id = entry.id.clone();
                client
                    .subscribe(base, move |delivery| {
                        info!(
                            client_id = %client_id,
                            channel = %delivery.channel,
                            payload = %String::from_utf8_lossy(&delivery.payload),
                            "received archived message"
                        );
                    })
                    .await?;
            }

            for publish in &entry.publish {
                let message = publish
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("Message from {}", entry.id));
                let task = self.spawn_publish_job(
                    Arc::clone(&client),
                    publish.channel.clone(),
                    message,
                    Duration::from_millis(publish.frequency_ms),
                );
                self.publish_tasks.push(task);
            }

            self.clients.insert(entry.id.clone(), client);
        }

        self.transport = Some(transport);
        info!(clients = self.clients.len(), "node started");
        Ok(())
    }

    fn spawn_publish_job(
        &self,
        client: Arc<ReliableClient<InMemoryTransport>>,
        channel: String,
        message: String,
        period: Duration,
    ) -> JoinHandle<()> {
        let mut stop_rx = self.token.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // The blocking publish itself must stay cancellable,
                        // or a stalled repository would wedge shutdown.
                        tokio::select! {
                            result = client.publish(&channel, message.as_bytes()) => {
                                if let Err(e) = result {
                                    warn!(client_id = %client.id(), channel = %channel, "publish failed: {e}");
                                }
                            }
                            _ = stop_rx.changed() => break,
                        }
                    }
                    _ = stop_rx.changed() => break,
                }
            }
        })
    }

    /// Block until shutdown is requested.
    pub async fn run(&self) {
        let mut stop_rx = self.token.subscribe();
        while !*stop_rx.borrow_and_update() {
            if stop_rx.changed().await.is_err() {
                break;
            }
        }
    }

    /// Stop publish jobs and close the transport.
    pub async fn shutdown(&mut self) {
        self.token.signal_stop();
        for task in self.publish_tasks.drain(..) {
            let _ = task.await;
        }
        if let Some(transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                warn!("transport close failed: {e}");
            }
        }
        self.repository = None;
        self.clients.clear();
        info!("node stopped");
    }
}
