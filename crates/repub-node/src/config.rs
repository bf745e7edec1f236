//! TOML-based configuration for repub nodes.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use repub_protocol::DEFAULT_FAULT_PROBABILITY;

use crate::error::NodeError;

/// Top-level node configuration loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub transport: TransportSection,
    #[serde(default)]
    pub repository: RepositorySection,
    #[serde(default)]
    pub clients: Vec<ClientEntry>,
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("failed to read config file: {e}")))?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, NodeError> {
        let config: Self =
            toml::from_str(s).map_err(|e| NodeError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// The base channels the repository should manage: the explicit
    /// `[repository] channels` list, or, when that is empty, the union of
    /// every channel the clients publish or subscribe to.
    pub fn managed_channels(&self) -> Vec<String> {
        if !self.repository.channels.is_empty() {
            return self.repository.channels.clone();
        }
        let mut channels = BTreeSet::new();
        for client in &self.clients {
            channels.extend(client.subscribe.iter().cloned());
            channels.extend(client.publish.iter().map(|p| p.channel.clone()));
        }
        channels.into_iter().collect()
    }

    fn validate(&self) -> Result<(), NodeError> {
        let p = self.repository.fault_probability;
        if !(0.0..1.0).contains(&p) {
            return Err(NodeError::Config(format!(
                "fault_probability must lie in [0, 1), got {p}"
            )));
        }

        let mut seen = BTreeSet::new();
        for client in &self.clients {
            if client.id.is_empty() {
                return Err(NodeError::Config("client id must not be empty".into()));
            }
            if !seen.insert(client.id.as_str()) {
                return Err(NodeError::Config(format!(
                    "duplicate client id \"{}\"",
                    client.id
                )));
            }
            for publish in &client.publish {
                if publish.frequency_ms == 0 {
                    return Err(NodeError::Config(format!(
                        "client \"{}\": frequency_ms must be positive",
                        client.id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// The `[transport]` section.
#[derive(Debug, Default, Deserialize)]
pub struct TransportSection {
    #[serde(default)]
    pub backend: TransportBackend,
}

/// Which transport backend to wire the node onto.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportBackend {
    /// The in-process reference transport.
    #[default]
    Memory,
}

/// The `[repository]` section.
#[derive(Debug, Deserialize)]
pub struct RepositorySection {
    /// Probability that the repository rejects an attempt, in [0, 1).
    #[serde(default = "default_fault_probability")]
    pub fault_probability: f64,
    /// Base channels to manage. Empty means "every channel the clients use".
    #[serde(default)]
    pub channels: Vec<String>,
}

impl Default for RepositorySection {
    fn default() -> Self {
        Self {
            fault_probability: default_fault_probability(),
            channels: Vec::new(),
        }
    }
}

fn default_fault_probability() -> f64 {
    DEFAULT_FAULT_PROBABILITY
}

/// A `[[clients]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientEntry {
    pub id: String,
    /// Base channels whose archived feed this client consumes.
    #[serde(default)]
    pub subscribe: Vec<String>,
    /// Periodic publish jobs driven by the runner.
    #[serde(default)]
    pub publish: Vec<PublishEntry>,
}

/// A `[[clients.publish]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishEntry {
    pub channel: String,
    /// Payload text; defaults to `Message from <client id>`.
    pub message: Option<String>,
    /// Publish period in milliseconds.
    #[serde(default = "default_frequency_ms")]
    pub frequency_ms: u64,
}

fn default_frequency_ms() -> u64 {
    5000
}
