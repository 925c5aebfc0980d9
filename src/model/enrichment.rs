//! Data produced by enrichment collaborators: byte counters and Docker
//! port mappings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Cumulative per-PID network byte counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteCounters {
    pub sent: u64,
    pub received: u64,
}

impl ByteCounters {
    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        Self {
            sent: self.sent.saturating_add(other.sent),
            received: self.received.saturating_add(other.received),
        }
    }
}

/// Container attribution for a published host port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerPort {
    pub container_id: String,
    pub container_name: String,
    pub image: String,
    pub container_port: u16,
}

/// A running container with its published host ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    pub host_ports: Vec<u16>,
}

/// Output of one Docker resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DockerResolution {
    /// Host port → container attribution.
    pub ports: HashMap<u16, ContainerPort>,
    pub containers: Vec<VirtualContainer>,
}

impl DockerResolution {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty() && self.containers.is_empty()
    }
}
