//! Enrichment caches owned by the engine loop.
//!
//! DNS and NetIO caches only ever grow by merge. The Docker cache is replaced
//! wholesale on each resolution because containers disappear.

use std::collections::HashMap;

use crate::model::{Application, ByteCounters, ContainerPort, DockerResolution, Snapshot};

use super::docker::build_virtual_apps;

/// IP → hostname. An empty hostname records a failed lookup so the IP is
/// not retried every tick.
#[derive(Debug, Clone, Default)]
pub struct DnsCache {
    entries: HashMap<String, String>,
}

impl DnsCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_resolved(&mut self, ip: impl Into<String>, hostname: impl Into<String>) {
        self.entries.insert(ip.into(), hostname.into());
    }

    pub fn insert_failed(&mut self, ip: impl Into<String>) {
        self.entries.insert(ip.into(), String::new());
    }

    /// Whether the IP has been looked up, successfully or not.
    #[must_use]
    pub fn contains(&self, ip: &str) -> bool {
        self.entries.contains_key(ip)
    }

    /// Resolved hostname for display substitution; `None` for unknown or
    /// failed lookups.
    #[must_use]
    pub fn hostname(&self, ip: &str) -> Option<&str> {
        self.entries
            .get(ip)
            .map(String::as_str)
            .filter(|h| !h.is_empty())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// PID → cumulative byte counters.
#[derive(Debug, Clone, Default)]
pub struct NetIoCache {
    by_pid: HashMap<u32, ByteCounters>,
}

impl NetIoCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in fresh counters; PIDs missing from `update` keep their last
    /// value.
    pub fn merge(&mut self, update: HashMap<u32, ByteCounters>) {
        self.by_pid.extend(update);
    }

    #[must_use]
    pub fn get(&self, pid: u32) -> Option<ByteCounters> {
        self.by_pid.get(&pid).copied()
    }

    /// Sum over a multi-process application's PIDs.
    #[must_use]
    pub fn total_for(&self, pids: &[u32]) -> ByteCounters {
        pids.iter()
            .filter_map(|pid| self.get(*pid))
            .fold(ByteCounters::default(), ByteCounters::saturating_add)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_pid.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_pid.is_empty()
    }
}

/// Latest Docker resolution plus the virtual rows derived from it.
#[derive(Debug, Clone, Default)]
pub struct DockerCache {
    resolution: DockerResolution,
    virtual_apps: Vec<Application>,
}

impl DockerCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with a new resolution and rebuild virtual rows
    /// against `snapshot`.
    pub fn replace(&mut self, resolution: DockerResolution, snapshot: Option<&Snapshot>) {
        self.resolution = resolution;
        self.rebuild(snapshot);
    }

    /// Re-derive virtual rows after the snapshot changed.
    pub fn rebuild(&mut self, snapshot: Option<&Snapshot>) {
        self.virtual_apps = build_virtual_apps(&self.resolution, snapshot);
    }

    #[must_use]
    pub fn container_for_port(&self, host_port: u16) -> Option<&ContainerPort> {
        self.resolution.ports.get(&host_port)
    }

    #[must_use]
    pub fn virtual_apps(&self) -> &[Application] {
        &self.virtual_apps
    }

    #[must_use]
    pub fn resolution(&self) -> &DockerResolution {
        &self.resolution
    }
}
