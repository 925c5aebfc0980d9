//! Point-in-time enumeration of processes and their connections.
//!
//! A [`Snapshot`] is produced by a collector and never mutated afterwards. The
//! engine model owns the current and previous generations by value and moves
//! them on rotation; rows borrow from them.

use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enrichment::ContainerPort;

/// Transport protocol of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Tcp6,
    Udp,
    Udp6,
}

impl Protocol {
    /// Lowercase label used for display and filtering.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Tcp6 => "tcp6",
            Self::Udp => "udp",
            Self::Udp6 => "udp6",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One socket owned by a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub pid: u32,
    pub protocol: Protocol,
    /// Local endpoint, `ip:port` (IPv6 as `[ip]:port`).
    pub local: String,
    /// Remote endpoint; empty or wildcard for listening sockets.
    pub remote: String,
    /// Socket state as reported by the OS (`ESTABLISHED`, `LISTEN`, ...).
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerPort>,
}

impl Connection {
    /// Diffing identity of this connection.
    #[must_use]
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey {
            pid: self.pid,
            protocol: self.protocol,
            local: self.local.clone(),
            remote: self.remote.clone(),
        }
    }

    #[must_use]
    pub fn is_established(&self) -> bool {
        self.state.eq_ignore_ascii_case("ESTABLISHED")
    }

    #[must_use]
    pub fn is_listen(&self) -> bool {
        self.state.eq_ignore_ascii_case("LISTEN")
    }

    /// Port of the local endpoint, if it parses.
    #[must_use]
    pub fn local_port(&self) -> Option<u16> {
        split_host_port(&self.local).map(|(_, port)| port)
    }

    /// Port of the remote endpoint, if it parses.
    #[must_use]
    pub fn remote_port(&self) -> Option<u16> {
        split_host_port(&self.remote).map(|(_, port)| port)
    }
}

/// (PID, protocol, local, remote) — the identity used for diffing.
///
/// Not globally unique: two processes can briefly share a 4-tuple, and PID
/// reuse inside one refresh window is invisible. Both are accepted limits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionKey {
    pub pid: u32,
    pub protocol: Protocol,
    pub local: String,
    pub remote: String,
}

/// All processes sharing one display name, merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    /// Unique display key.
    pub name: String,
    #[serde(default)]
    pub exe_path: String,
    /// Sorted, de-duplicated PIDs.
    pub pids: Vec<u32>,
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub established: usize,
    #[serde(default)]
    pub listen: usize,
    /// Container ID when this row is a synthesized virtual container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

impl Application {
    /// Build an application row from its connections, deriving PIDs and
    /// state counts.
    #[must_use]
    pub fn from_connections(
        name: impl Into<String>,
        exe_path: impl Into<String>,
        connections: Vec<Connection>,
    ) -> Self {
        let mut pids: Vec<u32> = connections.iter().map(|c| c.pid).collect();
        pids.sort_unstable();
        pids.dedup();
        let established = connections.iter().filter(|c| c.is_established()).count();
        let listen = connections.iter().filter(|c| c.is_listen()).count();
        Self {
            name: name.into(),
            exe_path: exe_path.into(),
            pids,
            connections,
            established,
            listen,
            container: None,
        }
    }

    /// Lowest PID, used as the sort key for the PID column.
    #[must_use]
    pub fn primary_pid(&self) -> Option<u32> {
        self.pids.iter().copied().min()
    }

    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.container.is_some()
    }
}

/// One immutable collection result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub applications: Vec<Application>,
    pub collected_at: DateTime<Utc>,
    /// Sockets the collector could not attribute (permissions, races).
    #[serde(default)]
    pub skipped: usize,
    /// Monotonic collection-completion time; stamps every change diffed
    /// against this snapshot.
    #[serde(skip, default = "Instant::now")]
    pub completed: Instant,
}

impl Snapshot {
    /// Create a snapshot stamped with the current time.
    #[must_use]
    pub fn new(applications: Vec<Application>, skipped: usize) -> Self {
        Self {
            applications,
            collected_at: Utc::now(),
            skipped,
            completed: Instant::now(),
        }
    }

    #[must_use]
    pub fn application(&self, name: &str) -> Option<&Application> {
        self.applications.iter().find(|a| a.name == name)
    }

    /// Iterate every connection in collection order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.applications.iter().flat_map(|a| a.connections.iter())
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.applications.iter().map(|a| a.connections.len()).sum()
    }
}

/// Split `ip:port` / `[ip]:port` into host and numeric port.
///
/// Returns `None` for wildcard (`*`) or missing ports.
#[must_use]
pub fn split_host_port(addr: &str) -> Option<(&str, u16)> {
    let addr = addr.trim();
    if let Some(rest) = addr.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        let port = tail.strip_prefix(':')?.parse().ok()?;
        return Some((host, port));
    }
    let (host, port) = addr.rsplit_once(':')?;
    Some((host, port.parse().ok()?))
}

/// Host part of an address, tolerating a missing or wildcard port.
#[must_use]
pub fn host_of(addr: &str) -> &str {
    let addr = addr.trim();
    if let Some(rest) = addr.strip_prefix('[') {
        return rest.split_once(']').map_or(rest, |(host, _)| host);
    }
    match addr.rsplit_once(':') {
        // An unbracketed IPv6 literal without a port has several colons and
        // a non-numeric tail; keep it whole.
        Some((host, port)) if port == "*" || port.parse::<u16>().is_ok() => host,
        _ => addr,
    }
}
