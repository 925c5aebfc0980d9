//! Deterministic multi-key comparators for process and connection rows.
//!
//! Every comparator falls through to a fixed tie-break when its primary key
//! ties: process rows on name, connection rows on local address then remote
//! address. Direction flips the primary key only, so tied rows keep the same
//! relative order whichever way the column is sorted. Cursor tracking in
//! [`super::selection`] relies on this: without it, ties could reshuffle on
//! every refresh.

use std::cmp::Ordering;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::CwError;
use crate::model::snapshot::split_host_port;
use crate::model::{Application, Connection};

// ──────────────────── columns ────────────────────

/// Sortable columns of the process list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessSortColumn {
    #[default]
    Name,
    /// Lowest PID of the application.
    Pid,
    /// Total connection count.
    Connections,
    Established,
    Listen,
}

impl ProcessSortColumn {
    /// Columns in picker order.
    pub const ALL: [Self; 5] = [
        Self::Name,
        Self::Pid,
        Self::Connections,
        Self::Established,
        Self::Listen,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Pid => "pid",
            Self::Connections => "connections",
            Self::Established => "established",
            Self::Listen => "listen",
        }
    }
}

impl fmt::Display for ProcessSortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProcessSortColumn {
    type Err = CwError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.label() == wanted)
            .ok_or_else(|| CwError::InvalidConfig {
                details: format!("unknown process sort column {raw:?}"),
            })
    }
}

/// Sortable columns of the connection tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionSortColumn {
    /// Owning process name (only meaningful in the all-connections view).
    Process,
    Pid,
    Protocol,
    #[default]
    Local,
    Remote,
    State,
}

impl ConnectionSortColumn {
    /// Columns in picker order.
    pub const ALL: [Self; 6] = [
        Self::Process,
        Self::Pid,
        Self::Protocol,
        Self::Local,
        Self::Remote,
        Self::State,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::Pid => "pid",
            Self::Protocol => "protocol",
            Self::Local => "local",
            Self::Remote => "remote",
            Self::State => "state",
        }
    }
}

impl fmt::Display for ConnectionSortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ──────────────────── rows ────────────────────

/// A connection paired with the name of the application that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionRow<'a> {
    pub process: &'a str,
    pub connection: &'a Connection,
}

// ──────────────────── sorting ────────────────────

/// Return a newly ordered copy of `rows`; the input is left untouched.
#[must_use]
pub fn sort_processes<'a>(
    rows: &[&'a Application],
    column: ProcessSortColumn,
    ascending: bool,
) -> Vec<&'a Application> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| compare_processes(a, b, column, ascending));
    sorted
}

/// Return a newly ordered copy of `rows`; the input is left untouched.
#[must_use]
pub fn sort_connections<'a>(
    rows: &[ConnectionRow<'a>],
    column: ConnectionSortColumn,
    ascending: bool,
) -> Vec<ConnectionRow<'a>> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| compare_connections(a, b, column, ascending));
    sorted
}

/// Full process ordering: primary column, then name.
#[must_use]
pub fn compare_processes(
    a: &Application,
    b: &Application,
    column: ProcessSortColumn,
    ascending: bool,
) -> Ordering {
    let name = || a.name.cmp(&b.name);
    let primary = match column {
        ProcessSortColumn::Name => name(),
        ProcessSortColumn::Pid => a.primary_pid().cmp(&b.primary_pid()),
        ProcessSortColumn::Connections => a.connections.len().cmp(&b.connections.len()),
        ProcessSortColumn::Established => a.established.cmp(&b.established),
        ProcessSortColumn::Listen => a.listen.cmp(&b.listen),
    };
    directed(primary, ascending).then_with(name)
}

/// Full connection ordering: primary column, then local, then remote.
///
/// PID and protocol close out the order so rows that share both addresses
/// still land in a stable position.
#[must_use]
pub fn compare_connections(
    a: &ConnectionRow<'_>,
    b: &ConnectionRow<'_>,
    column: ConnectionSortColumn,
    ascending: bool,
) -> Ordering {
    let (ca, cb) = (a.connection, b.connection);
    let primary = match column {
        ConnectionSortColumn::Process => a.process.cmp(b.process),
        ConnectionSortColumn::Pid => ca.pid.cmp(&cb.pid),
        ConnectionSortColumn::Protocol => ca.protocol.label().cmp(cb.protocol.label()),
        ConnectionSortColumn::Local => compare_addresses(&ca.local, &cb.local),
        ConnectionSortColumn::Remote => compare_addresses(&ca.remote, &cb.remote),
        ConnectionSortColumn::State => ca.state.cmp(&cb.state),
    };
    directed(primary, ascending)
        .then_with(|| compare_addresses(&ca.local, &cb.local))
        .then_with(|| compare_addresses(&ca.remote, &cb.remote))
        .then_with(|| ca.pid.cmp(&cb.pid))
        .then_with(|| ca.protocol.cmp(&cb.protocol))
}

/// Order endpoints by parsed IP then numeric port, so `:9` precedes `:80`.
/// Unparseable endpoints sort after parseable ones, lexically.
#[must_use]
pub fn compare_addresses(a: &str, b: &str) -> Ordering {
    match (parse_endpoint(a), parse_endpoint(b)) {
        (Some(pa), Some(pb)) => pa.cmp(&pb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn parse_endpoint(addr: &str) -> Option<(IpAddr, u16)> {
    let (host, port) = split_host_port(addr)?;
    Some((host.parse().ok()?, port))
}

fn directed(ordering: Ordering, ascending: bool) -> Ordering {
    if ascending { ordering } else { ordering.reverse() }
}
