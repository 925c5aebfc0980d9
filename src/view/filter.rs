//! Pure row predicates: interactive substring search and exact-port filters.

use serde::{Deserialize, Serialize};

use super::sort::ConnectionRow;
use crate::model::{Application, Connection};

/// How a filter query is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Case-insensitive substring across name, PIDs, addresses, protocol,
    /// and state.
    #[default]
    Substring,
    /// Query is a port number matched exactly against local and remote
    /// ports; `80` never matches `8080`.
    ExactPort,
}

/// A query plus its interpretation. An empty query matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFilter {
    pub query: String,
    pub mode: FilterMode,
}

impl RowFilter {
    #[must_use]
    pub fn substring(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            mode: FilterMode::Substring,
        }
    }

    #[must_use]
    pub fn exact_port(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            mode: FilterMode::ExactPort,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty()
    }

    /// Whether one connection, owned by `process`, passes the filter.
    #[must_use]
    pub fn matches_connection(&self, process: &str, conn: &Connection) -> bool {
        if self.is_empty() {
            return true;
        }
        match self.mode {
            FilterMode::Substring => {
                let needle = self.query.trim().to_lowercase();
                connection_matches_substring(process, conn, &needle)
            }
            FilterMode::ExactPort => match parse_port(&self.query) {
                Some(port) => connection_matches_port(conn, port),
                None => false,
            },
        }
    }

    /// Whether an application row passes: its own fields match, or any of
    /// its connections does.
    #[must_use]
    pub fn matches_application(&self, app: &Application) -> bool {
        if self.is_empty() {
            return true;
        }
        match self.mode {
            FilterMode::Substring => {
                let needle = self.query.trim().to_lowercase();
                contains_folded(&app.name, &needle)
                    || contains_folded(&app.exe_path, &needle)
                    || app.pids.iter().any(|pid| pid.to_string().contains(&needle))
                    || app
                        .connections
                        .iter()
                        .any(|c| connection_matches_substring(&app.name, c, &needle))
            }
            FilterMode::ExactPort => parse_port(&self.query).is_some_and(|port| {
                app.connections
                    .iter()
                    .any(|c| connection_matches_port(c, port))
            }),
        }
    }
}

/// Keep the applications that pass every filter.
#[must_use]
pub fn filter_processes<'a>(rows: &[&'a Application], filters: &[&RowFilter]) -> Vec<&'a Application> {
    rows.iter()
        .copied()
        .filter(|app| filters.iter().all(|f| f.matches_application(app)))
        .collect()
}

/// Keep the connection rows that pass every filter.
#[must_use]
pub fn filter_connections<'a>(
    rows: &[ConnectionRow<'a>],
    filters: &[&RowFilter],
) -> Vec<ConnectionRow<'a>> {
    rows.iter()
        .copied()
        .filter(|row| {
            filters
                .iter()
                .all(|f| f.matches_connection(row.process, row.connection))
        })
        .collect()
}

fn connection_matches_substring(process: &str, conn: &Connection, needle: &str) -> bool {
    contains_folded(process, needle)
        || conn.pid.to_string().contains(needle)
        || contains_folded(&conn.local, needle)
        || contains_folded(&conn.remote, needle)
        || conn.protocol.label().contains(needle)
        || contains_folded(&conn.state, needle)
        || conn
            .container
            .as_ref()
            .is_some_and(|c| contains_folded(&c.container_name, needle))
}

fn connection_matches_port(conn: &Connection, port: u16) -> bool {
    conn.local_port() == Some(port) || conn.remote_port() == Some(port)
}

fn contains_folded(haystack: &str, folded_needle: &str) -> bool {
    haystack.to_lowercase().contains(folded_needle)
}

fn parse_port(raw: &str) -> Option<u16> {
    let raw = raw.trim();
    raw.strip_prefix(':').unwrap_or(raw).parse().ok()
}
