//! Reverse-DNS planning: which IPs to look up this tick.

use std::collections::HashSet;

use crate::model::Snapshot;
use crate::model::snapshot::host_of;

use super::cache::DnsCache;

/// Default per-tick cap on concurrent lookups.
pub const DEFAULT_MAX_LOOKUPS_PER_TICK: usize = 10;

/// IP portion of a remote endpoint, or `None` for empty and wildcard
/// addresses that have nothing to resolve.
#[must_use]
pub fn extract_ip(remote: &str) -> Option<&str> {
    let host = host_of(remote);
    match host {
        "" | "*" | "0.0.0.0" | "::" | "0:0:0:0:0:0:0:0" => None,
        _ => Some(host),
    }
}

/// Pick at most `limit` distinct IPs from `snapshot` that still need a
/// lookup, in collection order.
///
/// Skips IPs already cached (negative entries included) and IPs with a lookup
/// in flight. Anything past `limit` is left for a later tick.
#[must_use]
pub fn plan_lookups(
    snapshot: &Snapshot,
    cache: &DnsCache,
    in_flight: &HashSet<String>,
    limit: usize,
) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut planned = Vec::new();
    for conn in snapshot.connections() {
        if planned.len() >= limit {
            break;
        }
        let Some(ip) = extract_ip(&conn.remote) else {
            continue;
        };
        if cache.contains(ip) || in_flight.contains(ip) || !seen.insert(ip) {
            continue;
        }
        planned.push(ip.to_owned());
    }
    planned
}
