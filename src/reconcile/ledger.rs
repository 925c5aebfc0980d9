//! TTL-bounded store of recent connection changes.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::diff::Change;
use crate::model::ConnectionKey;

/// Default highlight lifetime for a change.
pub const DEFAULT_CHANGE_TTL: Duration = Duration::from_secs(3);

/// Recent changes keyed by connection identity.
///
/// Size tracks churn inside the TTL window, not the total number of
/// connections, so memory stays flat over long sessions.
#[derive(Debug, Clone, Default)]
pub struct ChangeLedger {
    entries: HashMap<ConnectionKey, Change>,
}

impl ChangeLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold new changes in. A key seen again overwrites its old entry, which
    /// also resets its age.
    pub fn merge(&mut self, changes: HashMap<ConnectionKey, Change>) {
        self.entries.extend(changes);
    }

    /// Evict entries older than `max_age` relative to now.
    pub fn prune(&mut self, max_age: Duration) {
        self.prune_at(Instant::now(), max_age);
    }

    /// Evict entries whose timestamp is before `now - max_age`.
    pub fn prune_at(&mut self, now: Instant, max_age: Duration) {
        self.entries
            .retain(|_, change| now.saturating_duration_since(change.at) <= max_age);
    }

    #[must_use]
    pub fn get(&self, key: &ConnectionKey) -> Option<&Change> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConnectionKey, &Change)> {
        self.entries.iter()
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
