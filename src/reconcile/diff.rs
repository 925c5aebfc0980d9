//! Snapshot differ: symmetric difference of connection identities.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::model::{ConnectionKey, Snapshot};

/// Direction of a connection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Removed,
}

/// One recent change, stamped with the collection-completion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
    pub kind: ChangeKind,
    pub at: Instant,
}

/// Compare two snapshots and report which connection keys appeared or
/// vanished.
///
/// Either side may be absent (first tick); the result is then empty. Keys
/// present in both produce nothing. Every change carries `curr.completed`.
///
/// A connection that closes and reopens with an identical key between two
/// collections is invisible here.
#[must_use]
pub fn diff(
    prev: Option<&Snapshot>,
    curr: Option<&Snapshot>,
) -> HashMap<ConnectionKey, Change> {
    let (Some(prev), Some(curr)) = (prev, curr) else {
        return HashMap::new();
    };
    let at = curr.completed;

    let prev_keys: HashSet<ConnectionKey> = prev.connections().map(|c| c.key()).collect();
    let curr_keys: HashSet<ConnectionKey> = curr.connections().map(|c| c.key()).collect();

    let mut changes = HashMap::new();
    for key in curr_keys.difference(&prev_keys) {
        changes.insert(
            key.clone(),
            Change {
                kind: ChangeKind::Added,
                at,
            },
        );
    }
    for key in prev_keys.difference(&curr_keys) {
        changes.insert(
            key.clone(),
            Change {
                kind: ChangeKind::Removed,
                at,
            },
        );
    }
    changes
}
