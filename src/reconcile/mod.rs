//! Snapshot reconciliation: diffing consecutive generations and keeping a
//! short-lived ledger of what changed.

#![allow(missing_docs)]

pub mod diff;
pub mod ledger;

pub use diff::{Change, ChangeKind, diff};
pub use ledger::{ChangeLedger, DEFAULT_CHANGE_TTL};
