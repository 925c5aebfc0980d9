#![forbid(unsafe_code)]

//! connwatch — live-state reconciliation engine for a terminal network
//! connection monitor.
//!
//! The engine keeps a browsable, sorted, filtered view of which processes
//! own which sockets and stays coherent while the underlying data refreshes
//! every tick:
//! 1. **Reconciliation** — consecutive snapshots are diffed and each
//!    appearance or disappearance is highlighted for a few seconds
//! 2. **Browsing** — a navigation stack of process and connection views, each
//!    with its own sort, filter, and selection that survive re-sorting
//! 3. **Enrichment** — reverse DNS, per-process byte counters, and Docker port
//!    attribution fold in asynchronously without stalling the view
//!
//! # Library usage
//!
//! ```rust,no_run
//! use connwatch::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use connwatch::core::config::Config;
//! use connwatch::engine::{EngineModel, EngineMsg, update};
//! ```

pub mod prelude;

pub mod core;
pub mod engine;
pub mod enrich;
pub mod logger;
pub mod model;
pub mod reconcile;
pub mod view;
