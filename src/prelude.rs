//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use connwatch::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{CwError, Result};

// Model
pub use crate::model::{
    Application, ByteCounters, Connection, ConnectionKey, DockerResolution, Protocol, Snapshot,
};

// Reconciliation
pub use crate::reconcile::{Change, ChangeKind, ChangeLedger, diff};

// View
pub use crate::view::{
    ConnectionSortColumn, NavigationStack, ProcessSortColumn, RowFilter, SelectionId, SortColumn,
    ViewLevel, ViewState, VisibleRows, visible_rows,
};

// Enrichment
pub use crate::enrich::{
    Collaborators, Collector, DnsResolver, DockerResolver, KillOutcome, NetIoCollector,
    RequestContext, SignalSender, SignalTarget, VersionChecker,
};

// Engine
pub use crate::engine::{
    Applied, EngineCmd, EngineHandle, EngineModel, EngineMsg, EngineRuntime, UserCommand, update,
};

// Logging
pub use crate::logger::{ActivityEvent, ActivityLoggerHandle, JsonlConfig, spawn_logger};
