//! Elm-style state model for the reconciliation engine.
//!
//! All live state lives in [`EngineModel`]. Background results and user
//! input arrive as [`EngineMsg`] values; side-effects are described by
//! [`EngineCmd`] values returned from [`super::update::update`]. Nothing in
//! this module performs I/O.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::core::config::Config;
use crate::core::errors::{CwError, Result};
use crate::enrich::{DnsCache, DockerCache, KillOutcome, NetIoCache, SignalTarget};
use crate::model::{Application, ByteCounters, Connection, DockerResolution, Snapshot};
use crate::reconcile::{Change, ChangeLedger};
use crate::view::{
    NavigationStack, RowFilter, RowSource, SortColumn, ViewState, VisibleRows, visible_rows,
};

// ──────────────────── status ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// Auto-expiring one-line message (signal results, toggles).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
    pub at: Instant,
}

/// Most recent collection failure; stays until dismissed or replaced by a
/// newer failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
    pub at: Instant,
}

impl LastError {
    #[must_use]
    pub fn from_error(err: &CwError, at: Instant) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            retryable: err.is_retryable(),
            at,
        }
    }
}

// ──────────────────── model ────────────────────

/// Complete engine state, owned by the single consumer loop.
#[derive(Debug)]
pub struct EngineModel {
    pub config: Config,
    pub current: Option<Snapshot>,
    pub previous: Option<Snapshot>,
    pub ledger: ChangeLedger,
    pub nav: NavigationStack,
    pub dns: DnsCache,
    /// IPs with a lookup outstanding.
    pub dns_in_flight: HashSet<String>,
    pub netio: NetIoCache,
    pub docker: DockerCache,
    /// Interactive search query.
    pub search: RowFilter,
    /// Exact-port filter pinned from configuration.
    pub pinned: Option<RowFilter>,
    pub status: Option<StatusMessage>,
    pub last_error: Option<LastError>,
    pub update_notice: Option<String>,
    pub paused: bool,
    pub tick: u64,
    /// Successfully applied snapshots.
    pub refreshes: u64,
    pub quit: bool,
}

impl EngineModel {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let root = ViewState::process_list(config.view.process_sort, config.view.ascending);
        let pinned = config
            .view
            .port_filter
            .map(|port| RowFilter::exact_port(port.to_string()));
        let paused = config.refresh.start_paused;
        Self {
            config,
            current: None,
            previous: None,
            ledger: ChangeLedger::new(),
            nav: NavigationStack::new(root),
            dns: DnsCache::new(),
            dns_in_flight: HashSet::new(),
            netio: NetIoCache::new(),
            docker: DockerCache::new(),
            search: RowFilter::default(),
            pinned,
            status: None,
            last_error: None,
            update_notice: None,
            paused,
            tick: 0,
            refreshes: 0,
            quit: false,
        }
    }

    #[must_use]
    pub fn view(&self) -> &ViewState {
        self.nav.current()
    }

    /// Non-empty filters currently in force.
    #[must_use]
    pub fn filters(&self) -> Vec<&RowFilter> {
        active_filters(&self.search, self.pinned.as_ref())
    }

    #[must_use]
    pub fn row_source(&self) -> RowSource<'_> {
        RowSource {
            snapshot: self.current.as_ref(),
            virtual_apps: self.docker.virtual_apps(),
        }
    }

    /// Filtered and sorted rows of the current frame.
    #[must_use]
    pub fn visible_rows(&self) -> VisibleRows<'_> {
        visible_rows(self.row_source(), self.view(), &self.filters())
    }

    /// Highlight state of a connection, if it changed recently.
    #[must_use]
    pub fn change_for(&self, connection: &Connection) -> Option<&Change> {
        self.ledger.get(&connection.key())
    }

    /// Summed byte counters over an application's processes.
    #[must_use]
    pub fn bytes_for_app(&self, app: &Application) -> ByteCounters {
        self.netio.total_for(&app.pids)
    }

    /// Hostname for a remote address's IP, when one was resolved.
    #[must_use]
    pub fn hostname_for(&self, remote: &str) -> Option<&str> {
        crate::enrich::dns::extract_ip(remote).and_then(|ip| self.dns.hostname(ip))
    }

    pub fn set_status(&mut self, level: StatusLevel, text: impl Into<String>, at: Instant) {
        self.status = Some(StatusMessage {
            level,
            text: text.into(),
            at,
        });
    }

    /// Drop the status line once it is older than `ttl`.
    pub fn prune_status(&mut self, now: Instant, ttl: Duration) {
        if self
            .status
            .as_ref()
            .is_some_and(|s| now.saturating_duration_since(s.at) > ttl)
        {
            self.status = None;
        }
    }
}

pub(crate) fn active_filters<'a>(
    search: &'a RowFilter,
    pinned: Option<&'a RowFilter>,
) -> Vec<&'a RowFilter> {
    std::iter::once(search)
        .chain(pinned)
        .filter(|f| !f.is_empty())
        .collect()
}

// ──────────────────── input ────────────────────

/// Operator intents, already decoded from key presses by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    MoveUp,
    MoveDown,
    MoveTop,
    MoveBottom,
    /// Move by a page of `rows` (negative moves up).
    MovePage(isize),
    /// Open the selected application's connections.
    DrillIn,
    ShowAllConnections,
    Back,
    SetSearch(String),
    ClearSearch,
    EnterSortMode,
    PickerLeft,
    PickerRight,
    ApplySort,
    CancelSort,
    SortBy(SortColumn),
    ToggleSortDirection,
    /// Send the named signal to the selected row's target.
    Kill(String),
    TogglePause,
    ForceRefresh,
    RefreshDocker,
    DismissError,
    Quit,
}

// ──────────────────── messages ────────────────────

/// Messages that drive the engine state machine.
#[derive(Debug)]
pub enum EngineMsg {
    /// First message after start-up.
    Start,
    Tick,
    SnapshotReady(Result<Snapshot>),
    NetIoReady(Result<std::collections::HashMap<u32, ByteCounters>>),
    DockerReady(Result<DockerResolution>),
    /// One finished reverse lookup; `None` records a failure.
    DnsResolved { ip: String, hostname: Option<String> },
    VersionChecked(Result<Option<String>>),
    SignalDelivered(KillOutcome),
    Command(UserCommand),
}

// ──────────────────── commands ────────────────────

/// Side-effects requested by the update function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCmd {
    None,
    Batch(Vec<EngineCmd>),
    ScheduleTick(Duration),
    CollectSnapshot { timeout: Duration },
    CollectNetIo { timeout: Duration },
    ResolveDocker,
    CheckVersion,
    LookupDns { ips: Vec<String>, timeout: Duration },
    DeliverSignal { target: SignalTarget, signal: String },
    Quit,
}

impl EngineCmd {
    /// Collapse a list of commands, dropping `None`s.
    #[must_use]
    pub fn batch(cmds: Vec<Self>) -> Self {
        let mut cmds: Vec<Self> = cmds.into_iter().filter(|c| *c != Self::None).collect();
        match cmds.len() {
            0 => Self::None,
            1 => cmds.remove(0),
            _ => Self::Batch(cmds),
        }
    }

    /// Flatten nested batches into execution order.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::None => Vec::new(),
            Self::Batch(cmds) => cmds.into_iter().flat_map(Self::flatten).collect(),
            other => vec![other],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Protocol;
    use crate::view::{ProcessSortColumn, ViewLevel};

    #[test]
    fn new_model_reflects_config() {
        let mut cfg = Config::default();
        cfg.view.process_sort = ProcessSortColumn::Pid;
        cfg.view.ascending = false;
        cfg.view.port_filter = Some(443);
        cfg.refresh.start_paused = true;

        let model = EngineModel::new(cfg);
        assert_eq!(model.view().level, ViewLevel::ProcessList);
        assert_eq!(model.view().process_sort(), ProcessSortColumn::Pid);
        assert!(!model.view().ascending);
        assert!(model.paused);
        assert_eq!(model.filters().len(), 1);
        assert_eq!(model.filters()[0].query, "443");
        assert!(model.visible_rows().is_empty());
    }

    #[test]
    fn empty_search_is_not_an_active_filter() {
        let mut model = EngineModel::new(Config::default());
        assert!(model.filters().is_empty());
        model.search = RowFilter::substring("  ");
        assert!(model.filters().is_empty());
        model.search = RowFilter::substring("ssh");
        assert_eq!(model.filters().len(), 1);
    }

    #[test]
    fn status_expires_after_ttl() {
        let mut model = EngineModel::new(Config::default());
        let t0 = Instant::now();
        model.set_status(StatusLevel::Info, "paused", t0);
        model.prune_status(t0 + Duration::from_secs(3), Duration::from_secs(3));
        assert!(model.status.is_some());
        model.prune_status(t0 + Duration::from_millis(3_001), Duration::from_secs(3));
        assert!(model.status.is_none());
    }

    #[test]
    fn bytes_and_hostnames_are_looked_up_through_caches() {
        let mut model = EngineModel::new(Config::default());
        model.netio.merge(std::collections::HashMap::from([
            (1, ByteCounters { sent: 5, received: 7 }),
            (2, ByteCounters { sent: 1, received: 1 }),
        ]));
        model.dns.insert_resolved("203.0.113.9", "example.net");
        let app = Application::from_connections(
            "nginx",
            "/usr/sbin/nginx",
            [1, 2]
                .into_iter()
                .map(|pid| Connection {
                    pid,
                    protocol: Protocol::Tcp,
                    local: "0.0.0.0:80".into(),
                    remote: "203.0.113.9:51000".into(),
                    state: "ESTABLISHED".into(),
                    container: None,
                })
                .collect(),
        );
        assert_eq!(model.bytes_for_app(&app), ByteCounters { sent: 6, received: 8 });
        assert_eq!(model.hostname_for("203.0.113.9:51000"), Some("example.net"));
        assert_eq!(model.hostname_for("198.51.100.1:80"), None);
    }

    #[test]
    fn batch_collapses_and_flattens() {
        assert_eq!(EngineCmd::batch(vec![EngineCmd::None]), EngineCmd::None);
        assert_eq!(
            EngineCmd::batch(vec![EngineCmd::None, EngineCmd::ResolveDocker]),
            EngineCmd::ResolveDocker
        );
        let nested = EngineCmd::Batch(vec![
            EngineCmd::ScheduleTick(Duration::from_secs(1)),
            EngineCmd::Batch(vec![EngineCmd::ResolveDocker, EngineCmd::None]),
        ]);
        assert_eq!(
            nested.flatten(),
            vec![
                EngineCmd::ScheduleTick(Duration::from_secs(1)),
                EngineCmd::ResolveDocker
            ]
        );
    }
}
