//! Pure update function for the engine state machine.
//!
//! `update()` takes the current model and a message, mutates the model, and
//! returns a command describing any side-effects the runtime should execute.
//! This module performs zero I/O.

use std::time::Instant;

use super::model::{
    EngineCmd, EngineModel, EngineMsg, LastError, StatusLevel, UserCommand, active_filters,
};
use crate::enrich::dns::plan_lookups;
use crate::enrich::signal::{canonical_signal, resolve_target};
use crate::model::Snapshot;
use crate::reconcile::diff;
use crate::view::selection::{clamp_cursor, move_cursor, select_index};
use crate::view::{
    RowFilter, RowSource, ViewLevel, ViewState, VisibleRows, validate_selection, visible_rows,
};

/// Apply a message to the model and return the next command for the runtime.
pub fn update(model: &mut EngineModel, msg: EngineMsg) -> EngineCmd {
    update_at(model, msg, Instant::now())
}

/// [`update`] with an explicit clock, for deterministic callers.
pub fn update_at(model: &mut EngineModel, msg: EngineMsg, now: Instant) -> EngineCmd {
    match msg {
        EngineMsg::Start => {
            let mut cmds = vec![EngineCmd::ScheduleTick(model.config.refresh.interval())];
            if !model.paused {
                cmds.extend(collect_cmds(model));
            }
            if model.config.docker.enabled {
                cmds.push(EngineCmd::ResolveDocker);
            }
            if model.config.update.version_check {
                cmds.push(EngineCmd::CheckVersion);
            }
            EngineCmd::batch(cmds)
        }

        EngineMsg::Tick => {
            // Reschedule first: a failing collection must never stop the cadence.
            let mut cmds = vec![EngineCmd::ScheduleTick(model.config.refresh.interval())];
            model.tick = model.tick.wrapping_add(1);
            if !model.paused {
                cmds.extend(collect_cmds(model));
            }
            model
                .ledger
                .prune_at(now, model.config.changes.highlight_ttl());
            model.prune_status(now, model.config.changes.status_ttl());
            EngineCmd::batch(cmds)
        }

        EngineMsg::SnapshotReady(Ok(snapshot)) => apply_snapshot(model, snapshot, now),

        EngineMsg::SnapshotReady(Err(err)) => {
            model.last_error = Some(LastError::from_error(&err, now));
            EngineCmd::None
        }

        EngineMsg::NetIoReady(Ok(counters)) => {
            model.netio.merge(counters);
            EngineCmd::None
        }

        EngineMsg::NetIoReady(Err(err)) => {
            model.last_error = Some(LastError::from_error(&err, now));
            EngineCmd::None
        }

        EngineMsg::DockerReady(Ok(resolution)) => {
            model.docker.replace(resolution, model.current.as_ref());
            revalidate(model);
            EngineCmd::None
        }

        EngineMsg::DockerReady(Err(err)) => {
            if !err.is_cancellation() {
                model.last_error = Some(LastError::from_error(&err, now));
            }
            EngineCmd::None
        }

        EngineMsg::DnsResolved { ip, hostname } => {
            model.dns_in_flight.remove(&ip);
            match hostname {
                Some(name) => model.dns.insert_resolved(ip, name),
                None => model.dns.insert_failed(ip),
            }
            EngineCmd::None
        }

        EngineMsg::VersionChecked(result) => {
            if let Ok(Some(version)) = result {
                model.update_notice = Some(version);
            }
            EngineCmd::None
        }

        EngineMsg::SignalDelivered(outcome) => {
            let level = if outcome.is_total_failure() {
                StatusLevel::Error
            } else if outcome.failed > 0 {
                StatusLevel::Warning
            } else {
                StatusLevel::Info
            };
            model.set_status(level, outcome.summary(), now);
            EngineCmd::None
        }

        EngineMsg::Command(command) => apply_command(model, command, now),
    }
}

fn collect_cmds(model: &EngineModel) -> Vec<EngineCmd> {
    let timeout = model.config.refresh.collect_timeout();
    vec![
        EngineCmd::CollectSnapshot { timeout },
        EngineCmd::CollectNetIo { timeout },
    ]
}

/// Refresh order: diff against the truly-previous snapshot, merge and
/// prune the ledger, rotate, re-derive virtual rows, validate the selection
/// against the new data, then queue DNS.
fn apply_snapshot(model: &mut EngineModel, snapshot: Snapshot, now: Instant) -> EngineCmd {
    let changes = diff(model.current.as_ref(), Some(&snapshot));
    model.ledger.merge(changes);
    model
        .ledger
        .prune_at(now, model.config.changes.highlight_ttl());

    model.previous = model.current.replace(snapshot);
    model.refreshes += 1;

    model.docker.rebuild(model.current.as_ref());
    revalidate(model);

    if !model.config.dns.enabled {
        return EngineCmd::None;
    }
    let Some(current) = model.current.as_ref() else {
        return EngineCmd::None;
    };
    let ips = plan_lookups(
        current,
        &model.dns,
        &model.dns_in_flight,
        model.config.dns.max_lookups_per_tick,
    );
    if ips.is_empty() {
        return EngineCmd::None;
    }
    model.dns_in_flight.extend(ips.iter().cloned());
    EngineCmd::LookupDns {
        ips,
        timeout: model.config.dns.lookup_timeout(),
    }
}

// ──────────────────── user commands ────────────────────

fn apply_command(model: &mut EngineModel, command: UserCommand, now: Instant) -> EngineCmd {
    match command {
        UserCommand::MoveUp => with_rows(model, |view, rows| move_cursor(view, rows, -1)),
        UserCommand::MoveDown => with_rows(model, |view, rows| move_cursor(view, rows, 1)),
        UserCommand::MovePage(delta) => {
            with_rows(model, |view, rows| move_cursor(view, rows, delta));
        }
        UserCommand::MoveTop => with_rows(model, |view, rows| select_index(view, rows, 0)),
        UserCommand::MoveBottom => with_rows(model, |view, rows| {
            select_index(view, rows, rows.len().saturating_sub(1));
        }),

        UserCommand::DrillIn => {
            if model.view().level != ViewLevel::ProcessList {
                return EngineCmd::None;
            }
            let frame = with_rows(model, |view, rows| {
                rows.application_at(clamp_cursor(view.cursor, rows.len()))
                    .map(|app| match &app.container {
                        Some(id) => {
                            ViewState::container_connections(app.name.as_str(), id.as_str())
                        }
                        None => ViewState::connections(app.name.as_str()),
                    })
            });
            if let Some(frame) = frame {
                model.nav.push(frame);
                revalidate(model);
            }
        }

        UserCommand::ShowAllConnections => {
            if model.view().level != ViewLevel::AllConnections {
                model.nav.push(ViewState::all_connections());
                revalidate(model);
            }
        }

        UserCommand::Back => {
            if model.view().sort_mode {
                model.nav.current_mut().cancel_sort_mode();
            } else if model.nav.pop() {
                revalidate(model);
            }
        }

        UserCommand::SetSearch(query) => {
            model.search = RowFilter::substring(query);
            revalidate(model);
        }

        UserCommand::ClearSearch => {
            model.search = RowFilter::default();
            revalidate(model);
        }

        UserCommand::EnterSortMode => model.nav.current_mut().enter_sort_mode(),
        UserCommand::PickerLeft => model.nav.current_mut().move_picker(false),
        UserCommand::PickerRight => model.nav.current_mut().move_picker(true),
        UserCommand::CancelSort => model.nav.current_mut().cancel_sort_mode(),
        UserCommand::ApplySort => {
            model.nav.current_mut().apply_picker();
            revalidate(model);
        }

        UserCommand::SortBy(column) => {
            if model.nav.current_mut().sort_by(column) {
                revalidate(model);
            } else {
                model.set_status(StatusLevel::Warning, "column not available in this view", now);
            }
        }

        UserCommand::ToggleSortDirection => {
            model.nav.current_mut().toggle_direction();
            revalidate(model);
        }

        UserCommand::Kill(raw) => return kill_selected(model, &raw, now),

        UserCommand::TogglePause => {
            model.paused = !model.paused;
            if model.paused {
                model.set_status(StatusLevel::Info, "refresh paused", now);
            } else {
                model.set_status(StatusLevel::Info, "refresh resumed", now);
                return EngineCmd::batch(collect_cmds(model));
            }
        }

        UserCommand::ForceRefresh => return EngineCmd::batch(collect_cmds(model)),

        UserCommand::RefreshDocker => {
            if model.config.docker.enabled {
                return EngineCmd::ResolveDocker;
            }
        }

        UserCommand::DismissError => model.last_error = None,

        UserCommand::Quit => {
            model.quit = true;
            return EngineCmd::Quit;
        }
    }
    EngineCmd::None
}

fn kill_selected(model: &mut EngineModel, raw: &str, now: Instant) -> EngineCmd {
    let signal = match canonical_signal(raw) {
        Ok(signal) => signal,
        Err(err) => {
            model.set_status(StatusLevel::Error, err.to_string(), now);
            return EngineCmd::None;
        }
    };
    match with_rows(model, |view, rows| resolve_target(view, rows)) {
        Some(target) => EngineCmd::DeliverSignal {
            target,
            signal: signal.to_owned(),
        },
        None => {
            model.set_status(StatusLevel::Warning, "nothing selected", now);
            EngineCmd::None
        }
    }
}

/// Run `f` against the current frame and its visible rows.
///
/// Splits the model borrow so the frame can be mutated while rows borrow
/// the snapshot and caches.
fn with_rows<R>(
    model: &mut EngineModel,
    f: impl FnOnce(&mut ViewState, &VisibleRows<'_>) -> R,
) -> R {
    let EngineModel {
        current,
        docker,
        nav,
        search,
        pinned,
        ..
    } = model;
    let source = RowSource {
        snapshot: current.as_ref(),
        virtual_apps: docker.virtual_apps(),
    };
    let filters = active_filters(search, pinned.as_ref());
    let view = nav.current_mut();
    let rows = visible_rows(source, view, &filters);
    f(view, &rows)
}

fn revalidate(model: &mut EngineModel) {
    with_rows(model, validate_selection);
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;
    use crate::core::config::Config;
    use crate::core::errors::CwError;
    use crate::enrich::{KillOutcome, SignalTarget};
    use crate::model::{Application, Connection, DockerResolution, Protocol, VirtualContainer};
    use crate::reconcile::ChangeKind;
    use crate::view::{ProcessSortColumn, SelectionId, SortColumn};

    fn conn(pid: u32, local: &str, remote: &str, state: &str) -> Connection {
        Connection {
            pid,
            protocol: Protocol::Tcp,
            local: local.into(),
            remote: remote.into(),
            state: state.into(),
            container: None,
        }
    }

    fn app(name: &str, pid: u32, conns: usize) -> Application {
        let conns = (0..conns)
            .map(|i| {
                conn(
                    pid,
                    &format!("10.0.0.1:{}", 30_000 + i),
                    &format!("192.0.2.{}:443", i + 1),
                    "ESTABLISHED",
                )
            })
            .collect();
        Application::from_connections(name, format!("/usr/bin/{name}"), conns)
    }

    fn model() -> EngineModel {
        let mut cfg = Config::default();
        cfg.update.version_check = false;
        cfg.docker.enabled = false;
        EngineModel::new(cfg)
    }

    fn feed(model: &mut EngineModel, apps: Vec<Application>) -> EngineCmd {
        let snap = Snapshot::new(apps, 0);
        let now = snap.completed;
        update_at(model, EngineMsg::SnapshotReady(Ok(snap)), now)
    }

    fn cmd(model: &mut EngineModel, command: UserCommand) -> EngineCmd {
        update(model, EngineMsg::Command(command))
    }

    fn selected(model: &EngineModel) -> Option<&str> {
        match &model.view().selection {
            Some(SelectionId::Process(name)) => Some(name),
            _ => None,
        }
    }

    #[test]
    fn start_requests_collection_and_enrichment() {
        let mut model = EngineModel::new(Config::default());
        let cmds = update(&mut model, EngineMsg::Start).flatten();
        assert!(matches!(cmds[0], EngineCmd::ScheduleTick(_)));
        assert!(cmds.iter().any(|c| matches!(c, EngineCmd::CollectSnapshot { .. })));
        assert!(cmds.contains(&EngineCmd::ResolveDocker));
        assert!(cmds.contains(&EngineCmd::CheckVersion));
    }

    #[test]
    fn tick_reschedules_even_after_failed_collection() {
        let mut model = model();
        update(
            &mut model,
            EngineMsg::SnapshotReady(Err(CwError::Timeout {
                source_name: "collector",
                after_ms: 5_000,
            })),
        );
        assert_eq!(model.last_error.as_ref().map(|e| e.code), Some("CW-2002"));

        let cmds = update(&mut model, EngineMsg::Tick).flatten();
        assert_eq!(
            cmds[0],
            EngineCmd::ScheduleTick(model.config.refresh.interval())
        );
        assert_eq!(
            cmds[1],
            EngineCmd::CollectSnapshot {
                timeout: Duration::from_secs(5)
            }
        );
        assert_eq!(model.tick, 1);
    }

    #[test]
    fn paused_tick_only_reschedules() {
        let mut model = model();
        cmd(&mut model, UserCommand::TogglePause);
        let cmds = update(&mut model, EngineMsg::Tick).flatten();
        assert_eq!(cmds.len(), 1);
        assert!(matches!(cmds[0], EngineCmd::ScheduleTick(_)));

        let resumed = cmd(&mut model, UserCommand::TogglePause).flatten();
        assert!(resumed.iter().any(|c| matches!(c, EngineCmd::CollectSnapshot { .. })));
    }

    #[test]
    fn failed_collection_keeps_last_good_snapshot() {
        let mut model = model();
        feed(&mut model, vec![app("sshd", 10, 1)]);
        update(
            &mut model,
            EngineMsg::SnapshotReady(Err(CwError::PermissionDenied {
                details: "/proc/1/fd".into(),
            })),
        );
        assert_eq!(model.visible_rows().len(), 1);
        assert!(model.last_error.is_some());
        cmd(&mut model, UserCommand::DismissError);
        assert!(model.last_error.is_none());
    }

    #[test]
    fn refresh_records_added_and_removed_connections() {
        let mut model = model();
        feed(&mut model, vec![app("curl", 7, 2)]);
        assert!(model.ledger.is_empty(), "first snapshot has nothing to diff");

        let mut next = app("curl", 7, 1);
        next.connections
            .push(conn(7, "10.0.0.1:40000", "198.51.100.1:80", "ESTABLISHED"));
        feed(&mut model, vec![next]);

        let kinds: Vec<ChangeKind> = model.ledger.iter().map(|(_, c)| c.kind).collect();
        assert_eq!(kinds.len(), 2);
        assert!(kinds.contains(&ChangeKind::Added));
        assert!(kinds.contains(&ChangeKind::Removed));
        assert!(model.previous.is_some());
        assert_eq!(model.refreshes, 2);
    }

    #[test]
    fn ledger_entries_expire_on_tick() {
        let mut model = model();
        feed(&mut model, vec![]);
        let snap = Snapshot::new(vec![app("dig", 3, 1)], 0);
        let t0 = snap.completed;
        update_at(&mut model, EngineMsg::SnapshotReady(Ok(snap)), t0);
        assert_eq!(model.ledger.len(), 1);

        update_at(&mut model, EngineMsg::Tick, t0 + Duration::from_secs(2));
        assert_eq!(model.ledger.len(), 1);
        update_at(&mut model, EngineMsg::Tick, t0 + Duration::from_secs(4));
        assert!(model.ledger.is_empty());
    }

    #[test]
    fn dns_lookups_are_capped_and_tracked_in_flight() {
        let mut model = model();
        let cmd1 = feed(&mut model, vec![app("browser", 1, 15)]);
        let EngineCmd::LookupDns { ips, timeout } = cmd1 else {
            panic!("expected lookups");
        };
        assert_eq!(ips.len(), 10);
        assert_eq!(timeout, Duration::from_secs(2));
        assert_eq!(model.dns_in_flight.len(), 10);

        let cmd2 = feed(&mut model, vec![app("browser", 1, 15)]);
        let EngineCmd::LookupDns { ips: rest, .. } = cmd2 else {
            panic!("expected deferred lookups");
        };
        assert_eq!(rest.len(), 5);
        assert!(rest.iter().all(|ip| !ips.contains(ip)));

        update(
            &mut model,
            EngineMsg::DnsResolved {
                ip: ips[0].clone(),
                hostname: Some("a.example".into()),
            },
        );
        update(
            &mut model,
            EngineMsg::DnsResolved {
                ip: ips[1].clone(),
                hostname: None,
            },
        );
        assert_eq!(model.dns_in_flight.len(), 13);
        assert_eq!(model.dns.hostname(&ips[0]), Some("a.example"));
        assert!(model.dns.contains(&ips[1]));
        assert_eq!(model.dns.hostname(&ips[1]), None);
    }

    #[test]
    fn selection_follows_process_through_resort_and_refresh() {
        let mut model = model();
        feed(
            &mut model,
            vec![app("alpha", 30, 1), app("bravo", 10, 1), app("charlie", 20, 1)],
        );
        cmd(&mut model, UserCommand::MoveDown);
        assert_eq!(selected(&model), Some("bravo"));

        cmd(&mut model, UserCommand::SortBy(SortColumn::Process(ProcessSortColumn::Pid)));
        assert_eq!(model.view().cursor, 0);
        assert_eq!(selected(&model), Some("bravo"));

        feed(&mut model, vec![app("alpha", 30, 1), app("bravo", 40, 1)]);
        assert_eq!(model.view().cursor, 1);
        assert_eq!(selected(&model), Some("bravo"));
    }

    #[test]
    fn vanished_selection_clamps_to_last_row() {
        let mut model = model();
        feed(&mut model, vec![app("a", 1, 1), app("b", 2, 1), app("c", 3, 1)]);
        cmd(&mut model, UserCommand::MoveBottom);
        assert_eq!(selected(&model), Some("c"));

        feed(&mut model, vec![app("a", 1, 1), app("b", 2, 1)]);
        assert_eq!(model.view().cursor, 1);
        assert_eq!(selected(&model), Some("b"));
    }

    #[test]
    fn filter_to_nothing_then_clear() {
        let mut model = model();
        feed(&mut model, vec![app("nginx", 1, 1), app("sshd", 2, 1)]);
        cmd(&mut model, UserCommand::MoveDown);

        cmd(&mut model, UserCommand::SetSearch("zzz".into()));
        assert!(model.visible_rows().is_empty());
        assert_eq!(model.view().cursor, 0);
        assert_eq!(model.view().selection, None);

        cmd(&mut model, UserCommand::ClearSearch);
        assert_eq!(model.visible_rows().len(), 2);
        assert_eq!(selected(&model), Some("nginx"));
    }

    #[test]
    fn drill_in_and_back_restore_prior_frame() {
        let mut model = model();
        feed(&mut model, vec![app("a", 1, 1), app("b", 2, 3)]);
        cmd(&mut model, UserCommand::MoveDown);
        cmd(&mut model, UserCommand::DrillIn);
        assert_eq!(model.view().level, ViewLevel::Connections);
        assert_eq!(model.view().process.as_deref(), Some("b"));
        assert_eq!(model.visible_rows().len(), 3);

        cmd(&mut model, UserCommand::MoveBottom);
        assert_eq!(model.view().cursor, 2);

        cmd(&mut model, UserCommand::Back);
        assert_eq!(model.nav.depth(), 1);
        assert_eq!(model.view().cursor, 1);
        assert_eq!(selected(&model), Some("b"));

        cmd(&mut model, UserCommand::Back);
        assert_eq!(model.nav.depth(), 1, "back at the root is inert");
    }

    #[test]
    fn back_closes_sort_picker_before_popping() {
        let mut model = model();
        feed(&mut model, vec![app("a", 1, 2)]);
        cmd(&mut model, UserCommand::DrillIn);
        cmd(&mut model, UserCommand::EnterSortMode);
        cmd(&mut model, UserCommand::Back);
        assert_eq!(model.nav.depth(), 2);
        assert!(!model.view().sort_mode);
    }

    #[test]
    fn connection_cursor_clamps_when_list_shrinks() {
        let mut model = model();
        feed(&mut model, vec![app("worker", 5, 4)]);
        cmd(&mut model, UserCommand::ShowAllConnections);
        cmd(&mut model, UserCommand::MoveBottom);
        assert_eq!(model.view().cursor, 3);

        feed(&mut model, vec![app("worker", 5, 2)]);
        assert_eq!(model.view().cursor, 1);
        feed(&mut model, vec![]);
        assert_eq!(model.view().cursor, 0);
    }

    #[test]
    fn rejected_sort_column_sets_status() {
        let mut model = model();
        cmd(
            &mut model,
            UserCommand::SortBy(SortColumn::Connection(
                crate::view::ConnectionSortColumn::Remote,
            )),
        );
        assert_eq!(model.status.as_ref().map(|s| s.level), Some(StatusLevel::Warning));
    }

    #[test]
    fn kill_resolves_target_from_selected_row() {
        let mut model = model();
        feed(&mut model, vec![app("a", 1, 1), app("b", 2, 1)]);
        cmd(&mut model, UserCommand::MoveDown);
        assert_eq!(
            cmd(&mut model, UserCommand::Kill("term".into())),
            EngineCmd::DeliverSignal {
                target: SignalTarget::Pids(vec![2]),
                signal: "SIGTERM".into(),
            }
        );

        assert_eq!(cmd(&mut model, UserCommand::Kill("bogus".into())), EngineCmd::None);
        assert_eq!(model.status.as_ref().map(|s| s.level), Some(StatusLevel::Error));
    }

    #[test]
    fn kill_on_empty_list_is_inert() {
        let mut model = model();
        assert_eq!(cmd(&mut model, UserCommand::Kill("KILL".into())), EngineCmd::None);
        assert_eq!(
            model.status.as_ref().map(|s| s.text.as_str()),
            Some("nothing selected")
        );
    }

    #[test]
    fn partial_signal_failure_is_a_warning() {
        let mut model = model();
        update(
            &mut model,
            EngineMsg::SignalDelivered(KillOutcome {
                target: SignalTarget::Pids(vec![1, 2]),
                signal: "SIGTERM".into(),
                delivered: 1,
                failed: 1,
                errors: vec!["denied".into()],
            }),
        );
        let status = model.status.as_ref().unwrap();
        assert_eq!(status.level, StatusLevel::Warning);
        assert!(status.text.contains("1 of 2"));
    }

    #[test]
    fn docker_resolution_adds_virtual_rows() {
        let mut model = model();
        model.config.docker.enabled = true;
        feed(&mut model, vec![app("nginx", 1, 1)]);
        update(
            &mut model,
            EngineMsg::DockerReady(Ok(DockerResolution {
                ports: HashMap::new(),
                containers: vec![VirtualContainer {
                    id: "deadbeef".into(),
                    name: "redis".into(),
                    image: "redis:7".into(),
                    host_ports: vec![6379],
                }],
            })),
        );
        assert_eq!(model.visible_rows().len(), 2);
        assert_eq!(cmd(&mut model, UserCommand::RefreshDocker), EngineCmd::ResolveDocker);

        update(
            &mut model,
            EngineMsg::DockerReady(Err(CwError::Cancelled {
                source_name: "docker",
            })),
        );
        assert!(model.last_error.is_none());
        assert_eq!(model.visible_rows().len(), 2);
    }

    #[test]
    fn container_named_like_a_process_keeps_selection_kill_and_drill_in() {
        let mut model = model();
        model.config.docker.enabled = true;
        let proxy = Application::from_connections(
            "docker-proxy",
            "/usr/bin/docker-proxy",
            vec![conn(500, "0.0.0.0:8080", "", "LISTEN")],
        );
        let apps = vec![app("nginx", 1, 1), proxy];
        feed(&mut model, apps.clone());
        update(
            &mut model,
            EngineMsg::DockerReady(Ok(DockerResolution {
                ports: HashMap::new(),
                containers: vec![VirtualContainer {
                    id: "c0ffee".into(),
                    name: "nginx".into(),
                    image: "nginx:1".into(),
                    host_ports: vec![8080],
                }],
            })),
        );
        assert_eq!(model.visible_rows().len(), 3);

        cmd(&mut model, UserCommand::MoveBottom);
        assert_eq!(model.view().cursor, 2);
        assert_eq!(
            model.view().selection,
            Some(SelectionId::Container("c0ffee".into()))
        );

        feed(&mut model, apps);
        assert_eq!(model.view().cursor, 2);
        assert_eq!(
            cmd(&mut model, UserCommand::Kill("term".into())),
            EngineCmd::DeliverSignal {
                target: SignalTarget::Container("c0ffee".into()),
                signal: "SIGTERM".into(),
            }
        );

        cmd(&mut model, UserCommand::DrillIn);
        assert_eq!(model.view().container.as_deref(), Some("c0ffee"));
        let pids: Vec<u32> = match model.visible_rows() {
            VisibleRows::Connections(rows) => rows.iter().map(|r| r.connection.pid).collect(),
            VisibleRows::Processes(_) => Vec::new(),
        };
        assert_eq!(pids, vec![500]);

        cmd(&mut model, UserCommand::Back);
        cmd(&mut model, UserCommand::MoveUp);
        cmd(&mut model, UserCommand::DrillIn);
        assert_eq!(model.view().container, None);
        assert_eq!(model.view().process.as_deref(), Some("nginx"));
        assert_eq!(model.visible_rows().connection_at(0).map(|r| r.connection.pid), Some(1));
    }

    #[test]
    fn version_notice_is_recorded_and_failures_ignored() {
        let mut model = model();
        update(
            &mut model,
            EngineMsg::VersionChecked(Err(CwError::Runtime {
                details: "offline".into(),
            })),
        );
        assert!(model.update_notice.is_none());
        assert!(model.last_error.is_none());
        update(&mut model, EngineMsg::VersionChecked(Ok(Some("0.4.0".into()))));
        assert_eq!(model.update_notice.as_deref(), Some("0.4.0"));
    }

    #[test]
    fn quit_sets_flag() {
        let mut model = model();
        assert_eq!(cmd(&mut model, UserCommand::Quit), EngineCmd::Quit);
        assert!(model.quit);
    }
}
