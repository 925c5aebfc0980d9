//! Property-based tests for the reconciliation invariants.
//!
//! Arbitrary snapshots and arbitrary interleavings of refreshes, ticks, and
//! operator commands must keep the cursor in bounds, the differ exact, and
//! the sort order independent of input order.

use std::collections::HashSet;

use proptest::prelude::*;

use super::model::{EngineModel, EngineMsg, UserCommand};
use super::update::update;
use crate::core::config::Config;
use crate::model::{Application, Connection, ConnectionKey, Protocol, Snapshot};
use crate::reconcile::{ChangeKind, diff};
use crate::view::filter::filter_processes;
use crate::view::sort::{ConnectionRow, sort_connections, sort_processes};
use crate::view::{
    ConnectionSortColumn, ProcessSortColumn, RowFilter, SortColumn, ViewLevel,
};

// ──────────────────── strategies ────────────────────

const NAMES: [&str; 5] = ["curl", "nginx", "postgres", "redis", "sshd"];

fn arb_connection(pid: u32) -> impl Strategy<Value = Connection> {
    (
        0u16..6,
        0u8..4,
        any::<bool>(),
        prop_oneof![Just(Protocol::Tcp), Just(Protocol::Udp)],
    )
        .prop_map(move |(port, host, listen, protocol)| Connection {
            pid,
            protocol,
            local: format!("10.0.0.1:{}", 8_000 + port),
            remote: if listen {
                String::new()
            } else {
                format!("192.0.2.{}:443", host + 1)
            },
            state: if listen { "LISTEN" } else { "ESTABLISHED" }.into(),
            container: None,
        })
}

/// PIDs are drawn from a per-name band so a PID always identifies its
/// application.
fn arb_app(index: usize, name: &'static str) -> impl Strategy<Value = Application> {
    let band = u32::try_from(index).unwrap_or(0) * 100;
    (band + 1..band + 100).prop_flat_map(move |pid| {
        prop::collection::vec(arb_connection(pid), 0..4).prop_map(move |conns| {
            Application::from_connections(name, format!("/usr/bin/{name}"), conns)
        })
    })
}

fn arb_snapshot() -> impl Strategy<Value = Snapshot> {
    prop::sample::subsequence((0..NAMES.len()).collect::<Vec<_>>(), 0..=NAMES.len())
        .prop_flat_map(|picked| {
            picked
                .into_iter()
                .map(|i| arb_app(i, NAMES[i]))
                .collect::<Vec<_>>()
        })
        .prop_map(|apps| Snapshot::new(apps, 0))
}

fn arb_column() -> impl Strategy<Value = SortColumn> {
    let process = ProcessSortColumn::ALL.into_iter().map(SortColumn::Process);
    let connection = ConnectionSortColumn::ALL
        .into_iter()
        .map(SortColumn::Connection);
    prop::sample::select(process.chain(connection).collect::<Vec<_>>())
}

fn arb_command() -> impl Strategy<Value = UserCommand> {
    let fixed = prop::sample::select(vec![
        UserCommand::MoveUp,
        UserCommand::MoveDown,
        UserCommand::MoveTop,
        UserCommand::MoveBottom,
        UserCommand::DrillIn,
        UserCommand::ShowAllConnections,
        UserCommand::Back,
        UserCommand::ClearSearch,
        UserCommand::EnterSortMode,
        UserCommand::PickerLeft,
        UserCommand::PickerRight,
        UserCommand::ApplySort,
        UserCommand::CancelSort,
        UserCommand::ToggleSortDirection,
        UserCommand::TogglePause,
        UserCommand::Kill("TERM".into()),
    ]);
    prop_oneof![
        6 => fixed,
        1 => (-8isize..8).prop_map(UserCommand::MovePage),
        1 => "[a-z0-9:.]{0,3}".prop_map(UserCommand::SetSearch),
        2 => arb_column().prop_map(UserCommand::SortBy),
    ]
}

#[derive(Debug, Clone)]
enum Step {
    Refresh(Snapshot),
    Tick,
    Command(UserCommand),
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => arb_snapshot().prop_map(Step::Refresh),
        1 => Just(Step::Tick),
        6 => arb_command().prop_map(Step::Command),
    ]
}

fn all_rows(snapshot: &Snapshot) -> Vec<ConnectionRow<'_>> {
    snapshot
        .applications
        .iter()
        .flat_map(|app| {
            app.connections.iter().map(|connection| ConnectionRow {
                process: app.name.as_str(),
                connection,
            })
        })
        .collect()
}

// ──────────────────── properties ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn diff_is_the_symmetric_difference(prev in arb_snapshot(), curr in arb_snapshot()) {
        let changes = diff(Some(&prev), Some(&curr));
        let before: HashSet<ConnectionKey> = prev.connections().map(Connection::key).collect();
        let after: HashSet<ConnectionKey> = curr.connections().map(Connection::key).collect();

        prop_assert_eq!(changes.len(), before.symmetric_difference(&after).count());
        for (key, change) in &changes {
            match change.kind {
                ChangeKind::Added => {
                    prop_assert!(after.contains(key) && !before.contains(key));
                }
                ChangeKind::Removed => {
                    prop_assert!(before.contains(key) && !after.contains(key));
                }
            }
            prop_assert_eq!(change.at, curr.completed);
        }
        prop_assert!(diff(Some(&curr), Some(&curr)).is_empty());
    }

    #[test]
    fn process_sort_ignores_input_order(
        snap in arb_snapshot(),
        column in prop::sample::select(ProcessSortColumn::ALL.to_vec()),
        ascending in any::<bool>(),
    ) {
        let forward: Vec<&Application> = snap.applications.iter().collect();
        let backward: Vec<&Application> = snap.applications.iter().rev().collect();
        let a: Vec<&str> = sort_processes(&forward, column, ascending)
            .iter()
            .map(|app| app.name.as_str())
            .collect();
        let b: Vec<&str> = sort_processes(&backward, column, ascending)
            .iter()
            .map(|app| app.name.as_str())
            .collect();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn connection_sort_ignores_input_order(
        snap in arb_snapshot(),
        column in prop::sample::select(ConnectionSortColumn::ALL.to_vec()),
        ascending in any::<bool>(),
    ) {
        let rows = all_rows(&snap);
        let mut reversed = rows.clone();
        reversed.reverse();
        prop_assert_eq!(
            sort_connections(&rows, column, ascending),
            sort_connections(&reversed, column, ascending)
        );
    }

    #[test]
    fn ties_keep_name_order_in_both_directions(snap in arb_snapshot(), ascending in any::<bool>()) {
        let apps: Vec<&Application> = snap.applications.iter().collect();
        let sorted = sort_processes(&apps, ProcessSortColumn::Connections, ascending);
        for pair in sorted.windows(2) {
            if pair[0].connections.len() == pair[1].connections.len() {
                prop_assert!(pair[0].name < pair[1].name);
            }
        }
    }

    #[test]
    fn filtering_is_idempotent(snap in arb_snapshot(), query in "[a-z0-9:.]{0,4}") {
        let filter = RowFilter::substring(query);
        let apps: Vec<&Application> = snap.applications.iter().collect();
        let once = filter_processes(&apps, &[&filter]);
        let twice = filter_processes(&once, &[&filter]);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn cursor_stays_in_bounds(steps in prop::collection::vec(arb_step(), 1..40)) {
        let mut cfg = Config::default();
        cfg.docker.enabled = false;
        cfg.update.version_check = false;
        let mut model = EngineModel::new(cfg);
        update(&mut model, EngineMsg::Start);

        for step in steps {
            let msg = match step {
                Step::Refresh(snapshot) => EngineMsg::SnapshotReady(Ok(snapshot)),
                Step::Tick => EngineMsg::Tick,
                Step::Command(command) => EngineMsg::Command(command),
            };
            update(&mut model, msg);

            let rows = model.visible_rows();
            let view = model.view();
            prop_assert!(model.nav.depth() >= 1);
            if rows.is_empty() {
                prop_assert_eq!(view.cursor, 0);
            } else {
                prop_assert!(view.cursor < rows.len());
            }
            if view.level == ViewLevel::ProcessList {
                prop_assert_eq!(view.selection.is_some(), !rows.is_empty());
            }
        }
    }
}
