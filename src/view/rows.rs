//! Materialize the filtered, sorted rows a frame displays.

use super::filter::{RowFilter, filter_connections, filter_processes};
use super::nav::{SelectionId, ViewLevel, ViewState};
use super::sort::{ConnectionRow, sort_connections, sort_processes};
use crate::model::{Application, Snapshot};

/// Rows of one frame, typed by level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibleRows<'a> {
    Processes(Vec<&'a Application>),
    Connections(Vec<ConnectionRow<'a>>),
}

impl<'a> VisibleRows<'a> {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Processes(rows) => rows.len(),
            Self::Connections(rows) => rows.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Application name of the process row at `index`.
    #[must_use]
    pub fn process_name_at(&self, index: usize) -> Option<&'a str> {
        match self {
            Self::Processes(rows) => rows.get(index).map(|a| a.name.as_str()),
            Self::Connections(_) => None,
        }
    }

    /// Position of the real process row named `name`. Container rows
    /// sharing the name are skipped.
    #[must_use]
    pub fn position_of_process(&self, name: &str) -> Option<usize> {
        match self {
            Self::Processes(rows) => rows
                .iter()
                .position(|a| !a.is_virtual() && a.name == name),
            Self::Connections(_) => None,
        }
    }

    /// Position of the virtual row for container `id`.
    #[must_use]
    pub fn position_of_container(&self, id: &str) -> Option<usize> {
        match self {
            Self::Processes(rows) => rows
                .iter()
                .position(|a| a.container.as_deref() == Some(id)),
            Self::Connections(_) => None,
        }
    }

    /// Identity of the row at `index`.
    #[must_use]
    pub fn selection_at(&self, index: usize) -> Option<SelectionId> {
        match self {
            Self::Processes(rows) => rows.get(index).map(|a| match &a.container {
                Some(id) => SelectionId::Container(id.clone()),
                None => SelectionId::Process(a.name.clone()),
            }),
            Self::Connections(rows) => rows.get(index).map(|r| SelectionId::Connection {
                process: r.process.to_owned(),
                local: r.connection.local.clone(),
                remote: r.connection.remote.clone(),
            }),
        }
    }

    #[must_use]
    pub fn application_at(&self, index: usize) -> Option<&'a Application> {
        match self {
            Self::Processes(rows) => rows.get(index).copied(),
            Self::Connections(_) => None,
        }
    }

    #[must_use]
    pub fn connection_at(&self, index: usize) -> Option<ConnectionRow<'a>> {
        match self {
            Self::Processes(_) => None,
            Self::Connections(rows) => rows.get(index).copied(),
        }
    }
}

/// Where rows come from: the current snapshot plus synthesized container
/// rows.
#[derive(Debug, Clone, Copy)]
pub struct RowSource<'a> {
    pub snapshot: Option<&'a Snapshot>,
    pub virtual_apps: &'a [Application],
}

impl<'a> RowSource<'a> {
    /// Every application row, real processes first.
    pub fn applications(&self) -> impl Iterator<Item = &'a Application> + use<'a> {
        let real: &'a [Application] = self
            .snapshot
            .map(|s| s.applications.as_slice())
            .unwrap_or_default();
        let synthesized: &'a [Application] = self.virtual_apps;
        real.iter().chain(synthesized.iter())
    }

    /// Look up a real application by name. Container rows are only
    /// reachable through [`Self::container`].
    #[must_use]
    pub fn application(&self, name: &str) -> Option<&'a Application> {
        self.snapshot
            .and_then(|s| s.applications.iter().find(|a| a.name == name))
    }

    /// Look up the virtual row for container `id`.
    #[must_use]
    pub fn container(&self, id: &str) -> Option<&'a Application> {
        self.virtual_apps
            .iter()
            .find(|a| a.container.as_deref() == Some(id))
    }

    /// Context application of a connections frame.
    fn context(&self, view: &ViewState) -> Option<&'a Application> {
        match (&view.container, &view.process) {
            (Some(id), _) => self.container(id),
            (None, Some(name)) => self.application(name),
            (None, None) => None,
        }
    }
}

/// Filter then sort the rows for `view`.
#[must_use]
pub fn visible_rows<'a>(
    source: RowSource<'a>,
    view: &ViewState,
    filters: &[&RowFilter],
) -> VisibleRows<'a> {
    match view.level {
        ViewLevel::ProcessList => {
            let all: Vec<&Application> = source.applications().collect();
            let kept = filter_processes(&all, filters);
            VisibleRows::Processes(sort_processes(&kept, view.process_sort(), view.ascending))
        }
        ViewLevel::Connections => {
            let rows: Vec<ConnectionRow<'a>> = source
                .context(view)
                .map(connection_rows)
                .unwrap_or_default();
            let kept = filter_connections(&rows, filters);
            VisibleRows::Connections(sort_connections(
                &kept,
                view.connection_sort(),
                view.ascending,
            ))
        }
        ViewLevel::AllConnections => {
            // Container rows only re-attribute proxy sockets that the real
            // processes already list.
            let rows: Vec<ConnectionRow<'a>> = source
                .applications()
                .filter(|a| !a.is_virtual())
                .flat_map(connection_rows)
                .collect();
            let kept = filter_connections(&rows, filters);
            VisibleRows::Connections(sort_connections(
                &kept,
                view.connection_sort(),
                view.ascending,
            ))
        }
    }
}

fn connection_rows(app: &Application) -> Vec<ConnectionRow<'_>> {
    app.connections
        .iter()
        .map(|connection| ConnectionRow {
            process: app.name.as_str(),
            connection,
        })
        .collect()
}
