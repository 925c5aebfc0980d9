//! Navigation stack of per-level browsing state.
//!
//! Each frame owns its cursor, selection, and sort state. Drilling in pushes
//! a fresh frame; backing out pops it and the frame underneath is exactly as
//! it was left.

use super::sort::{ConnectionSortColumn, ProcessSortColumn};

/// Which table a frame is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewLevel {
    ProcessList,
    /// Connections of one application (the frame's `process`).
    Connections,
    /// Every connection of every application.
    AllConnections,
}

/// Stable logical reference to the selected row, independent of its screen
/// position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectionId {
    /// A real application, by its unique display name.
    Process(String),
    /// A virtual container row, by container id. Container names can
    /// collide with process names; ids cannot.
    Container(String),
    /// A connection row. Recorded for display only: the triple is not
    /// provably unique, so it is never used to move the cursor.
    Connection {
        process: String,
        local: String,
        remote: String,
    },
}

/// Sort column of a frame, typed by the kind of rows the frame shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortColumn {
    Process(ProcessSortColumn),
    Connection(ConnectionSortColumn),
}

impl SortColumn {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Process(c) => c.label(),
            Self::Connection(c) => c.label(),
        }
    }
}

const PROCESS_COLUMNS: [SortColumn; 5] = [
    SortColumn::Process(ProcessSortColumn::Name),
    SortColumn::Process(ProcessSortColumn::Pid),
    SortColumn::Process(ProcessSortColumn::Connections),
    SortColumn::Process(ProcessSortColumn::Established),
    SortColumn::Process(ProcessSortColumn::Listen),
];

const CONNECTION_COLUMNS: [SortColumn; 5] = [
    SortColumn::Connection(ConnectionSortColumn::Pid),
    SortColumn::Connection(ConnectionSortColumn::Protocol),
    SortColumn::Connection(ConnectionSortColumn::Local),
    SortColumn::Connection(ConnectionSortColumn::Remote),
    SortColumn::Connection(ConnectionSortColumn::State),
];

const ALL_CONNECTION_COLUMNS: [SortColumn; 6] = [
    SortColumn::Connection(ConnectionSortColumn::Process),
    SortColumn::Connection(ConnectionSortColumn::Pid),
    SortColumn::Connection(ConnectionSortColumn::Protocol),
    SortColumn::Connection(ConnectionSortColumn::Local),
    SortColumn::Connection(ConnectionSortColumn::Remote),
    SortColumn::Connection(ConnectionSortColumn::State),
];

/// One navigation-stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub level: ViewLevel,
    /// Context application for [`ViewLevel::Connections`].
    pub process: Option<String>,
    /// Set when the context application is a virtual container row.
    pub container: Option<String>,
    /// Raw row index; always re-validated against the current rows.
    pub cursor: usize,
    pub selection: Option<SelectionId>,
    pub sort: SortColumn,
    pub ascending: bool,
    /// Highlighted entry of the column picker, an index into [`Self::columns`].
    pub picker: usize,
    /// Whether the column picker is open.
    pub sort_mode: bool,
}

impl ViewState {
    /// Root frame: the process list.
    #[must_use]
    pub fn process_list(column: ProcessSortColumn, ascending: bool) -> Self {
        let sort = SortColumn::Process(column);
        Self {
            level: ViewLevel::ProcessList,
            process: None,
            container: None,
            cursor: 0,
            selection: None,
            sort,
            ascending,
            picker: column_index(&PROCESS_COLUMNS, sort),
            sort_mode: false,
        }
    }

    /// Drill-down frame for one application's connections.
    #[must_use]
    pub fn connections(process: impl Into<String>) -> Self {
        let sort = SortColumn::Connection(ConnectionSortColumn::Local);
        Self {
            level: ViewLevel::Connections,
            process: Some(process.into()),
            container: None,
            cursor: 0,
            selection: None,
            sort,
            ascending: true,
            picker: column_index(&CONNECTION_COLUMNS, sort),
            sort_mode: false,
        }
    }

    /// Drill-down frame for a virtual container row.
    #[must_use]
    pub fn container_connections(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            container: Some(id.into()),
            ..Self::connections(name)
        }
    }

    /// Frame listing every connection across applications.
    #[must_use]
    pub fn all_connections() -> Self {
        let sort = SortColumn::Connection(ConnectionSortColumn::Process);
        Self {
            level: ViewLevel::AllConnections,
            process: None,
            container: None,
            cursor: 0,
            selection: None,
            sort,
            ascending: true,
            picker: column_index(&ALL_CONNECTION_COLUMNS, sort),
            sort_mode: false,
        }
    }

    /// Sortable columns for this frame's level, in picker order.
    #[must_use]
    pub fn columns(&self) -> &'static [SortColumn] {
        match self.level {
            ViewLevel::ProcessList => &PROCESS_COLUMNS,
            ViewLevel::Connections => &CONNECTION_COLUMNS,
            ViewLevel::AllConnections => &ALL_CONNECTION_COLUMNS,
        }
    }

    /// Process column to sort by; falls back to name if the frame holds a
    /// connection column.
    #[must_use]
    pub fn process_sort(&self) -> ProcessSortColumn {
        match self.sort {
            SortColumn::Process(c) => c,
            SortColumn::Connection(_) => ProcessSortColumn::default(),
        }
    }

    /// Connection column to sort by; falls back to local address if the
    /// frame holds a process column.
    #[must_use]
    pub fn connection_sort(&self) -> ConnectionSortColumn {
        match self.sort {
            SortColumn::Connection(c) => c,
            SortColumn::Process(_) => ConnectionSortColumn::default(),
        }
    }

    /// Open the column picker on the active sort column.
    pub fn enter_sort_mode(&mut self) {
        self.sort_mode = true;
        self.picker = column_index(self.columns(), self.sort);
    }

    pub fn cancel_sort_mode(&mut self) {
        self.sort_mode = false;
    }

    /// Move the picker highlight, wrapping at both ends.
    pub fn move_picker(&mut self, forward: bool) {
        let len = self.columns().len();
        self.picker = if forward {
            (self.picker + 1) % len
        } else {
            (self.picker + len - 1) % len
        };
    }

    /// Sort by the highlighted picker column and close the picker.
    pub fn apply_picker(&mut self) {
        let columns = self.columns();
        let column = columns[self.picker.min(columns.len() - 1)];
        self.sort_by(column);
        self.sort_mode = false;
    }

    /// Sort by `column`; choosing the active column again flips direction.
    /// Columns that do not belong to this level are ignored.
    /// Returns `true` if the ordering changed.
    pub fn sort_by(&mut self, column: SortColumn) -> bool {
        let columns = self.columns();
        if !columns.contains(&column) {
            return false;
        }
        if self.sort == column {
            self.ascending = !self.ascending;
        } else {
            self.sort = column;
            self.ascending = true;
        }
        self.picker = column_index(columns, column);
        true
    }

    pub fn toggle_direction(&mut self) {
        self.ascending = !self.ascending;
    }
}

fn column_index(columns: &[SortColumn], column: SortColumn) -> usize {
    columns.iter().position(|c| *c == column).unwrap_or(0)
}

/// LIFO of frames. Never empty; the root frame cannot be popped.
#[derive(Debug, Clone)]
pub struct NavigationStack {
    frames: Vec<ViewState>,
}

impl NavigationStack {
    #[must_use]
    pub fn new(root: ViewState) -> Self {
        Self { frames: vec![root] }
    }

    /// Top frame.
    #[must_use]
    pub fn current(&self) -> &ViewState {
        // Non-empty: the root is never popped.
        &self.frames[self.frames.len() - 1]
    }

    pub fn current_mut(&mut self) -> &mut ViewState {
        let top = self.frames.len() - 1;
        &mut self.frames[top]
    }

    pub fn push(&mut self, frame: ViewState) {
        self.frames.push(frame);
    }

    /// Remove the top frame. At the root this does nothing and returns
    /// `false`.
    pub fn pop(&mut self) -> bool {
        if self.frames.len() <= 1 {
            return false;
        }
        self.frames.pop();
        true
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Frames from root to top.
    pub fn frames(&self) -> impl Iterator<Item = &ViewState> {
        self.frames.iter()
    }
}

impl Default for NavigationStack {
    fn default() -> Self {
        Self::new(ViewState::process_list(ProcessSortColumn::Name, true))
    }
}
