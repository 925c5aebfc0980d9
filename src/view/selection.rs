//! Selection resolver: keep the cursor on the right row while the data,
//! the sort order, and the filter all change underneath it.
//!
//! Identity tracking is asymmetric on purpose. Application names are unique
//! display keys, so the process list follows the selected name through
//! re-sorts and refreshes. Connection triples (PID, local, remote) are not
//! provably unique, so connection levels only clamp the numeric cursor.
//!
//! Every function here is O(rows) and never leaves the cursor outside
//! `[0, len - 1]` (or `0` for an empty list) once [`validate_selection`] has
//! run.

use super::nav::{SelectionId, ViewLevel, ViewState};
use super::rows::VisibleRows;

/// Clamp `cursor` into the valid index range for `len` rows.
#[must_use]
pub fn clamp_cursor(cursor: usize, len: usize) -> usize {
    if len == 0 { 0 } else { cursor.min(len - 1) }
}

/// Map the frame's logical selection to a row index.
///
/// - No selection recorded: the raw cursor.
/// - Process list: the position of the selected name (or container id), or
///   the raw cursor if that row is gone (callers clamp via
///   [`validate_selection`]).
/// - Connection levels: the raw cursor clamped into range.
#[must_use]
pub fn resolve_index(view: &ViewState, rows: &VisibleRows<'_>) -> usize {
    match view.level {
        ViewLevel::ProcessList => match &view.selection {
            Some(SelectionId::Process(name)) => {
                rows.position_of_process(name).unwrap_or(view.cursor)
            }
            Some(SelectionId::Container(id)) => {
                rows.position_of_container(id).unwrap_or(view.cursor)
            }
            _ => view.cursor,
        },
        ViewLevel::Connections | ViewLevel::AllConnections => {
            clamp_cursor(view.cursor, rows.len())
        }
    }
}

/// Re-anchor the frame after a refresh, sort change, or filter change.
///
/// An empty row list resets the cursor and clears the selection; that is a
/// normal state (a filter matching nothing), not an error. The selection is
/// re-derived from the final cursor row on every level: the process list
/// needs it to follow the row next time, and connection breadcrumbs must
/// describe the row actually under the cursor.
pub fn validate_selection(view: &mut ViewState, rows: &VisibleRows<'_>) {
    let count = rows.len();
    if count == 0 {
        view.cursor = 0;
        view.selection = None;
        return;
    }

    view.cursor = clamp_cursor(resolve_index(view, rows), count);
    view.selection = rows.selection_at(view.cursor);
}

/// Point the frame at `index` (clamped) and record that row's identity.
///
/// Used for explicit cursor movement. On connection levels the recorded
/// identity is a breadcrumb for display; it never drives resolution.
pub fn select_index(view: &mut ViewState, rows: &VisibleRows<'_>, index: usize) {
    if rows.is_empty() {
        view.cursor = 0;
        view.selection = None;
        return;
    }
    view.cursor = clamp_cursor(index, rows.len());
    view.selection = rows.selection_at(view.cursor);
}

/// Move the cursor by `delta` rows, saturating at both ends.
pub fn move_cursor(view: &mut ViewState, rows: &VisibleRows<'_>, delta: isize) {
    let current = clamp_cursor(view.cursor, rows.len());
    let target = current.saturating_add_signed(delta);
    select_index(view, rows, target);
}
