//! Browsing state and the pure row pipeline: navigation frames, sort and
//! filter, row materialization, and selection resolution.

#![allow(missing_docs)]

pub mod filter;
pub mod nav;
pub mod rows;
pub mod selection;
pub mod sort;

pub use filter::{FilterMode, RowFilter};
pub use nav::{NavigationStack, SelectionId, SortColumn, ViewLevel, ViewState};
pub use rows::{RowSource, VisibleRows, visible_rows};
pub use selection::{resolve_index, validate_selection};
pub use sort::{ConnectionRow, ConnectionSortColumn, ProcessSortColumn};
