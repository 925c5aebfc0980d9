//! Live-state engine: a pure model/update core and the threaded runtime
//! that drives it.

#![allow(missing_docs)]

pub mod model;
pub mod runtime;
pub mod update;

#[cfg(test)]
mod test_properties;

pub use model::{
    EngineCmd, EngineModel, EngineMsg, LastError, StatusLevel, StatusMessage, UserCommand,
};
pub use runtime::{Applied, EngineHandle, EngineRuntime};
pub use update::{update, update_at};
