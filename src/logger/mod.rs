//! Structured activity logging: JSONL append-only with graceful degradation.

pub mod activity;
pub mod jsonl;

pub use activity::{ActivityEvent, ActivityLoggerHandle, spawn_logger};
pub use jsonl::JsonlConfig;
