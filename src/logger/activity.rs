//! Activity logging coordinator.
//!
//! A dedicated logger thread owns the [`JsonlWriter`]. Every other thread
//! sends [`ActivityEvent`] values through a bounded crossbeam channel;
//! `try_send()` keeps the engine loop from ever blocking on log back-pressure.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::errors::{CwError, Result};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

const CHANNEL_CAPACITY: usize = 1024;

/// Events the engine reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEvent {
    EngineStarted {
        version: String,
        config_hash: String,
    },
    EngineStopped {
        reason: String,
        uptime_secs: u64,
        refreshes: u64,
    },
    ConfigLoaded {
        path: String,
    },
    SnapshotApplied {
        applications: usize,
        connections: usize,
        changes: usize,
        duration_ms: u64,
    },
    CollectionFailed {
        source: &'static str,
        code: &'static str,
        message: String,
    },
    DockerResolved {
        containers: usize,
    },
    DnsBatch {
        requested: usize,
        in_flight: usize,
    },
    SignalDelivered {
        signal: String,
        target: String,
        delivered: usize,
        failed: usize,
    },
    VersionNotice {
        version: String,
    },
    /// Sentinel asking the logger thread to flush and exit.
    Shutdown,
}

// ──────────────────── handle ────────────────────

/// Cheaply-cloneable, non-blocking sender of activity events.
#[derive(Clone)]
pub struct ActivityLoggerHandle {
    tx: Sender<ActivityEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl ActivityLoggerHandle {
    /// A handle whose events go nowhere, for when logging is disabled.
    #[must_use]
    pub fn disabled() -> Self {
        let (tx, _rx) = bounded(1);
        Self {
            tx,
            dropped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queue an event. A full channel drops it and bumps the counter.
    pub fn send(&self, event: ActivityEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Ask the logger thread to flush and exit.
    pub fn shutdown(&self) {
        let _ = self.tx.send(ActivityEvent::Shutdown);
    }
}

// ──────────────────── spawn ────────────────────

/// Spawn the logger thread. It runs until [`ActivityLoggerHandle::shutdown`]
/// or until every handle is dropped.
pub fn spawn_logger(
    config: JsonlConfig,
) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    spawn_logger_with_capacity(config, CHANNEL_CAPACITY)
}

pub fn spawn_logger_with_capacity(
    config: JsonlConfig,
    capacity: usize,
) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded::<ActivityEvent>(capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    let handle = ActivityLoggerHandle {
        tx,
        dropped_events: Arc::clone(&dropped),
    };

    let join = thread::Builder::new()
        .name("cw-logger".to_string())
        .spawn(move || logger_thread_main(&rx, config, &dropped))
        .map_err(|e| CwError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, join))
}

fn logger_thread_main(rx: &Receiver<ActivityEvent>, config: JsonlConfig, dropped: &AtomicU64) {
    let mut jsonl = JsonlWriter::open(config);

    while let Ok(event) = rx.recv() {
        let lost = dropped.swap(0, Ordering::Relaxed);
        if lost > 0 {
            let mut warn = LogEntry::new(EventType::Error, Severity::Warning);
            warn.count = Some(lost);
            warn.details = Some(format!("{lost} log events dropped due to back-pressure"));
            jsonl.write_entry(&warn);
        }

        if event == ActivityEvent::Shutdown {
            break;
        }
        jsonl.write_entry(&event_to_log_entry(&event));
    }

    jsonl.flush();
    jsonl.fsync();
}

// ──────────────────── event conversion ────────────────────

fn event_to_log_entry(event: &ActivityEvent) -> LogEntry {
    match event {
        ActivityEvent::EngineStarted {
            version,
            config_hash,
        } => {
            let mut e = LogEntry::new(EventType::EngineStart, Severity::Info);
            e.details = Some(format!("version={version} config_hash={config_hash}"));
            e.ok = Some(true);
            e
        }
        ActivityEvent::EngineStopped {
            reason,
            uptime_secs,
            refreshes,
        } => {
            let mut e = LogEntry::new(EventType::EngineStop, Severity::Info);
            e.count = Some(*refreshes);
            e.details = Some(format!("reason={reason} uptime={uptime_secs}s"));
            e
        }
        ActivityEvent::ConfigLoaded { path } => {
            let mut e = LogEntry::new(EventType::ConfigLoaded, Severity::Info);
            e.details = Some(path.clone());
            e
        }
        ActivityEvent::SnapshotApplied {
            applications,
            connections,
            changes,
            duration_ms,
        } => {
            let mut e = LogEntry::new(EventType::SnapshotApplied, Severity::Info);
            e.source = Some("collector".to_string());
            e.count = Some(*connections as u64);
            e.duration_ms = Some(*duration_ms);
            e.details = Some(format!("applications={applications} changes={changes}"));
            e.ok = Some(true);
            e
        }
        ActivityEvent::CollectionFailed {
            source,
            code,
            message,
        } => {
            let mut e = LogEntry::new(EventType::CollectionFailed, Severity::Warning);
            e.source = Some((*source).to_string());
            e.error_code = Some((*code).to_string());
            e.error_message = Some(message.clone());
            e.ok = Some(false);
            e
        }
        ActivityEvent::DockerResolved { containers } => {
            let mut e = LogEntry::new(EventType::DockerResolved, Severity::Info);
            e.source = Some("docker".to_string());
            e.count = Some(*containers as u64);
            e
        }
        ActivityEvent::DnsBatch {
            requested,
            in_flight,
        } => {
            let mut e = LogEntry::new(EventType::DnsBatch, Severity::Info);
            e.source = Some("dns".to_string());
            e.count = Some(*requested as u64);
            e.details = Some(format!("in_flight={in_flight}"));
            e
        }
        ActivityEvent::SignalDelivered {
            signal,
            target,
            delivered,
            failed,
        } => {
            let severity = if *failed == 0 {
                Severity::Info
            } else {
                Severity::Warning
            };
            let mut e = LogEntry::new(EventType::SignalDelivered, severity);
            e.target = Some(target.clone());
            e.count = Some(*delivered as u64);
            e.ok = Some(*failed == 0);
            e.details = Some(format!("signal={signal} failed={failed}"));
            e
        }
        ActivityEvent::VersionNotice { version } => {
            let mut e = LogEntry::new(EventType::VersionNotice, Severity::Info);
            e.details = Some(version.clone());
            e
        }
        ActivityEvent::Shutdown => LogEntry::new(EventType::EngineStop, Severity::Info),
    }
}
