//! Signal targeting: decide *what* to signal and tally the outcome.
//!
//! Delivery itself goes through a [`SignalSender`]. Multi-process
//! applications are signalled PID by PID so a partial failure is reported as
//! counts rather than all-or-nothing.

use std::fmt;

use crate::core::errors::{CwError, Result};
use crate::view::{ViewLevel, ViewState, VisibleRows};
use crate::view::selection::clamp_cursor;

/// Signals the engine accepts, by canonical name.
pub const SUPPORTED_SIGNALS: [&str; 9] = [
    "SIGTERM", "SIGKILL", "SIGINT", "SIGHUP", "SIGQUIT", "SIGUSR1", "SIGUSR2", "SIGSTOP",
    "SIGCONT",
];

/// Normalize `term`, `TERM`, or `SIGTERM` to the canonical `SIGTERM`.
pub fn canonical_signal(raw: &str) -> Result<&'static str> {
    let upper = raw.trim().to_ascii_uppercase();
    let wanted = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{upper}")
    };
    SUPPORTED_SIGNALS
        .into_iter()
        .find(|s| *s == wanted)
        .ok_or_else(|| CwError::Signal {
            target: String::new(),
            signal: raw.to_owned(),
            details: "unsupported signal".to_owned(),
        })
}

/// Exact set of things to signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalTarget {
    /// A single process (a selected connection's owner).
    Pid(u32),
    /// Every process merged into one application row.
    Pids(Vec<u32>),
    /// A container behind a virtual row.
    Container(String),
}

impl fmt::Display for SignalTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pid(pid) => write!(f, "PID {pid}"),
            Self::Pids(pids) if pids.len() == 1 => write!(f, "PID {}", pids[0]),
            Self::Pids(pids) => write!(f, "{} processes", pids.len()),
            Self::Container(id) => write!(f, "container {}", short_id(id)),
        }
    }
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

/// Performs the actual OS or container-runtime delivery.
pub trait SignalSender: Send + Sync {
    fn signal_pid(&self, pid: u32, signal: &str) -> Result<()>;
    fn signal_container(&self, container_id: &str, signal: &str) -> Result<()>;
}

/// Tally of one delivery request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillOutcome {
    pub target: SignalTarget,
    pub signal: String,
    pub delivered: usize,
    pub failed: usize,
    /// First error message per failed target, in delivery order.
    pub errors: Vec<String>,
}

impl KillOutcome {
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.delivered == 0 && self.failed > 0
    }

    /// Short human-readable status line.
    #[must_use]
    pub fn summary(&self) -> String {
        match (self.delivered, self.failed) {
            (0, 0) => format!("{}: nothing to signal", self.target),
            (_, 0) => format!("sent {} to {}", self.signal, self.target),
            (0, _) => format!(
                "{} to {} failed: {}",
                self.signal,
                self.target,
                self.errors.first().map_or("unknown error", String::as_str)
            ),
            (ok, failed) => format!(
                "sent {} to {ok} of {} processes ({failed} failed)",
                self.signal,
                ok + failed
            ),
        }
    }
}

/// Pick the target for the row under the cursor.
///
/// Process rows signal every PID of the application, or the container for
/// virtual rows. Connection rows signal the owning PID.
#[must_use]
pub fn resolve_target(view: &ViewState, rows: &VisibleRows<'_>) -> Option<SignalTarget> {
    if rows.is_empty() {
        return None;
    }
    let index = clamp_cursor(view.cursor, rows.len());
    match view.level {
        ViewLevel::ProcessList => {
            let app = rows.application_at(index)?;
            if let Some(id) = &app.container {
                return Some(SignalTarget::Container(id.clone()));
            }
            if app.pids.is_empty() {
                return None;
            }
            Some(SignalTarget::Pids(app.pids.clone()))
        }
        ViewLevel::Connections | ViewLevel::AllConnections => rows
            .connection_at(index)
            .map(|row| SignalTarget::Pid(row.connection.pid)),
    }
}

/// Deliver `signal` to every member of `target`, counting per-member
/// results.
pub fn deliver(sender: &dyn SignalSender, target: &SignalTarget, signal: &str) -> KillOutcome {
    let mut outcome = KillOutcome {
        target: target.clone(),
        signal: signal.to_owned(),
        delivered: 0,
        failed: 0,
        errors: Vec::new(),
    };
    let mut record = |result: Result<()>| match result {
        Ok(()) => outcome.delivered += 1,
        Err(err) => {
            outcome.failed += 1;
            outcome.errors.push(err.to_string());
        }
    };
    match target {
        SignalTarget::Pid(pid) => record(sender.signal_pid(*pid, signal)),
        SignalTarget::Pids(pids) => {
            for pid in pids {
                record(sender.signal_pid(*pid, signal));
            }
        }
        SignalTarget::Container(id) => record(sender.signal_container(id, signal)),
    }
    outcome
}

/// Delivers process signals with `kill(2)`. Containers need a
/// runtime-aware sender and are reported as failures.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSignalSender;

#[cfg(unix)]
impl SignalSender for OsSignalSender {
    fn signal_pid(&self, pid: u32, signal: &str) -> Result<()> {
        use std::str::FromStr;

        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let failure = |details: String| CwError::Signal {
            target: format!("PID {pid}"),
            signal: signal.to_owned(),
            details,
        };
        let parsed = Signal::from_str(signal).map_err(|e| failure(e.to_string()))?;
        let raw = i32::try_from(pid).map_err(|_| failure("PID out of range".to_owned()))?;
        kill(Pid::from_raw(raw), parsed).map_err(|errno| kill_error(errno, pid, signal))
    }

    fn signal_container(&self, container_id: &str, signal: &str) -> Result<()> {
        Err(CwError::Signal {
            target: format!("container {}", short_id(container_id)),
            signal: signal.to_owned(),
            details: "no container runtime configured".to_owned(),
        })
    }
}

/// `EPERM` is a permission problem; everything else (usually `ESRCH`) is a
/// failed delivery.
#[cfg(unix)]
fn kill_error(errno: nix::errno::Errno, pid: u32, signal: &str) -> CwError {
    match errno {
        nix::errno::Errno::EPERM => CwError::PermissionDenied {
            details: format!("{signal} to PID {pid}"),
        },
        other => CwError::Signal {
            target: format!("PID {pid}"),
            signal: signal.to_owned(),
            details: other.desc().to_owned(),
        },
    }
}
