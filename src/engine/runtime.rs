//! Engine runtime: the single consumer loop and its background tasks.
//!
//! The loop owns the [`EngineModel`] outright. Every collaborator call runs
//! on a named background thread and reports back as an [`EngineMsg`] over a
//! crossbeam channel, so no state is ever shared or locked. Ticks are not
//! threads: the loop waits on the channel with a timeout equal to the time
//! left until the next tick deadline.
//!
//! Each task gets a supervisor thread that enforces the deadline. On expiry
//! the supervisor cancels the task's [`RequestContext`], reports
//! `CwError::Timeout`, and abandons the worker; whatever the worker returns
//! later is dropped.

use std::ops::ControlFlow;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};

use super::model::{EngineCmd, EngineModel, EngineMsg, UserCommand};
use super::update::update;
use crate::core::config::Config;
use crate::core::errors::{CwError, Result};
use crate::enrich::docker::resolve_docker;
use crate::enrich::signal::deliver;
use crate::enrich::{Collaborators, KillOutcome, RequestContext, SignalTarget};
use crate::logger::{ActivityEvent, ActivityLoggerHandle};

/// What kind of message was just applied, for the front end's redraw
/// decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Start,
    Tick,
    /// A snapshot replaced the current one.
    Refresh,
    /// A collection failed; last-good data is still shown.
    Failure,
    /// DNS, NetIO, Docker, version, or signal results.
    Enrichment,
    Command,
}

impl Applied {
    fn of(msg: &EngineMsg) -> Self {
        match msg {
            EngineMsg::Start => Self::Start,
            EngineMsg::Tick => Self::Tick,
            EngineMsg::SnapshotReady(Ok(_)) => Self::Refresh,
            EngineMsg::SnapshotReady(Err(_)) => Self::Failure,
            EngineMsg::Command(_) => Self::Command,
            _ => Self::Enrichment,
        }
    }
}

/// Cloneable sender for feeding user commands into a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    tx: Sender<EngineMsg>,
}

impl EngineHandle {
    pub fn send(&self, command: UserCommand) -> Result<()> {
        self.tx
            .send(EngineMsg::Command(command))
            .map_err(|_| CwError::ChannelClosed {
                component: "engine",
            })
    }
}

/// Owns the model, the message channel, and the collaborators.
pub struct EngineRuntime {
    model: EngineModel,
    collaborators: Collaborators,
    tx: Sender<EngineMsg>,
    rx: Receiver<EngineMsg>,
    logger: ActivityLoggerHandle,
    next_tick: Option<Instant>,
    collect_started: Option<Instant>,
}

impl EngineRuntime {
    #[must_use]
    pub fn new(config: Config, collaborators: Collaborators, logger: ActivityLoggerHandle) -> Self {
        let (tx, rx) = unbounded();
        Self {
            model: EngineModel::new(config),
            collaborators,
            tx,
            rx,
            logger,
            next_tick: None,
            collect_started: None,
        }
    }

    #[must_use]
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            tx: self.tx.clone(),
        }
    }

    #[must_use]
    pub fn model(&self) -> &EngineModel {
        &self.model
    }

    /// Run until a `Quit` command or until `on_update` breaks.
    ///
    /// `on_update` sees the model after every applied message. Returns the
    /// final model.
    pub fn run<F>(mut self, mut on_update: F) -> Result<EngineModel>
    where
        F: FnMut(&EngineModel, Applied) -> ControlFlow<()>,
    {
        let started = Instant::now();
        self.logger.send(ActivityEvent::EngineStarted {
            version: env!("CARGO_PKG_VERSION").to_string(),
            config_hash: self.model.config.stable_hash()?,
        });

        let mut pending = Some(EngineMsg::Start);
        let reason = loop {
            let msg = match pending.take() {
                Some(msg) => msg,
                None => match self.next_message() {
                    Some(msg) => msg,
                    None => break "channel closed",
                },
            };
            let applied = Applied::of(&msg);
            self.dispatch(msg);
            if self.model.quit {
                break "quit";
            }
            if on_update(&self.model, applied).is_break() {
                break "stopped";
            }
        };

        self.logger.send(ActivityEvent::EngineStopped {
            reason: reason.to_string(),
            uptime_secs: started.elapsed().as_secs(),
            refreshes: self.model.refreshes,
        });
        Ok(self.model)
    }

    /// Block until the next message or tick deadline. A due tick wins over
    /// queued messages, so a steady stream of results cannot starve it.
    fn next_message(&mut self) -> Option<EngineMsg> {
        let Some(deadline) = self.next_tick else {
            return self.rx.recv().ok();
        };
        let now = Instant::now();
        if now >= deadline {
            self.next_tick = None;
            return Some(EngineMsg::Tick);
        }
        match self.rx.recv_timeout(deadline - now) {
            Ok(msg) => Some(msg),
            Err(RecvTimeoutError::Timeout) => {
                self.next_tick = None;
                Some(EngineMsg::Tick)
            }
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Apply one message and run the commands it produces.
    fn dispatch(&mut self, msg: EngineMsg) {
        self.log_incoming(&msg);
        let snapshot_counts = match &msg {
            EngineMsg::SnapshotReady(Ok(s)) => Some((s.applications.len(), s.connection_count())),
            _ => None,
        };

        let cmd = update(&mut self.model, msg);

        if let Some((applications, connections)) = snapshot_counts {
            let duration_ms = self
                .collect_started
                .take()
                .map_or(0, |t| millis(t.elapsed()));
            self.logger.send(ActivityEvent::SnapshotApplied {
                applications,
                connections,
                changes: self.model.ledger.len(),
                duration_ms,
            });
        }
        self.execute(cmd);
    }

    fn log_incoming(&self, msg: &EngineMsg) {
        let failure = |source: &'static str, err: &CwError| ActivityEvent::CollectionFailed {
            source,
            code: err.code(),
            message: err.to_string(),
        };
        let event = match msg {
            EngineMsg::SnapshotReady(Err(err)) => failure("collector", err),
            EngineMsg::NetIoReady(Err(err)) => failure("netio", err),
            EngineMsg::DockerReady(Err(err)) => failure("docker", err),
            EngineMsg::VersionChecked(Err(err)) => failure("version", err),
            EngineMsg::DockerReady(Ok(resolution)) => ActivityEvent::DockerResolved {
                containers: resolution.containers.len(),
            },
            EngineMsg::VersionChecked(Ok(Some(version))) => ActivityEvent::VersionNotice {
                version: version.clone(),
            },
            EngineMsg::SignalDelivered(outcome) => ActivityEvent::SignalDelivered {
                signal: outcome.signal.clone(),
                target: outcome.target.to_string(),
                delivered: outcome.delivered,
                failed: outcome.failed,
            },
            _ => return,
        };
        self.logger.send(event);
    }

    // ──────────────────── commands ────────────────────

    fn execute(&mut self, cmd: EngineCmd) {
        for cmd in cmd.flatten() {
            match cmd {
                EngineCmd::None | EngineCmd::Batch(_) | EngineCmd::Quit => {}
                EngineCmd::ScheduleTick(after) => self.next_tick = Some(Instant::now() + after),
                EngineCmd::CollectSnapshot { timeout } => {
                    self.collect_started = Some(Instant::now());
                    let collector = self.collaborators.collector.clone();
                    self.spawn_task(
                        "cw-snapshot",
                        "collector",
                        timeout,
                        EngineMsg::SnapshotReady,
                        move |ctx| collector.collect(ctx),
                    );
                }
                EngineCmd::CollectNetIo { timeout } => {
                    if let Some(netio) = self.collaborators.netio.clone() {
                        self.spawn_task(
                            "cw-netio",
                            "netio",
                            timeout,
                            EngineMsg::NetIoReady,
                            move |ctx| netio.collect(ctx),
                        );
                    }
                }
                EngineCmd::ResolveDocker => {
                    if let Some(docker) = self.collaborators.docker.clone() {
                        let timeout = self.model.config.refresh.collect_timeout();
                        self.spawn_task(
                            "cw-docker",
                            "docker",
                            timeout,
                            EngineMsg::DockerReady,
                            move |ctx| resolve_docker(docker.as_ref(), ctx),
                        );
                    }
                }
                EngineCmd::CheckVersion => {
                    if let Some(version) = self.collaborators.version.clone() {
                        let timeout = self.model.config.refresh.collect_timeout();
                        self.spawn_task(
                            "cw-version",
                            "version",
                            timeout,
                            EngineMsg::VersionChecked,
                            move |ctx| version.check(ctx),
                        );
                    }
                }
                EngineCmd::LookupDns { ips, timeout } => self.lookup_dns(ips, timeout),
                EngineCmd::DeliverSignal { target, signal } => self.deliver_signal(target, signal),
            }
        }
    }

    fn lookup_dns(&self, ips: Vec<String>, timeout: Duration) {
        self.logger.send(ActivityEvent::DnsBatch {
            requested: ips.len(),
            in_flight: self.model.dns_in_flight.len(),
        });
        let Some(dns) = self.collaborators.dns.clone() else {
            // No resolver: record every IP as unresolvable so it leaves the
            // in-flight set.
            for ip in ips {
                let _ = self.tx.send(EngineMsg::DnsResolved { ip, hostname: None });
            }
            return;
        };
        for ip in ips {
            let resolver = dns.clone();
            let target = ip.clone();
            let wrap = move |result: Result<String>| EngineMsg::DnsResolved {
                ip: ip.clone(),
                hostname: result.ok().filter(|h| !h.is_empty()),
            };
            self.spawn_task("cw-dns", "dns", timeout, wrap, move |ctx| {
                resolver.resolve_one(ctx, &target)
            });
        }
    }

    fn deliver_signal(&self, target: SignalTarget, signal: String) {
        let Some(sender) = self.collaborators.signals.clone() else {
            let outcome = undelivered(target, signal, "signal delivery unavailable".to_string());
            let _ = self.tx.send(EngineMsg::SignalDelivered(outcome));
            return;
        };
        let tx = self.tx.clone();
        let (task_target, task_signal) = (target.clone(), signal.clone());
        let spawned = thread::Builder::new()
            .name("cw-signal".to_string())
            .spawn(move || {
                let outcome = deliver(sender.as_ref(), &task_target, &task_signal);
                let _ = tx.send(EngineMsg::SignalDelivered(outcome));
            });
        if let Err(e) = spawned {
            let outcome = undelivered(target, signal, spawn_failure("cw-signal", &e).to_string());
            let _ = self.tx.send(EngineMsg::SignalDelivered(outcome));
        }
    }

    /// Run `work` on a background thread under `timeout` and post the
    /// wrapped result back to the loop.
    fn spawn_task<T, W, M>(
        &self,
        name: &'static str,
        source_name: &'static str,
        timeout: Duration,
        wrap: M,
        work: W,
    ) where
        T: Send + 'static,
        W: FnOnce(&RequestContext) -> Result<T> + Send + 'static,
        M: Fn(Result<T>) -> EngineMsg + Clone + Send + 'static,
    {
        let tx = self.tx.clone();
        let on_error = wrap.clone();
        let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
            let ctx = RequestContext::with_timeout(timeout);
            let result = run_with_deadline(name, source_name, &ctx, timeout, work);
            let _ = tx.send(wrap(result));
        });
        if let Err(e) = spawned {
            let _ = self.tx.send(on_error(Err(spawn_failure(name, &e))));
        }
    }
}

/// Run `work` on its own worker thread and wait at most `timeout`.
fn run_with_deadline<T, W>(
    name: &'static str,
    source_name: &'static str,
    ctx: &RequestContext,
    timeout: Duration,
    work: W,
) -> Result<T>
where
    T: Send + 'static,
    W: FnOnce(&RequestContext) -> Result<T> + Send + 'static,
{
    let (done_tx, done_rx) = bounded(1);
    let worker_ctx = ctx.clone();
    thread::Builder::new()
        .name(format!("{name}-worker"))
        .spawn(move || {
            let _ = done_tx.send(work(&worker_ctx));
        })
        .map_err(|e| spawn_failure(name, &e))?;

    match done_rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            ctx.cancel();
            Err(CwError::Timeout {
                source_name,
                after_ms: millis(timeout),
            })
        }
        Err(RecvTimeoutError::Disconnected) => Err(CwError::Runtime {
            details: format!("{source_name} worker exited without a result"),
        }),
    }
}

fn undelivered(target: SignalTarget, signal: String, details: String) -> KillOutcome {
    let error = CwError::Signal {
        target: target.to_string(),
        signal: signal.clone(),
        details,
    };
    KillOutcome {
        target,
        signal,
        delivered: 0,
        failed: 1,
        errors: vec![error.to_string()],
    }
}

fn spawn_failure(name: &str, err: &std::io::Error) -> CwError {
    CwError::Runtime {
        details: format!("failed to spawn {name} thread: {err}"),
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
