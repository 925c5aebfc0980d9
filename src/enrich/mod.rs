//! External collaborators and the caches their results land in.
//!
//! Every collaborator is a blocking trait object called from a background
//! thread. Each call receives a [`RequestContext`] carrying its deadline and a
//! cancellation flag; implementations should check it between slow steps.

#![allow(missing_docs)]

pub mod cache;
pub mod dns;
pub mod docker;
pub mod signal;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::core::errors::{CwError, Result};
use crate::model::{ByteCounters, DockerResolution, Snapshot};

pub use cache::{DnsCache, DockerCache, NetIoCache};
pub use signal::{KillOutcome, SignalSender, SignalTarget};

/// Deadline and cancellation flag for one background request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    deadline: Instant,
    cancelled: Arc<AtomicBool>,
}

impl RequestContext {
    /// A context expiring `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline (zero once passed).
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Mark the request cancelled. Clones share the flag.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Fail fast if the request was cancelled or its deadline passed.
    pub fn check(&self, source_name: &'static str) -> Result<()> {
        if self.is_cancelled() {
            return Err(CwError::Cancelled { source_name });
        }
        if self.is_expired() {
            return Err(CwError::Timeout {
                source_name,
                after_ms: 0,
            });
        }
        Ok(())
    }
}

/// Enumerates sockets and processes into a snapshot.
pub trait Collector: Send + Sync {
    fn collect(&self, ctx: &RequestContext) -> Result<Snapshot>;
}

/// Per-PID network byte counters.
pub trait NetIoCollector: Send + Sync {
    fn collect(&self, ctx: &RequestContext) -> Result<HashMap<u32, ByteCounters>>;
}

/// Container and port-mapping lookup.
///
/// Callers go through [`docker::resolve_docker`], which degrades an
/// unreachable daemon to an empty result.
pub trait DockerResolver: Send + Sync {
    fn resolve(&self, ctx: &RequestContext) -> Result<DockerResolution>;
}

/// Reverse-DNS primitive for a single IP.
pub trait DnsResolver: Send + Sync {
    fn resolve_one(&self, ctx: &RequestContext, ip: &str) -> Result<String>;
}

/// One-shot check for a newer release; `Ok(Some(version))` when one exists.
pub trait VersionChecker: Send + Sync {
    fn check(&self, ctx: &RequestContext) -> Result<Option<String>>;
}

/// Bundle of collaborators handed to the runtime.
#[derive(Clone)]
pub struct Collaborators {
    pub collector: Arc<dyn Collector>,
    pub netio: Option<Arc<dyn NetIoCollector>>,
    pub docker: Option<Arc<dyn DockerResolver>>,
    pub dns: Option<Arc<dyn DnsResolver>>,
    pub version: Option<Arc<dyn VersionChecker>>,
    pub signals: Option<Arc<dyn SignalSender>>,
}

impl Collaborators {
    /// Only a snapshot collector; every enrichment source absent.
    #[must_use]
    pub fn collector_only(collector: Arc<dyn Collector>) -> Self {
        Self {
            collector,
            netio: None,
            docker: None,
            dns: None,
            version: None,
            signals: None,
        }
    }
}
