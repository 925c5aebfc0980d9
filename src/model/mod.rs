//! Domain data: snapshots, applications, connections, enrichment records.

#![allow(missing_docs)]

pub mod enrichment;
pub mod snapshot;

pub use enrichment::{ByteCounters, ContainerPort, DockerResolution, VirtualContainer};
pub use snapshot::{Application, Connection, ConnectionKey, Protocol, Snapshot};
