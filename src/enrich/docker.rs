//! Docker resolution with graceful degradation, and virtual container rows.

use crate::core::errors::Result;
use crate::model::{Application, Connection, DockerResolution, Snapshot};

use super::{DockerResolver, RequestContext};

/// Resolve containers, treating an absent or failing daemon as "no
/// containers".
///
/// Only cancellation propagates: the caller asked for it and must see it.
pub fn resolve_docker(
    resolver: &dyn DockerResolver,
    ctx: &RequestContext,
) -> Result<DockerResolution> {
    match resolver.resolve(ctx) {
        Ok(resolution) => Ok(resolution),
        Err(err) if err.is_cancellation() => Err(err),
        Err(_) => Ok(DockerResolution::default()),
    }
}

/// Synthesize one application-shaped row per container.
///
/// A container's row collects the listening sockets bound to its published
/// host ports (usually owned by the port proxy), attributed to the container.
/// Containers with no matching socket still get a row.
#[must_use]
pub fn build_virtual_apps(
    resolution: &DockerResolution,
    snapshot: Option<&Snapshot>,
) -> Vec<Application> {
    resolution
        .containers
        .iter()
        .map(|container| {
            let connections: Vec<Connection> = snapshot
                .into_iter()
                .flat_map(Snapshot::connections)
                .filter(|c| {
                    c.is_listen()
                        && c.local_port()
                            .is_some_and(|port| container.host_ports.contains(&port))
                })
                .map(|c| {
                    let mut attributed = c.clone();
                    if attributed.container.is_none() {
                        attributed.container = c
                            .local_port()
                            .and_then(|port| resolution.ports.get(&port))
                            .cloned();
                    }
                    attributed
                })
                .collect();
            let mut app = Application::from_connections(
                container.name.clone(),
                container.image.clone(),
                connections,
            );
            app.container = Some(container.id.clone());
            app
        })
        .collect()
}
