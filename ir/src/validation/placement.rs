//! Host/device placement legality.
//!
//! Device-scheduled work at the top level of a state must only move data the
//! device can address, and host code must never touch device-only storage
//! directly; a copy through a host-resident container is required instead.

use snafu::ensure;

use super::{HostCodeTouchesDeviceDataSnafu, HostDataInDeviceScopeSnafu, Result};
use crate::node::{EdgeId, IN_PREFIX, Node, NodeId, OUT_PREFIX};
use crate::sdfg::Sdfg;
use crate::state::State;

/// Non-scalar data living in storage only the host can address.
fn is_host_only(sdfg: &Sdfg, data: &str) -> bool {
    sdfg.array(data).is_some_and(|desc| {
        !desc.is_scalar() && desc.storage.is_host_accessible() && !desc.storage.is_device_resident()
    })
}

fn access_at(state: &State, node: NodeId) -> Option<&str> {
    state.node(node).as_access()
}

pub(super) fn validate_state(sdfg: &Sdfg, state: &State) -> Result<()> {
    let scopes = state.scope_dict();

    for (id, node) in state.nodes() {
        let top_level = scopes.get(&id).copied().flatten().is_none();
        let schedule = node.schedule();

        if top_level && node.is_entry() && schedule.is_some_and(|s| s.is_kernel()) {
            validate_kernel(sdfg, state, id)?;
        } else if top_level && node.is_code() && schedule.is_some_and(|s| s.is_device()) {
            for edge in state.in_edges(id).into_iter().chain(state.out_edges(id)) {
                let e = state.edge(edge);
                let other = if e.dst == id { e.src } else { e.dst };
                if let Some(data) = access_at(state, other) {
                    ensure!(
                        !is_host_only(sdfg, data),
                        HostDataInDeviceScopeSnafu { graph: &sdfg.name, state: &state.label, node: id, data }
                    );
                }
            }
        }

        if let Node::Tasklet(tasklet) = node
            && !tasklet.schedule.is_device()
            && !state.in_device_scope(id)
        {
            validate_host_tasklet(sdfg, state, id)?;
        }
    }
    Ok(())
}

/// Data entering a kernel through `IN_*` or leaving through `OUT_*` must be
/// device addressable.
fn validate_kernel(sdfg: &Sdfg, state: &State, entry: NodeId) -> Result<()> {
    let incoming = state
        .in_edges(entry)
        .into_iter()
        .filter(|e| state.edge(*e).dst_conn.as_deref().is_some_and(|c| c.starts_with(IN_PREFIX)))
        .map(|e| state.edge(state.path_source(e)).src);

    let outgoing = state.exit_node(entry).into_iter().flat_map(|exit| {
        state
            .out_edges(exit)
            .into_iter()
            .filter(|e| state.edge(*e).src_conn.as_deref().is_some_and(|c| c.starts_with(OUT_PREFIX)))
            .map(|e| state.edge(state.path_sink(e)).dst)
            .collect::<Vec<_>>()
    });

    for endpoint in incoming.chain(outgoing) {
        if let Some(data) = access_at(state, endpoint) {
            ensure!(
                !is_host_only(sdfg, data),
                HostDataInDeviceScopeSnafu { graph: &sdfg.name, state: &state.label, node: entry, data }
            );
        }
    }
    Ok(())
}

fn validate_host_tasklet(sdfg: &Sdfg, state: &State, tasklet: NodeId) -> Result<()> {
    let touching: Vec<EdgeId> = state.in_edges(tasklet).into_iter().chain(state.out_edges(tasklet)).collect();
    for edge in touching {
        let e = state.edge(edge);
        let other = if e.dst == tasklet { e.src } else { e.dst };
        let Some(data) = access_at(state, other) else { continue };
        let device_only = sdfg.array(data).is_some_and(|d| d.storage.is_device_only());
        ensure!(
            !device_only,
            HostCodeTouchesDeviceDataSnafu { graph: &sdfg.name, state: &state.label, node: tasklet, data }
        );
    }
    Ok(())
}
