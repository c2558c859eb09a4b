//! Step 9: host tasklets reach device data only through host shadows.

use snafu::{OptionExt, ResultExt};
use stratum_device::StorageType;
use stratum_ir::{EdgeId, Memlet, NodeId, Sdfg, StateId};

use crate::config::{ClonePair, CloneTable};
use crate::error::{MissingDescriptorSnafu, NameCollisionSnafu, Result};
use crate::placement::host_tasklets;

/// Host shadow of `data`, reused from the clone tables when one exists.
fn shadow_for(
    sdfg: &mut Sdfg,
    clones: &mut CloneTable,
    inherited: &CloneTable,
    data: &str,
    created: &mut Vec<String>,
) -> Result<String> {
    let known = clones.get(data).or_else(|| inherited.get(data)).and_then(|p| p.host.clone());
    if let Some(host) = known
        && sdfg.array(&host).is_some()
    {
        return Ok(host);
    }

    let desc = sdfg.array(data).context(MissingDescriptorSnafu { graph: &sdfg.name, name: data })?;
    let shadow = desc.clone().with_storage(StorageType::CpuHeap).with_transient(true);
    let base = format!("cpu_{data}");
    let host = sdfg.add_datadesc(&base, shadow, true).context(NameCollisionSnafu { graph: &sdfg.name, name: base })?;
    tracing::debug!(data, shadow = %host, "created host shadow");
    clones.insert(data.to_string(), ClonePair::shadowed(host.clone(), data));
    created.push(host.clone());
    Ok(host)
}

/// Reroutes one tasklet edge touching device data through a host shadow.
fn reroute(
    sdfg: &mut Sdfg,
    state: StateId,
    tasklet: NodeId,
    edge: EdgeId,
    clones: &mut CloneTable,
    inherited: &CloneTable,
    created: &mut Vec<String>,
) -> Result<()> {
    let e = sdfg.state(state).edge(edge).clone();
    let writes = e.src == tasklet;
    let device_node = if writes { e.dst } else { e.src };
    let Some(data) = sdfg.state(state).node(device_node).as_access().map(str::to_string) else {
        return Ok(());
    };
    if !sdfg.array(&data).is_some_and(|d| d.storage.is_device_resident()) {
        return Ok(());
    }

    let host = shadow_for(sdfg, clones, inherited, &data, created)?;
    let subset = e.memlet.subset.clone();
    let mut moved = e.memlet.clone();
    moved.data = Some(host.clone());

    let graph = sdfg.state_mut(state);
    let host_node = graph.add_access(host.as_str());
    graph.remove_edge(edge);
    if writes {
        graph.add_edge(tasklet, e.src_conn.as_deref(), host_node, None, moved);
        graph.add_nedge(host_node, device_node, Memlet::new(host, subset.clone()).with_other_subset(subset));
    } else {
        graph.add_nedge(device_node, host_node, Memlet::new(data, subset.clone()).with_other_subset(subset));
        graph.add_edge(host_node, None, tasklet, e.dst_conn.as_deref(), moved);
    }
    Ok(())
}

/// Returns the names of the shadows created.
pub fn fix_host_tasklets(sdfg: &mut Sdfg, clones: &mut CloneTable, inherited: &CloneTable) -> Result<Vec<String>> {
    let mut created = Vec::new();
    for (state, tasklet) in host_tasklets(sdfg) {
        let graph = sdfg.state(state);
        let edges: Vec<EdgeId> = graph.out_edges(tasklet).into_iter().chain(graph.in_edges(tasklet)).collect();
        for edge in edges {
            reroute(sdfg, state, tasklet, edge, clones, inherited, &mut created)?;
        }
    }
    tracing::debug!(graph = %sdfg.name, shadows = ?created, "fixed host tasklet boundaries");
    Ok(created)
}
