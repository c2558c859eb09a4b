//! Step 5: top-level scopes and library/nested nodes move to the device.

use indexmap::IndexSet;
use stratum_device::{ScheduleType, StorageType};
use stratum_ir::{Node, NodeId, Sdfg, State};

/// Data written along the paths leaving `node`.
fn written_data(state: &State, node: NodeId) -> Vec<String> {
    state
        .out_edges(node)
        .into_iter()
        .filter_map(|edge| state.node(state.edge(state.path_sink(edge)).dst).as_access().map(str::to_string))
        .collect()
}

/// Reschedules every top-level scope entry as a kernel and every top-level
/// library or nested node as device default, and places what they write in
/// device global memory. Returns the number of rescheduled nodes.
pub fn reschedule_top_level(sdfg: &mut Sdfg) -> usize {
    let mut rescheduled = 0;
    let mut outputs: IndexSet<String> = IndexSet::new();

    for state_id in sdfg.state_ids() {
        let state = sdfg.state(state_id);
        let scopes = state.scope_dict();
        let mut targets = Vec::new();
        for (id, node) in state.nodes() {
            if scopes.get(&id).copied().flatten().is_some() {
                continue;
            }
            let (schedule, writer) = match node {
                Node::MapEntry { .. } => (ScheduleType::GpuDevice, state.exit_node(id)),
                Node::Library(_) | Node::NestedSdfg(_) => (ScheduleType::GpuDefault, Some(id)),
                _ => continue,
            };
            targets.push((id, schedule));
            if let Some(writer) = writer {
                outputs.extend(written_data(state, writer));
            }
        }

        let state = sdfg.state_mut(state_id);
        for (id, schedule) in targets {
            state.node_mut(id).set_schedule(schedule);
            rescheduled += 1;
        }
    }

    for name in &outputs {
        if let Some(desc) = sdfg.array_mut(name) {
            desc.storage = StorageType::GpuGlobal;
        }
    }
    tracing::debug!(graph = %sdfg.name, rescheduled, outputs = ?outputs, "rescheduled top-level nodes");
    rescheduled
}
