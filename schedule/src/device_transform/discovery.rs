//! Step 1: find the non-transient data the graph exchanges with the host.

use indexmap::IndexSet;
use stratum_ir::node::IN_PREFIX;
use stratum_ir::{NodeId, Sdfg, State};

/// Candidate inputs and outputs, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovered {
    pub inputs: IndexSet<String>,
    pub outputs: IndexSet<String>,
}

/// Scope entries whose dynamic range connectors `node` feeds.
///
/// A dynamic range input enters an entry through a connector without the
/// `IN_` prefix and is read by the host when the scope is launched.
pub fn dynamic_range_targets(state: &State, node: NodeId) -> Vec<NodeId> {
    state
        .out_edges(node)
        .into_iter()
        .filter_map(|edge| {
            let last = state.edge(state.path_sink(edge));
            let is_range = last.dst_conn.as_deref().is_some_and(|c| !c.starts_with(IN_PREFIX));
            (state.node(last.dst).is_entry() && is_range).then_some(last.dst)
        })
        .collect()
}

pub fn discover(sdfg: &Sdfg) -> Discovered {
    let mut found = Discovered::default();

    for (_, state) in sdfg.states() {
        let scopes = state.scope_dict();
        for (id, data) in state.data_nodes() {
            let Some(desc) = sdfg.array(data) else { continue };
            if desc.transient {
                continue;
            }
            if state.out_degree(id) > 0 {
                let feeds_range = dynamic_range_targets(state, id)
                    .into_iter()
                    .any(|entry| scopes.get(&entry).copied().flatten().is_none());
                if feeds_range {
                    tracing::debug!(data, state = %state.label, "input feeds a dynamic map range, kept on host");
                } else {
                    found.inputs.insert(data.to_string());
                }
            }
            if state.in_degree(id) > 0 {
                found.outputs.insert(data.to_string());
            }
        }

        // Reductions read the old value, so their targets are inputs too.
        for (_, edge) in state.edges() {
            if edge.memlet.wcr.is_none() {
                continue;
            }
            if let Some(data) = &edge.memlet.data
                && sdfg.array(data).is_some_and(|d| !d.transient)
            {
                found.inputs.insert(data.clone());
            }
        }
    }

    tracing::debug!(inputs = ?found.inputs, outputs = ?found.outputs, "discovered host data");
    found
}
