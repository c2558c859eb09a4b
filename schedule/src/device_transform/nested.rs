//! Step 7: recursion into nested graphs.

use indexmap::{IndexMap, IndexSet};
use stratum_device::StorageType;
use stratum_ir::{Node, NodeId, Sdfg, State, StateId};

use super::DeviceTransform;
use crate::config::{CloneTable, DeviceTransformConfig};
use crate::error::Result;
use crate::placement::DeviceScalars;
use crate::simplify::SimplificationHook;

/// How the connectors of a nested node bind to data of the enclosing graph.
#[derive(Debug, Default)]
struct Bindings {
    /// Connector to the outer data at the far end of its memlet path.
    outer: IndexMap<String, String>,
    resident_inputs: IndexSet<String>,
    resident_outputs: IndexSet<String>,
    storage: Vec<(String, StorageType)>,
}

fn bindings(sdfg: &Sdfg, state: &State, node: NodeId) -> Bindings {
    let mut bound = Bindings::default();
    let Node::NestedSdfg(nested) = state.node(node) else { return bound };

    for conn in &nested.connectors.inputs {
        for edge in state.edges_by_connector(node, conn) {
            if state.edge(edge).dst != node {
                continue;
            }
            let source = state.edge(state.path_source(edge)).src;
            let Some(data) = state.node(source).as_access() else { continue };
            bound.outer.insert(conn.clone(), data.to_string());
            if let Some(storage) = sdfg.array(data).map(|d| d.storage).filter(|s| s.is_device_resident()) {
                bound.resident_inputs.insert(conn.clone());
                bound.storage.push((conn.clone(), storage));
            }
        }
    }
    for conn in &nested.connectors.outputs {
        for edge in state.edges_by_connector(node, conn) {
            if state.edge(edge).src != node {
                continue;
            }
            let sink = state.edge(state.path_sink(edge)).dst;
            let Some(data) = state.node(sink).as_access() else { continue };
            bound.outer.insert(conn.clone(), data.to_string());
            if let Some(storage) = sdfg.array(data).map(|d| d.storage).filter(|s| s.is_device_resident()) {
                bound.resident_outputs.insert(conn.clone());
                bound.storage.push((conn.clone(), storage));
            }
        }
    }
    bound
}

/// Top-level nested nodes outside device scopes.
fn candidates(sdfg: &Sdfg) -> Vec<(StateId, NodeId)> {
    let mut found = Vec::new();
    for (state_id, state) in sdfg.states() {
        for (id, node) in state.nodes() {
            if matches!(node, Node::NestedSdfg(_)) && state.entry_node(id).is_none() && !state.in_device_scope(id) {
                found.push((state_id, id));
            }
        }
    }
    found
}

/// Applies the transform to every eligible nested graph. Returns how many
/// nested graphs were transformed.
///
/// Each nested graph tracks device scalars in its own namespace. Only scalars
/// bound to a connector cross the boundary, in both directions.
pub fn transform_nested(
    sdfg: &mut Sdfg,
    parent: &DeviceTransform,
    clones: &CloneTable,
    device_scalars: &mut DeviceScalars,
    hook: &dyn SimplificationHook,
) -> Result<usize> {
    let mut inherited = parent.config().inherited_clones.clone();
    inherited.extend(clones.iter().map(|(k, v)| (k.clone(), v.clone())));

    let mut applied = 0;
    for (state_id, id) in candidates(sdfg) {
        let bound = bindings(sdfg, sdfg.state(state_id), id);
        let Node::NestedSdfg(nested) = sdfg.state_mut(state_id).node_mut(id) else { continue };

        if !DeviceTransform::can_apply(&nested.sdfg) {
            tracing::warn!(nested = %nested.label, "nested graph cannot be moved to the device, skipping");
            continue;
        }
        for (conn, storage) in &bound.storage {
            if let Some(desc) = nested.sdfg.array_mut(conn) {
                desc.storage = *storage;
            }
        }

        let child = DeviceTransform {
            config: DeviceTransformConfig {
                validate_result: false,
                excluded_copyin: bound.resident_inputs,
                excluded_copyout: bound.resident_outputs,
                inherited_clones: inherited.clone(),
                ..parent.config().clone()
            },
            parent_schedule: Some(nested.schedule),
        };
        tracing::debug!(nested = %nested.label, schedule = %nested.schedule, "descending into nested graph");
        let mut inner_scalars: DeviceScalars = bound
            .outer
            .iter()
            .filter(|(_, data)| device_scalars.contains_key(*data))
            .map(|(conn, _)| (conn.clone(), None))
            .collect();
        child.run(&mut nested.sdfg, &mut inner_scalars, hook)?;

        for (conn, data) in &bound.outer {
            if inner_scalars.contains_key(conn) && !device_scalars.contains_key(data) {
                tracing::trace!(nested = %nested.label, %conn, %data, "device scalar leaves nested graph");
                device_scalars.insert(data.clone(), None);
            }
        }
        applied += 1;
    }
    Ok(applied)
}
