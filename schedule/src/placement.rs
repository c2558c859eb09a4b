//! Host/device classification of tasklets through their scalar closures.
//!
//! A tasklet may stay on the host only when everything it reads and writes,
//! followed along memlet paths and through chains of single-element
//! containers, is host data. Marking one tasklet for the device makes the
//! scalars it touches device resident, which can flip the verdict for other
//! tasklets, so classification runs to a global fixpoint.

use indexmap::{IndexMap, IndexSet};
use stratum_device::ScheduleType;
use stratum_ir::{NodeId, Sdfg, State, StateId};

/// Device-resident scalars, each with its host shadow once one exists.
pub type DeviceScalars = IndexMap<String, Option<String>>;

/// Scalars reached from a node and whether all of them may stay on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarClosure {
    pub scalars: IndexSet<String>,
    pub host_safe: bool,
}

impl Default for ScalarClosure {
    fn default() -> Self {
        Self { scalars: IndexSet::new(), host_safe: true }
    }
}

impl ScalarClosure {
    fn merge(&mut self, other: ScalarClosure) {
        self.scalars.extend(other.scalars);
        self.host_safe &= other.host_safe;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Outputs,
    Inputs,
}

/// Closure over everything `node` writes, following paths downstream.
pub fn check_outputs(sdfg: &Sdfg, state: &State, node: NodeId, known: &DeviceScalars) -> ScalarClosure {
    closure(sdfg, state, node, known, Direction::Outputs, &mut IndexSet::new())
}

/// Closure over everything `node` reads, following paths upstream.
pub fn check_inputs(sdfg: &Sdfg, state: &State, node: NodeId, known: &DeviceScalars) -> ScalarClosure {
    closure(sdfg, state, node, known, Direction::Inputs, &mut IndexSet::new())
}

fn closure(
    sdfg: &Sdfg,
    state: &State,
    node: NodeId,
    known: &DeviceScalars,
    direction: Direction,
    visited: &mut IndexSet<NodeId>,
) -> ScalarClosure {
    let mut result = ScalarClosure::default();
    if !visited.insert(node) {
        return result;
    }

    let edges = match direction {
        Direction::Outputs => state.out_edges(node),
        Direction::Inputs => state.in_edges(node),
    };
    for edge in edges {
        let (far_edge, far_node) = match direction {
            Direction::Outputs => {
                let last = state.path_sink(edge);
                (last, state.edge(last).dst)
            }
            Direction::Inputs => {
                let first = state.path_source(edge);
                (first, state.edge(first).src)
            }
        };
        let Some(data) = state.node(far_node).as_access() else { continue };
        let Some(desc) = sdfg.array(data) else {
            result.host_safe = false;
            continue;
        };

        if desc.is_scalar() {
            if desc.storage.is_device_resident() || known.contains_key(data) {
                result.host_safe = false;
            }
            result.scalars.insert(data.to_string());
            result.merge(closure(sdfg, state, far_node, known, direction, visited));
            continue;
        }

        let single = state.edge(far_edge).memlet.num_elements().as_int() == Some(1);
        if !desc.storage.is_device_resident() && single {
            result.merge(closure(sdfg, state, far_node, known, direction, visited));
            continue;
        }
        result.host_safe = false;
    }
    result
}

/// Outcome of [`classify_tasklets`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Tasklets moved to the device, in the order they were marked.
    pub marked: IndexSet<(StateId, NodeId)>,
    /// Full scans until nothing changed, including the final quiet one.
    pub passes: usize,
}

/// Host tasklets at the top level of their state and outside device scopes.
pub fn host_tasklets(sdfg: &Sdfg) -> Vec<(StateId, NodeId)> {
    let mut found = Vec::new();
    for (state_id, state) in sdfg.states() {
        let scopes = state.scope_dict();
        for (id, node) in state.nodes() {
            let stratum_ir::Node::Tasklet(tasklet) = node else { continue };
            let top_level = scopes.get(&id).copied().flatten().is_none();
            if top_level && !tasklet.schedule.is_device() && !state.in_device_scope(id) {
                found.push((state_id, id));
            }
        }
    }
    found
}

/// Runs the classification fixpoint and schedules marked tasklets as
/// [`ScheduleType::GpuDefault`].
///
/// `parent_schedule` is the schedule of the nested node that owns `sdfg`;
/// under a device-default parent every candidate is marked.
#[tracing::instrument(level = "debug", skip_all, fields(graph = %sdfg.name))]
pub fn classify_tasklets(
    sdfg: &mut Sdfg,
    device_scalars: &mut DeviceScalars,
    parent_schedule: Option<ScheduleType>,
) -> Classification {
    let candidates = host_tasklets(sdfg);
    let force = parent_schedule == Some(ScheduleType::GpuDefault);
    let mut classification = Classification::default();

    let mut changed = true;
    while changed {
        changed = false;
        classification.passes += 1;
        for &(state_id, node) in &candidates {
            if classification.marked.contains(&(state_id, node)) {
                continue;
            }
            let state = sdfg.state(state_id);
            let mut closure = check_outputs(sdfg, state, node, device_scalars);
            closure.merge(check_inputs(sdfg, state, node, device_scalars));

            if !closure.host_safe || force {
                tracing::trace!(
                    state = %state.label,
                    tasklet = state.node(node).label(),
                    scalars = ?closure.scalars,
                    "tasklet must run on the device"
                );
                for scalar in closure.scalars {
                    device_scalars.entry(scalar).or_insert(None);
                }
                classification.marked.insert((state_id, node));
                changed = true;
            }
        }
    }

    for &(state_id, node) in &classification.marked {
        sdfg.state_mut(state_id).node_mut(node).set_schedule(ScheduleType::GpuDefault);
    }
    tracing::debug!(
        marked = classification.marked.len(),
        passes = classification.passes,
        device_scalars = device_scalars.len(),
        "tasklet classification converged"
    );
    classification
}
