//! Top-level program graph: a state machine over dataflow states.

use derive_more::Display;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, ensure};
use stratum_dtype::ScalarDType;

use crate::data::DataDescriptor;
use crate::error::{DecodeSnafu, EncodeSnafu, NameCollisionSnafu, Result};
use crate::interstate::InterstateEdge;
use crate::node::{Node, NodeId};
use crate::state::State;

/// Stable id of a state within its graph.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display("s{_0}")]
#[serde(transparent)]
pub struct StateId(pub u32);

/// Stable id of a transition within its graph.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display("t{_0}")]
#[serde(transparent)]
pub struct InterstateEdgeId(pub u32);

/// Directed control-flow edge between two states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub src: StateId,
    pub dst: StateId,
    pub edge: InterstateEdge,
}

/// Node visited by [`Sdfg::all_nodes_recursive`], with the graph and state
/// it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    pub sdfg: &'a Sdfg,
    pub state: StateId,
    pub id: NodeId,
    pub node: &'a Node,
}

/// Stateful dataflow graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sdfg {
    pub name: String,
    states: Vec<Option<State>>,
    transitions: Vec<Option<Transition>>,
    arrays: IndexMap<String, DataDescriptor>,
    /// Free symbols with their types.
    pub symbols: IndexMap<String, ScalarDType>,
    /// Symbols bound to compile-time constants.
    pub constants: IndexMap<String, i64>,
    start_state: Option<StateId>,
}

impl Sdfg {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    // ---------------------------------------------------------------------
    // States
    // ---------------------------------------------------------------------

    pub fn add_state(&mut self, label: impl Into<String>) -> StateId {
        let id = StateId(self.states.len() as u32);
        self.states.push(Some(State::new(label)));
        id
    }

    pub fn get_state(&self, id: StateId) -> Option<&State> {
        self.states.get(id.0 as usize).and_then(Option::as_ref)
    }

    /// State by id.
    ///
    /// # Panics
    ///
    /// Panics when `id` does not name a live state of this graph.
    pub fn state(&self, id: StateId) -> &State {
        self.get_state(id).unwrap_or_else(|| panic!("graph {:?} has no state {id}", self.name))
    }

    pub fn state_mut(&mut self, id: StateId) -> &mut State {
        let name = &self.name;
        match self.states.get_mut(id.0 as usize).and_then(Option::as_mut) {
            Some(state) => state,
            None => panic!("graph {name:?} has no state {id}"),
        }
    }

    pub fn states(&self) -> impl Iterator<Item = (StateId, &State)> {
        self.states.iter().enumerate().filter_map(|(i, s)| s.as_ref().map(|s| (StateId(i as u32), s)))
    }

    pub fn states_mut(&mut self) -> impl Iterator<Item = (StateId, &mut State)> {
        self.states.iter_mut().enumerate().filter_map(|(i, s)| s.as_mut().map(|s| (StateId(i as u32), s)))
    }

    pub fn state_ids(&self) -> Vec<StateId> {
        self.states().map(|(id, _)| id).collect()
    }

    pub fn state_count(&self) -> usize {
        self.states().count()
    }

    /// Removes a state with every transition touching it.
    pub fn remove_state(&mut self, id: StateId) -> Option<State> {
        let touching: Vec<_> =
            self.transitions().filter(|(_, t)| t.src == id || t.dst == id).map(|(tid, _)| tid).collect();
        for tid in touching {
            self.remove_edge(tid);
        }
        if self.start_state == Some(id) {
            self.start_state = None;
        }
        self.states.get_mut(id.0 as usize).and_then(Option::take)
    }

    pub fn set_start_state(&mut self, id: StateId) {
        self.start_state = Some(id);
    }

    /// Explicitly designated start state, if any.
    pub fn designated_start_state(&self) -> Option<StateId> {
        self.start_state
    }

    /// The designated start state, or else the unique state without predecessors.
    pub fn start_state(&self) -> Option<StateId> {
        if let Some(id) = self.start_state {
            return self.get_state(id).map(|_| id);
        }
        match self.source_states().as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    pub fn source_states(&self) -> Vec<StateId> {
        self.states().filter(|(id, _)| self.in_degree(*id) == 0).map(|(id, _)| id).collect()
    }

    /// States without outgoing transitions.
    pub fn sink_states(&self) -> Vec<StateId> {
        self.states().filter(|(id, _)| self.out_degree(*id) == 0).map(|(id, _)| id).collect()
    }

    /// Inserts a new state after `state`; its outgoing transitions now leave
    /// the new state, which is joined to `state` unconditionally.
    pub fn add_state_after(&mut self, state: StateId, label: impl Into<String>) -> StateId {
        let new = self.add_state(label);
        self.change_edge_src(state, new);
        self.add_edge(state, new, InterstateEdge::unconditional());
        new
    }

    /// Inserts a new state before `state`; its incoming transitions now enter
    /// the new state, which is joined to `state` unconditionally.
    pub fn add_state_before(&mut self, state: StateId, label: impl Into<String>) -> StateId {
        let new = self.add_state(label);
        self.change_edge_dst(state, new);
        self.add_edge(new, state, InterstateEdge::unconditional());
        if self.start_state == Some(state) {
            self.start_state = Some(new);
        }
        new
    }

    // ---------------------------------------------------------------------
    // Transitions
    // ---------------------------------------------------------------------

    pub fn add_edge(&mut self, src: StateId, dst: StateId, edge: InterstateEdge) -> InterstateEdgeId {
        let id = InterstateEdgeId(self.transitions.len() as u32);
        self.transitions.push(Some(Transition { src, dst, edge }));
        id
    }

    pub fn remove_edge(&mut self, id: InterstateEdgeId) -> Option<Transition> {
        self.transitions.get_mut(id.0 as usize).and_then(Option::take)
    }

    pub fn transition(&self, id: InterstateEdgeId) -> &Transition {
        match self.transitions.get(id.0 as usize).and_then(Option::as_ref) {
            Some(t) => t,
            None => panic!("graph {:?} has no transition {id}", self.name),
        }
    }

    pub fn transition_mut(&mut self, id: InterstateEdgeId) -> &mut Transition {
        let name = &self.name;
        match self.transitions.get_mut(id.0 as usize).and_then(Option::as_mut) {
            Some(t) => t,
            None => panic!("graph {name:?} has no transition {id}"),
        }
    }

    pub fn transitions(&self) -> impl Iterator<Item = (InterstateEdgeId, &Transition)> {
        self.transitions.iter().enumerate().filter_map(|(i, t)| t.as_ref().map(|t| (InterstateEdgeId(i as u32), t)))
    }

    pub fn transitions_mut(&mut self) -> impl Iterator<Item = (InterstateEdgeId, &mut Transition)> {
        self.transitions.iter_mut().enumerate().filter_map(|(i, t)| t.as_mut().map(|t| (InterstateEdgeId(i as u32), t)))
    }

    pub fn out_edges(&self, state: StateId) -> Vec<InterstateEdgeId> {
        self.transitions().filter(|(_, t)| t.src == state).map(|(id, _)| id).collect()
    }

    pub fn in_edges(&self, state: StateId) -> Vec<InterstateEdgeId> {
        self.transitions().filter(|(_, t)| t.dst == state).map(|(id, _)| id).collect()
    }

    pub fn in_degree(&self, state: StateId) -> usize {
        self.transitions().filter(|(_, t)| t.dst == state).count()
    }

    pub fn out_degree(&self, state: StateId) -> usize {
        self.transitions().filter(|(_, t)| t.src == state).count()
    }

    pub fn successors(&self, state: StateId) -> Vec<StateId> {
        self.transitions().filter(|(_, t)| t.src == state).map(|(_, t)| t.dst).collect()
    }

    pub fn predecessors(&self, state: StateId) -> Vec<StateId> {
        self.transitions().filter(|(_, t)| t.dst == state).map(|(_, t)| t.src).collect()
    }

    /// Moves every transition leaving `old` to leave `new` instead.
    pub fn change_edge_src(&mut self, old: StateId, new: StateId) {
        for (_, t) in self.transitions_mut() {
            if t.src == old {
                t.src = new;
            }
        }
    }

    /// Moves every transition entering `old` to enter `new` instead.
    pub fn change_edge_dst(&mut self, old: StateId, new: StateId) {
        for (_, t) in self.transitions_mut() {
            if t.dst == old {
                t.dst = new;
            }
        }
    }

    /// Symbols assigned on any transition.
    pub fn assigned_symbols(&self) -> IndexSet<String> {
        self.transitions().flat_map(|(_, t)| t.edge.assignments.keys().cloned()).collect()
    }

    // ---------------------------------------------------------------------
    // Data and symbols
    // ---------------------------------------------------------------------

    pub fn arrays(&self) -> &IndexMap<String, DataDescriptor> {
        &self.arrays
    }

    pub fn array(&self, name: &str) -> Option<&DataDescriptor> {
        self.arrays.get(name)
    }

    pub fn array_mut(&mut self, name: &str) -> Option<&mut DataDescriptor> {
        self.arrays.get_mut(name)
    }

    pub fn remove_data(&mut self, name: &str) -> Option<DataDescriptor> {
        self.arrays.shift_remove(name)
    }

    /// Whether `name` is taken by data, a symbol or a constant.
    pub fn is_name_used(&self, name: &str) -> bool {
        self.arrays.contains_key(name) || self.symbols.contains_key(name) || self.constants.contains_key(name)
    }

    /// `base` if unused, otherwise the first unused `base_0`, `base_1`, ...
    pub fn find_new_name(&self, base: &str) -> String {
        if !self.is_name_used(base) {
            return base.to_string();
        }
        let mut i = 0usize;
        loop {
            let candidate = format!("{base}_{i}");
            if !self.is_name_used(&candidate) {
                return candidate;
            }
            i += 1;
        }
    }

    /// Registers a descriptor and returns the name it was stored under.
    ///
    /// With `find_new_name` a fresh name is minted from `name` when it is
    /// taken; without it a taken name is an error.
    pub fn add_datadesc(&mut self, name: &str, desc: DataDescriptor, find_new_name: bool) -> Result<String> {
        let name = if find_new_name { self.find_new_name(name) } else { name.to_string() };
        ensure!(!self.is_name_used(&name), NameCollisionSnafu { graph: self.name.clone(), name });
        tracing::trace!(graph = %self.name, data = %name, storage = %desc.storage, "add data descriptor");
        self.arrays.insert(name.clone(), desc);
        Ok(name)
    }

    pub fn add_symbol(&mut self, name: impl Into<String>, dtype: ScalarDType) {
        self.symbols.insert(name.into(), dtype);
    }

    pub fn add_constant(&mut self, name: impl Into<String>, value: i64) {
        self.constants.insert(name.into(), value);
    }

    /// Symbols whose value never changes while the graph runs: constants and
    /// declared symbols no transition assigns.
    pub fn constant_symbols(&self) -> IndexSet<String> {
        let assigned = self.assigned_symbols();
        self.constants
            .keys()
            .cloned()
            .chain(self.symbols.keys().filter(|s| !assigned.contains(*s)).cloned())
            .collect()
    }

    /// Points every access node and memlet referencing `old` at `new`, in all states.
    pub fn rename_data(&mut self, old: &str, new: &str) {
        for (_, state) in self.states_mut() {
            state.rename_data(old, new);
        }
    }

    /// Data names referenced by any state of this graph.
    pub fn referenced_data(&self) -> IndexSet<String> {
        self.states().flat_map(|(_, s)| s.referenced_data()).collect()
    }

    /// Every node of this graph and of all nested graphs, depth first.
    pub fn all_nodes_recursive(&self) -> Vec<NodeRef<'_>> {
        let mut out = Vec::new();
        self.collect_nodes(&mut out);
        out
    }

    fn collect_nodes<'a>(&'a self, out: &mut Vec<NodeRef<'a>>) {
        for (state_id, state) in self.states() {
            for (id, node) in state.nodes() {
                out.push(NodeRef { sdfg: self, state: state_id, id, node });
                if let Node::NestedSdfg(nested) = node {
                    nested.sdfg.collect_nodes(out);
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Portable form
    // ---------------------------------------------------------------------

    /// Lossless JSON encoding, suitable for shipping across processes.
    pub fn to_portable_form(&self) -> Result<String> {
        serde_json::to_string(self).context(EncodeSnafu { graph: self.name.clone() })
    }

    pub fn from_portable_form(text: &str) -> Result<Self> {
        serde_json::from_str(text).context(DecodeSnafu)
    }
}
