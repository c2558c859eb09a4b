//! States: dataflow multigraphs of nodes joined by memlet edges.
//!
//! Nodes and edges live in arenas addressed by [`NodeId`] and [`EdgeId`].
//! Removal leaves a hole, so ids stay stable for the lifetime of the state and
//! iteration always follows insertion order.

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use stratum_device::ScheduleType;

use crate::library::LibraryNode;
use crate::memlet::Memlet;
use crate::node::{
    ConsumeScope, Connectors, EdgeId, IN_PREFIX, MapScope, NestedSdfg, Node, NodeId, OUT_PREFIX, Tasklet,
};
use crate::sdfg::Sdfg;
use crate::subset::Subset;
use crate::symbolic::Expr;

/// Dataflow edge between two nodes, optionally bound to connectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiEdge {
    pub src: NodeId,
    pub src_conn: Option<String>,
    pub dst: NodeId,
    pub dst_conn: Option<String>,
    pub memlet: Memlet,
}

/// Scope tree of a state: node to its innermost enclosing scope entry.
pub type ScopeDict = IndexMap<NodeId, Option<NodeId>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub label: String,
    nodes: Vec<Option<Node>>,
    edges: Vec<Option<MultiEdge>>,
}

impl State {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), nodes: Vec::new(), edges: Vec::new() }
    }

    // ---------------------------------------------------------------------
    // Nodes
    // ---------------------------------------------------------------------

    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        id
    }

    pub fn add_access(&mut self, data: impl Into<String>) -> NodeId {
        self.add_node(Node::access(data))
    }

    pub fn add_tasklet(
        &mut self,
        label: impl Into<String>,
        inputs: &[&str],
        outputs: &[&str],
        code: impl Into<String>,
    ) -> NodeId {
        self.add_node(Node::Tasklet(Tasklet {
            label: label.into(),
            code: code.into(),
            connectors: Connectors::new(inputs.iter().copied(), outputs.iter().copied()),
            schedule: ScheduleType::Default,
        }))
    }

    /// Adds a map scope and returns its `(entry, exit)` pair.
    pub fn add_map(
        &mut self,
        label: impl Into<String>,
        params: &[&str],
        range: Subset,
        schedule: ScheduleType,
    ) -> (NodeId, NodeId) {
        let map = MapScope { label: label.into(), params: params.iter().map(|p| p.to_string()).collect(), range, schedule };
        let entry = self.add_node(Node::MapEntry { map, connectors: Connectors::default() });
        let exit = self.add_node(Node::MapExit { entry, connectors: Connectors::default() });
        (entry, exit)
    }

    /// Adds a consume scope and returns its `(entry, exit)` pair.
    pub fn add_consume(
        &mut self,
        label: impl Into<String>,
        pe_index: impl Into<String>,
        num_pes: Expr,
        schedule: ScheduleType,
    ) -> (NodeId, NodeId) {
        let consume = ConsumeScope { label: label.into(), pe_index: pe_index.into(), num_pes, schedule };
        let entry = self.add_node(Node::ConsumeEntry { consume, connectors: Connectors::default() });
        let exit = self.add_node(Node::ConsumeExit { entry, connectors: Connectors::default() });
        (entry, exit)
    }

    pub fn add_nested_sdfg(
        &mut self,
        label: impl Into<String>,
        sdfg: Sdfg,
        inputs: &[&str],
        outputs: &[&str],
        symbol_mapping: IndexMap<String, Expr>,
    ) -> NodeId {
        self.add_node(Node::NestedSdfg(NestedSdfg {
            label: label.into(),
            sdfg: Box::new(sdfg),
            connectors: Connectors::new(inputs.iter().copied(), outputs.iter().copied()),
            symbol_mapping,
            schedule: ScheduleType::Default,
        }))
    }

    pub fn add_library(&mut self, node: LibraryNode) -> NodeId {
        self.add_node(Node::Library(node))
    }

    /// Adds the `IN_<name>` / `OUT_<name>` connector pair to a scope node.
    pub fn add_scope_connectors(&mut self, scope_node: NodeId, name: &str) {
        if let Some(conns) = self.node_mut(scope_node).connectors_mut() {
            conns.inputs.insert(format!("{IN_PREFIX}{name}"));
            conns.outputs.insert(format!("{OUT_PREFIX}{name}"));
        }
    }

    pub fn add_in_connector(&mut self, node: NodeId, name: &str) -> bool {
        self.node_mut(node).connectors_mut().is_some_and(|c| c.inputs.insert(name.to_string()))
    }

    pub fn add_out_connector(&mut self, node: NodeId, name: &str) -> bool {
        self.node_mut(node).connectors_mut().is_some_and(|c| c.outputs.insert(name.to_string()))
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    /// Node by id.
    ///
    /// # Panics
    ///
    /// Panics when `id` does not name a live node of this state.
    pub fn node(&self, id: NodeId) -> &Node {
        self.get_node(id).unwrap_or_else(|| panic!("state {:?} has no node {id}", self.label))
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        let label = &self.label;
        match self.nodes.get_mut(id.0 as usize).and_then(Option::as_mut) {
            Some(node) => node,
            None => panic!("state {label:?} has no node {id}"),
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i as u32), n)))
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut Node)> {
        self.nodes.iter_mut().enumerate().filter_map(|(i, n)| n.as_mut().map(|n| (NodeId(i as u32), n)))
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes().map(|(id, _)| id).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(Option::is_none)
    }

    /// Access nodes with their data names.
    pub fn data_nodes(&self) -> impl Iterator<Item = (NodeId, &str)> {
        self.nodes().filter_map(|(id, n)| n.as_access().map(|d| (id, d)))
    }

    /// Removes a node together with every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        for edge in self.all_edges_of(id) {
            self.remove_edge(edge);
        }
        self.nodes.get_mut(id.0 as usize).and_then(Option::take)
    }

    // ---------------------------------------------------------------------
    // Edges
    // ---------------------------------------------------------------------

    pub fn add_edge(
        &mut self,
        src: NodeId,
        src_conn: Option<&str>,
        dst: NodeId,
        dst_conn: Option<&str>,
        memlet: Memlet,
    ) -> EdgeId {
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Some(MultiEdge {
            src,
            src_conn: src_conn.map(str::to_string),
            dst,
            dst_conn: dst_conn.map(str::to_string),
            memlet,
        }));
        id
    }

    /// Edge without connectors, as used for direct copies between access nodes.
    pub fn add_nedge(&mut self, src: NodeId, dst: NodeId, memlet: Memlet) -> EdgeId {
        self.add_edge(src, None, dst, None, memlet)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<MultiEdge> {
        self.edges.get_mut(id.0 as usize).and_then(Option::take)
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&MultiEdge> {
        self.edges.get(id.0 as usize).and_then(Option::as_ref)
    }

    /// Edge by id.
    ///
    /// # Panics
    ///
    /// Panics when `id` does not name a live edge of this state.
    pub fn edge(&self, id: EdgeId) -> &MultiEdge {
        self.get_edge(id).unwrap_or_else(|| panic!("state {:?} has no edge {id}", self.label))
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> &mut MultiEdge {
        let label = &self.label;
        match self.edges.get_mut(id.0 as usize).and_then(Option::as_mut) {
            Some(edge) => edge,
            None => panic!("state {label:?} has no edge {id}"),
        }
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &MultiEdge)> {
        self.edges.iter().enumerate().filter_map(|(i, e)| e.as_ref().map(|e| (EdgeId(i as u32), e)))
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = (EdgeId, &mut MultiEdge)> {
        self.edges.iter_mut().enumerate().filter_map(|(i, e)| e.as_mut().map(|e| (EdgeId(i as u32), e)))
    }

    pub fn in_edges(&self, node: NodeId) -> Vec<EdgeId> {
        self.edges().filter(|(_, e)| e.dst == node).map(|(id, _)| id).collect()
    }

    pub fn out_edges(&self, node: NodeId) -> Vec<EdgeId> {
        self.edges().filter(|(_, e)| e.src == node).map(|(id, _)| id).collect()
    }

    fn all_edges_of(&self, node: NodeId) -> Vec<EdgeId> {
        self.edges().filter(|(_, e)| e.src == node || e.dst == node).map(|(id, _)| id).collect()
    }

    pub fn in_degree(&self, node: NodeId) -> usize {
        self.edges().filter(|(_, e)| e.dst == node).count()
    }

    pub fn out_degree(&self, node: NodeId) -> usize {
        self.edges().filter(|(_, e)| e.src == node).count()
    }

    /// Edges bound to `conn` on `node`, whether as input or output connector.
    pub fn edges_by_connector(&self, node: NodeId, conn: &str) -> Vec<EdgeId> {
        self.edges()
            .filter(|(_, e)| {
                (e.src == node && e.src_conn.as_deref() == Some(conn))
                    || (e.dst == node && e.dst_conn.as_deref() == Some(conn))
            })
            .map(|(id, _)| id)
            .collect()
    }

    pub fn source_nodes(&self) -> Vec<NodeId> {
        self.nodes().filter(|(id, _)| self.in_degree(*id) == 0).map(|(id, _)| id).collect()
    }

    pub fn sink_nodes(&self) -> Vec<NodeId> {
        self.nodes().filter(|(id, _)| self.out_degree(*id) == 0).map(|(id, _)| id).collect()
    }

    /// Edges with an endpoint that names no live node.
    pub fn dangling_edges(&self) -> Vec<(EdgeId, NodeId)> {
        self.edges()
            .filter_map(|(id, e)| {
                [e.src, e.dst].into_iter().find(|n| self.get_node(*n).is_none()).map(|n| (id, n))
            })
            .collect()
    }

    /// Kahn topological order, ties broken by insertion order.
    ///
    /// Returns `None` when the dataflow contains a cycle. Dangling edges are
    /// ignored; see [`Self::dangling_edges`].
    pub fn topological_order(&self) -> Option<Vec<NodeId>> {
        let live = |e: &MultiEdge| self.get_node(e.src).is_some() && self.get_node(e.dst).is_some();
        let mut indegree: IndexMap<NodeId, usize> = self.nodes().map(|(id, _)| (id, 0)).collect();
        for (_, e) in self.edges().filter(|(_, e)| live(e)) {
            *indegree.entry(e.dst).or_default() += 1;
        }

        let mut queue: VecDeque<NodeId> = indegree.iter().filter(|(_, d)| **d == 0).map(|(id, _)| *id).collect();
        let mut order = Vec::with_capacity(indegree.len());
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for (_, e) in self.edges().filter(|(_, e)| e.src == id && live(e)) {
                if let Some(d) = indegree.get_mut(&e.dst) {
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(e.dst);
                    }
                }
            }
        }

        (order.len() == indegree.len()).then_some(order)
    }

    // ---------------------------------------------------------------------
    // Scopes
    // ---------------------------------------------------------------------

    /// Innermost scope entry of every node.
    ///
    /// A node inherits the scope of its first predecessor: the predecessor
    /// itself when it is an entry, the entry's parent scope when it is an exit.
    /// Exit nodes belong to the scope their own entry opens.
    pub fn scope_dict(&self) -> ScopeDict {
        let order = self.topological_order().unwrap_or_else(|| self.node_ids());
        let mut scopes = ScopeDict::with_capacity(order.len());

        for id in order {
            let node = self.node(id);
            let scope = if let Some(entry) = node.exit_entry() {
                Some(entry)
            } else {
                self.edges().find(|(_, e)| e.dst == id).and_then(|(_, e)| {
                    let pred = self.node(e.src);
                    if pred.is_entry() {
                        Some(e.src)
                    } else if let Some(entry) = pred.exit_entry() {
                        scopes.get(&entry).copied().flatten()
                    } else {
                        scopes.get(&e.src).copied().flatten()
                    }
                })
            };
            scopes.insert(id, scope);
        }

        // Unreached nodes (only possible in cyclic dataflow) stay top-level.
        for id in self.node_ids() {
            scopes.entry(id).or_insert(None);
        }
        scopes
    }

    /// Scope entry directly enclosing `node`, `None` at the top level.
    pub fn scope_of(&self, node: NodeId) -> Option<NodeId> {
        self.scope_dict().get(&node).copied().flatten()
    }

    /// Scope entry governing `node`: the enclosing entry, or for an exit node
    /// the entry it closes. Same as [`State::scope_of`].
    pub fn entry_node(&self, node: NodeId) -> Option<NodeId> {
        self.scope_of(node)
    }

    /// Exit node closing the scope opened by `entry`.
    pub fn exit_node(&self, entry: NodeId) -> Option<NodeId> {
        self.nodes().find(|(_, n)| n.exit_entry() == Some(entry)).map(|(id, _)| id)
    }

    /// Nodes grouped by their enclosing scope; the top level is keyed by `None`.
    pub fn scope_children(&self) -> IndexMap<Option<NodeId>, Vec<NodeId>> {
        let mut children: IndexMap<Option<NodeId>, Vec<NodeId>> = IndexMap::new();
        children.insert(None, Vec::new());
        for (node, scope) in self.scope_dict() {
            children.entry(scope).or_default().push(node);
        }
        children
    }

    /// Scope entries enclosing `node`, innermost first.
    pub fn enclosing_scopes(&self, node: NodeId) -> Vec<NodeId> {
        let scopes = self.scope_dict();
        let mut chain = Vec::new();
        let mut current = scopes.get(&node).copied().flatten();
        while let Some(entry) = current {
            if chain.contains(&entry) {
                break;
            }
            chain.push(entry);
            current = scopes.get(&entry).copied().flatten();
        }
        chain
    }

    /// Whether any scope enclosing `node` runs on the device.
    pub fn in_device_scope(&self, node: NodeId) -> bool {
        self.enclosing_scopes(node).into_iter().any(|entry| self.node(entry).schedule().is_some_and(|s| s.is_device()))
    }

    /// Map parameters and dynamic range connectors visible inside `node`'s scopes.
    pub fn scope_symbols(&self, node: NodeId) -> IndexSet<String> {
        let mut symbols = IndexSet::new();
        for entry in self.enclosing_scopes(node) {
            match self.node(entry) {
                Node::MapEntry { map, connectors } => {
                    symbols.extend(map.params.iter().cloned());
                    symbols.extend(connectors.inputs.iter().filter(|c| !c.starts_with(IN_PREFIX)).cloned());
                }
                Node::ConsumeEntry { consume, connectors } => {
                    symbols.insert(consume.pe_index.clone());
                    symbols.extend(connectors.inputs.iter().filter(|c| !c.starts_with(IN_PREFIX)).cloned());
                }
                _ => {}
            }
        }
        symbols
    }

    // ---------------------------------------------------------------------
    // Memlet paths
    // ---------------------------------------------------------------------

    /// Full path of the memlet on `edge` across scope boundaries.
    ///
    /// Follows `IN_x`/`OUT_x` connector pairs through entry and exit nodes in
    /// both directions. The walk stops where the continuation is not unique,
    /// so the first edge starts at the true source and the last one ends at
    /// the true destination whenever those are well defined.
    pub fn memlet_path(&self, edge: EdgeId) -> Vec<EdgeId> {
        let mut path = VecDeque::from([edge]);

        let mut current = edge;
        while let Some(prev) = self.upstream(current) {
            if path.contains(&prev) {
                break;
            }
            path.push_front(prev);
            current = prev;
        }

        let mut current = edge;
        while let Some(next) = self.downstream(current) {
            if path.contains(&next) {
                break;
            }
            path.push_back(next);
            current = next;
        }

        path.into()
    }

    fn upstream(&self, edge: EdgeId) -> Option<EdgeId> {
        let e = self.edge(edge);
        let src = self.node(e.src);
        if !(src.is_entry() || src.is_exit()) {
            return None;
        }
        let name = e.src_conn.as_deref()?.strip_prefix(OUT_PREFIX)?;
        let conn = format!("{IN_PREFIX}{name}");
        let mut candidates = self.edges().filter(|(_, p)| p.dst == e.src && p.dst_conn.as_deref() == Some(&conn));
        match (candidates.next(), candidates.next()) {
            (Some((id, _)), None) => Some(id),
            _ => None,
        }
    }

    fn downstream(&self, edge: EdgeId) -> Option<EdgeId> {
        let e = self.edge(edge);
        let dst = self.node(e.dst);
        if !(dst.is_entry() || dst.is_exit()) {
            return None;
        }
        let name = e.dst_conn.as_deref()?.strip_prefix(IN_PREFIX)?;
        let conn = format!("{OUT_PREFIX}{name}");
        let mut candidates = self.edges().filter(|(_, n)| n.src == e.dst && n.src_conn.as_deref() == Some(&conn));
        match (candidates.next(), candidates.next()) {
            (Some((id, _)), None) => Some(id),
            _ => None,
        }
    }

    /// First edge of the path through `edge`.
    pub fn path_source(&self, edge: EdgeId) -> EdgeId {
        self.memlet_path(edge).first().copied().unwrap_or(edge)
    }

    /// Last edge of the path through `edge`.
    pub fn path_sink(&self, edge: EdgeId) -> EdgeId {
        self.memlet_path(edge).last().copied().unwrap_or(edge)
    }

    // ---------------------------------------------------------------------
    // Renaming
    // ---------------------------------------------------------------------

    /// Points every access node and memlet referencing `old` at `new`.
    pub fn rename_data(&mut self, old: &str, new: &str) {
        for (_, node) in self.nodes_mut() {
            if let Node::Access { data } = node
                && data == old
            {
                *data = new.to_string();
            }
        }
        for (_, edge) in self.edges_mut() {
            edge.memlet.rename(old, new);
        }
    }

    /// Data names referenced by access nodes and memlets.
    pub fn referenced_data(&self) -> IndexSet<String> {
        let mut names: IndexSet<String> = self.data_nodes().map(|(_, d)| d.to_string()).collect();
        names.extend(self.edges().filter_map(|(_, e)| e.memlet.data.clone()));
        names
    }
}
