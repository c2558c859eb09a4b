//! Per-state dataflow checks.

use indexmap::IndexSet;
use snafu::ensure;
use stratum_device::ScheduleType;

use super::{
    CyclicDataflowSnafu, DanglingEdgeSnafu, IllegalSubsetReferenceSnafu, InvalidScopeNestingSnafu, Result,
    UndefinedDataSnafu, UndefinedSymbolInSubsetSnafu, UnknownConnectorSnafu, UnsupportedScopeKindSnafu,
};
use crate::node::{EdgeId, Node, NodeId};
use crate::sdfg::Sdfg;
use crate::state::{MultiEdge, ScopeDict, State};
use crate::subset::Subset;

pub(super) fn validate_state(sdfg: &Sdfg, state: &State) -> Result<()> {
    let graph = sdfg.name.as_str();
    let label = state.label.as_str();

    if let Some(&(edge, node)) = state.dangling_edges().first() {
        return DanglingEdgeSnafu { graph, state: label, edge, node }.fail();
    }
    ensure!(state.topological_order().is_some(), CyclicDataflowSnafu { graph, state: label });

    let scopes = state.scope_dict();
    validate_scope_pairs(sdfg, state)?;
    validate_scope_kinds(sdfg, state)?;

    for (_, node) in state.nodes() {
        if let Some(data) = node.as_access() {
            ensure!(sdfg.array(data).is_some(), UndefinedDataSnafu { graph, state: label, name: data });
        }
    }

    let assigned = sdfg.assigned_symbols();
    for (edge_id, edge) in state.edges() {
        validate_scope_edge(sdfg, state, &scopes, edge)?;
        validate_connectors(sdfg, state, edge)?;

        if let Some(data) = &edge.memlet.data {
            ensure!(sdfg.array(data).is_some(), UndefinedDataSnafu { graph, state: label, name: data });
        }

        let mut visible: IndexSet<String> = state.scope_symbols(edge.src);
        visible.extend(state.scope_symbols(edge.dst));
        for subset in std::iter::once(&edge.memlet.subset).chain(edge.memlet.other_subset.as_ref()) {
            validate_subset(sdfg, state, edge_id, subset, &visible, &assigned)?;
        }
    }
    Ok(())
}

/// Every exit closes an entry of the same kind, and every entry has exactly one exit.
fn validate_scope_pairs(sdfg: &Sdfg, state: &State) -> Result<()> {
    let (graph, label) = (sdfg.name.as_str(), state.label.as_str());

    for (id, node) in state.nodes() {
        match node {
            Node::MapExit { entry, .. } => {
                let matches = matches!(state.get_node(*entry), Some(Node::MapEntry { .. }));
                ensure!(
                    matches,
                    InvalidScopeNestingSnafu { graph, state: label, node: id, reason: "map exit without map entry" }
                );
            }
            Node::ConsumeExit { entry, .. } => {
                let matches = matches!(state.get_node(*entry), Some(Node::ConsumeEntry { .. }));
                ensure!(
                    matches,
                    InvalidScopeNestingSnafu {
                        graph,
                        state: label,
                        node: id,
                        reason: "consume exit without consume entry"
                    }
                );
            }
            _ if node.is_entry() => {
                let exits = state.nodes().filter(|(_, n)| n.exit_entry() == Some(id)).count();
                ensure!(
                    exits == 1,
                    InvalidScopeNestingSnafu {
                        graph,
                        state: label,
                        node: id,
                        reason: format!("scope entry has {exits} exits, expected one")
                    }
                );
            }
            _ => {}
        }
    }
    Ok(())
}

/// Both endpoints of an edge must agree on the scope the data flows in.
fn validate_scope_edge(sdfg: &Sdfg, state: &State, scopes: &ScopeDict, edge: &MultiEdge) -> Result<()> {
    let scope = |id: NodeId| scopes.get(&id).copied().flatten();

    let src = state.node(edge.src);
    let from = if src.is_entry() {
        Some(edge.src)
    } else if let Some(entry) = src.exit_entry() {
        scope(entry)
    } else {
        scope(edge.src)
    };

    let dst = state.node(edge.dst);
    let into = match dst.exit_entry() {
        Some(entry) => Some(entry),
        None => scope(edge.dst),
    };

    ensure!(
        from == into,
        InvalidScopeNestingSnafu {
            graph: &sdfg.name,
            state: &state.label,
            node: edge.dst,
            reason: format!(
                "edge {} -> {} crosses scopes ({} vs {})",
                edge.src,
                edge.dst,
                from.map_or_else(|| "top level".to_string(), |s| s.to_string()),
                into.map_or_else(|| "top level".to_string(), |s| s.to_string()),
            )
        }
    );
    Ok(())
}

fn validate_connectors(sdfg: &Sdfg, state: &State, edge: &MultiEdge) -> Result<()> {
    let (graph, label) = (sdfg.name.as_str(), state.label.as_str());
    if let Some(conn) = &edge.src_conn {
        ensure!(
            state.node(edge.src).has_output(conn),
            UnknownConnectorSnafu { graph, state: label, node: edge.src, connector: conn }
        );
    }
    if let Some(conn) = &edge.dst_conn {
        ensure!(
            state.node(edge.dst).has_input(conn),
            UnknownConnectorSnafu { graph, state: label, node: edge.dst, connector: conn }
        );
    }
    Ok(())
}

/// Subset bounds may read symbols but never runtime data.
fn validate_subset(
    sdfg: &Sdfg,
    state: &State,
    edge: EdgeId,
    subset: &Subset,
    visible: &IndexSet<String>,
    assigned: &IndexSet<String>,
) -> Result<()> {
    let (graph, label) = (sdfg.name.as_str(), state.label.as_str());

    if let Some(name) = subset.data_references().into_iter().next() {
        return IllegalSubsetReferenceSnafu { graph, state: label, edge, name }.fail();
    }

    for symbol in subset.free_symbols() {
        let is_symbol = sdfg.symbols.contains_key(&symbol)
            || sdfg.constants.contains_key(&symbol)
            || visible.contains(&symbol)
            || assigned.contains(&symbol);
        if is_symbol {
            continue;
        }
        if sdfg.array(&symbol).is_some() {
            return IllegalSubsetReferenceSnafu { graph, state: label, edge, name: symbol }.fail();
        }
        return UndefinedSymbolInSubsetSnafu { graph, state: label, edge, symbol }.fail();
    }
    Ok(())
}

fn validate_scope_kinds(sdfg: &Sdfg, state: &State) -> Result<()> {
    let (graph, label) = (sdfg.name.as_str(), state.label.as_str());
    for (id, node) in state.nodes() {
        match node {
            Node::ConsumeEntry { consume, .. } => {
                ensure!(
                    consume.schedule.supports_consume(),
                    UnsupportedScopeKindSnafu {
                        graph,
                        state: label,
                        node: id,
                        reason: format!("consume scope cannot be scheduled as {}", consume.schedule)
                    }
                );
            }
            Node::MapEntry { map, .. } if map.schedule == ScheduleType::CpuMulticoreSingleton => {
                ensure!(
                    map.range.dims() == 1,
                    UnsupportedScopeKindSnafu {
                        graph,
                        state: label,
                        node: id,
                        reason: format!("a thread singleton map can only have one range, found {}", map.range.dims())
                    }
                );
            }
            _ => {}
        }
    }
    Ok(())
}
