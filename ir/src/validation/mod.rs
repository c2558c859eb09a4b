//! Structural and semantic legality checks.
//!
//! [`validate`] never mutates the graph and can be called at any point. The
//! checks run in a fixed order and the first violation is reported:
//!
//! 1. start state
//! 2. symbol scoping on transitions ([`symbols`])
//! 3. per-state dataflow: dangling edges, acyclicity, scope nesting, data and connector
//!    resolution, subset legality, scope kinds ([`dataflow`])
//! 4. placement legality between host and device ([`placement`])
//! 5. nested graphs and library nodes

pub mod dataflow;
pub mod placement;
pub mod symbols;

use snafu::{ResultExt, Snafu, ensure};

use crate::library::LibraryError;
use crate::node::{EdgeId, NodeId};
use crate::sdfg::{Sdfg, StateId};

pub use symbols::{defined_symbols, must_defined_symbols};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ValidationError {
    /// Every state has a predecessor.
    #[snafu(display("graph {graph:?}: no start state"))]
    NoStartState { graph: String },

    /// Several states have no predecessor and none is designated.
    #[snafu(display("graph {graph:?}: {count} candidate start states, expected exactly one"))]
    MultipleStartStates { graph: String, count: usize },

    /// The designated start state does not exist.
    #[snafu(display("graph {graph:?}: designated start state {state} does not exist"))]
    InvalidStartState { graph: String, state: StateId },

    /// A transition reads a symbol not defined on every path reaching it.
    #[snafu(display("graph {graph:?}: transition {src} -> {dst} uses undefined symbol {symbol:?}"))]
    UndefinedSymbolOnEdge { graph: String, src: StateId, dst: StateId, symbol: String },

    /// An edge points at a node that was removed or never added.
    #[snafu(display("graph {graph:?}, state {state:?}: edge {edge} references missing node {node}"))]
    DanglingEdge { graph: String, state: String, edge: EdgeId, node: NodeId },

    #[snafu(display("graph {graph:?}, state {state:?}: dataflow contains a cycle"))]
    CyclicDataflow { graph: String, state: String },

    #[snafu(display("graph {graph:?}, state {state:?}: invalid scope nesting at node {node}: {reason}"))]
    InvalidScopeNesting { graph: String, state: String, node: NodeId, reason: String },

    #[snafu(display("graph {graph:?}, state {state:?}: undefined data {name:?}"))]
    UndefinedData { graph: String, state: String, name: String },

    #[snafu(display("graph {graph:?}, state {state:?}: node {node} has no connector {connector:?}"))]
    UnknownConnector { graph: String, state: String, node: NodeId, connector: String },

    /// A subset bound reads runtime data.
    #[snafu(display("graph {graph:?}, state {state:?}: subset of edge {edge} dereferences data {name:?}"))]
    IllegalSubsetReference { graph: String, state: String, edge: EdgeId, name: String },

    #[snafu(display("graph {graph:?}, state {state:?}: subset of edge {edge} uses undefined symbol {symbol:?}"))]
    UndefinedSymbolInSubset { graph: String, state: String, edge: EdgeId, symbol: String },

    #[snafu(display("graph {graph:?}, state {state:?}: unsupported scope at node {node}: {reason}"))]
    UnsupportedScopeKind { graph: String, state: String, node: NodeId, reason: String },

    /// Device-scheduled work moves host-only data.
    #[snafu(display("graph {graph:?}, state {state:?}: device node {node} accesses host data {data:?}"))]
    HostDataInDeviceScope { graph: String, state: String, node: NodeId, data: String },

    /// Host code has a direct edge to device-only storage.
    #[snafu(display("graph {graph:?}, state {state:?}: host node {node} accesses device data {data:?}"))]
    HostCodeTouchesDeviceData { graph: String, state: String, node: NodeId, data: String },

    #[snafu(display("graph {graph:?}, state {state:?}: nested graph {node} has no data for connector {connector:?}"))]
    NestedConnectorMismatch { graph: String, state: String, node: NodeId, connector: String },

    #[snafu(display("in nested graph {label:?}: {source}"))]
    Nested {
        label: String,
        #[snafu(source(from(ValidationError, Box::new)))]
        source: Box<ValidationError>,
    },

    #[snafu(display("graph {graph:?}, state {state:?}: library node {node}: {source}"))]
    LibraryNode { graph: String, state: String, node: NodeId, source: LibraryError },
}

pub type Result<T, E = ValidationError> = std::result::Result<T, E>;

/// Validates a graph and, recursively, every nested graph.
#[tracing::instrument(level = "debug", skip_all, fields(graph = %sdfg.name))]
pub fn validate(sdfg: &Sdfg) -> Result<()> {
    validate_start_state(sdfg)?;
    symbols::validate_transitions(sdfg)?;
    for (_, state) in sdfg.states() {
        dataflow::validate_state(sdfg, state)?;
    }
    for (_, state) in sdfg.states() {
        placement::validate_state(sdfg, state)?;
    }
    for (_, state) in sdfg.states() {
        validate_children(sdfg, state)?;
    }
    Ok(())
}

fn validate_start_state(sdfg: &Sdfg) -> Result<()> {
    let graph = sdfg.name.as_str();
    if let Some(state) = sdfg.designated_start_state() {
        ensure!(sdfg.get_state(state).is_some(), InvalidStartStateSnafu { graph, state });
        return Ok(());
    }
    match sdfg.source_states().len() {
        1 => Ok(()),
        0 => NoStartStateSnafu { graph }.fail(),
        count => MultipleStartStatesSnafu { graph, count }.fail(),
    }
}

fn validate_children(sdfg: &Sdfg, state: &crate::state::State) -> Result<()> {
    use crate::node::Node;

    let graph = sdfg.name.as_str();
    for (id, node) in state.nodes() {
        match node {
            Node::NestedSdfg(nested) => {
                let connectors = nested.connectors.inputs.iter().chain(&nested.connectors.outputs);
                for connector in connectors {
                    ensure!(
                        nested.sdfg.array(connector).is_some(),
                        NestedConnectorMismatchSnafu { graph, state: &state.label, node: id, connector }
                    );
                }
                validate(&nested.sdfg).context(NestedSnafu { label: &nested.label })?;
            }
            Node::Library(library) => {
                library.validate(state, id).context(LibraryNodeSnafu { graph, state: &state.label, node: id })?;
            }
            _ => {}
        }
    }
    Ok(())
}
