//! Dataflow nodes of a state.

use derive_more::Display;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use stratum_device::ScheduleType;

use crate::library::LibraryNode;
use crate::sdfg::Sdfg;
use crate::subset::Subset;
use crate::symbolic::Expr;

/// Stable id of a node within its state.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display("n{_0}")]
#[serde(transparent)]
pub struct NodeId(pub u32);

/// Stable id of a dataflow edge within its state.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[display("e{_0}")]
#[serde(transparent)]
pub struct EdgeId(pub u32);

/// Prefix of scope connectors carrying data into a scope.
pub const IN_PREFIX: &str = "IN_";
/// Prefix of scope connectors carrying data out of a scope.
pub const OUT_PREFIX: &str = "OUT_";

/// Named input and output connectors of a node, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connectors {
    pub inputs: IndexSet<String>,
    pub outputs: IndexSet<String>,
}

impl Connectors {
    pub fn new<I, O>(inputs: I, outputs: O) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
        }
    }
}

/// Parallel iteration scope opened by a [`Node::MapEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapScope {
    pub label: String,
    pub params: Vec<String>,
    pub range: Subset,
    pub schedule: ScheduleType,
}

/// Stream-consuming scope opened by a [`Node::ConsumeEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumeScope {
    pub label: String,
    /// Symbol holding the index of the processing element.
    pub pe_index: String,
    pub num_pes: Expr,
    pub schedule: ScheduleType,
}

/// Opaque computation with named connectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tasklet {
    pub label: String,
    pub code: String,
    pub connectors: Connectors,
    pub schedule: ScheduleType,
}

/// A complete graph embedded as a node, with its own namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedSdfg {
    pub label: String,
    pub sdfg: Box<Sdfg>,
    /// Connector names are data names of the inner graph.
    pub connectors: Connectors,
    /// Inner symbol name to the outer expression bound to it.
    pub symbol_mapping: IndexMap<String, Expr>,
    pub schedule: ScheduleType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Access { data: String },
    Tasklet(Tasklet),
    MapEntry { map: MapScope, connectors: Connectors },
    MapExit { entry: NodeId, connectors: Connectors },
    ConsumeEntry { consume: ConsumeScope, connectors: Connectors },
    ConsumeExit { entry: NodeId, connectors: Connectors },
    NestedSdfg(NestedSdfg),
    Library(LibraryNode),
}

impl Node {
    pub fn access(data: impl Into<String>) -> Self {
        Self::Access { data: data.into() }
    }

    pub fn as_access(&self) -> Option<&str> {
        match self {
            Self::Access { data } => Some(data),
            _ => None,
        }
    }

    /// Tasklets, nested graphs and library nodes.
    pub fn is_code(&self) -> bool {
        matches!(self, Self::Tasklet(_) | Self::NestedSdfg(_) | Self::Library(_))
    }

    pub fn is_entry(&self) -> bool {
        matches!(self, Self::MapEntry { .. } | Self::ConsumeEntry { .. })
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, Self::MapExit { .. } | Self::ConsumeExit { .. })
    }

    /// Entry node an exit node closes.
    pub fn exit_entry(&self) -> Option<NodeId> {
        match self {
            Self::MapExit { entry, .. } | Self::ConsumeExit { entry, .. } => Some(*entry),
            _ => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Access { data } => data,
            Self::Tasklet(t) => &t.label,
            Self::MapEntry { map, .. } => &map.label,
            Self::MapExit { .. } => "map_exit",
            Self::ConsumeEntry { consume, .. } => &consume.label,
            Self::ConsumeExit { .. } => "consume_exit",
            Self::NestedSdfg(n) => &n.label,
            Self::Library(l) => &l.label,
        }
    }

    pub fn connectors(&self) -> Option<&Connectors> {
        match self {
            Self::Access { .. } => None,
            Self::Tasklet(Tasklet { connectors, .. })
            | Self::MapEntry { connectors, .. }
            | Self::MapExit { connectors, .. }
            | Self::ConsumeEntry { connectors, .. }
            | Self::ConsumeExit { connectors, .. }
            | Self::NestedSdfg(NestedSdfg { connectors, .. })
            | Self::Library(LibraryNode { connectors, .. }) => Some(connectors),
        }
    }

    pub fn connectors_mut(&mut self) -> Option<&mut Connectors> {
        match self {
            Self::Access { .. } => None,
            Self::Tasklet(Tasklet { connectors, .. })
            | Self::MapEntry { connectors, .. }
            | Self::MapExit { connectors, .. }
            | Self::ConsumeEntry { connectors, .. }
            | Self::ConsumeExit { connectors, .. }
            | Self::NestedSdfg(NestedSdfg { connectors, .. })
            | Self::Library(LibraryNode { connectors, .. }) => Some(connectors),
        }
    }

    pub fn has_input(&self, conn: &str) -> bool {
        self.connectors().is_some_and(|c| c.inputs.contains(conn))
    }

    pub fn has_output(&self, conn: &str) -> bool {
        self.connectors().is_some_and(|c| c.outputs.contains(conn))
    }

    /// Declared schedule. Exits and access nodes carry none.
    pub fn schedule(&self) -> Option<ScheduleType> {
        match self {
            Self::Tasklet(t) => Some(t.schedule),
            Self::MapEntry { map, .. } => Some(map.schedule),
            Self::ConsumeEntry { consume, .. } => Some(consume.schedule),
            Self::NestedSdfg(n) => Some(n.schedule),
            Self::Library(l) => Some(l.schedule),
            Self::Access { .. } | Self::MapExit { .. } | Self::ConsumeExit { .. } => None,
        }
    }

    /// Sets the schedule; returns `false` for nodes without one.
    pub fn set_schedule(&mut self, schedule: ScheduleType) -> bool {
        match self {
            Self::Tasklet(Tasklet { schedule: s, .. })
            | Self::MapEntry { map: MapScope { schedule: s, .. }, .. }
            | Self::ConsumeEntry { consume: ConsumeScope { schedule: s, .. }, .. }
            | Self::NestedSdfg(NestedSdfg { schedule: s, .. })
            | Self::Library(LibraryNode { schedule: s, .. }) => {
                *s = schedule;
                true
            }
            Self::Access { .. } | Self::MapExit { .. } | Self::ConsumeExit { .. } => false,
        }
    }
}
