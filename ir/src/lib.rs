//! Stateful dataflow graph IR for the Stratum compiler.
//!
//! A program is an [`Sdfg`]: a state machine whose [`State`]s are dataflow
//! multigraphs. Nodes read and write named data containers, and every edge
//! carries a [`Memlet`] describing which part of which container moves.
//!
//! # Module Organization
//!
//! - [`symbolic`] - Symbolic expressions for shapes, subsets, guards and assignments
//! - [`subset`] - Multi-dimensional address subsets
//! - [`data`] - Data descriptors
//! - [`memlet`] - Data-movement annotations
//! - [`node`] - Dataflow node kinds
//! - [`state`] - Dataflow states, scopes and memlet paths
//! - [`interstate`] - Control-flow transitions
//! - [`sdfg`] - The top-level graph and its portable form
//! - [`library`] - Library nodes and their validation contracts
//! - [`validation`] - Structural and semantic legality checks
//! - [`error`] - Error types and result handling

pub mod data;
pub mod error;
pub mod interstate;
pub mod library;
pub mod memlet;
pub mod node;
pub mod prelude;
pub mod sdfg;
pub mod state;
pub mod subset;
pub mod symbolic;
pub mod validation;


pub use data::{DataDescriptor, DataKind};
pub use error::{Error, Result};
pub use interstate::InterstateEdge;
pub use library::{LibraryError, LibraryKind, LibraryNode};
pub use memlet::{Memlet, Wcr};
pub use node::{ConsumeScope, Connectors, EdgeId, MapScope, NestedSdfg, Node, NodeId, Tasklet};
pub use sdfg::{InterstateEdgeId, NodeRef, Sdfg, StateId, Transition};
pub use state::{MultiEdge, ScopeDict, State};
pub use subset::{Range, Subset};
pub use symbolic::Expr;
pub use validation::{ValidationError, validate};

pub use stratum_device::{AllocationLifetime, ScheduleType, StorageType};
pub use stratum_dtype::ScalarDType;
