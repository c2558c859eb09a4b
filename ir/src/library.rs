//! Library nodes: prebuilt computations the IR treats as opaque.
//!
//! The IR only needs a library node's connectors, schedule and validation
//! contract. Expansion into tasklets and maps belongs to the library itself.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use snafu::{Snafu, ensure};
use stratum_device::ScheduleType;

use crate::node::{Connectors, NodeId};
use crate::state::State;
use crate::symbolic::Expr;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LibraryError {
    #[snafu(display("{label}: expected {expected} input edges, found {found}"))]
    InputCount { label: String, expected: usize, found: usize },

    #[snafu(display("{label}: expected {expected} output edges, found {found}"))]
    OutputCount { label: String, expected: usize, found: usize },

    #[snafu(display("{label}: only 1-dimensional operands are supported, found {dims} dimensions"))]
    NotOneDimensional { label: String, dims: usize },

    #[snafu(display("{label}: operand sizes differ ({left} vs {right})"))]
    SizeMismatch { label: String, left: String, right: String },

    #[snafu(display("{label}: write-conflict resolution is not supported on library memlets"))]
    WcrNotSupported { label: String },
}

/// Computation implemented by a library node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LibraryKind {
    /// `_res = alpha * _x + _y` over 1-D vectors.
    Axpy { alpha: Expr },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryNode {
    pub label: String,
    pub kind: LibraryKind,
    pub connectors: Connectors,
    pub schedule: ScheduleType,
}

impl LibraryNode {
    pub fn axpy(label: impl Into<String>, alpha: Expr) -> Self {
        Self {
            label: label.into(),
            kind: LibraryKind::Axpy { alpha },
            connectors: Connectors::new(["_x", "_y"], ["_res"]),
            schedule: ScheduleType::Default,
        }
    }

    /// Checks operand shapes of the node `id` in `state`.
    pub fn validate(&self, state: &State, id: NodeId) -> Result<(), LibraryError> {
        match &self.kind {
            LibraryKind::Axpy { .. } => self.validate_axpy(state, id),
        }
    }

    fn validate_axpy(&self, state: &State, id: NodeId) -> Result<(), LibraryError> {
        let label = self.label.as_str();
        let ins = state.in_edges(id);
        let outs = state.out_edges(id);
        ensure!(ins.len() == 2, InputCountSnafu { label, expected: 2usize, found: ins.len() });
        ensure!(outs.len() == 1, OutputCountSnafu { label, expected: 1usize, found: outs.len() });

        let x = &state.edge(ins[0]).memlet;
        let y = &state.edge(ins[1]).memlet;
        let res = &state.edge(outs[0]).memlet;

        let size = x.subset.size();
        ensure!(size.len() == 1, NotOneDimensionalSnafu { label, dims: size.len() });
        for other in [&y.subset, &res.subset] {
            let other = other.size();
            ensure!(other == size, SizeMismatchSnafu { label, left: size.iter().join(", "), right: other.iter().join(", ") });
        }

        ensure!(x.wcr.is_none() && y.wcr.is_none() && res.wcr.is_none(), WcrNotSupportedSnafu { label });
        Ok(())
    }
}
