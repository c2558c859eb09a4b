//! Data descriptors: the containers memlets move data between.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use stratum_device::{AllocationLifetime, StorageType};
use stratum_dtype::ScalarDType;

use crate::subset::Subset;
use crate::symbolic::Expr;

/// Container kind of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Array,
    Scalar,
    /// FIFO queue; never hoisted or resized by passes.
    Stream,
}

/// Describes one named data container of a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataDescriptor {
    pub kind: DataKind,
    pub dtype: ScalarDType,
    /// Extent per dimension; empty for scalars.
    pub shape: Vec<Expr>,
    pub storage: StorageType,
    /// Compiler-managed temporary, not part of the externally visible state.
    pub transient: bool,
    pub lifetime: AllocationLifetime,
}

impl DataDescriptor {
    pub fn array(dtype: ScalarDType, shape: impl IntoIterator<Item = Expr>) -> Self {
        Self {
            kind: DataKind::Array,
            dtype,
            shape: shape.into_iter().collect(),
            storage: StorageType::Default,
            transient: false,
            lifetime: AllocationLifetime::Scope,
        }
    }

    pub fn scalar(dtype: ScalarDType) -> Self {
        Self { kind: DataKind::Scalar, ..Self::array(dtype, []) }
    }

    pub fn stream(dtype: ScalarDType, capacity: Expr) -> Self {
        Self { kind: DataKind::Stream, ..Self::array(dtype, [capacity]) }
    }

    pub fn with_storage(mut self, storage: StorageType) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_transient(mut self, transient: bool) -> Self {
        self.transient = transient;
        self
    }

    pub fn is_scalar(&self) -> bool {
        self.kind == DataKind::Scalar
    }

    pub fn is_stream(&self) -> bool {
        self.kind == DataKind::Stream
    }

    /// Symbols the allocation size depends on.
    pub fn free_symbols(&self) -> IndexSet<String> {
        self.shape.iter().flat_map(Expr::free_symbols).collect()
    }

    /// Subset spanning the whole container.
    pub fn full_subset(&self) -> Subset {
        Subset::from_shape(&self.shape)
    }

    pub fn total_size(&self) -> Expr {
        self.shape.iter().cloned().reduce(|acc, n| (acc * n).fold()).unwrap_or(Expr::Int(1))
    }
}
