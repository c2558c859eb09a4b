//! Memlets: the data-movement annotation on every dataflow edge.

use serde::{Deserialize, Serialize};

use crate::data::DataDescriptor;
use crate::error::Result;
use crate::subset::Subset;
use crate::symbolic::Expr;

/// Write-conflict resolution applied when a memlet writes to occupied data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Wcr {
    Sum,
    Product,
    Min,
    Max,
    LogicalAnd,
    LogicalOr,
    BitwiseAnd,
    BitwiseOr,
    /// User-supplied reduction, kept as opaque code.
    Custom(String),
}

/// Data movement along one edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Memlet {
    /// `None` only on code-to-code edges and empty dependency edges.
    pub data: Option<String>,
    pub subset: Subset,
    /// Subset on the far side of a copy, when it differs from `subset`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_subset: Option<Subset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wcr: Option<Wcr>,
    /// Accesses a data-dependent number of elements.
    #[serde(default)]
    pub dynamic: bool,
}

impl Memlet {
    pub fn new(data: impl Into<String>, subset: Subset) -> Self {
        Self { data: Some(data.into()), subset, ..Default::default() }
    }

    /// Memlet from a data name and subset text, e.g. `Memlet::simple("A", "0:N")`.
    pub fn simple(data: impl Into<String>, subset: &str) -> Result<Self> {
        Ok(Self::new(data, Subset::parse(subset)?))
    }

    /// Memlet moving the whole container.
    pub fn from_array(data: impl Into<String>, desc: &DataDescriptor) -> Self {
        Self::new(data, desc.full_subset())
    }

    /// Dependency-only edge that moves no data.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    pub fn with_wcr(mut self, wcr: Wcr) -> Self {
        self.wcr = Some(wcr);
        self
    }

    pub fn with_other_subset(mut self, other: Subset) -> Self {
        self.other_subset = Some(other);
        self
    }

    pub fn num_elements(&self) -> Expr {
        self.subset.num_elements()
    }

    /// Renames the data reference and every symbol use in the subsets.
    pub fn rename(&mut self, old: &str, new: &str) {
        if self.data.as_deref() == Some(old) {
            self.data = Some(new.to_string());
        }
        self.subset.rename(old, new);
        if let Some(other) = &mut self.other_subset {
            other.rename(old, new);
        }
    }
}
