//! Control-flow transitions between states.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::symbolic::Expr;

/// Guard and symbol assignments on a state transition.
///
/// Assignments take effect only when the transition is taken. They are
/// evaluated in order, so a later assignment sees the earlier ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterstateEdge {
    pub condition: Expr,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub assignments: IndexMap<String, Expr>,
}

impl Default for InterstateEdge {
    fn default() -> Self {
        Self::unconditional()
    }
}

impl InterstateEdge {
    pub fn unconditional() -> Self {
        Self { condition: Expr::Bool(true), assignments: IndexMap::new() }
    }

    pub fn guarded(condition: Expr) -> Self {
        Self { condition, assignments: IndexMap::new() }
    }

    pub fn with_assignment(mut self, symbol: impl Into<String>, value: Expr) -> Self {
        self.assignments.insert(symbol.into(), value);
        self
    }

    pub fn is_unconditional(&self) -> bool {
        self.condition.is_always_true()
    }

    /// Names read by the guard and the assignment right-hand sides.
    pub fn free_symbols(&self) -> IndexSet<String> {
        let mut names = self.condition.free_symbols();
        for value in self.assignments.values() {
            names.extend(value.free_symbols());
        }
        names
    }

    /// Like [`InterstateEdge::free_symbols`], but names assigned by the edge
    /// are excluded when they are read only after their own assignment.
    pub fn read_symbols(&self) -> IndexSet<String> {
        let mut names = self.condition.free_symbols();
        let mut assigned = IndexSet::new();
        for (symbol, value) in &self.assignments {
            names.extend(value.free_symbols().into_iter().filter(|s| !assigned.contains(s)));
            assigned.insert(symbol.clone());
        }
        names
    }

    /// Renames symbol and data uses in the guard and assignment values.
    pub fn rename(&mut self, old: &str, new: &str) {
        self.condition.rename(old, new);
        for value in self.assignments.values_mut() {
            value.rename(old, new);
        }
    }
}
