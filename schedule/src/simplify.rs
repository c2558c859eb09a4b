//! Post-pass cleanup of states and transients the transform leaves behind.

use indexmap::IndexSet;
use stratum_ir::{InterstateEdge, Sdfg, StateId};

/// Cleanup run after the device transform. Returns the number of changes.
pub trait SimplificationHook {
    fn simplify(&self, sdfg: &mut Sdfg) -> usize;
}

impl<F> SimplificationHook for F
where
    F: Fn(&mut Sdfg) -> usize,
{
    fn simplify(&self, sdfg: &mut Sdfg) -> usize {
        self(sdfg)
    }
}

/// Folds away empty pass-through states and drops unreferenced transients.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedundantStateElimination;

impl RedundantStateElimination {
    /// An empty state other than the start, entered and left by exactly one
    /// plain transition each.
    fn find_redundant(sdfg: &Sdfg) -> Option<(StateId, StateId, StateId)> {
        let start = sdfg.start_state();
        sdfg.states().find_map(|(id, state)| {
            if !state.is_empty() || Some(id) == start {
                return None;
            }
            let (incoming, outgoing) = (sdfg.in_edges(id), sdfg.out_edges(id));
            let ([inc], [out]) = (incoming.as_slice(), outgoing.as_slice()) else { return None };
            let (inc, out) = (sdfg.transition(*inc), sdfg.transition(*out));
            let plain = |t: &stratum_ir::Transition| t.edge.is_unconditional() && t.edge.assignments.is_empty();
            (plain(inc) && plain(out) && inc.src != id && out.dst != id).then_some((inc.src, id, out.dst))
        })
    }
}

impl SimplificationHook for RedundantStateElimination {
    #[tracing::instrument(level = "debug", skip_all, fields(graph = %sdfg.name))]
    fn simplify(&self, sdfg: &mut Sdfg) -> usize {
        let mut changes = 0;
        while let Some((pred, state, succ)) = Self::find_redundant(sdfg) {
            sdfg.remove_state(state);
            sdfg.add_edge(pred, succ, InterstateEdge::unconditional());
            tracing::trace!(%state, %pred, %succ, "removed empty state");
            changes += 1;
        }

        let mut used: IndexSet<String> = sdfg.referenced_data();
        for (_, t) in sdfg.transitions() {
            used.extend(t.edge.free_symbols());
        }
        let unused: Vec<String> =
            sdfg.arrays().iter().filter(|(name, d)| d.transient && !used.contains(*name)).map(|(n, _)| n.clone()).collect();
        for name in &unused {
            sdfg.remove_data(name);
        }
        changes += unused.len();

        tracing::debug!(changes, dropped = ?unused, "simplified graph");
        changes
    }
}
