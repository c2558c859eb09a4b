//! Symbol scoping along control flow.
//!
//! A symbol assigned on a transition is defined only in states that every
//! path from the start state reaches through some assignment of it. This is a
//! forward must-analysis: the symbols defined on entry to a state are the
//! intersection, over its incoming transitions, of what is defined at the
//! transition source plus what the transition assigns.

use indexmap::{IndexMap, IndexSet};

use super::{Result, UndefinedSymbolOnEdgeSnafu};
use crate::sdfg::{Sdfg, StateId};

/// Symbols that are assigned on every path from the start state to each state.
///
/// `None` when the graph has no start state. States unreachable from the
/// start state get an empty set.
pub fn must_defined_symbols(sdfg: &Sdfg) -> Option<IndexMap<StateId, IndexSet<String>>> {
    let start = sdfg.start_state()?;

    // `None` is the lattice top: not reached yet.
    let mut defined: IndexMap<StateId, Option<IndexSet<String>>> =
        sdfg.state_ids().into_iter().map(|id| (id, None)).collect();
    defined.insert(start, Some(IndexSet::new()));

    let mut changed = true;
    let mut rounds = 0usize;
    while changed {
        changed = false;
        rounds += 1;
        for state in sdfg.state_ids() {
            if state == start {
                continue;
            }
            let mut incoming: Option<IndexSet<String>> = None;
            for tid in sdfg.in_edges(state) {
                let t = sdfg.transition(tid);
                let Some(Some(at_src)) = defined.get(&t.src) else { continue };
                let mut along = at_src.clone();
                along.extend(t.edge.assignments.keys().cloned());
                incoming = Some(match incoming {
                    None => along,
                    Some(acc) => acc.intersection(&along).cloned().collect(),
                });
            }
            if let Some(new) = incoming
                && defined.get(&state).cloned().flatten().as_ref() != Some(&new)
            {
                defined.insert(state, Some(new));
                changed = true;
            }
        }
    }
    tracing::trace!(graph = %sdfg.name, rounds, "symbol definition analysis converged");

    Some(defined.into_iter().map(|(id, set)| (id, set.unwrap_or_default())).collect())
}

/// Names usable on every transition regardless of path: declared symbols,
/// constants and data names.
pub fn defined_symbols(sdfg: &Sdfg) -> IndexSet<String> {
    sdfg.symbols.keys().chain(sdfg.constants.keys()).chain(sdfg.arrays().keys()).cloned().collect()
}

pub(super) fn validate_transitions(sdfg: &Sdfg) -> Result<()> {
    let Some(must) = must_defined_symbols(sdfg) else {
        return Ok(());
    };
    let global = defined_symbols(sdfg);

    for (_, t) in sdfg.transitions() {
        let at_src = must.get(&t.src);
        for symbol in t.edge.read_symbols() {
            let known = global.contains(&symbol) || at_src.is_some_and(|s| s.contains(&symbol));
            snafu::ensure!(
                known,
                UndefinedSymbolOnEdgeSnafu { graph: &sdfg.name, src: t.src, dst: t.dst, symbol }
            );
        }
    }
    Ok(())
}
