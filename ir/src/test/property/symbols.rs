//! Symbol definition analysis on random control flow.

use std::collections::VecDeque;

use indexmap::IndexSet;
use proptest::prelude::*;

use crate::validation::must_defined_symbols;
use crate::{Expr, InterstateEdge, Sdfg, StateId};

use super::generators::arb_transitions;

fn build(states: usize, transitions: &[(usize, usize, Vec<String>)]) -> (Sdfg, Vec<StateId>) {
    let mut sdfg = Sdfg::new("cfg");
    let ids: Vec<StateId> = (0..states).map(|i| sdfg.add_state(format!("s{i}"))).collect();
    for (src, dst, assigned) in transitions {
        let edge = assigned
            .iter()
            .fold(InterstateEdge::unconditional(), |edge, name| edge.with_assignment(name.as_str(), Expr::Int(0)));
        sdfg.add_edge(ids[*src], ids[*dst], edge);
    }
    sdfg.set_start_state(ids[0]);
    (sdfg, ids)
}

fn reachable(sdfg: &Sdfg, start: StateId) -> IndexSet<StateId> {
    let mut seen = IndexSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(state) = queue.pop_front() {
        for next in sdfg.successors(state) {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// The result is a solution of the dataflow equations: each reachable
    /// state gets exactly the intersection over its reachable predecessors.
    #[test]
    fn must_defined_is_a_fixpoint((states, transitions) in (2usize..7).prop_flat_map(|n| (Just(n), arb_transitions(n)))) {
        let (sdfg, ids) = build(states, &transitions);
        let defined = must_defined_symbols(&sdfg).unwrap();
        let live = reachable(&sdfg, ids[0]);

        prop_assert!(defined[&ids[0]].is_empty());
        for &state in &ids[1..] {
            let at = &defined[&state];
            if !live.contains(&state) {
                prop_assert!(at.is_empty());
                continue;
            }
            let expected = sdfg
                .in_edges(state)
                .into_iter()
                .map(|t| sdfg.transition(t))
                .filter(|t| live.contains(&t.src))
                .map(|t| {
                    let mut along = defined[&t.src].clone();
                    along.extend(t.edge.assignments.keys().cloned());
                    along
                })
                .reduce(|acc, set| acc.intersection(&set).cloned().collect())
                .unwrap_or_default();
            prop_assert_eq!(at.iter().collect::<IndexSet<_>>(), expected.iter().collect::<IndexSet<_>>());
        }
    }

    /// Only symbols some transition assigns can be defined.
    #[test]
    fn must_defined_within_assigned((states, transitions) in (2usize..7).prop_flat_map(|n| (Just(n), arb_transitions(n)))) {
        let (sdfg, _) = build(states, &transitions);
        let assigned = sdfg.assigned_symbols();
        for set in must_defined_symbols(&sdfg).unwrap().values() {
            prop_assert!(set.is_subset(&assigned));
        }
    }
}
