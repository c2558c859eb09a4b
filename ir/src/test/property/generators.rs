//! Generators for property-based testing.
//!
//! Strategies for symbolic expressions, subsets, control flow and whole
//! graphs. Names are short lowercase identifiers that never collide with the
//! expression keywords.

use proptest::prelude::*;
use stratum_device::StorageType;
use stratum_dtype::ScalarDType;

use crate::symbolic::{BinaryOp, UnaryOp};
use crate::{DataDescriptor, Expr, InterstateEdge, Memlet, Range, Sdfg, Subset};

// ============================================================================
// Expressions
// ============================================================================

pub fn arb_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,4}".prop_filter("keywords are not names", |s| !matches!(s.as_str(), "and" | "or" | "not"))
}

pub fn arb_binary_op() -> impl Strategy<Value = BinaryOp> {
    prop_oneof![
        Just(BinaryOp::Add),
        Just(BinaryOp::Sub),
        Just(BinaryOp::Mul),
        Just(BinaryOp::Div),
        Just(BinaryOp::FloorDiv),
        Just(BinaryOp::Mod),
        Just(BinaryOp::Pow),
        Just(BinaryOp::Lt),
        Just(BinaryOp::Le),
        Just(BinaryOp::Gt),
        Just(BinaryOp::Ge),
        Just(BinaryOp::Eq),
        Just(BinaryOp::Ne),
        Just(BinaryOp::And),
        Just(BinaryOp::Or),
    ]
}

pub fn arb_leaf() -> impl Strategy<Value = Expr> {
    prop_oneof![
        (-1000i64..=1000).prop_map(Expr::Int),
        // Multiples of 1/8 print exactly.
        (-8000i32..=8000).prop_map(|v| Expr::Float(f64::from(v) / 8.0)),
        any::<bool>().prop_map(Expr::Bool),
        arb_name().prop_map(Expr::Symbol),
    ]
}

/// Arbitrary expression trees, including calls and data indexing.
pub fn arb_expr() -> impl Strategy<Value = Expr> {
    arb_leaf().prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (prop_oneof![Just(UnaryOp::Neg), Just(UnaryOp::Not)], inner.clone())
                .prop_map(|(op, e)| Expr::unary(op, e)),
            (arb_binary_op(), inner.clone(), inner.clone()).prop_map(|(op, l, r)| Expr::binary(op, l, r)),
            (arb_name(), prop::collection::vec(inner.clone(), 0..3)).prop_map(|(func, args)| Expr::Call { func, args }),
            (arb_name(), prop::collection::vec(inner, 1..3)).prop_map(|(data, indices)| Expr::Index { data, indices }),
        ]
    })
}

/// Integer-only arithmetic over symbols, the shape subset bounds take.
pub fn arb_index_expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![(0i64..=64).prop_map(Expr::Int), arb_name().prop_map(Expr::Symbol)];
    leaf.prop_recursive(2, 8, 2, |inner| {
        (prop_oneof![Just(BinaryOp::Add), Just(BinaryOp::Mul), Just(BinaryOp::Sub)], inner.clone(), inner)
            .prop_map(|(op, l, r)| Expr::binary(op, l, r))
    })
}

// ============================================================================
// Subsets
// ============================================================================

/// A constant range together with the number of points it covers.
pub fn arb_const_range() -> impl Strategy<Value = (Range, i64)> {
    prop_oneof![
        (-16i64..=16).prop_map(|i| (Range::index(Expr::Int(i)), 1)),
        (-16i64..=16, 1i64..=32, 1i64..=4).prop_map(|(begin, extent, step)| {
            let range = Range::new(Expr::Int(begin), Expr::Int(begin + extent), Expr::Int(step));
            (range, extent / step + 1)
        }),
    ]
}

pub fn arb_const_subset() -> impl Strategy<Value = (Subset, i64)> {
    prop::collection::vec(arb_const_range(), 1..4).prop_map(|ranges| {
        let count = ranges.iter().map(|(_, n)| n).product();
        (Subset::new(ranges.into_iter().map(|(r, _)| r).collect()), count)
    })
}

// ============================================================================
// Control flow
// ============================================================================

/// Transitions of a random control-flow graph over `states` states.
///
/// Each entry is `(src, dst, assigned symbols)`; symbols come from a small
/// fixed pool so that paths share names.
pub fn arb_transitions(states: usize) -> impl Strategy<Value = Vec<(usize, usize, Vec<String>)>> {
    let pool = prop::sample::subsequence(vec!["i", "j", "k", "n"], 0..=2)
        .prop_map(|names| names.into_iter().map(str::to_string).collect::<Vec<_>>());
    prop::collection::vec((0..states, 0..states, pool), 0..states * 2)
}

// ============================================================================
// Whole graphs
// ============================================================================

fn arb_storage() -> impl Strategy<Value = StorageType> {
    prop::sample::select(vec![StorageType::Default, StorageType::CpuHeap, StorageType::CpuPinned, StorageType::GpuGlobal])
}

/// A chain of states, each copying between two declared arrays, joined by
/// transitions with arbitrary conditions and assignments.
pub fn arb_sdfg() -> impl Strategy<Value = Sdfg> {
    let arrays = prop::collection::vec((arb_storage(), any::<bool>(), 1i64..=64), 2..5);
    let transitions = prop::collection::vec((arb_expr(), prop::option::of((arb_name(), arb_expr()))), 0..4);
    (arrays, transitions).prop_map(|(arrays, transitions)| {
        let mut sdfg = Sdfg::new("generated");
        sdfg.add_symbol("N", ScalarDType::Int64);
        let names: Vec<String> = arrays
            .iter()
            .enumerate()
            .map(|(i, (storage, transient, len))| {
                let desc = DataDescriptor::array(ScalarDType::Float32, [Expr::Int(*len)])
                    .with_storage(*storage)
                    .with_transient(*transient);
                sdfg.add_datadesc(&format!("arr{i}"), desc, false).unwrap()
            })
            .collect();

        let mut previous = sdfg.add_state("s0");
        for (i, (condition, assignment)) in transitions.into_iter().enumerate() {
            let next = sdfg.add_state(format!("s{}", i + 1));
            let mut edge = InterstateEdge::guarded(condition);
            if let Some((symbol, value)) = assignment {
                edge = edge.with_assignment(symbol, value);
            }
            sdfg.add_edge(previous, next, edge);
            previous = next;
        }

        for (k, id) in sdfg.state_ids().into_iter().enumerate() {
            let src = &names[k % names.len()];
            let dst = &names[(k + 1) % names.len()];
            let state = sdfg.state_mut(id);
            let a = state.add_access(src.as_str());
            let b = state.add_access(dst.as_str());
            state.add_nedge(a, b, Memlet::simple(src.as_str(), "0").unwrap());
        }
        sdfg
    })
}
