//! Graph builders shared by the IR tests.

use stratum_device::{ScheduleType, StorageType};
use stratum_dtype::ScalarDType;

use crate::{DataDescriptor, EdgeId, Expr, Memlet, NodeId, Sdfg, StateId, Subset};

/// Handles into the graph built by [`scoped_copy`].
pub struct ScopedCopy {
    pub sdfg: Sdfg,
    pub state: StateId,
    pub a: NodeId,
    pub b: NodeId,
    pub entry: NodeId,
    pub exit: NodeId,
    pub tasklet: NodeId,
    /// `A -> entry`, `entry -> tasklet`, `tasklet -> exit`, `exit -> B`.
    pub edges: [EdgeId; 4],
}

pub fn array(n: &str) -> DataDescriptor {
    DataDescriptor::array(ScalarDType::Float64, [Expr::parse(n).unwrap()])
}

/// `B[i] = A[i] * 2` for `i in 0:N`, as one map scope.
///
/// ```text
/// A --IN_A--> [map i] --OUT_A--> t --> [exit] --OUT_B--> B
/// ```
pub fn scoped_copy(schedule: ScheduleType) -> ScopedCopy {
    let mut sdfg = Sdfg::new("scoped_copy");
    sdfg.add_symbol("N", ScalarDType::Int64);
    sdfg.add_datadesc("A", array("N"), false).unwrap();
    sdfg.add_datadesc("B", array("N"), false).unwrap();

    let state_id = sdfg.add_state("main");
    let state = sdfg.state_mut(state_id);
    let a = state.add_access("A");
    let b = state.add_access("B");
    let (entry, exit) = state.add_map("double", &["i"], Subset::parse("0:N").unwrap(), schedule);
    state.add_scope_connectors(entry, "A");
    state.add_scope_connectors(exit, "B");
    let tasklet = state.add_tasklet("double", &["x"], &["y"], "y = x * 2");

    let edges = [
        state.add_edge(a, None, entry, Some("IN_A"), Memlet::simple("A", "0:N").unwrap()),
        state.add_edge(entry, Some("OUT_A"), tasklet, Some("x"), Memlet::simple("A", "i").unwrap()),
        state.add_edge(tasklet, Some("y"), exit, Some("IN_B"), Memlet::simple("B", "i").unwrap()),
        state.add_edge(exit, Some("OUT_B"), b, None, Memlet::simple("B", "0:N").unwrap()),
    ];

    ScopedCopy { sdfg, state: state_id, a, b, entry, exit, tasklet, edges }
}

/// Arrays `A[5]`, `B[5]` and a single `A -> B` copy of element 0.
///
/// With `declare_indirection`, an `indirection[5]` array is declared as well.
pub fn element_copy(declare_indirection: bool) -> (Sdfg, StateId, EdgeId) {
    let mut sdfg = Sdfg::new("element_copy");
    sdfg.add_datadesc("A", array("5"), false).unwrap();
    sdfg.add_datadesc("B", array("5"), false).unwrap();
    if declare_indirection {
        let desc = DataDescriptor::array(ScalarDType::Int32, [Expr::int(5)]);
        sdfg.add_datadesc("indirection", desc, false).unwrap();
    }

    let state_id = sdfg.add_state("copy");
    let state = sdfg.state_mut(state_id);
    let a = state.add_access("A");
    let b = state.add_access("B");
    let edge = state.add_nedge(a, b, Memlet::simple("A", "0").unwrap());
    (sdfg, state_id, edge)
}

/// Single tasklet `out = in + 1` writing array element 0 of `dst` from `src`.
pub fn host_tasklet(src_storage: StorageType, dst_storage: StorageType) -> (Sdfg, StateId, NodeId) {
    let mut sdfg = Sdfg::new("host_tasklet");
    sdfg.add_datadesc("src", array("8").with_storage(src_storage), false).unwrap();
    sdfg.add_datadesc("dst", array("8").with_storage(dst_storage), false).unwrap();

    let state_id = sdfg.add_state("main");
    let state = sdfg.state_mut(state_id);
    let src = state.add_access("src");
    let dst = state.add_access("dst");
    let tasklet = state.add_tasklet("inc", &["inp"], &["out"], "out = inp + 1");
    state.add_edge(src, None, tasklet, Some("inp"), Memlet::simple("src", "0").unwrap());
    state.add_edge(tasklet, Some("out"), dst, None, Memlet::simple("dst", "0").unwrap());
    (sdfg, state_id, tasklet)
}
