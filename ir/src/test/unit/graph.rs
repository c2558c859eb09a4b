//! Graph model: scopes, memlet paths, state machine edits and naming.

use stratum_device::{ScheduleType, StorageType};
use stratum_dtype::ScalarDType;

use crate::test::helpers::{array, scoped_copy};
use crate::{DataDescriptor, InterstateEdge, Memlet, Node, NodeId, Sdfg, State};

// =========================================================================
// Scopes and memlet paths
// =========================================================================

#[test]
fn test_scope_of() {
    let g = scoped_copy(ScheduleType::Default);
    let state = g.sdfg.state(g.state);

    assert_eq!(state.scope_of(g.a), None);
    assert_eq!(state.scope_of(g.entry), None);
    assert_eq!(state.scope_of(g.tasklet), Some(g.entry));
    assert_eq!(state.scope_of(g.exit), Some(g.entry));
    assert_eq!(state.scope_of(g.b), None);
    assert_eq!(state.entry_node(g.exit), Some(g.entry));
    assert_eq!(state.exit_node(g.entry), Some(g.exit));
}

#[test]
fn test_scope_children() {
    let g = scoped_copy(ScheduleType::Default);
    let children = g.sdfg.state(g.state).scope_children();

    assert_eq!(children[&None], vec![g.a, g.entry, g.b]);
    assert_eq!(children[&Some(g.entry)], vec![g.tasklet, g.exit]);
}

#[test]
fn test_memlet_path_crosses_scopes() {
    let g = scoped_copy(ScheduleType::Default);
    let state = g.sdfg.state(g.state);
    let [into_map, into_tasklet, out_tasklet, out_map] = g.edges;

    assert_eq!(state.memlet_path(into_tasklet), vec![into_map, into_tasklet]);
    assert_eq!(state.memlet_path(into_map), vec![into_map, into_tasklet]);
    assert_eq!(state.memlet_path(out_tasklet), vec![out_tasklet, out_map]);
    assert_eq!(state.edge(state.path_sink(out_tasklet)).dst, g.b);
    assert_eq!(state.edge(state.path_source(into_tasklet)).src, g.a);
}

#[test]
fn test_memlet_path_stops_at_fan_out() {
    let mut g = scoped_copy(ScheduleType::Default);
    let state = g.sdfg.state_mut(g.state);
    let second = state.add_tasklet("second", &["x"], &[], "");
    let extra = state.add_edge(g.entry, Some("OUT_A"), second, Some("x"), Memlet::simple("A", "i").unwrap());

    // `IN_A` now continues into two tasklets.
    assert_eq!(state.memlet_path(g.edges[0]), vec![g.edges[0]]);
    assert_eq!(state.memlet_path(extra), vec![g.edges[0], extra]);
}

#[test]
fn test_device_scope() {
    let g = scoped_copy(ScheduleType::GpuDevice);
    let state = g.sdfg.state(g.state);
    assert!(state.in_device_scope(g.tasklet));
    assert!(!state.in_device_scope(g.a));

    let g = scoped_copy(ScheduleType::CpuMulticore);
    assert!(!g.sdfg.state(g.state).in_device_scope(g.tasklet));
}

#[test]
fn test_scope_symbols() {
    let g = scoped_copy(ScheduleType::Default);
    let symbols = g.sdfg.state(g.state).scope_symbols(g.tasklet);
    assert!(symbols.contains("i"));
    assert!(g.sdfg.state(g.state).scope_symbols(g.a).is_empty());
}

// =========================================================================
// Nodes and edges
// =========================================================================

#[test]
fn test_remove_node_keeps_ids_stable() {
    let mut state = State::new("s");
    let a = state.add_access("A");
    let b = state.add_access("B");
    let c = state.add_access("C");
    state.add_nedge(a, b, Memlet::simple("A", "0").unwrap());
    let bc = state.add_nedge(b, c, Memlet::simple("B", "0").unwrap());

    state.remove_node(a);
    assert_eq!(state.node_ids(), vec![b, c]);
    assert_eq!(state.node(c).as_access(), Some("C"));
    assert_eq!(state.edges().map(|(id, _)| id).collect::<Vec<_>>(), vec![bc]);
    assert_eq!(state.in_degree(b), 0);
}

#[test]
fn test_edges_by_connector() {
    let g = scoped_copy(ScheduleType::Default);
    let state = g.sdfg.state(g.state);
    assert_eq!(state.edges_by_connector(g.tasklet, "x"), vec![g.edges[1]]);
    assert_eq!(state.edges_by_connector(g.tasklet, "y"), vec![g.edges[2]]);
    assert!(state.edges_by_connector(g.tasklet, "z").is_empty());
}

#[test]
fn test_topological_order_detects_cycles() {
    let mut state = State::new("s");
    let a = state.add_access("A");
    let b = state.add_access("B");
    state.add_nedge(a, b, Memlet::simple("A", "0").unwrap());
    assert_eq!(state.topological_order(), Some(vec![a, b]));

    state.add_nedge(b, a, Memlet::simple("B", "0").unwrap());
    assert_eq!(state.topological_order(), None);
}

#[test]
fn test_dangling_edge_is_not_a_cycle() {
    let mut state = State::new("s");
    let a = state.add_access("A");
    let b = state.add_access("B");
    state.add_nedge(a, b, Memlet::simple("A", "0").unwrap());
    let ghost = NodeId(42);
    let dangling = state.add_nedge(b, ghost, Memlet::simple("B", "0").unwrap());

    assert_eq!(state.topological_order(), Some(vec![a, b]));
    assert_eq!(state.dangling_edges(), vec![(dangling, ghost)]);
}

#[test]
fn test_rename_data() {
    let mut g = scoped_copy(ScheduleType::Default);
    g.sdfg.rename_data("A", "gpu_A");
    let state = g.sdfg.state(g.state);
    assert_eq!(state.node(g.a).as_access(), Some("gpu_A"));
    assert_eq!(state.edge(g.edges[0]).memlet.data.as_deref(), Some("gpu_A"));
    assert_eq!(state.edge(g.edges[1]).memlet.data.as_deref(), Some("gpu_A"));
    assert_eq!(state.edge(g.edges[3]).memlet.data.as_deref(), Some("B"));
}

#[test]
fn test_set_schedule() {
    let mut g = scoped_copy(ScheduleType::Default);
    let state = g.sdfg.state_mut(g.state);
    assert!(state.node_mut(g.entry).set_schedule(ScheduleType::GpuDevice));
    assert!(!state.node_mut(g.a).set_schedule(ScheduleType::GpuDevice));
    assert!(!state.node_mut(g.exit).set_schedule(ScheduleType::GpuDevice));
    assert_eq!(state.node(g.entry).schedule(), Some(ScheduleType::GpuDevice));
    assert!(matches!(state.node(g.entry), Node::MapEntry { map, .. } if map.params == ["i"]));
}

// =========================================================================
// State machine
// =========================================================================

#[test]
fn test_start_state() {
    let mut sdfg = Sdfg::new("g");
    let s0 = sdfg.add_state("s0");
    let s1 = sdfg.add_state("s1");
    assert_eq!(sdfg.start_state(), None);

    sdfg.add_edge(s0, s1, InterstateEdge::unconditional());
    assert_eq!(sdfg.start_state(), Some(s0));

    sdfg.add_edge(s1, s0, InterstateEdge::unconditional());
    assert_eq!(sdfg.start_state(), None);
    sdfg.set_start_state(s1);
    assert_eq!(sdfg.start_state(), Some(s1));
}

#[test]
fn test_add_state_after_splices_out_edges() {
    let mut sdfg = Sdfg::new("g");
    let s0 = sdfg.add_state("s0");
    let s1 = sdfg.add_state("s1");
    let s2 = sdfg.add_state("s2");
    sdfg.add_edge(s0, s1, InterstateEdge::guarded(crate::Expr::parse("i < N").unwrap()));
    sdfg.add_edge(s0, s2, InterstateEdge::guarded(crate::Expr::parse("i >= N").unwrap()));

    let mid = sdfg.add_state_after(s0, "mid");
    assert_eq!(sdfg.successors(s0), vec![mid]);
    assert_eq!(sdfg.successors(mid), vec![s1, s2]);
    let into_mid = sdfg.transition(sdfg.out_edges(s0)[0]);
    assert!(into_mid.edge.is_unconditional());
}

#[test]
fn test_add_state_before_moves_start() {
    let mut sdfg = Sdfg::new("g");
    let s0 = sdfg.add_state("s0");
    let s1 = sdfg.add_state("s1");
    sdfg.add_edge(s0, s1, InterstateEdge::unconditional());
    sdfg.set_start_state(s0);

    let pre = sdfg.add_state_before(s0, "pre");
    assert_eq!(sdfg.start_state(), Some(pre));
    assert_eq!(sdfg.predecessors(s0), vec![pre]);
    assert_eq!(sdfg.sink_states(), vec![s1]);
}

#[test]
fn test_remove_state() {
    let mut sdfg = Sdfg::new("g");
    let s0 = sdfg.add_state("s0");
    let s1 = sdfg.add_state("s1");
    sdfg.add_edge(s0, s1, InterstateEdge::unconditional());
    sdfg.remove_state(s1);
    assert_eq!(sdfg.state_ids(), vec![s0]);
    assert_eq!(sdfg.transitions().count(), 0);
}

// =========================================================================
// Names
// =========================================================================

#[test]
fn test_find_new_name() {
    let mut sdfg = Sdfg::new("g");
    sdfg.add_datadesc("gpu_A", array("4"), false).unwrap();
    sdfg.add_symbol("gpu_A_0", ScalarDType::Int32);

    assert_eq!(sdfg.find_new_name("B"), "B");
    assert_eq!(sdfg.find_new_name("gpu_A"), "gpu_A_1");
    let minted = sdfg.add_datadesc("gpu_A", array("4"), true).unwrap();
    assert_eq!(minted, "gpu_A_1");
}

#[test]
fn test_name_collision() {
    let mut sdfg = Sdfg::new("g");
    sdfg.add_constant("N", 4);
    let err = sdfg.add_datadesc("N", array("4"), false).unwrap_err();
    assert!(matches!(err, crate::Error::NameCollision { name, .. } if name == "N"));
}

#[test]
fn test_constant_symbols() {
    let mut sdfg = Sdfg::new("g");
    sdfg.add_symbol("N", ScalarDType::Int64);
    sdfg.add_symbol("i", ScalarDType::Int64);
    sdfg.add_constant("K", 8);
    let s0 = sdfg.add_state("s0");
    let s1 = sdfg.add_state("s1");
    sdfg.add_edge(s0, s1, InterstateEdge::unconditional().with_assignment("i", crate::Expr::int(0)));

    let constants: Vec<_> = sdfg.constant_symbols().into_iter().collect();
    assert_eq!(constants, ["K", "N"]);
}

#[test]
fn test_all_nodes_recursive() {
    let mut inner = Sdfg::new("inner");
    inner.add_datadesc("x", array("4"), false).unwrap();
    let s = inner.add_state("body");
    inner.state_mut(s).add_access("x");

    let mut outer = Sdfg::new("outer");
    outer.add_datadesc("A", array("4"), false).unwrap();
    let s = outer.add_state("main");
    let state = outer.state_mut(s);
    let a = state.add_access("A");
    let nested = state.add_nested_sdfg("nest", inner, &["x"], &[], Default::default());
    state.add_edge(a, None, nested, Some("x"), Memlet::simple("A", "0:4").unwrap());

    let names: Vec<_> = outer.all_nodes_recursive().iter().map(|r| (r.sdfg.name.clone(), r.node.label().to_string())).collect();
    assert_eq!(
        names,
        [
            ("outer".to_string(), "A".to_string()),
            ("outer".to_string(), "nest".to_string()),
            ("inner".to_string(), "x".to_string()),
        ]
    );
}

#[test]
fn test_descriptor_builders() {
    let desc = DataDescriptor::scalar(ScalarDType::Int32).with_storage(StorageType::GpuGlobal).with_transient(true);
    assert!(desc.is_scalar());
    assert!(desc.shape.is_empty());
    assert_eq!(desc.full_subset().to_string(), "0");
    assert_eq!(array("N").free_symbols().into_iter().collect::<Vec<_>>(), ["N"]);
}
