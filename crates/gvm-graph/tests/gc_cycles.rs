//! End-to-end GC scenarios from the design spec: a cycle is reclaimed
//! when nothing roots it, and kept (with consistent back-edges) when a
//! member of the cycle stays rooted.

use gvm_graph::Graph;
use gvm_util::{Symbol, Value};

fn edge(graph: &mut Graph, a: gvm_util::Ref, b: gvm_util::Ref, key: &str) {
    graph.set(a, Symbol::of(key), Value::Ref(b)).unwrap();
}

#[test]
fn cycle_without_root_is_fully_reclaimed() {
    let mut graph = Graph::new();
    let a = graph.alloc();
    let b = graph.alloc();
    let c = graph.alloc();

    edge(&mut graph, a, b, "next");
    edge(&mut graph, b, c, "next");
    edge(&mut graph, c, a, "next");

    let free_before = graph.free_count();
    graph.unmark(a).unwrap();
    graph.clean();

    assert_eq!(graph.free_count(), free_before + 3);
    assert!(graph.get(a, Symbol::of("next")).is_err());
    assert!(graph.get(b, Symbol::of("next")).is_err());
    assert!(graph.get(c, Symbol::of("next")).is_err());
}

#[test]
fn cycle_with_one_rooted_member_survives_intact() {
    let mut graph = Graph::new();
    let a = graph.alloc();
    let b = graph.alloc();
    let c = graph.alloc();

    edge(&mut graph, a, b, "next");
    edge(&mut graph, b, c, "next");
    edge(&mut graph, c, a, "next");

    graph.clean();

    assert_eq!(graph.get(a, Symbol::of("next")).unwrap(), Value::Ref(b));
    assert_eq!(graph.get(b, Symbol::of("next")).unwrap(), Value::Ref(c));
    assert_eq!(graph.get(c, Symbol::of("next")).unwrap(), Value::Ref(a));

    assert_eq!(graph.backref_size(a).unwrap(), 1);
    assert_eq!(graph.backref_index(a, 0).unwrap(), Some(c));
    assert_eq!(graph.backref_size(b).unwrap(), 1);
    assert_eq!(graph.backref_index(b, 0).unwrap(), Some(a));
}

#[test]
fn unreachable_tail_behind_a_live_chain_is_reclaimed() {
    let mut graph = Graph::new();
    let root = graph.alloc();
    let live = graph.salloc(root, Symbol::of("head")).unwrap();
    let dangling = graph.alloc();
    edge(&mut graph, live, dangling, "scratch");
    graph.unmark(dangling).unwrap();

    // dangling is still reachable via live -> dangling, so it survives.
    graph.clean();
    assert!(graph.get(live, Symbol::of("scratch")).is_ok());

    // Now drop the only edge into dangling and collect again.
    graph.del(live, Symbol::of("scratch")).unwrap();
    graph.clean();
    assert!(graph.get(dangling, Symbol::of("scratch")).is_err());
}
