//! small typed graphs shared by tests

use super::pgraph::KGraph;

/// 3 node types, 2 relation types, 10 nodes, 15 edges.
pub(crate) fn scenario_a() -> KGraph {
    let mut graph = KGraph::new();
    let nodes = [
        ("d0", "drug"),
        ("d1", "drug"),
        ("d2", "drug"),
        ("p0", "protein"),
        ("p1", "protein"),
        ("p2", "protein"),
        ("p3", "protein"),
        ("f0", "function"),
        ("f1", "function"),
        ("f2", "function"),
    ];
    for (id, ntype) in nodes {
        graph.add_node(id, ntype).unwrap();
    }
    let edges = [
        ("d0", "p0", "targets"),
        ("d0", "p1", "targets"),
        ("d1", "p1", "targets"),
        ("d1", "p2", "targets"),
        ("d2", "p3", "targets"),
        ("d2", "p0", "targets"),
        ("p0", "f0", "involved_in"),
        ("p1", "f0", "involved_in"),
        ("p1", "f1", "involved_in"),
        ("p2", "f1", "involved_in"),
        ("p3", "f2", "involved_in"),
        ("p0", "f2", "involved_in"),
        ("d0", "p0", "involved_in"),
        ("d1", "p3", "targets"),
        ("p2", "f2", "involved_in"),
    ];
    for (s, t, r) in edges {
        graph.add_edge(s, t, r).unwrap();
    }
    graph
} // end of scenario_a


/// a small drug -> protein -> function -> phenotype graph with one isolated node "orphan".
/// Under the default walk transitions every non isolated node is reached with certainty by some walk.
pub(crate) fn with_isolated() -> KGraph {
    let mut graph = KGraph::new();
    let nodes = [
        ("aspirin", "drug"),
        ("ibuprofen", "drug"),
        ("COX1", "protein"),
        ("COX2", "protein"),
        ("inflammation", "function"),
        ("pain", "phenotype"),
        ("fever", "phenotype"),
        ("orphan", "protein"),
    ];
    for (id, ntype) in nodes {
        graph.add_node(id, ntype).unwrap();
    }
    let edges = [
        ("aspirin", "COX1", "inhibits"),
        ("aspirin", "COX2", "inhibits"),
        ("ibuprofen", "COX2", "inhibits"),
        ("COX1", "inflammation", "involved_in"),
        ("COX2", "inflammation", "involved_in"),
        ("inflammation", "pain", "causes"),
        ("inflammation", "fever", "causes"),
        ("pain", "aspirin", "treated_by"),
        ("fever", "ibuprofen", "treated_by"),
        ("COX1", "COX2", "interacts"),
    ];
    for (s, t, r) in edges {
        graph.add_edge(s, t, r).unwrap();
    }
    graph
} // end of with_isolated


/// a chain of n nodes with alternating types, plus a few chords. Every node has out edges.
pub(crate) fn ring(n: usize) -> KGraph {
    let mut graph = KGraph::new();
    for i in 0..n {
        let ntype = if i % 2 == 0 { "drug" } else { "protein" };
        graph.add_node(&format!("n{}", i), ntype).unwrap();
    }
    for i in 0..n {
        graph
            .add_edge(&format!("n{}", i), &format!("n{}", (i + 1) % n), "next")
            .unwrap();
        if i % 3 == 0 {
            graph
                .add_edge(&format!("n{}", i), &format!("n{}", (i + 5) % n), "jump")
                .unwrap();
        }
    }
    graph
} // end of ring
