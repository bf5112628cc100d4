use selkie_graph::{Direction, Edge, Graph, Node, NodeShape, Subgraph};

#[test]
fn nodes_keep_declaration_order() {
    let mut g = Graph::new(Direction::TB);
    g.ensure_node("c");
    g.ensure_node("a");
    g.ensure_node("b");

    let ids: Vec<&str> = g.nodes().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
    assert_eq!(g.node_index("a"), Some(1));
}

#[test]
fn add_edge_creates_missing_endpoints() {
    let mut g = Graph::new(Direction::TB);
    g.add_edge(Edge::new("a", "b"));

    assert_eq!(g.node_count(), 2);
    assert_eq!(g.node("b").map(|n| n.label.as_str()), Some("b"));
    assert_eq!(g.successors("a"), vec!["b"]);
    assert_eq!(g.predecessors("b"), vec!["a"]);
}

#[test]
fn duplicate_node_upgrades_placeholder_label_and_shape() {
    let mut g = Graph::new(Direction::TB);
    g.add_edge(Edge::new("a", "b"));
    let ix = g.add_node(Node::new("a", "Start", NodeShape::Stadium));

    assert_eq!(ix, 0);
    assert_eq!(g.node_count(), 2);
    let a = g.node("a").unwrap();
    assert_eq!(a.label, "Start");
    assert_eq!(a.shape, NodeShape::Stadium);

    // A later bare reference does not erase the richer declaration.
    g.add_node(Node::plain("a"));
    assert_eq!(g.node("a").unwrap().label, "Start");
    assert_eq!(g.node("a").unwrap().shape, NodeShape::Stadium);
}

#[test]
fn membership_moves_to_latest_subgraph() {
    let mut g = Graph::new(Direction::TB);
    let outer = g.add_subgraph(Subgraph::new("outer", "Outer"));
    let inner = g.add_subgraph(Subgraph {
        parent: Some(outer),
        ..Subgraph::new("inner", "Inner")
    });
    g.add_member(outer, "x");
    g.add_member(inner, "x");

    assert!(g.subgraphs()[outer].members.is_empty());
    assert_eq!(g.subgraphs()[inner].members, vec!["x".to_string()]);
    assert_eq!(g.subgraphs_of("x"), vec![inner, outer]);
    assert_eq!(g.subgraph_depth(inner), 1);
    assert_eq!(g.child_subgraphs(outer).collect::<Vec<_>>(), vec![inner]);
}

#[test]
fn adjacency_lists_follow_edge_order() {
    let mut g = Graph::new(Direction::TB);
    g.add_edge(Edge::new("a", "b"));
    g.add_edge(Edge::new("a", "c"));
    g.add_edge(Edge::new("c", "b"));

    let adj = g.adjacency();
    let a = g.node_index("a").unwrap();
    let b = g.node_index("b").unwrap();
    assert_eq!(adj.out_edges(a), &[0, 1]);
    assert_eq!(adj.in_edges(b), &[0, 2]);
    assert_eq!(adj.successors(a).collect::<Vec<_>>(), vec![b, 2]);
    assert_eq!(adj.ends(2), Some((2, b)));
}

#[test]
fn serde_round_trip_rebuilds_indices() {
    let mut g = Graph::new(Direction::LR);
    let sg = g.add_subgraph(Subgraph::new("s", "S"));
    g.add_edge(Edge::new("a", "b").with_label(Some("go".to_string())));
    g.add_member(sg, "a");

    let json = serde_json::to_string(&g).unwrap();
    let back: Graph = serde_json::from_str(&json).unwrap();

    assert_eq!(back.direction(), Direction::LR);
    assert_eq!(back.node_index("b"), Some(1));
    assert_eq!(back.parent_of("a"), Some(sg));
    assert_eq!(back, g);
}
