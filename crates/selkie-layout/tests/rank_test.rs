use selkie_graph::{Direction, Edge, Graph, Node};
use selkie_layout::rank;

fn graph(edges: &[(&str, &str)]) -> Graph {
    let mut g = Graph::new(Direction::TB);
    for (from, to) in edges {
        g.add_edge(Edge::new(*from, *to));
    }
    g
}

fn ranks(g: &Graph) -> Vec<(String, usize)> {
    g.nodes()
        .iter()
        .map(|n| (n.id.clone(), n.rank.unwrap()))
        .collect()
}

fn assert_respects_min_len(g: &Graph) {
    for e in g.edges().iter().filter(|e| !e.back_edge && !e.is_self_loop()) {
        let v = g.node(&e.from).unwrap().rank.unwrap();
        let w = g.node(&e.to).unwrap().rank.unwrap();
        assert!(
            w >= v + e.min_len,
            "edge {} -> {} violates min_len {}: {w} < {v} + {}",
            e.from,
            e.to,
            e.min_len,
            e.min_len
        );
    }
}

#[test]
fn rank_longest_path_on_a_dag() {
    let mut g = graph(&[
        ("a", "b"),
        ("b", "c"),
        ("c", "d"),
        ("d", "h"),
        ("a", "e"),
        ("e", "g"),
        ("g", "h"),
        ("a", "f"),
        ("f", "g"),
    ]);
    let max_rank = rank::rank(&mut g);
    assert_eq!(max_rank, 4);
    assert_respects_min_len(&g);
    assert_eq!(g.node("h").unwrap().rank, Some(4));
    assert_eq!(g.node("g").unwrap().rank, Some(2));
    assert!(g.edges().iter().all(|e| !e.back_edge));
}

#[test]
fn rank_honors_min_len() {
    let mut g = Graph::new(Direction::TB);
    g.add_edge(Edge::new("a", "b").with_min_len(2));
    g.add_edge(Edge::new("a", "c"));
    g.add_edge(Edge::new("c", "b"));
    rank::rank(&mut g);
    assert_respects_min_len(&g);
    assert_eq!(
        ranks(&g),
        vec![("a".into(), 0), ("b".into(), 2), ("c".into(), 1)]
    );
}

#[test]
fn rank_marks_edges_into_the_current_path_as_back_edges() {
    let mut g = graph(&[("a", "b"), ("b", "a")]);
    rank::rank(&mut g);
    let back: Vec<bool> = g.edges().iter().map(|e| e.back_edge).collect();
    assert_eq!(back, vec![false, true]);
    assert_eq!(ranks(&g), vec![("a".into(), 0), ("b".into(), 1)]);
}

#[test]
fn rank_starts_from_roots_before_insertion_order() {
    let mut g = Graph::new(Direction::TB);
    for id in ["c", "b", "a"] {
        g.add_node(Node::plain(id));
    }
    g.add_edge(Edge::new("a", "b"));
    g.add_edge(Edge::new("b", "c"));
    g.add_edge(Edge::new("c", "b"));
    rank::rank(&mut g);

    let back: Vec<bool> = g.edges().iter().map(|e| e.back_edge).collect();
    assert_eq!(back, vec![false, false, true]);
    assert_eq!(
        ranks(&g),
        vec![("c".into(), 2), ("b".into(), 1), ("a".into(), 0)]
    );
}

#[test]
fn rank_seeds_components_only_reachable_through_cycles() {
    let mut g = graph(&[("root", "leaf"), ("x", "y"), ("y", "z"), ("z", "x")]);
    rank::rank(&mut g);
    assert_eq!(
        ranks(&g),
        vec![
            ("root".into(), 0),
            ("leaf".into(), 1),
            ("x".into(), 0),
            ("y".into(), 1),
            ("z".into(), 2),
        ]
    );
    assert!(g.edges()[3].back_edge);
    assert_respects_min_len(&g);
}

#[test]
fn rank_ignores_self_loops() {
    let mut g = graph(&[("a", "a"), ("a", "b"), ("b", "b")]);
    rank::rank(&mut g);
    assert!(g.edges().iter().all(|e| !e.back_edge));
    assert_eq!(ranks(&g), vec![("a".into(), 0), ("b".into(), 1)]);
}

#[test]
fn rank_handles_deep_chains_without_recursion() {
    let ids: Vec<String> = (0..5_000).map(|i| format!("n{i}")).collect();
    let mut g = Graph::new(Direction::TB);
    for pair in ids.windows(2) {
        g.add_edge(Edge::new(pair[0].as_str(), pair[1].as_str()));
    }
    g.add_edge(Edge::new("n4999", "n0"));
    let max_rank = rank::rank(&mut g);
    assert_eq!(max_rank, 4_999);
    assert!(g.edges().last().unwrap().back_edge);
}

#[test]
fn rank_of_a_single_node_is_zero() {
    let mut g = Graph::new(Direction::TB);
    g.add_node(Node::plain("only"));
    assert_eq!(rank::rank(&mut g), 0);
    assert_eq!(g.node("only").unwrap().rank, Some(0));
}
