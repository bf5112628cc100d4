use selkie_graph::{Direction, Edge, EdgeStyle, Graph, Node, NodeShape, Rect, Subgraph};
use selkie_layout::{
    DeterministicTextMeasurer, Error, Extent, LayoutOptions, MAX_FONT_SIZE, MAX_ORDER_PASSES,
    MAX_SPACING, layout,
};

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

fn graph(direction: Direction, edges: &[(&str, &str)]) -> Graph {
    let mut g = Graph::new(direction);
    for (from, to) in edges {
        g.add_edge(Edge::new(*from, *to));
    }
    g
}

fn run(g: &mut Graph) -> Extent {
    layout(g, &DeterministicTextMeasurer::default(), &LayoutOptions::default()).unwrap()
}

fn node<'a>(g: &'a Graph, id: &str) -> &'a Node {
    g.node(id).unwrap()
}

#[test]
fn layout_can_layout_a_single_node() {
    let mut g = Graph::new(Direction::TB);
    g.add_node(Node::plain("A"));
    let extent = run(&mut g);

    // "A" measures 9.6 x 19.2; padding 15 on every side; margin 8.
    let a = node(&g, "A");
    assert_close(a.x, 8.0);
    assert_close(a.y, 8.0);
    assert_close(a.width, 39.6);
    assert_close(a.height, 49.2);
    assert_eq!(a.rank, Some(0));
    assert_eq!(a.order, Some(0));
    assert_close(extent.width, 55.6);
    assert_close(extent.height, 65.2);
}

#[test]
fn layout_of_an_empty_graph_is_just_the_margin() {
    let mut g = Graph::new(Direction::TB);
    let extent = run(&mut g);
    assert_eq!(
        extent,
        Extent {
            width: 16.0,
            height: 16.0
        }
    );
}

#[test]
fn layout_adjacent_ranks_use_facing_midpoints() {
    let mut g = graph(Direction::TB, &[("A", "B")]);
    run(&mut g);

    let (a, b) = (node(&g, "A"), node(&g, "B"));
    assert_eq!(a.rank, Some(0));
    assert_eq!(b.rank, Some(1));

    let edge = &g.edges()[0];
    assert!(!edge.back_edge);
    assert_eq!(edge.waypoints.len(), 2);
    assert_close(edge.waypoints[0].x, a.x + a.width / 2.0);
    assert_close(edge.waypoints[0].y, a.y + a.height);
    assert_close(edge.waypoints[1].x, b.x + b.width / 2.0);
    assert_close(edge.waypoints[1].y, b.y);
    assert_close(b.y - (a.y + a.height), 50.0);
}

#[test]
fn layout_long_edges_get_one_waypoint_per_crossed_rank() {
    let mut g = graph(Direction::TB, &[("A", "B"), ("B", "C"), ("A", "C")]);
    run(&mut g);

    let ranks: Vec<Option<usize>> = ["A", "B", "C"].iter().map(|id| node(&g, id).rank).collect();
    assert_eq!(ranks, vec![Some(0), Some(1), Some(2)]);

    let long = &g.edges()[2];
    assert_eq!(long.waypoints.len(), 3);
    let b = node(&g, "B");
    assert_close(long.waypoints[1].y, b.y + b.height / 2.0);
    for edge in &g.edges()[..2] {
        assert_eq!(edge.waypoints.len(), 2);
    }
}

#[test]
fn layout_min_len_spreads_ranks() {
    let mut g = Graph::new(Direction::TB);
    g.add_edge(Edge::new("A", "B").with_min_len(3));
    run(&mut g);
    assert_eq!(node(&g, "B").rank, Some(3));
    assert_eq!(g.edges()[0].waypoints.len(), 4);
}

#[test]
fn layout_back_edges_are_drawn_in_reverse() {
    let mut g = graph(Direction::TB, &[("A", "B"), ("B", "C"), ("C", "A")]);
    run(&mut g);

    let back = &g.edges()[2];
    assert!(back.back_edge);
    assert!(g.edges()[..2].iter().all(|e| !e.back_edge));
    assert_eq!(back.waypoints.len(), 3);

    let (a, c) = (node(&g, "A"), node(&g, "C"));
    assert_close(back.waypoints[0].y, c.y);
    assert_close(back.waypoints[2].y, a.y + a.height);
}

#[test]
fn layout_self_loops_detour_around_the_node_side() {
    let mut g = graph(Direction::TB, &[("A", "A"), ("A", "B")]);
    run(&mut g);

    let a = node(&g, "A");
    let lp = &g.edges()[0];
    assert!(!lp.back_edge);
    assert_eq!(lp.waypoints.len(), 3);
    assert_close(lp.waypoints[0].x, a.x + a.width);
    assert_close(lp.waypoints[2].x, a.x + a.width);
    assert!(lp.waypoints[1].x > a.x + a.width);
    assert_close(lp.waypoints[1].y, a.y + a.height / 2.0);
}

#[test]
fn layout_left_to_right_grows_along_x() {
    let mut g = graph(Direction::LR, &[("A", "B")]);
    let extent = run(&mut g);

    let (a, b) = (node(&g, "A"), node(&g, "B"));
    assert!(b.x >= a.x + a.width);
    assert_close(a.y + a.height / 2.0, b.y + b.height / 2.0);
    assert!(extent.width > extent.height);

    let edge = &g.edges()[0];
    assert_close(edge.waypoints[0].x, a.x + a.width);
    assert_close(edge.waypoints[1].x, b.x);
}

#[test]
fn layout_reversed_directions_flip_the_rank_axis() {
    let mut g = graph(Direction::BT, &[("A", "B")]);
    run(&mut g);
    let (a, b) = (node(&g, "A"), node(&g, "B"));
    assert!(b.y + b.height <= a.y);

    let mut g = graph(Direction::RL, &[("A", "B")]);
    run(&mut g);
    let (a, b) = (node(&g, "A"), node(&g, "B"));
    assert!(b.x + b.width <= a.x);
}

#[test]
fn layout_disconnected_nodes_share_rank_zero() {
    let mut g = Graph::new(Direction::TB);
    g.add_node(Node::plain("A"));
    g.add_node(Node::plain("B"));
    run(&mut g);

    let (a, b) = (node(&g, "A"), node(&g, "B"));
    assert_eq!((a.rank, b.rank), (Some(0), Some(0)));
    assert_eq!((a.order, b.order), (Some(0), Some(1)));
    assert_close(b.x - (a.x + a.width), 50.0);
}

#[test]
fn layout_edge_labels_sit_at_the_path_midpoint() {
    let mut g = Graph::new(Direction::TB);
    g.add_edge(Edge::new("A", "B").with_label(Some("yes".to_string())));
    g.add_edge(Edge::new("B", "C"));
    run(&mut g);

    let edge = &g.edges()[0];
    let label = edge.label_box.unwrap();
    let (p, q) = (edge.waypoints[0], edge.waypoints[1]);
    assert_close(label.center().x, (p.x + q.x) / 2.0);
    assert_close(label.center().y, (p.y + q.y) / 2.0);
    assert_close(label.width, 3.0 * 16.0 * 0.6);
    assert!(g.edges()[1].label_box.is_none());
}

#[test]
fn layout_subgraph_boxes_contain_their_members() {
    let mut g = graph(Direction::TB, &[("A", "B"), ("A", "C"), ("C", "D")]);
    let outer = g.add_subgraph(Subgraph::new("outer", "Outer"));
    let inner = g.add_subgraph(Subgraph {
        parent: Some(outer),
        ..Subgraph::new("inner", "Inner")
    });
    g.add_member(outer, "B");
    g.add_member(inner, "C");
    g.add_member(inner, "D");
    run(&mut g);

    let pad = LayoutOptions::default().padding;
    let outer_box = g.subgraphs()[outer].bounds();
    let inner_box = g.subgraphs()[inner].bounds();
    assert!(outer_box.contains_rect(&inner_box, 1e-6));
    for (sg, id) in [(outer_box, "B"), (inner_box, "C"), (inner_box, "D")] {
        let b = node(&g, id).bounds();
        let padded = Rect::new(b.x - pad, b.y - pad, b.width + 2.0 * pad, b.height + 2.0 * pad);
        assert!(sg.contains_rect(&padded, 1e-6), "{id} not inside {sg:?}");
    }
    assert!(!outer_box.contains_rect(&node(&g, "A").bounds(), 1e-6));
}

#[test]
fn layout_subgraph_members_stay_contiguous() {
    let mut g = graph(
        Direction::TB,
        &[("R", "X"), ("R", "Y"), ("R", "Z")],
    );
    let sg = g.add_subgraph(Subgraph::new("S", "S"));
    g.add_member(sg, "X");
    g.add_member(sg, "Z");
    run(&mut g);

    let (x, z) = (node(&g, "X").order.unwrap(), node(&g, "Z").order.unwrap());
    assert_eq!(x.abs_diff(z), 1);
    let y = node(&g, "Y").bounds();
    assert!(!g.subgraphs()[sg].bounds().contains_rect(&y, 1e-6));
}

#[test]
fn layout_empty_subgraphs_are_placed_below_the_drawing() {
    let mut g = graph(Direction::TB, &[("A", "B")]);
    let empty = g.add_subgraph(Subgraph::new("E", "Empty"));
    run(&mut g);

    let sg = &g.subgraphs()[empty];
    let b = node(&g, "B");
    assert!(sg.width > 0.0 && sg.height > 0.0);
    assert!(sg.y >= b.y + b.height);
}

#[test]
fn layout_rejects_too_many_layout_items() {
    let mut g = graph(Direction::TB, &[("A", "B"), ("B", "C"), ("A", "C")]);
    let options = LayoutOptions {
        max_layout_items: 3,
        ..LayoutOptions::default()
    };
    let err = layout(&mut g, &DeterministicTextMeasurer::default(), &options).unwrap_err();
    assert!(matches!(
        err,
        Error::TooManyLayoutItems { count: 4, limit: 3 }
    ));
}

#[test]
fn layout_is_deterministic() {
    let mut first = graph(
        Direction::TB,
        &[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D"), ("D", "A"), ("C", "E")],
    );
    first.add_edge(Edge::new("E", "E").with_style(EdgeStyle::Dotted));
    let mut second = first.clone();
    let e1 = run(&mut first);
    let e2 = run(&mut second);
    assert_eq!(e1, e2);
    assert_eq!(first, second);
}

#[test]
fn layout_covers_every_node_and_edge_with_finite_geometry() {
    let mut g = Graph::new(Direction::LR);
    g.add_node(Node::new("q", "Decide?", NodeShape::Diamond));
    g.add_node(Node::new("db", "日本語の表", NodeShape::Cylinder));
    for (from, to) in [("q", "db"), ("db", "x"), ("x", "q"), ("q", "y"), ("y", "y")] {
        g.add_edge(Edge::new(from, to));
    }
    let extent = run(&mut g);

    assert_eq!(g.node_count(), 4);
    assert_eq!(g.edge_count(), 5);
    for n in g.nodes() {
        for v in [n.x, n.y, n.width, n.height] {
            assert!(v.is_finite() && v >= 0.0, "{} has {v}", n.id);
        }
        assert!(n.x + n.width <= extent.width);
        assert!(n.y + n.height <= extent.height);
    }
    for e in g.edges() {
        assert!(e.waypoints.len() >= 2);
        assert!(
            e.waypoints
                .iter()
                .all(|p| p.x.is_finite() && p.y.is_finite() && p.x >= 0.0 && p.y >= 0.0)
        );
    }
}

#[test]
fn layout_wider_spacing_spreads_nodes() {
    let mut tight = graph(Direction::TB, &[("A", "B"), ("A", "C")]);
    let mut loose = tight.clone();
    let measurer = DeterministicTextMeasurer::default();
    layout(&mut tight, &measurer, &LayoutOptions::default()).unwrap();
    let options = LayoutOptions {
        node_sep: 120.0,
        rank_sep: 90.0,
        ..LayoutOptions::default()
    };
    layout(&mut loose, &measurer, &options).unwrap();

    let gap = |g: &Graph| node(g, "C").x - (node(g, "B").x + node(g, "B").width);
    assert_close(gap(&tight), 50.0);
    assert_close(gap(&loose), 120.0);
    let a = node(&loose, "A");
    assert_close(node(&loose, "B").y - (a.y + a.height), 90.0);
}

#[test]
fn layout_options_are_clamped_to_bounded_values() {
    let wild = LayoutOptions {
        node_sep: f64::MAX,
        rank_sep: -5.0,
        padding: f64::INFINITY,
        margin: f64::NAN,
        font_size: 1e300,
        order_passes: usize::MAX,
        max_layout_items: 7,
    };
    let d = LayoutOptions::default();
    assert_eq!(
        wild.clamped(),
        LayoutOptions {
            node_sep: MAX_SPACING,
            rank_sep: d.rank_sep,
            padding: d.padding,
            margin: d.margin,
            font_size: MAX_FONT_SIZE,
            order_passes: MAX_ORDER_PASSES,
            max_layout_items: 7,
        }
    );
    assert_eq!(d.clamped(), d);
}

#[test]
fn layout_extreme_options_still_finish_with_finite_geometry() {
    // K3,3 keeps crossings above zero, so every allowed sweep runs.
    let mut edges = Vec::new();
    for from in ["A", "B", "C"] {
        for to in ["D", "E", "F"] {
            edges.push((from, to));
        }
    }
    let mut g = graph(Direction::TB, &edges);
    let options = LayoutOptions {
        node_sep: 1e308,
        rank_sep: 1e308,
        order_passes: usize::MAX,
        ..LayoutOptions::default()
    };
    let extent = layout(&mut g, &DeterministicTextMeasurer::default(), &options).unwrap();

    assert!(extent.width.is_finite() && extent.height.is_finite());
    for n in g.nodes() {
        for v in [n.x, n.y, n.width, n.height] {
            assert!(v.is_finite() && v >= 0.0, "{} has {v}", n.id);
        }
    }
    let mut bottom: Vec<&Node> = ["D", "E", "F"].iter().map(|id| node(&g, id)).collect();
    bottom.sort_by(|a, b| a.x.total_cmp(&b.x));
    assert_close(bottom[1].x - (bottom[0].x + bottom[0].width), MAX_SPACING);
}
