use super::parse_ok;
use crate::diagrams::FlowchartModel;
use crate::*;
use selkie_graph::{ArrowHead, Direction, EdgeStyle, NodeShape};

fn flowchart(text: &str) -> (FlowchartModel, Vec<Diagnostic>) {
    let parsed = parse_ok(text);
    match parsed.model {
        DiagramModel::Flowchart(model) => (model, parsed.diagnostics),
        other => panic!("expected a flowchart, got {}", other.type_name()),
    }
}

#[test]
fn flowchart_basic_edge() {
    let (model, diagnostics) = flowchart("graph TD\nA-->B");
    assert!(diagnostics.is_empty());
    let ids: Vec<&str> = model.graph.nodes().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
    assert_eq!(model.graph.edge_count(), 1);
    let edge = &model.graph.edges()[0];
    assert_eq!((edge.from.as_str(), edge.to.as_str()), ("A", "B"));
    assert_eq!(edge.arrow_end, ArrowHead::Normal);
    assert_eq!(edge.min_len, 1);
    assert_eq!(model.graph.direction(), Direction::TB);
}

#[test]
fn flowchart_header_direction_variants() {
    for (header, dir) in [
        ("graph TB", Direction::TB),
        ("graph TD", Direction::TB),
        ("flowchart BT", Direction::BT),
        ("flowchart LR", Direction::LR),
        ("graph RL", Direction::RL),
        ("graph", Direction::TB),
    ] {
        let (model, _) = flowchart(&format!("{header}\nA-->B"));
        assert_eq!(model.graph.direction(), dir, "{header}");
    }
}

#[test]
fn flowchart_node_shapes_and_labels() {
    let text = "flowchart LR
A[Rect] --> B(Round)
B --> C{Decide}
C --> D((Circle))
D --> E>Flag]
E --> F[(Database)]
F --> G([Stadium])
G --> H[[Sub]]
H --> I{{Hex}}
I --> J[/Lean right/]
J --> K[\\Lean left\\]
K --> L[/Trap\\]
L --> M[\\Inv trap/]
M --> N(((Double)))";
    let (model, diagnostics) = flowchart(text);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let expected = [
        ("A", "Rect", NodeShape::Rect),
        ("B", "Round", NodeShape::Rounded),
        ("C", "Decide", NodeShape::Diamond),
        ("D", "Circle", NodeShape::Circle),
        ("E", "Flag", NodeShape::Asymmetric),
        ("F", "Database", NodeShape::Cylinder),
        ("G", "Stadium", NodeShape::Stadium),
        ("H", "Sub", NodeShape::Subroutine),
        ("I", "Hex", NodeShape::Hexagon),
        ("J", "Lean right", NodeShape::Parallelogram),
        ("K", "Lean left", NodeShape::ParallelogramAlt),
        ("L", "Trap", NodeShape::Trapezoid),
        ("M", "Inv trap", NodeShape::TrapezoidAlt),
        ("N", "Double", NodeShape::DoubleCircle),
    ];
    for (id, label, shape) in expected {
        let node = model.graph.node(id).unwrap();
        assert_eq!(node.label, label, "{id}");
        assert_eq!(node.shape, shape, "{id}");
    }
    assert_eq!(model.graph.edge_count(), 13);
}

#[test]
fn flowchart_quoted_labels_keep_brackets() {
    let (model, _) = flowchart("graph TD\nA[\"Hello (world)\"] --> B");
    assert_eq!(model.graph.node("A").unwrap().label, "Hello (world)");
}

#[test]
fn flowchart_plain_reference_does_not_reset_label() {
    let (model, _) = flowchart("graph TD\nA[Start] --> B\nA --> C");
    let a = model.graph.node("A").unwrap();
    assert_eq!(a.label, "Start");
    assert_eq!(a.shape, NodeShape::Rect);
    assert_eq!(model.graph.node_count(), 3);
}

#[test]
fn flowchart_link_kinds() {
    let text = "graph TD
A-.->B
B==>C
C---D
D --x E
E<-->F
F~~~G
G --o H";
    let (model, diagnostics) = flowchart(text);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let kinds: Vec<(EdgeStyle, ArrowHead, ArrowHead)> = model
        .graph
        .edges()
        .iter()
        .map(|e| (e.style, e.arrow_start, e.arrow_end))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (EdgeStyle::Dotted, ArrowHead::None, ArrowHead::Normal),
            (EdgeStyle::Thick, ArrowHead::None, ArrowHead::Normal),
            (EdgeStyle::Solid, ArrowHead::None, ArrowHead::None),
            (EdgeStyle::Solid, ArrowHead::None, ArrowHead::Cross),
            (EdgeStyle::Solid, ArrowHead::Normal, ArrowHead::Normal),
            (EdgeStyle::Invisible, ArrowHead::None, ArrowHead::None),
            (EdgeStyle::Solid, ArrowHead::None, ArrowHead::Circle),
        ]
    );
}

#[test]
fn flowchart_compact_cross_and_circle_links() {
    let (model, diagnostics) = flowchart("graph LR\nA--xB\nB--oC\nC==xD");
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let edges: Vec<(&str, &str, ArrowHead)> = model
        .graph
        .edges()
        .iter()
        .map(|e| (e.from.as_str(), e.to.as_str(), e.arrow_end))
        .collect();
    assert_eq!(
        edges,
        vec![
            ("A", "B", ArrowHead::Cross),
            ("B", "C", ArrowHead::Circle),
            ("C", "D", ArrowHead::Cross),
        ]
    );
    assert_eq!(model.graph.edges()[2].style, EdgeStyle::Thick);
}

#[test]
fn flowchart_longer_links_raise_min_len() {
    let (model, _) = flowchart("graph TD\nA--->B\nB---->C\nC-..->D\nD-->E");
    let lens: Vec<usize> = model.graph.edges().iter().map(|e| e.min_len).collect();
    assert_eq!(lens, vec![2, 3, 2, 1]);
}

#[test]
fn flowchart_edge_labels_in_both_forms() {
    let (model, diagnostics) = flowchart("graph TD\nA-->|yes|B\nA-- no -->C\nA-. maybe .->D");
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let labels: Vec<Option<&str>> = model
        .graph
        .edges()
        .iter()
        .map(|e| e.label.as_deref())
        .collect();
    assert_eq!(labels, vec![Some("yes"), Some("no"), Some("maybe")]);
    assert_eq!(model.graph.edges()[2].style, EdgeStyle::Dotted);
}

#[test]
fn flowchart_chains_and_ampersand_groups() {
    let (model, _) = flowchart("graph TD\nA & B --> C --> D & E");
    let pairs: Vec<(&str, &str)> = model
        .graph
        .edges()
        .iter()
        .map(|e| (e.from.as_str(), e.to.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![("A", "C"), ("B", "C"), ("C", "D"), ("C", "E")]
    );
}

#[test]
fn flowchart_semicolons_separate_statements() {
    let (model, _) = flowchart("graph TD;A-->B;B-->C;");
    assert_eq!(model.graph.node_count(), 3);
    assert_eq!(model.graph.edge_count(), 2);
}

#[test]
fn flowchart_dangling_link_keeps_source_node() {
    let (model, diagnostics) = flowchart("graph TD\nA-->\n");
    assert_eq!(model.graph.node_count(), 1);
    assert!(model.graph.has_node("A"));
    assert_eq!(model.graph.edge_count(), 0);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].line, 2);
}

#[test]
fn flowchart_bad_statement_is_skipped_and_parsing_continues() {
    let (model, diagnostics) = flowchart("graph TD\nA-->B\n--> oops\nB-->C");
    assert_eq!(model.graph.edge_count(), 2);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].line, 3);
}

#[test]
fn flowchart_subgraphs_and_nesting() {
    let text = "graph TB
subgraph outer [Outer box]
  A-->B
  subgraph inner
    direction LR
    C
  end
end
D-->A";
    let (model, diagnostics) = flowchart(text);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let outer = model.graph.subgraph("outer").unwrap();
    assert_eq!(outer.title, "Outer box");
    assert_eq!(outer.members, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(outer.parent, None);

    let inner_ix = model.graph.subgraph_index("inner").unwrap();
    let inner = &model.graph.subgraphs()[inner_ix];
    assert_eq!(inner.members, vec!["C".to_string()]);
    assert_eq!(inner.parent, model.graph.subgraph_index("outer"));
    assert_eq!(inner.direction, Some(Direction::LR));

    assert_eq!(model.graph.subgraphs_of("C").len(), 2);
    assert!(model.graph.subgraphs_of("D").is_empty());
}

#[test]
fn flowchart_untitled_subgraphs_get_generated_ids() {
    let (model, _) = flowchart("graph TB\nsubgraph \"Quoted title\"\nA\nend");
    let sub = &model.graph.subgraphs()[0];
    assert_eq!(sub.id, "subGraph0");
    assert_eq!(sub.title, "Quoted title");
}

#[test]
fn flowchart_unbalanced_end_is_a_diagnostic() {
    let (_, diagnostics) = flowchart("graph TB\nA\nend");
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn flowchart_side_tables() {
    let text = "graph TD
classDef hot fill:#f00,stroke:#333
A:::hot --> B
class B,C hot
style A color:#fff
click A href \"https://example.com\"
linkStyle 0 stroke:#f00";
    let (model, diagnostics) = flowchart(text);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(
        model.class_defs["hot"],
        vec!["fill:#f00".to_string(), "stroke:#333".to_string()]
    );
    assert_eq!(model.node_classes["A"], vec!["hot".to_string()]);
    assert_eq!(model.node_classes["B"], vec!["hot".to_string()]);
    assert_eq!(model.node_classes["C"], vec!["hot".to_string()]);
    assert_eq!(model.styles["A"], vec!["color:#fff".to_string()]);
    assert_eq!(model.links["A"], "https://example.com");
    // `class` does not declare nodes.
    assert!(!model.graph.has_node("C"));
}

#[test]
fn flowchart_common_statements() {
    let (model, _) = flowchart("graph TD\ntitle Build\naccTitle: Pipeline\naccDescr: Steps\nA-->B");
    assert_eq!(model.common.title.as_deref(), Some("Build"));
    assert_eq!(model.common.acc_title.as_deref(), Some("Pipeline"));
    assert_eq!(model.common.acc_descr.as_deref(), Some("Steps"));
}

#[test]
fn flowchart_br_tags_become_newlines() {
    let (model, _) = flowchart("graph TD\nA[one<br>two]");
    assert_eq!(model.graph.node("A").unwrap().label, "one\ntwo");
}

#[test]
fn flowchart_node_cap_is_fatal() {
    let site = Config::from_value(serde_json::json!({ "maxNodes": 2 }));
    let err = Engine::new()
        .with_site_config(site)
        .parse_diagram("graph TD\nA-->B\nB-->C")
        .unwrap_err();
    assert!(matches!(
        err,
        Error::TooManyNodes {
            diagram_type: "flowchart",
            limit: 2
        }
    ));
}

#[test]
fn flowchart_edge_cap_is_fatal() {
    let site = Config::from_value(serde_json::json!({ "maxEdges": 1 }));
    let err = Engine::new()
        .with_site_config(site)
        .parse_diagram("graph TD\nA-->B\nB-->A")
        .unwrap_err();
    assert!(matches!(err, Error::TooManyEdges { limit: 1, .. }));
}

#[test]
fn flowchart_model_serializes_camel_case() {
    let (model, _) = flowchart("graph LR\nA-->B");
    let json = serde_json::to_value(DiagramModel::Flowchart(model)).unwrap();
    assert_eq!(json["type"], "flowchart");
    assert_eq!(json["graph"]["direction"], "LR");
    assert!(json.get("classDefs").is_some());
    assert!(json.get("nodeClasses").is_some());
}
