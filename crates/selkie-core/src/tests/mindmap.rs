use super::parse_ok;
use crate::diagrams::MindmapModel;
use crate::diagrams::mindmap::MindmapShape;
use crate::*;

fn mindmap(text: &str) -> (MindmapModel, Vec<Diagnostic>) {
    let parsed = parse_ok(text);
    match parsed.model {
        DiagramModel::Mindmap(model) => (model, parsed.diagnostics),
        other => panic!("expected a mind map, got {}", other.type_name()),
    }
}

#[test]
fn mindmap_tree_follows_indentation() {
    let text = "mindmap
  root((My map))
    Origins
      Long history
      ::icon(fa fa-book)
    Research[Research]
      On effectiveness
    Tools";
    let (model, diagnostics) = mindmap(text);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let root = model.root().unwrap();
    assert_eq!(root.id, "root");
    assert_eq!(root.text, "My map");
    assert_eq!(root.shape, MindmapShape::Circle);
    assert_eq!(root.level, 0);
    assert_eq!(root.parent, None);

    let top: Vec<&str> = model.children(0).map(|n| n.text.as_str()).collect();
    assert_eq!(top, vec!["Origins", "Research", "Tools"]);

    let history = &model.nodes[2];
    assert_eq!(history.text, "Long history");
    assert_eq!(history.level, 2);
    assert_eq!(history.parent, Some(1));
    assert_eq!(history.icon.as_deref(), Some("fa fa-book"));

    let research = &model.nodes[3];
    assert_eq!(research.shape, MindmapShape::Square);
    assert_eq!(research.children, vec![4]);
}

#[test]
fn mindmap_node_shapes_and_ids() {
    let text = "mindmap
root
  a[Square]
  b(Rounded)
  c((Circle))
  d))Bang((
  e)Cloud(
  f{{Hex}}
  Plain text";
    let (model, diagnostics) = mindmap(text);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let nodes: Vec<(&str, &str, MindmapShape)> = model.nodes[1..]
        .iter()
        .map(|n| (n.id.as_str(), n.text.as_str(), n.shape))
        .collect();
    assert_eq!(
        nodes,
        vec![
            ("a", "Square", MindmapShape::Square),
            ("b", "Rounded", MindmapShape::Rounded),
            ("c", "Circle", MindmapShape::Circle),
            ("d", "Bang", MindmapShape::Bang),
            ("e", "Cloud", MindmapShape::Cloud),
            ("f", "Hex", MindmapShape::Hexagon),
            ("Plain text", "Plain text", MindmapShape::Default),
        ]
    );
}

#[test]
fn mindmap_classes_inline_and_on_their_own_line() {
    let text = "mindmap
root
  Pen and paper:::urgent large
  Other
  :::calm";
    let (model, _) = mindmap(text);
    assert_eq!(model.nodes[1].text, "Pen and paper");
    assert_eq!(
        model.nodes[1].classes,
        vec!["urgent".to_string(), "large".to_string()]
    );
    assert_eq!(model.nodes[2].classes, vec!["calm".to_string()]);
}

#[test]
fn mindmap_lines_at_root_indent_hang_off_the_root() {
    let (model, _) = mindmap("mindmap\nroot\n  a\nother\n  b");
    assert_eq!(model.nodes.len(), 4);
    assert_eq!(model.nodes[2].text, "other");
    assert_eq!(model.nodes[2].parent, Some(0));
    assert_eq!(model.nodes[2].level, 1);
    assert_eq!(model.nodes[3].parent, Some(2));
}

#[test]
fn mindmap_dedent_returns_to_matching_ancestor() {
    let (model, _) = mindmap("mindmap\nroot\n  a\n    a1\n      a11\n  b\n    b1");
    let parents: Vec<Option<usize>> = model.nodes.iter().map(|n| n.parent).collect();
    assert_eq!(parents, vec![None, Some(0), Some(1), Some(2), Some(0), Some(4)]);
}

#[test]
fn mindmap_invalid_lines_are_skipped() {
    let (model, diagnostics) = mindmap("mindmap\n::icon(fa fa-x)\n:::cls\nroot\n  ()\n  ::icon(open");
    let lines: Vec<usize> = diagnostics.iter().map(|d| d.line).collect();
    assert_eq!(lines, vec![2, 3, 5, 6]);
    assert_eq!(model.nodes.len(), 1);
    assert_eq!(model.nodes[0].icon, None);
}

#[test]
fn mindmap_without_nodes_is_empty() {
    let (model, diagnostics) = mindmap("mindmap\n");
    assert!(diagnostics.is_empty());
    assert!(model.root().is_none());
    assert_eq!(model.children(0).count(), 0);
}
