use super::parse_ok;
use crate::diagrams::ClassModel;
use crate::diagrams::class::RelationEnd;
use crate::*;
use selkie_graph::{ArrowHead, Direction, EdgeStyle, NodeShape};

fn class(text: &str) -> (ClassModel, Vec<Diagnostic>) {
    let parsed = parse_ok(text);
    match parsed.model {
        DiagramModel::Class(model) => (model, parsed.diagnostics),
        other => panic!("expected a class diagram, got {}", other.type_name()),
    }
}

#[test]
fn class_body_members_split_into_attributes_and_methods() {
    let text = "classDiagram
class Animal {
  +String name
  +eat(food) bool
  -int age$
  +move()*
}";
    let (model, diagnostics) = class(text);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let animal = &model.classes["Animal"];
    let attrs: Vec<(&str, &str, &str)> = animal
        .attributes
        .iter()
        .map(|m| (m.visibility.as_str(), m.text.as_str(), m.classifier.as_str()))
        .collect();
    assert_eq!(attrs, vec![("+", "String name", ""), ("-", "int age", "$")]);
    let methods: Vec<(&str, &str)> = animal
        .methods
        .iter()
        .map(|m| (m.text.as_str(), m.classifier.as_str()))
        .collect();
    assert_eq!(methods, vec![("eat(food) bool", ""), ("move()", "*")]);

    let node = model.graph.node("Animal").unwrap();
    assert_eq!(node.shape, NodeShape::ClassBox);
    assert_eq!(
        node.compartments,
        vec![
            vec!["+String name".to_string(), "-int age".to_string()],
            vec!["+eat(food) bool".to_string(), "+move()".to_string()],
        ]
    );
}

#[test]
fn class_colon_members() {
    let (model, _) = class("classDiagram\nAnimal : +int age\nAnimal : +isMammal()");
    let animal = &model.classes["Animal"];
    assert_eq!(animal.attributes.len(), 1);
    assert_eq!(animal.methods.len(), 1);
    assert_eq!(animal.methods[0].text, "isMammal()");
}

#[test]
fn class_inline_body_on_one_line() {
    let (model, _) = class("classDiagram\nclass Point { +int x }\nclass Other");
    assert_eq!(model.classes["Point"].attributes[0].text, "int x");
    assert!(model.classes["Other"].attributes.is_empty());
}

#[test]
fn class_relations_decode_both_ends() {
    let text = "classDiagram
Animal <|-- Duck
Car \"1\" *-- \"4\" Wheel : has
Duck ..> Pond
Pond o-- Lily
C -- D";
    let (model, diagnostics) = class(text);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let ends: Vec<(RelationEnd, RelationEnd, bool)> = model
        .relations
        .iter()
        .map(|r| (r.end_from, r.end_to, r.dotted))
        .collect();
    assert_eq!(
        ends,
        vec![
            (RelationEnd::Inheritance, RelationEnd::None, false),
            (RelationEnd::Composition, RelationEnd::None, false),
            (RelationEnd::None, RelationEnd::Association, true),
            (RelationEnd::Aggregation, RelationEnd::None, false),
            (RelationEnd::None, RelationEnd::None, false),
        ]
    );

    let has = &model.relations[1];
    assert_eq!(has.cardinality_from.as_deref(), Some("1"));
    assert_eq!(has.cardinality_to.as_deref(), Some("4"));
    assert_eq!(has.label.as_deref(), Some("has"));

    let inherit = &model.graph.edges()[0];
    assert_eq!(inherit.arrow_start, ArrowHead::Triangle);
    assert_eq!(inherit.arrow_end, ArrowHead::None);
    assert_eq!(model.graph.edges()[2].style, EdgeStyle::Dotted);
    assert_eq!(model.graph.edge_count(), 5);
    // Relations declare their classes.
    assert!(model.classes.contains_key("Lily"));
}

#[test]
fn class_generics_annotations_and_labels() {
    let text = "classDiagram
class Shape~T~
<<interface>> Shape
class Animal[\"An animal\"]";
    let (model, diagnostics) = class(text);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let shape = &model.classes["Shape"];
    assert_eq!(shape.generic.as_deref(), Some("T"));
    assert_eq!(shape.annotations, vec!["interface".to_string()]);
    assert_eq!(model.graph.node("Shape").unwrap().label, "«interface»\nShape<T>");
    assert_eq!(model.graph.node("Animal").unwrap().label, "An animal");
}

#[test]
fn class_member_generics_use_angle_brackets() {
    let (model, _) = class("classDiagram\nclass Zoo {\n  +List~Animal~ animals\n}");
    assert_eq!(model.classes["Zoo"].attributes[0].text, "List<Animal> animals");
}

#[test]
fn class_notes_become_note_nodes() {
    let (model, _) =
        class("classDiagram\nclass Duck\nnote \"General\"\nnote for Duck \"can fly\"");
    assert_eq!(model.notes.len(), 2);
    assert_eq!(model.notes[0].id, "note0");
    assert_eq!(model.notes[0].for_class, None);
    assert_eq!(model.notes[1].for_class.as_deref(), Some("Duck"));
    let note = model.graph.node("note1").unwrap();
    assert_eq!(note.shape, NodeShape::Note);
    assert_eq!(note.label, "can fly");
    let edge = &model.graph.edges()[0];
    assert_eq!((edge.from.as_str(), edge.to.as_str()), ("note1", "Duck"));
    assert_eq!(edge.style, EdgeStyle::Dotted);
}

#[test]
fn class_namespaces_become_subgraphs() {
    let (model, diagnostics) =
        class("classDiagram\nnamespace Zoo {\n  class Lion\n}\nclass Keeper");
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let zoo = model.graph.subgraph("Zoo").unwrap();
    assert_eq!(zoo.members, vec!["Lion".to_string()]);
    assert!(model.graph.subgraphs_of("Keeper").is_empty());
}

#[test]
fn class_direction_statement() {
    let (model, _) = class("classDiagram\ndirection RL\nA <|-- B");
    assert_eq!(model.graph.direction(), Direction::RL);
}

#[test]
fn class_malformed_statements_are_skipped() {
    let (model, diagnostics) = class("classDiagram\nAnimal ?? Duck\nAnimal <|--\nA <|-- B\n}");
    assert_eq!(diagnostics.len(), 3);
    let lines: Vec<usize> = diagnostics.iter().map(|d| d.line).collect();
    assert_eq!(lines, vec![2, 3, 5]);
    assert_eq!(model.relations.len(), 1);
}

#[test]
fn class_styling_statements_are_accepted_silently() {
    let (_, diagnostics) = class(
        "classDiagram\nclass A\nstyle A fill:#f9f\nclassDef hot fill:#f00\nclick A href \"x\"",
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}
