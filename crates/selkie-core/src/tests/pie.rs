use super::parse_ok;
use crate::diagrams::PieModel;
use crate::*;

fn pie(text: &str) -> (PieModel, Vec<Diagnostic>) {
    let parsed = parse_ok(text);
    match parsed.model {
        DiagramModel::Pie(model) => (model, parsed.diagnostics),
        other => panic!("expected a pie chart, got {}", other.type_name()),
    }
}

#[test]
fn pie_slices_keep_declaration_order() {
    let (model, diagnostics) = pie("pie\n\"Dogs\" : 386\n\"Cats\" : 85.5\n\"Rats\" : 15");
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let slices: Vec<(&str, f64)> = model
        .slices
        .iter()
        .map(|s| (s.label.as_str(), s.value))
        .collect();
    assert_eq!(slices, vec![("Dogs", 386.0), ("Cats", 85.5), ("Rats", 15.0)]);
    assert_eq!(model.total(), 486.5);
    assert!(!model.show_data);
}

#[test]
fn pie_header_flags_and_title() {
    let parsed = parse_ok("pie showData title Key elements\n\"A\" : 1");
    assert_eq!(parsed.meta.title.as_deref(), Some("Key elements"));
    let DiagramModel::Pie(model) = parsed.model else {
        panic!("expected a pie chart");
    };
    assert!(model.show_data);
    assert_eq!(model.common.title.as_deref(), Some("Key elements"));
}

#[test]
fn pie_title_and_show_data_in_body() {
    let (model, _) = pie("pie\ntitle Pets\nshowData\n\"A\" : 1");
    assert_eq!(model.common.title.as_deref(), Some("Pets"));
    assert!(model.show_data);
}

#[test]
fn pie_zero_is_a_valid_value() {
    let (model, diagnostics) = pie("pie\n\"Empty\" : 0\n\"Full\" : 10");
    assert!(diagnostics.is_empty());
    assert_eq!(model.slices[0].value, 0.0);
}

#[test]
fn pie_invalid_slices_are_skipped() {
    let text = "pie
\"Neg\" : -5
\"Word\" : lots
\"Ok\" : 1
\"Ok\" : 2
Bare : 3
\"NoColon\" 3";
    let (model, diagnostics) = pie(text);
    assert_eq!(model.slices.len(), 1);
    assert_eq!(model.slices[0].value, 1.0);
    let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(messages.len(), 5);
    assert!(messages[0].contains("non-negative"));
    assert!(messages[1].contains("not a number"));
    assert!(messages[2].contains("duplicate"));
    assert!(messages[3].contains("quoted slice label"));
    assert!(messages[4].contains("`:`"));
}

#[test]
fn pie_slice_cap_is_fatal() {
    let site = Config::from_value(serde_json::json!({ "maxNodes": 1 }));
    let err = Engine::new()
        .with_site_config(site)
        .parse_diagram("pie\n\"a\" : 1\n\"b\" : 2")
        .unwrap_err();
    assert!(matches!(
        err,
        Error::TooManyNodes {
            diagram_type: "pie",
            ..
        }
    ));
}
