use super::parse_ok;
use crate::*;
use serde_json::json;

#[test]
fn config_dotted_get_and_set() {
    let mut cfg = Config::empty_object();
    cfg.set_value("flowchart.nodeSpacing", json!(80));
    assert_eq!(cfg.get_f64("flowchart.nodeSpacing"), Some(80.0));
    assert_eq!(cfg.get("flowchart.missing"), None);

    // Setting through a scalar replaces it with an object.
    cfg.set_value("flowchart.nodeSpacing.inner", json!(true));
    assert_eq!(cfg.get_bool("flowchart.nodeSpacing.inner"), Some(true));
}

#[test]
fn config_numeric_strings_and_non_finite_values() {
    let cfg = Config::from_value(json!({ "a": "40", "b": "wide", "c": -3 }));
    assert_eq!(cfg.get_f64("a"), Some(40.0));
    assert_eq!(cfg.get_f64("b"), None);
    assert_eq!(cfg.get_usize("c"), None);
    assert_eq!(cfg.get_str("b"), Some("wide"));
}

#[test]
fn config_deep_merge_keeps_unrelated_keys() {
    let mut cfg = Config::defaults();
    cfg.deep_merge(&json!({ "flowchart": { "nodeSpacing": 99 } }));
    assert_eq!(cfg.get_f64("flowchart.nodeSpacing"), Some(99.0));
    assert_eq!(cfg.get_f64("flowchart.rankSpacing"), Some(50.0));
    assert_eq!(cfg.get_f64("fontSize"), Some(16.0));
}

#[test]
fn limits_read_from_config_with_defaults() {
    let cfg = Config::from_value(json!({ "maxNodes": 10, "maxEdges": "bogus" }));
    let limits = Limits::from_config(&cfg);
    assert_eq!(limits.max_nodes, 10);
    assert_eq!(limits.max_edges, limits::DEFAULT_MAX_EDGES);
    assert_eq!(Limits::from_config(&Config::defaults()), Limits::default());
}

#[test]
fn engine_site_config_is_layered_over_defaults() {
    let engine =
        Engine::new().with_site_config(Config::from_value(json!({ "fontSize": 12 })));
    assert_eq!(engine.site_config().get_f64("fontSize"), Some(12.0));
    assert_eq!(
        engine.site_config().get_f64("flowchart.nodeSpacing"),
        Some(50.0)
    );
}

#[test]
fn init_directive_overrides_effective_config() {
    let text = "%%{init: {'flowchart': {'nodeSpacing': 120}, 'theme': 'dark'}}%%\ngraph TD\nA-->B";
    let parsed = parse_ok(text);
    assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
    assert_eq!(parsed.meta.config.get_f64("flowchart.nodeSpacing"), Some(120.0));
    assert_eq!(
        parsed.meta.effective_config.get_f64("flowchart.nodeSpacing"),
        Some(120.0)
    );
    assert_eq!(
        parsed.meta.effective_config.get_f64("flowchart.rankSpacing"),
        Some(50.0)
    );
    assert_eq!(parsed.meta.effective_config.get_str("theme"), Some("dark"));
    assert_eq!(parsed.meta.diagram_type, "flowchart");
}

#[test]
fn directive_cannot_raise_caps() {
    let text = "%%{init: {\"maxNodes\": 100000, \"fontSize\": 20}}%%\ngraph TD\nA-->B";
    let engine = Engine::new().with_site_config(Config::from_value(json!({ "maxNodes": 5 })));
    let parsed = engine.parse_diagram(text).unwrap();
    assert_eq!(parsed.diagnostics.len(), 1);
    assert!(parsed.diagnostics[0].message.contains("maxNodes"));
    assert_eq!(parsed.diagnostics[0].line, 1);
    assert_eq!(parsed.limits().max_nodes, 5);
    assert_eq!(parsed.meta.effective_config.get_f64("fontSize"), Some(20.0));
}

#[test]
fn malformed_and_unknown_directives_are_diagnostics() {
    let text = "%%{init: {not json}}%%\n%%{frobnicate: {}}%%\n%%{wrap}%%\ngraph TD\nA-->B";
    let parsed = parse_ok(text);
    let lines: Vec<usize> = parsed.diagnostics.iter().map(|d| d.line).collect();
    assert_eq!(lines, vec![1, 2]);
    assert_eq!(parsed.model.graph().unwrap().node_count(), 2);
}

#[test]
fn directive_strings_with_markup_are_cleared() {
    let text = "%%{init: {'themeVariables': {'primaryColor': '<script>'}, '__proto__': 1}}%%\npie\n\"a\": 1";
    let parsed = parse_ok(text);
    assert_eq!(
        parsed.meta.config.get_str("themeVariables.primaryColor"),
        Some("")
    );
    assert!(parsed.meta.config.get("__proto__").is_none());
}

#[test]
fn text_size_cap_is_checked_before_tokenizing() {
    let engine = Engine::new().with_site_config(Config::from_value(json!({ "maxTextSize": 10 })));
    let err = engine.parse_diagram("graph TD\nA-->B").unwrap_err();
    assert!(matches!(err, Error::TextTooLarge { size: 14, limit: 10 }));
    assert!(err.to_string().contains("exceeds the limit"));
    assert!(engine.detect_type("graph TD\nA-->B").is_err());
}

#[test]
fn parse_free_function_uses_defaults() {
    let parsed = parse("graph LR\nA-->B").unwrap();
    assert_eq!(parsed.meta.diagram_type, "flowchart");
    assert_eq!(parsed.limits(), Limits::default());
}

#[test]
fn metadata_title_comes_from_the_model() {
    let parsed = parse_ok("journey\ntitle Commute\nsection S\nWalk: 3: Me");
    assert_eq!(parsed.meta.title.as_deref(), Some("Commute"));
    let json = serde_json::to_value(&parsed).unwrap();
    assert_eq!(json["meta"]["diagramType"], "journey");
    assert_eq!(json["meta"]["title"], "Commute");
    assert!(json["meta"]["effectiveConfig"].is_object());
    assert_eq!(json["model"]["type"], "journey");
}

#[test]
fn diagnostics_report_line_and_offset() {
    let text = "graph TD\nA-->B\n  --> broken";
    let parsed = parse_ok(text);
    let d = &parsed.diagnostics[0];
    assert_eq!(d.line, 3);
    assert_eq!(&text[d.offset..d.offset + 3], "-->");
}
