use super::parse_ok;
use crate::diagrams::GanttModel;
use crate::diagrams::gantt::{chrono_format, parse_date, parse_duration};
use crate::*;
use chrono::{Duration, NaiveDate, NaiveDateTime};

fn gantt(text: &str) -> (GanttModel, Vec<Diagnostic>) {
    let parsed = parse_ok(text);
    match parsed.model {
        DiagramModel::Gantt(model) => (model, parsed.diagnostics),
        other => panic!("expected a gantt chart, got {}", other.type_name()),
    }
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
    at(y, m, d, 0, 0)
}

#[test]
fn gantt_tasks_resolve_dates_durations_and_dependencies() {
    let text = "gantt
dateFormat YYYY-MM-DD
title Project plan
section Design
Research :done, r1, 2024-01-01, 3d
Sketch :active, s1, after r1, 2d
section Build
Code :crit, c1, 2024-01-10, 2024-01-15
Test :5d
Fix :f1, 2024-01-02, until c1";
    let (model, diagnostics) = gantt(text);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(model.common.title.as_deref(), Some("Project plan"));
    assert_eq!(model.sections, vec!["Design".to_string(), "Build".to_string()]);

    let research = model.task("r1").unwrap();
    assert_eq!((research.start, research.end), (day(2024, 1, 1), day(2024, 1, 4)));
    assert!(research.tags.done);
    assert_eq!(research.section.as_deref(), Some("Design"));

    let sketch = model.task("s1").unwrap();
    assert_eq!((sketch.start, sketch.end), (day(2024, 1, 4), day(2024, 1, 6)));
    assert!(sketch.tags.active);

    let code = model.task("c1").unwrap();
    assert_eq!((code.start, code.end), (day(2024, 1, 10), day(2024, 1, 15)));
    assert!(code.tags.crit);

    // No start: continues from the previous task; no id: numbered.
    let test = &model.tasks[3];
    assert_eq!(test.id, "task4");
    assert_eq!(test.name, "Test");
    assert_eq!((test.start, test.end), (day(2024, 1, 15), day(2024, 1, 20)));
    assert_eq!(test.section.as_deref(), Some("Build"));

    let fix = model.task("f1").unwrap();
    assert_eq!(fix.end, day(2024, 1, 10));

    assert_eq!(model.time_range(), Some((day(2024, 1, 1), day(2024, 1, 20))));
}

#[test]
fn gantt_settings_are_recorded() {
    let text = "gantt
dateFormat YYYY-MM-DD
axisFormat %m/%d
excludes weekends, 2024-01-05
todayMarker off
A :2024-01-01, 1d";
    let (model, diagnostics) = gantt(text);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(model.date_format, "YYYY-MM-DD");
    assert_eq!(model.axis_format.as_deref(), Some("%m/%d"));
    assert_eq!(
        model.excludes,
        vec!["weekends".to_string(), "2024-01-05".to_string()]
    );
    assert!(!model.inclusive_end_dates);
}

#[test]
fn gantt_inclusive_end_dates_extend_by_a_day() {
    let (model, _) = gantt("gantt\ninclusiveEndDates\nA :a, 2024-01-01, 2024-01-03");
    assert!(model.inclusive_end_dates);
    assert_eq!(model.tasks[0].end, day(2024, 1, 4));
}

#[test]
fn gantt_milestones_may_have_zero_length() {
    let (model, diagnostics) = gantt("gantt\nShip :milestone, m1, 2024-02-01, 0d");
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let ship = &model.tasks[0];
    assert!(ship.tags.milestone);
    assert_eq!(ship.start, ship.end);
}

#[test]
fn gantt_date_formats_with_time_and_unix_seconds() {
    let (model, diagnostics) =
        gantt("gantt\ndateFormat YYYY-MM-DD HH:mm\nA :2024-01-01 10:00, 90m");
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(model.tasks[0].start, at(2024, 1, 1, 10, 0));
    assert_eq!(model.tasks[0].end, at(2024, 1, 1, 11, 30));

    let (model, diagnostics) = gantt("gantt\ndateFormat X\nA :1704067200, 1h");
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(model.tasks[0].start, day(2024, 1, 1));
    assert_eq!(model.tasks[0].end, at(2024, 1, 1, 1, 0));
}

#[test]
fn gantt_invalid_tasks_are_skipped() {
    let text = "gantt
First :3d
Bad date :2024-13-45, 1d
Backwards :2024-01-05, 2024-01-01
Orphan :after zz, 1d
Odd unit :2024-01-01, 3x
no colon here
Good :g, 2024-01-01, 1d";
    let (model, diagnostics) = gantt(text);
    let lines: Vec<usize> = diagnostics.iter().map(|d| d.line).collect();
    assert_eq!(lines, vec![2, 3, 4, 5, 6, 7]);
    assert_eq!(model.tasks.len(), 1);
    assert_eq!(model.tasks[0].id, "g");
}

#[test]
fn gantt_empty_chart_has_no_time_range() {
    let (model, _) = gantt("gantt\ntitle Nothing yet");
    assert!(model.tasks.is_empty());
    assert_eq!(model.time_range(), None);
}

#[test]
fn chrono_format_translates_dayjs_tokens() {
    assert_eq!(chrono_format("YYYY-MM-DD"), "%Y-%m-%d");
    assert_eq!(chrono_format("DD/MM/YY HH:mm:ss"), "%d/%m/%y %H:%M:%S");
    assert_eq!(chrono_format("X"), "%s");
    assert_eq!(chrono_format("100%"), "100%%");
}

#[test]
fn parse_date_rejects_mismatches() {
    assert_eq!(parse_date("%Y-%m-%d", "2024-02-29"), Some(day(2024, 2, 29)));
    assert_eq!(parse_date("%Y-%m-%d", "2023-02-29"), None);
    assert_eq!(parse_date("%Y-%m-%d", "tomorrow"), None);
}

#[test]
fn parse_duration_units() {
    assert_eq!(parse_duration("500ms"), Some(Duration::milliseconds(500)));
    assert_eq!(parse_duration("10s"), Some(Duration::seconds(10)));
    assert_eq!(parse_duration("30m"), Some(Duration::minutes(30)));
    assert_eq!(parse_duration("1.5h"), Some(Duration::minutes(90)));
    assert_eq!(parse_duration("3d"), Some(Duration::days(3)));
    assert_eq!(parse_duration("2w"), Some(Duration::weeks(2)));
    assert_eq!(parse_duration("3"), None);
    assert_eq!(parse_duration("3y"), None);
    assert_eq!(parse_duration("d"), None);
}
