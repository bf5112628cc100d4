use chrono::NaiveDate;
use selkie_core::Engine;
use selkie_render::model::{GanttLayout, LayoutDiagram};
use selkie_render::{LayoutOptions, layout_parsed};

fn gantt(text: &str) -> GanttLayout {
    let parsed = Engine::new().parse_diagram(text).expect("parse ok");
    let out = layout_parsed(&parsed, &LayoutOptions::default()).expect("layout ok");
    let LayoutDiagram::Gantt(layout) = out.layout else {
        panic!("expected a gantt layout");
    };
    layout
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

const TWO_SECTIONS: &str = "gantt
dateFormat YYYY-MM-DD
section Alpha
One :a1, 2024-01-01, 10d
section Beta
Two :b1, after a1, 10d";

#[test]
fn gantt_bars_scale_with_time() {
    let layout = gantt(TWO_SECTIONS);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert_eq!(layout.start, Some(start));

    // 20 days over the 1050px between the paddings.
    let (one, two) = (&layout.tasks[0], &layout.tasks[1]);
    assert!(close(one.bar.x, 75.0));
    assert!(close(one.bar.width, 525.0));
    assert!(close(two.bar.x, 600.0));
    assert!(close(two.bar.max_x(), 1125.0));
    assert!(two.bar.y > one.bar.y);
    assert!(close(two.bar.y - one.bar.y, 24.0));
}

#[test]
fn gantt_short_labels_sit_inside_their_bar() {
    let layout = gantt(TWO_SECTIONS);
    let one = &layout.tasks[0];
    assert!(one.label_inside);
    assert!(one.bar.contains_rect(&one.label, 1e-9));
    assert!(close(one.label.center().x, one.bar.center().x));
}

#[test]
fn gantt_sections_band_their_rows() {
    let layout = gantt(TWO_SECTIONS);
    let names: Vec<&str> = layout.sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta"]);
    for (section, task) in layout.sections.iter().zip(&layout.tasks) {
        assert!(section.rect.contains_rect(&task.bar, 1e-9));
    }
    assert_eq!(layout.sections[1].style_index, 1);
}

#[test]
fn gantt_axis_ticks_span_the_range() {
    let layout = gantt(TWO_SECTIONS);
    // Two-day steps keep twenty days within ten intervals.
    assert_eq!(layout.ticks.len(), 11);
    assert_eq!(layout.ticks[0].label, "2024-01-01");
    assert_eq!(layout.ticks[1].label, "2024-01-03");
    assert!(close(layout.ticks[0].x, 75.0));
    assert!(close(layout.ticks[10].x, 1125.0));
    assert!(layout.bounds.max_y > layout.tasks[1].bar.max_y());
}

#[test]
fn gantt_axis_format_drives_tick_labels() {
    let layout = gantt("gantt\ndateFormat YYYY-MM-DD\naxisFormat %m/%d\nA :2024-03-01, 3d");
    assert_eq!(layout.ticks[0].label, "03/01");
}

#[test]
fn gantt_milestones_have_no_width_and_an_outside_label() {
    let layout = gantt(
        "gantt\ndateFormat YYYY-MM-DD\nWork :w1, 2024-02-01, 4d\nShip :milestone, m1, 2024-02-05, 0d",
    );
    let ship = &layout.tasks[1];
    assert!(ship.tags.milestone);
    assert!(close(ship.bar.width, 0.0));
    assert!(!ship.label_inside);
    assert!(ship.label.x > ship.bar.max_x());
    assert!(layout.bounds.max_x >= ship.label.max_x());
}

#[test]
fn gantt_width_comes_from_config() {
    let layout = gantt(
        "%%{init: {\"gantt\": {\"width\": 600, \"leftPadding\": 50, \"rightPadding\": 50}}}%%\n\
         gantt\ndateFormat YYYY-MM-DD\nA :a, 2024-01-01, 2d",
    );
    assert!(close(layout.tasks[0].bar.x, 50.0));
    assert!(close(layout.tasks[0].bar.max_x(), 550.0));
}

#[test]
fn gantt_without_tasks_has_no_axis() {
    let layout = gantt("gantt\ntitle Empty");
    assert!(layout.tasks.is_empty());
    assert!(layout.ticks.is_empty());
    assert_eq!(layout.start, None);
}
