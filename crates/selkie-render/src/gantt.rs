use crate::model::{Bounds, GanttLayout, GanttSectionLayout, GanttTaskLayout, GanttTickLayout};
use crate::{cfg_f64, font_size};
use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDateTime, TimeDelta};
use selkie_core::Config;
use selkie_core::diagrams::gantt::GanttModel;
use selkie_graph::Rect;
use selkie_layout::position::measure;
use selkie_layout::{TextMeasurer, TextStyle};
use std::fmt::Write as _;

const DEFAULT_AXIS_FORMAT: &str = "%Y-%m-%d";
const MAX_TICKS: i64 = 10;
const LABEL_PAD: f64 = 5.0;

const HOUR: i64 = 3_600;
const DAY: i64 = 24 * HOUR;
const TICK_STEPS: [i64; 10] = [
    HOUR,
    6 * HOUR,
    12 * HOUR,
    DAY,
    2 * DAY,
    7 * DAY,
    14 * DAY,
    30 * DAY,
    91 * DAY,
    365 * DAY,
];

/// Linear map from time to x over `[left, right]`.
#[derive(Debug, Clone, Copy)]
struct TimeScale {
    start: NaiveDateTime,
    span_ms: i64,
    left: f64,
    right: f64,
}

impl TimeScale {
    fn x(&self, t: NaiveDateTime) -> f64 {
        if self.span_ms <= 0 {
            return self.left;
        }
        let ms = (t - self.start).num_milliseconds() as f64;
        self.left + ms / self.span_ms as f64 * (self.right - self.left)
    }
}

/// Bars are placed one per row in declaration order; the time axis runs from the earliest
/// start to the latest end over the plot area between the left and right paddings.
pub fn layout_gantt_diagram(
    model: &GanttModel,
    cfg: &Config,
    measurer: &dyn TextMeasurer,
) -> GanttLayout {
    let bar_height = cfg_f64(cfg, "gantt.barHeight", 20.0);
    let bar_gap = cfg_f64(cfg, "gantt.barGap", 4.0);
    let top = cfg_f64(cfg, "gantt.topPadding", 50.0);
    let left_padding = cfg_f64(cfg, "gantt.leftPadding", 75.0);
    let right_padding = cfg_f64(cfg, "gantt.rightPadding", 75.0);
    let grid_padding = cfg_f64(cfg, "gantt.gridLineStartPadding", 35.0);
    let width = cfg_f64(cfg, "gantt.width", 1200.0).max(left_padding + right_padding);
    let section_styles = cfg.get_usize("gantt.numberSectionStyles").unwrap_or(4).max(1);
    let style = TextStyle::sized(font_size(cfg));

    let range = model.time_range();
    let scale = range.map(|(start, end)| TimeScale {
        start,
        span_ms: (end - start).num_milliseconds(),
        left: left_padding,
        right: width - right_padding,
    });
    let step = bar_height + bar_gap;

    let mut tasks = Vec::with_capacity(model.tasks.len());
    for (row, task) in model.tasks.iter().enumerate() {
        let y = top + row as f64 * step + bar_gap / 2.0;
        let (x1, x2) = scale.map_or((left_padding, left_padding), |s| {
            (s.x(task.start), s.x(task.end))
        });
        let bar_w = if task.tags.milestone {
            0.0
        } else {
            (x2 - x1).max(0.0)
        };
        let bar = Rect::new(x1, y, bar_w, bar_height);

        let (lw, lh) = measure(measurer, &task.name, &style);
        let label_inside = lw + 2.0 * LABEL_PAD <= bar_w;
        let label_x = if label_inside {
            x1 + (bar_w - lw) / 2.0
        } else {
            bar.max_x() + LABEL_PAD
        };
        tasks.push(GanttTaskLayout {
            id: task.id.clone(),
            name: task.name.clone(),
            section: task.section.clone(),
            tags: task.tags,
            bar,
            label: Rect::new(label_x, y + (bar_height - lh) / 2.0, lw, lh),
            label_inside,
        });
    }

    let mut sections = Vec::with_capacity(model.sections.len());
    for (i, name) in model.sections.iter().enumerate() {
        let mut rows = model
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.section.as_deref() == Some(name.as_str()))
            .map(|(row, _)| row);
        let Some(first) = rows.next() else {
            continue;
        };
        let last = rows.last().unwrap_or(first);
        sections.push(GanttSectionLayout {
            name: name.clone(),
            style_index: i % section_styles,
            rect: Rect::new(
                0.0,
                top + first as f64 * step,
                width,
                (last - first + 1) as f64 * step,
            ),
        });
    }

    let axis_y = top + model.tasks.len() as f64 * step + grid_padding;
    let axis_format = model.axis_format.as_deref().unwrap_or(DEFAULT_AXIS_FORMAT);
    let ticks = match (range, scale) {
        (Some((start, end)), Some(scale)) => ticks(start, end, axis_format)
            .into_iter()
            .map(|(t, label)| GanttTickLayout {
                x: scale.x(t),
                label,
            })
            .collect(),
        _ => Vec::new(),
    };
    let (_, tick_h) = measure(measurer, "0", &style);
    let label_right = tasks
        .iter()
        .map(|t| t.label.max_x() + LABEL_PAD)
        .fold(width, f64::max);

    tracing::trace!(tasks = tasks.len(), ticks = ticks.len(), "gantt layout");
    GanttLayout {
        start: range.map(|r| r.0),
        end: range.map(|r| r.1),
        sections,
        tasks,
        ticks,
        bounds: Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: label_right,
            max_y: axis_y + tick_h + bar_gap,
        },
    }
}

/// Evenly spaced ticks from `start`, using the smallest step that yields at most
/// [`MAX_TICKS`] intervals.
fn ticks(
    start: NaiveDateTime,
    end: NaiveDateTime,
    axis_format: &str,
) -> Vec<(NaiveDateTime, String)> {
    let span = (end - start).num_seconds().max(0);
    let step = TICK_STEPS
        .iter()
        .copied()
        .find(|s| span / s <= MAX_TICKS)
        .unwrap_or_else(|| {
            let years = span / (365 * DAY * MAX_TICKS) + 1;
            years * 365 * DAY
        });

    let items = format_items(axis_format);
    let mut out = Vec::new();
    for k in 0..=MAX_TICKS {
        let Some(t) = TimeDelta::try_seconds(k * step).and_then(|d| start.checked_add_signed(d))
        else {
            break;
        };
        if t > end {
            break;
        }
        out.push((t, format_tick(t, &items)));
    }
    out
}

/// Formats that need a time zone fail on naive times; those ticks get the default format.
fn format_tick(t: NaiveDateTime, items: &[Item<'_>]) -> String {
    let mut label = String::new();
    if write!(label, "{}", t.format_with_items(items.iter())).is_err() {
        label = t.format(DEFAULT_AXIS_FORMAT).to_string();
    }
    label
}

/// Parsed axis format; an invalid format string falls back to ISO dates.
fn format_items(axis_format: &str) -> Vec<Item<'_>> {
    let items: Vec<Item<'_>> = StrftimeItems::new(axis_format).collect();
    if items.iter().any(|i| matches!(i, Item::Error)) {
        tracing::debug!(axis_format, "invalid axis format; using the default");
        return StrftimeItems::new(DEFAULT_AXIS_FORMAT).collect();
    }
    items
}
