use crate::model::{
    Bounds, TimelineEventLayout, TimelineLayout, TimelinePeriodLayout, TimelineSectionLayout,
};
use crate::{cfg_f64, font_size};
use selkie_core::Config;
use selkie_core::diagrams::timeline::TimelineModel;
use selkie_graph::{Point, Rect};
use selkie_layout::position::measure;
use selkie_layout::{TextMeasurer, TextStyle};

/// Gap between the period row and the axis line, and between the axis and the first event.
const AXIS_GAP: f64 = 20.0;

/// Periods run left to right in declaration order with their events stacked underneath. When
/// sections are declared, a header row spans each section's periods and consecutive sections are
/// separated by `timeline.sectionSpacing`.
pub fn layout_timeline_diagram(
    model: &TimelineModel,
    cfg: &Config,
    measurer: &dyn TextMeasurer,
) -> TimelineLayout {
    let period_width = cfg_f64(cfg, "timeline.periodWidth", 150.0);
    let event_height = cfg_f64(cfg, "timeline.eventHeight", 40.0);
    let section_spacing = cfg_f64(cfg, "timeline.sectionSpacing", 20.0);
    let padding = cfg_f64(cfg, "timeline.padding", 10.0);
    let style = TextStyle::sized(font_size(cfg));
    let bold = style.bold();

    let mut top = padding;
    if let Some(title) = model.common.title.as_deref() {
        top += measure(measurer, title, &bold).1 + padding;
    }

    let has_sections = model.periods.iter().any(|p| p.section.is_some());
    let section_h = if has_sections {
        model
            .sections
            .iter()
            .map(|s| measure(measurer, s, &bold).1)
            .fold(0.0, f64::max)
            + 2.0 * padding
    } else {
        0.0
    };
    let period_top = top + if has_sections { section_h + padding } else { 0.0 };

    // Widths first: a period is as wide as its label or its widest event.
    let widths: Vec<f64> = model
        .periods
        .iter()
        .map(|p| {
            std::iter::once(p.label.as_str())
                .chain(p.events.iter().map(String::as_str))
                .map(|t| measure(measurer, t, &style).0 + 2.0 * padding)
                .fold(period_width, f64::max)
        })
        .collect();
    let period_h = model
        .periods
        .iter()
        .map(|p| measure(measurer, &p.label, &bold).1 + 2.0 * padding)
        .fold(event_height, f64::max);
    let axis_y = period_top + period_h + AXIS_GAP;

    let mut periods = Vec::with_capacity(model.periods.len());
    let mut x = padding;
    for (i, (period, &w)) in model.periods.iter().zip(&widths).enumerate() {
        if i > 0 {
            let prev = &model.periods[i - 1];
            x += padding;
            if has_sections && prev.section != period.section {
                x += section_spacing;
            }
        }
        let mut y = axis_y + AXIS_GAP;
        let mut events = Vec::with_capacity(period.events.len());
        for text in &period.events {
            let h = (measure(measurer, text, &style).1 + 2.0 * padding).max(event_height);
            events.push(TimelineEventLayout {
                text: text.clone(),
                rect: Rect::new(x, y, w, h),
            });
            y += h + padding;
        }
        periods.push(TimelinePeriodLayout {
            label: period.label.clone(),
            section: period.section.clone(),
            rect: Rect::new(x, period_top, w, period_h),
            events,
        });
        x += w;
    }

    let mut sections: Vec<TimelineSectionLayout> = Vec::new();
    for period in &periods {
        let Some(name) = period.section.as_deref() else {
            continue;
        };
        match sections.last_mut() {
            Some(last) if last.label == name => {
                last.rect.width = period.rect.max_x() - last.rect.x;
            }
            _ => sections.push(TimelineSectionLayout {
                label: name.to_string(),
                rect: Rect::new(period.rect.x, top, period.rect.width, section_h),
            }),
        }
    }

    let axis_end_x = periods.last().map_or(padding, |p| p.rect.max_x());
    let rects: Vec<Rect> = sections
        .iter()
        .map(|s| s.rect)
        .chain(periods.iter().map(|p| p.rect))
        .chain(periods.iter().flat_map(|p| p.events.iter().map(|e| e.rect)))
        .chain(std::iter::once(Rect::new(padding, axis_y, axis_end_x - padding, 0.0)))
        .collect();
    let bounds = Bounds::from_rects(&rects).map_or_else(Bounds::default, |b| Bounds {
        min_x: 0.0,
        min_y: 0.0,
        max_x: b.max_x + padding,
        max_y: b.max_y + padding,
    });

    tracing::trace!(
        periods = periods.len(),
        events = model.event_count(),
        "timeline layout"
    );
    TimelineLayout {
        sections,
        periods,
        axis_start: Point::new(padding, axis_y),
        axis_end: Point::new(axis_end_x, axis_y),
        bounds,
    }
}
