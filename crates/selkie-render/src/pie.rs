use crate::model::{Bounds, PieLayout, PieLegendItemLayout, PieSliceLayout};
use crate::{cfg_f64, font_size};
use selkie_core::Config;
use selkie_core::diagrams::pie::PieModel;
use selkie_graph::{Point, Rect};
use selkie_layout::position::measure;
use selkie_layout::{TextMeasurer, TextStyle};

const MARGIN: f64 = 40.0;
const LEGEND_GAP: f64 = 30.0;
const SWATCH: f64 = 18.0;
const SWATCH_GAP: f64 = 4.0;

/// Point at `radius` and `angle` (degrees) around the origin; 12 o'clock is zero and angles grow
/// clockwise with y pointing down.
pub fn polar_xy(radius: f64, angle: f64) -> (f64, f64) {
    let a = angle.to_radians();
    (radius * a.sin(), -radius * a.cos())
}

fn fmt_number(v: f64) -> String {
    if !v.is_finite() || v.abs() < 0.0005 {
        return "0".to_string();
    }
    let r = (v * 1000.0).round() / 1000.0;
    let mut s = format!("{r:.3}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

/// Slices sweep `value / total * 360` degrees each, in declaration order, starting at 12
/// o'clock. A zero total gives every slice a zero sweep.
pub fn layout_pie_diagram(
    model: &PieModel,
    cfg: &Config,
    measurer: &dyn TextMeasurer,
) -> PieLayout {
    let radius = cfg_f64(cfg, "pie.radius", 185.0);
    let text_position = cfg_f64(cfg, "pie.textPosition", 0.75);
    let legend_spacing = cfg_f64(cfg, "pie.legendSpacing", 22.0);
    let style = TextStyle::sized(font_size(cfg));

    let title_h = model
        .common
        .title
        .as_deref()
        .map_or(0.0, |t| measure(measurer, t, &style.bold()).1 + MARGIN / 2.0);
    let center = Point::new(MARGIN + radius, title_h + MARGIN + radius);

    let total = model.total();
    let fraction = |value: f64| {
        if total > 0.0 && total.is_finite() {
            (value / total).clamp(0.0, 1.0)
        } else {
            0.0
        }
    };

    let mut slices = Vec::with_capacity(model.slices.len());
    let mut start = 0.0;
    for slice in &model.slices {
        let frac = fraction(slice.value);
        let sweep = frac * 360.0;
        let (dx, dy) = polar_xy(radius * text_position, start + sweep / 2.0);
        slices.push(PieSliceLayout {
            label: slice.label.clone(),
            value: slice.value,
            percent: frac * 100.0,
            start_angle: start,
            sweep_angle: sweep,
            label_position: Point::new(center.x + dx, center.y + dy),
        });
        start += sweep;
    }

    let legend_x = center.x + radius + LEGEND_GAP;
    let row_h = legend_spacing.max(SWATCH);
    let legend_top = center.y - row_h * model.slices.len() as f64 / 2.0;
    let mut legend = Vec::with_capacity(model.slices.len());
    for (i, slice) in model.slices.iter().enumerate() {
        let text = if model.show_data {
            format!("{} [{}]", slice.label, fmt_number(slice.value))
        } else {
            slice.label.clone()
        };
        let (w, h) = measure(measurer, &text, &style);
        let row_y = legend_top + i as f64 * row_h;
        legend.push(PieLegendItemLayout {
            text,
            swatch: Rect::new(legend_x, row_y + (row_h - SWATCH) / 2.0, SWATCH, SWATCH),
            label: Rect::new(
                legend_x + SWATCH + SWATCH_GAP,
                row_y + (row_h - h) / 2.0,
                w,
                h,
            ),
        });
    }

    let circle = Rect::new(center.x - radius, center.y - radius, 2.0 * radius, 2.0 * radius);
    let bounds = Bounds::from_rects(
        std::iter::once(&circle).chain(legend.iter().flat_map(|l| [&l.swatch, &l.label])),
    )
    .map_or_else(Bounds::default, |b| Bounds {
        min_x: 0.0,
        min_y: 0.0,
        max_x: b.max_x + MARGIN,
        max_y: b.max_y + MARGIN,
    });

    tracing::trace!(slices = slices.len(), total, "pie layout");
    PieLayout {
        center,
        radius,
        total,
        slices,
        legend,
        bounds,
    }
}
