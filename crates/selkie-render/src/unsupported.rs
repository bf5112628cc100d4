use crate::font_size;
use crate::model::{Bounds, UnsupportedLayout};
use selkie_core::Config;
use selkie_graph::Rect;
use selkie_layout::position::measure;
use selkie_layout::{TextMeasurer, TextStyle};

const PADDING: f64 = 15.0;
const MARGIN: f64 = 8.0;
const MIN_WIDTH: f64 = 80.0;

/// A single box around the unrecognized keyword, so hosts still have something to draw.
pub fn layout_unsupported_diagram(
    raw_keyword: &str,
    cfg: &Config,
    measurer: &dyn TextMeasurer,
) -> UnsupportedLayout {
    let style = TextStyle::sized(font_size(cfg));
    let (w, h) = measure(measurer, raw_keyword, &style);
    let (_, line_h) = measure(measurer, "M", &style);
    let rect = Rect::new(
        MARGIN,
        MARGIN,
        (w + 2.0 * PADDING).max(MIN_WIDTH),
        h.max(line_h) + 2.0 * PADDING,
    );
    let message = if raw_keyword.is_empty() {
        "no diagram found".to_string()
    } else {
        format!("unsupported diagram type: {raw_keyword}")
    };
    tracing::debug!(raw_keyword, "laying out placeholder for unsupported diagram");
    UnsupportedLayout {
        raw_keyword: raw_keyword.to_string(),
        message,
        rect,
        bounds: Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: rect.max_x() + MARGIN,
            max_y: rect.max_y() + MARGIN,
        },
    }
}
