use crate::model::{Bounds, GraphLayout};
use crate::{Result, cfg_f64, font_size};
use selkie_core::{Config, Limits};
use selkie_graph::Graph;
use selkie_layout::{DEFAULT_ORDER_PASSES, LayoutOptions, MAX_ORDER_PASSES, TextMeasurer};

/// Engine options for a graph dialect, read from its config section (`flowchart`, `class`,
/// `state` or `er`).
pub fn graph_layout_options(section: &str, cfg: &Config, limits: &Limits) -> LayoutOptions {
    let d = LayoutOptions::default();
    let key = |name: &str| format!("{section}.{name}");
    LayoutOptions {
        node_sep: cfg_f64(cfg, &key("nodeSpacing"), d.node_sep),
        rank_sep: cfg_f64(cfg, &key("rankSpacing"), d.rank_sep),
        padding: cfg_f64(cfg, &key("padding"), d.padding),
        margin: cfg_f64(cfg, &key("diagramPadding"), d.margin),
        font_size: font_size(cfg),
        order_passes: cfg
            .get_usize(&key("orderPasses"))
            .unwrap_or(DEFAULT_ORDER_PASSES)
            .min(MAX_ORDER_PASSES),
        max_layout_items: limits.max_layout_items,
    }
}

/// Runs the layered engine on `graph` in place.
pub fn layout_graph(
    graph: &mut Graph,
    section: &str,
    cfg: &Config,
    limits: &Limits,
    measurer: &dyn TextMeasurer,
) -> Result<GraphLayout> {
    let options = graph_layout_options(section, cfg, limits);
    let extent = selkie_layout::layout(graph, measurer, &options)?;
    Ok(GraphLayout {
        direction: graph.direction(),
        bounds: Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: extent.width,
            max_y: extent.height,
        },
    })
}
