#![forbid(unsafe_code)]

//! Layered graph layout for selkie's graph-shaped diagrams.
//!
//! [`layout`] runs four phases over a [`selkie_graph::Graph`], strictly in order:
//! [`rank`] (cycle breaking and longest-path layering), [`order`] (virtual slots and barycenter
//! sweeps), [`position`] (sizes, bands and slots) and [`route`] (waypoints and label boxes).
//! The graph is borrowed exclusively for the whole pass and carries the geometry afterwards.

pub mod coordinate_system;
pub mod order;
pub mod position;
pub mod rank;
pub mod route;
pub mod text;

pub use text::{DeterministicTextMeasurer, TextMeasurer, TextMetrics, TextStyle};

use selkie_graph::{Graph, Point};
use serde::{Deserialize, Serialize};
use std::collections::TryReserveError;
use tracing::{debug, debug_span};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_MAX_LAYOUT_ITEMS: usize = 20_000;
pub const DEFAULT_ORDER_PASSES: usize = 4;
/// Upper bound on barycenter sweeps, whatever the options ask for.
pub const MAX_ORDER_PASSES: usize = 32;
/// Upper bound on spacing, padding and margin values, in pixels.
pub const MAX_SPACING: f64 = 10_000.0;
pub const MAX_FONT_SIZE: f64 = 1_000.0;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("layout needs {count} slots, which exceeds the limit of {limit}")]
    TooManyLayoutItems { count: usize, limit: usize },

    #[error("allocation failed: {0}")]
    Allocation(#[from] TryReserveError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOptions {
    /// Horizontal gap between neighboring slots of a rank.
    pub node_sep: f64,
    /// Minimum gap between two rank bands.
    pub rank_sep: f64,
    /// Padding around node labels and inside subgraph boxes.
    pub padding: f64,
    /// Outer margin around the whole drawing.
    pub margin: f64,
    pub font_size: f64,
    /// Number of barycenter sweeps during ordering.
    pub order_passes: usize,
    /// Cap on nodes plus virtual slots.
    pub max_layout_items: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            node_sep: 50.0,
            rank_sep: 50.0,
            padding: 15.0,
            margin: 8.0,
            font_size: 16.0,
            order_passes: DEFAULT_ORDER_PASSES,
            max_layout_items: DEFAULT_MAX_LAYOUT_ITEMS,
        }
    }
}

impl LayoutOptions {
    /// Options with every value pulled into a range that keeps geometry finite and ordering
    /// bounded. Non-finite or negative lengths fall back to the defaults.
    pub fn clamped(&self) -> Self {
        let d = Self::default();
        let length = |v: f64, default: f64| {
            if v.is_finite() && v >= 0.0 {
                v.min(MAX_SPACING)
            } else {
                default
            }
        };
        Self {
            node_sep: length(self.node_sep, d.node_sep),
            rank_sep: length(self.rank_sep, d.rank_sep),
            padding: length(self.padding, d.padding),
            margin: length(self.margin, d.margin),
            font_size: if self.font_size.is_finite() && self.font_size > 0.0 {
                self.font_size.min(MAX_FONT_SIZE)
            } else {
                d.font_size
            },
            order_passes: self.order_passes.min(MAX_ORDER_PASSES),
            max_layout_items: self.max_layout_items,
        }
    }
}

/// Size of the laid-out drawing, margin included.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

/// Lays out `graph` in place and returns the drawing's extent.
///
/// Afterwards every node has a rank, an order and a box, every edge has at least two waypoints
/// and subgraph boxes enclose their members. All coordinates are non-negative.
pub fn layout(
    graph: &mut Graph,
    measurer: &dyn TextMeasurer,
    options: &LayoutOptions,
) -> Result<Extent> {
    let _span = debug_span!(
        "layout",
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        direction = ?graph.direction()
    )
    .entered();
    let options = &options.clamped();

    rank::rank(graph);
    let mut layering = order::Layering::build(graph, options.max_layout_items)?;
    let crossings = order::order(&mut layering, options.order_passes);
    layering.assign_order(graph);
    debug!(
        ranks = layering.ranks.len(),
        virtual_slots = layering.virtual_count(),
        crossings,
        "ordered"
    );

    let frame = position::position(graph, &layering, measurer, options);
    route::route(graph, &layering, &frame, options);
    position::place_subgraphs(graph, measurer, options);
    Ok(normalize(graph, options.margin))
}

/// Translates the drawing so its top-left corner sits at `(margin, margin)`.
fn normalize(graph: &mut Graph, margin: f64) -> Extent {
    let subgraph_boxes = graph.subgraphs().iter().map(|sg| sg.bounds());
    let Some(bounds) = position::drawing_bounds(graph)
        .into_iter()
        .chain(subgraph_boxes)
        .reduce(|a, b| a.union(&b))
    else {
        return Extent {
            width: 2.0 * margin,
            height: 2.0 * margin,
        };
    };

    let dx = margin - bounds.x;
    let dy = margin - bounds.y;
    let shift = |p: &mut Point| {
        p.x += dx;
        p.y += dy;
    };
    for node in graph.nodes_mut() {
        node.x += dx;
        node.y += dy;
    }
    for edge in graph.edges_mut() {
        edge.waypoints.iter_mut().for_each(shift);
        if let Some(label) = edge.label_box.as_mut() {
            label.x += dx;
            label.y += dy;
        }
    }
    for sg in graph.subgraphs_mut() {
        sg.x += dx;
        sg.y += dy;
    }

    Extent {
        width: bounds.width + 2.0 * margin,
        height: bounds.height + 2.0 * margin,
    }
}
