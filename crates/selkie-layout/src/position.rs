//! Phase 3: sizes and coordinates.
//!
//! Every slot gets a box in the top-to-bottom frame: ranks stack as horizontal bands, slots
//! within a rank share one width (the widest box in the rank plus `node_sep`) and each rank is
//! centered on the widest one. Final node boxes are written in the diagram's own direction.

use crate::LayoutOptions;
use crate::coordinate_system;
use crate::order::{Layering, SlotKind};
use crate::text::{TextMeasurer, TextStyle};
use selkie_graph::{Direction, Graph, Node, NodeShape, Point, Rect};
use tracing::trace;

/// Space kept above and below an edge label placed between two ranks.
const LABEL_CLEARANCE: f64 = 10.0;

const STATE_MARKER_SIZE: f64 = 14.0;
const CHOICE_SIZE: f64 = 28.0;
const BAR_LENGTH: f64 = 70.0;
const BAR_THICKNESS: f64 = 10.0;
const CYLINDER_LIDS: f64 = 20.0;
const SUBROUTINE_RAILS: f64 = 16.0;
const DOUBLE_RING_GAP: f64 = 10.0;

/// Frame geometry shared with routing.
#[derive(Debug, Clone)]
pub struct Frame {
    pub direction: Direction,
    /// Per slot, in frame coordinates.
    pub centers: Vec<Point>,
    /// Per slot, in frame orientation.
    pub sizes: Vec<(f64, f64)>,
    pub band_top: Vec<f64>,
    pub band_height: Vec<f64>,
    /// Per edge, in the diagram's own orientation.
    pub label_sizes: Vec<Option<(f64, f64)>>,
}

impl Frame {
    pub fn to_diagram(&self, p: Point) -> Point {
        coordinate_system::undo(self.direction, p)
    }

    pub fn band_middle(&self, rank: usize) -> f64 {
        self.band_top[rank] + self.band_height[rank] / 2.0
    }
}

/// Measures `text`, treating non-finite or negative answers as zero.
pub fn measure(measurer: &dyn TextMeasurer, text: &str, style: &TextStyle) -> (f64, f64) {
    let m = measurer.measure(text, style);
    (sanitize(m.width), sanitize(m.height))
}

fn sanitize(v: f64) -> f64 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}

/// Box size of `node` in the diagram's own orientation: the measured label plus the shape's
/// padding. Class and entity boxes stack their compartments below a bold title.
pub fn node_size(
    node: &Node,
    direction: Direction,
    measurer: &dyn TextMeasurer,
    options: &LayoutOptions,
) -> (f64, f64) {
    let style = TextStyle::sized(options.font_size);
    let p = options.padding;

    match node.shape {
        NodeShape::StateStart | NodeShape::StateEnd => {
            return (STATE_MARKER_SIZE, STATE_MARKER_SIZE);
        }
        NodeShape::Choice => return (CHOICE_SIZE, CHOICE_SIZE),
        NodeShape::Fork | NodeShape::Join => {
            return if direction.is_horizontal() {
                (BAR_THICKNESS, BAR_LENGTH)
            } else {
                (BAR_LENGTH, BAR_THICKNESS)
            };
        }
        NodeShape::ClassBox | NodeShape::EntityBox => {
            return compartment_box_size(node, measurer, &style, p);
        }
        _ => {}
    }

    let (lw, lh) = measure(measurer, &node.label, &style);
    let h = lh + 2.0 * p;
    let w = lw + 2.0 * p;
    match node.shape {
        NodeShape::Stadium | NodeShape::Asymmetric | NodeShape::Hexagon => (w + h / 2.0, h),
        NodeShape::Subroutine => (w + SUBROUTINE_RAILS, h),
        NodeShape::Parallelogram
        | NodeShape::ParallelogramAlt
        | NodeShape::Trapezoid
        | NodeShape::TrapezoidAlt => (w + h, h),
        NodeShape::Cylinder => (w, h + CYLINDER_LIDS),
        NodeShape::Circle => {
            let d = lw.max(lh) + 2.0 * p;
            (d, d)
        }
        NodeShape::DoubleCircle => {
            let d = lw.max(lh) + 2.0 * p + DOUBLE_RING_GAP;
            (d, d)
        }
        NodeShape::Diamond => {
            let side = (lw + p) + (lh + p);
            (side, side)
        }
        _ => (w, h),
    }
}

fn compartment_box_size(
    node: &Node,
    measurer: &dyn TextMeasurer,
    style: &TextStyle,
    p: f64,
) -> (f64, f64) {
    let (mut width, title_h) = measure(measurer, &node.label, &style.bold());
    let mut height = 2.0 * p + title_h;
    for compartment in &node.compartments {
        let (cw, ch) = if compartment.is_empty() {
            (0.0, 0.0)
        } else {
            measure(measurer, &compartment.join("\n"), style)
        };
        width = width.max(cw);
        height += ch + p;
    }
    (width + 2.0 * p, height)
}

/// Sizes every node, computes the frame and writes node boxes.
pub fn position(
    graph: &mut Graph,
    layering: &Layering,
    measurer: &dyn TextMeasurer,
    options: &LayoutOptions,
) -> Frame {
    let direction = graph.direction();
    let style = TextStyle::sized(options.font_size);
    let rank_count = layering.ranks.len();

    let mut sizes = vec![(0.0, 0.0); layering.slots.len()];
    let mut node_sizes = Vec::with_capacity(graph.node_count());
    for node in graph.nodes() {
        node_sizes.push(node_size(node, direction, measurer, options));
    }
    for (slot, size) in layering.slots.iter().zip(sizes.iter_mut()) {
        if let SlotKind::Node(ix) = slot.kind {
            let (w, h) = node_sizes[ix];
            *size = coordinate_system::adjust(direction, w, h);
        }
    }

    let mut gaps = vec![options.rank_sep; rank_count.saturating_sub(1)];
    let mut label_sizes = Vec::with_capacity(graph.edge_count());
    for (edge, chain) in graph.edges().iter().zip(&layering.chains) {
        let Some(text) = edge.label.as_deref() else {
            label_sizes.push(None);
            continue;
        };
        let (lw, lh) = measure(measurer, text, &style);
        label_sizes.push(Some((lw, lh)));

        let (fw, fh) = coordinate_system::adjust(direction, lw, lh);
        let span = chain.len().saturating_sub(1);
        let (Some(&top), Some(&bottom)) = (chain.first(), chain.last()) else {
            continue;
        };
        if layering.slots[top].rank == layering.slots[bottom].rank {
            continue;
        }
        if span >= 2 && span % 2 == 0 {
            // The middle virtual slot carries the label.
            sizes[chain[span / 2]] = (fw, fh);
        } else {
            let gap = layering.slots[top].rank + span / 2;
            if let Some(g) = gaps.get_mut(gap) {
                *g = g.max(fh + 2.0 * LABEL_CLEARANCE);
            }
        }
    }

    let insets = subgraph_insets(graph, measurer, options, rank_count);
    for (r, g) in gaps.iter_mut().enumerate() {
        let needed = insets.bottom[r] + insets.top[r + 1];
        if needed > 0.0 {
            *g = g.max(needed + options.rank_sep / 2.0);
        }
    }

    let mut band_height = vec![0.0f64; rank_count];
    let mut max_width = vec![0.0f64; rank_count];
    for (slot, &(w, h)) in layering.slots.iter().zip(&sizes) {
        band_height[slot.rank] = band_height[slot.rank].max(h);
        max_width[slot.rank] = max_width[slot.rank].max(w);
    }
    let mut band_top = vec![0.0f64; rank_count];
    for r in 1..rank_count {
        band_top[r] = band_top[r - 1] + band_height[r - 1] + gaps[r - 1];
    }

    let slot_width: Vec<f64> = max_width.iter().map(|w| w + options.node_sep).collect();
    let rank_width: Vec<f64> = layering
        .ranks
        .iter()
        .zip(&slot_width)
        .map(|(rank, sw)| (rank.len() as f64 * sw - options.node_sep).max(0.0))
        .collect();
    let widest = rank_width.iter().copied().fold(0.0, f64::max);

    let mut centers = vec![Point::default(); layering.slots.len()];
    for (r, rank) in layering.ranks.iter().enumerate() {
        let offset = (widest - rank_width[r]) / 2.0;
        let y = band_top[r] + band_height[r] / 2.0;
        for (i, &s) in rank.iter().enumerate() {
            let x = offset + i as f64 * slot_width[r] + max_width[r] / 2.0;
            centers[s] = Point::new(x, y);
        }
    }

    let frame = Frame {
        direction,
        centers,
        sizes,
        band_top,
        band_height,
        label_sizes,
    };

    let nodes = graph.nodes_mut();
    for (slot_id, slot) in layering.slots.iter().enumerate() {
        let SlotKind::Node(ix) = slot.kind else {
            continue;
        };
        let (w, h) = node_sizes[ix];
        let c = frame.to_diagram(frame.centers[slot_id]);
        let node = &mut nodes[ix];
        node.width = w;
        node.height = h;
        node.x = c.x - w / 2.0;
        node.y = c.y - h / 2.0;
    }
    trace!(ranks = rank_count, width = widest, "positioned");
    frame
}

struct Insets {
    /// Space subgraph headers need above each rank.
    top: Vec<f64>,
    /// Space subgraph padding needs below each rank.
    bottom: Vec<f64>,
}

fn subgraph_insets(
    graph: &Graph,
    measurer: &dyn TextMeasurer,
    options: &LayoutOptions,
    rank_count: usize,
) -> Insets {
    let mut insets = Insets {
        top: vec![0.0; rank_count],
        bottom: vec![0.0; rank_count],
    };
    let subgraphs = graph.subgraphs();
    if subgraphs.is_empty() {
        return insets;
    }

    let mut spans: Vec<Option<(usize, usize)>> = vec![None; subgraphs.len()];
    for node in graph.nodes() {
        let Some(rank) = node.rank else {
            continue;
        };
        for ix in graph.subgraphs_of(&node.id) {
            let span = spans[ix].get_or_insert((rank, rank));
            span.0 = span.0.min(rank);
            span.1 = span.1.max(rank);
        }
    }

    let style = TextStyle::sized(options.font_size);
    let header = |ix: usize| {
        let title = &subgraphs[ix].title;
        if title.is_empty() || graph.direction().is_horizontal() {
            options.padding
        } else {
            options.padding + measure(measurer, title, &style).1
        }
    };

    for (ix, span) in spans.iter().enumerate() {
        let Some((first, last)) = *span else {
            continue;
        };
        // Headers of enclosing subgraphs that start on the same rank stack up.
        let mut top = 0.0;
        let mut bottom = 0.0;
        let mut cur = Some(ix);
        let mut guard = 0;
        while let Some(c) = cur {
            let Some((f, l)) = spans[c] else { break };
            if f == first {
                top += header(c);
            }
            if l == last {
                bottom += options.padding;
            }
            cur = subgraphs[c].parent;
            guard += 1;
            if guard > subgraphs.len() {
                break;
            }
        }
        if let Some(t) = insets.top.get_mut(first) {
            *t = t.max(top);
        }
        if let Some(b) = insets.bottom.get_mut(last) {
            *b = b.max(bottom);
        }
    }
    insets
}

/// Computes subgraph boxes bottom-up in diagram coordinates.
///
/// A box wraps its member nodes and nested subgraph boxes with `padding` on every side plus a
/// title strip on top. Subgraphs with nothing inside are lined up below the drawing.
pub fn place_subgraphs(graph: &mut Graph, measurer: &dyn TextMeasurer, options: &LayoutOptions) {
    if graph.subgraphs().is_empty() {
        return;
    }
    let style = TextStyle::sized(options.font_size);
    let p = options.padding;

    let mut order: Vec<usize> = (0..graph.subgraphs().len()).collect();
    order.sort_by_key(|&ix| std::cmp::Reverse(graph.subgraph_depth(ix)));

    let drawing = drawing_bounds(graph);
    let mut empty_cursor = drawing.map_or(Point::default(), |b| {
        Point::new(b.x, b.max_y() + options.rank_sep)
    });

    let mut boxes: Vec<Option<Rect>> = vec![None; graph.subgraphs().len()];
    for ix in order {
        let sg = &graph.subgraphs()[ix];
        let (title_w, title_h) = if sg.title.is_empty() {
            (0.0, 0.0)
        } else {
            measure(measurer, &sg.title, &style)
        };

        let members = sg
            .members
            .iter()
            .filter_map(|m| graph.node(m))
            .map(Node::bounds);
        let children = graph.child_subgraphs(ix).filter_map(|c| boxes[c]);
        let content = members.chain(children).reduce(|a, b| a.union(&b));

        let mut rect = match content {
            Some(c) => Rect::new(
                c.x - p,
                c.y - p - title_h,
                c.width + 2.0 * p,
                c.height + 2.0 * p + title_h,
            ),
            None => {
                let r = Rect::new(
                    empty_cursor.x,
                    empty_cursor.y,
                    title_w + 2.0 * p,
                    title_h + 2.0 * p,
                );
                empty_cursor.x += r.width + options.node_sep;
                r
            }
        };
        let min_width = title_w + 2.0 * p;
        if rect.width < min_width {
            rect.x -= (min_width - rect.width) / 2.0;
            rect.width = min_width;
        }
        boxes[ix] = Some(rect);
    }

    for (sg, rect) in graph.subgraphs_mut().iter_mut().zip(boxes) {
        let Some(rect) = rect else { continue };
        sg.x = rect.x;
        sg.y = rect.y;
        sg.width = rect.width;
        sg.height = rect.height;
    }
}

/// Union of all node boxes, edge waypoints and edge label boxes.
pub fn drawing_bounds(graph: &Graph) -> Option<Rect> {
    let nodes = graph.nodes().iter().map(Node::bounds);
    let points = graph
        .edges()
        .iter()
        .flat_map(|e| e.waypoints.iter())
        .map(|p| Rect::new(p.x, p.y, 0.0, 0.0));
    let labels = graph.edges().iter().filter_map(|e| e.label_box);
    nodes.chain(points).chain(labels).reduce(|a, b| a.union(&b))
}
