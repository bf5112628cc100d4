//! Phase 4: edge routing.
//!
//! Paths are built in the top-to-bottom frame from the endpoint boxes and the virtual slots of
//! long edges, then mapped into the diagram's direction.

use crate::LayoutOptions;
use crate::order::Layering;
use crate::position::Frame;
use selkie_graph::{Graph, Point, Rect};
use tracing::trace;

/// Furthest a self-loop reaches out from the side of its node.
const SELF_LOOP_REACH: f64 = 20.0;

/// Writes `Edge::waypoints` and `Edge::label_box` for every edge.
pub fn route(graph: &mut Graph, layering: &Layering, frame: &Frame, options: &LayoutOptions) {
    let sources: Vec<Option<usize>> = graph
        .edges()
        .iter()
        .map(|e| graph.node_index(&e.from))
        .collect();

    let mut routed = 0usize;
    for (ix, edge) in graph.edges_mut().iter_mut().enumerate() {
        let chain = &layering.chains[ix];
        let (Some(&top), Some(&bottom), Some(source)) = (chain.first(), chain.last(), sources[ix])
        else {
            continue;
        };

        let mut path = if top == bottom {
            self_loop(frame, top, options)
        } else if layering.slots[top].rank == layering.slots[bottom].rank {
            side_by_side(frame, top, bottom)
        } else {
            through_ranks(frame, layering, chain)
        };
        if source != top {
            path.reverse();
        }

        edge.waypoints = path.into_iter().map(|p| frame.to_diagram(p)).collect();
        edge.label_box = frame.label_sizes[ix].map(|(w, h)| {
            let mid = polyline_midpoint(&edge.waypoints);
            Rect::new(mid.x - w / 2.0, mid.y - h / 2.0, w, h)
        });
        routed += 1;
    }
    trace!(edges = routed, "routed");
}

/// Facing midpoints of the endpoint boxes plus one point per crossed rank.
fn through_ranks(frame: &Frame, layering: &Layering, chain: &[usize]) -> Vec<Point> {
    let mut path = Vec::with_capacity(chain.len());
    let last = chain.len() - 1;
    for (i, &s) in chain.iter().enumerate() {
        let c = frame.centers[s];
        let (_, h) = frame.sizes[s];
        let p = if i == 0 {
            Point::new(c.x, c.y + h / 2.0)
        } else if i == last {
            Point::new(c.x, c.y - h / 2.0)
        } else {
            Point::new(c.x, frame.band_middle(layering.slots[s].rank))
        };
        path.push(p);
    }
    path
}

fn side_by_side(frame: &Frame, a: usize, b: usize) -> Vec<Point> {
    let (ca, cb) = (frame.centers[a], frame.centers[b]);
    let (wa, wb) = (frame.sizes[a].0, frame.sizes[b].0);
    if ca.x <= cb.x {
        vec![
            Point::new(ca.x + wa / 2.0, ca.y),
            Point::new(cb.x - wb / 2.0, cb.y),
        ]
    } else {
        vec![
            Point::new(ca.x - wa / 2.0, ca.y),
            Point::new(cb.x + wb / 2.0, cb.y),
        ]
    }
}

/// Two-segment detour leaving and re-entering the node's outer side.
fn self_loop(frame: &Frame, s: usize, options: &LayoutOptions) -> Vec<Point> {
    let c = frame.centers[s];
    let (w, h) = frame.sizes[s];
    let side = c.x + w / 2.0;
    let reach = SELF_LOOP_REACH.min(options.node_sep / 2.0).max(1.0);
    vec![
        Point::new(side, c.y - h / 4.0),
        Point::new(side + reach, c.y),
        Point::new(side, c.y + h / 4.0),
    ]
}

/// Point halfway along the polyline by length.
pub fn polyline_midpoint(points: &[Point]) -> Point {
    let Some(&first) = points.first() else {
        return Point::default();
    };
    let length = |a: Point, b: Point| (b.x - a.x).hypot(b.y - a.y);
    let total: f64 = points.windows(2).map(|w| length(w[0], w[1])).sum();
    let mut remaining = total / 2.0;
    for w in points.windows(2) {
        let seg = length(w[0], w[1]);
        if seg > 0.0 && remaining <= seg {
            let t = remaining / seg;
            return Point::new(
                w[0].x + (w[1].x - w[0].x) * t,
                w[0].y + (w[1].y - w[0].y) * t,
            );
        }
        remaining -= seg;
    }
    first
}
