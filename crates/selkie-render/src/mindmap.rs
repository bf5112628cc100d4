use crate::model::{Bounds, MindmapEdgeLayout, MindmapLayout, MindmapNodeLayout};
use crate::{cfg_f64, font_size};
use selkie_core::Config;
use selkie_core::diagrams::mindmap::{MindmapModel, MindmapShape};
use selkie_graph::{Point, Rect};
use selkie_layout::position::measure;
use selkie_layout::{TextMeasurer, TextStyle};

fn node_size(
    shape: MindmapShape,
    text: &str,
    padding: f64,
    style: &TextStyle,
    measurer: &dyn TextMeasurer,
) -> (f64, f64) {
    let (w, h) = measure(measurer, text, style);
    let (w, h) = (w + 2.0 * padding, h + 2.0 * padding);
    match shape {
        MindmapShape::Circle => {
            let d = w.max(h);
            (d, d)
        }
        MindmapShape::Bang | MindmapShape::Cloud => (w + 2.0 * padding, h + padding),
        MindmapShape::Hexagon => (w + h / 2.0, h),
        MindmapShape::Default | MindmapShape::Square | MindmapShape::Rounded => (w, h),
    }
}

/// Tree layout growing to the right: a node's depth picks its column, siblings stack downward
/// and every parent is centered against the block of its children.
pub fn layout_mindmap_diagram(
    model: &MindmapModel,
    cfg: &Config,
    measurer: &dyn TextMeasurer,
) -> MindmapLayout {
    let level_spacing = cfg_f64(cfg, "mindmap.levelSpacing", 80.0);
    let node_spacing = cfg_f64(cfg, "mindmap.nodeSpacing", 20.0);
    let padding = cfg_f64(cfg, "mindmap.padding", 10.0);
    let style = TextStyle::sized(font_size(cfg));

    let n = model.nodes.len();
    if n == 0 {
        return MindmapLayout {
            nodes: Vec::new(),
            edges: Vec::new(),
            bounds: Bounds::default(),
        };
    }

    let children = |i: usize| {
        model.nodes[i]
            .children
            .iter()
            .copied()
            .filter(move |&c| c < n && c != 0)
    };

    // Breadth-first from the root; parents always precede their children in `order`.
    let mut depth = vec![0usize; n];
    let mut order = Vec::with_capacity(n);
    order.push(0);
    let mut head = 0;
    while let Some(&ix) = order.get(head) {
        head += 1;
        for c in children(ix) {
            depth[c] = depth[ix] + 1;
            order.push(c);
        }
    }

    let sizes: Vec<(f64, f64)> = model
        .nodes
        .iter()
        .map(|node| node_size(node.shape, &node.text, padding, &style, measurer))
        .collect();

    let max_depth = order.iter().map(|&i| depth[i]).max().unwrap_or(0);
    let mut column_widths = vec![0.0f64; max_depth + 1];
    for &i in &order {
        column_widths[depth[i]] = column_widths[depth[i]].max(sizes[i].0);
    }
    let mut column_x = Vec::with_capacity(column_widths.len());
    let mut x = padding;
    for w in &column_widths {
        column_x.push(x);
        x += w + level_spacing;
    }

    // Bottom-up: height of each subtree band, where the children block starts inside it and
    // where the node's own center sits.
    let mut band = vec![0.0f64; n];
    let mut block_offset = vec![0.0f64; n];
    let mut center = vec![0.0f64; n];
    for &i in order.iter().rev() {
        let h = sizes[i].1;
        let kids: Vec<usize> = children(i).collect();
        let (Some(&first), Some(&last)) = (kids.first(), kids.last()) else {
            band[i] = h;
            center[i] = h / 2.0;
            continue;
        };
        let block: f64 =
            kids.iter().map(|&c| band[c]).sum::<f64>() + node_spacing * (kids.len() - 1) as f64;
        band[i] = block.max(h);
        block_offset[i] = (band[i] - block) / 2.0;

        let first_center = block_offset[i] + center[first];
        let last_center = block_offset[i] + block - band[last] + center[last];
        center[i] = ((first_center + last_center) / 2.0).clamp(h / 2.0, band[i] - h / 2.0);
    }

    // Top-down: absolute band tops.
    let mut band_top = vec![0.0f64; n];
    band_top[0] = padding;
    for &i in &order {
        let mut y = band_top[i] + block_offset[i];
        for c in children(i) {
            band_top[c] = y;
            y += band[c] + node_spacing;
        }
    }

    let rects: Vec<Rect> = (0..n)
        .map(|i| {
            let (w, h) = sizes[i];
            let d = depth[i];
            Rect::new(
                column_x[d] + (column_widths[d] - w) / 2.0,
                band_top[i] + center[i] - h / 2.0,
                w,
                h,
            )
        })
        .collect();

    let nodes: Vec<MindmapNodeLayout> = model
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| MindmapNodeLayout {
            id: node.id.clone(),
            text: node.text.clone(),
            shape: node.shape,
            depth: depth[i],
            rect: rects[i],
        })
        .collect();

    let mut edges = Vec::with_capacity(n.saturating_sub(1));
    for &i in &order {
        let parent = &rects[i];
        for c in children(i) {
            let child = &rects[c];
            edges.push(MindmapEdgeLayout {
                from: model.nodes[i].id.clone(),
                to: model.nodes[c].id.clone(),
                points: vec![
                    Point::new(parent.max_x(), parent.center().y),
                    Point::new(child.x, child.center().y),
                ],
            });
        }
    }

    let bounds = Bounds::from_rects(nodes.iter().map(|n| &n.rect))
        .map_or_else(Bounds::default, |b| Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: b.max_x + padding,
            max_y: b.max_y + padding,
        });

    tracing::trace!(nodes = nodes.len(), depth = max_depth, "mindmap layout");
    MindmapLayout {
        nodes,
        edges,
        bounds,
    }
}
