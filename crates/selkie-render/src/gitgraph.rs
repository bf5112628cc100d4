use crate::model::{Bounds, GitBranchLayout, GitCommitLayout, GitEdgeLayout, GitGraphLayout};
use crate::{cfg_f64, font_size};
use rustc_hash::FxHashMap;
use selkie_core::Config;
use selkie_core::diagrams::git_graph::GitGraphModel;
use selkie_graph::{Direction, Point, Rect};
use selkie_layout::position::measure;
use selkie_layout::{TextMeasurer, TextStyle};

const LAYOUT_OFFSET: f64 = 10.0;
const LABEL_GAP: f64 = 10.0;

/// Maps (position along the commit axis, position across lanes) to diagram coordinates.
#[derive(Debug, Clone, Copy)]
struct Axes {
    horizontal: bool,
}

impl Axes {
    fn point(self, along: f64, across: f64) -> Point {
        if self.horizontal {
            Point::new(along, across)
        } else {
            Point::new(across, along)
        }
    }
}

/// Commits advance one `gitGraph.commitSpacing` step each in commit order; every branch owns a
/// lane `gitGraph.branchSpacing` apart, in `order` then declaration order. `TB` and `BT` turn
/// the drawing on its side, `BT` running from the bottom up.
pub fn layout_gitgraph_diagram(
    model: &GitGraphModel,
    cfg: &Config,
    measurer: &dyn TextMeasurer,
) -> GitGraphLayout {
    let commit_spacing = cfg_f64(cfg, "gitGraph.commitSpacing", 50.0);
    let branch_spacing = cfg_f64(cfg, "gitGraph.branchSpacing", 90.0);
    let radius = cfg_f64(cfg, "gitGraph.commitRadius", 10.0);
    let show_branches = cfg.get_bool("gitGraph.showBranches").unwrap_or(true);
    let style = TextStyle::sized(font_size(cfg)).bold();

    let direction = model.direction;
    let axes = Axes {
        horizontal: direction.is_horizontal(),
    };
    let branches = model.ordered_branches();
    let lanes: FxHashMap<&str, usize> = branches
        .iter()
        .enumerate()
        .map(|(i, b)| (b.name.as_str(), i))
        .collect();

    let label_sizes: Vec<(f64, f64)> = branches
        .iter()
        .map(|b| measure(measurer, &b.name, &style))
        .collect();
    // Room taken by the branch labels in front of the first commit.
    let label_extent = if !show_branches {
        0.0
    } else if axes.horizontal {
        label_sizes.iter().map(|s| s.0).fold(0.0, f64::max) + LABEL_GAP
    } else {
        label_sizes.iter().map(|s| s.1).fold(0.0, f64::max) + LABEL_GAP
    };
    let lane_extent = if axes.horizontal {
        label_sizes.iter().map(|s| s.1).fold(2.0 * radius, f64::max)
    } else {
        label_sizes.iter().map(|s| s.0).fold(2.0 * radius, f64::max)
    };

    let first_along = LAYOUT_OFFSET + label_extent + commit_spacing / 2.0;
    let last_index = model.commits.len().saturating_sub(1);
    let along_of = |i: usize| {
        let step = if direction == Direction::BT {
            last_index - i
        } else {
            i
        };
        first_along + step as f64 * commit_spacing
    };
    let across_of = |lane: usize| LAYOUT_OFFSET + lane_extent / 2.0 + lane as f64 * branch_spacing;

    let mut centers: FxHashMap<&str, (f64, f64, usize)> = FxHashMap::default();
    let mut commits = Vec::with_capacity(model.commits.len());
    for (i, commit) in model.commits.iter().enumerate() {
        let lane = lanes.get(commit.branch.as_str()).copied().unwrap_or(0);
        let (along, across) = (along_of(i), across_of(lane));
        centers.insert(commit.id.as_str(), (along, across, lane));
        commits.push(GitCommitLayout {
            id: commit.id.clone(),
            branch: commit.branch.clone(),
            kind: commit.kind,
            message: commit.message.clone(),
            tags: commit.tags.clone(),
            center: axes.point(along, across),
            radius,
        });
    }

    let mut edges = Vec::new();
    for commit in &model.commits {
        let Some(&(along, across, lane)) = centers.get(commit.id.as_str()) else {
            continue;
        };
        for (j, parent) in commit.parents.iter().enumerate() {
            let Some(&(p_along, p_across, p_lane)) = centers.get(parent.as_str()) else {
                continue;
            };
            let from = axes.point(p_along, p_across);
            let to = axes.point(along, across);
            let points = if p_lane == lane {
                vec![from, to]
            } else if j == 0 {
                // Branching off: leave the parent across the lanes, then run along the new one.
                vec![from, axes.point(p_along, across), to]
            } else {
                // Merged parent: run along its lane, then cross into the merge commit.
                vec![from, axes.point(along, p_across), to]
            };
            edges.push(GitEdgeLayout {
                from: parent.clone(),
                to: commit.id.clone(),
                points,
            });
        }
    }

    let (min_along, max_along) = if model.commits.is_empty() {
        (first_along, first_along)
    } else {
        let (a, b) = (along_of(0), along_of(last_index));
        (a.min(b), a.max(b))
    };
    let line_start = min_along - commit_spacing / 2.0;
    let line_end = max_along + commit_spacing / 2.0;
    let branch_layouts: Vec<GitBranchLayout> = branches
        .iter()
        .zip(&label_sizes)
        .enumerate()
        .map(|(lane, (branch, &(w, h)))| {
            let across = across_of(lane);
            let label = show_branches.then(|| {
                if axes.horizontal {
                    Rect::new(LAYOUT_OFFSET, across - h / 2.0, w, h)
                } else {
                    Rect::new(across - w / 2.0, LAYOUT_OFFSET, w, h)
                }
            });
            GitBranchLayout {
                name: branch.name.clone(),
                lane,
                label,
                start: axes.point(line_start, across),
                end: axes.point(line_end, across),
            }
        })
        .collect();

    let rects: Vec<Rect> = commits
        .iter()
        .map(|c| Rect::new(c.center.x - radius, c.center.y - radius, 2.0 * radius, 2.0 * radius))
        .chain(branch_layouts.iter().filter_map(|b| b.label))
        .chain(
            branch_layouts
                .iter()
                .flat_map(|b| [b.start, b.end])
                .map(|p| Rect::new(p.x, p.y, 0.0, 0.0)),
        )
        .collect();
    let bounds = Bounds::from_rects(&rects).map_or_else(Bounds::default, |b| Bounds {
        min_x: 0.0,
        min_y: 0.0,
        max_x: b.max_x + LAYOUT_OFFSET,
        max_y: b.max_y + LAYOUT_OFFSET,
    });

    tracing::trace!(
        commits = commits.len(),
        branches = branch_layouts.len(),
        ?direction,
        "git graph layout"
    );
    GitGraphLayout {
        direction,
        branches: branch_layouts,
        commits,
        edges,
        bounds,
    }
}
