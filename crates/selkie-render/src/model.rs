use chrono::NaiveDateTime;
use selkie_core::diagrams::gantt::TaskTags;
use selkie_core::diagrams::git_graph::CommitKind;
use selkie_core::diagrams::mindmap::MindmapShape;
use selkie_core::diagrams::sequence::{BlockKind, NotePlacement, ParticipantKind};
use selkie_core::{Diagnostic, DiagramModel, ParseMetadata};
use selkie_graph::{Direction, Point, Rect};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut it = points.into_iter();
        let (x0, y0) = it.next()?;
        let mut b = Self {
            min_x: x0,
            min_y: y0,
            max_x: x0,
            max_y: y0,
        };
        for (x, y) in it {
            b.min_x = b.min_x.min(x);
            b.min_y = b.min_y.min(y);
            b.max_x = b.max_x.max(x);
            b.max_y = b.max_y.max(y);
        }
        Some(b)
    }

    pub fn from_rects<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Self> {
        Self::from_points(
            rects
                .into_iter()
                .flat_map(|r| [(r.x, r.y), (r.max_x(), r.max_y())]),
        )
    }

    /// Grows the box by `margin` on every side.
    pub fn padded(self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// A parsed diagram with positions attached.
///
/// Graph dialects carry their geometry inside `model` (nodes, edges and subgraphs are written in
/// place); every other dialect carries it in `layout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutedDiagram {
    pub meta: ParseMetadata,
    pub model: DiagramModel,
    pub layout: LayoutDiagram,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LayoutDiagram {
    Graph(GraphLayout),
    Sequence(SequenceLayout),
    Gantt(GanttLayout),
    Pie(PieLayout),
    Journey(JourneyLayout),
    GitGraph(GitGraphLayout),
    Mindmap(MindmapLayout),
    Timeline(TimelineLayout),
    Unsupported(UnsupportedLayout),
}

impl LayoutDiagram {
    pub fn bounds(&self) -> Bounds {
        match self {
            Self::Graph(l) => l.bounds,
            Self::Sequence(l) => l.bounds,
            Self::Gantt(l) => l.bounds,
            Self::Pie(l) => l.bounds,
            Self::Journey(l) => l.bounds,
            Self::GitGraph(l) => l.bounds,
            Self::Mindmap(l) => l.bounds,
            Self::Timeline(l) => l.bounds,
            Self::Unsupported(l) => l.bounds,
        }
    }
}

/// Summary of a graph layout; the geometry itself lives on the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLayout {
    pub direction: Direction,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceLayout {
    pub participants: Vec<ParticipantLayout>,
    pub messages: Vec<MessageLayout>,
    pub notes: Vec<NoteLayout>,
    pub activations: Vec<ActivationLayout>,
    /// Outer blocks come before the blocks nested in them.
    pub blocks: Vec<BlockLayout>,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantLayout {
    pub id: String,
    pub label: String,
    pub kind: ParticipantKind,
    pub header: Rect,
    pub lifeline_start: Point,
    pub lifeline_end: Point,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageLayout {
    pub from: String,
    pub to: String,
    pub text: String,
    pub number: Option<usize>,
    /// Two points for a message between lanes, four for a message to self.
    pub points: Vec<Point>,
    pub label: Option<Rect>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteLayout {
    pub placement: NotePlacement,
    pub actors: Vec<String>,
    pub text: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationLayout {
    pub actor: String,
    /// 0 for the outermost activation of a lane.
    pub depth: usize,
    pub rect: Rect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockLayout {
    pub kind: BlockKind,
    pub depth: usize,
    pub rect: Rect,
    pub sections: Vec<BlockSectionLayout>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSectionLayout {
    pub label: String,
    /// Top edge of the section; sections after the first draw a divider here.
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GanttLayout {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub sections: Vec<GanttSectionLayout>,
    pub tasks: Vec<GanttTaskLayout>,
    pub ticks: Vec<GanttTickLayout>,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GanttSectionLayout {
    pub name: String,
    /// Palette slot, cycling through `gantt.numberSectionStyles`.
    pub style_index: usize,
    pub rect: Rect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GanttTaskLayout {
    pub id: String,
    pub name: String,
    pub section: Option<String>,
    pub tags: TaskTags,
    pub bar: Rect,
    pub label: Rect,
    /// Whether the label fits inside the bar.
    pub label_inside: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GanttTickLayout {
    pub x: f64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieLayout {
    pub center: Point,
    pub radius: f64,
    pub total: f64,
    pub slices: Vec<PieSliceLayout>,
    pub legend: Vec<PieLegendItemLayout>,
    pub bounds: Bounds,
}

/// Angles are in degrees, clockwise from 12 o'clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieSliceLayout {
    pub label: String,
    pub value: f64,
    pub percent: f64,
    pub start_angle: f64,
    pub sweep_angle: f64,
    pub label_position: Point,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieLegendItemLayout {
    pub text: String,
    pub swatch: Rect,
    pub label: Rect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyLayout {
    pub actors: Vec<JourneyActorLayout>,
    pub sections: Vec<JourneySectionLayout>,
    pub tasks: Vec<JourneyTaskLayout>,
    /// Horizontal line the task column lines run down to.
    pub axis_y: f64,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyActorLayout {
    pub name: String,
    pub color_index: usize,
    pub marker: Point,
    pub label: Rect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneySectionLayout {
    pub name: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyTaskLayout {
    pub name: String,
    pub section: Option<String>,
    pub score: u8,
    pub actors: Vec<String>,
    pub rect: Rect,
    /// Center of the score face; higher scores sit higher.
    pub face: Point,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitGraphLayout {
    pub direction: Direction,
    pub branches: Vec<GitBranchLayout>,
    pub commits: Vec<GitCommitLayout>,
    pub edges: Vec<GitEdgeLayout>,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitBranchLayout {
    pub name: String,
    pub lane: usize,
    pub label: Option<Rect>,
    pub start: Point,
    pub end: Point,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitCommitLayout {
    pub id: String,
    pub branch: String,
    pub kind: CommitKind,
    pub message: String,
    pub tags: Vec<String>,
    pub center: Point,
    pub radius: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitEdgeLayout {
    pub from: String,
    pub to: String,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindmapLayout {
    pub nodes: Vec<MindmapNodeLayout>,
    pub edges: Vec<MindmapEdgeLayout>,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindmapNodeLayout {
    pub id: String,
    pub text: String,
    pub shape: MindmapShape,
    pub depth: usize,
    pub rect: Rect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindmapEdgeLayout {
    pub from: String,
    pub to: String,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineLayout {
    pub sections: Vec<TimelineSectionLayout>,
    pub periods: Vec<TimelinePeriodLayout>,
    pub axis_start: Point,
    pub axis_end: Point,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSectionLayout {
    pub label: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePeriodLayout {
    pub label: String,
    pub section: Option<String>,
    pub rect: Rect,
    pub events: Vec<TimelineEventLayout>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEventLayout {
    pub text: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsupportedLayout {
    pub raw_keyword: String,
    pub message: String,
    pub rect: Rect,
    pub bounds: Bounds,
}
