#![forbid(unsafe_code)]

//! Graph container shared by selkie's graph-shaped diagrams (flowchart, class, ER, state).
//!
//! The container is plain data: parsers append nodes, edges and subgraphs in declaration order,
//! and the layout engine later writes geometry into the same structure. Node ids are unique and
//! insertion order is preserved so every consumer can break ties deterministically.

mod graph;

pub use graph::{Adjacency, Graph};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box; `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = self.max_x().max(other.max_x());
        let max_y = self.max_y().max(other.max_y());
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn contains_rect(&self, other: &Rect, eps: f64) -> bool {
        other.x + eps >= self.x
            && other.y + eps >= self.y
            && other.max_x() <= self.max_x() + eps
            && other.max_y() <= self.max_y() + eps
    }
}

/// Main layout axis. `TB` and `TD` are the same direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    TB,
    BT,
    LR,
    RL,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TB" | "TD" | "v" => Some(Self::TB),
            "BT" | "^" => Some(Self::BT),
            "LR" | ">" => Some(Self::LR),
            "RL" | "<" => Some(Self::RL),
            _ => None,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LR | Self::RL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeShape {
    #[default]
    Rect,
    Rounded,
    Stadium,
    Subroutine,
    Cylinder,
    Circle,
    DoubleCircle,
    Diamond,
    Hexagon,
    Asymmetric,
    Parallelogram,
    ParallelogramAlt,
    Trapezoid,
    TrapezoidAlt,
    /// Class diagram box: title plus member compartments.
    ClassBox,
    /// ER entity box: title plus attribute rows.
    EntityBox,
    StateStart,
    StateEnd,
    Fork,
    Join,
    Choice,
    Note,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeStyle {
    #[default]
    Solid,
    Dotted,
    Thick,
    Invisible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArrowHead {
    #[default]
    None,
    Normal,
    Cross,
    Circle,
    /// Hollow triangle (inheritance / realization).
    Triangle,
    /// Filled diamond (composition).
    Diamond,
    /// Hollow diamond (aggregation).
    OpenDiamond,
    Lollipop,
    ZeroOrOne,
    ExactlyOne,
    ZeroOrMore,
    OneOrMore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub shape: NodeShape,
    /// Extra text sections drawn below the label (class members, entity attributes).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compartments: Vec<Vec<String>>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rank: Option<usize>,
    #[serde(default)]
    pub order: Option<usize>,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>, shape: NodeShape) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            shape,
            compartments: Vec::new(),
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            rank: None,
            order: None,
        }
    }

    /// Node whose label is its id.
    pub fn plain(id: impl Into<String>) -> Self {
        let id = id.into();
        let label = id.clone();
        Self::new(id, label, NodeShape::Rect)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub label: Option<String>,
    pub style: EdgeStyle,
    pub arrow_start: ArrowHead,
    pub arrow_end: ArrowHead,
    /// Minimum number of ranks between the endpoints.
    pub min_len: usize,
    #[serde(default)]
    pub waypoints: Vec<Point>,
    #[serde(default)]
    pub label_box: Option<Rect>,
    /// Set by layout when the edge closes a cycle and was excluded from ranking.
    #[serde(default)]
    pub back_edge: bool,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: None,
            style: EdgeStyle::Solid,
            arrow_start: ArrowHead::None,
            arrow_end: ArrowHead::Normal,
            min_len: 1,
            waypoints: Vec::new(),
            label_box: None,
            back_edge: false,
        }
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label.filter(|l| !l.is_empty());
        self
    }

    pub fn with_style(mut self, style: EdgeStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_arrows(mut self, start: ArrowHead, end: ArrowHead) -> Self {
        self.arrow_start = start;
        self.arrow_end = end;
        self
    }

    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len.max(1);
        self
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subgraph {
    pub id: String,
    pub title: String,
    /// Direct member node ids in insertion order.
    pub members: Vec<String>,
    /// Index of the enclosing subgraph, if nested.
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub direction: Option<Direction>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Subgraph {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            members: Vec::new(),
            parent: None,
            direction: None,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}
