pub mod class;
pub mod er;
pub mod flowchart;
pub mod gantt;
pub mod git_graph;
pub mod journey;
pub mod mindmap;
pub mod pie;
pub mod sequence;
pub mod state;
pub mod timeline;

use crate::detect::DiagramKind;
use crate::lex::Line;
use serde::{Deserialize, Serialize};

pub use class::ClassModel;
pub use er::ErModel;
pub use flowchart::FlowchartModel;
pub use gantt::GanttModel;
pub use git_graph::GitGraphModel;
pub use journey::JourneyModel;
pub use mindmap::MindmapModel;
pub use pie::PieModel;
pub use sequence::SequenceModel;
pub use state::StateModel;
pub use timeline::TimelineModel;

/// The parsed form of one diagram block: exactly one case per detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DiagramModel {
    Flowchart(FlowchartModel),
    Sequence(SequenceModel),
    Class(ClassModel),
    State(StateModel),
    Er(ErModel),
    Pie(PieModel),
    Gantt(GanttModel),
    Journey(JourneyModel),
    GitGraph(GitGraphModel),
    Mindmap(MindmapModel),
    Timeline(TimelineModel),
    #[serde(rename_all = "camelCase")]
    Unsupported { raw_keyword: String },
}

impl DiagramModel {
    pub fn kind(&self) -> Option<DiagramKind> {
        Some(match self {
            Self::Flowchart(_) => DiagramKind::Flowchart,
            Self::Sequence(_) => DiagramKind::Sequence,
            Self::Class(_) => DiagramKind::Class,
            Self::State(_) => DiagramKind::State,
            Self::Er(_) => DiagramKind::Er,
            Self::Pie(_) => DiagramKind::Pie,
            Self::Gantt(_) => DiagramKind::Gantt,
            Self::Journey(_) => DiagramKind::Journey,
            Self::GitGraph(_) => DiagramKind::GitGraph,
            Self::Mindmap(_) => DiagramKind::Mindmap,
            Self::Timeline(_) => DiagramKind::Timeline,
            Self::Unsupported { .. } => return None,
        })
    }

    /// Dialect name, or `"unsupported"`.
    pub fn type_name(&self) -> &'static str {
        self.kind().map_or("unsupported", DiagramKind::as_str)
    }

    pub fn common(&self) -> Option<&Common> {
        Some(match self {
            Self::Flowchart(m) => &m.common,
            Self::Sequence(m) => &m.common,
            Self::Class(m) => &m.common,
            Self::State(m) => &m.common,
            Self::Er(m) => &m.common,
            Self::Pie(m) => &m.common,
            Self::Gantt(m) => &m.common,
            Self::Journey(m) => &m.common,
            Self::GitGraph(m) => &m.common,
            Self::Mindmap(m) => &m.common,
            Self::Timeline(m) => &m.common,
            Self::Unsupported { .. } => return None,
        })
    }

    pub fn title(&self) -> Option<&str> {
        self.common()?.title.as_deref()
    }

    /// The graph of a graph-shaped dialect.
    pub fn graph(&self) -> Option<&selkie_graph::Graph> {
        match self {
            Self::Flowchart(m) => Some(&m.graph),
            Self::Class(m) => Some(&m.graph),
            Self::State(m) => Some(&m.graph),
            Self::Er(m) => Some(&m.graph),
            _ => None,
        }
    }

    pub fn graph_mut(&mut self) -> Option<&mut selkie_graph::Graph> {
        match self {
            Self::Flowchart(m) => Some(&mut m.graph),
            Self::Class(m) => Some(&mut m.graph),
            Self::State(m) => Some(&mut m.graph),
            Self::Er(m) => Some(&mut m.graph),
            _ => None,
        }
    }
}

/// Statements every dialect accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Common {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub acc_title: Option<String>,
    #[serde(default)]
    pub acc_descr: Option<String>,
}

impl Common {
    /// Consumes `title ...`, `accTitle: ...` and `accDescr: ...`. Returns whether `line` was one
    /// of them.
    pub fn accept(&mut self, line: &Line<'_, '_>) -> bool {
        let Some(first) = line.first() else {
            return false;
        };
        if !first.is_word() {
            return false;
        }
        let colon = line.tokens.get(1).is_some_and(|t| t.is(":"));
        match first.text {
            "title" => {
                self.title = non_empty(line.text_after(0));
                true
            }
            "accTitle" if colon => {
                self.acc_title = non_empty(line.text_after(1));
                true
            }
            "accDescr" if colon => {
                self.acc_descr = non_empty(line.text_after(1));
                true
            }
            _ => false,
        }
    }
}

pub(crate) fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Strips one pair of surrounding double quotes.
pub(crate) fn unquote(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

/// Trims a label and turns `<br>` line breaks into newlines.
pub(crate) fn normalize_label(s: &str) -> String {
    let mut out = s.trim().to_string();
    for br in ["<br/>", "<br />", "<br>"] {
        if out.contains(br) {
            out = out.replace(br, "\n");
        }
    }
    out
}
