use crate::diagrams::{self, DiagramModel};
use crate::lex::TokenKind;
use crate::{ParseContext, Result};
use serde::{Deserialize, Serialize};

/// The closed set of supported dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagramKind {
    Flowchart,
    Sequence,
    Class,
    State,
    Er,
    Pie,
    Gantt,
    Journey,
    GitGraph,
    Mindmap,
    Timeline,
}

impl DiagramKind {
    pub const ALL: [DiagramKind; 11] = [
        Self::Flowchart,
        Self::Sequence,
        Self::Class,
        Self::State,
        Self::Er,
        Self::Pie,
        Self::Gantt,
        Self::Journey,
        Self::GitGraph,
        Self::Mindmap,
        Self::Timeline,
    ];

    /// Maps a header keyword to its dialect. Matching is case-sensitive.
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "graph" | "flowchart" => Self::Flowchart,
            "sequenceDiagram" => Self::Sequence,
            "classDiagram" | "classDiagram-v2" => Self::Class,
            "stateDiagram" | "stateDiagram-v2" => Self::State,
            "erDiagram" => Self::Er,
            "pie" => Self::Pie,
            "gantt" => Self::Gantt,
            "journey" => Self::Journey,
            "gitGraph" => Self::GitGraph,
            "mindmap" => Self::Mindmap,
            "timeline" => Self::Timeline,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flowchart => "flowchart",
            Self::Sequence => "sequence",
            Self::Class => "class",
            Self::State => "state",
            Self::Er => "er",
            Self::Pie => "pie",
            Self::Gantt => "gantt",
            Self::Journey => "journey",
            Self::GitGraph => "gitGraph",
            Self::Mindmap => "mindmap",
            Self::Timeline => "timeline",
        }
    }

    /// Whether the dialect is positioned by the layered graph layout.
    pub fn is_graph(self) -> bool {
        matches!(self, Self::Flowchart | Self::Class | Self::State | Self::Er)
    }
}

/// Outcome of looking at the first word of a diagram block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection<'a> {
    Known { kind: DiagramKind, line: usize },
    /// The first word, or `""` when the block holds no word at all.
    Unknown { raw_keyword: &'a str },
}

/// Finds the first keyword or identifier of the block and classifies it.
pub fn detect_kind<'a>(ctx: &ParseContext<'_, 'a>) -> Detection<'a> {
    for (line_ix, line) in ctx.lines().iter().enumerate() {
        let Some(tok) = line
            .tokens
            .iter()
            .find(|t| matches!(t.kind, TokenKind::Keyword | TokenKind::Identifier))
        else {
            continue;
        };
        return match DiagramKind::from_keyword(tok.text) {
            Some(kind) => Detection::Known {
                kind,
                line: line_ix,
            },
            None => Detection::Unknown {
                raw_keyword: tok.text,
            },
        };
    }
    Detection::Unknown { raw_keyword: "" }
}

/// Detects the dialect and runs its parser over the whole block.
pub fn detect(ctx: &mut ParseContext<'_, '_>) -> Result<DiagramModel> {
    let (kind, line) = match detect_kind(ctx) {
        Detection::Known { kind, line } => (kind, line),
        Detection::Unknown { raw_keyword } => {
            tracing::debug!(raw_keyword, "unsupported diagram");
            return Ok(DiagramModel::Unsupported {
                raw_keyword: raw_keyword.to_string(),
            });
        }
    };
    ctx.set_header(line, kind);
    let _span = tracing::debug_span!("parse", diagram = kind.as_str()).entered();
    Ok(match kind {
        DiagramKind::Flowchart => DiagramModel::Flowchart(diagrams::flowchart::parse(ctx)?),
        DiagramKind::Sequence => DiagramModel::Sequence(diagrams::sequence::parse(ctx)?),
        DiagramKind::Class => DiagramModel::Class(diagrams::class::parse(ctx)?),
        DiagramKind::State => DiagramModel::State(diagrams::state::parse(ctx)?),
        DiagramKind::Er => DiagramModel::Er(diagrams::er::parse(ctx)?),
        DiagramKind::Pie => DiagramModel::Pie(diagrams::pie::parse(ctx)?),
        DiagramKind::Gantt => DiagramModel::Gantt(diagrams::gantt::parse(ctx)?),
        DiagramKind::Journey => DiagramModel::Journey(diagrams::journey::parse(ctx)?),
        DiagramKind::GitGraph => DiagramModel::GitGraph(diagrams::git_graph::parse(ctx)?),
        DiagramKind::Mindmap => DiagramModel::Mindmap(diagrams::mindmap::parse(ctx)?),
        DiagramKind::Timeline => DiagramModel::Timeline(diagrams::timeline::parse(ctx)?),
    })
}
