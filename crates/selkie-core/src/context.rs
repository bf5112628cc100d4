use crate::detect::DiagramKind;
use crate::lex::{Line, Tokens};
use crate::{Config, Error, Limits, Result};
use serde::{Deserialize, Serialize};

/// A statement that was skipped during parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-based source line.
    pub line: usize,
    /// Byte offset of the offending statement.
    pub offset: usize,
    pub message: String,
}

/// Everything a dialect parser needs: the statement lines, the effective config, the caps and a
/// diagnostics sink.
pub struct ParseContext<'t, 'a> {
    lines: Vec<Line<'t, 'a>>,
    /// Index in `lines` of the line holding the dialect keyword.
    header: usize,
    kind: DiagramKind,
    limits: Limits,
    config: &'t Config,
    diagnostics: Vec<Diagnostic>,
}

impl<'t, 'a> ParseContext<'t, 'a> {
    pub fn new(tokens: &'t Tokens<'a>, limits: Limits, config: &'t Config) -> Self {
        Self {
            lines: tokens.lines(),
            header: 0,
            kind: DiagramKind::Flowchart,
            limits,
            config,
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn set_header(&mut self, header: usize, kind: DiagramKind) {
        self.header = header;
        self.kind = kind;
    }

    pub fn lines(&self) -> &[Line<'t, 'a>] {
        &self.lines
    }

    /// The line that opened the diagram (`graph TD`, `pie showData`, ...).
    pub fn header(&self) -> Option<Line<'t, 'a>> {
        self.lines.get(self.header).copied()
    }

    /// Statement lines after the header, in source order.
    pub fn body(&self) -> Vec<Line<'t, 'a>> {
        self.lines.iter().skip(self.header + 1).copied().collect()
    }

    pub fn kind(&self) -> DiagramKind {
        self.kind
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Records that `line` was skipped.
    pub fn skip(&mut self, line: &Line<'_, '_>, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(
            diagram = self.kind.as_str(),
            line = line.number,
            %message,
            "skipping statement"
        );
        self.diagnostics.push(Diagnostic {
            line: line.number,
            offset: line.offset(),
            message,
        });
    }

    pub fn check_nodes(&self, count: usize) -> Result<()> {
        if count > self.limits.max_nodes {
            return Err(Error::TooManyNodes {
                diagram_type: self.kind.as_str(),
                limit: self.limits.max_nodes,
            });
        }
        Ok(())
    }

    pub fn check_edges(&self, count: usize) -> Result<()> {
        if count > self.limits.max_edges {
            return Err(Error::TooManyEdges {
                diagram_type: self.kind.as_str(),
                limit: self.limits.max_edges,
            });
        }
        Ok(())
    }

    /// Checks both caps against a graph-shaped model.
    pub fn check_graph(&self, graph: &selkie_graph::Graph) -> Result<()> {
        self.check_nodes(graph.node_count())?;
        self.check_edges(graph.edge_count())
    }
}
