#![forbid(unsafe_code)]

//! Headless layout for every selkie dialect.
//!
//! [`layout_parsed`] takes a [`ParsedDiagram`] and returns a [`LayoutedDiagram`]. Graph-shaped
//! dialects (flowchart, class, state, ER) go through the layered engine in `selkie-layout` and
//! get their geometry written onto their graph. The other dialects each have a small positioning
//! strategy of their own. Nothing here draws; the output is meant for an external renderer.

pub mod gantt;
pub mod gitgraph;
pub mod graph;
pub mod journey;
pub mod mindmap;
pub mod model;
pub mod pie;
pub mod sequence;
pub mod timeline;
pub mod unsupported;

pub use selkie_layout::{DeterministicTextMeasurer, TextMeasurer, TextMetrics, TextStyle};

use crate::model::{LayoutDiagram, LayoutedDiagram};
use selkie_core::{Config, DiagramModel, ParsedDiagram};
use selkie_layout::{MAX_FONT_SIZE, MAX_SPACING};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Layout(#[from] selkie_layout::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone)]
pub struct LayoutOptions {
    pub text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            text_measurer: Arc::new(DeterministicTextMeasurer::default()),
        }
    }
}

impl std::fmt::Debug for LayoutOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutOptions").finish_non_exhaustive()
    }
}

impl LayoutOptions {
    pub fn with_text_measurer(
        mut self,
        text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
    ) -> Self {
        self.text_measurer = text_measurer;
        self
    }
}

pub fn layout_parsed(parsed: &ParsedDiagram, options: &LayoutOptions) -> Result<LayoutedDiagram> {
    let _span =
        tracing::debug_span!("layout_parsed", diagram = %parsed.meta.diagram_type).entered();
    let cfg = &parsed.meta.effective_config;
    let measurer = options.text_measurer.as_ref();
    let limits = parsed.limits();

    let mut model = parsed.model.clone();
    let layout = match &mut model {
        DiagramModel::Flowchart(m) => LayoutDiagram::Graph(graph::layout_graph(
            &mut m.graph,
            "flowchart",
            cfg,
            &limits,
            measurer,
        )?),
        DiagramModel::Class(m) => LayoutDiagram::Graph(graph::layout_graph(
            &mut m.graph,
            "class",
            cfg,
            &limits,
            measurer,
        )?),
        DiagramModel::State(m) => LayoutDiagram::Graph(graph::layout_graph(
            &mut m.graph,
            "state",
            cfg,
            &limits,
            measurer,
        )?),
        DiagramModel::Er(m) => LayoutDiagram::Graph(graph::layout_graph(
            &mut m.graph,
            "er",
            cfg,
            &limits,
            measurer,
        )?),
        DiagramModel::Sequence(m) => {
            LayoutDiagram::Sequence(sequence::layout_sequence_diagram(m, cfg, measurer))
        }
        DiagramModel::Gantt(m) => {
            LayoutDiagram::Gantt(gantt::layout_gantt_diagram(m, cfg, measurer))
        }
        DiagramModel::Pie(m) => LayoutDiagram::Pie(pie::layout_pie_diagram(m, cfg, measurer)),
        DiagramModel::Journey(m) => {
            LayoutDiagram::Journey(journey::layout_journey_diagram(m, cfg, measurer))
        }
        DiagramModel::GitGraph(m) => {
            LayoutDiagram::GitGraph(gitgraph::layout_gitgraph_diagram(m, cfg, measurer))
        }
        DiagramModel::Mindmap(m) => {
            LayoutDiagram::Mindmap(mindmap::layout_mindmap_diagram(m, cfg, measurer))
        }
        DiagramModel::Timeline(m) => {
            LayoutDiagram::Timeline(timeline::layout_timeline_diagram(m, cfg, measurer))
        }
        DiagramModel::Unsupported { raw_keyword } => LayoutDiagram::Unsupported(
            unsupported::layout_unsupported_diagram(raw_keyword, cfg, measurer),
        ),
    };

    let bounds = layout.bounds();
    tracing::debug!(
        width = bounds.width(),
        height = bounds.height(),
        "laid out diagram"
    );

    Ok(LayoutedDiagram {
        meta: parsed.meta.clone(),
        model,
        layout,
        diagnostics: parsed.diagnostics.clone(),
    })
}

/// Reads a finite, non-negative number from `cfg`, falling back to `default`. Values above
/// [`MAX_SPACING`] are capped so sums of them stay finite.
pub(crate) fn cfg_f64(cfg: &Config, dotted_path: &str, default: f64) -> f64 {
    cfg.get_f64(dotted_path)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map_or(default, |v| v.min(MAX_SPACING))
}

pub(crate) fn font_size(cfg: &Config) -> f64 {
    cfg.get_f64("fontSize")
        .filter(|v| v.is_finite() && *v > 0.0)
        .map_or(16.0, |v| v.min(MAX_FONT_SIZE))
}
