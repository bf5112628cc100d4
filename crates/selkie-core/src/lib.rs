#![forbid(unsafe_code)]

//! Diagram text parser and semantic model (headless).
//!
//! One diagram block goes in as text; a [`ParsedDiagram`] comes out. The pipeline is:
//! tokenize, collect `%%{init}%%` directives, detect the dialect from the first word, and hand
//! the statement lines to that dialect's parser. Malformed statements are skipped and reported
//! as [`Diagnostic`]s; only resource caps and allocation failures are errors.

pub mod config;
pub mod context;
pub mod detect;
pub mod diagrams;
pub mod directive;
pub mod error;
pub mod lex;
pub mod limits;

pub use config::Config;
pub use context::{Diagnostic, ParseContext};
pub use detect::{DiagramKind, Detection};
pub use diagrams::DiagramModel;
pub use error::{Error, Result};
pub use limits::Limits;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseMetadata {
    /// Dialect name (`"flowchart"`, `"gitGraph"`, ...) or `"unsupported"`.
    pub diagram_type: String,
    /// Overrides collected from `%%{init}%%` directives.
    pub config: Config,
    /// Defaults, site config and directives merged in that order.
    pub effective_config: Config,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDiagram {
    pub meta: ParseMetadata,
    pub model: DiagramModel,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedDiagram {
    /// Caps in effect for this diagram, read from the effective config.
    pub fn limits(&self) -> Limits {
        Limits::from_config(&self.meta.effective_config)
    }
}

#[derive(Debug, Clone)]
pub struct Engine {
    site_config: Config,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            site_config: Config::defaults(),
        }
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_site_config(mut self, site_config: Config) -> Self {
        // Merge overrides onto the defaults so unset keys keep working.
        self.site_config.deep_merge(site_config.as_value());
        self
    }

    pub fn site_config(&self) -> &Config {
        &self.site_config
    }

    pub fn limits(&self) -> Limits {
        Limits::from_config(&self.site_config)
    }

    /// Detects the dialect of `text` without running its parser.
    pub fn detect_type(&self, text: &str) -> Result<String> {
        let limits = self.limits();
        let tokens = lex::tokenize_with_limits(text, &limits)?;
        let ctx = ParseContext::new(&tokens, limits, &self.site_config);
        Ok(match detect::detect_kind(&ctx) {
            Detection::Known { kind, .. } => kind.as_str().to_string(),
            Detection::Unknown { .. } => "unsupported".to_string(),
        })
    }

    /// Parses one diagram block.
    pub fn parse_diagram(&self, text: &str) -> Result<ParsedDiagram> {
        let _span = tracing::debug_span!("parse_diagram", bytes = text.len()).entered();
        let limits = self.limits();
        let tokens = lex::tokenize_with_limits(text, &limits)?;

        let (overrides, mut diagnostics) = directive::collect_directives(&tokens);
        let mut effective_config = self.site_config.clone();
        effective_config.deep_merge(overrides.as_value());

        let mut ctx = ParseContext::new(&tokens, limits, &effective_config);
        let model = detect::detect(&mut ctx)?;
        diagnostics.extend(ctx.into_diagnostics());
        tracing::debug!(
            diagram = model.type_name(),
            diagnostics = diagnostics.len(),
            "parsed diagram"
        );

        Ok(ParsedDiagram {
            meta: ParseMetadata {
                diagram_type: model.type_name().to_string(),
                config: overrides,
                title: model.title().map(str::to_string),
                effective_config,
            },
            model,
            diagnostics,
        })
    }
}

/// Parses `text` with the default configuration.
pub fn parse(text: &str) -> Result<ParsedDiagram> {
    Engine::new().parse_diagram(text)
}

#[cfg(test)]
mod tests;
