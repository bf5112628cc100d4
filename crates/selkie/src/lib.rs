#![forbid(unsafe_code)]

//! `selkie` turns the text of one diagram block into a positioned model ready to be drawn.
//!
//! Parsing lives in `selkie-core` and is re-exported at the crate root. Layout is behind the
//! `render` feature (on by default) under [`render`]; drawing itself is left to the host.
//!
//! # Features
//!
//! - `render`: enable layout for every dialect (`selkie::render`)

pub use selkie_core::*;

#[cfg(feature = "render")]
pub mod render {
    pub use selkie_render::model::{Bounds, LayoutDiagram, LayoutedDiagram};
    pub use selkie_render::{
        DeterministicTextMeasurer, LayoutOptions, TextMeasurer, TextMetrics, TextStyle,
        layout_parsed,
    };

    use std::sync::Arc;

    #[derive(Debug, thiserror::Error)]
    pub enum HeadlessError {
        #[error(transparent)]
        Parse(#[from] selkie_core::Error),
        #[error(transparent)]
        Layout(#[from] selkie_render::Error),
    }

    pub type Result<T> = std::result::Result<T, HeadlessError>;

    /// Parses and lays out `text` in one call.
    pub fn layout_diagram(
        engine: &selkie_core::Engine,
        text: &str,
        layout_options: &LayoutOptions,
    ) -> Result<LayoutedDiagram> {
        let parsed = engine.parse_diagram(text)?;
        Ok(selkie_render::layout_parsed(&parsed, layout_options)?)
    }

    /// Bundles an [`Engine`](selkie_core::Engine) with layout options so hosts can hand over
    /// diagram text and get geometry back.
    ///
    /// All work is CPU-bound and synchronous. The renderer is `Send + Sync`, so a host may keep
    /// one around and call it from whichever worker thread re-parses documents.
    #[derive(Debug, Clone, Default)]
    pub struct HeadlessRenderer {
        pub engine: selkie_core::Engine,
        pub layout: LayoutOptions,
    }

    impl HeadlessRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_site_config(mut self, site_config: selkie_core::Config) -> Self {
            self.engine = self.engine.with_site_config(site_config);
            self
        }

        pub fn with_text_measurer(
            mut self,
            measurer: Arc<dyn TextMeasurer + Send + Sync>,
        ) -> Self {
            self.layout = self.layout.with_text_measurer(measurer);
            self
        }

        pub fn detect_type(&self, text: &str) -> Result<String> {
            Ok(self.engine.detect_type(text)?)
        }

        pub fn parse_diagram(&self, text: &str) -> Result<selkie_core::ParsedDiagram> {
            Ok(self.engine.parse_diagram(text)?)
        }

        pub fn layout_diagram(&self, text: &str) -> Result<LayoutedDiagram> {
            layout_diagram(&self.engine, text, &self.layout)
        }
    }
}
