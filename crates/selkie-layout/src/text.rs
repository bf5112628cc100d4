//! Font metrics collaborator.
//!
//! Layout never measures glyphs itself; every label size comes from a [`TextMeasurer`]. Hosts
//! plug in their real font stack, tests and the CLI use [`DeterministicTextMeasurer`].

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub font_size: f64,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub monospace: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            bold: false,
            italic: false,
            monospace: false,
        }
    }
}

impl TextStyle {
    pub fn sized(font_size: f64) -> Self {
        Self {
            font_size,
            ..Self::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
    pub line_count: usize,
}

/// Measures rendered text. Implementations must be deterministic: the same text and style
/// always yield the same metrics.
pub trait TextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics;
}

/// Fixed advance per display column, scaled by the font size. Multi-line aware: `\n` and the
/// `<br>` spellings start a new line.
#[derive(Debug, Clone, Default)]
pub struct DeterministicTextMeasurer {
    /// Advance per column as a fraction of the font size. `0.0` means the default `0.6`.
    pub char_width_factor: f64,
    /// Line height as a fraction of the font size. `0.0` means the default `1.2`.
    pub line_height_factor: f64,
}

impl DeterministicTextMeasurer {
    pub fn normalized_text_lines(text: &str) -> Vec<String> {
        let t = text
            .replace("<br/>", "\n")
            .replace("<br />", "\n")
            .replace("<br>", "\n");
        t.split('\n').map(str::to_string).collect()
    }
}

impl TextMeasurer for DeterministicTextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics {
        let char_width_factor = if self.char_width_factor == 0.0 {
            0.6
        } else {
            self.char_width_factor
        };
        let line_height_factor = if self.line_height_factor == 0.0 {
            1.2
        } else {
            self.line_height_factor
        };
        let weight_factor = if style.bold && !style.monospace {
            1.1
        } else {
            1.0
        };

        let lines = Self::normalized_text_lines(text);
        let font_size = style.font_size.max(1.0);
        let max_columns = lines.iter().map(|l| l.width()).max().unwrap_or(0);

        TextMetrics {
            width: max_columns as f64 * font_size * char_width_factor * weight_factor,
            height: lines.len() as f64 * font_size * line_height_factor,
            line_count: lines.len(),
        }
    }
}
