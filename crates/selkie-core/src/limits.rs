use crate::Config;

pub const DEFAULT_MAX_TEXT_SIZE: usize = 50_000;
pub const DEFAULT_MAX_TOKENS: usize = 50_000;
pub const DEFAULT_MAX_NODES: usize = 1_000;
pub const DEFAULT_MAX_EDGES: usize = 2_000;
pub const DEFAULT_MAX_LAYOUT_ITEMS: usize = 20_000;

/// Resource caps applied to a single diagram block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_text_size: usize,
    pub max_tokens: usize,
    pub max_nodes: usize,
    pub max_edges: usize,
    pub max_layout_items: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_text_size: DEFAULT_MAX_TEXT_SIZE,
            max_tokens: DEFAULT_MAX_TOKENS,
            max_nodes: DEFAULT_MAX_NODES,
            max_edges: DEFAULT_MAX_EDGES,
            max_layout_items: DEFAULT_MAX_LAYOUT_ITEMS,
        }
    }
}

impl Limits {
    /// Reads `maxTextSize`, `maxTokens`, `maxNodes`, `maxEdges` and `maxLayoutItems`, falling back
    /// to the defaults for missing or malformed values.
    pub fn from_config(config: &Config) -> Self {
        let d = Self::default();
        Self {
            max_text_size: config.get_usize("maxTextSize").unwrap_or(d.max_text_size),
            max_tokens: config.get_usize("maxTokens").unwrap_or(d.max_tokens),
            max_nodes: config.get_usize("maxNodes").unwrap_or(d.max_nodes),
            max_edges: config.get_usize("maxEdges").unwrap_or(d.max_edges),
            max_layout_items: config
                .get_usize("maxLayoutItems")
                .unwrap_or(d.max_layout_items),
        }
    }

    /// Config keys that only the embedding application may set.
    pub const KEYS: [&'static str; 5] = [
        "maxTextSize",
        "maxTokens",
        "maxNodes",
        "maxEdges",
        "maxLayoutItems",
    ];
}
