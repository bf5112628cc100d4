use super::{Common, normalize_label, unquote};
use crate::{ParseContext, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MindmapShape {
    #[default]
    Default,
    /// `[text]`
    Square,
    /// `(text)`
    Rounded,
    /// `((text))`
    Circle,
    /// `))text((`
    Bang,
    /// `)text(`
    Cloud,
    /// `{{text}}`
    Hexagon,
}

/// Delimiters in match priority: longer forms before their one-character prefixes.
const SHAPES: &[(&str, &str, MindmapShape)] = &[
    ("((", "))", MindmapShape::Circle),
    ("))", "((", MindmapShape::Bang),
    ("{{", "}}", MindmapShape::Hexagon),
    ("(", ")", MindmapShape::Rounded),
    (")", "(", MindmapShape::Cloud),
    ("[", "]", MindmapShape::Square),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindmapNode {
    pub id: String,
    pub text: String,
    pub shape: MindmapShape,
    #[serde(default)]
    pub icon: Option<String>,
    pub classes: Vec<String>,
    /// Depth below the root (root is 0).
    pub level: usize,
    #[serde(default)]
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Nodes in declaration order; index 0 is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindmapModel {
    #[serde(flatten)]
    pub common: Common,
    pub nodes: Vec<MindmapNode>,
}

impl MindmapModel {
    pub fn root(&self) -> Option<&MindmapNode> {
        self.nodes.first()
    }

    pub fn children(&self, ix: usize) -> impl Iterator<Item = &MindmapNode> {
        self.nodes
            .get(ix)
            .into_iter()
            .flat_map(|n| n.children.iter())
            .filter_map(|&c| self.nodes.get(c))
    }
}

/// `id((text))` -> (`id`, `text`, Circle). A bare description is its own id.
fn parse_node(raw: &str) -> (String, String, MindmapShape) {
    let raw = raw.trim();
    let open_at = raw.find(['(', ')', '[', '{']);
    if let Some(at) = open_at {
        let (id, rest) = raw.split_at(at);
        for (open, close, shape) in SHAPES {
            if let Some(inner) = rest.strip_prefix(open).and_then(|r| r.strip_suffix(close)) {
                let text = normalize_label(unquote(inner));
                let id = if id.trim().is_empty() {
                    text.clone()
                } else {
                    id.trim().to_string()
                };
                return (id, text, *shape);
            }
        }
    }
    let text = normalize_label(unquote(raw));
    (text.clone(), text, MindmapShape::Default)
}

pub fn parse(ctx: &mut ParseContext<'_, '_>) -> Result<MindmapModel> {
    let mut model = MindmapModel::default();
    // (indent, node index) of the open ancestors.
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for line in ctx.body() {
        if model.common.accept(&line) {
            continue;
        }
        let text = line.text;
        if let Some(icon) = text.strip_prefix("::icon(") {
            match (model.nodes.last_mut(), icon.strip_suffix(')')) {
                (Some(node), Some(icon)) => node.icon = Some(icon.trim().to_string()),
                (None, _) => ctx.skip(&line, "icon before any node"),
                (_, None) => ctx.skip(&line, "unterminated `::icon(`"),
            }
            continue;
        }
        if let Some(classes) = text.strip_prefix(":::") {
            match model.nodes.last_mut() {
                Some(node) => node
                    .classes
                    .extend(classes.split_whitespace().map(str::to_string)),
                None => ctx.skip(&line, "class before any node"),
            }
            continue;
        }

        let (body, inline_classes) = match text.split_once(":::") {
            Some((body, classes)) => (body, Some(classes)),
            None => (text, None),
        };
        let (id, label, shape) = parse_node(body);
        if label.is_empty() {
            ctx.skip(&line, "empty mindmap node");
            continue;
        }

        // The root never leaves the stack: a mind map has one root, and later lines at or
        // above its indentation hang off it.
        while stack.len() > 1 && stack.last().is_some_and(|&(indent, _)| indent >= line.indent) {
            stack.pop();
        }
        let parent = stack.last().map(|&(_, ix)| ix);
        let ix = model.nodes.len();
        let level = parent.map_or(0, |p| model.nodes[p].level + 1);
        model.nodes.push(MindmapNode {
            id,
            text: label,
            shape,
            icon: None,
            classes: inline_classes
                .map(|c| c.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            level,
            parent,
            children: Vec::new(),
        });
        if let Some(p) = parent {
            model.nodes[p].children.push(ix);
        }
        stack.push((line.indent, ix));
        ctx.check_nodes(model.nodes.len())?;
        ctx.check_edges(model.nodes.len().saturating_sub(1))?;
    }

    Ok(model)
}
