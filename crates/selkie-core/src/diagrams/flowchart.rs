use super::{Common, non_empty, normalize_label, unquote};
use crate::lex::{Line, TokenKind};
use crate::{ParseContext, Result};
use indexmap::IndexMap;
use selkie_graph::{ArrowHead, Direction, Edge, EdgeStyle, Graph, Node, NodeShape, Subgraph};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowchartModel {
    #[serde(flatten)]
    pub common: Common,
    pub graph: Graph,
    /// `classDef name styles`.
    pub class_defs: IndexMap<String, Vec<String>>,
    /// Node id -> class names applied with `class` or `:::`.
    pub node_classes: IndexMap<String, Vec<String>>,
    /// `style id styles`.
    pub styles: IndexMap<String, Vec<String>>,
    /// `click id href "url"`.
    pub links: IndexMap<String, String>,
}

/// Shape delimiters, longest opener first so `((` wins over `(`.
const SHAPES: &[(&str, &[(&str, NodeShape)])] = &[
    ("(((", &[(")))", NodeShape::DoubleCircle)]),
    ("((", &[("))", NodeShape::Circle)]),
    ("([", &[("])", NodeShape::Stadium)]),
    ("(", &[(")", NodeShape::Rounded)]),
    ("[[", &[("]]", NodeShape::Subroutine)]),
    ("[(", &[(")]", NodeShape::Cylinder)]),
    (
        "[/",
        &[
            ("/]", NodeShape::Parallelogram),
            ("\\]", NodeShape::Trapezoid),
        ],
    ),
    (
        "[\\",
        &[
            ("\\]", NodeShape::ParallelogramAlt),
            ("/]", NodeShape::TrapezoidAlt),
        ],
    ),
    ("[", &[("]", NodeShape::Rect)]),
    ("{{", &[("}}", NodeShape::Hexagon)]),
    ("{", &[("}", NodeShape::Diamond)]),
    (">", &[("]", NodeShape::Asymmetric)]),
];

/// Stroke, heads and length decoded from one link token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LinkKind {
    pub start: ArrowHead,
    pub end: ArrowHead,
    pub style: EdgeStyle,
    pub min_len: usize,
}

/// Decodes a link such as `-->`, `<-.->`, `===` or `--x`.
///
/// The last character is either a head or one body character; the remaining body length (or
/// the number of dots for dotted links) is the requested rank distance.
pub(crate) fn destruct_link(s: &str) -> LinkKind {
    let s = s.trim();
    let mut kind = LinkKind {
        start: ArrowHead::None,
        end: ArrowHead::None,
        style: EdgeStyle::Solid,
        min_len: 1,
    };
    if s.len() < 2 {
        return kind;
    }
    let mut line = &s[..s.len() - 1];
    kind.end = match s.as_bytes()[s.len() - 1] {
        b'>' => ArrowHead::Normal,
        b'x' => ArrowHead::Cross,
        b'o' => ArrowHead::Circle,
        _ => ArrowHead::None,
    };
    if let Some(rest) = line.strip_prefix('<') {
        kind.start = ArrowHead::Normal;
        line = rest;
    }

    let mut length = line.len().saturating_sub(1);
    if line.contains('=') {
        kind.style = EdgeStyle::Thick;
    }
    if line.starts_with('~') {
        kind.style = EdgeStyle::Invisible;
    }
    let dots = line.matches('.').count();
    if dots > 0 {
        kind.style = EdgeStyle::Dotted;
        length = dots;
    }
    kind.min_len = length.max(1);
    kind
}

fn is_link_token(text: &str) -> bool {
    text.len() >= 2
        && text.chars().all(|c| matches!(c, '-' | '=' | '.' | '<' | '>' | '~' | 'x' | 'o'))
        && text.contains(['-', '=', '~'])
}

#[derive(Debug, Default)]
struct FlowchartDb {
    model: FlowchartModel,
    stack: Vec<usize>,
    sub_count: usize,
}

impl FlowchartDb {
    /// Records a vertex reference and places it in the innermost open subgraph.
    fn add_vertex(&mut self, node: Node) -> String {
        let id = node.id.clone();
        self.model.graph.add_node(node);
        if let Some(&top) = self.stack.last() {
            // A node already placed in a subgraph nested below `top` stays there.
            let nested = self
                .model
                .graph
                .subgraphs_of(&id)
                .first()
                .is_some_and(|&p| p == top || self.is_descendant(p, top));
            if !nested {
                self.model.graph.add_member(top, &id);
            }
        }
        id
    }

    fn is_descendant(&self, ix: usize, ancestor: usize) -> bool {
        let mut cur = self.model.graph.subgraphs().get(ix).and_then(|s| s.parent);
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.model.graph.subgraphs()[p].parent;
        }
        false
    }

    fn add_class(&mut self, id: &str, class: &str) {
        let classes = self.model.node_classes.entry(id.to_string()).or_default();
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
    }

    fn open_subgraph(&mut self, line: &Line<'_, '_>) {
        self.sub_count += 1;
        let auto_id = format!("subGraph{}", self.sub_count - 1);
        let rest = line.text_after(0);
        let (id, title) = match line.tokens.get(1) {
            None => (auto_id, String::new()),
            Some(t) if t.kind == TokenKind::QuotedString => {
                (auto_id, normalize_label(t.unquoted()))
            }
            Some(t) if t.is_word() && line.tokens.get(2).is_some_and(|b| b.is("[")) => {
                let after = line.text_after(2);
                let title = after.strip_suffix(']').unwrap_or(after);
                (t.text.to_string(), normalize_label(unquote(title)))
            }
            Some(t) if t.is_word() && line.tokens.len() == 2 => {
                (t.text.to_string(), t.text.to_string())
            }
            Some(_) => (rest.to_string(), normalize_label(rest)),
        };
        let parent = self.stack.last().copied();
        let ix = self.model.graph.add_subgraph(Subgraph {
            parent,
            ..Subgraph::new(id, title)
        });
        self.stack.push(ix);
    }
}

pub fn parse(ctx: &mut ParseContext<'_, '_>) -> Result<FlowchartModel> {
    let mut db = FlowchartDb::default();

    let direction = ctx
        .header()
        .and_then(|h| h.tokens.get(1).and_then(|t| Direction::parse(t.text)))
        .unwrap_or_default();
    db.model.graph.set_direction(direction);

    for line in ctx.body() {
        if db.model.common.accept(&line) {
            continue;
        }
        let Some(first) = line.first().copied() else {
            continue;
        };
        let head = if first.kind == TokenKind::Keyword {
            first.text
        } else {
            ""
        };
        match head {
            "subgraph" => db.open_subgraph(&line),
            "end" if line.tokens.len() == 1 => {
                if db.stack.pop().is_none() {
                    ctx.skip(&line, "`end` without an open subgraph");
                }
            }
            "direction" => {
                let Some(dir) = line.tokens.get(1).and_then(|t| Direction::parse(t.text)) else {
                    ctx.skip(&line, "invalid direction");
                    continue;
                };
                match db.stack.last() {
                    Some(&top) => db.model.graph.subgraphs_mut()[top].direction = Some(dir),
                    None => db.model.graph.set_direction(dir),
                }
            }
            "classDef" => {
                let rest = line.text_after(0);
                let Some((names, styles)) = rest.split_once(char::is_whitespace) else {
                    ctx.skip(&line, "classDef needs a name and styles");
                    continue;
                };
                let styles = split_styles(styles);
                for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                    db.model
                        .class_defs
                        .insert(name.to_string(), styles.clone());
                }
            }
            "class" => {
                let rest = line.text_after(0);
                let Some((ids, class)) = rest.rsplit_once(char::is_whitespace) else {
                    ctx.skip(&line, "class needs node ids and a class name");
                    continue;
                };
                for id in ids.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                    db.add_class(id, class.trim());
                }
            }
            "style" => {
                let Some(id) = line.tokens.get(1).filter(|t| t.is_word()) else {
                    ctx.skip(&line, "style needs a node id");
                    continue;
                };
                db.model
                    .styles
                    .insert(id.text.to_string(), split_styles(line.text_after(1)));
            }
            "click" => {
                let Some(id) = line.tokens.get(1).filter(|t| t.is_word()) else {
                    ctx.skip(&line, "click needs a node id");
                    continue;
                };
                // `click id href "url"` and `click id "url"`; callbacks are accepted and ignored.
                if let Some(url) = line
                    .tokens
                    .iter()
                    .skip(2)
                    .find(|t| t.kind == TokenKind::QuotedString)
                {
                    db.model
                        .links
                        .insert(id.text.to_string(), url.unquoted().to_string());
                }
            }
            "linkStyle" => {}
            "graph" | "flowchart" => ctx.skip(&line, "repeated diagram header"),
            _ => {
                if let Err(message) = parse_statement(&mut db, &line) {
                    ctx.skip(&line, message);
                }
            }
        }
        ctx.check_graph(&db.model.graph)?;
    }

    if !db.stack.is_empty() {
        tracing::debug!(open = db.stack.len(), "subgraphs left open at end of input");
    }
    Ok(db.model)
}

fn split_styles(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `group (link group)*` where `group = vertex (& vertex)*`.
///
/// Vertices are recorded as soon as they are read, so a statement that breaks off after a link
/// still declares the nodes before it.
fn parse_statement(db: &mut FlowchartDb, line: &Line<'_, '_>) -> std::result::Result<(), String> {
    let (mut prev, mut i) = parse_group(db, line, 0)?;
    while i < line.tokens.len() {
        let (link, label, next) = parse_link(line, i)?;
        let (group, next) = parse_group(db, line, next)
            .map_err(|_| "link without a target node".to_string())?;
        for from in &prev {
            for to in &group {
                let edge = Edge::new(from.clone(), to.clone())
                    .with_label(label.clone())
                    .with_style(link.style)
                    .with_arrows(link.start, link.end)
                    .with_min_len(link.min_len);
                db.model.graph.add_edge(edge);
            }
        }
        prev = group;
        i = next;
    }
    Ok(())
}

fn parse_group(
    db: &mut FlowchartDb,
    line: &Line<'_, '_>,
    mut i: usize,
) -> std::result::Result<(Vec<String>, usize), String> {
    let mut ids = Vec::new();
    loop {
        let (id, next) = parse_vertex(db, line, i)?;
        ids.push(id);
        i = next;
        match line.tokens.get(i) {
            Some(t) if t.is("&") => i += 1,
            _ => return Ok((ids, i)),
        }
    }
}

fn parse_vertex(
    db: &mut FlowchartDb,
    line: &Line<'_, '_>,
    i: usize,
) -> std::result::Result<(String, usize), String> {
    let Some(tok) = line.tokens.get(i).filter(|t| t.is_word()) else {
        return Err(match line.tokens.get(i) {
            Some(t) => format!("expected a node id, found `{}`", t.text),
            None => "expected a node id".to_string(),
        });
    };
    let base = line.offset();
    let rest = &line.text[tok.end() - base..];

    let mut node = Node::plain(tok.text);
    let mut end_abs = tok.end();
    if let Some((open, closers)) = SHAPES.iter().find(|(open, _)| rest.starts_with(open)) {
        let body = &rest[open.len()..];
        let Some((content_len, close, shape)) = find_closer(body, closers) else {
            return Err(format!("unterminated shape for node `{}`", tok.text));
        };
        node.label = normalize_label(unquote(&body[..content_len]));
        node.shape = *shape;
        end_abs = tok.end() + open.len() + content_len + close.len();
    }

    let mut class = None;
    if line.text[end_abs - base..].starts_with(":::") {
        let class_start = end_abs + 3;
        if let Some(ct) = line
            .tokens
            .iter()
            .find(|t| t.offset == class_start && t.is_word())
        {
            class = Some(ct.text);
            end_abs = ct.end();
        }
    }

    let id = db.add_vertex(node);
    if let Some(class) = class {
        db.add_class(&id, class);
    }
    let next = line
        .tokens
        .iter()
        .position(|t| t.offset >= end_abs)
        .unwrap_or(line.tokens.len());
    Ok((id, next))
}

/// Finds the first closer in `body`, skipping over a leading quoted label.
fn find_closer<'s>(
    body: &str,
    closers: &'s [(&'s str, NodeShape)],
) -> Option<(usize, &'s str, &'s NodeShape)> {
    let trimmed = body.trim_start();
    let search_from = if trimmed.starts_with('"') {
        let lead = body.len() - trimmed.len();
        trimmed[1..].find('"').map_or(0, |q| lead + q + 2)
    } else {
        0
    };
    closers
        .iter()
        .filter_map(|(close, shape)| {
            body[search_from..]
                .find(close)
                .map(|p| (search_from + p, *close, shape))
        })
        .min_by_key(|(p, _, _)| *p)
}

type LinkParse = (LinkKind, Option<String>, usize);

fn parse_link(line: &Line<'_, '_>, i: usize) -> std::result::Result<LinkParse, String> {
    let mut i = i;
    let mut prefix = ArrowHead::None;
    // `x--x` and `o--o`: a one-letter word glued to the link.
    if let (Some(t), Some(n)) = (line.tokens.get(i), line.tokens.get(i + 1))
        && t.is_word()
        && (t.is("x") || t.is("o"))
        && n.offset == t.end()
        && n.kind == TokenKind::Operator
    {
        prefix = if t.is("x") {
            ArrowHead::Cross
        } else {
            ArrowHead::Circle
        };
        i += 1;
    }
    let Some(tok) = line.tokens.get(i) else {
        return Err("expected a link".to_string());
    };
    if tok.kind != TokenKind::Operator || !is_link_token(tok.text) {
        return Err(format!("expected a link, found `{}`", tok.text));
    }

    let opener = tok.text.trim_start_matches('<');
    if matches!(opener, "--" | "==" | "-.") {
        // `A -- text --> B`
        let Some(close) = (i + 1..line.tokens.len()).find(|&j| {
            let t = &line.tokens[j];
            t.kind == TokenKind::Operator && is_link_token(t.text)
        }) else {
            return Err("link label without a closing link".to_string());
        };
        let label = non_empty(&normalize_label(unquote(line.text_between(i + 1, close))));
        let mut kind = destruct_link(line.tokens[close].text);
        if opener == "-." {
            kind.style = EdgeStyle::Dotted;
        } else if opener == "==" {
            kind.style = EdgeStyle::Thick;
        }
        if tok.text.starts_with('<') {
            kind.start = ArrowHead::Normal;
        }
        if prefix != ArrowHead::None {
            kind.start = prefix;
        }
        return Ok((kind, label, close + 1));
    }

    let mut kind = destruct_link(tok.text);
    if prefix != ArrowHead::None {
        kind.start = prefix;
    }
    let mut next = i + 1;
    let mut label = None;
    if line.tokens.get(next).is_some_and(|t| t.is("|")) {
        let Some(close) = line.find(next + 1, "|") else {
            return Err("unterminated `|label|`".to_string());
        };
        label = non_empty(&normalize_label(unquote(line.text_between(next + 1, close))));
        next = close + 1;
    }
    Ok((kind, label, next))
}
