use super::{Common, non_empty, normalize_label, unquote};
use crate::lex::{Line, Token, TokenKind};
use crate::{ParseContext, Result};
use indexmap::IndexMap;
use selkie_graph::{ArrowHead, Direction, Edge, EdgeStyle, Graph, Node, NodeShape, Subgraph};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassModel {
    #[serde(flatten)]
    pub common: Common,
    pub graph: Graph,
    pub classes: IndexMap<String, ClassInfo>,
    pub relations: Vec<ClassRelation>,
    pub notes: Vec<ClassNote>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub generic: Option<String>,
    pub annotations: Vec<String>,
    pub attributes: Vec<ClassMember>,
    pub methods: Vec<ClassMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassMember {
    /// Member text without the visibility marker.
    pub text: String,
    /// `+`, `-`, `#` or `~`; empty when omitted.
    pub visibility: String,
    /// `$` (static) or `*` (abstract); empty when omitted.
    pub classifier: String,
}

impl ClassMember {
    fn parse(raw: &str) -> Self {
        let mut text = raw.trim();
        let mut visibility = String::new();
        if let Some(c) = text.chars().next().filter(|c| "+-#~".contains(*c)) {
            visibility.push(c);
            text = text[c.len_utf8()..].trim_start();
        }
        let mut classifier = String::new();
        if let Some(c) = text.chars().last().filter(|c| *c == '$' || *c == '*') {
            classifier.push(c);
            text = text[..text.len() - c.len_utf8()].trim_end();
        }
        Self {
            text: render_generics(text),
            visibility,
            classifier,
        }
    }

    fn is_method(raw: &str) -> bool {
        raw.contains('(') && raw.contains(')')
    }

    /// Display form: visibility marker followed by the text.
    pub fn display(&self) -> String {
        format!("{}{}", self.visibility, self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationEnd {
    #[default]
    None,
    Inheritance,
    Composition,
    Aggregation,
    Association,
    Lollipop,
}

impl RelationEnd {
    fn from_left(s: &str) -> Option<Self> {
        Some(match s {
            "" => Self::None,
            "<|" => Self::Inheritance,
            "*" => Self::Composition,
            "o" => Self::Aggregation,
            "<" => Self::Association,
            "()" => Self::Lollipop,
            _ => return None,
        })
    }

    fn from_right(s: &str) -> Option<Self> {
        Some(match s {
            "" => Self::None,
            "|>" => Self::Inheritance,
            "*" => Self::Composition,
            "o" => Self::Aggregation,
            ">" => Self::Association,
            "()" => Self::Lollipop,
            _ => return None,
        })
    }

    fn arrow(self) -> ArrowHead {
        match self {
            Self::None => ArrowHead::None,
            Self::Inheritance => ArrowHead::Triangle,
            Self::Composition => ArrowHead::Diamond,
            Self::Aggregation => ArrowHead::OpenDiamond,
            Self::Association => ArrowHead::Normal,
            Self::Lollipop => ArrowHead::Lollipop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRelation {
    pub from: String,
    pub to: String,
    pub end_from: RelationEnd,
    pub end_to: RelationEnd,
    pub dotted: bool,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub cardinality_from: Option<String>,
    #[serde(default)]
    pub cardinality_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassNote {
    pub id: String,
    #[serde(default)]
    pub for_class: Option<String>,
    pub text: String,
}

/// `List~T~` -> `List<T>`.
fn render_generics(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut open = true;
    for c in s.chars() {
        if c == '~' {
            out.push(if open { '<' } else { '>' });
            open = !open;
        } else {
            out.push(c);
        }
    }
    out
}

/// Splits `<|--`, `..>`, `*--o` into the two ends and the line.
fn parse_relation(s: &str) -> Option<(RelationEnd, RelationEnd, bool)> {
    let start = s.find(['-', '.'])?;
    let line_len = s[start..]
        .chars()
        .take_while(|c| *c == '-' || *c == '.')
        .count();
    if line_len < 2 {
        return None;
    }
    let line = &s[start..start + line_len];
    let left = RelationEnd::from_left(&s[..start])?;
    let right = RelationEnd::from_right(&s[start + line_len..])?;
    Some((left, right, line.contains('.')))
}

fn is_relation_piece(t: &Token<'_>) -> bool {
    match t.kind {
        TokenKind::Operator => !matches!(t.text, ":" | "," | "\"" | "&"),
        TokenKind::Bracket => matches!(t.text, "(" | ")"),
        TokenKind::Identifier => t.text == "o",
        _ => false,
    }
}

/// `Name`, `Name~T~`, `Name["Label"]`, optionally followed by `:::style`.
fn parse_class_head(s: &str) -> Option<(String, Option<String>, Option<String>)> {
    let s = s.trim();
    let id_len = s
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_' || *c == '-'))
        .map_or(s.len(), |(i, _)| i);
    if id_len == 0 {
        return None;
    }
    let id = s[..id_len].to_string();
    let mut rest = &s[id_len..];
    let mut generic = None;
    if let Some(after) = rest.strip_prefix('~')
        && let Some(end) = after.rfind('~')
    {
        generic = Some(render_generics(&after[..end]));
        rest = &after[end + 1..];
    }
    let mut label = None;
    if let Some(after) = rest.strip_prefix('[')
        && let Some(end) = after.rfind(']')
    {
        label = non_empty(unquote(&after[..end]));
    }
    Some((id, generic, label))
}

#[derive(Debug, Default)]
struct ClassDb {
    model: ClassModel,
    /// Class whose `{ ... }` body is open.
    body: Option<String>,
    namespaces: Vec<usize>,
}

impl ClassDb {
    fn add_class(&mut self, id: &str) -> &mut ClassInfo {
        if !self.model.classes.contains_key(id) {
            self.model.graph.add_node(Node::new(id, id, NodeShape::ClassBox));
        }
        if let Some(&ns) = self.namespaces.last() {
            self.model.graph.add_member(ns, id);
        }
        self.model
            .classes
            .entry(id.to_string())
            .or_insert_with(|| ClassInfo {
                id: id.to_string(),
                label: id.to_string(),
                ..ClassInfo::default()
            })
    }

    fn add_member(&mut self, class: &str, raw: &str) {
        let raw = raw.trim();
        if raw.is_empty() {
            return;
        }
        if let Some(annotation) = raw.strip_prefix("<<").and_then(|r| r.strip_suffix(">>")) {
            self.add_class(class).annotations.push(annotation.trim().to_string());
            return;
        }
        let member = ClassMember::parse(raw);
        let info = self.add_class(class);
        if ClassMember::is_method(raw) {
            info.methods.push(member);
        } else {
            info.attributes.push(member);
        }
    }

    fn declare(&mut self, line: &Line<'_, '_>) -> std::result::Result<(), String> {
        let rest = line.text_after(0);
        let (head, opens_body) = match rest.find('{') {
            Some(i) => (&rest[..i], Some(&rest[i + 1..])),
            None => (rest, None),
        };
        let Some((id, generic, label)) = parse_class_head(head) else {
            return Err("class declaration needs a name".to_string());
        };
        let info = self.add_class(&id);
        if generic.is_some() {
            info.generic = generic;
        }
        if let Some(label) = label {
            info.label = label;
        }
        if let Some(body) = opens_body {
            let (inline, closed) = match body.rfind('}') {
                Some(i) => (&body[..i], true),
                None => (body, false),
            };
            self.add_member(&id, inline);
            if !closed {
                self.body = Some(id);
            }
        }
        Ok(())
    }

    fn relation(&mut self, line: &Line<'_, '_>) -> Option<std::result::Result<(), String>> {
        let toks = line.tokens;
        let from = toks.first().filter(|t| t.is_word())?;
        let mut i = 1;
        let mut cardinality_from = None;
        if let Some(t) = toks.get(i).filter(|t| t.kind == TokenKind::QuotedString) {
            cardinality_from = non_empty(t.unquoted());
            i += 1;
        }
        let (glued, next) = line.glue(i, is_relation_piece);
        let (end_from, end_to, dotted) = parse_relation(glued)?;
        i = next;
        let mut cardinality_to = None;
        if let Some(t) = toks.get(i).filter(|t| t.kind == TokenKind::QuotedString) {
            cardinality_to = non_empty(t.unquoted());
            i += 1;
        }
        let Some(to) = toks.get(i).filter(|t| t.is_word()) else {
            return Some(Err("relation without a target class".to_string()));
        };
        let label = match toks.get(i + 1) {
            Some(t) if t.is(":") => non_empty(&normalize_label(line.text_after(i + 1))),
            _ => None,
        };

        let from_id = from.text.to_string();
        let to_id = to.text.to_string();
        self.add_class(&from_id);
        self.add_class(&to_id);
        let edge = Edge::new(from_id.clone(), to_id.clone())
            .with_label(label.clone())
            .with_style(if dotted {
                EdgeStyle::Dotted
            } else {
                EdgeStyle::Solid
            })
            .with_arrows(end_from.arrow(), end_to.arrow());
        self.model.graph.add_edge(edge);
        self.model.relations.push(ClassRelation {
            from: from_id,
            to: to_id,
            end_from,
            end_to,
            dotted,
            label,
            cardinality_from,
            cardinality_to,
        });
        Some(Ok(()))
    }

    fn note(&mut self, line: &Line<'_, '_>) -> std::result::Result<(), String> {
        let toks = line.tokens;
        let (for_class, text_ix) = match (toks.get(1), toks.get(2)) {
            (Some(f), Some(c)) if f.is("for") && c.is_word() => (Some(c.text.to_string()), 3),
            _ => (None, 1),
        };
        let Some(text) = toks.get(text_ix) else {
            return Err("note without text".to_string());
        };
        let text = normalize_label(text.unquoted());
        let id = format!("note{}", self.model.notes.len());
        self.model
            .graph
            .add_node(Node::new(id.clone(), text.clone(), NodeShape::Note));
        if let Some(target) = &for_class {
            self.add_class(target);
            let edge = Edge::new(id.clone(), target.clone())
                .with_style(EdgeStyle::Dotted)
                .with_arrows(ArrowHead::None, ArrowHead::None);
            self.model.graph.add_edge(edge);
        }
        self.model.notes.push(ClassNote {
            id,
            for_class,
            text,
        });
        Ok(())
    }

    /// Copies class details into the graph nodes: annotations above the name, attributes and
    /// methods as compartments.
    fn finish(mut self) -> ClassModel {
        for info in self.model.classes.values() {
            let Some(node) = self.model.graph.node_mut(&info.id) else {
                continue;
            };
            let mut label = String::new();
            for a in &info.annotations {
                label.push_str(&format!("«{a}»\n"));
            }
            label.push_str(&info.label);
            if let Some(g) = &info.generic {
                label.push_str(&format!("<{g}>"));
            }
            node.label = label;
            node.shape = NodeShape::ClassBox;
            node.compartments = vec![
                info.attributes.iter().map(ClassMember::display).collect(),
                info.methods.iter().map(ClassMember::display).collect(),
            ];
        }
        self.model
    }
}

pub fn parse(ctx: &mut ParseContext<'_, '_>) -> Result<ClassModel> {
    let mut db = ClassDb::default();

    for line in ctx.body() {
        if let Some(class) = db.body.clone() {
            let text = line.text.trim();
            match text.rfind('}') {
                Some(i) => {
                    db.add_member(&class, &text[..i]);
                    db.body = None;
                }
                None => db.add_member(&class, text),
            }
            continue;
        }
        if db.model.common.accept(&line) {
            continue;
        }
        let Some(first) = line.first().copied() else {
            continue;
        };

        let outcome = match first.text {
            "class" if first.kind == TokenKind::Keyword => db.declare(&line),
            "note" if first.kind == TokenKind::Keyword => db.note(&line),
            "direction" if first.kind == TokenKind::Keyword => {
                match line.tokens.get(1).and_then(|t| Direction::parse(t.text)) {
                    Some(dir) => {
                        db.model.graph.set_direction(dir);
                        Ok(())
                    }
                    None => Err("invalid direction".to_string()),
                }
            }
            "namespace" => match line.tokens.get(1).filter(|t| t.is_word()) {
                Some(name) => {
                    let parent = db.namespaces.last().copied();
                    let ix = db.model.graph.add_subgraph(Subgraph {
                        parent,
                        ..Subgraph::new(name.text, name.text)
                    });
                    db.namespaces.push(ix);
                    Ok(())
                }
                None => Err("namespace needs a name".to_string()),
            },
            "}" => match db.namespaces.pop() {
                Some(_) => Ok(()),
                None => Err("unbalanced `}`".to_string()),
            },
            "classDef" | "cssClass" | "style" | "click" | "link" | "callback" => Ok(()),
            _ if line.text.starts_with("<<") => match line.text[2..].split_once(">>") {
                Some((annotation, class)) if !class.trim().is_empty() => {
                    db.add_class(class.trim())
                        .annotations
                        .push(annotation.trim().to_string());
                    Ok(())
                }
                _ => Err("annotation without a class".to_string()),
            },
            _ => match db.relation(&line) {
                Some(outcome) => outcome,
                None if first.is_word() && line.tokens.get(1).is_some_and(|t| t.is(":")) => {
                    let class = first.text.to_string();
                    db.add_member(&class, line.text_after(1));
                    Ok(())
                }
                None => Err(format!("unrecognized statement `{}`", line.text)),
            },
        };
        if let Err(message) = outcome {
            ctx.skip(&line, message);
        }
        ctx.check_graph(&db.model.graph)?;
    }

    Ok(db.finish())
}
