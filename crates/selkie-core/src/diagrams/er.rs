use super::{Common, non_empty, normalize_label, unquote};
use crate::lex::{Line, Token, TokenKind};
use crate::{ParseContext, Result};
use indexmap::IndexMap;
use selkie_graph::{ArrowHead, Direction, Edge, EdgeStyle, Graph, Node, NodeShape};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErModel {
    #[serde(flatten)]
    pub common: Common,
    pub graph: Graph,
    pub entities: IndexMap<String, Entity>,
    pub relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    #[serde(default)]
    pub alias: Option<String>,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    #[serde(rename = "type")]
    pub ty: String,
    pub name: String,
    /// `PK`, `FK`, `UK`.
    pub keys: Vec<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cardinality {
    ZeroOrOne,
    ExactlyOne,
    ZeroOrMore,
    OneOrMore,
}

impl Cardinality {
    /// Marker on the left entity's side: `|o`, `||`, `}o`, `}|`.
    fn from_left(s: &str) -> Option<Self> {
        Some(match s {
            "|o" => Self::ZeroOrOne,
            "||" => Self::ExactlyOne,
            "}o" => Self::ZeroOrMore,
            "}|" => Self::OneOrMore,
            _ => return None,
        })
    }

    /// Marker on the right entity's side: `o|`, `||`, `o{`, `|{`.
    fn from_right(s: &str) -> Option<Self> {
        Some(match s {
            "o|" => Self::ZeroOrOne,
            "||" => Self::ExactlyOne,
            "o{" => Self::ZeroOrMore,
            "|{" => Self::OneOrMore,
            _ => return None,
        })
    }

    fn arrow(self) -> ArrowHead {
        match self {
            Self::ZeroOrOne => ArrowHead::ZeroOrOne,
            Self::ExactlyOne => ArrowHead::ExactlyOne,
            Self::ZeroOrMore => ArrowHead::ZeroOrMore,
            Self::OneOrMore => ArrowHead::OneOrMore,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub from: String,
    pub to: String,
    pub cardinality_from: Cardinality,
    pub cardinality_to: Cardinality,
    /// `--` (identifying) versus `..` (non-identifying).
    pub identifying: bool,
    #[serde(default)]
    pub label: Option<String>,
}

/// `||--o{` -> (ExactlyOne, ZeroOrMore, identifying).
fn parse_relationship(s: &str) -> Option<(Cardinality, Cardinality, bool)> {
    if s.len() != 6 || !s.is_ascii() {
        return None;
    }
    let identifying = match &s[2..4] {
        "--" => true,
        ".." => false,
        _ => return None,
    };
    Some((
        Cardinality::from_left(&s[..2])?,
        Cardinality::from_right(&s[4..])?,
        identifying,
    ))
}

/// An entity name starting at token `ix`: a quoted string, or words joined by touching `-`
/// (`LINE-ITEM`). Returns the name and the index just past it.
fn entity_name(line: &Line<'_, '_>, ix: usize) -> Option<(String, usize)> {
    let first = line.tokens.get(ix)?;
    if first.kind == TokenKind::QuotedString {
        return Some((first.unquoted().to_string(), ix + 1));
    }
    if !first.is_word() {
        return None;
    }
    let (_, mut end) = line.glue(ix, |t: &Token<'_>| t.is_word() || t.is("-"));
    while end > ix + 1 && line.tokens[end - 1].is("-") {
        end -= 1;
    }
    Some((line.text_between(ix, end).to_string(), end))
}

fn is_relationship_piece(t: &Token<'_>) -> bool {
    match t.kind {
        TokenKind::Operator => t.text != ":",
        TokenKind::Bracket => matches!(t.text, "{" | "}"),
        TokenKind::Identifier => t.text == "o",
        _ => false,
    }
}

fn parse_attribute(line: &Line<'_, '_>) -> Option<Attribute> {
    let toks = line.tokens;
    let ty_end = if toks.get(1).is_some_and(|t| t.is("(") || t.is("[")) {
        // `varchar(255) name`, `string[] tags`
        toks.iter().position(|t| t.is(")") || t.is("]"))? + 1
    } else {
        1
    };
    let ty = line.text_between(0, ty_end).to_string();
    let name = toks.get(ty_end).filter(|t| t.is_word())?.text.to_string();
    let mut keys = Vec::new();
    let mut comment = None;
    for t in &toks[ty_end + 1..] {
        match t.kind {
            TokenKind::QuotedString => comment = non_empty(t.unquoted()),
            TokenKind::Identifier if matches!(t.text, "PK" | "FK" | "UK") => {
                keys.push(t.text.to_string())
            }
            _ => {}
        }
    }
    Some(Attribute {
        ty,
        name,
        keys,
        comment,
    })
}

#[derive(Default)]
struct ErDb {
    model: ErModel,
    /// Entity whose attribute block is open.
    block: Option<String>,
}

impl ErDb {
    fn add_entity(&mut self, id: &str) -> &mut Entity {
        if !self.model.entities.contains_key(id) {
            self.model
                .graph
                .add_node(Node::new(id, id, NodeShape::EntityBox));
        }
        self.model
            .entities
            .entry(id.to_string())
            .or_insert_with(|| Entity {
                id: id.to_string(),
                ..Entity::default()
            })
    }

    /// `A`, `A {`, `A["Display"]`, `A["Display"] {`.
    fn declare(&mut self, line: &Line<'_, '_>) -> std::result::Result<(), String> {
        let toks = line.tokens;
        let Some((name, mut i)) = entity_name(line, 0) else {
            return Err(format!("unrecognized statement `{}`", line.text));
        };
        let id = name.as_str();
        let mut alias = None;
        if toks.get(i).is_some_and(|t| t.is("[")) {
            let Some(close) = line.find(i + 1, "]") else {
                return Err("unterminated entity alias".to_string());
            };
            alias = non_empty(unquote(line.text_between(i + 1, close)));
            i = close + 1;
        }
        let entity = self.add_entity(id);
        if alias.is_some() {
            entity.alias = alias;
        }
        match toks.get(i) {
            None => Ok(()),
            Some(t) if t.is("{") => {
                if toks.last().is_some_and(|t| t.is("}")) && toks.len() > i + 1 {
                    return Ok(());
                }
                self.block = Some(id.to_string());
                Ok(())
            }
            Some(t) => Err(format!("unexpected `{}` after entity name", t.text)),
        }
    }

    fn relationship(&mut self, line: &Line<'_, '_>) -> Option<std::result::Result<(), String>> {
        let toks = line.tokens;
        let (from_id, after_from) = entity_name(line, 0)?;
        let (glued, next) = line.glue(after_from, is_relationship_piece);
        let (cardinality_from, cardinality_to, identifying) = parse_relationship(glued)?;
        let Some((to_id, after_to)) = entity_name(line, next) else {
            return Some(Err("relationship without a second entity".to_string()));
        };
        let label = match toks.get(after_to) {
            Some(t) if t.is(":") => non_empty(&normalize_label(unquote(line.text_after(after_to)))),
            Some(t) => return Some(Err(format!("unexpected `{}` after `{to_id}`", t.text))),
            None => None,
        };
        self.add_entity(&from_id);
        self.add_entity(&to_id);
        let edge = Edge::new(from_id.clone(), to_id.clone())
            .with_label(label.clone())
            .with_style(if identifying {
                EdgeStyle::Solid
            } else {
                EdgeStyle::Dotted
            })
            .with_arrows(cardinality_from.arrow(), cardinality_to.arrow());
        self.model.graph.add_edge(edge);
        self.model.relationships.push(Relationship {
            from: from_id,
            to: to_id,
            cardinality_from,
            cardinality_to,
            identifying,
            label,
        });
        Some(Ok(()))
    }

    fn finish(mut self) -> ErModel {
        for entity in self.model.entities.values() {
            let Some(node) = self.model.graph.node_mut(&entity.id) else {
                continue;
            };
            node.label = entity.alias.clone().unwrap_or_else(|| entity.id.clone());
            node.shape = NodeShape::EntityBox;
            if !entity.attributes.is_empty() {
                node.compartments = vec![
                    entity
                        .attributes
                        .iter()
                        .map(|a| {
                            let mut row = format!("{} {}", a.ty, a.name);
                            if !a.keys.is_empty() {
                                row.push(' ');
                                row.push_str(&a.keys.join(","));
                            }
                            row
                        })
                        .collect(),
                ];
            }
        }
        self.model
    }
}

pub fn parse(ctx: &mut ParseContext<'_, '_>) -> Result<ErModel> {
    let mut db = ErDb::default();

    for line in ctx.body() {
        if let Some(entity) = db.block.clone() {
            if line.first().is_some_and(|t| t.is("}")) {
                db.block = None;
                continue;
            }
            match parse_attribute(&line) {
                Some(attr) => db.add_entity(&entity).attributes.push(attr),
                None => ctx.skip(&line, "invalid attribute"),
            }
            if line.tokens.last().is_some_and(|t| t.is("}")) {
                db.block = None;
            }
            continue;
        }
        if db.model.common.accept(&line) {
            continue;
        }
        let Some(first) = line.first().copied() else {
            continue;
        };
        if first.is("direction") {
            match line.tokens.get(1).and_then(|t| Direction::parse(t.text)) {
                Some(dir) => db.model.graph.set_direction(dir),
                None => ctx.skip(&line, "invalid direction"),
            }
            continue;
        }
        let outcome = match db.relationship(&line) {
            Some(outcome) => outcome,
            None if first.is_word() => db.declare(&line),
            None => Err(format!("unrecognized statement `{}`", line.text)),
        };
        if let Err(message) = outcome {
            ctx.skip(&line, message);
        }
        ctx.check_graph(&db.model.graph)?;
    }

    Ok(db.finish())
}
