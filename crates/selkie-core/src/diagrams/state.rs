use super::{Common, non_empty, normalize_label};
use crate::lex::{Line, TokenKind};
use crate::{ParseContext, Result};
use indexmap::IndexMap;
use selkie_graph::{ArrowHead, Direction, Edge, EdgeStyle, Graph, Node, NodeShape, Subgraph};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateModel {
    #[serde(flatten)]
    pub common: Common,
    pub graph: Graph,
    pub states: IndexMap<String, StateInfo>,
    pub transitions: Vec<Transition>,
    pub notes: Vec<StateNote>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StateKind {
    #[default]
    Normal,
    Start,
    End,
    Fork,
    Join,
    Choice,
    Composite,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateInfo {
    pub id: String,
    pub label: String,
    pub kind: StateKind,
    pub descriptions: Vec<String>,
    /// Enclosing composite state.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub direction: Option<Direction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotePosition {
    LeftOf,
    RightOf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateNote {
    pub id: String,
    pub target: String,
    pub position: NotePosition,
    pub text: String,
}

enum Endpoint {
    /// `[*]`
    Pseudo,
    State(String),
}

#[derive(Default)]
struct StateDb {
    model: StateModel,
    /// Open composite states, innermost last.
    scopes: Vec<String>,
    /// Multi-line note being collected: target, position, text so far.
    open_note: Option<(String, NotePosition, String)>,
}

impl StateDb {
    fn scope(&self) -> Option<&String> {
        self.scopes.last()
    }

    fn pseudo_id(&self, start: bool) -> String {
        let scope = self.scope().map_or("root", String::as_str);
        format!("{scope}_{}", if start { "start" } else { "end" })
    }

    fn add_state(&mut self, id: &str, kind: StateKind) -> &mut StateInfo {
        let parent = self.scope().cloned();
        let info = self
            .model
            .states
            .entry(id.to_string())
            .or_insert_with(|| StateInfo {
                id: id.to_string(),
                label: id.to_string(),
                parent,
                ..StateInfo::default()
            });
        if kind != StateKind::Normal {
            info.kind = kind;
        }
        info
    }

    fn endpoint_id(&mut self, ep: Endpoint, start: bool) -> String {
        match ep {
            Endpoint::Pseudo => {
                let id = self.pseudo_id(start);
                let kind = if start {
                    StateKind::Start
                } else {
                    StateKind::End
                };
                let info = self.add_state(&id, kind);
                info.label = String::new();
                id
            }
            Endpoint::State(id) => {
                self.add_state(&id, StateKind::Normal);
                id
            }
        }
    }

    fn state_statement(&mut self, line: &Line<'_, '_>) -> std::result::Result<(), String> {
        let toks = line.tokens;
        let Some(second) = toks.get(1) else {
            return Err("state needs a name".to_string());
        };
        let (id, label, mut i) = if second.kind == TokenKind::QuotedString {
            match (toks.get(2), toks.get(3)) {
                (Some(a), Some(id)) if a.is("as") && id.is_word() => {
                    (id.text.to_string(), Some(normalize_label(second.unquoted())), 4)
                }
                _ => return Err("expected `state \"description\" as id`".to_string()),
            }
        } else if second.is_word() {
            (second.text.to_string(), None, 2)
        } else {
            return Err(format!("invalid state name `{}`", second.text));
        };

        let mut kind = StateKind::Normal;
        if toks.get(i).is_some_and(|t| t.is("<<")) {
            kind = match toks.get(i + 1).map(|t| t.text) {
                Some("fork") => StateKind::Fork,
                Some("join") => StateKind::Join,
                Some("choice") => StateKind::Choice,
                other => return Err(format!("unknown state type {other:?}")),
            };
            i += 3;
        }
        let opens = toks.get(i).is_some_and(|t| t.is("{"));
        if opens {
            kind = StateKind::Composite;
        }
        let info = self.add_state(&id, kind);
        if let Some(label) = label {
            info.label = label;
        }
        if !opens && toks.get(i).is_some_and(|t| t.is(":")) {
            if let Some(d) = non_empty(line.text_after(i)) {
                info.descriptions.push(d);
            }
        }
        if matches!(kind, StateKind::Fork | StateKind::Join) {
            info.label = String::new();
        }
        if opens {
            self.scopes.push(id);
        }
        Ok(())
    }

    fn note(&mut self, line: &Line<'_, '_>) -> std::result::Result<(), String> {
        let toks = line.tokens;
        let position = match (toks.get(1).map(|t| t.text), toks.get(2).map(|t| t.text)) {
            (Some("left"), Some("of")) => NotePosition::LeftOf,
            (Some("right"), Some("of")) => NotePosition::RightOf,
            _ => return Err("expected `note left of` or `note right of`".to_string()),
        };
        let Some(target) = toks.get(3).filter(|t| t.is_word()) else {
            return Err("note without a target state".to_string());
        };
        self.add_state(target.text, StateKind::Normal);
        match toks.get(4) {
            Some(t) if t.is(":") => {
                let text = normalize_label(line.text_after(4));
                self.push_note(target.text.to_string(), position, text);
            }
            _ => self.open_note = Some((target.text.to_string(), position, String::new())),
        }
        Ok(())
    }

    fn push_note(&mut self, target: String, position: NotePosition, text: String) {
        let id = format!("note{}", self.model.notes.len());
        self.model.notes.push(StateNote {
            id,
            target,
            position,
            text,
        });
    }

    fn transition(&mut self, line: &Line<'_, '_>) -> Option<std::result::Result<(), String>> {
        let (from, i) = parse_endpoint(line, 0)?;
        let arrow = line.tokens.get(i)?;
        if arrow.kind != TokenKind::Operator || !arrow.text.starts_with("--") {
            return None;
        }
        let Some((to, j)) = parse_endpoint(line, i + 1) else {
            return Some(Err("transition without a target state".to_string()));
        };
        let label = match line.tokens.get(j) {
            Some(t) if t.is(":") => non_empty(&normalize_label(line.text_after(j))),
            _ => None,
        };
        let from = self.endpoint_id(from, true);
        let to = self.endpoint_id(to, false);
        self.model.transitions.push(Transition { from, to, label });
        Some(Ok(()))
    }

    /// Builds the graph: composites become subgraphs, everything else becomes a node inside its
    /// composite. Transitions touching a composite attach to its first plain descendant.
    fn finish(mut self) -> StateModel {
        let model = &mut self.model;
        let is_composite = |info: &StateInfo| info.kind == StateKind::Composite;

        let mut sub_ix: IndexMap<String, usize> = IndexMap::new();
        for info in model.states.values().filter(|i| is_composite(*i)) {
            let parent = info.parent.as_ref().and_then(|p| sub_ix.get(p).copied());
            let ix = model.graph.add_subgraph(Subgraph {
                parent,
                direction: info.direction,
                ..Subgraph::new(info.id.clone(), info.label.clone())
            });
            sub_ix.insert(info.id.clone(), ix);
        }

        for info in model.states.values().filter(|i| !is_composite(*i)) {
            let shape = match info.kind {
                StateKind::Start => NodeShape::StateStart,
                StateKind::End => NodeShape::StateEnd,
                StateKind::Fork => NodeShape::Fork,
                StateKind::Join => NodeShape::Join,
                StateKind::Choice => NodeShape::Choice,
                StateKind::Normal | StateKind::Composite => NodeShape::Rounded,
            };
            let mut node = Node::new(info.id.clone(), info.label.clone(), shape);
            if !info.descriptions.is_empty() {
                node.compartments = vec![info.descriptions.clone()];
            }
            model.graph.add_node(node);
            if let Some(&ix) = info.parent.as_ref().and_then(|p| sub_ix.get(p)) {
                model.graph.add_member(ix, &info.id);
            }
        }

        let anchor = |id: &str| -> String {
            if !sub_ix.contains_key(id) {
                return id.to_string();
            }
            first_plain_descendant(&model.states, id).unwrap_or_else(|| id.to_string())
        };
        let edges: Vec<Edge> = model
            .transitions
            .iter()
            .map(|t| Edge::new(anchor(&t.from), anchor(&t.to)).with_label(t.label.clone()))
            .collect();
        for edge in edges {
            model.graph.add_edge(edge);
        }

        for note in &model.notes {
            model
                .graph
                .add_node(Node::new(note.id.clone(), note.text.clone(), NodeShape::Note));
            let target = anchor(&note.target);
            let edge = match note.position {
                NotePosition::LeftOf => Edge::new(note.id.clone(), target),
                NotePosition::RightOf => Edge::new(target, note.id.clone()),
            };
            model.graph.add_edge(
                edge.with_style(EdgeStyle::Dotted)
                    .with_arrows(ArrowHead::None, ArrowHead::None),
            );
        }
        self.model
    }
}

/// The state a transition into or out of `composite` attaches to: its first descendant that is
/// neither a composite nor a `[*]` pseudo-state, in declaration order. Falls back to a pseudo-state
/// when the composite holds nothing else.
fn first_plain_descendant(states: &IndexMap<String, StateInfo>, composite: &str) -> Option<String> {
    let children = |parent: &str| -> Vec<&StateInfo> {
        states
            .values()
            .filter(|info| info.parent.as_deref() == Some(parent))
            .collect()
    };
    let mut fallback = None;
    let mut stack: Vec<&StateInfo> = children(composite);
    stack.reverse();
    while let Some(info) = stack.pop() {
        match info.kind {
            StateKind::Composite => stack.extend(children(&info.id).into_iter().rev()),
            StateKind::Start | StateKind::End => {
                fallback.get_or_insert_with(|| info.id.clone());
            }
            _ => return Some(info.id.clone()),
        }
    }
    fallback
}

fn parse_endpoint(line: &Line<'_, '_>, i: usize) -> Option<(Endpoint, usize)> {
    let t = line.tokens.get(i)?;
    if t.is("[") {
        let star = line.tokens.get(i + 1)?;
        let close = line.tokens.get(i + 2)?;
        return (star.is("*") && close.is("]")).then_some((Endpoint::Pseudo, i + 3));
    }
    t.is_word()
        .then(|| (Endpoint::State(t.text.to_string()), i + 1))
}

pub fn parse(ctx: &mut ParseContext<'_, '_>) -> Result<StateModel> {
    let mut db = StateDb::default();

    for line in ctx.body() {
        if let Some((target, position, mut text)) = db.open_note.take() {
            if line.text.trim() == "end note" {
                db.push_note(target, position, text.trim().to_string());
            } else {
                text.push_str(line.text.trim());
                text.push('\n');
                db.open_note = Some((target, position, text));
            }
            continue;
        }
        if db.model.common.accept(&line) {
            continue;
        }
        let Some(first) = line.first().copied() else {
            continue;
        };
        let keyword = first.kind == TokenKind::Keyword;
        let outcome = match first.text {
            "state" if keyword => db.state_statement(&line),
            "note" if keyword => db.note(&line),
            "direction" if keyword => {
                match line.tokens.get(1).and_then(|t| Direction::parse(t.text)) {
                    Some(dir) => {
                        match db.scope().cloned() {
                            Some(scope) => {
                                db.add_state(&scope, StateKind::Composite).direction = Some(dir)
                            }
                            None => db.model.graph.set_direction(dir),
                        }
                        Ok(())
                    }
                    None => Err("invalid direction".to_string()),
                }
            }
            "}" => match db.scopes.pop() {
                Some(_) => Ok(()),
                None => Err("unbalanced `}`".to_string()),
            },
            // Concurrent region separator.
            "--" if line.tokens.len() == 1 => Ok(()),
            "hide" | "scale" | "classDef" | "class" | "style" => Ok(()),
            _ => match db.transition(&line) {
                Some(outcome) => outcome,
                None => match (line.tokens.get(1), line.tokens.len()) {
                    (_, 1) if first.is_word() => {
                        db.add_state(first.text, StateKind::Normal);
                        Ok(())
                    }
                    (Some(colon), _) if first.is_word() && colon.is(":") => {
                        let desc = non_empty(line.text_after(1));
                        let info = db.add_state(first.text, StateKind::Normal);
                        info.descriptions.extend(desc);
                        Ok(())
                    }
                    _ => Err(format!("unrecognized statement `{}`", line.text)),
                },
            },
        };
        if let Err(message) = outcome {
            ctx.skip(&line, message);
        }
        ctx.check_nodes(db.model.states.len() + db.model.notes.len())?;
        ctx.check_edges(db.model.transitions.len() + db.model.notes.len())?;
    }

    Ok(db.finish())
}
