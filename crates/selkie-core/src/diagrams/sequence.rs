use super::{Common, normalize_label};
use crate::lex::{Line, Token, TokenKind};
use crate::{ParseContext, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceModel {
    #[serde(flatten)]
    pub common: Common,
    pub participants: Vec<Participant>,
    pub events: Vec<SequenceEvent>,
    pub autonumber: bool,
}

impl SequenceModel {
    pub fn participant_index(&self, id: &str) -> Option<usize> {
        self.participants.iter().position(|p| p.id == id)
    }

    /// Number of messages, counting those nested in blocks.
    pub fn message_count(&self) -> usize {
        fn count(events: &[SequenceEvent]) -> usize {
            events
                .iter()
                .map(|e| match e {
                    SequenceEvent::Message(_) => 1,
                    SequenceEvent::Block(b) => b.sections.iter().map(|s| count(&s.events)).sum(),
                    _ => 0,
                })
                .sum()
        }
        count(&self.events)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParticipantKind {
    #[default]
    Participant,
    Actor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub label: String,
    pub kind: ParticipantKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SequenceEvent {
    Message(Message),
    Note(SequenceNote),
    Activate { actor: String },
    Deactivate { actor: String },
    Block(Block),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LineStyle {
    Solid,
    Dotted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageHead {
    /// `->`
    None,
    /// `->>`
    Arrow,
    /// `-x`
    Cross,
    /// `-)`
    Async,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub from: String,
    pub to: String,
    pub text: String,
    pub line: LineStyle,
    pub head: MessageHead,
    /// `+` suffix: activates the receiver.
    pub activate: bool,
    /// `-` suffix: deactivates the sender.
    pub deactivate: bool,
    /// Sequence number when `autonumber` is on.
    #[serde(default)]
    pub number: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotePlacement {
    LeftOf,
    RightOf,
    Over,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceNote {
    pub placement: NotePlacement,
    /// One participant, or two for `over A,B`.
    pub actors: Vec<String>,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    Loop,
    Alt,
    Opt,
    Par,
    Critical,
    Break,
    Rect,
}

impl BlockKind {
    fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "loop" => Self::Loop,
            "alt" => Self::Alt,
            "opt" => Self::Opt,
            "par" => Self::Par,
            "critical" => Self::Critical,
            "break" => Self::Break,
            "rect" => Self::Rect,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Loop => "loop",
            Self::Alt => "alt",
            Self::Opt => "opt",
            Self::Par => "par",
            Self::Critical => "critical",
            Self::Break => "break",
            Self::Rect => "rect",
        }
    }

    /// Keyword that starts another section of this block, if any.
    pub fn section_keyword(self) -> Option<&'static str> {
        match self {
            Self::Alt => Some("else"),
            Self::Par => Some("and"),
            Self::Critical => Some("option"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub kind: BlockKind,
    pub sections: Vec<BlockSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSection {
    pub label: String,
    pub events: Vec<SequenceEvent>,
}

/// Deepest `loop`/`alt`/... nesting kept in the model. Deeper blocks are skipped and their
/// statements land in the innermost kept block.
pub const MAX_BLOCK_DEPTH: usize = 64;

/// Longest core arrows first.
const ARROWS: &[(&str, LineStyle, MessageHead)] = &[
    ("-->>", LineStyle::Dotted, MessageHead::Arrow),
    ("->>", LineStyle::Solid, MessageHead::Arrow),
    ("--x", LineStyle::Dotted, MessageHead::Cross),
    ("-x", LineStyle::Solid, MessageHead::Cross),
    ("--)", LineStyle::Dotted, MessageHead::Async),
    ("-)", LineStyle::Solid, MessageHead::Async),
    ("-->", LineStyle::Dotted, MessageHead::None),
    ("->", LineStyle::Solid, MessageHead::None),
];

enum Frame {
    Block(Block),
    /// `box ... end` groups participants and carries no events.
    Box,
}

#[derive(Default)]
struct SequenceDb {
    model: SequenceModel,
    stack: Vec<Frame>,
    /// Blocks opened past `MAX_BLOCK_DEPTH` that still wait for their `end`.
    skipped_blocks: usize,
    messages: usize,
    next_number: usize,
}

impl SequenceDb {
    fn ensure_participant(&mut self, id: &str) {
        if self.model.participant_index(id).is_none() {
            self.model.participants.push(Participant {
                id: id.to_string(),
                label: id.to_string(),
                kind: ParticipantKind::Participant,
            });
        }
    }

    fn push_event(&mut self, event: SequenceEvent) {
        let innermost = self.stack.iter_mut().rev().find_map(|f| match f {
            Frame::Block(b) => Some(b),
            Frame::Box => None,
        });
        match innermost.and_then(|b| b.sections.last_mut()) {
            Some(section) => section.events.push(event),
            None => self.model.events.push(event),
        }
    }

    fn participant(
        &mut self,
        line: &Line<'_, '_>,
        kind: ParticipantKind,
    ) -> std::result::Result<(), String> {
        let Some(id) = line
            .tokens
            .get(1)
            .filter(|t| t.is_word() || t.kind == TokenKind::QuotedString)
        else {
            return Err("participant needs a name".to_string());
        };
        let id = id.unquoted().to_string();
        let label = match line.tokens.get(2) {
            Some(t) if t.is("as") => normalize_label(line.text_after(2)),
            _ => id.clone(),
        };
        match self.model.participant_index(&id) {
            Some(ix) => {
                let p = &mut self.model.participants[ix];
                p.label = label;
                p.kind = kind;
            }
            None => self.model.participants.push(Participant { id, label, kind }),
        }
        Ok(())
    }

    fn note(&mut self, line: &Line<'_, '_>) -> std::result::Result<(), String> {
        let toks = line.tokens;
        let (placement, at) = match (toks.get(1).map(|t| t.text), toks.get(2).map(|t| t.text)) {
            (Some("left"), Some("of")) => (NotePlacement::LeftOf, 3),
            (Some("right"), Some("of")) => (NotePlacement::RightOf, 3),
            (Some("over"), _) => (NotePlacement::Over, 2),
            _ => return Err("expected `note left of`, `note right of` or `note over`".to_string()),
        };
        let Some(colon) = line.find(at, ":") else {
            return Err("note without text".to_string());
        };
        let actors: Vec<String> = line
            .text_between(at, colon)
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if actors.is_empty() {
            return Err("note without a participant".to_string());
        }
        for a in &actors {
            self.ensure_participant(a);
        }
        let text = normalize_label(line.text_after(colon));
        self.push_event(SequenceEvent::Note(SequenceNote {
            placement,
            actors,
            text,
        }));
        Ok(())
    }

    fn block_depth(&self) -> usize {
        self.stack
            .iter()
            .filter(|f| matches!(f, Frame::Block(_)))
            .count()
    }

    fn open_block(
        &mut self,
        kind: BlockKind,
        line: &Line<'_, '_>,
    ) -> std::result::Result<(), String> {
        if self.skipped_blocks > 0 || self.block_depth() >= MAX_BLOCK_DEPTH {
            self.skipped_blocks += 1;
            return Err(format!(
                "`{}` block nested deeper than {MAX_BLOCK_DEPTH} levels",
                kind.keyword()
            ));
        }
        self.stack.push(Frame::Block(Block {
            kind,
            sections: vec![BlockSection {
                label: line.text_after(0).to_string(),
                events: Vec::new(),
            }],
        }));
        Ok(())
    }

    fn next_section(
        &mut self,
        keyword: &str,
        line: &Line<'_, '_>,
    ) -> std::result::Result<(), String> {
        if self.skipped_blocks > 0 {
            return Err(format!("`{keyword}` inside a block nested too deeply"));
        }
        match self.stack.last_mut() {
            Some(Frame::Block(b)) if b.kind.section_keyword() == Some(keyword) => {
                b.sections.push(BlockSection {
                    label: line.text_after(0).to_string(),
                    events: Vec::new(),
                });
                Ok(())
            }
            _ => Err(format!("`{keyword}` outside of a matching block")),
        }
    }

    fn close(&mut self) -> std::result::Result<(), String> {
        if self.skipped_blocks > 0 {
            self.skipped_blocks -= 1;
            return Ok(());
        }
        match self.stack.pop() {
            Some(Frame::Block(b)) => {
                self.push_event(SequenceEvent::Block(b));
                Ok(())
            }
            Some(Frame::Box) => Ok(()),
            None => Err("`end` without an open block".to_string()),
        }
    }

    fn message(&mut self, line: &Line<'_, '_>) -> Option<std::result::Result<(), String>> {
        let toks = line.tokens;
        let from = toks.first().filter(|t| t.is_word())?;
        let (glued, mut next) = line.glue(1, |t: &Token<'_>| {
            t.kind == TokenKind::Operator && t.text != ":" || t.is(")")
        });
        if glued.is_empty() {
            return None;
        }
        let mut arrow = glued.to_string();
        let mut receiver_trim = 0;
        // `A-xB`: the cross head was read as part of the receiver's name.
        if arrow == "-"
            && toks.get(next).is_some_and(|t| {
                t.is_word()
                    && t.text.len() > 1
                    && t.text.starts_with('x')
                    && t.offset == toks[next - 1].end()
            })
        {
            arrow.push('x');
            receiver_trim = 1;
        }
        let (core, line_style, head) = ARROWS
            .iter()
            .copied()
            .find(|(a, _, _)| arrow.starts_with(a))?;

        let (activate, deactivate) = match &arrow[core.len()..] {
            "" => (false, false),
            "+" => (true, false),
            "-" => (false, true),
            other => return Some(Err(format!("unknown activation marker `{other}`"))),
        };

        let Some(to_tok) = toks.get(next).filter(|t| t.is_word()) else {
            return Some(Err("message without a receiver".to_string()));
        };
        let to = &to_tok.text[receiver_trim..];
        if to.is_empty() {
            return Some(Err("message without a receiver".to_string()));
        }
        next += 1;
        let text = match toks.get(next) {
            Some(t) if t.is(":") => normalize_label(line.text_after(next)),
            Some(t) => return Some(Err(format!("unexpected `{}` after receiver", t.text))),
            None => String::new(),
        };

        self.ensure_participant(from.text);
        self.ensure_participant(to);
        let number = self.model.autonumber.then(|| {
            self.next_number += 1;
            self.next_number
        });
        self.messages += 1;
        self.push_event(SequenceEvent::Message(Message {
            from: from.text.to_string(),
            to: to.to_string(),
            text,
            line: line_style,
            head,
            activate,
            deactivate,
            number,
        }));
        if activate {
            self.push_event(SequenceEvent::Activate {
                actor: to.to_string(),
            });
        }
        if deactivate {
            self.push_event(SequenceEvent::Deactivate {
                actor: from.text.to_string(),
            });
        }
        Some(Ok(()))
    }
}

pub fn parse(ctx: &mut ParseContext<'_, '_>) -> Result<SequenceModel> {
    let mut db = SequenceDb::default();

    for line in ctx.body() {
        if db.model.common.accept(&line) {
            continue;
        }
        let Some(first) = line.first().copied() else {
            continue;
        };
        let word = if first.is_word() { first.text } else { "" };
        let outcome = if let Some(kind) =
            BlockKind::from_keyword(word).filter(|_| opens_block(&line))
        {
            db.open_block(kind, &line)
        } else {
            match word {
                "participant" => db.participant(&line, ParticipantKind::Participant),
                "actor" => db.participant(&line, ParticipantKind::Actor),
                "create" => match line.tokens.get(1).map(|t| t.text) {
                    Some(kind @ ("participant" | "actor")) => {
                        let declared = Line {
                            tokens: &line.tokens[1..],
                            text: line.text_from(1),
                            ..line
                        };
                        db.participant(
                            &declared,
                            if kind == "actor" {
                                ParticipantKind::Actor
                            } else {
                                ParticipantKind::Participant
                            },
                        )
                    }
                    _ => Err("`create` needs `participant` or `actor`".to_string()),
                },
                "destroy" | "links" | "link" | "properties" | "details" => Ok(()),
                "autonumber" => {
                    db.model.autonumber = !line.tokens.get(1).is_some_and(|t| t.is("off"));
                    Ok(())
                }
                "activate" | "deactivate" => match line.tokens.get(1).filter(|t| t.is_word()) {
                    Some(actor) => {
                        db.ensure_participant(actor.text);
                        let actor = actor.text.to_string();
                        db.push_event(if word == "activate" {
                            SequenceEvent::Activate { actor }
                        } else {
                            SequenceEvent::Deactivate { actor }
                        });
                        Ok(())
                    }
                    None => Err(format!("{word} needs a participant")),
                },
                "note" | "Note" => db.note(&line),
                "box" => {
                    db.stack.push(Frame::Box);
                    Ok(())
                }
                "end" if line.tokens.len() == 1 => db.close(),
                "else" | "and" | "option" => db.next_section(word, &line),
                _ => match db.message(&line) {
                    Some(outcome) => outcome,
                    None => Err(format!("unrecognized statement `{}`", line.text)),
                },
            }
        };
        if let Err(message) = outcome {
            ctx.skip(&line, message);
        }
        ctx.check_nodes(db.model.participants.len())?;
        ctx.check_edges(db.messages)?;
    }

    while !db.stack.is_empty() {
        tracing::debug!("closing block left open at end of input");
        let _ = db.close();
    }
    Ok(db.model)
}

/// A block keyword only opens a block when it is not itself a message sender (`loop->>A: x`).
fn opens_block(line: &Line<'_, '_>) -> bool {
    !line
        .tokens
        .get(1)
        .is_some_and(|t| t.kind == TokenKind::Operator && t.offset == line.tokens[0].end())
}
