use crate::model::{
    ActivationLayout, BlockLayout, BlockSectionLayout, Bounds, MessageLayout, NoteLayout,
    ParticipantLayout, SequenceLayout,
};
use crate::{cfg_f64, font_size};
use rustc_hash::FxHashMap;
use selkie_core::Config;
use selkie_core::diagrams::sequence::{
    Block, Message, NotePlacement, Participant, SequenceEvent, SequenceModel, SequenceNote,
};
use selkie_graph::{Point, Rect};
use selkie_layout::position::measure;
use selkie_layout::{TextMeasurer, TextStyle};

const SELF_LOOP_WIDTH: f64 = 30.0;
const SELF_LOOP_HEIGHT: f64 = 20.0;
const LABEL_GAP: f64 = 2.0;

#[derive(Debug, Clone)]
struct SequenceConfig {
    actor_margin: f64,
    width: f64,
    height: f64,
    box_margin: f64,
    note_margin: f64,
    message_margin: f64,
    activation_width: f64,
    margin_x: f64,
    margin_y: f64,
    style: TextStyle,
}

impl SequenceConfig {
    fn from_config(cfg: &Config) -> Self {
        Self {
            actor_margin: cfg_f64(cfg, "sequence.actorMargin", 50.0),
            width: cfg_f64(cfg, "sequence.width", 150.0),
            height: cfg_f64(cfg, "sequence.height", 65.0),
            box_margin: cfg_f64(cfg, "sequence.boxMargin", 10.0),
            note_margin: cfg_f64(cfg, "sequence.noteMargin", 10.0),
            message_margin: cfg_f64(cfg, "sequence.messageMargin", 35.0),
            activation_width: cfg_f64(cfg, "sequence.activationWidth", 10.0),
            margin_x: cfg_f64(cfg, "sequence.diagramMarginX", 50.0),
            margin_y: cfg_f64(cfg, "sequence.diagramMarginY", 10.0),
            style: TextStyle::sized(font_size(cfg)),
        }
    }
}

/// Horizontal extent of whatever a run of events drew.
#[derive(Debug, Clone, Copy)]
struct Span {
    min_x: f64,
    max_x: f64,
}

impl Span {
    fn of(a: f64, b: f64) -> Self {
        Self {
            min_x: a.min(b),
            max_x: a.max(b),
        }
    }

    fn rect(r: &Rect) -> Self {
        Self::of(r.x, r.max_x())
    }

    fn merge(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (Some(a), Some(b)) => Some(Self::of(a.min_x.min(b.min_x), a.max_x.max(b.max_x))),
            (a, b) => a.or(b),
        }
    }
}

/// Lanes sit left to right in first-appearance order. Each pair of neighboring lanes is pushed
/// apart until their headers, the messages between them and the side notes fit; events are then
/// stacked top to bottom in temporal order.
pub fn layout_sequence_diagram(
    model: &SequenceModel,
    cfg: &Config,
    measurer: &dyn TextMeasurer,
) -> SequenceLayout {
    let conf = SequenceConfig::from_config(cfg);
    let index: FxHashMap<&str, usize> = model
        .participants
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), i))
        .collect();

    let header_widths: Vec<f64> = model
        .participants
        .iter()
        .map(|p| {
            let (w, _) = measure(measurer, &p.label, &conf.style);
            conf.width.max(w + 2.0 * conf.box_margin)
        })
        .collect();
    let centers = lane_centers(model, &conf, &index, &header_widths, measurer);

    let header_bottom = conf.margin_y + conf.height;
    let mut walker = Walker {
        conf: &conf,
        participants: &model.participants,
        index: &index,
        centers: &centers,
        measurer,
        open: vec![Vec::new(); centers.len()],
        anchor: None,
        messages: Vec::new(),
        notes: Vec::new(),
        activations: Vec::new(),
        blocks: Vec::new(),
    };
    let (cursor, _) = walker.events(&model.events, 0, header_bottom);
    let lifeline_end = cursor + conf.box_margin;
    walker.close_all(lifeline_end);

    let participants: Vec<ParticipantLayout> = model
        .participants
        .iter()
        .zip(centers.iter().zip(&header_widths))
        .map(|(p, (&c, &w))| ParticipantLayout {
            id: p.id.clone(),
            label: p.label.clone(),
            kind: p.kind,
            header: Rect::new(c - w / 2.0, conf.margin_y, w, conf.height),
            lifeline_start: Point::new(c, header_bottom),
            lifeline_end: Point::new(c, lifeline_end),
        })
        .collect();

    let Walker {
        messages,
        notes,
        activations,
        blocks,
        ..
    } = walker;

    let rects = participants
        .iter()
        .map(|p| p.header)
        .chain(notes.iter().map(|n| n.rect))
        .chain(blocks.iter().map(|b| b.rect))
        .chain(activations.iter().map(|a| a.rect))
        .chain(messages.iter().filter_map(|m| m.label))
        .chain(
            messages
                .iter()
                .flat_map(|m| m.points.iter().map(|p| Rect::new(p.x, p.y, 0.0, 0.0))),
        )
        .collect::<Vec<_>>();
    let bounds = Bounds::from_rects(&rects).map_or_else(Bounds::default, |b| Bounds {
        min_x: 0.0_f64.min(b.min_x - conf.margin_x),
        min_y: 0.0,
        max_x: b.max_x + conf.margin_x,
        max_y: b.max_y.max(lifeline_end) + conf.margin_y,
    });

    tracing::trace!(
        participants = participants.len(),
        messages = messages.len(),
        blocks = blocks.len(),
        "sequence layout"
    );
    SequenceLayout {
        participants,
        messages,
        notes,
        activations,
        blocks,
        bounds,
    }
}

/// First pass: the center x of every lane.
fn lane_centers(
    model: &SequenceModel,
    conf: &SequenceConfig,
    index: &FxHashMap<&str, usize>,
    header_widths: &[f64],
    measurer: &dyn TextMeasurer,
) -> Vec<f64> {
    let n = header_widths.len();
    if n == 0 {
        return Vec::new();
    }
    let mut gaps: Vec<f64> = header_widths
        .windows(2)
        .map(|w| w[0] / 2.0 + conf.actor_margin + w[1] / 2.0)
        .collect();
    let mut left = header_widths[0] / 2.0;

    // Space needed on one side of lane `ix`. Past the last lane the bounds grow instead.
    let mut need = |ix: usize, to_right: bool, amount: f64| {
        let gap = if to_right {
            gaps.get_mut(ix)
        } else if ix == 0 {
            Some(&mut left)
        } else {
            gaps.get_mut(ix - 1)
        };
        if let Some(g) = gap {
            *g = g.max(amount);
        }
    };

    let mut stack: Vec<&SequenceEvent> = model.events.iter().rev().collect();
    while let Some(event) = stack.pop() {
        match event {
            SequenceEvent::Message(m) => {
                let (Some(&a), Some(&b)) = (index.get(m.from.as_str()), index.get(m.to.as_str()))
                else {
                    continue;
                };
                let (w, _) = measure(measurer, &m.text, &conf.style);
                if a == b {
                    need(a, true, SELF_LOOP_WIDTH + w + 2.0 * conf.box_margin);
                } else if a.abs_diff(b) == 1 {
                    need(a.min(b), true, w + 2.0 * conf.box_margin);
                }
            }
            SequenceEvent::Note(note) => {
                let Some(&a) = note.actors.first().and_then(|id| index.get(id.as_str())) else {
                    continue;
                };
                let (w, _) = measure(measurer, &note.text, &conf.style);
                let note_w = w + 2.0 * conf.note_margin;
                match note.placement {
                    NotePlacement::LeftOf => need(a, false, note_w + 2.0 * conf.note_margin),
                    NotePlacement::RightOf => need(a, true, note_w + 2.0 * conf.note_margin),
                    NotePlacement::Over if note.actors.len() == 1 && a == 0 => {
                        need(0, false, note_w / 2.0);
                    }
                    NotePlacement::Over => {}
                }
            }
            SequenceEvent::Block(block) => {
                for section in block.sections.iter().rev() {
                    stack.extend(section.events.iter().rev());
                }
            }
            SequenceEvent::Activate { .. } | SequenceEvent::Deactivate { .. } => {}
        }
    }

    let mut centers = Vec::with_capacity(n);
    let mut x = conf.margin_x + left;
    centers.push(x);
    for g in &gaps {
        x += g;
        centers.push(x);
    }
    centers
}

struct Walker<'a> {
    conf: &'a SequenceConfig,
    participants: &'a [Participant],
    index: &'a FxHashMap<&'a str, usize>,
    centers: &'a [f64],
    measurer: &'a dyn TextMeasurer,
    /// Start y of every open activation, innermost last, per lane.
    open: Vec<Vec<f64>>,
    /// Line y of the message just laid out; activations start and end there.
    anchor: Option<f64>,
    messages: Vec<MessageLayout>,
    notes: Vec<NoteLayout>,
    activations: Vec<ActivationLayout>,
    blocks: Vec<BlockLayout>,
}

impl Walker<'_> {
    fn lane(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Lays out `events` from `y` down; returns the next free y and the x extent used.
    fn events(&mut self, events: &[SequenceEvent], depth: usize, y: f64) -> (f64, Option<Span>) {
        let mut cursor = y;
        let mut span = None;
        for event in events {
            let (next, used) = match event {
                SequenceEvent::Message(m) => self.message(m, cursor),
                SequenceEvent::Note(n) => self.note(n, cursor),
                SequenceEvent::Block(b) => self.block(b, depth, cursor),
                SequenceEvent::Activate { actor } => {
                    let at = self.anchor.unwrap_or(cursor);
                    if let Some(lane) = self.lane(actor) {
                        self.open[lane].push(at);
                    }
                    (cursor, None)
                }
                SequenceEvent::Deactivate { actor } => {
                    let at = self.anchor.unwrap_or(cursor);
                    if let Some(lane) = self.lane(actor) {
                        self.close(lane, at);
                    }
                    (cursor, None)
                }
            };
            cursor = next;
            span = Span::merge(span, used);
        }
        (cursor, span)
    }

    /// x where a message line meets `lane`, at the edge of its activation boxes facing the
    /// other end.
    fn port(&self, lane: usize, toward_right: bool) -> f64 {
        let c = self.centers[lane];
        let open = self.open[lane].len();
        if open == 0 {
            return c;
        }
        let half = self.conf.activation_width / 2.0;
        if toward_right {
            c + half + (open - 1) as f64 * half
        } else {
            c - half
        }
    }

    fn message(&mut self, m: &Message, y: f64) -> (f64, Option<Span>) {
        let (Some(a), Some(b)) = (self.lane(&m.from), self.lane(&m.to)) else {
            return (y, None);
        };
        let conf = self.conf;
        let (tw, th) = if m.text.is_empty() {
            (0.0, 0.0)
        } else {
            measure(self.measurer, &m.text, &conf.style)
        };
        let line_y = y + conf.message_margin.max(th + conf.box_margin);

        let (points, label, next) = if a == b {
            let x = self.port(a, true);
            let out = x + SELF_LOOP_WIDTH;
            let points = vec![
                Point::new(x, line_y),
                Point::new(out, line_y),
                Point::new(out, line_y + SELF_LOOP_HEIGHT),
                Point::new(x, line_y + SELF_LOOP_HEIGHT),
            ];
            let label = Rect::new(x + conf.box_margin, line_y - th - LABEL_GAP, tw, th);
            (points, label, line_y + SELF_LOOP_HEIGHT + conf.box_margin)
        } else {
            let x1 = self.port(a, b > a);
            let x2 = self.port(b, a > b);
            let mid = (x1 + x2) / 2.0;
            let label = Rect::new(mid - tw / 2.0, line_y - th - LABEL_GAP, tw, th);
            (
                vec![Point::new(x1, line_y), Point::new(x2, line_y)],
                label,
                line_y + conf.box_margin,
            )
        };

        let label = (!m.text.is_empty()).then_some(label);
        let span = points
            .iter()
            .map(|p| Span::of(p.x, p.x))
            .chain(label.as_ref().map(Span::rect))
            .reduce(|a, b| Span::of(a.min_x.min(b.min_x), a.max_x.max(b.max_x)));

        self.messages.push(MessageLayout {
            from: m.from.clone(),
            to: m.to.clone(),
            text: m.text.clone(),
            number: m.number,
            points,
            label,
        });
        self.anchor = Some(line_y);
        (next, span)
    }

    fn note(&mut self, note: &SequenceNote, y: f64) -> (f64, Option<Span>) {
        let lanes: Vec<usize> = note.actors.iter().filter_map(|a| self.lane(a)).collect();
        let (Some(&lo), Some(&hi)) = (lanes.iter().min(), lanes.iter().max()) else {
            return (y, None);
        };
        let conf = self.conf;
        let (tw, th) = measure(self.measurer, &note.text, &conf.style);
        let base_w = tw + 2.0 * conf.note_margin;
        let h = th + 2.0 * conf.note_margin;
        let top = y + conf.box_margin;

        let (c_lo, c_hi) = (self.centers[lo], self.centers[hi]);
        let rect = match note.placement {
            NotePlacement::LeftOf => Rect::new(c_lo - conf.note_margin - base_w, top, base_w, h),
            NotePlacement::RightOf => Rect::new(c_hi + conf.note_margin, top, base_w, h),
            NotePlacement::Over => {
                let w = base_w.max(c_hi - c_lo + 2.0 * conf.note_margin);
                Rect::new((c_lo + c_hi) / 2.0 - w / 2.0, top, w, h)
            }
        };
        self.notes.push(NoteLayout {
            placement: note.placement,
            actors: note.actors.clone(),
            text: note.text.clone(),
            rect,
        });
        self.anchor = None;
        (rect.max_y() + conf.box_margin, Some(Span::rect(&rect)))
    }

    /// Sections are laid out first; the block's own box then wraps whatever they drew.
    fn block(&mut self, block: &Block, depth: usize, y: f64) -> (f64, Option<Span>) {
        let conf = self.conf;
        let slot = self.blocks.len();
        self.blocks.push(BlockLayout {
            kind: block.kind,
            depth,
            rect: Rect::default(),
            sections: Vec::with_capacity(block.sections.len()),
        });

        let top = y + conf.box_margin;
        let (kw_w, kw_h) = measure(self.measurer, block.kind.keyword(), &conf.style.bold());
        let mut title_w = kw_w;
        let mut cursor = top;
        let mut inner = None;
        let mut sections = Vec::with_capacity(block.sections.len());
        for (i, section) in block.sections.iter().enumerate() {
            let (lw, lh) = if section.label.is_empty() {
                (0.0, 0.0)
            } else {
                measure(self.measurer, &section.label, &conf.style)
            };
            if i == 0 {
                title_w += lw + conf.box_margin;
            } else {
                title_w = title_w.max(lw);
            }
            sections.push(BlockSectionLayout {
                label: section.label.clone(),
                y: cursor,
            });
            let header = if i == 0 { lh.max(kw_h) } else { lh };
            self.anchor = None;
            let (next, used) = self.events(&section.events, depth + 1, cursor + header);
            cursor = next;
            inner = Span::merge(inner, used);
        }

        let inner = inner.unwrap_or_else(|| {
            let first = self.centers.first().copied().unwrap_or(conf.margin_x);
            let last = self.centers.last().copied().unwrap_or(first);
            Span::of(first - conf.width / 2.0, last + conf.width / 2.0)
        });
        let width = (inner.max_x - inner.min_x + 2.0 * conf.box_margin)
            .max(title_w + 2.0 * conf.box_margin);
        let bottom = cursor + conf.box_margin;
        let rect = Rect::new(inner.min_x - conf.box_margin, top, width, bottom - top);
        if let Some(slot) = self.blocks.get_mut(slot) {
            slot.rect = rect;
            slot.sections = sections;
        }
        self.anchor = None;
        (bottom + conf.box_margin, Some(Span::rect(&rect)))
    }

    fn close(&mut self, lane: usize, end: f64) {
        let Some(start) = self.open[lane].pop() else {
            return;
        };
        let depth = self.open[lane].len();
        let half = self.conf.activation_width / 2.0;
        let x = self.centers[lane] - half + depth as f64 * half;
        let height = (end - start).max(self.conf.box_margin);
        self.activations.push(ActivationLayout {
            actor: self.participants[lane].id.clone(),
            depth,
            rect: Rect::new(x, start, self.conf.activation_width, height),
        });
    }

    /// Activations still open at the end run to the bottom of the lifelines.
    fn close_all(&mut self, end: f64) {
        for lane in 0..self.open.len() {
            while !self.open[lane].is_empty() {
                self.close(lane, end);
            }
        }
    }
}
