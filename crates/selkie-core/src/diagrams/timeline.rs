use super::{Common, normalize_label};
use crate::{ParseContext, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineModel {
    #[serde(flatten)]
    pub common: Common,
    pub sections: Vec<String>,
    pub periods: Vec<TimelinePeriod>,
}

impl TimelineModel {
    pub fn event_count(&self) -> usize {
        self.periods.iter().map(|p| p.events.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePeriod {
    pub label: String,
    #[serde(default)]
    pub section: Option<String>,
    pub events: Vec<String>,
}

fn events(parts: std::str::Split<'_, char>) -> impl Iterator<Item = String> + '_ {
    parts.map(normalize_label).filter(|e| !e.is_empty())
}

pub fn parse(ctx: &mut ParseContext<'_, '_>) -> Result<TimelineModel> {
    let mut model = TimelineModel::default();
    let mut section: Option<String> = None;

    for line in ctx.body() {
        if model.common.accept(&line) {
            continue;
        }
        if line.starts_with_word("section") {
            let name = line.text_after(0).to_string();
            model.sections.push(name.clone());
            section = Some(name);
            continue;
        }
        if let Some(rest) = line.text.strip_prefix(':') {
            match model.periods.last_mut() {
                Some(period) => period.events.extend(events(rest.split(':'))),
                None => ctx.skip(&line, "event continuation before any period"),
            }
        } else {
            let mut parts = line.text.split(':');
            let label = normalize_label(parts.next().unwrap_or_default());
            model.periods.push(TimelinePeriod {
                label,
                section: section.clone(),
                events: events(parts).collect(),
            });
        }
        ctx.check_nodes(model.periods.len() + model.event_count())?;
    }

    Ok(model)
}
