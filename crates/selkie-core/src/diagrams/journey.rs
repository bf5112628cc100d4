use super::Common;
use crate::{ParseContext, Result};
use serde::{Deserialize, Serialize};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyModel {
    #[serde(flatten)]
    pub common: Common,
    pub sections: Vec<String>,
    pub tasks: Vec<JourneyTask>,
}

impl JourneyModel {
    /// Distinct actors in first-mention order.
    pub fn actors(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for actor in self.tasks.iter().flat_map(|t| &t.actors) {
            if !out.contains(&actor.as_str()) {
                out.push(actor);
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyTask {
    pub name: String,
    #[serde(default)]
    pub section: Option<String>,
    /// Satisfaction score, clamped to `1..=5`.
    pub score: u8,
    pub actors: Vec<String>,
}

pub fn parse(ctx: &mut ParseContext<'_, '_>) -> Result<JourneyModel> {
    let mut model = JourneyModel::default();
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
        let Some(colon) = line.find(0, ":") else {
            ctx.skip(&line, format!("unrecognized statement `{}`", line.text));
            continue;
        };
        let name = line.text_between(0, colon);
        if name.is_empty() {
            ctx.skip(&line, "task without a name");
            continue;
        }
        let mut rest = line.text_after(colon).splitn(2, ':');
        let raw_score = rest.next().unwrap_or_default().trim();
        let score = match raw_score.parse::<f64>() {
            Ok(v) if v.is_finite() => {
                v.round()
                    .clamp(f64::from(MIN_SCORE), f64::from(MAX_SCORE)) as u8
            }
            _ => {
                ctx.skip(&line, format!("task score `{raw_score}` is not a number"));
                continue;
            }
        };
        let actors = rest
            .next()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        model.tasks.push(JourneyTask {
            name: name.to_string(),
            section: section.clone(),
            score,
            actors,
        });
        ctx.check_nodes(model.tasks.len())?;
    }

    Ok(model)
}
