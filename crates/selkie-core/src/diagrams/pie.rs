use super::{Common, non_empty};
use crate::lex::TokenKind;
use crate::{ParseContext, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieModel {
    #[serde(flatten)]
    pub common: Common,
    pub show_data: bool,
    pub slices: Vec<PieSlice>,
}

impl PieModel {
    pub fn total(&self) -> f64 {
        self.slices.iter().map(|s| s.value).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
}

pub fn parse(ctx: &mut ParseContext<'_, '_>) -> Result<PieModel> {
    let mut model = PieModel::default();

    // `pie showData title Pets`
    if let Some(header) = ctx.header() {
        let mut i = 1;
        while let Some(tok) = header.tokens.get(i) {
            if tok.is("showData") {
                model.show_data = true;
                i += 1;
            } else if tok.is("title") {
                model.common.title = non_empty(header.text_after(i));
                break;
            } else {
                ctx.skip(&header, format!("unexpected `{}` in pie header", tok.text));
                break;
            }
        }
    }

    for line in ctx.body() {
        if model.common.accept(&line) {
            continue;
        }
        if line.starts_with_word("showData") {
            model.show_data = true;
            continue;
        }
        let toks = line.tokens;
        let label = match toks.first() {
            Some(t) if t.kind == TokenKind::QuotedString => t.unquoted(),
            _ => {
                ctx.skip(&line, format!("expected a quoted slice label, found `{}`", line.text));
                continue;
            }
        };
        if !toks.get(1).is_some_and(|t| t.is(":")) {
            ctx.skip(&line, "expected `:` after slice label");
            continue;
        }
        let raw = line.text_after(1);
        let value = match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => v,
            Ok(_) => {
                ctx.skip(&line, format!("slice value `{raw}` must be a non-negative number"));
                continue;
            }
            Err(_) => {
                ctx.skip(&line, format!("slice value `{raw}` is not a number"));
                continue;
            }
        };
        if model.slices.iter().any(|s| s.label == label) {
            ctx.skip(&line, format!("duplicate slice `{label}` ignored"));
            continue;
        }
        model.slices.push(PieSlice {
            label: label.to_string(),
            value,
        });
        ctx.check_nodes(model.slices.len())?;
    }

    Ok(model)
}
