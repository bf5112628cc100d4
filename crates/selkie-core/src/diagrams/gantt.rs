use super::{Common, non_empty};
use crate::lex::Line;
use crate::{ParseContext, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GanttModel {
    #[serde(flatten)]
    pub common: Common,
    pub date_format: String,
    #[serde(default)]
    pub axis_format: Option<String>,
    /// Recorded as written (`weekends`, `2024-01-01`); not applied to task dates.
    pub excludes: Vec<String>,
    pub inclusive_end_dates: bool,
    pub sections: Vec<String>,
    pub tasks: Vec<GanttTask>,
}

impl Default for GanttModel {
    fn default() -> Self {
        Self {
            common: Common::default(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            axis_format: None,
            excludes: Vec::new(),
            inclusive_end_dates: false,
            sections: Vec::new(),
            tasks: Vec::new(),
        }
    }
}

impl GanttModel {
    pub fn task(&self, id: &str) -> Option<&GanttTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Earliest start and latest end over all tasks.
    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let start = self.tasks.iter().map(|t| t.start).min()?;
        let end = self.tasks.iter().map(|t| t.end).max()?;
        Some((start, end))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTags {
    pub done: bool,
    pub active: bool,
    pub crit: bool,
    pub milestone: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GanttTask {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub section: Option<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub tags: TaskTags,
}

/// Converts a day.js style format (`YYYY-MM-DD HH:mm`) into a chrono format string.
pub fn chrono_format(date_format: &str) -> String {
    const TOKENS: &[(&str, &str)] = &[
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MM", "%m"),
        ("M", "%m"),
        ("DD", "%d"),
        ("D", "%d"),
        ("HH", "%H"),
        ("H", "%H"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("X", "%s"),
    ];
    let mut out = String::with_capacity(date_format.len() * 2);
    let mut rest = date_format;
    'outer: while let Some(c) = rest.chars().next() {
        for (token, chrono) in TOKENS {
            if let Some(after) = rest.strip_prefix(token) {
                out.push_str(chrono);
                rest = after;
                continue 'outer;
            }
        }
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// Parses `raw` with a chrono format produced by [`chrono_format`]. Date-only formats yield
/// midnight.
pub fn parse_date(format: &str, raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if format.contains("%s") {
        let secs: i64 = raw.parse().ok()?;
        return chrono::DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc());
    }
    let has_time = ["%H", "%M", "%S"].iter().any(|t| format.contains(t));
    if has_time {
        NaiveDateTime::parse_from_str(raw, format).ok()
    } else {
        NaiveDate::parse_from_str(raw, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }
}

/// `3d`, `1.5h`, `2w`, `30m`, `10s`, `500ms`.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !(c.is_ascii_digit() || c == '.'))?;
    let (number, unit) = raw.split_at(split);
    let value: f64 = number.parse().ok()?;
    let millis = match unit {
        "ms" => value,
        "s" => value * 1_000.0,
        "m" => value * 60_000.0,
        "h" => value * 3_600_000.0,
        "d" => value * 86_400_000.0,
        "w" => value * 604_800_000.0,
        _ => return None,
    };
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(millis.trunc() as i64)
}

#[derive(Default)]
struct GanttDb {
    model: GanttModel,
    section: Option<String>,
    format: String,
    task_count: usize,
}

impl GanttDb {
    fn set_date_format(&mut self, raw: &str) {
        self.model.date_format = raw.to_string();
        self.format = chrono_format(raw);
    }

    fn prev_end(&self) -> Option<NaiveDateTime> {
        self.model.tasks.last().map(|t| t.end)
    }

    /// `after a b`: the latest end among the referenced tasks.
    fn after(&self, ids: &str) -> std::result::Result<NaiveDateTime, String> {
        ids.split_whitespace()
            .filter_map(|id| self.model.task(id).map(|t| t.end))
            .max()
            .ok_or_else(|| format!("`after {ids}` references no earlier task"))
    }

    fn start(&self, raw: &str) -> std::result::Result<NaiveDateTime, String> {
        if let Some(ids) = raw.strip_prefix("after ") {
            return self.after(ids);
        }
        parse_date(&self.format, raw).ok_or_else(|| {
            format!(
                "`{raw}` does not match date format `{}`",
                self.model.date_format
            )
        })
    }

    fn end(&self, start: NaiveDateTime, raw: &str) -> std::result::Result<NaiveDateTime, String> {
        if let Some(ids) = raw.strip_prefix("until ") {
            return ids
                .split_whitespace()
                .filter_map(|id| self.model.task(id).map(|t| t.start))
                .min()
                .ok_or_else(|| format!("`until {ids}` references no earlier task"));
        }
        if let Some(date) = parse_date(&self.format, raw) {
            if !self.model.inclusive_end_dates {
                return Ok(date);
            }
            return date
                .checked_add_signed(Duration::days(1))
                .ok_or_else(|| format!("`{raw}` is out of range"));
        }
        let duration = parse_duration(raw)
            .ok_or_else(|| format!("`{raw}` is neither a date nor a duration"))?;
        start
            .checked_add_signed(duration)
            .ok_or_else(|| format!("duration `{raw}` overflows the calendar"))
    }

    /// `name : [tags,] [id,] [start,] end`
    fn task(&mut self, name: &str, data: &str) -> std::result::Result<(), String> {
        let mut parts: Vec<&str> = data.split(',').map(str::trim).collect();
        let mut tags = TaskTags::default();
        while let Some(first) = parts.first() {
            match *first {
                "done" => tags.done = true,
                "active" => tags.active = true,
                "crit" => tags.crit = true,
                "milestone" => tags.milestone = true,
                _ => break,
            }
            parts.remove(0);
        }
        let (id, start_raw, end_raw) = match parts.as_slice() {
            [end] => (None, None, *end),
            [start, end] => (None, Some(*start), *end),
            [id, start, end] => (non_empty(id), Some(*start), *end),
            _ => return Err(format!("task `{name}` needs an end date or a duration")),
        };
        let start = match start_raw {
            Some(raw) => self.start(raw)?,
            None => self
                .prev_end()
                .ok_or_else(|| format!("task `{name}` has no start and no previous task"))?,
        };
        let end = self.end(start, end_raw)?;
        if end < start {
            return Err(format!("task `{name}` ends before it starts"));
        }
        self.task_count += 1;
        let id = id.unwrap_or_else(|| format!("task{}", self.task_count));
        self.model.tasks.push(GanttTask {
            id,
            name: name.to_string(),
            section: self.section.clone(),
            start,
            end,
            tags,
        });
        Ok(())
    }

    fn statement(&mut self, line: &Line<'_, '_>) -> std::result::Result<(), String> {
        let first = line.first().map_or("", |t| t.text);
        match first {
            "dateFormat" => self.set_date_format(line.text_after(0)),
            "axisFormat" => self.model.axis_format = non_empty(line.text_after(0)),
            "excludes" => self.model.excludes.extend(
                line.text_after(0)
                    .split([',', ' '])
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            ),
            "inclusiveEndDates" => self.model.inclusive_end_dates = true,
            "section" => {
                let name = line.text_after(0).to_string();
                self.model.sections.push(name.clone());
                self.section = Some(name);
            }
            "includes" | "todayMarker" | "tickInterval" | "weekday" | "weekend" | "topAxis"
            | "displayMode" | "click" => {}
            _ => {
                let Some(colon) = line.find(0, ":") else {
                    return Err(format!("unrecognized statement `{}`", line.text));
                };
                let name = line.text_between(0, colon);
                if name.is_empty() {
                    return Err("task without a name".to_string());
                }
                return self.task(name, line.text_after(colon));
            }
        }
        Ok(())
    }
}

pub fn parse(ctx: &mut ParseContext<'_, '_>) -> Result<GanttModel> {
    let mut db = GanttDb::default();
    db.set_date_format(DEFAULT_DATE_FORMAT);

    for line in ctx.body() {
        if db.model.common.accept(&line) {
            continue;
        }
        if let Err(message) = db.statement(&line) {
            ctx.skip(&line, message);
        }
        ctx.check_nodes(db.model.tasks.len())?;
    }

    Ok(db.model)
}
