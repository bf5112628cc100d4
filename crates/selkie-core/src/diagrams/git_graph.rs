use super::{Common, unquote};
use crate::lex::{Line, TokenKind};
use crate::{ParseContext, Result};
use selkie_graph::Direction;
use serde::{Deserialize, Serialize};

pub const MAIN_BRANCH: &str = "main";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitGraphModel {
    #[serde(flatten)]
    pub common: Common,
    pub direction: Direction,
    pub branches: Vec<GitBranch>,
    pub commits: Vec<GitCommit>,
}

impl Default for GitGraphModel {
    fn default() -> Self {
        Self {
            common: Common::default(),
            direction: Direction::LR,
            branches: vec![GitBranch {
                name: MAIN_BRANCH.to_string(),
                order: None,
            }],
            commits: Vec::new(),
        }
    }
}

impl GitGraphModel {
    pub fn commit(&self, id: &str) -> Option<&GitCommit> {
        self.commits.iter().find(|c| c.id == id)
    }

    pub fn branch_index(&self, name: &str) -> Option<usize> {
        self.branches.iter().position(|b| b.name == name)
    }

    /// Branches sorted by explicit `order:`, falling back to declaration position.
    pub fn ordered_branches(&self) -> Vec<&GitBranch> {
        let mut out: Vec<(i64, usize, &GitBranch)> = self
            .branches
            .iter()
            .enumerate()
            .map(|(i, b)| (b.order.unwrap_or(i as i64), i, b))
            .collect();
        out.sort_by_key(|(order, i, _)| (*order, *i));
        out.into_iter().map(|(_, _, b)| b).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitBranch {
    pub name: String,
    #[serde(default)]
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommitKind {
    #[default]
    Normal,
    Reverse,
    Highlight,
    Merge,
    CherryPick,
}

impl CommitKind {
    fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "NORMAL" => Self::Normal,
            "REVERSE" => Self::Reverse,
            "HIGHLIGHT" => Self::Highlight,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitCommit {
    pub id: String,
    /// Position in the commit history.
    pub seq: usize,
    #[serde(default)]
    pub message: String,
    pub kind: CommitKind,
    pub tags: Vec<String>,
    pub parents: Vec<String>,
    pub branch: String,
}

/// `key: value` pairs trailing a command (`id: "a" tag: "v1"`).
fn key_values(
    line: &Line<'_, '_>,
    from: usize,
) -> std::result::Result<Vec<(&'static str, String)>, String> {
    const KEYS: &[&str] = &["id", "type", "tag", "msg", "order", "parent"];
    let toks = line.tokens;
    let mut out = Vec::new();
    let mut i = from;
    while let Some(key) = toks.get(i) {
        let Some(known) = KEYS.iter().find(|k| key.is(k)) else {
            return Err(format!("unknown argument `{}`", key.text));
        };
        if !toks.get(i + 1).is_some_and(|t| t.is(":")) {
            return Err(format!("expected `:` after `{known}`"));
        }
        let value_ix = i + 2;
        let Some(value) = toks.get(value_ix) else {
            return Err(format!("missing value for `{known}`"));
        };
        if value.kind == TokenKind::QuotedString {
            out.push((*known, value.unquoted().to_string()));
            i = value_ix + 1;
        } else {
            let (glued, next) = line.glue(value_ix, |t| !t.is(":"));
            out.push((*known, unquote(glued).to_string()));
            i = next;
        }
    }
    Ok(out)
}

fn name_at(line: &Line<'_, '_>, ix: usize) -> Option<(String, usize)> {
    let tok = line.tokens.get(ix)?;
    if tok.kind == TokenKind::QuotedString {
        return Some((tok.unquoted().to_string(), ix + 1));
    }
    let (glued, next) = line.glue(ix, |t| !t.is(":") && t.kind != TokenKind::QuotedString);
    (!glued.is_empty()).then(|| (glued.to_string(), next))
}

struct GitDb {
    model: GitGraphModel,
    current: String,
    /// Head commit per branch, parallel to `model.branches`.
    heads: Vec<Option<String>>,
}

impl Default for GitDb {
    fn default() -> Self {
        Self {
            model: GitGraphModel::default(),
            current: MAIN_BRANCH.to_string(),
            heads: vec![None],
        }
    }
}

impl GitDb {
    fn head_of(&self, branch: &str) -> Option<&str> {
        let ix = self.model.branch_index(branch)?;
        self.heads[ix].as_deref()
    }

    fn push_commit(
        &mut self,
        id: Option<String>,
        message: String,
        kind: CommitKind,
        tags: Vec<String>,
        parents: Vec<String>,
    ) -> std::result::Result<(), String> {
        let seq = self.model.commits.len();
        let id = id.unwrap_or_else(|| format!("{seq}-{}", self.current));
        if self.model.commit(&id).is_some() {
            return Err(format!("commit id `{id}` already exists"));
        }
        if let Some(ix) = self.model.branch_index(&self.current) {
            self.heads[ix] = Some(id.clone());
        }
        self.model.commits.push(GitCommit {
            id,
            seq,
            message,
            kind,
            tags,
            parents,
            branch: self.current.clone(),
        });
        Ok(())
    }

    fn commit(&mut self, line: &Line<'_, '_>, from: usize) -> std::result::Result<(), String> {
        let mut id = None;
        let mut kind = CommitKind::Normal;
        let mut tags = Vec::new();
        let mut message = String::new();
        for (key, value) in key_values(line, from)? {
            match key {
                "id" => id = Some(value),
                "type" => {
                    kind = CommitKind::parse(&value)
                        .ok_or_else(|| format!("unknown commit type `{value}`"))?
                }
                "tag" => tags.push(value),
                "msg" => message = value,
                unknown => return Err(format!("`{unknown}` is not a commit argument")),
            }
        }
        let parents = self
            .head_of(&self.current)
            .map(str::to_string)
            .into_iter()
            .collect();
        self.push_commit(id, message, kind, tags, parents)
    }

    fn branch(&mut self, line: &Line<'_, '_>, from: usize) -> std::result::Result<(), String> {
        let (name, next) = name_at(line, from).ok_or("branch needs a name")?;
        if self.model.branch_index(&name).is_some() {
            return Err(format!("branch `{name}` already exists, use `checkout {name}`"));
        }
        let mut order = None;
        for (key, value) in key_values(line, next)? {
            match key {
                "order" => {
                    let parsed = value.parse::<i64>();
                    order = Some(parsed.map_err(|_| format!("invalid order `{value}`"))?);
                }
                unknown => return Err(format!("`{unknown}` is not a branch argument")),
            }
        }
        let head = self.head_of(&self.current).map(str::to_string);
        self.model.branches.push(GitBranch { name: name.clone(), order });
        self.heads.push(head);
        self.current = name;
        Ok(())
    }

    fn checkout(&mut self, line: &Line<'_, '_>, from: usize) -> std::result::Result<(), String> {
        let (name, _) = name_at(line, from).ok_or("checkout needs a branch name")?;
        if self.model.branch_index(&name).is_none() {
            return Err(format!("branch `{name}` does not exist, use `branch {name}`"));
        }
        self.current = name;
        Ok(())
    }

    fn merge(&mut self, line: &Line<'_, '_>, from: usize) -> std::result::Result<(), String> {
        let (other, next) = name_at(line, from).ok_or("merge needs a branch name")?;
        if other == self.current {
            return Err("cannot merge a branch into itself".to_string());
        }
        if self.model.branch_index(&other).is_none() {
            return Err(format!("branch `{other}` does not exist"));
        }
        let Some(ours) = self.head_of(&self.current).map(str::to_string) else {
            return Err(format!("current branch `{}` has no commits", self.current));
        };
        let Some(theirs) = self.head_of(&other).map(str::to_string) else {
            return Err(format!("branch `{other}` has no commits"));
        };
        if ours == theirs {
            return Err("both branches have the same head".to_string());
        }
        let mut id = None;
        let mut kind = CommitKind::Merge;
        let mut tags = Vec::new();
        for (key, value) in key_values(line, next)? {
            match key {
                "id" => id = Some(value),
                "type" => {
                    kind = CommitKind::parse(&value)
                        .ok_or_else(|| format!("unknown commit type `{value}`"))?
                }
                "tag" => tags.push(value),
                unknown => return Err(format!("`{unknown}` is not a merge argument")),
            }
        }
        let message = format!("merged branch {other} into {}", self.current);
        self.push_commit(id, message, kind, tags, vec![ours, theirs])
    }

    fn cherry_pick(
        &mut self,
        line: &Line<'_, '_>,
        from: usize,
    ) -> std::result::Result<(), String> {
        let mut source = None;
        let mut parent = None;
        let mut tags = Vec::new();
        for (key, value) in key_values(line, from)? {
            match key {
                "id" => source = Some(value),
                "parent" => parent = Some(value),
                "tag" => tags.push(value),
                unknown => return Err(format!("`{unknown}` is not a cherry-pick argument")),
            }
        }
        let source = source.ok_or("cherry-pick needs `id:`")?;
        let Some(picked) = self.model.commit(&source).cloned() else {
            return Err(format!("commit `{source}` does not exist"));
        };
        if picked.branch == self.current {
            return Err(format!("commit `{source}` is already on `{}`", self.current));
        }
        if let Some(parent) = &parent {
            if !picked.parents.contains(parent) {
                return Err(format!("`{parent}` is not a parent of `{source}`"));
            }
        } else if picked.kind == CommitKind::Merge {
            return Err("cherry-picking a merge commit needs `parent:`".to_string());
        }
        let Some(head) = self.head_of(&self.current).map(str::to_string) else {
            return Err(format!("current branch `{}` has no commits", self.current));
        };
        if tags.is_empty() {
            tags.push(format!("cherry-pick:{source}"));
        }
        let message = format!("cherry-picked {} into {}", picked.message, self.current);
        self.push_commit(None, message, CommitKind::CherryPick, tags, vec![head, source])
    }
}

pub fn parse(ctx: &mut ParseContext<'_, '_>) -> Result<GitGraphModel> {
    let mut db = GitDb::default();

    if let Some(header) = ctx.header()
        && let Some(tok) = header.tokens.get(1)
    {
        match Direction::parse(tok.text) {
            Some(dir) => db.model.direction = dir,
            None if tok.is(":") => {}
            None => ctx.skip(&header, format!("invalid direction `{}`", tok.text)),
        }
    }

    for line in ctx.body() {
        if db.model.common.accept(&line) {
            continue;
        }
        let (command, next) = line.glue(0, |t| t.is_word() || t.is("-"));
        let outcome = match command {
            "commit" => db.commit(&line, next),
            "branch" => db.branch(&line, next),
            "checkout" | "switch" => db.checkout(&line, next),
            "merge" => db.merge(&line, next),
            "cherry-pick" => db.cherry_pick(&line, next),
            _ => Err(format!("unrecognized statement `{}`", line.text)),
        };
        if let Err(message) = outcome {
            ctx.skip(&line, message);
        }
        ctx.check_nodes(db.model.commits.len())?;
        ctx.check_edges(db.model.commits.iter().map(|c| c.parents.len()).sum())?;
    }

    Ok(db.model)
}
