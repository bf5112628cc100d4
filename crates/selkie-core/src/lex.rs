//! Shared tokenizer for every diagram dialect.
//!
//! The tokenizer is deliberately dialect-agnostic: it never fails, never backtracks and hands out
//! slices of the source buffer. Dialect parsers combine tokens with the raw line text when a
//! statement carries free-form text.

use crate::{Error, Limits, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenKind {
    Keyword,
    Identifier,
    QuotedString,
    /// Arrow runs (`-->`, `-.->`, `<<`) and single punctuation characters (`:`, `|`, `,`).
    Operator,
    Bracket,
    Comment,
    Newline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset of `text` in the source.
    pub offset: usize,
}

impl<'a> Token<'a> {
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }

    /// Text without surrounding double quotes. Unterminated strings lose only the opening quote.
    pub fn unquoted(&self) -> &'a str {
        if self.kind != TokenKind::QuotedString {
            return self.text;
        }
        let inner = self.text.strip_prefix('"').unwrap_or(self.text);
        inner.strip_suffix('"').unwrap_or(inner)
    }

    pub fn is_word(&self) -> bool {
        matches!(self.kind, TokenKind::Keyword | TokenKind::Identifier)
    }

    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }
}

const KEYWORDS: &[&str] = &[
    "graph",
    "flowchart",
    "subgraph",
    "end",
    "direction",
    "classDef",
    "class",
    "style",
    "click",
    "linkStyle",
    "sequenceDiagram",
    "participant",
    "actor",
    "as",
    "activate",
    "deactivate",
    "note",
    "loop",
    "alt",
    "else",
    "opt",
    "par",
    "and",
    "critical",
    "option",
    "break",
    "rect",
    "autonumber",
    "classDiagram",
    "classDiagram-v2",
    "stateDiagram",
    "stateDiagram-v2",
    "state",
    "erDiagram",
    "pie",
    "showData",
    "title",
    "accTitle",
    "accDescr",
    "gantt",
    "dateFormat",
    "axisFormat",
    "excludes",
    "section",
    "journey",
    "gitGraph",
    "commit",
    "branch",
    "checkout",
    "switch",
    "merge",
    "mindmap",
    "timeline",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_arrow_char(c: char) -> bool {
    matches!(c, '-' | '=' | '.' | '<' | '>' | '~' | '*' | '+')
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token<'a> {
        Token {
            kind,
            text: &self.input[start..self.pos],
            offset: start,
        }
    }

    fn bump_while(&mut self, f: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&f) {
            self.bump();
        }
    }

    fn next_token(&mut self) -> Option<Token<'a>> {
        loop {
            let start = self.pos;
            let c = self.bump()?;
            let tok = match c {
                ' ' | '\t' | '\r' => continue,
                '\n' | ';' => self.token(TokenKind::Newline, start),
                '%' if self.peek() == Some('%') => {
                    self.bump_while(|c| c != '\n');
                    self.token(TokenKind::Comment, start)
                }
                '"' => {
                    self.bump_while(|c| c != '"' && c != '\n');
                    if self.peek() == Some('"') {
                        self.bump();
                    }
                    self.token(TokenKind::QuotedString, start)
                }
                '(' | ')' | '[' | ']' | '{' | '}' => self.token(TokenKind::Bracket, start),
                c if is_arrow_char(c) => {
                    self.bump_while(is_arrow_char);
                    let run = &self.input[start..self.pos];
                    let head_ok = run.ends_with(['-', '=', '.']);
                    // `--x B` and `A--xB` both end in a cross head; `-xB` stays a hyphen and a word.
                    if head_ok
                        && matches!(self.peek(), Some('x' | 'o'))
                        && (run.len() >= 2 || !self.peek_nth(1).is_some_and(is_ident_char))
                    {
                        self.bump();
                    }
                    self.token(TokenKind::Operator, start)
                }
                c if is_ident_char(c) => self.word(start),
                c if c.is_control() => continue,
                _ => self.token(TokenKind::Operator, start),
            };
            return Some(tok);
        }
    }

    fn word(&mut self, start: usize) -> Token<'a> {
        loop {
            self.bump_while(is_ident_char);
            let so_far = &self.input[start..self.pos];
            // Decimal numbers: `30.5`.
            if self.peek() == Some('.')
                && so_far.bytes().all(|b| b.is_ascii_digit())
                && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit())
            {
                self.bump();
                continue;
            }
            break;
        }
        for versioned in ["stateDiagram", "classDiagram"] {
            if &self.input[start..self.pos] == versioned
                && self.input[self.pos..].starts_with("-v2")
            {
                let after = self.input[self.pos + 3..].chars().next();
                if !after.is_some_and(is_ident_char) {
                    self.pos += 3;
                }
            }
        }
        let text = &self.input[start..self.pos];
        let kind = if is_keyword(text) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        self.token(kind, start)
    }
}

/// Tokenizes `source` without any resource caps. Never fails.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut lexer = Lexer {
        input: source,
        pos: 0,
    };
    std::iter::from_fn(|| lexer.next_token()).collect()
}

/// Tokenizes `source`, enforcing `max_text_size` and `max_tokens`.
pub fn tokenize_with_limits<'a>(source: &'a str, limits: &Limits) -> Result<Tokens<'a>> {
    if source.len() > limits.max_text_size {
        return Err(Error::TextTooLarge {
            size: source.len(),
            limit: limits.max_text_size,
        });
    }
    let mut lexer = Lexer {
        input: source,
        pos: 0,
    };
    let mut tokens = Vec::new();
    tokens.try_reserve((source.len() / 4).min(limits.max_tokens).max(16))?;
    while let Some(tok) = lexer.next_token() {
        if tokens.len() >= limits.max_tokens {
            return Err(Error::TooManyTokens {
                limit: limits.max_tokens,
            });
        }
        if tokens.len() == tokens.capacity() {
            tokens.try_reserve(tokens.len())?;
        }
        tokens.push(tok);
    }
    Ok(Tokens { source, tokens })
}

/// A token vector bundled with the source it borrows from.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    source: &'a str,
    tokens: Vec<Token<'a>>,
}

impl<'a> Tokens<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            tokens: tokenize(source),
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn as_slice(&self) -> &[Token<'a>] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token<'a>> {
        self.tokens.iter()
    }

    /// Statement lines: runs of tokens between Newline tokens with comments removed.
    /// Lines holding nothing but comments are dropped.
    pub fn lines(&self) -> Vec<Line<'_, 'a>> {
        let mut out = Vec::new();
        let mut number = 1;
        let mut start = 0;
        for (i, tok) in self.tokens.iter().enumerate() {
            if tok.kind != TokenKind::Newline {
                continue;
            }
            if let Some(line) = self.line(start, i, number) {
                out.push(line);
            }
            if tok.text == "\n" {
                number += 1;
            }
            start = i + 1;
        }
        if let Some(line) = self.line(start, self.tokens.len(), number) {
            out.push(line);
        }
        out
    }

    fn line(&self, start: usize, end: usize, number: usize) -> Option<Line<'_, 'a>> {
        let mut end = end;
        // A comment always runs to the end of its line, so it can only be the last token.
        if end > start && self.tokens[end - 1].kind == TokenKind::Comment {
            end -= 1;
        }
        if end <= start {
            return None;
        }
        let tokens = &self.tokens[start..end];
        let first = tokens[0];
        let last = tokens[end - start - 1];
        let line_start = self.source[..first.offset]
            .rfind(['\n', ';'])
            .map_or(0, |i| i + 1);
        let indent = self.source[line_start..first.offset]
            .chars()
            .map(|c| if c == '\t' { 4 } else { 1 })
            .sum();
        Some(Line {
            number,
            indent,
            text: &self.source[first.offset..last.end()],
            tokens,
        })
    }
}

/// One statement: its tokens, its trimmed source text and its indentation in columns.
#[derive(Debug, Clone, Copy)]
pub struct Line<'t, 'a> {
    /// 1-based source line number.
    pub number: usize,
    pub indent: usize,
    pub text: &'a str,
    pub tokens: &'t [Token<'a>],
}

impl<'t, 'a> Line<'t, 'a> {
    pub fn offset(&self) -> usize {
        self.tokens.first().map_or(0, |t| t.offset)
    }

    pub fn first(&self) -> Option<&Token<'a>> {
        self.tokens.first()
    }

    pub fn starts_with_word(&self, word: &str) -> bool {
        self.tokens.first().is_some_and(|t| t.is_word() && t.text == word)
    }

    /// Source text after token `ix` (exclusive), trimmed.
    pub fn text_after(&self, ix: usize) -> &'a str {
        let Some(tok) = self.tokens.get(ix) else {
            return "";
        };
        let base = self.offset();
        self.text[tok.end() - base..].trim()
    }

    /// Source text from token `ix` (inclusive) to the end of the line.
    pub fn text_from(&self, ix: usize) -> &'a str {
        let Some(tok) = self.tokens.get(ix) else {
            return "";
        };
        let base = self.offset();
        self.text[tok.offset - base..].trim()
    }

    /// Source text covering tokens `from..to`.
    pub fn text_between(&self, from: usize, to: usize) -> &'a str {
        if from >= to || to > self.tokens.len() {
            return "";
        }
        let base = self.offset();
        let start = self.tokens[from].offset - base;
        let end = self.tokens[to - 1].end() - base;
        self.text[start..end].trim()
    }

    /// Index of the first token at or after `from` whose text is `text`.
    pub fn find(&self, from: usize, text: &str) -> Option<usize> {
        self.tokens
            .iter()
            .skip(from)
            .position(|t| t.text == text)
            .map(|p| p + from)
    }

    /// Concatenates the operator-like tokens starting at `ix` that touch each other
    /// (`<`,`|`,`--` become `<|--`). Returns the glued text and the index after it.
    pub fn glue(&self, ix: usize, accept: impl Fn(&Token<'a>) -> bool) -> (&'a str, usize) {
        let Some(first) = self.tokens.get(ix) else {
            return ("", ix);
        };
        if !accept(first) {
            return ("", ix);
        }
        let mut end = ix + 1;
        while let Some(next) = self.tokens.get(end) {
            if next.offset != self.tokens[end - 1].end() || !accept(next) {
                break;
            }
            end += 1;
        }
        (self.text_between(ix, end), end)
    }
}
