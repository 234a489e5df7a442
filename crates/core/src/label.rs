// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Label expressions for node affinity.
//!
//! A task may restrict where it runs with an expression over computer labels:
//!
//! ```text
//! linux && (x86_64 || arm64) && !flaky
//! "build farm" || built-in
//! ```
//!
//! Precedence is `!` > `&&` > `||`; parentheses group.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing a label expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("empty label expression")]
    Empty,
    #[error("unexpected '{found}' at offset {offset}")]
    Unexpected { found: String, offset: usize },
    #[error("unexpected end of label expression")]
    UnexpectedEnd,
    #[error("unterminated quote starting at offset {0}")]
    UnterminatedQuote(usize),
}

/// Parsed label expression tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelExpr {
    Atom(String),
    Not(Box<LabelExpr>),
    And(Box<LabelExpr>, Box<LabelExpr>),
    Or(Box<LabelExpr>, Box<LabelExpr>),
}

impl LabelExpr {
    fn matches(&self, labels: &BTreeSet<String>) -> bool {
        match self {
            LabelExpr::Atom(name) => labels.contains(name),
            LabelExpr::Not(inner) => !inner.matches(labels),
            LabelExpr::And(a, b) => a.matches(labels) && b.matches(labels),
            LabelExpr::Or(a, b) => a.matches(labels) || b.matches(labels),
        }
    }

    fn collect_atoms<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            LabelExpr::Atom(name) => {
                out.insert(name);
            }
            LabelExpr::Not(inner) => inner.collect_atoms(out),
            LabelExpr::And(a, b) | LabelExpr::Or(a, b) => {
                a.collect_atoms(out);
                b.collect_atoms(out);
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            LabelExpr::Or(..) => 1,
            LabelExpr::And(..) => 2,
            LabelExpr::Not(_) | LabelExpr::Atom(_) => 3,
        }
    }

    fn fmt_child(&self, child: &LabelExpr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if child.precedence() < self.precedence() {
            write!(f, "({})", child)
        } else {
            write!(f, "{}", child)
        }
    }
}

impl fmt::Display for LabelExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelExpr::Atom(name) if is_bare(name) => write!(f, "{}", name),
            LabelExpr::Atom(name) => write!(f, "\"{}\"", name),
            LabelExpr::Not(inner) => {
                write!(f, "!")?;
                self.fmt_child(inner, f)
            }
            LabelExpr::And(a, b) => {
                self.fmt_child(a, f)?;
                write!(f, " && ")?;
                self.fmt_child(b, f)
            }
            LabelExpr::Or(a, b) => {
                self.fmt_child(a, f)?;
                write!(f, " || ")?;
                self.fmt_child(b, f)
            }
        }
    }
}

/// A label expression attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label {
    expr: LabelExpr,
}

impl Label {
    /// Parse a label expression
    pub fn parse(input: &str) -> Result<Self, LabelError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(LabelError::Empty);
        }
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        if let Some((token, offset)) = parser.tokens.get(parser.pos) {
            return Err(LabelError::Unexpected {
                found: token.to_string(),
                offset: *offset,
            });
        }
        Ok(Self { expr })
    }

    /// Label that matches exactly one label name (e.g. a computer's own name)
    pub fn atom(name: impl Into<String>) -> Self {
        Self {
            expr: LabelExpr::Atom(name.into()),
        }
    }

    pub fn expr(&self) -> &LabelExpr {
        &self.expr
    }

    /// Whether a computer with `labels` satisfies this expression
    pub fn matches(&self, labels: &BTreeSet<String>) -> bool {
        self.expr.matches(labels)
    }

    /// All label names referenced by the expression
    pub fn atoms(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.expr.collect_atoms(&mut out);
        out
    }

    /// True when the expression names `label` anywhere.
    pub fn mentions(&self, label: &str) -> bool {
        self.atoms().contains(label)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}

impl FromStr for Label {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Label {
    type Error = LabelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.to_string()
    }
}

// --- Tokenizer ---

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Atom(String),
    Not,
    And,
    Or,
    Open,
    Close,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Atom(s) => write!(f, "{}", s),
            Token::Not => write!(f, "!"),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Open => write!(f, "("),
            Token::Close => write!(f, ")"),
        }
    }
}

fn is_atom_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '/' | '+' | '@')
}

fn is_bare(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_atom_char)
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, LabelError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push((Token::Open, offset)),
            ')' => tokens.push((Token::Close, offset)),
            '!' => tokens.push((Token::Not, offset)),
            '&' | '|' => match chars.next() {
                Some((_, next)) if next == c => {
                    let token = if c == '&' { Token::And } else { Token::Or };
                    tokens.push((token, offset));
                }
                _ => {
                    return Err(LabelError::Unexpected {
                        found: c.to_string(),
                        offset,
                    })
                }
            },
            '"' => {
                let mut name = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '"' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    return Err(LabelError::UnterminatedQuote(offset));
                }
                tokens.push((Token::Atom(name), offset));
            }
            c if is_atom_char(c) => {
                let mut name = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if !is_atom_char(next) {
                        break;
                    }
                    name.push(next);
                    chars.next();
                }
                tokens.push((Token::Atom(name), offset));
            }
            other => {
                return Err(LabelError::Unexpected {
                    found: other.to_string(),
                    offset,
                })
            }
        }
    }

    Ok(tokens)
}

// --- Recursive descent parser ---

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> Result<(Token, usize), LabelError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(LabelError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn parse_or(&mut self) -> Result<LabelExpr, LabelError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = LabelExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<LabelExpr, LabelError> {
        let mut left = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.parse_not()?;
            left = LabelExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<LabelExpr, LabelError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            let inner = self.parse_not()?;
            return Ok(LabelExpr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<LabelExpr, LabelError> {
        match self.next()? {
            (Token::Atom(name), _) => Ok(LabelExpr::Atom(name)),
            (Token::Open, _) => {
                let inner = self.parse_or()?;
                match self.next()? {
                    (Token::Close, _) => Ok(inner),
                    (token, offset) => Err(LabelError::Unexpected {
                        found: token.to_string(),
                        offset,
                    }),
                }
            }
            (token, offset) => Err(LabelError::Unexpected {
                found: token.to_string(),
                offset,
            }),
        }
    }
}

#[cfg(test)]
#[path = "label_tests.rs"]
mod tests;
