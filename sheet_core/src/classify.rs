//! Line classification
//!
//! A line head is tokenized just far enough to recognise
//! `name(params) = body` and `name = expr`. Everything after the binding `=`
//! is handed to the evaluator untouched.

use crate::line::split_marker;
use expr_core::lexer::{is_ident_continue, is_ident_start, is_reserved};
use expr_core::FunctionDefinition;

/// What a line asks the document pass to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    FunctionDefinition(FunctionDefinition),
    Assignment { name: String, expr: String },
    BareEvalRequest { expr: String },
    Plain,
}

impl LineKind {
    pub fn label(&self) -> &'static str {
        match self {
            LineKind::FunctionDefinition(_) => "function",
            LineKind::Assignment { .. } => "assignment",
            LineKind::BareEvalRequest { .. } => "eval",
            LineKind::Plain => "plain",
        }
    }
}

/// Classifies a raw document line
pub fn classify(line: &str) -> LineKind {
    let parts = split_marker(line);
    classify_parts(parts.expr_part, parts.has_marker())
}

/// Classifies a line already split at its marker
pub fn classify_parts(expr_part: &str, has_marker: bool) -> LineKind {
    if let Some(def) = match_function(expr_part) {
        return LineKind::FunctionDefinition(def);
    }
    if let Some((name, expr)) = match_assignment(expr_part) {
        return LineKind::Assignment { name, expr };
    }
    let expr = expr_part.trim();
    if has_marker && !expr.is_empty() {
        return LineKind::BareEvalRequest {
            expr: expr.to_string(),
        };
    }
    LineKind::Plain
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HeadToken<'a> {
    Ident(&'a str),
    LParen,
    RParen,
    Comma,
    /// A lone `=`; the payload is the byte offset just past it
    Assign(usize),
    Other,
}

/// Tokenizer for the head of a line
struct Head<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Head<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn next_token(&mut self) -> Option<HeadToken<'a>> {
        let rest = &self.text[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();

        let ch = trimmed.chars().next()?;
        if is_ident_start(ch) {
            let len = trimmed
                .find(|c: char| !is_ident_continue(c))
                .unwrap_or(trimmed.len());
            self.pos += len;
            return Some(HeadToken::Ident(&trimmed[..len]));
        }

        let next = trimmed[ch.len_utf8()..].chars().next();
        self.pos += ch.len_utf8();
        let token = match (ch, next) {
            ('(', _) => HeadToken::LParen,
            (')', _) => HeadToken::RParen,
            (',', _) => HeadToken::Comma,
            ('=', Some('=' | '>')) => HeadToken::Other,
            ('=', _) => HeadToken::Assign(self.pos),
            _ => HeadToken::Other,
        };
        Some(token)
    }

    /// Remaining text after the binding `=`, if it is not blank
    fn body(&self, after: usize) -> Option<String> {
        let body = self.text[after..].trim();
        (!body.is_empty()).then(|| body.to_string())
    }
}

fn bindable(name: &str) -> bool {
    !is_reserved(name)
}

fn match_function(text: &str) -> Option<FunctionDefinition> {
    let mut head = Head::new(text);
    let name = match head.next_token()? {
        HeadToken::Ident(name) if bindable(name) => name,
        _ => return None,
    };
    if head.next_token()? != HeadToken::LParen {
        return None;
    }

    let mut params: Vec<String> = Vec::new();
    match head.next_token()? {
        HeadToken::RParen => {}
        HeadToken::Ident(param) if bindable(param) => {
            params.push(param.to_string());
            loop {
                match head.next_token()? {
                    HeadToken::RParen => break,
                    HeadToken::Comma => match head.next_token()? {
                        HeadToken::Ident(param) if bindable(param) => {
                            params.push(param.to_string())
                        }
                        _ => return None,
                    },
                    _ => return None,
                }
            }
        }
        _ => return None,
    }

    match head.next_token()? {
        HeadToken::Assign(after) => {
            let body = head.body(after)?;
            Some(FunctionDefinition::new(name, params, body))
        }
        _ => None,
    }
}

fn match_assignment(text: &str) -> Option<(String, String)> {
    let mut head = Head::new(text);
    let name = match head.next_token()? {
        HeadToken::Ident(name) if bindable(name) => name,
        _ => return None,
    };
    match head.next_token()? {
        HeadToken::Assign(after) => Some((name.to_string(), head.body(after)?)),
        _ => None,
    }
}
