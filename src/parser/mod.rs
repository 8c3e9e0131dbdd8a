// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! The recursive-descent parser (spec.md §4.2). [`Parser`] is a cursor over
//! the lexeme vector produced by [`crate::lexer::tokenize`] — modeled on
//! the `start`/`bump`/`expect`/`eat`/`at` cursor the teacher crate's own
//! `grammar/mod.rs` drives, adapted here to build owned AST nodes directly
//! instead of pushing rowan tree-builder events.

mod ddl;
mod dml;
mod expr;
mod query;

use crate::ast::Statement;
use crate::dialect::Dialect;
use crate::error::SyntaxError;
use crate::lexer::{self, Lexeme, LexemeKind, PositionedComments};
use text_size::TextRange;

pub struct Parser {
    tokens: Vec<Lexeme>,
    pos: usize,
    dialect: Dialect,
}

impl Parser {
    pub fn new(tokens: Vec<Lexeme>, dialect: Dialect) -> Self {
        Self {
            tokens,
            pos: 0,
            dialect,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn current(&self) -> &Lexeme {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub fn current_kind(&self) -> LexemeKind {
        self.current().kind
    }

    pub fn is_eof(&self) -> bool {
        self.current_kind() == LexemeKind::Eof
    }

    pub fn nth(&self, n: usize) -> &Lexeme {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    /// `true` if the current lexeme is a `Command` whose lower-cased text
    /// is `keyword` (keywords are already lower-cased by the tokenizer).
    pub fn at_command(&self, keyword: &str) -> bool {
        let t = self.current();
        t.kind == LexemeKind::Command && t.text == keyword
    }

    pub fn at_kind(&self, kind: LexemeKind) -> bool {
        self.current_kind() == kind
    }

    pub fn at_operator(&self, op: &str) -> bool {
        let t = self.current();
        t.kind == LexemeKind::Operator && t.text == op
    }

    /// Lenient keyword check that ignores whether the tokenizer classified
    /// `word` as a `Command`, `Type`, or bare `Identifier` — needed for
    /// multi-word forms like `AT TIME ZONE` where `TIME` is also a type
    /// name and gets tokenized as `Type`.
    pub fn at_word(&self, word: &str) -> bool {
        let t = self.current();
        matches!(t.kind, LexemeKind::Command | LexemeKind::Type | LexemeKind::Identifier)
            && t.text.eq_ignore_ascii_case(word)
    }

    pub fn eat_word(&mut self, word: &str) -> bool {
        if self.at_word(word) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn expect_word(&mut self, word: &str) -> Result<Lexeme, SyntaxError> {
        if self.at_word(word) {
            Ok(self.bump())
        } else {
            Err(self.error(format!("`{word}`")))
        }
    }

    pub fn start_offset(&self) -> u32 {
        self.current().start() as u32
    }

    /// End offset of the token just consumed — used to close off a span
    /// after a sequence of `bump`/`expect` calls.
    pub fn end_offset(&self) -> u32 {
        let idx = if self.pos == 0 { 0 } else { self.pos - 1 };
        self.tokens[idx.min(self.tokens.len() - 1)].end() as u32
    }

    pub fn span_from(&self, start: u32) -> TextRange {
        TextRange::new(start.into(), self.end_offset().max(start).into())
    }

    pub fn bump(&mut self) -> Lexeme {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    pub fn eat_command(&mut self, keyword: &str) -> bool {
        if self.at_command(keyword) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn eat_operator(&mut self, op: &str) -> bool {
        if self.at_operator(op) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn eat_kind(&mut self, kind: LexemeKind) -> bool {
        if self.at_kind(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn expect_command(&mut self, keyword: &str) -> Result<Lexeme, SyntaxError> {
        if self.at_command(keyword) {
            Ok(self.bump())
        } else {
            Err(self.error(format!("`{keyword}`")))
        }
    }

    pub fn expect_operator(&mut self, op: &str) -> Result<Lexeme, SyntaxError> {
        if self.at_operator(op) {
            Ok(self.bump())
        } else {
            Err(self.error(format!("`{op}`")))
        }
    }

    pub fn expect_kind(&mut self, kind: LexemeKind) -> Result<Lexeme, SyntaxError> {
        if self.at_kind(kind) {
            Ok(self.bump())
        } else {
            Err(self.error(format!("{kind:?}")))
        }
    }

    pub fn error(&self, expected: impl Into<String>) -> SyntaxError {
        let found = self.describe_current();
        SyntaxError::new(self.current().start(), expected, found)
    }

    fn describe_current(&self) -> String {
        let t = self.current();
        if t.kind == LexemeKind::Eof {
            "end of input".to_owned()
        } else {
            format!("{:?} {:?}", t.kind, t.text)
        }
    }

    /// Position marker for backtracking (e.g. distinguishing `(SELECT ...)`
    /// as a scalar subquery from `(a, b)` as a parenthesized row).
    pub fn mark(&self) -> usize {
        self.pos
    }

    pub fn reset(&mut self, mark: usize) {
        self.pos = mark;
    }

    /// Pulls the comments attached to the current lexeme into a
    /// [`crate::ast::Comments`] entry, without consuming the lexeme itself.
    pub fn leading_comments(&self) -> crate::ast::Comments {
        let comments = &self.current().comments;
        if comments.is_empty() {
            Vec::new()
        } else {
            vec![PositionedComments {
                position: crate::lexer::CommentPosition::Before,
                comments: comments.clone(),
            }]
        }
    }
}

/// Splits `text` on top-level (string- and comment-aware) `;` characters,
/// returning each statement's trimmed byte range alongside its text.
/// Spec.md §4.2: "A multi-statement source is split on top-level `;`
/// before dispatch."
pub fn split_statements(text: &str) -> Result<Vec<(std::ops::Range<usize>, &str)>, crate::error::LexicalError> {
    let lexemes = lexer::tokenize(text)?;
    let mut statements = Vec::new();
    let mut start: Option<usize> = None;
    let mut last_end = 0usize;

    for lexeme in &lexemes {
        if lexeme.kind == LexemeKind::Eof {
            break;
        }
        if start.is_none() {
            start = Some(lexeme.start());
        }
        if lexeme.kind == LexemeKind::SemiColon {
            let s = start.unwrap();
            let e = lexeme.start();
            push_nonempty(&mut statements, text, s, e);
            start = None;
        }
        last_end = lexeme.end();
    }
    if let Some(s) = start {
        push_nonempty(&mut statements, text, s, last_end);
    }

    Ok(statements)
}

fn push_nonempty<'a>(out: &mut Vec<(std::ops::Range<usize>, &'a str)>, text: &'a str, start: usize, end: usize) {
    if start >= end {
        return;
    }
    let slice = &text[start..end];
    if slice.trim().is_empty() {
        return;
    }
    out.push((start..end, slice));
}

/// Parses exactly one statement, dispatching on the leading keyword per
/// spec.md §4.2's "Statement dispatch" description.
pub fn parse_statement(text: &str, dialect: Dialect) -> Result<Statement, SyntaxError> {
    let tokens = lexer::tokenize(text).map_err(|e| SyntaxError::new(e.offset(), "valid lexical input", e.to_string()))?;
    let mut parser = Parser::new(tokens, dialect);
    let stmt = parse_statement_inner(&mut parser)?;
    if !parser.is_eof() {
        return Err(parser.error("end of statement"));
    }
    Ok(stmt)
}

fn parse_statement_inner(p: &mut Parser) -> Result<Statement, SyntaxError> {
    if p.at_command("with") || p.at_command("select") || p.at_command("values") {
        Ok(Statement::Select(Box::new(query::parse_query(p)?)))
    } else if p.at_command("insert") {
        Ok(Statement::Insert(dml::parse_insert(p)?))
    } else if p.at_command("update") {
        Ok(Statement::Update(dml::parse_update(p)?))
    } else if p.at_command("delete") {
        Ok(Statement::Delete(dml::parse_delete(p)?))
    } else if p.at_command("merge") {
        Ok(Statement::Merge(dml::parse_merge(p)?))
    } else if p.at_command("create") {
        ddl::parse_create(p)
    } else if p.at_kind(LexemeKind::OpenParen) {
        Ok(Statement::Select(Box::new(query::parse_query(p)?)))
    } else {
        Err(p.error("a SQL statement"))
    }
}

pub fn parse_select(text: &str, dialect: Dialect) -> Result<crate::ast::Query, SyntaxError> {
    let tokens = lexer::tokenize(text).map_err(|e| SyntaxError::new(e.offset(), "valid lexical input", e.to_string()))?;
    let mut p = Parser::new(tokens, dialect);
    let query = query::parse_query(&mut p)?;
    if !p.is_eof() {
        return Err(p.error("end of statement"));
    }
    Ok(query)
}

pub fn parse_insert(text: &str, dialect: Dialect) -> Result<crate::ast::InsertStatement, SyntaxError> {
    let tokens = lexer::tokenize(text).map_err(|e| SyntaxError::new(e.offset(), "valid lexical input", e.to_string()))?;
    let mut p = Parser::new(tokens, dialect);
    dml::parse_insert(&mut p)
}

pub fn parse_update(text: &str, dialect: Dialect) -> Result<crate::ast::UpdateStatement, SyntaxError> {
    let tokens = lexer::tokenize(text).map_err(|e| SyntaxError::new(e.offset(), "valid lexical input", e.to_string()))?;
    let mut p = Parser::new(tokens, dialect);
    dml::parse_update(&mut p)
}

pub fn parse_delete(text: &str, dialect: Dialect) -> Result<crate::ast::DeleteStatement, SyntaxError> {
    let tokens = lexer::tokenize(text).map_err(|e| SyntaxError::new(e.offset(), "valid lexical input", e.to_string()))?;
    let mut p = Parser::new(tokens, dialect);
    dml::parse_delete(&mut p)
}

pub fn parse_merge(text: &str, dialect: Dialect) -> Result<crate::ast::MergeStatement, SyntaxError> {
    let tokens = lexer::tokenize(text).map_err(|e| SyntaxError::new(e.offset(), "valid lexical input", e.to_string()))?;
    let mut p = Parser::new(tokens, dialect);
    dml::parse_merge(&mut p)
}

pub fn parse_create_table(text: &str, dialect: Dialect) -> Result<Statement, SyntaxError> {
    let tokens = lexer::tokenize(text).map_err(|e| SyntaxError::new(e.offset(), "valid lexical input", e.to_string()))?;
    let mut p = Parser::new(tokens, dialect);
    ddl::parse_create(&mut p)
}

pub fn parse_value(text: &str, dialect: Dialect) -> Result<crate::ast::Expr, SyntaxError> {
    let tokens = lexer::tokenize(text).map_err(|e| SyntaxError::new(e.offset(), "valid lexical input", e.to_string()))?;
    let mut p = Parser::new(tokens, dialect);
    let value = expr::parse_expr(&mut p)?;
    if !p.is_eof() {
        return Err(p.error("end of expression"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_top_level_semicolons() {
        let parts = split_statements("select 1; select ';' ; select 2").unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].1.trim(), "select ';'");
    }

    #[test]
    fn dispatches_select() {
        let stmt = parse_statement("select 1", Dialect::Postgres).unwrap();
        assert!(matches!(stmt, Statement::Select(_)));
    }
}
