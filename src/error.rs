// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! The error taxonomy shared by every layer of the crate.
//!
//! The parser fails fast on the first [`LexicalError`]/[`SyntaxError`] it
//! hits. Analyzers that can find more than one problem in a single pass
//! (the schema validator, most notably) accumulate their findings into a
//! [`SemanticErrors`] instead of stopping at the first one.

use text_size::TextRange;

/// Reasons a [`crate::lexer::tokenize`] call can fail.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum LexicalError {
    #[error("unterminated string literal starting at byte {0}")]
    UnterminatedString(usize),
    #[error("unterminated comment starting at byte {0}")]
    UnterminatedComment(usize),
    #[error("invalid character {1:?} at byte {0}")]
    InvalidCharacter(usize, char),
    #[error("malformed dollar-quote tag at byte {0}")]
    MalformedDollarTag(usize),
}

impl LexicalError {
    pub fn offset(&self) -> usize {
        match *self {
            LexicalError::UnterminatedString(offset)
            | LexicalError::UnterminatedComment(offset)
            | LexicalError::InvalidCharacter(offset, _)
            | LexicalError::MalformedDollarTag(offset) => offset,
        }
    }
}

/// Raised by the recursive-descent parser the moment an expected token is
/// missing. Carries enough context for a caller to build a highlighted
/// diagnostic without re-walking the lexeme stream.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("at byte {offset}: expected {expected}, found {found}")]
pub struct SyntaxError {
    pub offset: usize,
    pub expected: String,
    pub found: String,
}

impl SyntaxError {
    pub fn new(offset: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            offset,
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// A single problem found by an analyzer that inspects an already-parsed
/// tree (CTE normalization, scope/schema validation, the formatter's
/// parameter-consistency check).
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum SemanticError {
    #[error("duplicate common table expression {0:?} with conflicting definitions")]
    DuplicateCommonTable(String),
    #[error("cyclic common table expressions: {}", .0.join(" -> "))]
    CyclicCommonTables(Vec<String>),
    #[error("common table expression {0:?} is missing required column aliases")]
    MissingColumnAlias(String),
    #[error("arity mismatch between sides of a set operation: {left} vs {right}")]
    ArityMismatch { left: usize, right: usize },
    #[error("unknown table {0:?}")]
    UnknownTable(String),
    #[error("unknown column {column:?} on table {table:?}")]
    UnknownColumn { table: String, column: String },
    #[error("parameter {name:?} resolves to inconsistent values within one query")]
    InconsistentParameterValue { name: String },
}

/// An accumulation of [`SemanticError`]s, e.g. every unknown table and every
/// unknown column found by [`crate::transform::schema::validate_schema`] in
/// one pass, rather than stopping at the first.
#[derive(Debug, Clone, Default, Eq, PartialEq, thiserror::Error)]
#[error("{} semantic error(s) found", .0.len())]
pub struct SemanticErrors(pub Vec<SemanticError>);

impl SemanticErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, error: SemanticError) {
        self.0.push(error);
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// External-only: invocation failures for collaborators outside the core
/// (`pg_dump`, filesystem DDL directories). The core never constructs this
/// variant; it exists here only so the taxonomy in spec.md §7 has a home for
/// the CLI driver to reuse.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("external resource error: {0}")]
pub struct ResourceError(pub String);

/// Top-level error returned by the library's public entry points.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Lexical(#[from] LexicalError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Semantic(#[from] SemanticError),
    #[error(transparent)]
    SemanticMany(#[from] SemanticErrors),
}

/// Helper used by [`crate::parse_analyze`] to report the byte offset a
/// failure happened at, regardless of which error variant it came from.
pub fn error_offset(error: &Error) -> Option<usize> {
    match error {
        Error::Lexical(e) => Some(e.offset()),
        Error::Syntax(e) => Some(e.offset),
        Error::Semantic(_) | Error::SemanticMany(_) => None,
    }
}

/// Convenience constructor mirroring spans produced by [`text_size`], used
/// by call sites that only have a `(start, end)` pair handy.
pub fn range(start: u32, end: u32) -> TextRange {
    TextRange::new(start.into(), end.into())
}
