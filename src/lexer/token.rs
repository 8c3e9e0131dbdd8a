// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! Lexeme kinds produced by [`super::tokenize`].

use serde::{Deserialize, Serialize};
use text_size::TextRange;

/// The discriminator of a [`Lexeme`]. Matches spec.md §3 exactly, plus two
/// pragmatic additions (`SemiColon`, `Eof`) the parser needs that the data
/// model doesn't call out by name but that `Comma`/`Dot`'s sibling
/// punctuation implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LexemeKind {
    Command,
    Identifier,
    Literal,
    Operator,
    Function,
    OpenParen,
    CloseParen,
    Comma,
    Dot,
    Parameter,
    Type,
    SemiColon,
    Eof,
}

/// The position at which a comment attaches to its owning lexeme or clause.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum CommentPosition {
    Before,
    After,
}

impl Default for CommentPosition {
    fn default() -> Self {
        CommentPosition::Before
    }
}

/// An ordered group of comments attached at one position.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PositionedComments {
    pub position: CommentPosition,
    pub comments: Vec<String>,
}

/// A typed, position-bearing fragment of the input text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lexeme {
    pub kind: LexemeKind,
    pub text: String,
    /// Comments encountered between the previous lexeme and this one; they
    /// attach as `Before` comments unless a parser later relocates them to a
    /// clause's `positioned_comments` (see `ast::Comments`).
    pub comments: Vec<String>,
    pub span: TextRange,
}

impl Lexeme {
    pub fn eof(offset: u32) -> Self {
        Self {
            kind: LexemeKind::Eof,
            text: String::new(),
            comments: Vec::new(),
            span: TextRange::new(offset.into(), offset.into()),
        }
    }

    pub fn start(&self) -> usize {
        self.span.start().into()
    }

    pub fn end(&self) -> usize {
        self.span.end().into()
    }
}
