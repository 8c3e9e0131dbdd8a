// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! The parsed syntax tree (spec.md §3): a plain, owned tree of enums and
//! structs. There is no node interning and no subtree sharing — every
//! parent uniquely owns its children, same as the `Expr`/`Query`/`SetExpr`
//! family this module is grounded on
//! (`other_examples/33f78598_MaterializeInc-sqlparser__src-ast-mod.rs.rs`),
//! not on a red-green CST.

mod expr;
mod query;
mod stmt;

pub use expr::*;
pub use query::*;
pub use stmt::*;

use crate::lexer::PositionedComments;
use serde::{Deserialize, Serialize};
use text_size::TextRange;

/// Comments collected against one AST node. Every node that can plausibly
/// own a leading or trailing comment carries one of these instead of a
/// separate `leading_comments`/`trailing_comments` pair, per spec.md §9's
/// resolution of the "where do comments live" open question.
pub type Comments = Vec<PositionedComments>;

/// A single identifier occurrence, keeping both the case-folding-aware
/// [`crate::ident::Ident`] and the span it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentNode {
    pub ident: crate::ident::Ident,
    pub span: TextRange,
}

impl IdentNode {
    pub fn new(text: impl Into<String>, quoted: bool, span: TextRange) -> Self {
        Self {
            ident: crate::ident::Ident::new(text, quoted),
            span,
        }
    }

    pub fn name(&self) -> &str {
        self.ident.as_str()
    }
}

/// A dot-separated name, e.g. `schema.table` or `t.col`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifiedName {
    pub parts: Vec<IdentNode>,
    pub span: TextRange,
}

impl QualifiedName {
    pub fn single(part: IdentNode) -> Self {
        Self {
            span: part.span,
            parts: vec![part],
        }
    }

    /// The last segment, e.g. `col` in `t.col`.
    pub fn last(&self) -> &IdentNode {
        self.parts.last().expect("QualifiedName is never empty")
    }

    /// Everything but the last segment, e.g. `t` in `t.col`, or `None` for
    /// an unqualified name.
    pub fn qualifier(&self) -> Option<&[IdentNode]> {
        if self.parts.len() > 1 {
            Some(&self.parts[..self.parts.len() - 1])
        } else {
            None
        }
    }

    /// Drops span/quoting detail down to the plain [`crate::ident::QualifiedName`]
    /// used by case-folding comparisons (CTE lookups, scope resolution).
    pub fn to_ident_qualified_name(&self) -> crate::ident::QualifiedName {
        crate::ident::QualifiedName::new(self.parts.iter().map(|p| p.ident.clone()).collect())
    }
}

/// A `name` or `schema.name` alias attached to a derived/function/table
/// reference, optionally renaming its output columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableAlias {
    pub name: IdentNode,
    pub columns: Vec<IdentNode>,
}

/// What kind of AST node a value is, without needing to match its full
/// variant — used by the formatter and by diagnostics that only need a
/// human label.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    CreateTableAs,
    CreateTable,
    Query,
    Expr,
    TableFactor,
    Join,
}
