// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! `SELECT`/set-operation/`VALUES` query nodes, `FROM`/`JOIN` table
//! references, and the clauses that hang off a query (spec.md §3, §4.2).

use super::{Comments, FunctionCall, IdentNode, QualifiedName, TableAlias};
use crate::ast::expr::Expr;
use serde::{Deserialize, Serialize};
use text_size::TextRange;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub with: Option<WithClause>,
    pub body: SetExpr,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
    pub fetch: Option<FetchClause>,
    pub locking: Vec<LockingClause>,
    pub comments: Comments,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SetExpr {
    Select(Box<SelectStatement>),
    SetOperation {
        left: Box<SetExpr>,
        op: SetOperator,
        all: bool,
        right: Box<SetExpr>,
        span: TextRange,
    },
    Values(ValuesClause),
    /// A fully parenthesized sub-query used as one side of a set operation.
    Nested(Box<Query>),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum SetOperator {
    Union,
    Intersect,
    Except,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuesClause {
    pub rows: Vec<Vec<Expr>>,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectStatement {
    pub distinct: Distinct,
    pub projection: Vec<SelectItem>,
    pub from: Vec<TableWithJoins>,
    pub selection: Option<Expr>,
    pub group_by: Option<GroupByClause>,
    pub having: Option<Expr>,
    pub windows: Vec<NamedWindow>,
    pub comments: Comments,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Distinct {
    None,
    All,
    Distinct,
    DistinctOn(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectItem {
    UnnamedExpr(Expr),
    ExprWithAlias { expr: Expr, alias: IdentNode },
    QualifiedWildcard(QualifiedName),
    Wildcard(TextRange),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableWithJoins {
    pub relation: TableFactor,
    pub joins: Vec<Join>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableFactor {
    Table {
        name: QualifiedName,
        alias: Option<TableAlias>,
        lateral: bool,
        span: TextRange,
    },
    Derived {
        subquery: Box<Query>,
        alias: Option<TableAlias>,
        lateral: bool,
        span: TextRange,
    },
    Function {
        call: FunctionCall,
        alias: Option<TableAlias>,
        with_ordinality: bool,
        lateral: bool,
        span: TextRange,
    },
    NestedJoin(Box<TableWithJoins>, TextRange),
}

impl TableFactor {
    pub fn span(&self) -> TextRange {
        match self {
            TableFactor::Table { span, .. }
            | TableFactor::Derived { span, .. }
            | TableFactor::Function { span, .. } => *span,
            TableFactor::NestedJoin(_, span) => *span,
        }
    }

    pub fn alias(&self) -> Option<&TableAlias> {
        match self {
            TableFactor::Table { alias, .. }
            | TableFactor::Derived { alias, .. }
            | TableFactor::Function { alias, .. } => alias.as_ref(),
            TableFactor::NestedJoin(_, _) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub relation: TableFactor,
    pub join_operator: JoinOperator,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JoinOperator {
    Inner(JoinConstraint),
    LeftOuter(JoinConstraint),
    RightOuter(JoinConstraint),
    FullOuter(JoinConstraint),
    CrossJoin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JoinConstraint {
    On(Expr),
    Using(Vec<IdentNode>),
    Natural,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByItem {
    pub expr: Expr,
    /// `Some(true)` = `ASC`, `Some(false)` = `DESC`, `None` = unspecified
    /// (dialect default).
    pub asc: Option<bool>,
    pub nulls_first: Option<bool>,
}

/// `GROUP BY` payload. `Cube`/`Rollup`/`GroupingSets` each hold one grouping
/// element per entry (an entry with more than one expression is a
/// parenthesized group, e.g. `cube((a, b), c)`).
///
/// Resolves spec.md §9's suspected source-of-truth bug: the formatter
/// renders `Cube`/`Rollup` as the function-call-like `cube(...)`/
/// `rollup(...)` syntax, not as a bare keyword followed by a parenthesized
/// list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GroupByClause {
    Simple(Vec<Expr>),
    Cube(Vec<Vec<Expr>>),
    Rollup(Vec<Vec<Expr>>),
    GroupingSets(Vec<Vec<Expr>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedWindow {
    pub name: IdentNode,
    pub spec: WindowSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub base_window: Option<IdentNode>,
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderByItem>,
    pub frame: Option<FrameClause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameClause {
    pub units: FrameUnits,
    pub start_bound: FrameBound,
    pub end_bound: Option<FrameBound>,
    pub exclusion: Option<FrameExclusion>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum FrameUnits {
    Range,
    Rows,
    Groups,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FrameBound {
    CurrentRow,
    Preceding(Option<Expr>),
    Following(Option<Expr>),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum FrameExclusion {
    CurrentRow,
    Group,
    Ties,
    NoOthers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchClause {
    pub quantity: Option<Expr>,
    pub with_ties: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockingClause {
    pub strength: LockStrength,
    pub of: Vec<QualifiedName>,
    pub wait: LockWait,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum LockStrength {
    Update,
    NoKeyUpdate,
    Share,
    KeyShare,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum LockWait {
    None,
    NoWait,
    SkipLocked,
}

/// A `WITH [RECURSIVE]` clause and its common table expressions (spec.md
/// §4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithClause {
    pub recursive: bool,
    pub ctes: Vec<CteDefinition>,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CteDefinition {
    pub name: IdentNode,
    pub columns: Vec<IdentNode>,
    /// `Some(true)` = `MATERIALIZED`, `Some(false)` = `NOT MATERIALIZED`,
    /// `None` = left to the planner.
    pub materialized: Option<bool>,
    pub query: Box<Query>,
    pub span: TextRange,
}
