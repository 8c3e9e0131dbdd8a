// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! Top-level statements: `SELECT`, `INSERT`, `UPDATE`, `DELETE`, `MERGE`,
//! `CREATE TABLE [AS]` (spec.md §4.2's statement dispatch).

use super::{DataType, IdentNode, QualifiedName, SelectItem, TableWithJoins};
use crate::ast::expr::Expr;
use crate::ast::query::{Query, ValuesClause, WithClause};
use serde::{Deserialize, Serialize};
use text_size::TextRange;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Select(Box<Query>),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Merge(MergeStatement),
    CreateTableAs(CreateTableAsStatement),
    CreateTable(CreateTableStatement),
}

impl Statement {
    pub fn span(&self) -> TextRange {
        match self {
            Statement::Select(q) => q.span,
            Statement::Insert(s) => s.span,
            Statement::Update(s) => s.span,
            Statement::Delete(s) => s.span,
            Statement::Merge(s) => s.span,
            Statement::CreateTableAs(s) => s.span,
            Statement::CreateTable(s) => s.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub target: IdentNode,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertStatement {
    pub with: Option<WithClause>,
    pub table: QualifiedName,
    pub columns: Vec<IdentNode>,
    pub source: InsertSource,
    pub on_conflict: Option<OnConflict>,
    pub returning: Vec<SelectItem>,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InsertSource {
    Values(ValuesClause),
    Query(Box<Query>),
    DefaultValues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnConflict {
    pub target: Option<ConflictTarget>,
    pub action: ConflictAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConflictTarget {
    Columns(Vec<IdentNode>),
    OnConstraint(IdentNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConflictAction {
    DoNothing,
    DoUpdate {
        assignments: Vec<Assignment>,
        selection: Option<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatement {
    pub with: Option<WithClause>,
    pub table: QualifiedName,
    pub alias: Option<IdentNode>,
    pub assignments: Vec<Assignment>,
    pub from: Vec<TableWithJoins>,
    pub selection: Option<Expr>,
    pub returning: Vec<SelectItem>,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteStatement {
    pub with: Option<WithClause>,
    pub table: QualifiedName,
    pub alias: Option<IdentNode>,
    pub using: Vec<TableWithJoins>,
    pub selection: Option<Expr>,
    pub returning: Vec<SelectItem>,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeStatement {
    pub with: Option<WithClause>,
    pub target: QualifiedName,
    pub target_alias: Option<IdentNode>,
    pub source: MergeSource,
    pub source_alias: Option<IdentNode>,
    pub on: Expr,
    pub clauses: Vec<MergeClause>,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MergeSource {
    Table(QualifiedName),
    Query(Box<Query>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeClause {
    pub matched: bool,
    pub condition: Option<Expr>,
    pub action: MergeAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MergeAction {
    Update(Vec<Assignment>),
    Delete,
    Insert { columns: Vec<IdentNode>, values: Vec<Expr> },
    DoNothing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTableAsStatement {
    pub name: QualifiedName,
    pub columns: Vec<IdentNode>,
    pub temporary: bool,
    pub if_not_exists: bool,
    pub query: Box<Query>,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTableStatement {
    pub name: QualifiedName,
    pub temporary: bool,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<TableConstraint>,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: IdentNode,
    pub data_type: DataType,
    pub constraints: Vec<ColumnConstraint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnConstraint {
    NotNull,
    Null,
    PrimaryKey,
    Unique,
    Default(Expr),
    Check(Expr),
    References {
        table: QualifiedName,
        column: Option<IdentNode>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableConstraint {
    PrimaryKey(Vec<IdentNode>),
    Unique(Vec<IdentNode>),
    Check(Expr),
    ForeignKey {
        columns: Vec<IdentNode>,
        ref_table: QualifiedName,
        ref_columns: Vec<IdentNode>,
    },
}
