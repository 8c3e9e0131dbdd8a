// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! Value-expression nodes (spec.md §3, §4.2's Pratt-parsed expression
//! grammar).

use super::{IdentNode, QualifiedName};
use crate::ast::query::{OrderByItem, Query, WindowSpec};
use serde::{Deserialize, Serialize};
use text_size::TextRange;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Identifier(IdentNode),
    CompoundIdentifier(QualifiedName),
    Literal(Literal),
    Parameter(Parameter),
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expr>,
        span: TextRange,
    },
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
        span: TextRange,
    },
    Function(FunctionCall),
    Cast {
        expr: Box<Expr>,
        data_type: DataType,
        span: TextRange,
    },
    Case(CaseExpr),
    Extract {
        field: String,
        expr: Box<Expr>,
        span: TextRange,
    },
    Position {
        substring: Box<Expr>,
        string: Box<Expr>,
        span: TextRange,
    },
    Substring {
        expr: Box<Expr>,
        from: Option<Box<Expr>>,
        for_len: Option<Box<Expr>>,
        span: TextRange,
    },
    Overlay {
        expr: Box<Expr>,
        placing: Box<Expr>,
        from: Box<Expr>,
        for_len: Option<Box<Expr>>,
        span: TextRange,
    },
    Trim {
        spec: TrimSpec,
        removal: Option<Box<Expr>>,
        expr: Box<Expr>,
        span: TextRange,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
        span: TextRange,
    },
    IsDistinctFrom {
        left: Box<Expr>,
        right: Box<Expr>,
        negated: bool,
        span: TextRange,
    },
    Between {
        expr: Box<Expr>,
        negated: bool,
        low: Box<Expr>,
        high: Box<Expr>,
        span: TextRange,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
        span: TextRange,
    },
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<Query>,
        negated: bool,
        span: TextRange,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        escape: Option<Box<Expr>>,
        negated: bool,
        case_insensitive: bool,
        span: TextRange,
    },
    SimilarTo {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        escape: Option<Box<Expr>>,
        negated: bool,
        span: TextRange,
    },
    Exists {
        subquery: Box<Query>,
        negated: bool,
        span: TextRange,
    },
    Subquery(Box<Query>),
    Collate {
        expr: Box<Expr>,
        collation: QualifiedName,
        span: TextRange,
    },
    AtTimeZone {
        expr: Box<Expr>,
        zone: Box<Expr>,
        span: TextRange,
    },
    Array {
        elements: Vec<Expr>,
        span: TextRange,
    },
    Row {
        elements: Vec<Expr>,
        span: TextRange,
    },
    Nested(Box<Expr>, TextRange),
}

impl Expr {
    /// Byte span this expression covers. Every variant carries one, either
    /// directly or (for the leaf variants) on its inner node, satisfying
    /// spec.md §8's "source span covers `[0, len(s))`" property.
    pub fn span(&self) -> TextRange {
        match self {
            Expr::Identifier(n) => n.span,
            Expr::CompoundIdentifier(n) => n.span,
            Expr::Literal(l) => l.span,
            Expr::Parameter(p) => p.span,
            Expr::UnaryOp { span, .. }
            | Expr::BinaryOp { span, .. }
            | Expr::Cast { span, .. }
            | Expr::Extract { span, .. }
            | Expr::Position { span, .. }
            | Expr::Substring { span, .. }
            | Expr::Overlay { span, .. }
            | Expr::Trim { span, .. }
            | Expr::IsNull { span, .. }
            | Expr::IsDistinctFrom { span, .. }
            | Expr::Between { span, .. }
            | Expr::InList { span, .. }
            | Expr::InSubquery { span, .. }
            | Expr::Like { span, .. }
            | Expr::SimilarTo { span, .. }
            | Expr::Exists { span, .. }
            | Expr::Collate { span, .. }
            | Expr::AtTimeZone { span, .. }
            | Expr::Array { span, .. }
            | Expr::Row { span, .. } => *span,
            Expr::Function(f) => f.span,
            Expr::Case(c) => c.span,
            Expr::Subquery(q) => q.span,
            Expr::Nested(_, span) => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
    BitwiseNot,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    JsonGet,
    JsonGetText,
    JsonPathGet,
    JsonPathGetText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub value: LiteralValue,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    Number(String),
    String(String),
    EscapeString(String),
    UnicodeString(String),
    DollarQuoted(String),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub token: ParameterToken,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterToken {
    /// `$1`, `$2`, …
    Positional(u32),
    /// `:name` or `@name`.
    Named(String),
    /// `?`
    Anonymous,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum TrimSpec {
    Leading,
    Trailing,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataType {
    pub name: String,
    pub args: Vec<String>,
    pub array: bool,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseExpr {
    pub operand: Option<Box<Expr>>,
    pub branches: Vec<(Expr, Expr)>,
    pub else_result: Option<Box<Expr>>,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: QualifiedName,
    pub args: Vec<FunctionArg>,
    pub distinct: bool,
    pub order_by: Vec<OrderByItem>,
    pub filter: Option<Box<Expr>>,
    pub over: Option<WindowSpec>,
    pub span: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionArg {
    Unnamed(Expr),
    Named { name: IdentNode, value: Expr },
    Star,
}
