// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! The print-token-tree formatter (spec.md §4.7): Phase A (`to_print_tokens`)
//! turns an AST into a tree of [`PrintToken`]s; Phase B (`render`) walks that
//! tree into a styled SQL string plus the parameter bag, obeying a
//! [`crate::dialect::DialectPreset`]. Split into two public functions per
//! SPEC_FULL.md §4.7 so a caller that only wants the token tree (e.g. a
//! syntax highlighter) doesn't pay for rendering.
//!
//! Grounded on the `Display` implementations of
//! `other_examples/33f78598_MaterializeInc-sqlparser__src-ast-mod.rs.rs`'s
//! `Expr`/`Query` family, adapted from direct `fmt::Display` recursion into
//! an explicit intermediate tree so parameter numbering and dialect-specific
//! escaping can be resolved in one later pass instead of being threaded
//! through every `Display` impl.

mod tokens;

pub use tokens::{ContainerType, PrintToken, PrintTokenKind};

use crate::ast::*;
use crate::dialect::{DialectPreset, ParameterStyle, ParameterSymbol};
use crate::error::SemanticError;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Caller-supplied rendering knobs (spec.md §4.7) plus the optional literal
/// values a caller wants bound into the parameter bag.
#[derive(Debug, Clone, Default)]
pub struct FormatOptions {
    pub dialect: DialectPreset,
    /// Literal values for named/positional parameters, keyed by the
    /// parameter's raw spelling (`"id"` for `:id`/`@id`, `"1"` for `$1`).
    /// Left unset, a parameter renders with no bound value in the bag.
    pub provided: HashMap<String, String>,
}

/// The formatter's second return value (spec.md §4.7's "parameter bag").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamBag {
    Named(IndexMap<String, Option<String>>),
    Positional(Vec<Option<String>>),
}

impl ParamBag {
    pub fn is_empty(&self) -> bool {
        match self {
            ParamBag::Named(m) => m.is_empty(),
            ParamBag::Positional(v) => v.is_empty(),
        }
    }
}

/// Phase A: statement/query → print-token tree. No rendering decisions are
/// made here (no escaping, no parameter symbol, no numbering) — those are
/// deferred to [`render`] so the same tree can be rendered under several
/// dialect presets.
pub fn to_print_tokens(stmt: &Statement) -> PrintToken {
    match stmt {
        Statement::Select(query) => query_tokens(query),
        Statement::Insert(insert) => insert_tokens(insert),
        Statement::Update(update) => update_tokens(update),
        Statement::Delete(delete) => delete_tokens(delete),
        Statement::Merge(merge) => merge_tokens(merge),
        Statement::CreateTableAs(cta) => create_table_as_tokens(cta),
        Statement::CreateTable(ct) => create_table_tokens(ct),
    }
}

/// Convenience wrapper combining Phase A and Phase B, mirroring spec.md §6's
/// `format(query, options) → { sql, params }`.
pub fn format_statement(stmt: &Statement, options: &FormatOptions) -> Result<(String, ParamBag), SemanticError> {
    render(&to_print_tokens(stmt), options)
}

pub fn format_query(query: &Query, options: &FormatOptions) -> Result<(String, ParamBag), SemanticError> {
    render(&query_tokens(query), options)
}

fn kw(text: impl Into<String>) -> PrintToken {
    PrintToken::leaf(PrintTokenKind::Keyword, text)
}

fn val(text: impl Into<String>) -> PrintToken {
    PrintToken::leaf(PrintTokenKind::Value, text)
}

fn op(text: impl Into<String>) -> PrintToken {
    PrintToken::leaf(PrintTokenKind::Operator, text)
}

fn comma() -> PrintToken {
    PrintToken::leaf(PrintTokenKind::Comma, ",")
}

fn dot() -> PrintToken {
    PrintToken::leaf(PrintTokenKind::Dot, ".")
}

fn lparen() -> PrintToken {
    PrintToken::leaf(PrintTokenKind::Parenthesis, "(")
}

fn rparen() -> PrintToken {
    PrintToken::leaf(PrintTokenKind::Parenthesis, ")")
}

fn container(kind: ContainerType, inner: Vec<PrintToken>) -> PrintToken {
    PrintToken::container(kind, inner)
}

fn ident_tokens(ident: &IdentNode) -> PrintToken {
    val(ident.name().to_owned())
}

fn qualified_name_tokens(name: &QualifiedName) -> PrintToken {
    let mut inner = Vec::new();
    for (i, part) in name.parts.iter().enumerate() {
        if i > 0 {
            inner.push(dot());
        }
        if part.name() == "*" {
            inner.push(op("*"));
        } else {
            inner.push(val(part.name().to_owned()));
        }
    }
    container(ContainerType::Expression, inner)
}

fn comma_list(items: impl IntoIterator<Item = PrintToken>) -> Vec<PrintToken> {
    let mut inner = Vec::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            inner.push(comma());
        }
        inner.push(item);
    }
    inner
}

fn paren_wrap(inner: Vec<PrintToken>) -> PrintToken {
    let mut v = Vec::with_capacity(inner.len() + 2);
    v.push(lparen());
    v.extend(inner);
    v.push(rparen());
    container(ContainerType::Expression, v)
}

fn table_alias_tokens(alias: &TableAlias) -> Vec<PrintToken> {
    let mut inner = vec![kw("as"), ident_tokens(&alias.name)];
    if !alias.columns.is_empty() {
        inner.push(paren_wrap(comma_list(alias.columns.iter().map(ident_tokens))));
    }
    inner
}

fn query_tokens(query: &Query) -> PrintToken {
    let mut inner = Vec::new();
    if let Some(with) = &query.with {
        inner.push(with_clause_tokens(with));
    }
    inner.push(set_expr_tokens(&query.body));
    if !query.order_by.is_empty() {
        inner.push(container(
            ContainerType::OrderBy,
            std::iter::once(kw("order by"))
                .chain(comma_list(query.order_by.iter().map(order_by_item_tokens)))
                .collect(),
        ));
    }
    if let Some(limit) = &query.limit {
        inner.push(container(ContainerType::Limit, vec![kw("limit"), expr_tokens(limit)]));
    }
    if let Some(offset) = &query.offset {
        inner.push(container(ContainerType::Offset, vec![kw("offset"), expr_tokens(offset)]));
    }
    if let Some(fetch) = &query.fetch {
        let mut fetch_inner = vec![kw("fetch next")];
        if let Some(quantity) = &fetch.quantity {
            fetch_inner.push(expr_tokens(quantity));
        }
        fetch_inner.push(kw(if fetch.with_ties { "rows with ties" } else { "rows only" }));
        inner.push(container(ContainerType::Fetch, fetch_inner));
    }
    for locking in &query.locking {
        inner.push(container(ContainerType::Expression, locking_clause_tokens(locking)));
    }
    container(ContainerType::Expression, inner)
}

fn locking_clause_tokens(locking: &LockingClause) -> Vec<PrintToken> {
    let strength = match locking.strength {
        LockStrength::Update => "for update",
        LockStrength::NoKeyUpdate => "for no key update",
        LockStrength::Share => "for share",
        LockStrength::KeyShare => "for key share",
    };
    let mut inner = vec![kw(strength)];
    if !locking.of.is_empty() {
        inner.push(kw("of"));
        inner.extend(comma_list(locking.of.iter().map(qualified_name_tokens)));
    }
    match locking.wait {
        LockWait::None => {}
        LockWait::NoWait => inner.push(kw("nowait")),
        LockWait::SkipLocked => inner.push(kw("skip locked")),
    }
    inner
}

fn with_clause_tokens(with: &WithClause) -> PrintToken {
    let head = if with.recursive { "with recursive" } else { "with" };
    let mut inner = vec![kw(head)];
    inner.extend(comma_list(with.ctes.iter().map(cte_tokens)));
    container(ContainerType::With, inner)
}

fn cte_tokens(cte: &CteDefinition) -> PrintToken {
    let mut inner = vec![ident_tokens(&cte.name)];
    if !cte.columns.is_empty() {
        inner.push(paren_wrap(comma_list(cte.columns.iter().map(ident_tokens))));
    }
    inner.push(kw("as"));
    if let Some(materialized) = cte.materialized {
        inner.push(kw(if materialized { "materialized" } else { "not materialized" }));
    }
    inner.push(paren_wrap(vec![query_tokens(&cte.query)]));
    container(ContainerType::Expression, inner)
}

fn set_expr_tokens(set_expr: &SetExpr) -> PrintToken {
    match set_expr {
        SetExpr::Select(select) => select_tokens(select),
        SetExpr::SetOperation { left, op: operator, all, right, .. } => {
            let op_text = match (operator, all) {
                (SetOperator::Union, true) => "union all",
                (SetOperator::Union, false) => "union",
                (SetOperator::Intersect, true) => "intersect all",
                (SetOperator::Intersect, false) => "intersect",
                (SetOperator::Except, true) => "except all",
                (SetOperator::Except, false) => "except",
            };
            container(ContainerType::Expression, vec![set_expr_tokens(left), kw(op_text), set_expr_tokens(right)])
        }
        SetExpr::Values(values) => values_tokens(values),
        SetExpr::Nested(query) => paren_wrap(vec![query_tokens(query)]),
    }
}

fn values_tokens(values: &ValuesClause) -> PrintToken {
    let rows = values.rows.iter().map(|row| paren_wrap(comma_list(row.iter().map(expr_tokens))));
    let mut inner = vec![kw("values")];
    inner.extend(comma_list(rows));
    container(ContainerType::Values, inner)
}

fn select_tokens(select: &SelectStatement) -> PrintToken {
    let mut inner = vec![kw("select")];
    match &select.distinct {
        Distinct::None => {}
        Distinct::All => inner.push(kw("all")),
        Distinct::Distinct => inner.push(kw("distinct")),
        Distinct::DistinctOn(exprs) => {
            inner.push(kw("distinct on"));
            inner.push(paren_wrap(comma_list(exprs.iter().map(expr_tokens))));
        }
    }
    inner.extend(comma_list(select.projection.iter().map(select_item_tokens)));
    if !select.from.is_empty() {
        inner.push(kw("from"));
        inner.extend(comma_list(select.from.iter().map(table_with_joins_tokens)));
    }
    if let Some(selection) = &select.selection {
        inner.push(container(ContainerType::Where, vec![kw("where"), expr_tokens(selection)]));
    }
    if let Some(group_by) = &select.group_by {
        inner.push(group_by_tokens(group_by));
    }
    if let Some(having) = &select.having {
        inner.push(container(ContainerType::Having, vec![kw("having"), expr_tokens(having)]));
    }
    if !select.windows.is_empty() {
        inner.push(kw("window"));
        inner.extend(comma_list(select.windows.iter().map(named_window_tokens)));
    }
    container(ContainerType::Select, inner)
}

fn select_item_tokens(item: &SelectItem) -> PrintToken {
    match item {
        SelectItem::UnnamedExpr(e) => expr_tokens(e),
        SelectItem::ExprWithAlias { expr, alias } => {
            container(ContainerType::Expression, vec![expr_tokens(expr), kw("as"), ident_tokens(alias)])
        }
        SelectItem::QualifiedWildcard(name) => {
            let mut inner = Vec::new();
            for part in &name.parts {
                inner.push(val(part.name().to_owned()));
                inner.push(dot());
            }
            inner.push(op("*"));
            container(ContainerType::Expression, inner)
        }
        SelectItem::Wildcard(_) => op("*"),
    }
}

fn table_with_joins_tokens(twj: &TableWithJoins) -> PrintToken {
    let mut inner = vec![table_factor_tokens(&twj.relation)];
    for join in &twj.joins {
        inner.push(join_tokens(join));
    }
    container(ContainerType::Join, inner)
}

fn table_factor_tokens(tf: &TableFactor) -> PrintToken {
    match tf {
        TableFactor::Table { name, alias, lateral, .. } => {
            let mut inner = Vec::new();
            if *lateral {
                inner.push(kw("lateral"));
            }
            inner.push(qualified_name_tokens(name));
            if let Some(a) = alias {
                inner.extend(table_alias_tokens(a));
            }
            container(ContainerType::Expression, inner)
        }
        TableFactor::Derived { subquery, alias, lateral, .. } => {
            let mut inner = Vec::new();
            if *lateral {
                inner.push(kw("lateral"));
            }
            inner.push(paren_wrap(vec![query_tokens(subquery)]));
            if let Some(a) = alias {
                inner.extend(table_alias_tokens(a));
            }
            container(ContainerType::Expression, inner)
        }
        TableFactor::Function { call, alias, with_ordinality, lateral, .. } => {
            let mut inner = Vec::new();
            if *lateral {
                inner.push(kw("lateral"));
            }
            inner.push(function_call_tokens(call));
            if *with_ordinality {
                inner.push(kw("with ordinality"));
            }
            if let Some(a) = alias {
                inner.extend(table_alias_tokens(a));
            }
            container(ContainerType::Expression, inner)
        }
        TableFactor::NestedJoin(twj, _) => paren_wrap(vec![table_with_joins_tokens(twj)]),
    }
}

fn join_tokens(join: &Join) -> PrintToken {
    let (head, constraint) = match &join.join_operator {
        JoinOperator::Inner(c) => ("join", Some(c)),
        JoinOperator::LeftOuter(c) => ("left join", Some(c)),
        JoinOperator::RightOuter(c) => ("right join", Some(c)),
        JoinOperator::FullOuter(c) => ("full join", Some(c)),
        JoinOperator::CrossJoin => ("cross join", None),
    };
    let mut inner = vec![kw(head), table_factor_tokens(&join.relation)];
    match constraint {
        Some(JoinConstraint::On(expr)) => {
            inner.push(kw("on"));
            inner.push(expr_tokens(expr));
        }
        Some(JoinConstraint::Using(cols)) => {
            inner.push(kw("using"));
            inner.push(paren_wrap(comma_list(cols.iter().map(ident_tokens))));
        }
        Some(JoinConstraint::Natural) | None => {}
    }
    container(ContainerType::Join, inner)
}

fn group_by_tokens(group_by: &GroupByClause) -> PrintToken {
    fn grouping_list(groups: &[Vec<Expr>]) -> Vec<PrintToken> {
        comma_list(groups.iter().map(|group| {
            if group.len() == 1 {
                expr_tokens(&group[0])
            } else {
                paren_wrap(comma_list(group.iter().map(expr_tokens)))
            }
        }))
    }
    let inner = match group_by {
        GroupByClause::Simple(exprs) => {
            let mut v = vec![kw("group by")];
            v.extend(comma_list(exprs.iter().map(expr_tokens)));
            v
        }
        GroupByClause::Cube(groups) => {
            let mut v = vec![kw("group by"), val("cube".to_owned())];
            v.push(paren_wrap(grouping_list(groups)));
            v
        }
        GroupByClause::Rollup(groups) => {
            let mut v = vec![kw("group by"), val("rollup".to_owned())];
            v.push(paren_wrap(grouping_list(groups)));
            v
        }
        GroupByClause::GroupingSets(groups) => {
            let mut v = vec![kw("group by"), kw("grouping sets")];
            v.push(paren_wrap(grouping_list(groups)));
            v
        }
    };
    container(ContainerType::GroupBy, inner)
}

fn named_window_tokens(window: &NamedWindow) -> PrintToken {
    container(
        ContainerType::Expression,
        vec![ident_tokens(&window.name), kw("as"), paren_wrap(vec![window_spec_tokens(&window.spec)])],
    )
}

fn window_spec_tokens(spec: &WindowSpec) -> PrintToken {
    let mut inner = Vec::new();
    if let Some(base) = &spec.base_window {
        inner.push(ident_tokens(base));
    }
    if !spec.partition_by.is_empty() {
        inner.push(kw("partition by"));
        inner.extend(comma_list(spec.partition_by.iter().map(expr_tokens)));
    }
    if !spec.order_by.is_empty() {
        inner.push(kw("order by"));
        inner.extend(comma_list(spec.order_by.iter().map(order_by_item_tokens)));
    }
    if let Some(frame) = &spec.frame {
        inner.push(frame_clause_tokens(frame));
    }
    container(ContainerType::Expression, inner)
}

fn frame_clause_tokens(frame: &FrameClause) -> PrintToken {
    let units = match frame.units {
        FrameUnits::Range => "range",
        FrameUnits::Rows => "rows",
        FrameUnits::Groups => "groups",
    };
    let mut inner = vec![kw(units)];
    if let Some(end) = &frame.end_bound {
        inner.push(kw("between"));
        inner.push(frame_bound_tokens(&frame.start_bound));
        inner.push(kw("and"));
        inner.push(frame_bound_tokens(end));
    } else {
        inner.push(frame_bound_tokens(&frame.start_bound));
    }
    if let Some(exclusion) = frame.exclusion {
        inner.push(kw(match exclusion {
            FrameExclusion::CurrentRow => "exclude current row",
            FrameExclusion::Group => "exclude group",
            FrameExclusion::Ties => "exclude ties",
            FrameExclusion::NoOthers => "exclude no others",
        }));
    }
    container(ContainerType::Expression, inner)
}

fn frame_bound_tokens(bound: &FrameBound) -> PrintToken {
    match bound {
        FrameBound::CurrentRow => kw("current row"),
        FrameBound::Preceding(None) => kw("unbounded preceding"),
        FrameBound::Preceding(Some(e)) => container(ContainerType::Expression, vec![expr_tokens(e), kw("preceding")]),
        FrameBound::Following(None) => kw("unbounded following"),
        FrameBound::Following(Some(e)) => container(ContainerType::Expression, vec![expr_tokens(e), kw("following")]),
    }
}

fn order_by_item_tokens(item: &OrderByItem) -> PrintToken {
    let mut inner = vec![expr_tokens(&item.expr)];
    if let Some(asc) = item.asc {
        inner.push(kw(if asc { "asc" } else { "desc" }));
    }
    if let Some(nulls_first) = item.nulls_first {
        inner.push(kw(if nulls_first { "nulls first" } else { "nulls last" }));
    }
    container(ContainerType::Expression, inner)
}

fn function_call_tokens(call: &FunctionCall) -> PrintToken {
    let mut inner = vec![qualified_name_tokens(&call.name)];
    let mut args = Vec::new();
    if call.distinct {
        args.push(kw("distinct"));
    }
    args.extend(comma_list(call.args.iter().map(function_arg_tokens)));
    inner.push(paren_wrap(args));
    if !call.order_by.is_empty() {
        inner.push(kw("order by"));
        inner.extend(comma_list(call.order_by.iter().map(order_by_item_tokens)));
    }
    if let Some(filter) = &call.filter {
        inner.push(kw("filter"));
        inner.push(paren_wrap(vec![kw("where"), expr_tokens(filter)]));
    }
    if let Some(over) = &call.over {
        inner.push(kw("over"));
        inner.push(paren_wrap(vec![window_spec_tokens(over)]));
    }
    container(ContainerType::Expression, inner)
}

fn function_arg_tokens(arg: &FunctionArg) -> PrintToken {
    match arg {
        FunctionArg::Unnamed(e) => expr_tokens(e),
        FunctionArg::Named { name, value } => {
            container(ContainerType::Expression, vec![ident_tokens(name), op("=>"), expr_tokens(value)])
        }
        FunctionArg::Star => op("*"),
    }
}

fn data_type_tokens(dt: &DataType) -> PrintToken {
    let mut inner = vec![PrintToken::leaf(PrintTokenKind::Type, dt.name.clone())];
    if !dt.args.is_empty() {
        inner.push(paren_wrap(comma_list(dt.args.iter().map(|a| val(a.clone())))));
    }
    if dt.array {
        inner.push(op("[]"));
    }
    container(ContainerType::Expression, inner)
}

fn literal_tokens(lit: &Literal) -> PrintToken {
    let text = match &lit.value {
        LiteralValue::Number(n) => n.clone(),
        LiteralValue::String(s) => format!("'{}'", s.replace('\'', "''")),
        LiteralValue::EscapeString(s) => format!("E'{}'", s.replace('\'', "''")),
        LiteralValue::UnicodeString(s) => format!("U&'{}'", s.replace('\'', "''")),
        LiteralValue::DollarQuoted(s) => format!("${}$", s),
        LiteralValue::Boolean(b) => b.to_string(),
        LiteralValue::Null => "null".to_owned(),
    };
    PrintToken::leaf(PrintTokenKind::Value, text)
}

fn parameter_tokens(param: &Parameter) -> PrintToken {
    let key = match &param.token {
        ParameterToken::Positional(n) => n.to_string(),
        ParameterToken::Named(name) => name.clone(),
        ParameterToken::Anonymous => String::new(),
    };
    PrintToken::leaf(PrintTokenKind::Parameter, key)
}

fn expr_tokens(expr: &Expr) -> PrintToken {
    match expr {
        Expr::Identifier(ident) => ident_tokens(ident),
        Expr::CompoundIdentifier(name) => qualified_name_tokens(name),
        Expr::Literal(lit) => literal_tokens(lit),
        Expr::Parameter(param) => parameter_tokens(param),
        Expr::UnaryOp { op: operator, expr, .. } => {
            let text = match operator {
                UnaryOperator::Plus => "+",
                UnaryOperator::Minus => "-",
                UnaryOperator::Not => "not",
                UnaryOperator::BitwiseNot => "~",
            };
            container(ContainerType::Expression, vec![op(text), expr_tokens(expr)])
        }
        Expr::BinaryOp { left, op: operator, right, .. } => {
            let text = binary_operator_text(*operator);
            container(ContainerType::Expression, vec![expr_tokens(left), op(text), expr_tokens(right)])
        }
        Expr::Function(call) => function_call_tokens(call),
        Expr::Cast { expr, data_type, .. } => container(
            ContainerType::Expression,
            vec![kw("cast"), paren_wrap(vec![expr_tokens(expr), kw("as"), data_type_tokens(data_type)])],
        ),
        Expr::Case(case) => case_tokens(case),
        Expr::Extract { field, expr, .. } => container(
            ContainerType::Expression,
            vec![kw("extract"), paren_wrap(vec![val(field.clone()), kw("from"), expr_tokens(expr)])],
        ),
        Expr::Position { substring, string, .. } => container(
            ContainerType::Expression,
            vec![kw("position"), paren_wrap(vec![expr_tokens(substring), kw("in"), expr_tokens(string)])],
        ),
        Expr::Substring { expr, from, for_len, .. } => {
            let mut inner = vec![expr_tokens(expr)];
            if let Some(f) = from {
                inner.push(kw("from"));
                inner.push(expr_tokens(f));
            }
            if let Some(l) = for_len {
                inner.push(kw("for"));
                inner.push(expr_tokens(l));
            }
            container(ContainerType::Expression, vec![kw("substring"), paren_wrap(inner)])
        }
        Expr::Overlay { expr, placing, from, for_len, .. } => {
            let mut inner = vec![expr_tokens(expr), kw("placing"), expr_tokens(placing), kw("from"), expr_tokens(from)];
            if let Some(l) = for_len {
                inner.push(kw("for"));
                inner.push(expr_tokens(l));
            }
            container(ContainerType::Expression, vec![kw("overlay"), paren_wrap(inner)])
        }
        Expr::Trim { spec, removal, expr, .. } => {
            let mut inner = vec![kw(match spec {
                TrimSpec::Leading => "leading",
                TrimSpec::Trailing => "trailing",
                TrimSpec::Both => "both",
            })];
            if let Some(r) = removal {
                inner.push(expr_tokens(r));
            }
            inner.push(kw("from"));
            inner.push(expr_tokens(expr));
            container(ContainerType::Expression, vec![kw("trim"), paren_wrap(inner)])
        }
        Expr::IsNull { expr, negated, .. } => {
            let mut inner = vec![expr_tokens(expr), kw("is")];
            if *negated {
                inner.push(kw("not"));
            }
            inner.push(kw("null"));
            container(ContainerType::Expression, inner)
        }
        Expr::IsDistinctFrom { left, right, negated, .. } => {
            let mut inner = vec![expr_tokens(left), kw("is")];
            if *negated {
                inner.push(kw("not"));
            }
            inner.push(kw("distinct from"));
            inner.push(expr_tokens(right));
            container(ContainerType::Expression, inner)
        }
        Expr::Between { expr, negated, low, high, .. } => {
            let mut inner = vec![expr_tokens(expr)];
            if *negated {
                inner.push(kw("not"));
            }
            inner.push(kw("between"));
            inner.push(expr_tokens(low));
            inner.push(kw("and"));
            inner.push(expr_tokens(high));
            container(ContainerType::Expression, inner)
        }
        Expr::InList { expr, list, negated, .. } => {
            let mut inner = vec![expr_tokens(expr)];
            if *negated {
                inner.push(kw("not"));
            }
            inner.push(kw("in"));
            inner.push(paren_wrap(comma_list(list.iter().map(expr_tokens))));
            container(ContainerType::Expression, inner)
        }
        Expr::InSubquery { expr, subquery, negated, .. } => {
            let mut inner = vec![expr_tokens(expr)];
            if *negated {
                inner.push(kw("not"));
            }
            inner.push(kw("in"));
            inner.push(paren_wrap(vec![query_tokens(subquery)]));
            container(ContainerType::Expression, inner)
        }
        Expr::Like { expr, pattern, escape, negated, case_insensitive, .. } => {
            let mut inner = vec![expr_tokens(expr)];
            if *negated {
                inner.push(kw("not"));
            }
            inner.push(kw(if *case_insensitive { "ilike" } else { "like" }));
            inner.push(expr_tokens(pattern));
            if let Some(e) = escape {
                inner.push(kw("escape"));
                inner.push(expr_tokens(e));
            }
            container(ContainerType::Expression, inner)
        }
        Expr::SimilarTo { expr, pattern, escape, negated, .. } => {
            let mut inner = vec![expr_tokens(expr)];
            if *negated {
                inner.push(kw("not"));
            }
            inner.push(kw("similar to"));
            inner.push(expr_tokens(pattern));
            if let Some(e) = escape {
                inner.push(kw("escape"));
                inner.push(expr_tokens(e));
            }
            container(ContainerType::Expression, inner)
        }
        Expr::Exists { subquery, negated, .. } => {
            let mut inner = Vec::new();
            if *negated {
                inner.push(kw("not"));
            }
            inner.push(kw("exists"));
            inner.push(paren_wrap(vec![query_tokens(subquery)]));
            container(ContainerType::Expression, inner)
        }
        Expr::Subquery(query) => paren_wrap(vec![query_tokens(query)]),
        Expr::Collate { expr, collation, .. } => {
            container(ContainerType::Expression, vec![expr_tokens(expr), kw("collate"), qualified_name_tokens(collation)])
        }
        Expr::AtTimeZone { expr, zone, .. } => {
            container(ContainerType::Expression, vec![expr_tokens(expr), kw("at time zone"), expr_tokens(zone)])
        }
        Expr::Array { elements, .. } => {
            container(ContainerType::Expression, vec![kw("array"), paren_wrap(comma_list(elements.iter().map(expr_tokens)))])
        }
        Expr::Row { elements, .. } => paren_wrap(comma_list(elements.iter().map(expr_tokens))),
        Expr::Nested(inner, _) => paren_wrap(vec![expr_tokens(inner)]),
    }
}

fn binary_operator_text(operator: BinaryOperator) -> &'static str {
    match operator {
        BinaryOperator::Add => "+",
        BinaryOperator::Subtract => "-",
        BinaryOperator::Multiply => "*",
        BinaryOperator::Divide => "/",
        BinaryOperator::Modulo => "%",
        BinaryOperator::Concat => "||",
        BinaryOperator::Eq => "=",
        BinaryOperator::NotEq => "<>",
        BinaryOperator::Lt => "<",
        BinaryOperator::LtEq => "<=",
        BinaryOperator::Gt => ">",
        BinaryOperator::GtEq => ">=",
        BinaryOperator::And => "and",
        BinaryOperator::Or => "or",
        BinaryOperator::BitwiseAnd => "&",
        BinaryOperator::BitwiseOr => "|",
        BinaryOperator::BitwiseXor => "#",
        BinaryOperator::JsonGet => "->",
        BinaryOperator::JsonGetText => "->>",
        BinaryOperator::JsonPathGet => "#>",
        BinaryOperator::JsonPathGetText => "#>>",
    }
}

fn case_tokens(case: &CaseExpr) -> PrintToken {
    let mut inner = vec![kw("case")];
    if let Some(operand) = &case.operand {
        inner.push(expr_tokens(operand));
    }
    for (when, then) in &case.branches {
        inner.push(kw("when"));
        inner.push(expr_tokens(when));
        inner.push(kw("then"));
        inner.push(expr_tokens(then));
    }
    if let Some(else_result) = &case.else_result {
        inner.push(kw("else"));
        inner.push(expr_tokens(else_result));
    }
    inner.push(kw("end"));
    container(ContainerType::Expression, inner)
}

fn returning_tokens(items: &[SelectItem]) -> PrintToken {
    let mut inner = vec![kw("returning")];
    inner.extend(comma_list(items.iter().map(select_item_tokens)));
    container(ContainerType::Expression, inner)
}

fn insert_tokens(insert: &InsertStatement) -> PrintToken {
    let mut inner = Vec::new();
    if let Some(with) = &insert.with {
        inner.push(with_clause_tokens(with));
    }
    inner.push(kw("insert into"));
    inner.push(qualified_name_tokens(&insert.table));
    if !insert.columns.is_empty() {
        inner.push(paren_wrap(comma_list(insert.columns.iter().map(ident_tokens))));
    }
    match &insert.source {
        InsertSource::Values(values) => inner.push(values_tokens(values)),
        InsertSource::Query(query) => inner.push(query_tokens(query)),
        InsertSource::DefaultValues => inner.push(kw("default values")),
    }
    if let Some(on_conflict) = &insert.on_conflict {
        inner.push(on_conflict_tokens(on_conflict));
    }
    if !insert.returning.is_empty() {
        inner.push(returning_tokens(&insert.returning));
    }
    container(ContainerType::Insert, inner)
}

fn on_conflict_tokens(on_conflict: &OnConflict) -> PrintToken {
    let mut inner = vec![kw("on conflict")];
    match &on_conflict.target {
        Some(ConflictTarget::Columns(cols)) => inner.push(paren_wrap(comma_list(cols.iter().map(ident_tokens)))),
        Some(ConflictTarget::OnConstraint(name)) => {
            inner.push(kw("on constraint"));
            inner.push(ident_tokens(name));
        }
        None => {}
    }
    match &on_conflict.action {
        ConflictAction::DoNothing => inner.push(kw("do nothing")),
        ConflictAction::DoUpdate { assignments, selection } => {
            inner.push(kw("do update set"));
            inner.extend(comma_list(assignments.iter().map(assignment_tokens)));
            if let Some(selection) = selection {
                inner.push(kw("where"));
                inner.push(expr_tokens(selection));
            }
        }
    }
    container(ContainerType::Expression, inner)
}

fn assignment_tokens(assignment: &Assignment) -> PrintToken {
    container(ContainerType::Expression, vec![ident_tokens(&assignment.target), op("="), expr_tokens(&assignment.value)])
}

fn update_tokens(update: &UpdateStatement) -> PrintToken {
    let mut inner = Vec::new();
    if let Some(with) = &update.with {
        inner.push(with_clause_tokens(with));
    }
    inner.push(kw("update"));
    inner.push(qualified_name_tokens(&update.table));
    if let Some(alias) = &update.alias {
        inner.push(ident_tokens(alias));
    }
    inner.push(kw("set"));
    inner.extend(comma_list(update.assignments.iter().map(assignment_tokens)));
    if !update.from.is_empty() {
        inner.push(kw("from"));
        inner.extend(comma_list(update.from.iter().map(table_with_joins_tokens)));
    }
    if let Some(selection) = &update.selection {
        inner.push(kw("where"));
        inner.push(expr_tokens(selection));
    }
    if !update.returning.is_empty() {
        inner.push(returning_tokens(&update.returning));
    }
    container(ContainerType::Update, inner)
}

fn delete_tokens(delete: &DeleteStatement) -> PrintToken {
    let mut inner = Vec::new();
    if let Some(with) = &delete.with {
        inner.push(with_clause_tokens(with));
    }
    inner.push(kw("delete from"));
    inner.push(qualified_name_tokens(&delete.table));
    if let Some(alias) = &delete.alias {
        inner.push(ident_tokens(alias));
    }
    if !delete.using.is_empty() {
        inner.push(kw("using"));
        inner.extend(comma_list(delete.using.iter().map(table_with_joins_tokens)));
    }
    if let Some(selection) = &delete.selection {
        inner.push(kw("where"));
        inner.push(expr_tokens(selection));
    }
    if !delete.returning.is_empty() {
        inner.push(returning_tokens(&delete.returning));
    }
    container(ContainerType::Delete, inner)
}

fn merge_tokens(merge: &MergeStatement) -> PrintToken {
    let mut inner = Vec::new();
    if let Some(with) = &merge.with {
        inner.push(with_clause_tokens(with));
    }
    inner.push(kw("merge into"));
    inner.push(qualified_name_tokens(&merge.target));
    if let Some(alias) = &merge.target_alias {
        inner.push(ident_tokens(alias));
    }
    inner.push(kw("using"));
    match &merge.source {
        MergeSource::Table(name) => inner.push(qualified_name_tokens(name)),
        MergeSource::Query(query) => inner.push(paren_wrap(vec![query_tokens(query)])),
    }
    if let Some(alias) = &merge.source_alias {
        inner.push(ident_tokens(alias));
    }
    inner.push(kw("on"));
    inner.push(expr_tokens(&merge.on));
    for clause in &merge.clauses {
        inner.push(merge_clause_tokens(clause));
    }
    container(ContainerType::Merge, inner)
}

fn merge_clause_tokens(clause: &MergeClause) -> PrintToken {
    let mut inner = vec![kw(if clause.matched { "when matched" } else { "when not matched" })];
    if let Some(condition) = &clause.condition {
        inner.push(kw("and"));
        inner.push(expr_tokens(condition));
    }
    inner.push(kw("then"));
    inner.push(merge_action_tokens(&clause.action));
    container(ContainerType::Expression, inner)
}

fn merge_action_tokens(action: &MergeAction) -> PrintToken {
    match action {
        MergeAction::Update(assignments) => {
            let mut inner = vec![kw("update set")];
            inner.extend(comma_list(assignments.iter().map(assignment_tokens)));
            container(ContainerType::Expression, inner)
        }
        MergeAction::Delete => kw("delete"),
        MergeAction::Insert { columns, values } => {
            let mut inner = vec![kw("insert")];
            if !columns.is_empty() {
                inner.push(paren_wrap(comma_list(columns.iter().map(ident_tokens))));
            }
            inner.push(kw("values"));
            inner.push(paren_wrap(comma_list(values.iter().map(expr_tokens))));
            container(ContainerType::Expression, inner)
        }
        MergeAction::DoNothing => kw("do nothing"),
    }
}

fn create_table_as_tokens(cta: &CreateTableAsStatement) -> PrintToken {
    let mut inner = vec![kw("create")];
    if cta.temporary {
        inner.push(kw("temporary"));
    }
    inner.push(kw("table"));
    if cta.if_not_exists {
        inner.push(kw("if not exists"));
    }
    inner.push(qualified_name_tokens(&cta.name));
    if !cta.columns.is_empty() {
        inner.push(paren_wrap(comma_list(cta.columns.iter().map(ident_tokens))));
    }
    inner.push(kw("as"));
    inner.push(query_tokens(&cta.query));
    container(ContainerType::CreateTable, inner)
}

fn create_table_tokens(ct: &CreateTableStatement) -> PrintToken {
    let mut inner = vec![kw("create")];
    if ct.temporary {
        inner.push(kw("temporary"));
    }
    inner.push(kw("table"));
    if ct.if_not_exists {
        inner.push(kw("if not exists"));
    }
    inner.push(qualified_name_tokens(&ct.name));
    let mut elements: Vec<PrintToken> = ct.columns.iter().map(column_def_tokens).collect();
    elements.extend(ct.constraints.iter().map(table_constraint_tokens));
    inner.push(paren_wrap(comma_list(elements)));
    container(ContainerType::CreateTable, inner)
}

fn column_def_tokens(col: &ColumnDef) -> PrintToken {
    let mut inner = vec![ident_tokens(&col.name), data_type_tokens(&col.data_type)];
    for constraint in &col.constraints {
        inner.push(column_constraint_tokens(constraint));
    }
    container(ContainerType::Expression, inner)
}

fn column_constraint_tokens(constraint: &ColumnConstraint) -> PrintToken {
    match constraint {
        ColumnConstraint::NotNull => kw("not null"),
        ColumnConstraint::Null => kw("null"),
        ColumnConstraint::PrimaryKey => kw("primary key"),
        ColumnConstraint::Unique => kw("unique"),
        ColumnConstraint::Default(e) => container(ContainerType::Expression, vec![kw("default"), expr_tokens(e)]),
        ColumnConstraint::Check(e) => container(ContainerType::Expression, vec![kw("check"), paren_wrap(vec![expr_tokens(e)])]),
        ColumnConstraint::References { table, column } => {
            let mut inner = vec![kw("references"), qualified_name_tokens(table)];
            if let Some(c) = column {
                inner.push(paren_wrap(vec![ident_tokens(c)]));
            }
            container(ContainerType::Expression, inner)
        }
    }
}

fn table_constraint_tokens(constraint: &TableConstraint) -> PrintToken {
    match constraint {
        TableConstraint::PrimaryKey(cols) => {
            container(ContainerType::Expression, vec![kw("primary key"), paren_wrap(comma_list(cols.iter().map(ident_tokens)))])
        }
        TableConstraint::Unique(cols) => {
            container(ContainerType::Expression, vec![kw("unique"), paren_wrap(comma_list(cols.iter().map(ident_tokens)))])
        }
        TableConstraint::Check(e) => container(ContainerType::Expression, vec![kw("check"), paren_wrap(vec![expr_tokens(e)])]),
        TableConstraint::ForeignKey { columns, ref_table, ref_columns } => {
            let mut inner = vec![kw("foreign key"), paren_wrap(comma_list(columns.iter().map(ident_tokens))), kw("references"), qualified_name_tokens(ref_table)];
            if !ref_columns.is_empty() {
                inner.push(paren_wrap(comma_list(ref_columns.iter().map(ident_tokens))));
            }
            container(ContainerType::Expression, inner)
        }
    }
}

/// Phase B: renders a print-token tree into styled SQL text plus its
/// parameter bag, per the dialect preset in `options`.
pub fn render(root: &PrintToken, options: &FormatOptions) -> Result<(String, ParamBag), SemanticError> {
    let mut leaves = Vec::new();
    tokens::flatten(root, &mut leaves);

    let escape = options.dialect.identifier_escape;
    let mut out = String::new();
    let mut prev: Option<&PrintToken> = None;

    let mut next_index = 1u32;
    let mut seen_keys: HashMap<String, String> = HashMap::new();
    let mut named_bag: IndexMap<String, Option<String>> = IndexMap::new();
    let mut positional_bag: Vec<Option<String>> = Vec::new();
    let mut assigned_numbers: HashMap<String, u32> = HashMap::new();

    for leaf in &leaves {
        if tokens::needs_space_before(prev, leaf) {
            out.push(' ');
        }
        match leaf.kind {
            PrintTokenKind::Value => {
                if is_quotable_identifier(leaf) {
                    out.push(escape.0);
                    out.push_str(&leaf.text.replace(escape.1, &format!("{0}{0}", escape.1)));
                    out.push(escape.1);
                } else {
                    out.push_str(&leaf.text);
                }
            }
            PrintTokenKind::Parameter => {
                let key = leaf.text.clone();
                let assign_key = if key.is_empty() { format!("__anon{next_index}") } else { key.clone() };
                let number = *assigned_numbers.entry(assign_key.clone()).or_insert_with(|| {
                    let n = next_index;
                    next_index += 1;
                    n
                });
                // The lexer keeps the `:`/`@` sigil inside a named parameter's
                // text (`:id`, `@id`); strip it so dialect rendering doesn't
                // double it up (`::id`).
                let display_name = if key.is_empty() {
                    format!("p{number}")
                } else {
                    key.trim_start_matches([':', '@']).to_owned()
                };
                let provided = options.provided.get(&display_name).or_else(|| options.provided.get(&number.to_string())).cloned();

                if let Some(value) = &provided {
                    let fold_key = display_name.to_lowercase();
                    if let Some(existing) = seen_keys.get(&fold_key) {
                        if existing != value {
                            return Err(SemanticError::InconsistentParameterValue { name: display_name });
                        }
                    } else {
                        seen_keys.insert(fold_key, value.clone());
                    }
                }

                out.push_str(&parameter_placeholder(
                    &options.dialect.parameter_symbol,
                    options.dialect.parameter_style,
                    number,
                    &display_name,
                ));

                match options.dialect.parameter_style {
                    ParameterStyle::Named => {
                        named_bag.entry(display_name).or_insert(provided);
                    }
                    _ => {
                        while positional_bag.len() < number as usize {
                            positional_bag.push(None);
                        }
                        positional_bag[number as usize - 1] = provided;
                    }
                }
            }
            _ => out.push_str(&leaf.text),
        }
        prev = Some(leaf);
    }

    let bag = match options.dialect.parameter_style {
        ParameterStyle::Named => ParamBag::Named(named_bag),
        _ => ParamBag::Positional(positional_bag),
    };
    Ok((out, bag))
}

fn is_quotable_identifier(leaf: &PrintToken) -> bool {
    leaf.kind == PrintTokenKind::Value && leaf.text != "*" && !leaf.text.is_empty()
}

/// Renders one parameter placeholder under the dialect's configured
/// [`ParameterSymbol`] (spec.md §4.7: `?`, `$1`/`$2`/…, or `:name`/`@name`
/// selected by the preset, not hardcoded by this function).
fn parameter_placeholder(symbol: &ParameterSymbol, style: ParameterStyle, number: u32, display_name: &str) -> String {
    match style {
        ParameterStyle::Anonymous => match symbol {
            ParameterSymbol::Fixed(sigil) => sigil.clone(),
            ParameterSymbol::Bracketing(start, end) => format!("{start}{end}"),
        },
        ParameterStyle::Indexed => match symbol {
            ParameterSymbol::Fixed(sigil) => format!("{sigil}{number}"),
            ParameterSymbol::Bracketing(start, end) => format!("{start}{number}{end}"),
        },
        ParameterStyle::Named => match symbol {
            ParameterSymbol::Fixed(sigil) => format!("{sigil}{display_name}"),
            ParameterSymbol::Bracketing(start, end) => format!("{start}{display_name}{end}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::parser;

    #[test]
    fn renders_simple_select_with_named_parameter() {
        let query = parser::parse_select("select id, name from users where id = :id", Dialect::Oracle).unwrap();
        let options = FormatOptions { dialect: Dialect::Oracle.preset(), provided: HashMap::new() };
        let (sql, bag) = format_query(&query, &options).unwrap();
        assert_eq!(sql, "select \"id\", \"name\" from \"users\" where \"id\" = :id");
        assert!(matches!(bag, ParamBag::Named(_)));
    }

    #[test]
    fn mysql_round_trips_backtick_identifiers() {
        let query = parser::parse_select("select `id` from `users`", Dialect::MySql).unwrap();
        let options = FormatOptions { dialect: Dialect::MySql.preset(), provided: HashMap::new() };
        let (sql, _) = format_query(&query, &options).unwrap();
        assert_eq!(sql, "select `id` from `users`");
    }

    #[test]
    fn sqlserver_named_parameters_render_with_an_at_sigil() {
        let query = parser::parse_select("select id from users where id = :id", Dialect::SqlServer).unwrap();
        let options = FormatOptions { dialect: Dialect::SqlServer.preset(), provided: HashMap::new() };
        let (sql, bag) = format_query(&query, &options).unwrap();
        assert_eq!(sql, "select [id] from [users] where [id] = @id");
        assert!(matches!(bag, ParamBag::Named(_)));
    }

    #[test]
    fn bracketing_parameter_symbol_wraps_the_placeholder() {
        let query = parser::parse_select("select id from users where id = :id", Dialect::Generic).unwrap();
        let mut preset = Dialect::Generic.preset();
        preset.parameter_style = ParameterStyle::Named;
        preset.parameter_symbol = ParameterSymbol::Bracketing("${".to_owned(), "}".to_owned());
        let options = FormatOptions { dialect: preset, provided: HashMap::new() };
        let (sql, _) = format_query(&query, &options).unwrap();
        assert!(sql.contains("${id}"));
    }

    #[test]
    fn indexed_parameters_number_left_to_right() {
        let query = parser::parse_select("select * from t where a = $1 and b = $2", Dialect::Postgres).unwrap();
        let options = FormatOptions::default();
        let (sql, bag) = format_query(&query, &options).unwrap();
        assert!(sql.contains("$1") && sql.contains("$2"));
        match bag {
            ParamBag::Positional(values) => assert_eq!(values.len(), 2),
            _ => panic!("expected positional bag"),
        }
    }
}
