// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! The AST traversal framework (spec.md §4.3): a single `Visitor` trait
//! dispatched by matching each node's shape, plus one `walk_*` free
//! function per node family that every transformer (CTE normalization,
//! scope resolution, parameter/column collection) builds on instead of
//! hand-rolling its own recursion.
//!
//! Trait-object dispatch is deliberate here (spec.md §9's design notes):
//! callers hold a `&mut dyn Visitor` and never need to know which concrete
//! transformer is running.

use crate::ast::*;

/// Implement only the `visit_*` methods you care about; the default body of
/// each calls the matching `walk_*` function, so overriding one still
/// recurses into its children unless you choose not to call `walk_*`
/// yourself.
pub trait Visitor {
    fn visit_statement(&mut self, stmt: &Statement) {
        walk_statement(self, stmt);
    }
    fn visit_query(&mut self, query: &Query) {
        walk_query(self, query);
    }
    fn visit_set_expr(&mut self, set_expr: &SetExpr) {
        walk_set_expr(self, set_expr);
    }
    fn visit_select(&mut self, select: &SelectStatement) {
        walk_select(self, select);
    }
    fn visit_cte(&mut self, cte: &CteDefinition) {
        walk_cte(self, cte);
    }
    fn visit_table_with_joins(&mut self, twj: &TableWithJoins) {
        walk_table_with_joins(self, twj);
    }
    fn visit_table_factor(&mut self, table_factor: &TableFactor) {
        walk_table_factor(self, table_factor);
    }
    fn visit_join(&mut self, join: &Join) {
        walk_join(self, join);
    }
    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
    fn visit_identifier(&mut self, _ident: &IdentNode) {}
    fn visit_qualified_name(&mut self, _name: &QualifiedName) {}
}

pub fn walk_statement<V: Visitor + ?Sized>(v: &mut V, stmt: &Statement) {
    match stmt {
        Statement::Select(query) => v.visit_query(query),
        Statement::Insert(insert) => {
            if let Some(with) = &insert.with {
                for cte in &with.ctes {
                    v.visit_cte(cte);
                }
            }
            v.visit_qualified_name(&insert.table);
            for col in &insert.columns {
                v.visit_identifier(col);
            }
            match &insert.source {
                InsertSource::Values(values) => {
                    for row in &values.rows {
                        for expr in row {
                            v.visit_expr(expr);
                        }
                    }
                }
                InsertSource::Query(query) => v.visit_query(query),
                InsertSource::DefaultValues => {}
            }
        }
        Statement::Update(update) => {
            if let Some(with) = &update.with {
                for cte in &with.ctes {
                    v.visit_cte(cte);
                }
            }
            v.visit_qualified_name(&update.table);
            for assignment in &update.assignments {
                v.visit_identifier(&assignment.target);
                v.visit_expr(&assignment.value);
            }
            for twj in &update.from {
                v.visit_table_with_joins(twj);
            }
            if let Some(selection) = &update.selection {
                v.visit_expr(selection);
            }
        }
        Statement::Delete(delete) => {
            if let Some(with) = &delete.with {
                for cte in &with.ctes {
                    v.visit_cte(cte);
                }
            }
            v.visit_qualified_name(&delete.table);
            for twj in &delete.using {
                v.visit_table_with_joins(twj);
            }
            if let Some(selection) = &delete.selection {
                v.visit_expr(selection);
            }
        }
        Statement::Merge(merge) => {
            if let Some(with) = &merge.with {
                for cte in &with.ctes {
                    v.visit_cte(cte);
                }
            }
            v.visit_qualified_name(&merge.target);
            match &merge.source {
                MergeSource::Table(name) => v.visit_qualified_name(name),
                MergeSource::Query(query) => v.visit_query(query),
            }
            v.visit_expr(&merge.on);
            for clause in &merge.clauses {
                if let Some(cond) = &clause.condition {
                    v.visit_expr(cond);
                }
                match &clause.action {
                    MergeAction::Update(assignments) => {
                        for a in assignments {
                            v.visit_identifier(&a.target);
                            v.visit_expr(&a.value);
                        }
                    }
                    MergeAction::Insert { columns, values } => {
                        for c in columns {
                            v.visit_identifier(c);
                        }
                        for val in values {
                            v.visit_expr(val);
                        }
                    }
                    MergeAction::Delete | MergeAction::DoNothing => {}
                }
            }
        }
        Statement::CreateTableAs(cta) => {
            v.visit_qualified_name(&cta.name);
            for col in &cta.columns {
                v.visit_identifier(col);
            }
            v.visit_query(&cta.query);
        }
        Statement::CreateTable(ct) => {
            v.visit_qualified_name(&ct.name);
            for col in &ct.columns {
                v.visit_identifier(&col.name);
                for constraint in &col.constraints {
                    match constraint {
                        ColumnConstraint::Default(e) | ColumnConstraint::Check(e) => v.visit_expr(e),
                        ColumnConstraint::References { table, column } => {
                            v.visit_qualified_name(table);
                            if let Some(c) = column {
                                v.visit_identifier(c);
                            }
                        }
                        _ => {}
                    }
                }
            }
            for constraint in &ct.constraints {
                if let TableConstraint::Check(e) = constraint {
                    v.visit_expr(e);
                }
            }
        }
    }
}

pub fn walk_query<V: Visitor + ?Sized>(v: &mut V, query: &Query) {
    if let Some(with) = &query.with {
        for cte in &with.ctes {
            v.visit_cte(cte);
        }
    }
    v.visit_set_expr(&query.body);
    for item in &query.order_by {
        v.visit_expr(&item.expr);
    }
    if let Some(limit) = &query.limit {
        v.visit_expr(limit);
    }
    if let Some(offset) = &query.offset {
        v.visit_expr(offset);
    }
}

pub fn walk_cte<V: Visitor + ?Sized>(v: &mut V, cte: &CteDefinition) {
    v.visit_identifier(&cte.name);
    for col in &cte.columns {
        v.visit_identifier(col);
    }
    v.visit_query(&cte.query);
}

pub fn walk_set_expr<V: Visitor + ?Sized>(v: &mut V, set_expr: &SetExpr) {
    match set_expr {
        SetExpr::Select(select) => v.visit_select(select),
        SetExpr::SetOperation { left, right, .. } => {
            v.visit_set_expr(left);
            v.visit_set_expr(right);
        }
        SetExpr::Values(values) => {
            for row in &values.rows {
                for expr in row {
                    v.visit_expr(expr);
                }
            }
        }
        SetExpr::Nested(query) => v.visit_query(query),
    }
}

pub fn walk_select<V: Visitor + ?Sized>(v: &mut V, select: &SelectStatement) {
    if let Distinct::DistinctOn(exprs) = &select.distinct {
        for e in exprs {
            v.visit_expr(e);
        }
    }
    for item in &select.projection {
        match item {
            SelectItem::UnnamedExpr(e) => v.visit_expr(e),
            SelectItem::ExprWithAlias { expr, alias } => {
                v.visit_expr(expr);
                v.visit_identifier(alias);
            }
            SelectItem::QualifiedWildcard(name) => v.visit_qualified_name(name),
            SelectItem::Wildcard(_) => {}
        }
    }
    for twj in &select.from {
        v.visit_table_with_joins(twj);
    }
    if let Some(selection) = &select.selection {
        v.visit_expr(selection);
    }
    if let Some(group_by) = &select.group_by {
        let groups: &[Vec<Expr>] = match group_by {
            GroupByClause::Simple(exprs) => std::slice::from_ref(exprs),
            GroupByClause::Cube(groups)
            | GroupByClause::Rollup(groups)
            | GroupByClause::GroupingSets(groups) => groups,
        };
        for group in groups {
            for e in group {
                v.visit_expr(e);
            }
        }
    }
    if let Some(having) = &select.having {
        v.visit_expr(having);
    }
    for window in &select.windows {
        for e in &window.spec.partition_by {
            v.visit_expr(e);
        }
        for item in &window.spec.order_by {
            v.visit_expr(&item.expr);
        }
    }
}

pub fn walk_table_with_joins<V: Visitor + ?Sized>(v: &mut V, twj: &TableWithJoins) {
    v.visit_table_factor(&twj.relation);
    for join in &twj.joins {
        v.visit_join(join);
    }
}

pub fn walk_table_factor<V: Visitor + ?Sized>(v: &mut V, table_factor: &TableFactor) {
    match table_factor {
        TableFactor::Table { name, .. } => v.visit_qualified_name(name),
        TableFactor::Derived { subquery, .. } => v.visit_query(subquery),
        TableFactor::Function { call, .. } => v.visit_expr(&Expr::Function(call.clone())),
        TableFactor::NestedJoin(twj, _) => v.visit_table_with_joins(twj),
    }
}

pub fn walk_join<V: Visitor + ?Sized>(v: &mut V, join: &Join) {
    v.visit_table_factor(&join.relation);
    let constraint = match &join.join_operator {
        JoinOperator::Inner(c)
        | JoinOperator::LeftOuter(c)
        | JoinOperator::RightOuter(c)
        | JoinOperator::FullOuter(c) => Some(c),
        JoinOperator::CrossJoin => None,
    };
    if let Some(JoinConstraint::On(expr)) = constraint {
        v.visit_expr(expr);
    }
    if let Some(JoinConstraint::Using(cols)) = constraint {
        for c in cols {
            v.visit_identifier(c);
        }
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) {
    match expr {
        Expr::Identifier(ident) => v.visit_identifier(ident),
        Expr::CompoundIdentifier(name) => v.visit_qualified_name(name),
        Expr::Literal(_) | Expr::Parameter(_) => {}
        Expr::UnaryOp { expr, .. } => v.visit_expr(expr),
        Expr::BinaryOp { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        Expr::Function(call) => {
            v.visit_qualified_name(&call.name);
            for arg in &call.args {
                match arg {
                    FunctionArg::Unnamed(e) => v.visit_expr(e),
                    FunctionArg::Named { name, value } => {
                        v.visit_identifier(name);
                        v.visit_expr(value);
                    }
                    FunctionArg::Star => {}
                }
            }
            for item in &call.order_by {
                v.visit_expr(&item.expr);
            }
            if let Some(filter) = &call.filter {
                v.visit_expr(filter);
            }
            if let Some(over) = &call.over {
                for e in &over.partition_by {
                    v.visit_expr(e);
                }
                for item in &over.order_by {
                    v.visit_expr(&item.expr);
                }
            }
        }
        Expr::Cast { expr, .. } => v.visit_expr(expr),
        Expr::Case(case) => {
            if let Some(operand) = &case.operand {
                v.visit_expr(operand);
            }
            for (when, then) in &case.branches {
                v.visit_expr(when);
                v.visit_expr(then);
            }
            if let Some(else_result) = &case.else_result {
                v.visit_expr(else_result);
            }
        }
        Expr::Extract { expr, .. } => v.visit_expr(expr),
        Expr::Position { substring, string, .. } => {
            v.visit_expr(substring);
            v.visit_expr(string);
        }
        Expr::Substring { expr, from, for_len, .. } => {
            v.visit_expr(expr);
            if let Some(f) = from {
                v.visit_expr(f);
            }
            if let Some(l) = for_len {
                v.visit_expr(l);
            }
        }
        Expr::Overlay { expr, placing, from, for_len, .. } => {
            v.visit_expr(expr);
            v.visit_expr(placing);
            v.visit_expr(from);
            if let Some(l) = for_len {
                v.visit_expr(l);
            }
        }
        Expr::Trim { removal, expr, .. } => {
            if let Some(r) = removal {
                v.visit_expr(r);
            }
            v.visit_expr(expr);
        }
        Expr::IsNull { expr, .. } => v.visit_expr(expr),
        Expr::IsDistinctFrom { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        Expr::Between { expr, low, high, .. } => {
            v.visit_expr(expr);
            v.visit_expr(low);
            v.visit_expr(high);
        }
        Expr::InList { expr, list, .. } => {
            v.visit_expr(expr);
            for e in list {
                v.visit_expr(e);
            }
        }
        Expr::InSubquery { expr, subquery, .. } => {
            v.visit_expr(expr);
            v.visit_query(subquery);
        }
        Expr::Like { expr, pattern, escape, .. } => {
            v.visit_expr(expr);
            v.visit_expr(pattern);
            if let Some(e) = escape {
                v.visit_expr(e);
            }
        }
        Expr::SimilarTo { expr, pattern, escape, .. } => {
            v.visit_expr(expr);
            v.visit_expr(pattern);
            if let Some(e) = escape {
                v.visit_expr(e);
            }
        }
        Expr::Exists { subquery, .. } => v.visit_query(subquery),
        Expr::Subquery(query) => v.visit_query(query),
        Expr::Collate { expr, collation, .. } => {
            v.visit_expr(expr);
            v.visit_qualified_name(collation);
        }
        Expr::AtTimeZone { expr, zone, .. } => {
            v.visit_expr(expr);
            v.visit_expr(zone);
        }
        Expr::Array { elements, .. } | Expr::Row { elements, .. } => {
            for e in elements {
                v.visit_expr(e);
            }
        }
        Expr::Nested(inner, _) => v.visit_expr(inner),
    }
}

/// Guards a traversal that follows CTE-reference edges (rather than plain
/// AST parent/child edges, which can never cycle) against revisiting the
/// same name twice — used by [`crate::transform::cte::check_cycles`].
#[derive(Debug, Default)]
pub struct VisitedSet {
    seen: std::collections::HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time `key` is seen, `false` on every repeat.
    pub fn visit(&mut self, key: &str) -> bool {
        self.seen.insert(key.to_owned())
    }
}
