// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! Column-reference collection (spec.md §4.8): every identifier/compound
//! identifier used as a value (not as a binding target like an alias or a
//! CTE name), tagged with the clause it occurred in.

use crate::ast::*;

/// Which clause a [`ColumnReference`] was found in. Kept coarse — callers
/// that need finer detail (e.g. "inside a `JOIN ... ON`") already have the
/// span to re-locate it in the source.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ClauseKind {
    Select,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Join,
    Window,
    Set,
    Returning,
    Using,
}

#[derive(Debug, Clone)]
pub struct ColumnReference {
    pub name: QualifiedName,
    pub clause: ClauseKind,
}

/// Collects every column reference in `stmt`, tagged with its enclosing
/// clause. Walks the tree directly (rather than through
/// [`crate::visit::Visitor`]) because the clause tag needs to change
/// mid-traversal in a way the generic walker's single `visit_expr` hook
/// can't express without extra per-call state threading.
pub fn collect_columns(stmt: &Statement) -> Vec<ColumnReference> {
    let mut out = Vec::new();
    match stmt {
        Statement::Select(query) => collect_query(query, &mut out),
        Statement::Insert(insert) => {
            if let InsertSource::Query(query) = &insert.source {
                collect_query(query, &mut out);
            }
            for item in &insert.returning {
                collect_select_item(item, ClauseKind::Returning, &mut out);
            }
        }
        Statement::Update(update) => {
            for assignment in &update.assignments {
                collect_expr(&assignment.value, ClauseKind::Set, &mut out);
            }
            for twj in &update.from {
                collect_table_with_joins(twj, &mut out);
            }
            if let Some(selection) = &update.selection {
                collect_expr(selection, ClauseKind::Where, &mut out);
            }
            for item in &update.returning {
                collect_select_item(item, ClauseKind::Returning, &mut out);
            }
        }
        Statement::Delete(delete) => {
            for twj in &delete.using {
                collect_table_with_joins(twj, &mut out);
            }
            if let Some(selection) = &delete.selection {
                collect_expr(selection, ClauseKind::Where, &mut out);
            }
            for item in &delete.returning {
                collect_select_item(item, ClauseKind::Returning, &mut out);
            }
        }
        Statement::Merge(merge) => {
            collect_expr(&merge.on, ClauseKind::Join, &mut out);
            for clause in &merge.clauses {
                if let Some(cond) = &clause.condition {
                    collect_expr(cond, ClauseKind::Where, &mut out);
                }
                if let MergeAction::Update(assignments) = &clause.action {
                    for a in assignments {
                        collect_expr(&a.value, ClauseKind::Set, &mut out);
                    }
                }
            }
        }
        Statement::CreateTableAs(cta) => collect_query(&cta.query, &mut out),
        Statement::CreateTable(ct) => {
            for col in &ct.columns {
                for constraint in &col.constraints {
                    if let ColumnConstraint::Default(e) | ColumnConstraint::Check(e) = constraint {
                        collect_expr(e, ClauseKind::Where, &mut out);
                    }
                }
            }
        }
    }
    out
}

fn collect_query(query: &Query, out: &mut Vec<ColumnReference>) {
    if let Some(with) = &query.with {
        for cte in &with.ctes {
            collect_query(&cte.query, out);
        }
    }
    collect_set_expr(&query.body, out);
    for item in &query.order_by {
        collect_expr(&item.expr, ClauseKind::OrderBy, out);
    }
}

fn collect_set_expr(set_expr: &SetExpr, out: &mut Vec<ColumnReference>) {
    match set_expr {
        SetExpr::Select(select) => collect_select(select, out),
        SetExpr::SetOperation { left, right, .. } => {
            collect_set_expr(left, out);
            collect_set_expr(right, out);
        }
        SetExpr::Values(values) => {
            for row in &values.rows {
                for expr in row {
                    collect_expr(expr, ClauseKind::Select, out);
                }
            }
        }
        SetExpr::Nested(query) => collect_query(query, out),
    }
}

fn collect_select(select: &SelectStatement, out: &mut Vec<ColumnReference>) {
    for item in &select.projection {
        collect_select_item(item, ClauseKind::Select, out);
    }
    for twj in &select.from {
        collect_table_with_joins(twj, out);
    }
    if let Some(selection) = &select.selection {
        collect_expr(selection, ClauseKind::Where, out);
    }
    if let Some(group_by) = &select.group_by {
        let groups: &[Vec<Expr>] = match group_by {
            GroupByClause::Simple(exprs) => std::slice::from_ref(exprs),
            GroupByClause::Cube(groups) | GroupByClause::Rollup(groups) | GroupByClause::GroupingSets(groups) => groups,
        };
        for group in groups {
            for e in group {
                collect_expr(e, ClauseKind::GroupBy, out);
            }
        }
    }
    if let Some(having) = &select.having {
        collect_expr(having, ClauseKind::Having, out);
    }
    for window in &select.windows {
        for e in &window.spec.partition_by {
            collect_expr(e, ClauseKind::Window, out);
        }
        for item in &window.spec.order_by {
            collect_expr(&item.expr, ClauseKind::Window, out);
        }
    }
}

fn collect_select_item(item: &SelectItem, clause: ClauseKind, out: &mut Vec<ColumnReference>) {
    match item {
        SelectItem::UnnamedExpr(e) | SelectItem::ExprWithAlias { expr: e, .. } => collect_expr(e, clause, out),
        SelectItem::QualifiedWildcard(_) | SelectItem::Wildcard(_) => {}
    }
}

fn collect_table_with_joins(twj: &TableWithJoins, out: &mut Vec<ColumnReference>) {
    collect_table_factor(&twj.relation, out);
    for join in &twj.joins {
        collect_table_factor(&join.relation, out);
        let constraint = match &join.join_operator {
            JoinOperator::Inner(c) | JoinOperator::LeftOuter(c) | JoinOperator::RightOuter(c) | JoinOperator::FullOuter(c) => {
                Some(c)
            }
            JoinOperator::CrossJoin => None,
        };
        match constraint {
            Some(JoinConstraint::On(e)) => collect_expr(e, ClauseKind::Join, out),
            Some(JoinConstraint::Using(cols)) => {
                for col in cols {
                    out.push(ColumnReference { name: QualifiedName::single(col.clone()), clause: ClauseKind::Using });
                }
            }
            _ => {}
        }
    }
}

fn collect_table_factor(table_factor: &TableFactor, out: &mut Vec<ColumnReference>) {
    match table_factor {
        TableFactor::Table { .. } => {}
        TableFactor::Derived { subquery, .. } => collect_query(subquery, out),
        TableFactor::Function { call, .. } => {
            for arg in &call.args {
                match arg {
                    FunctionArg::Unnamed(e) => collect_expr(e, ClauseKind::Select, out),
                    FunctionArg::Named { value, .. } => collect_expr(value, ClauseKind::Select, out),
                    FunctionArg::Star => {}
                }
            }
        }
        TableFactor::NestedJoin(twj, _) => collect_table_with_joins(twj, out),
    }
}

fn collect_expr(expr: &Expr, clause: ClauseKind, out: &mut Vec<ColumnReference>) {
    match expr {
        Expr::Identifier(ident) => out.push(ColumnReference { name: QualifiedName::single(ident.clone()), clause }),
        Expr::CompoundIdentifier(name) => out.push(ColumnReference { name: name.clone(), clause }),
        Expr::Literal(_) | Expr::Parameter(_) => {}
        Expr::UnaryOp { expr: e, .. }
        | Expr::Cast { expr: e, .. }
        | Expr::Extract { expr: e, .. }
        | Expr::IsNull { expr: e, .. }
        | Expr::Collate { expr: e, .. }
        | Expr::Nested(e, _) => collect_expr(e, clause, out),
        Expr::BinaryOp { left, right, .. } | Expr::IsDistinctFrom { left, right, .. } => {
            collect_expr(left, clause, out);
            collect_expr(right, clause, out);
        }
        Expr::Function(call) => {
            for arg in &call.args {
                match arg {
                    FunctionArg::Unnamed(e) => collect_expr(e, clause, out),
                    FunctionArg::Named { value, .. } => collect_expr(value, clause, out),
                    FunctionArg::Star => {}
                }
            }
            if let Some(filter) = &call.filter {
                collect_expr(filter, clause, out);
            }
            if let Some(over) = &call.over {
                for e in &over.partition_by {
                    collect_expr(e, ClauseKind::Window, out);
                }
            }
        }
        Expr::Case(case) => {
            if let Some(operand) = &case.operand {
                collect_expr(operand, clause, out);
            }
            for (when, then) in &case.branches {
                collect_expr(when, clause, out);
                collect_expr(then, clause, out);
            }
            if let Some(else_result) = &case.else_result {
                collect_expr(else_result, clause, out);
            }
        }
        Expr::Position { substring, string, .. } => {
            collect_expr(substring, clause, out);
            collect_expr(string, clause, out);
        }
        Expr::Substring { expr: e, from, for_len, .. } => {
            collect_expr(e, clause, out);
            if let Some(f) = from {
                collect_expr(f, clause, out);
            }
            if let Some(l) = for_len {
                collect_expr(l, clause, out);
            }
        }
        Expr::Overlay { expr: e, placing, from, for_len, .. } => {
            collect_expr(e, clause, out);
            collect_expr(placing, clause, out);
            collect_expr(from, clause, out);
            if let Some(l) = for_len {
                collect_expr(l, clause, out);
            }
        }
        Expr::Trim { removal, expr: e, .. } => {
            if let Some(r) = removal {
                collect_expr(r, clause, out);
            }
            collect_expr(e, clause, out);
        }
        Expr::Between { expr: e, low, high, .. } => {
            collect_expr(e, clause, out);
            collect_expr(low, clause, out);
            collect_expr(high, clause, out);
        }
        Expr::InList { expr: e, list, .. } => {
            collect_expr(e, clause, out);
            for item in list {
                collect_expr(item, clause, out);
            }
        }
        Expr::InSubquery { expr: e, subquery, .. } => {
            collect_expr(e, clause, out);
            collect_query(subquery, out);
        }
        Expr::Like { expr: e, pattern, escape, .. } | Expr::SimilarTo { expr: e, pattern, escape, .. } => {
            collect_expr(e, clause, out);
            collect_expr(pattern, clause, out);
            if let Some(esc) = escape {
                collect_expr(esc, clause, out);
            }
        }
        Expr::Exists { subquery, .. } | Expr::Subquery(subquery) => collect_query(subquery, out),
        Expr::AtTimeZone { expr: e, zone, .. } => {
            collect_expr(e, clause, out);
            collect_expr(zone, clause, out);
        }
        Expr::Array { elements, .. } | Expr::Row { elements, .. } => {
            for e in elements {
                collect_expr(e, clause, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::parser::parse_statement;

    #[test]
    fn tags_columns_with_their_clause() {
        let stmt = parse_statement("select a from t where b = 1 order by c", Dialect::Postgres).unwrap();
        let cols = collect_columns(&stmt);
        let clauses: Vec<_> = cols.iter().map(|c| c.clause).collect();
        assert_eq!(clauses, vec![ClauseKind::Select, ClauseKind::Where, ClauseKind::OrderBy]);
    }

    #[test]
    fn collects_qualified_column_names() {
        let stmt = parse_statement("select u.id from users u", Dialect::Postgres).unwrap();
        let cols = collect_columns(&stmt);
        assert_eq!(cols.len(), 1);
        assert_eq!(cols[0].name.parts.len(), 2);
    }
}
