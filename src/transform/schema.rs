// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! Schema validation (spec.md §8's column/arity invariants): checks that
//! every column reference resolves to a table, CTE, or subquery alias in
//! scope, and that both sides of a set operation project the same number of
//! columns. Unlike the parser, which fails on the first problem, this
//! accumulates every issue it finds into one [`SemanticErrors`].

use crate::ast::*;
use crate::error::{SemanticError, SemanticErrors};
use std::collections::{HashMap, HashSet};

/// Supplies a table's column names to the validator. An empty return means
/// the table itself is unknown to the caller (spec.md §6: "An empty return
/// means 'table unknown'").
pub trait TableColumnResolver {
    fn columns(&self, table_name: &str) -> Vec<String>;
}

/// What a resolved `FROM`/`JOIN` source tells us about its columns: `Known`
/// when a resolver reported a non-empty column set, `Opaque` for CTEs,
/// derived tables, and function sources whose columns this validator does
/// not attempt to infer.
enum SourceColumns {
    Known(HashSet<String>),
    Opaque,
}

pub fn validate_schema(stmt: &Statement, resolver: &dyn TableColumnResolver) -> Result<(), SemanticErrors> {
    let mut errors = SemanticErrors::default();
    let ctes = HashSet::new();
    match stmt {
        Statement::Select(query) => validate_query(query, resolver, &ctes, &mut errors),
        Statement::Insert(insert) => {
            if let InsertSource::Query(query) = &insert.source {
                validate_query(query, resolver, &ctes, &mut errors);
            }
        }
        Statement::Update(update) => {
            let mut scope = HashMap::new();
            for twj in &update.from {
                register_table_with_joins(twj, &ctes, resolver, &mut scope, &mut errors);
            }
            if let Some(selection) = &update.selection {
                check_expr_columns(selection, &scope, &mut errors);
            }
        }
        Statement::Delete(delete) => {
            let mut scope = HashMap::new();
            for twj in &delete.using {
                register_table_with_joins(twj, &ctes, resolver, &mut scope, &mut errors);
            }
            if let Some(selection) = &delete.selection {
                check_expr_columns(selection, &scope, &mut errors);
            }
        }
        Statement::Merge(merge) => {
            let mut scope = HashMap::new();
            register_named_table(&merge.target, merge.target_alias.as_ref(), &ctes, resolver, &mut scope, &mut errors);
            match &merge.source {
                MergeSource::Table(name) => {
                    register_named_table(name, merge.source_alias.as_ref(), &ctes, resolver, &mut scope, &mut errors)
                }
                MergeSource::Query(query) => {
                    validate_query(query, resolver, &ctes, &mut errors);
                    if let Some(alias) = &merge.source_alias {
                        scope.insert(alias.ident.fold_key(), SourceColumns::Opaque);
                    }
                }
            }
            check_expr_columns(&merge.on, &scope, &mut errors);
            for clause in &merge.clauses {
                if let Some(cond) = &clause.condition {
                    check_expr_columns(cond, &scope, &mut errors);
                }
                if let MergeAction::Update(assignments) = &clause.action {
                    for a in assignments {
                        check_expr_columns(&a.value, &scope, &mut errors);
                    }
                }
            }
        }
        Statement::CreateTableAs(cta) => validate_query(&cta.query, resolver, &ctes, &mut errors),
        Statement::CreateTable(_) => {}
    }
    errors.into_result()
}

fn validate_query(query: &Query, resolver: &dyn TableColumnResolver, parent_ctes: &HashSet<String>, errors: &mut SemanticErrors) {
    let mut ctes = parent_ctes.clone();
    if let Some(with) = &query.with {
        for cte in &with.ctes {
            ctes.insert(cte.name.ident.fold_key());
        }
        for cte in &with.ctes {
            validate_query(&cte.query, resolver, &ctes, errors);
        }
    }
    validate_set_expr(&query.body, resolver, &ctes, errors);
}

fn validate_set_expr(set_expr: &SetExpr, resolver: &dyn TableColumnResolver, ctes: &HashSet<String>, errors: &mut SemanticErrors) {
    match set_expr {
        SetExpr::Select(select) => validate_select(select, resolver, ctes, errors),
        SetExpr::SetOperation { left, right, .. } => {
            validate_set_expr(left, resolver, ctes, errors);
            validate_set_expr(right, resolver, ctes, errors);
            if let (Some(l), Some(r)) = (set_expr_arity(left), set_expr_arity(right)) {
                if l != r {
                    errors.push(SemanticError::ArityMismatch { left: l, right: r });
                }
            }
        }
        SetExpr::Values(_) => {}
        SetExpr::Nested(query) => validate_query(query, resolver, ctes, errors),
    }
}

fn set_expr_arity(set_expr: &SetExpr) -> Option<usize> {
    match set_expr {
        SetExpr::Select(select) => Some(select.projection.len()),
        SetExpr::SetOperation { left, .. } => set_expr_arity(left),
        SetExpr::Values(values) => values.rows.first().map(Vec::len),
        SetExpr::Nested(query) => set_expr_arity(&query.body),
    }
}

fn validate_select(select: &SelectStatement, resolver: &dyn TableColumnResolver, ctes: &HashSet<String>, errors: &mut SemanticErrors) {
    let mut scope = HashMap::new();
    for twj in &select.from {
        register_table_with_joins(twj, ctes, resolver, &mut scope, errors);
    }
    for item in &select.projection {
        if let SelectItem::UnnamedExpr(e) | SelectItem::ExprWithAlias { expr: e, .. } = item {
            check_expr_columns(e, &scope, errors);
        }
    }
    if let Some(selection) = &select.selection {
        check_expr_columns(selection, &scope, errors);
    }
    if let Some(group_by) = &select.group_by {
        let groups: &[Vec<Expr>] = match group_by {
            GroupByClause::Simple(exprs) => std::slice::from_ref(exprs),
            GroupByClause::Cube(groups) | GroupByClause::Rollup(groups) | GroupByClause::GroupingSets(groups) => groups,
        };
        for group in groups {
            for e in group {
                check_expr_columns(e, &scope, errors);
            }
        }
    }
    if let Some(having) = &select.having {
        check_expr_columns(having, &scope, errors);
    }

    // Nested subqueries (FROM-derived, and anywhere inside an expression)
    // get their own independent validation pass.
    for twj in &select.from {
        validate_table_with_joins_subqueries(twj, resolver, ctes, errors);
    }
    for item in &select.projection {
        if let SelectItem::UnnamedExpr(e) | SelectItem::ExprWithAlias { expr: e, .. } = item {
            validate_expr_subqueries(e, resolver, ctes, errors);
        }
    }
    if let Some(selection) = &select.selection {
        validate_expr_subqueries(selection, resolver, ctes, errors);
    }
    if let Some(having) = &select.having {
        validate_expr_subqueries(having, resolver, ctes, errors);
    }
}

fn validate_table_with_joins_subqueries(
    twj: &TableWithJoins,
    resolver: &dyn TableColumnResolver,
    ctes: &HashSet<String>,
    errors: &mut SemanticErrors,
) {
    validate_table_factor_subqueries(&twj.relation, resolver, ctes, errors);
    for join in &twj.joins {
        validate_table_factor_subqueries(&join.relation, resolver, ctes, errors);
        if let JoinOperator::Inner(JoinConstraint::On(e))
        | JoinOperator::LeftOuter(JoinConstraint::On(e))
        | JoinOperator::RightOuter(JoinConstraint::On(e))
        | JoinOperator::FullOuter(JoinConstraint::On(e)) = &join.join_operator
        {
            validate_expr_subqueries(e, resolver, ctes, errors);
        }
    }
}

fn validate_table_factor_subqueries(
    tf: &TableFactor,
    resolver: &dyn TableColumnResolver,
    ctes: &HashSet<String>,
    errors: &mut SemanticErrors,
) {
    match tf {
        TableFactor::Table { .. } => {}
        TableFactor::Derived { subquery, .. } => validate_query(subquery, resolver, ctes, errors),
        TableFactor::Function { .. } => {}
        TableFactor::NestedJoin(twj, _) => validate_table_with_joins_subqueries(twj, resolver, ctes, errors),
    }
}

fn validate_expr_subqueries(expr: &Expr, resolver: &dyn TableColumnResolver, ctes: &HashSet<String>, errors: &mut SemanticErrors) {
    match expr {
        Expr::Subquery(q) | Expr::Exists { subquery: q, .. } => validate_query(q, resolver, ctes, errors),
        Expr::InSubquery { expr: e, subquery, .. } => {
            validate_expr_subqueries(e, resolver, ctes, errors);
            validate_query(subquery, resolver, ctes, errors);
        }
        Expr::UnaryOp { expr: e, .. }
        | Expr::Cast { expr: e, .. }
        | Expr::Extract { expr: e, .. }
        | Expr::IsNull { expr: e, .. }
        | Expr::Collate { expr: e, .. }
        | Expr::Nested(e, _) => validate_expr_subqueries(e, resolver, ctes, errors),
        Expr::BinaryOp { left, right, .. } | Expr::IsDistinctFrom { left, right, .. } => {
            validate_expr_subqueries(left, resolver, ctes, errors);
            validate_expr_subqueries(right, resolver, ctes, errors);
        }
        Expr::Function(call) => {
            for arg in &call.args {
                match arg {
                    FunctionArg::Unnamed(e) => validate_expr_subqueries(e, resolver, ctes, errors),
                    FunctionArg::Named { value, .. } => validate_expr_subqueries(value, resolver, ctes, errors),
                    FunctionArg::Star => {}
                }
            }
        }
        Expr::Case(case) => {
            if let Some(operand) = &case.operand {
                validate_expr_subqueries(operand, resolver, ctes, errors);
            }
            for (when, then) in &case.branches {
                validate_expr_subqueries(when, resolver, ctes, errors);
                validate_expr_subqueries(then, resolver, ctes, errors);
            }
            if let Some(else_result) = &case.else_result {
                validate_expr_subqueries(else_result, resolver, ctes, errors);
            }
        }
        Expr::Between { expr: e, low, high, .. } => {
            validate_expr_subqueries(e, resolver, ctes, errors);
            validate_expr_subqueries(low, resolver, ctes, errors);
            validate_expr_subqueries(high, resolver, ctes, errors);
        }
        Expr::InList { expr: e, list, .. } => {
            validate_expr_subqueries(e, resolver, ctes, errors);
            for item in list {
                validate_expr_subqueries(item, resolver, ctes, errors);
            }
        }
        Expr::Like { expr: e, pattern, .. } | Expr::SimilarTo { expr: e, pattern, .. } => {
            validate_expr_subqueries(e, resolver, ctes, errors);
            validate_expr_subqueries(pattern, resolver, ctes, errors);
        }
        _ => {}
    }
}

fn register_table_with_joins(
    twj: &TableWithJoins,
    ctes: &HashSet<String>,
    resolver: &dyn TableColumnResolver,
    scope: &mut HashMap<String, SourceColumns>,
    errors: &mut SemanticErrors,
) {
    register_table_factor(&twj.relation, ctes, resolver, scope, errors);
    for join in &twj.joins {
        register_table_factor(&join.relation, ctes, resolver, scope, errors);
    }
}

fn register_table_factor(
    tf: &TableFactor,
    ctes: &HashSet<String>,
    resolver: &dyn TableColumnResolver,
    scope: &mut HashMap<String, SourceColumns>,
    errors: &mut SemanticErrors,
) {
    match tf {
        TableFactor::Table { name, alias, .. } => {
            let alias_ident = alias.as_ref().map(|a| &a.name);
            register_named_table(name, alias_ident, ctes, resolver, scope, errors);
        }
        TableFactor::Derived { alias, .. } | TableFactor::Function { alias, .. } => {
            if let Some(a) = alias {
                scope.insert(a.name.ident.fold_key(), SourceColumns::Opaque);
            }
        }
        TableFactor::NestedJoin(twj, _) => register_table_with_joins(twj, ctes, resolver, scope, errors),
    }
}

/// Registers a concrete table reference (as opposed to a derived/function
/// source) under its alias or bare name, resolving its columns through
/// `resolver` unless it's a known CTE name.
fn register_named_table(
    name: &QualifiedName,
    alias: Option<&IdentNode>,
    ctes: &HashSet<String>,
    resolver: &dyn TableColumnResolver,
    scope: &mut HashMap<String, SourceColumns>,
    errors: &mut SemanticErrors,
) {
    let key = alias.map(|a| a.ident.fold_key()).unwrap_or_else(|| name.last().ident.fold_key());
    let normalized = crate::ident::normalize_table_name(&name.to_ident_qualified_name());
    if ctes.contains(&normalized) {
        scope.insert(key, SourceColumns::Opaque);
        return;
    }
    let columns = resolver.columns(&normalized);
    if columns.is_empty() {
        errors.push(SemanticError::UnknownTable(normalized));
        scope.insert(key, SourceColumns::Opaque);
    } else {
        let folded = columns.into_iter().map(|c| crate::ident::Ident::new(c, false).fold_key()).collect();
        scope.insert(key, SourceColumns::Known(folded));
    }
}

/// Checks every column reference in `expr` against `scope` (this query's
/// own `FROM`/`JOIN` sources only — nested subqueries validate themselves
/// independently via [`validate_expr_subqueries`]).
fn check_expr_columns(expr: &Expr, scope: &HashMap<String, SourceColumns>, errors: &mut SemanticErrors) {
    match expr {
        Expr::Identifier(_) => {
            // An unqualified column could belong to any source in scope;
            // with more than one candidate or any opaque source, resolving
            // it precisely is out of scope for this validator.
        }
        Expr::CompoundIdentifier(name) => {
            if let Some(qualifier) = name.qualifier() {
                let key = qualifier.last().map(|i| i.ident.fold_key()).unwrap_or_default();
                match scope.get(&key) {
                    None => errors.push(SemanticError::UnknownTable(key)),
                    Some(SourceColumns::Opaque) => {}
                    Some(SourceColumns::Known(columns)) => {
                        let column = name.last().ident.fold_key();
                        if !columns.contains(&column) {
                            errors.push(SemanticError::UnknownColumn { table: key, column });
                        }
                    }
                }
            }
        }
        Expr::Literal(_) | Expr::Parameter(_) => {}
        Expr::UnaryOp { expr: e, .. }
        | Expr::Cast { expr: e, .. }
        | Expr::Extract { expr: e, .. }
        | Expr::IsNull { expr: e, .. }
        | Expr::Collate { expr: e, .. }
        | Expr::Nested(e, _) => check_expr_columns(e, scope, errors),
        Expr::BinaryOp { left, right, .. } | Expr::IsDistinctFrom { left, right, .. } => {
            check_expr_columns(left, scope, errors);
            check_expr_columns(right, scope, errors);
        }
        Expr::Function(call) => {
            for arg in &call.args {
                match arg {
                    FunctionArg::Unnamed(e) => check_expr_columns(e, scope, errors),
                    FunctionArg::Named { value, .. } => check_expr_columns(value, scope, errors),
                    FunctionArg::Star => {}
                }
            }
        }
        Expr::Case(case) => {
            if let Some(operand) = &case.operand {
                check_expr_columns(operand, scope, errors);
            }
            for (when, then) in &case.branches {
                check_expr_columns(when, scope, errors);
                check_expr_columns(then, scope, errors);
            }
            if let Some(else_result) = &case.else_result {
                check_expr_columns(else_result, scope, errors);
            }
        }
        Expr::Between { expr: e, low, high, .. } => {
            check_expr_columns(e, scope, errors);
            check_expr_columns(low, scope, errors);
            check_expr_columns(high, scope, errors);
        }
        Expr::InList { expr: e, list, .. } => {
            check_expr_columns(e, scope, errors);
            for item in list {
                check_expr_columns(item, scope, errors);
            }
        }
        Expr::Like { expr: e, pattern, .. } | Expr::SimilarTo { expr: e, pattern, .. } => {
            check_expr_columns(e, scope, errors);
            check_expr_columns(pattern, scope, errors);
        }
        // Subqueries and their contents validate independently; nothing
        // here belongs to the current scope.
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::parser::parse_statement;

    struct FixedResolver(HashMap<&'static str, Vec<&'static str>>);

    impl TableColumnResolver for FixedResolver {
        fn columns(&self, table_name: &str) -> Vec<String> {
            self.0.get(table_name).map(|cols| cols.iter().map(|c| c.to_string()).collect()).unwrap_or_default()
        }
    }

    #[test]
    fn flags_unknown_table() {
        let stmt = parse_statement("select 1 from ghost", Dialect::Postgres).unwrap();
        let resolver = FixedResolver(HashMap::new());
        let result = validate_schema(&stmt, &resolver);
        assert!(matches!(result, Err(e) if e.0.contains(&SemanticError::UnknownTable("ghost".to_string()))));
    }

    #[test]
    fn flags_unknown_column_on_known_table() {
        let stmt = parse_statement("select u.missing from users u", Dialect::Postgres).unwrap();
        let mut tables = HashMap::new();
        tables.insert("users", vec!["id", "name"]);
        let resolver = FixedResolver(tables);
        let result = validate_schema(&stmt, &resolver);
        assert!(result.is_err());
    }

    #[test]
    fn accepts_known_columns() {
        let stmt = parse_statement("select u.id from users u", Dialect::Postgres).unwrap();
        let mut tables = HashMap::new();
        tables.insert("users", vec!["id", "name"]);
        let resolver = FixedResolver(tables);
        assert!(validate_schema(&stmt, &resolver).is_ok());
    }

    #[test]
    fn flags_arity_mismatch_in_set_operation() {
        let stmt = parse_statement("select 1, 2 union select 1", Dialect::Postgres).unwrap();
        let resolver = FixedResolver(HashMap::new());
        let result = validate_schema(&stmt, &resolver);
        assert!(matches!(result, Err(e) if e.0.iter().any(|err| matches!(err, SemanticError::ArityMismatch { .. }))));
    }
}
