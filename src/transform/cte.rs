// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! CTE normalization and decomposition (spec.md §4.4, §4.9).
//!
//! Normalization hoists every `WITH` clause found anywhere in a query —
//! including ones attached to subqueries — into one top-level clause, in
//! declaration order, deduplicating identical definitions and rejecting
//! conflicting ones. Grounded on the teacher crate's `analyze::DboTable`
//! family's treatment of nested identifiers, generalized here from "one
//! table reference" to "one CTE dependency graph".

use crate::ast::*;
use crate::dialect::DialectPreset;
use crate::error::SemanticError;
use crate::format::{render, to_print_tokens};
use crate::visit::Visitor;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use text_size::TextRange;

/// One CTE's standalone query plus the information needed to splice it back
/// into the statement it came from (spec.md §4.9).
#[derive(Debug, Clone)]
pub struct CteRestorationResult {
    pub name: String,
    pub query: Query,
    pub depends_on: Vec<String>,
}

/// Collects every `WITH` clause in `query` (including ones nested inside
/// subqueries), merges them into one top-level, dependency-ordered clause,
/// and strips the nested ones. Rule order follows spec.md §4.4:
///
/// 1. depth-first collection in declaration order,
/// 2. name-uniqueness by structural equality (identical definitions merge,
///    conflicting ones are an error),
/// 3. union of the `RECURSIVE` flag,
/// 4. a stable topological sort of the dependency graph,
/// 5. cycle detection — legal only when the merged clause is recursive.
pub fn normalize_ctes(query: &mut Query) -> Result<(), SemanticError> {
    let mut collected = Vec::new();
    let mut recursive = false;
    collect_and_strip(query, &mut collected, &mut recursive);

    if collected.is_empty() {
        return Ok(());
    }

    let deduped = dedupe_by_name(collected)?;
    let ordered = topological_sort(deduped, recursive)?;

    let span = ordered.first().map(|c| c.span).unwrap_or_else(|| TextRange::new(0.into(), 0.into()));
    query.with = Some(WithClause { recursive, ctes: ordered, span });
    Ok(())
}

/// Recursively walks `query`, removing every `WITH` clause it finds (at any
/// depth — including inside subqueries in `FROM`, `WHERE`, `EXISTS`, etc.)
/// and appending their CTE definitions to `out` in declaration order. A
/// CTE's own nested `with` is flattened before the CTE itself is pushed, so
/// a later dependency-sort sees every definition it needs.
fn collect_and_strip(query: &mut Query, out: &mut Vec<CteDefinition>, recursive: &mut bool) {
    if let Some(mut clause) = query.with.take() {
        if clause.recursive {
            *recursive = true;
        }
        for mut cte in clause.ctes.drain(..) {
            collect_and_strip(&mut cte.query, out, recursive);
            out.push(cte);
        }
    }
    collect_and_strip_set_expr(&mut query.body, out, recursive);
}

fn collect_and_strip_set_expr(set_expr: &mut SetExpr, out: &mut Vec<CteDefinition>, recursive: &mut bool) {
    match set_expr {
        SetExpr::Select(select) => collect_and_strip_select(select, out, recursive),
        SetExpr::SetOperation { left, right, .. } => {
            collect_and_strip_set_expr(left, out, recursive);
            collect_and_strip_set_expr(right, out, recursive);
        }
        SetExpr::Values(values) => {
            for row in &mut values.rows {
                for expr in row {
                    collect_and_strip_expr(expr, out, recursive);
                }
            }
        }
        SetExpr::Nested(query) => collect_and_strip(query, out, recursive),
    }
}

fn collect_and_strip_select(select: &mut SelectStatement, out: &mut Vec<CteDefinition>, recursive: &mut bool) {
    for item in &mut select.projection {
        match item {
            SelectItem::UnnamedExpr(e) | SelectItem::ExprWithAlias { expr: e, .. } => {
                collect_and_strip_expr(e, out, recursive)
            }
            SelectItem::QualifiedWildcard(_) | SelectItem::Wildcard(_) => {}
        }
    }
    for twj in &mut select.from {
        collect_and_strip_table_with_joins(twj, out, recursive);
    }
    if let Some(selection) = &mut select.selection {
        collect_and_strip_expr(selection, out, recursive);
    }
    if let Some(having) = &mut select.having {
        collect_and_strip_expr(having, out, recursive);
    }
}

fn collect_and_strip_table_with_joins(twj: &mut TableWithJoins, out: &mut Vec<CteDefinition>, recursive: &mut bool) {
    collect_and_strip_table_factor(&mut twj.relation, out, recursive);
    for join in &mut twj.joins {
        collect_and_strip_table_factor(&mut join.relation, out, recursive);
        if let JoinOperator::Inner(JoinConstraint::On(e))
        | JoinOperator::LeftOuter(JoinConstraint::On(e))
        | JoinOperator::RightOuter(JoinConstraint::On(e))
        | JoinOperator::FullOuter(JoinConstraint::On(e)) = &mut join.join_operator
        {
            collect_and_strip_expr(e, out, recursive);
        }
    }
}

fn collect_and_strip_table_factor(table_factor: &mut TableFactor, out: &mut Vec<CteDefinition>, recursive: &mut bool) {
    match table_factor {
        TableFactor::Table { .. } => {}
        TableFactor::Derived { subquery, .. } => collect_and_strip(subquery, out, recursive),
        TableFactor::Function { call, .. } => collect_and_strip_function_call(call, out, recursive),
        TableFactor::NestedJoin(twj, _) => collect_and_strip_table_with_joins(twj, out, recursive),
    }
}

fn collect_and_strip_function_call(call: &mut FunctionCall, out: &mut Vec<CteDefinition>, recursive: &mut bool) {
    for arg in &mut call.args {
        match arg {
            FunctionArg::Unnamed(e) | FunctionArg::Named { value: e, .. } => collect_and_strip_expr(e, out, recursive),
            FunctionArg::Star => {}
        }
    }
    if let Some(filter) = &mut call.filter {
        collect_and_strip_expr(filter, out, recursive);
    }
}

fn collect_and_strip_expr(expr: &mut Expr, out: &mut Vec<CteDefinition>, recursive: &mut bool) {
    match expr {
        Expr::Identifier(_) | Expr::CompoundIdentifier(_) | Expr::Literal(_) | Expr::Parameter(_) => {}
        Expr::Subquery(q) | Expr::Exists { subquery: q, .. } => collect_and_strip(q, out, recursive),
        Expr::InSubquery { expr: e, subquery, .. } => {
            collect_and_strip_expr(e, out, recursive);
            collect_and_strip(subquery, out, recursive);
        }
        Expr::UnaryOp { expr: e, .. }
        | Expr::Cast { expr: e, .. }
        | Expr::Extract { expr: e, .. }
        | Expr::IsNull { expr: e, .. }
        | Expr::Collate { expr: e, .. }
        | Expr::Nested(e, _) => collect_and_strip_expr(e, out, recursive),
        Expr::BinaryOp { left, right, .. } | Expr::IsDistinctFrom { left, right, .. } => {
            collect_and_strip_expr(left, out, recursive);
            collect_and_strip_expr(right, out, recursive);
        }
        Expr::Function(call) => collect_and_strip_function_call(call, out, recursive),
        Expr::Case(case) => {
            if let Some(operand) = &mut case.operand {
                collect_and_strip_expr(operand, out, recursive);
            }
            for (when, then) in &mut case.branches {
                collect_and_strip_expr(when, out, recursive);
                collect_and_strip_expr(then, out, recursive);
            }
            if let Some(else_result) = &mut case.else_result {
                collect_and_strip_expr(else_result, out, recursive);
            }
        }
        Expr::Position { substring, string, .. } => {
            collect_and_strip_expr(substring, out, recursive);
            collect_and_strip_expr(string, out, recursive);
        }
        Expr::Substring { expr: e, from, for_len, .. } => {
            collect_and_strip_expr(e, out, recursive);
            if let Some(f) = from {
                collect_and_strip_expr(f, out, recursive);
            }
            if let Some(l) = for_len {
                collect_and_strip_expr(l, out, recursive);
            }
        }
        Expr::Overlay { expr: e, placing, from, for_len, .. } => {
            collect_and_strip_expr(e, out, recursive);
            collect_and_strip_expr(placing, out, recursive);
            collect_and_strip_expr(from, out, recursive);
            if let Some(l) = for_len {
                collect_and_strip_expr(l, out, recursive);
            }
        }
        Expr::Trim { removal, expr: e, .. } => {
            if let Some(r) = removal {
                collect_and_strip_expr(r, out, recursive);
            }
            collect_and_strip_expr(e, out, recursive);
        }
        Expr::Between { expr: e, low, high, .. } => {
            collect_and_strip_expr(e, out, recursive);
            collect_and_strip_expr(low, out, recursive);
            collect_and_strip_expr(high, out, recursive);
        }
        Expr::InList { expr: e, list, .. } => {
            collect_and_strip_expr(e, out, recursive);
            for item in list {
                collect_and_strip_expr(item, out, recursive);
            }
        }
        Expr::Like { expr: e, pattern, escape, .. } | Expr::SimilarTo { expr: e, pattern, escape, .. } => {
            collect_and_strip_expr(e, out, recursive);
            collect_and_strip_expr(pattern, out, recursive);
            if let Some(esc) = escape {
                collect_and_strip_expr(esc, out, recursive);
            }
        }
        Expr::AtTimeZone { expr: e, zone, .. } => {
            collect_and_strip_expr(e, out, recursive);
            collect_and_strip_expr(zone, out, recursive);
        }
        Expr::Array { elements, .. } | Expr::Row { elements, .. } => {
            for e in elements {
                collect_and_strip_expr(e, out, recursive);
            }
        }
    }
}

fn dedupe_by_name(ctes: Vec<CteDefinition>) -> Result<Vec<CteDefinition>, SemanticError> {
    let preset = DialectPreset::default();
    let mut by_name: IndexMap<String, CteDefinition> = IndexMap::new();
    for cte in ctes {
        let key = cte.name.ident.fold_key();
        match by_name.get(&key) {
            None => {
                by_name.insert(key, cte);
            }
            Some(existing) => {
                if !canonically_equal(existing, &cte, &preset) {
                    return Err(SemanticError::DuplicateCommonTable(cte.name.name().to_owned()));
                }
            }
        }
    }
    Ok(by_name.into_values().collect())
}

/// Two CTE definitions count as "the same" if they render to the same
/// canonical SQL text under a fixed dialect — cheaper and more robust than
/// hand-writing a span-blind AST equality.
fn canonically_equal(a: &CteDefinition, b: &CteDefinition, preset: &DialectPreset) -> bool {
    let options = crate::format::FormatOptions { dialect: preset.clone(), provided: HashMap::new() };
    let render_one = |cte: &CteDefinition| -> String {
        render(&to_print_tokens(&Statement::Select(cte.query.clone())), &options)
            .map(|(sql, _)| sql)
            .unwrap_or_default()
    };
    render_one(a) == render_one(b)
}

fn topological_sort(ctes: Vec<CteDefinition>, recursive: bool) -> Result<Vec<CteDefinition>, SemanticError> {
    let names: HashSet<String> = ctes.iter().map(|c| c.name.ident.fold_key()).collect();
    let mut deps: HashMap<String, Vec<String>> = HashMap::new();
    let mut by_name: HashMap<String, CteDefinition> = HashMap::new();
    let declaration_order: Vec<String> = ctes.iter().map(|c| c.name.ident.fold_key()).collect();

    for cte in ctes {
        let key = cte.name.ident.fold_key();
        let referenced = referenced_tables(&cte.query);
        let own_deps: Vec<String> = referenced.into_iter().filter(|r| names.contains(r) && *r != key).collect();
        deps.insert(key.clone(), own_deps);
        by_name.insert(key, cte);
    }

    let mut visited: HashSet<String> = HashSet::new();
    let mut in_stack: HashSet<String> = HashSet::new();
    let mut ordered_keys: Vec<String> = Vec::new();
    let mut cycle: Option<Vec<String>> = None;

    fn visit(
        key: &str,
        deps: &HashMap<String, Vec<String>>,
        visited: &mut HashSet<String>,
        in_stack: &mut HashSet<String>,
        ordered_keys: &mut Vec<String>,
        cycle: &mut Option<Vec<String>>,
        path: &mut Vec<String>,
    ) {
        if cycle.is_some() || visited.contains(key) {
            return;
        }
        if in_stack.contains(key) {
            let start = path.iter().position(|k| k == key).unwrap_or(0);
            let mut found: Vec<String> = path[start..].to_vec();
            found.push(key.to_owned());
            *cycle = Some(found);
            return;
        }
        in_stack.insert(key.to_owned());
        path.push(key.to_owned());
        if let Some(children) = deps.get(key) {
            for child in children {
                visit(child, deps, visited, in_stack, ordered_keys, cycle, path);
            }
        }
        path.pop();
        in_stack.remove(key);
        visited.insert(key.to_owned());
        ordered_keys.push(key.to_owned());
    }

    for key in &declaration_order {
        let mut path = Vec::new();
        visit(key, &deps, &mut visited, &mut in_stack, &mut ordered_keys, &mut cycle, &mut path);
        if cycle.is_some() {
            break;
        }
    }

    if let Some(cycle_names) = cycle {
        if !recursive {
            log::debug!("cyclic common table expressions outside a RECURSIVE clause: {}", cycle_names.join(" -> "));
            return Err(SemanticError::CyclicCommonTables(cycle_names));
        }
        log::trace!("tolerating cycle in RECURSIVE with-clause: {}", cycle_names.join(" -> "));
        // A cycle can stop the DFS before every node is ordered; append any
        // CTE the walk never reached, in declaration order, so a legal
        // RECURSIVE cycle never loses a definition.
        let seen: HashSet<String> = ordered_keys.iter().cloned().collect();
        for key in &declaration_order {
            if !seen.contains(key) {
                ordered_keys.push(key.clone());
            }
        }
    }

    Ok(ordered_keys.into_iter().filter_map(|k| by_name.remove(&k)).collect())
}

/// Every table name a query's `FROM`/`JOIN`/`USING` clauses reference,
/// lower-cased and schema-stripped, used to build the CTE dependency graph.
fn referenced_tables(query: &Query) -> Vec<String> {
    struct TableNameCollector {
        names: Vec<String>,
    }
    impl Visitor for TableNameCollector {
        fn visit_table_factor(&mut self, table_factor: &TableFactor) {
            if let TableFactor::Table { name, .. } = table_factor {
                self.names.push(crate::ident::normalize_table_name(&name.to_ident_qualified_name()));
            }
            crate::visit::walk_table_factor(self, table_factor);
        }
    }
    let mut collector = TableNameCollector { names: Vec::new() };
    collector.visit_query(query);
    collector.names
}

/// Cycle detection in isolation (spec.md §4.4 rule 5), exposed separately
/// so callers that already have a normalized dependency graph don't need to
/// re-run the whole normalization pass just to check for cycles.
pub fn check_cycles(ctes: &[CteDefinition]) -> Option<Vec<String>> {
    let names: HashSet<String> = ctes.iter().map(|c| c.name.ident.fold_key()).collect();
    let mut deps: HashMap<String, Vec<String>> = HashMap::new();
    for cte in ctes {
        let key = cte.name.ident.fold_key();
        let referenced = referenced_tables(&cte.query);
        deps.insert(key, referenced.into_iter().filter(|r| names.contains(r)).collect());
    }
    let mut visited = HashSet::new();
    let mut stack = HashSet::new();
    let mut found = None;
    for cte in ctes {
        let key = cte.name.ident.fold_key();
        let mut path = Vec::new();
        detect(&key, &deps, &mut visited, &mut stack, &mut path, &mut found);
        if found.is_some() {
            break;
        }
    }
    found
}

fn detect(
    key: &str,
    deps: &HashMap<String, Vec<String>>,
    visited: &mut HashSet<String>,
    stack: &mut HashSet<String>,
    path: &mut Vec<String>,
    found: &mut Option<Vec<String>>,
) {
    if found.is_some() || visited.contains(key) {
        return;
    }
    if stack.contains(key) {
        let start = path.iter().position(|k| k == key).unwrap_or(0);
        let mut cycle: Vec<String> = path[start..].to_vec();
        cycle.push(key.to_owned());
        *found = Some(cycle);
        return;
    }
    stack.insert(key.to_owned());
    path.push(key.to_owned());
    if let Some(children) = deps.get(key) {
        for child in children {
            detect(child, deps, visited, stack, path, found);
        }
    }
    path.pop();
    stack.remove(key);
    visited.insert(key.to_owned());
}

/// Splits a normalized, acyclic CTE set back into standalone queries
/// (spec.md §4.9): each CTE's query stands alone, annotated with the names
/// of the other CTEs it depends on, so a caller can re-inline them one at a
/// time instead of all at once.
pub fn decompose_ctes(query: &Query) -> Vec<CteRestorationResult> {
    let Some(with) = &query.with else { return Vec::new() };
    let names: HashSet<String> = with.ctes.iter().map(|c| c.name.ident.fold_key()).collect();
    with.ctes
        .iter()
        .map(|cte| {
            let referenced = referenced_tables(&cte.query);
            let depends_on = referenced.into_iter().filter(|r| names.contains(r)).collect();
            CteRestorationResult {
                name: cte.name.name().to_owned(),
                query: (*cte.query).clone(),
                depends_on,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::parser::parse_select;

    #[test]
    fn normalizes_nested_ctes_in_dependency_order() {
        let mut query = parse_select(
            "with a as (select 1), b as (select * from a) select * from b",
            Dialect::Postgres,
        )
        .unwrap();
        normalize_ctes(&mut query).unwrap();
        let names: Vec<_> = query.with.unwrap().ctes.into_iter().map(|c| c.name.name().to_owned()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn rejects_cyclic_non_recursive_ctes() {
        let mut query = parse_select(
            "with a as (select * from b), b as (select * from a) select * from a",
            Dialect::Postgres,
        )
        .unwrap();
        let err = normalize_ctes(&mut query).unwrap_err();
        assert!(matches!(err, SemanticError::CyclicCommonTables(_)));
    }

    #[test]
    fn allows_cyclic_ctes_when_recursive() {
        let mut query = parse_select(
            "with recursive a as (select * from b), b as (select * from a) select * from a",
            Dialect::Postgres,
        )
        .unwrap();
        normalize_ctes(&mut query).unwrap();
    }
}
