// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! Scope resolution (spec.md §4.5): maps a cursor byte offset to the set
//! of tables, CTEs, and columns visible there. Built on top of
//! [`crate::transform::recovery::parse_to_position`] so it keeps working on
//! SQL the user hasn't finished typing.

use crate::ast::*;
use crate::dialect::Dialect;
use crate::transform::recovery::{self, RecoveryOptions};
use crate::transform::schema::TableColumnResolver;
use crate::visit::{walk_query, walk_select, Visitor};
use std::collections::HashMap;
use text_size::TextRange;

/// What kind of `FROM`/`JOIN` source a [`TableRef`] came from.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SourceType {
    Table,
    Cte,
    Subquery,
    Function,
}

/// One table-shaped thing visible in a scope: a real table, a CTE
/// reference, a derived-table subquery, or a table function.
#[derive(Debug, Clone)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
    pub schema: Option<String>,
    pub full_name: String,
    pub source_type: SourceType,
    pub original_query: Option<Box<Query>>,
}

impl TableRef {
    /// The name a bare column reference would use to address this source:
    /// its alias if it has one, otherwise its own name.
    pub fn binding_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// The result of [`resolve_scope`]: everything visible at one cursor
/// position (spec.md §4.5).
#[derive(Debug, Clone, Default)]
pub struct ScopeInfo {
    pub available_tables: Vec<TableRef>,
    pub available_ctes: Vec<String>,
    pub visible_columns: Vec<String>,
    pub subquery_level: usize,
    pub current_query: Option<Box<Query>>,
    pub parent_queries: Vec<Query>,
    /// The qualifier immediately before the cursor, e.g. `u` in `u.|`
    /// (spec.md §8 scenario 4).
    pub active_table_scope: Option<String>,
    pub suggest_columns: bool,
    /// Set when no frame enclosing the cursor could be found (spec.md §9's
    /// resolution of the "analysis failed" open question): `ScopeInfo`
    /// still comes back with every collection empty rather than an error.
    pub fallback: bool,
}

struct Frame {
    span: TextRange,
    depth: usize,
    select: SelectStatement,
    ctes: Vec<String>,
    cte_defs: HashMap<String, CteDefinition>,
}

struct FrameCollector {
    cte_stack: Vec<(Vec<String>, HashMap<String, CteDefinition>)>,
    frames: Vec<Frame>,
}

impl FrameCollector {
    fn new() -> Self {
        Self { cte_stack: vec![(Vec::new(), HashMap::new())], frames: Vec::new() }
    }
}

impl Visitor for FrameCollector {
    fn visit_query(&mut self, query: &Query) {
        let (parent_names, parent_defs) = self.cte_stack.last().cloned().unwrap_or_default();
        let mut names = parent_names;
        let mut defs = parent_defs;
        if let Some(with) = &query.with {
            for cte in &with.ctes {
                names.push(cte.name.name().to_owned());
                defs.insert(crate::ident::Ident::new(cte.name.name(), false).fold_key(), cte.clone());
            }
        }
        self.cte_stack.push((names, defs));
        walk_query(self, query);
        self.cte_stack.pop();
    }

    fn visit_select(&mut self, select: &SelectStatement) {
        let (ctes, cte_defs) = self.cte_stack.last().cloned().unwrap_or_default();
        let depth = self.cte_stack.len().saturating_sub(1);
        self.frames.push(Frame {
            span: select.span,
            depth,
            select: select.clone(),
            ctes,
            cte_defs,
        });
        walk_select(self, select);
    }
}

/// Given `(sql, cursor_byte_offset)`, returns everything visible at that
/// position: tables, CTEs, and (when a resolver is supplied) columns.
/// Never fails — an unparseable or empty scope comes back as a
/// `ScopeInfo` with every collection empty and `fallback: true`, per
/// spec.md §9.
pub fn resolve_scope(text: &str, cursor: usize, dialect: Dialect, resolver: Option<&dyn TableColumnResolver>) -> ScopeInfo {
    let cursor = cursor.min(text.len());
    let recovery = recovery::parse_to_position(text, cursor, RecoveryOptions { dialect, ..RecoveryOptions::default() });

    let Some(stmt) = &recovery.partial_ast else {
        return empty_scope(&recovery);
    };

    let mut collector = FrameCollector::new();
    collector.visit_statement(stmt);

    // The active frame is the innermost (smallest-span) frame whose span
    // encloses the cursor.
    let active = collector
        .frames
        .iter()
        .filter(|f| contains(f.span, cursor))
        .min_by_key(|f| u32::from(f.span.len()));

    let Some(active) = active else {
        return empty_scope(&recovery);
    };

    let tables = collect_tables(&active.select, &active.ctes, &active.cte_defs, resolver);
    let mut visible_columns: Vec<String> = Vec::new();
    for table in &tables {
        visible_columns.extend(columns_for(table, resolver));
    }
    if resolver.is_none() {
        visible_columns.push("*".to_owned());
    }
    visible_columns.sort();
    visible_columns.dedup();

    let mut parent_queries: Vec<Query> = collector
        .frames
        .iter()
        .filter(|f| f.depth < active.depth && contains(f.span, cursor))
        .map(|f| Query {
            with: None,
            body: SetExpr::Select(Box::new(f.select.clone())),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            fetch: None,
            locking: Vec::new(),
            comments: Vec::new(),
            span: f.span,
        })
        .collect();
    parent_queries.sort_by_key(|q| std::cmp::Reverse(u32::from(q.span.len())));

    let current_query = Some(Box::new(Query {
        with: None,
        body: SetExpr::Select(Box::new(active.select.clone())),
        order_by: Vec::new(),
        limit: None,
        offset: None,
        fetch: None,
        locking: Vec::new(),
        comments: Vec::new(),
        span: active.span,
    }));

    let (active_table_scope, suggest_columns) = cursor_qualifier(&recovery, cursor);

    ScopeInfo {
        available_tables: tables,
        available_ctes: active.ctes.clone(),
        visible_columns,
        subquery_level: active.depth,
        current_query,
        parent_queries,
        active_table_scope,
        suggest_columns,
        fallback: false,
    }
}

fn empty_scope(recovery: &recovery::PositionParseResult) -> ScopeInfo {
    let (active_table_scope, suggest_columns) = cursor_qualifier(recovery, usize::MAX);
    ScopeInfo {
        active_table_scope,
        suggest_columns,
        fallback: true,
        ..ScopeInfo::default()
    }
}

fn contains(span: TextRange, cursor: usize) -> bool {
    let cursor: text_size::TextSize = (cursor as u32).into();
    span.start() <= cursor && cursor <= span.end()
}

/// Looks at the lexeme stream immediately left of the cursor to find a
/// dangling `qualifier.` pattern (spec.md §8 scenario 4: `u.|` → active
/// table scope `u`, `suggest_columns = true`).
fn cursor_qualifier(recovery: &recovery::PositionParseResult, cursor: usize) -> (Option<String>, bool) {
    let before: Vec<&crate::lexer::Lexeme> =
        recovery.lexemes.iter().filter(|lx| lx.kind != crate::lexer::LexemeKind::Eof && lx.end() <= cursor).collect();
    let Some(last) = before.last() else { return (None, false) };
    if last.kind == crate::lexer::LexemeKind::Dot {
        let qualifier = before[..before.len() - 1]
            .last()
            .filter(|lx| lx.kind == crate::lexer::LexemeKind::Identifier)
            .map(|lx| lx.text.clone());
        return (qualifier, true);
    }
    (None, false)
}

/// Builds the table list for one `SELECT`'s `FROM`/`JOIN` clauses (spec.md
/// §4.5 step 3).
fn collect_tables(
    select: &SelectStatement,
    ctes: &[String],
    cte_defs: &HashMap<String, CteDefinition>,
    resolver: Option<&dyn TableColumnResolver>,
) -> Vec<TableRef> {
    let mut out = Vec::new();
    for twj in &select.from {
        collect_from_table_with_joins(twj, ctes, cte_defs, resolver, &mut out);
    }
    out
}

fn collect_from_table_with_joins(
    twj: &TableWithJoins,
    ctes: &[String],
    cte_defs: &HashMap<String, CteDefinition>,
    resolver: Option<&dyn TableColumnResolver>,
    out: &mut Vec<TableRef>,
) {
    collect_from_table_factor(&twj.relation, ctes, cte_defs, resolver, out);
    for join in &twj.joins {
        collect_from_table_factor(&join.relation, ctes, cte_defs, resolver, out);
    }
}

fn collect_from_table_factor(
    tf: &TableFactor,
    ctes: &[String],
    cte_defs: &HashMap<String, CteDefinition>,
    resolver: Option<&dyn TableColumnResolver>,
    out: &mut Vec<TableRef>,
) {
    match tf {
        TableFactor::Table { name, alias, .. } => {
            let key = crate::ident::normalize_table_name(&name.to_ident_qualified_name());
            let is_cte = ctes.iter().any(|c| crate::ident::Ident::new(c, false).fold_key() == key);
            let schema = name.qualifier().and_then(|parts| parts.last()).map(|p| p.name().to_owned());
            let cte_def = if is_cte { cte_defs.get(&key) } else { None };
            out.push(TableRef {
                name: name.last().name().to_owned(),
                alias: alias.as_ref().map(|a| a.name.name().to_owned()),
                schema,
                full_name: name.to_ident_qualified_name().to_string(),
                source_type: if is_cte { SourceType::Cte } else { SourceType::Table },
                original_query: cte_def.map(|def| def.query.clone()),
            });
            let _ = resolver;
        }
        TableFactor::Derived { subquery, alias, .. } => {
            out.push(TableRef {
                name: alias.as_ref().map(|a| a.name.name().to_owned()).unwrap_or_default(),
                alias: alias.as_ref().map(|a| a.name.name().to_owned()),
                schema: None,
                full_name: alias.as_ref().map(|a| a.name.name().to_owned()).unwrap_or_default(),
                source_type: SourceType::Subquery,
                original_query: Some(subquery.clone()),
            });
        }
        TableFactor::Function { call, alias, .. } => {
            out.push(TableRef {
                name: call.name.to_ident_qualified_name().to_string(),
                alias: alias.as_ref().map(|a| a.name.name().to_owned()),
                schema: None,
                full_name: call.name.to_ident_qualified_name().to_string(),
                source_type: SourceType::Function,
                original_query: None,
            });
        }
        TableFactor::NestedJoin(twj, _) => collect_from_table_with_joins(twj, ctes, cte_defs, resolver, out),
    }
}

/// Visible columns for one table source (spec.md §4.5 step 3's "visible
/// columns"): resolver-provided columns for a real table, explicit
/// column-alias lists for CTEs/subqueries (falling back to inferring them
/// from the CTE's own projection when no alias list was declared), nothing
/// for table functions (caller falls back to `*`).
fn columns_for(table: &TableRef, resolver: Option<&dyn TableColumnResolver>) -> Vec<String> {
    match table.source_type {
        SourceType::Table => resolver.map(|r| r.columns(&table.full_name)).unwrap_or_default(),
        SourceType::Subquery | SourceType::Cte => table
            .original_query
            .as_ref()
            .and_then(|q| select_item_aliases(&q.body))
            .unwrap_or_default(),
        SourceType::Function => Vec::new(),
    }
}

fn select_item_aliases(set_expr: &SetExpr) -> Option<Vec<String>> {
    match set_expr {
        SetExpr::Select(select) => Some(
            select
                .projection
                .iter()
                .filter_map(|item| match item {
                    SelectItem::ExprWithAlias { alias, .. } => Some(alias.name().to_owned()),
                    SelectItem::UnnamedExpr(Expr::Identifier(ident)) => Some(ident.name().to_owned()),
                    SelectItem::UnnamedExpr(Expr::CompoundIdentifier(name)) => Some(name.last().name().to_owned()),
                    _ => None,
                })
                .collect(),
        ),
        SetExpr::SetOperation { left, .. } => select_item_aliases(left),
        SetExpr::Nested(q) => select_item_aliases(&q.body),
        SetExpr::Values(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    struct FixedResolver(StdHashMap<&'static str, Vec<&'static str>>);
    impl TableColumnResolver for FixedResolver {
        fn columns(&self, table_name: &str) -> Vec<String> {
            self.0.get(table_name).map(|c| c.iter().map(|s| s.to_string()).collect()).unwrap_or_default()
        }
    }

    #[test]
    fn resolves_tables_and_qualifier_at_cursor() {
        let text = "select u. from users u join orders o on o.user_id = u.id";
        let cursor = "select u.".len();
        let scope = resolve_scope(text, cursor, Dialect::Postgres, None);
        assert!(!scope.fallback);
        assert_eq!(scope.active_table_scope.as_deref(), Some("u"));
        assert!(scope.suggest_columns);
        let names: Vec<_> = scope.available_tables.iter().map(|t| t.binding_name().to_owned()).collect();
        assert!(names.contains(&"u".to_owned()));
        assert!(names.contains(&"o".to_owned()));
    }

    #[test]
    fn reports_cte_source_type() {
        let text = "with a as (select 1 as x) select | from a";
        let cursor = text.find('|').unwrap();
        let text = text.replace('|', "");
        let scope = resolve_scope(&text, cursor, Dialect::Postgres, None);
        assert!(!scope.fallback);
        assert!(scope.available_ctes.contains(&"a".to_owned()));
        assert!(scope.available_tables.iter().any(|t| matches!(t.source_type, SourceType::Cte)));
    }

    #[test]
    fn nested_subquery_increases_subquery_level() {
        let text = "select * from (select a.id from users a) t where t.";
        let cursor = text.len();
        let scope = resolve_scope(text, cursor, Dialect::Postgres, None);
        assert!(!scope.fallback);
        assert_eq!(scope.subquery_level, 0);
        assert!(scope.available_tables.iter().any(|t| t.binding_name() == "t"));
    }

    #[test]
    fn known_resolver_populates_visible_columns() {
        let mut tables = StdHashMap::new();
        tables.insert("users", vec!["id", "name"]);
        let resolver = FixedResolver(tables);
        let text = "select u.id from users u";
        let scope = resolve_scope(text, 7, Dialect::Postgres, Some(&resolver));
        assert!(scope.visible_columns.contains(&"id".to_owned()));
        assert!(scope.visible_columns.contains(&"name".to_owned()));
    }
}
