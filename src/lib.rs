// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! A SQL analysis library (spec.md §1): tokenizer, recursive-descent
//! parser, owned AST, a CTE/scope/schema transform pipeline, and a
//! print-token-tree formatter, with pragmatic multi-dialect coverage
//! layered on a PostgreSQL-superset grammar.
//!
//! The pipeline mirrors the teacher crate's own layering (lex → parse →
//! analyze), rebuilt around an owned AST instead of a rowan CST: [`lexer`]
//! turns source text into a [`lexer::Lexeme`] stream, [`parser`] turns that
//! stream into an [`ast::Statement`], [`transform`] normalizes and inspects
//! the tree (CTE flattening, scope resolution, error-recovery parsing,
//! parameter/column collection, schema validation), and [`format`] renders
//! a tree back into dialect-specific SQL text.

pub mod ast;
pub mod dialect;
pub mod error;
pub mod format;
pub mod ident;
pub mod keywords;
pub mod lexer;
pub mod parser;
pub mod position;
pub mod transform;
pub mod visit;

pub use dialect::{Dialect, DialectPreset, ParameterStyle};
pub use error::{Error, LexicalError, SemanticError, SemanticErrors, SyntaxError};
pub use format::{format_query, format_statement, to_print_tokens, FormatOptions, ParamBag};
pub use parser::{
    parse_create_table, parse_delete, parse_insert, parse_merge, parse_select, parse_statement, parse_update,
    parse_value, split_statements,
};
pub use transform::columns::collect_columns;
pub use transform::cte::{check_cycles, decompose_ctes, normalize_ctes, CteRestorationResult};
pub use transform::params::collect_parameters;
pub use transform::recovery::{parse_to_position, PositionParseResult, RecoveryStrategy};
pub use transform::schema::{validate_schema, TableColumnResolver};
pub use transform::scope::{resolve_scope, ScopeInfo, SourceType, TableRef};

/// Parses `text` as a standalone statement and immediately runs it through
/// [`transform::schema::validate_schema`], matching spec.md §6's combined
/// `parseAnalyze` entry point used by callers that want parse errors and
/// schema errors reported together instead of as two round trips.
pub fn parse_analyze(
    text: &str,
    dialect: Dialect,
    resolver: &dyn TableColumnResolver,
) -> Result<ast::Statement, Error> {
    let stmt = parse_statement(text, dialect)?;
    validate_schema(&stmt, resolver)?;
    Ok(stmt)
}
