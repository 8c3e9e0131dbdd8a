// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! Error-recovery parsing for incomplete SQL (spec.md §4.6), used by
//! editor-integration callers (IntelliSense, scope resolution at a cursor)
//! that need *some* AST even when the user hasn't finished typing a
//! statement. Tries five strategies in order and never fails — the last
//! strategy is a hard-coded fallback AST.

use crate::ast::Statement;
use crate::dialect::Dialect;
use crate::lexer::{self, Lexeme, LexemeKind};
use crate::parser::parse_statement;

pub const DEFAULT_MAX_RECOVERY_ATTEMPTS: u32 = 5;

/// Which of the five ordered strategies produced [`PositionParseResult`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RecoveryStrategy {
    Normal,
    TokenInsertion,
    Truncation,
    Completion,
    Minimal,
}

#[derive(Debug, Clone, Copy)]
pub struct RecoveryOptions {
    pub dialect: Dialect,
    pub max_recovery_attempts: u32,
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self { dialect: Dialect::Postgres, max_recovery_attempts: DEFAULT_MAX_RECOVERY_ATTEMPTS }
    }
}

#[derive(Debug, Clone)]
pub struct PositionParseResult {
    pub success: bool,
    pub partial_ast: Option<Statement>,
    pub lexemes: Vec<Lexeme>,
    pub token_before_cursor: Option<Lexeme>,
    pub attempts: u32,
    pub strategy: RecoveryStrategy,
}

/// Attempts, in order, the five strategies of spec.md §4.6, stopping at the
/// first success. Never returns an error — the last strategy is a
/// hard-coded statement that always parses.
pub fn parse_to_position(text: &str, cursor: usize, opts: RecoveryOptions) -> PositionParseResult {
    let cursor = cursor.min(text.len());
    let lexemes = lexer::tokenize(text).unwrap_or_default();
    let token_before_cursor = lexemes
        .iter()
        .rev()
        .find(|lx| lx.kind != LexemeKind::Eof && lx.start() <= cursor)
        .cloned();
    let prefix = &text[..cursor];
    let suffix = &text[cursor..];

    let mut attempts = 0u32;
    macro_rules! attempt {
        ($strategy:expr, $body:expr) => {
            attempts += 1;
            if let Some(stmt) = $body {
                log::trace!("recovery strategy {:?} succeeded on attempt {attempts}", $strategy);
                return PositionParseResult {
                    success: true,
                    partial_ast: Some(stmt),
                    lexemes,
                    token_before_cursor,
                    attempts,
                    strategy: $strategy,
                };
            }
            if attempts >= opts.max_recovery_attempts {
                return minimal_result(lexemes, token_before_cursor, attempts, opts.dialect);
            }
        };
    }

    // 1. Normal: parse the whole text, but treat an obviously-incomplete
    // trailing token as a forced failure so strategy 2+ gets a chance.
    attempt!(RecoveryStrategy::Normal, {
        parse_statement(text, opts.dialect).ok().filter(|_| !ends_with_forced_failure_token(prefix))
    });

    // 2. Token insertion: a small table of trailing fixups, spliced in at
    // the cursor and followed by the real tail of the input (`suffix`) so a
    // `FROM`/`JOIN` clause typed after the cursor isn't thrown away just
    // because the text immediately before it is incomplete. Falls back to
    // dropping the tail (the original strategy) if the spliced candidate
    // doesn't parse — e.g. when the tail assumes a different completion.
    attempt!(RecoveryStrategy::TokenInsertion, {
        token_insertion_fixup(prefix).and_then(|fixup| {
            parse_statement(&format!("{prefix}{fixup}{suffix}"), opts.dialect)
                .ok()
                .or_else(|| parse_statement(&format!("{prefix}{fixup}"), opts.dialect).ok())
        })
    });

    // 3. Truncation: cut at the cursor, try a handful of minimal endings.
    // Each candidate is tried with the real tail spliced back on first, so
    // a suffix that still parses once the cursor gap is patched is kept
    // rather than silently discarded.
    attempt!(RecoveryStrategy::Truncation, {
        ["", " 1", " FROM dual", " WHERE 1=1"].into_iter().find_map(|ending| {
            parse_statement(&format!("{prefix}{ending}{suffix}"), opts.dialect)
                .ok()
                .or_else(|| parse_statement(&format!("{prefix}{ending}"), opts.dialect).ok())
        })
    });

    // 4. Completion: pattern-match what's immediately left of the cursor,
    // insert a minimal completion, and keep the real tail after the
    // cursor — this is what recovers spec.md §8 scenario 4's dangling
    // `u.` ahead of a `FROM ... JOIN ...` clause, rather than discarding
    // that clause the way a plain truncate-and-append would.
    attempt!(RecoveryStrategy::Completion, {
        completion_insertion(prefix).and_then(|completion| {
            let trimmed = prefix.trim_end();
            parse_statement(&format!("{trimmed}{completion}{suffix}"), opts.dialect).ok().or_else(|| {
                ["", " FROM dual", " WHERE 1=1"]
                    .into_iter()
                    .find_map(|ending| parse_statement(&format!("{trimmed}{completion}{ending}"), opts.dialect).ok())
            })
        })
    });

    // 5. Minimal: a hard-coded statement that always parses.
    attempts += 1;
    minimal_result(lexemes, token_before_cursor, attempts, opts.dialect)
}

fn minimal_result(
    lexemes: Vec<Lexeme>,
    token_before_cursor: Option<Lexeme>,
    attempts: u32,
    dialect: Dialect,
) -> PositionParseResult {
    log::debug!("recovery exhausted {attempts} attempt(s); falling back to the minimal statement");
    let minimal =
        parse_statement("SELECT 1 FROM dual WHERE 1=1", dialect).expect("the hard-coded minimal statement always parses");
    PositionParseResult {
        success: true,
        partial_ast: Some(minimal),
        lexemes,
        token_before_cursor,
        attempts,
        strategy: RecoveryStrategy::Minimal,
    }
}

/// The trailing word or punctuation mark at the end of `text`, lower-cased —
/// `None` for a blank string. Used both to detect an obviously-unfinished
/// tail (`.`, `,`, a bare clause keyword) and to key the token-insertion
/// fixup table.
fn trailing_word(text: &str) -> Option<String> {
    let trimmed = text.trim_end();
    let last = trimmed.chars().last()?;
    if last == '.' || last == ',' {
        return Some(last.to_string());
    }
    if !(last.is_alphanumeric() || last == '_') {
        return None;
    }
    let mut start = trimmed.len();
    for (i, c) in trimmed.char_indices().rev() {
        if c.is_alphanumeric() || c == '_' {
            start = i;
        } else {
            break;
        }
    }
    Some(trimmed[start..].to_lowercase())
}

fn ends_with_forced_failure_token(text: &str) -> bool {
    matches!(
        trailing_word(text).as_deref(),
        Some(".") | Some(",") | Some("select") | Some("from") | Some("where") | Some("join") | Some("on")
    )
}

fn token_insertion_fixup(prefix: &str) -> Option<&'static str> {
    match trailing_word(prefix)?.as_str() {
        "select" => Some(" 1 "),
        "from" => Some(" dual "),
        "where" => Some(" 1=1 "),
        _ => None,
    }
}

fn completion_insertion(prefix: &str) -> Option<&'static str> {
    let trimmed = prefix.trim_end();
    let last = trimmed.chars().last()?;
    if last == '.' {
        Some("id")
    } else if last.is_alphanumeric() || last == '_' {
        Some("")
    } else if last == ',' {
        Some(" 1")
    } else if last == '(' {
        Some("1)")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SetExpr;

    #[test]
    fn recovers_dangling_qualifier_via_completion() {
        let text = "SELECT u.name FROM users u WHERE u.";
        let result = parse_to_position(text, text.len(), RecoveryOptions::default());
        assert!(result.success);
        assert!(result.attempts >= 1);
        assert_eq!(result.token_before_cursor.as_ref().map(|lx| lx.text.as_str()), Some("."));
    }

    #[test]
    fn recovers_dangling_select_via_token_insertion() {
        let text = "SELECT ";
        let result = parse_to_position(text, text.len(), RecoveryOptions::default());
        assert!(result.success);
        assert_eq!(result.strategy, RecoveryStrategy::TokenInsertion);
    }

    #[test]
    fn falls_back_to_minimal_for_garbage_input() {
        let text = "***";
        let result = parse_to_position(text, text.len(), RecoveryOptions::default());
        assert!(result.success);
        assert_eq!(result.strategy, RecoveryStrategy::Minimal);
    }

    #[test]
    fn complete_statements_use_the_normal_strategy() {
        let text = "select 1 from t";
        let result = parse_to_position(text, text.len(), RecoveryOptions::default());
        assert_eq!(result.strategy, RecoveryStrategy::Normal);
    }

    #[test]
    fn completion_keeps_the_from_clause_after_a_dangling_qualifier() {
        let text = "select u. from users u join orders o on o.user_id = u.id";
        let cursor = "select u.".len();
        let result = parse_to_position(text, cursor, RecoveryOptions::default());
        assert!(result.success);
        assert_eq!(result.strategy, RecoveryStrategy::Completion);
        let Statement::Select(query) = result.partial_ast.unwrap() else {
            panic!("expected a select statement");
        };
        let SetExpr::Select(select) = &query.body else {
            panic!("expected a simple select");
        };
        assert_eq!(select.from.len(), 1);
        assert_eq!(select.from[0].joins.len(), 1, "the JOIN typed after the cursor must survive recovery");
    }
}
