// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! Keyword tables (spec.md §4.1): one set of single-word SQL keywords, one
//! set of multi-word command phrases ("group by", "distinct on", …), one
//! set of JOIN-variant phrases, and one set of type-name keywords.
//!
//! Lookups are lower-case; the lexer is responsible for lower-casing a word
//! before consulting these tables (identifiers keep their original case,
//! keywords don't per spec.md §4.1).

use std::collections::HashSet;

lazy_static::lazy_static! {
    /// Single-word keywords that make a standalone word a `Command` lexeme.
    pub static ref COMMAND_WORDS: HashSet<&'static str> = [
        "select", "insert", "update", "delete", "merge", "create", "with", "values",
        "from", "where", "having", "as", "on", "using", "into", "set", "default",
        "returning", "recursive", "materialized", "window", "over", "partition",
        "order", "group", "by", "asc", "desc", "nulls", "first", "last", "limit",
        "offset", "fetch", "next", "row", "rows", "only", "for", "share", "key",
        "nokeyupdate", "of", "no", "distinct", "all", "any", "some", "union",
        "intersect", "except", "and", "or", "not", "is", "null", "true", "false",
        "unknown", "between", "in", "like", "ilike", "similar", "to", "escape",
        "case", "when", "then", "else", "end", "cast", "extract", "position",
        "substring", "overlay", "placing", "for", "trim", "leading", "trailing",
        "both", "join", "inner", "outer", "left", "right", "full", "cross",
        "natural", "lateral", "unbounded", "preceding", "following", "current",
        "range", "groups", "ties", "percent", "within", "ordinality", "do",
        "nothing", "conflict", "table", "temp", "temporary", "view", "index",
        "primary", "foreign", "constraint", "check", "unique", "references", "matched",
        "source", "target", "replace", "if", "exists", "cube", "rollup",
        "grouping", "sets", "array", "filter", "collate", "at", "zone", "interval",
        "global", "local", "begin", "commit", "rollback", "transaction", "explain",
        "analyze", "vacuum", "lock", "truncate", "grant", "revoke", "function",
        "procedure", "trigger", "sequence", "schema", "database", "column",
        "add", "drop", "alter", "rename", "cascade", "restrict", "exclude",
        "others", "nowait", "skip", "locked",
    ]
    .into_iter()
    .collect();

    /// Multi-word command phrases, longest-match-first. Source of truth for
    /// the tokenizer's greedy phrase merge (see `lexer::try_match_phrase`).
    pub static ref COMMAND_PHRASES: Vec<&'static str> = {
        let mut phrases = vec![
            "group by",
            "order by",
            "partition by",
            "distinct on",
            "within group",
            "with ordinality",
            "not materialized",
            "no key update",
            "key share",
            "for no key update",
            "for key share",
            "percent with ties",
            "union all",
            "intersect all",
            "except all",
            "is not",
            "is distinct from",
            "is not distinct from",
            "not in",
            "not like",
            "not ilike",
            "not between",
            "not similar to",
            "similar to",
            "or replace",
            "if not exists",
            "if exists",
            "create or replace",
            "do nothing",
            "do update",
            "nulls first",
            "nulls last",
            "grouping sets",
            "unbounded preceding",
            "unbounded following",
            "current row",
            "exclude current row",
            "exclude group",
            "exclude ties",
            "exclude no others",
            "with ties",
            "skip locked",
        ];
        // Longest phrase first, so the greedy matcher in the lexer always
        // prefers the most specific phrase over a shorter prefix of it.
        phrases.sort_by_key(|p| std::cmp::Reverse(p.split_whitespace().count()));
        phrases
    };

    /// JOIN-variant phrases, same longest-match-first convention.
    pub static ref JOIN_PHRASES: Vec<&'static str> = {
        let mut phrases = vec![
            "join",
            "inner join",
            "cross join",
            "left join",
            "left outer join",
            "right join",
            "right outer join",
            "full join",
            "full outer join",
            "natural join",
            "natural inner join",
            "natural left join",
            "natural left outer join",
            "natural right join",
            "natural right outer join",
            "natural full join",
            "natural full outer join",
        ];
        phrases.sort_by_key(|p| std::cmp::Reverse(p.split_whitespace().count()));
        phrases
    };

    // `LATERAL` may prefix any of the above JOIN phrases; the lexer/parser
    // treats it as a separate boolean flag rather than baking it into the
    // phrase table, matching spec.md §4.2: "`LATERAL` is a per-join boolean."

    /// Type-name keywords, used by the tokenizer to classify a bare word as
    /// a `Type` lexeme (e.g. `numeric` in `numeric(10,2)`).
    pub static ref TYPE_WORDS: HashSet<&'static str> = [
        "int", "integer", "smallint", "bigint", "numeric", "decimal", "real",
        "double", "precision", "boolean", "bool", "text", "varchar",
        "character", "char", "date", "time", "timestamp", "timestamptz",
        "interval", "json", "jsonb", "uuid", "bytea", "money", "serial",
        "bigserial", "smallserial", "xml", "point", "inet", "cidr", "macaddr",
        "bit", "varying", "tsvector", "tsquery",
    ]
    .into_iter()
    .collect();
}

/// Attempts to match the longest phrase in `phrases` (already sorted
/// longest-first) against the space-joined `words`, returning the number of
/// leading words it consumed.
pub fn match_longest_phrase(words: &[String], phrases: &[&'static str]) -> Option<(String, usize)> {
    for phrase in phrases {
        let phrase_words: Vec<&str> = phrase.split_whitespace().collect();
        if phrase_words.len() > words.len() {
            continue;
        }
        let matches = phrase_words
            .iter()
            .zip(words.iter())
            .all(|(expected, actual)| actual.eq_ignore_ascii_case(expected));
        if matches {
            return Some((phrase.to_string(), phrase_words.len()));
        }
    }
    None
}

pub fn is_command_word(word: &str) -> bool {
    COMMAND_WORDS.contains(word.to_lowercase().as_str())
}

pub fn is_type_word(word: &str) -> bool {
    TYPE_WORDS.contains(word.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_longest_phrase_first() {
        let words = vec!["union".to_string(), "all".to_string(), "select".to_string()];
        let (phrase, consumed) = match_longest_phrase(&words, &COMMAND_PHRASES).unwrap();
        assert_eq!(phrase, "union all");
        assert_eq!(consumed, 2);
    }

    #[test]
    fn falls_back_to_shorter_join_phrase() {
        let words = vec!["join".to_string(), "orders".to_string()];
        let (phrase, consumed) = match_longest_phrase(&words, &JOIN_PHRASES).unwrap();
        assert_eq!(phrase, "join");
        assert_eq!(consumed, 1);
    }
}
