// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! Dialect presets (spec.md §4.7): identifier escaping, parameter
//! rendering, and parameter style, selected by the caller at format time.

use serde::{Deserialize, Serialize};

/// The vendor syntaxes this crate has pragmatic coverage for. Parsing
/// always accepts the PostgreSQL-superset grammar described in spec.md §1;
/// `Dialect` mainly steers the formatter and a handful of lexer/parser
/// ambiguities (backtick vs. bracket identifiers, `(+)` Oracle outer join
/// marker, dialect-specific numeric suffixes).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    Postgres,
    MySql,
    SqlServer,
    Oracle,
    Sqlite,
    BigQuery,
    Snowflake,
    DuckDb,
    Redshift,
    Generic,
}

impl Dialect {
    pub fn identifier_escape(self) -> (char, char) {
        match self {
            Dialect::MySql => ('`', '`'),
            Dialect::SqlServer => ('[', ']'),
            _ => ('"', '"'),
        }
    }

    pub fn default_parameter_style(self) -> ParameterStyle {
        match self {
            Dialect::Postgres | Dialect::Redshift => ParameterStyle::Indexed,
            Dialect::SqlServer | Dialect::Oracle | Dialect::Snowflake => ParameterStyle::Named,
            _ => ParameterStyle::Anonymous,
        }
    }

    pub fn preset(self) -> DialectPreset {
        let (start, end) = self.identifier_escape();
        DialectPreset {
            dialect: self,
            identifier_escape: (start, end),
            parameter_symbol: self.default_parameter_symbol(),
            parameter_style: self.default_parameter_style(),
        }
    }

    /// The sigil this dialect renders a bound parameter placeholder with,
    /// consumed by [`crate::format::render`]. Kept separate from
    /// [`Self::default_parameter_style`] because two dialects can share a
    /// style (`Named`) while disagreeing on the symbol: SQL Server binds
    /// `@name`, Oracle and Snowflake bind `:name`.
    pub fn default_parameter_symbol(self) -> ParameterSymbol {
        match self {
            Dialect::SqlServer => ParameterSymbol::Fixed("@".to_owned()),
            _ => ParameterSymbol::for_style(self.default_parameter_style()),
        }
    }
}

/// How a bound parameter is rendered into the output SQL text.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ParameterStyle {
    /// `?`
    Anonymous,
    /// `$1`, `$2`, …
    Indexed,
    /// `:name` or `@name`
    Named,
}

/// The literal symbol(s) used to render a parameter placeholder.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum ParameterSymbol {
    Fixed(String),
    Bracketing(String, String),
}

impl ParameterSymbol {
    pub fn for_style(style: ParameterStyle) -> Self {
        match style {
            ParameterStyle::Anonymous => ParameterSymbol::Fixed("?".to_owned()),
            ParameterStyle::Indexed => ParameterSymbol::Fixed("$".to_owned()),
            ParameterStyle::Named => ParameterSymbol::Fixed(":".to_owned()),
        }
    }
}

/// A complete dialect preset as consumed by [`crate::format::render`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialectPreset {
    pub dialect: Dialect,
    pub identifier_escape: (char, char),
    pub parameter_symbol: ParameterSymbol,
    pub parameter_style: ParameterStyle,
}

impl Default for DialectPreset {
    fn default() -> Self {
        Dialect::Postgres.preset()
    }
}
