// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! Case-folding, quote-aware SQL identifier comparison.
//!
//! Unquoted identifiers compare case-insensitively (as PostgreSQL folds them
//! to lower case); quoted identifiers compare exactly. This backs
//! §4.4's `normalizeTableName` and every place the spec asks for
//! "case-insensitive, namespace-aware" table-name matching.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Ident {
    name: String,
    quoted: bool,
}

impl Ident {
    pub fn new(name: impl Into<String>, quoted: bool) -> Self {
        Self {
            name: name.into(),
            quoted,
        }
    }

    /// Builds an identifier from raw source text, inferring quoting from a
    /// leading/trailing `"`.
    pub fn from_source(text: &str) -> Self {
        let quoted = text.starts_with('"') && text.ends_with('"') && text.len() >= 2;
        let name = if quoted {
            text[1..text.len() - 1].replace("\"\"", "\"")
        } else {
            text.to_owned()
        };
        Self { name, quoted }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// The value used for case-insensitive comparisons/lookups: lower-cased
    /// unless the identifier was quoted (which preserves case exactly).
    pub fn fold_key(&self) -> String {
        if self.quoted {
            self.name.clone()
        } else {
            self.name.to_lowercase()
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "\"{}\"", self.name.replace('"', "\"\""))
        } else {
            write!(f, "{}", self.name)
        }
    }
}

impl PartialEq for Ident {
    fn eq(&self, other: &Self) -> bool {
        self.fold_key() == other.fold_key()
    }
}

impl Hash for Ident {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fold_key().hash(state);
    }
}

impl From<&str> for Ident {
    fn from(s: &str) -> Self {
        Ident::from_source(s)
    }
}

impl From<String> for Ident {
    fn from(s: String) -> Self {
        Ident::from_source(&s)
    }
}

/// A possibly dot-qualified name (`schema.table`, `table.column`, or a bare
/// name), as used for table sources, CTE references, and column references.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub parts: Vec<Ident>,
}

impl QualifiedName {
    pub fn new(parts: Vec<Ident>) -> Self {
        Self { parts }
    }

    pub fn single(name: impl Into<Ident>) -> Self {
        Self {
            parts: vec![name.into()],
        }
    }

    /// The right-most component, e.g. the table name in `schema.table`.
    pub fn last(&self) -> Option<&Ident> {
        self.parts.last()
    }

    /// `true` for the bare `*` placeholder used by `SELECT *`.
    pub fn is_wildcard(&self) -> bool {
        self.parts.len() == 1 && self.parts[0].as_str() == "*"
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for part in &self.parts {
            if !first {
                write!(f, ".")?;
            }
            first = false;
            if part.as_str() == "*" {
                write!(f, "*")?;
            } else {
                write!(f, "{part}")?;
            }
        }
        Ok(())
    }
}

/// Normalizes a table/CTE name for dependency-graph and scope comparisons:
/// folds casing the same way [`Ident::fold_key`] does and drops schema
/// qualification, keeping only the final component.
pub fn normalize_table_name(name: &QualifiedName) -> String {
    name.last().map(Ident::fold_key).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquoted_identifiers_fold_case() {
        assert_eq!(Ident::from("Users"), Ident::from("users"));
    }

    #[test]
    fn quoted_identifiers_are_exact() {
        assert_ne!(Ident::from("\"Users\""), Ident::from("\"users\""));
        assert_eq!(Ident::from("\"Users\""), Ident::from("\"Users\""));
    }

    #[test]
    fn normalizes_schema_qualified_names() {
        let name = QualifiedName::new(vec![Ident::from("public"), Ident::from("Orders")]);
        assert_eq!(normalize_table_name(&name), "orders");
    }
}
