// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! The print-token tree itself (spec.md §4.7) and the flatten/spacing rules
//! `render` walks. Kept separate from `format::mod` so the tree shape can be
//! unit-tested without dragging in the whole AST-to-token builder.

/// spec.md §4.7's token kind enum, verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintTokenKind {
    Container,
    Keyword,
    Value,
    Comma,
    ArgumentSplitter,
    Parenthesis,
    Operator,
    Comment,
    Parameter,
    Dot,
    Type,
    Space,
}

/// Groups a container's children under a clause so downstream consumers
/// (e.g. a highlighter, or a future pretty-printer) can indent or collapse
/// by clause without re-parsing the token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerType {
    Select,
    From,
    Where,
    GroupBy,
    Having,
    OrderBy,
    With,
    Join,
    Values,
    Insert,
    Update,
    Delete,
    Merge,
    CreateTable,
    Limit,
    Offset,
    Fetch,
    Expression,
}

/// A node in the print-token tree. Leaves carry `text`; containers carry
/// `inner_tokens` and an empty `text`.
#[derive(Debug, Clone)]
pub struct PrintToken {
    pub kind: PrintTokenKind,
    pub text: String,
    pub container_type: Option<ContainerType>,
    pub inner_tokens: Vec<PrintToken>,
}

impl PrintToken {
    pub fn leaf(kind: PrintTokenKind, text: impl Into<String>) -> Self {
        PrintToken { kind, text: text.into(), container_type: None, inner_tokens: Vec::new() }
    }

    pub fn container(container_type: ContainerType, inner_tokens: Vec<PrintToken>) -> Self {
        PrintToken {
            kind: PrintTokenKind::Container,
            text: String::new(),
            container_type: Some(container_type),
            inner_tokens,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.kind != PrintTokenKind::Container
    }
}

/// Depth-first flatten of the tree into its leaves, in document order.
pub fn flatten<'a>(token: &'a PrintToken, out: &mut Vec<&'a PrintToken>) {
    if token.is_leaf() {
        out.push(token);
    } else {
        for inner in &token.inner_tokens {
            flatten(inner, out);
        }
    }
}

/// Adjacency rule for Phase B: whether a space belongs between `prev` and
/// `next` in the flattened leaf stream. No state beyond the immediately
/// preceding leaf is needed because SQL's punctuation spacing is local.
pub fn needs_space_before(prev: Option<&PrintToken>, next: &PrintToken) -> bool {
    let Some(prev) = prev else { return false };

    let no_space_before = matches!(
        next.kind,
        PrintTokenKind::Comma | PrintTokenKind::Dot | PrintTokenKind::ArgumentSplitter
    ) || (next.kind == PrintTokenKind::Parenthesis && next.text == ")");

    let no_space_after = matches!(prev.kind, PrintTokenKind::Dot)
        || (prev.kind == PrintTokenKind::Parenthesis && prev.text == "(")
        || (prev.kind == PrintTokenKind::Operator && prev.text == "*" && next.kind == PrintTokenKind::Parenthesis);

    !no_space_before && !no_space_after
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_visits_leaves_in_order() {
        let tree = PrintToken::container(
            ContainerType::Expression,
            vec![
                PrintToken::leaf(PrintTokenKind::Keyword, "select"),
                PrintToken::leaf(PrintTokenKind::Value, "id"),
            ],
        );
        let mut leaves = Vec::new();
        flatten(&tree, &mut leaves);
        assert_eq!(leaves.iter().map(|t| t.text.as_str()).collect::<Vec<_>>(), vec!["select", "id"]);
    }

    #[test]
    fn no_space_before_comma_or_close_paren() {
        let a = PrintToken::leaf(PrintTokenKind::Value, "id");
        let comma = PrintToken::leaf(PrintTokenKind::Comma, ",");
        let close = PrintToken::leaf(PrintTokenKind::Parenthesis, ")");
        assert!(!needs_space_before(Some(&a), &comma));
        assert!(!needs_space_before(Some(&a), &close));
    }

    #[test]
    fn no_space_after_open_paren_or_dot() {
        let open = PrintToken::leaf(PrintTokenKind::Parenthesis, "(");
        let dot = PrintToken::leaf(PrintTokenKind::Dot, ".");
        let value = PrintToken::leaf(PrintTokenKind::Value, "id");
        assert!(!needs_space_before(Some(&open), &value));
        assert!(!needs_space_before(Some(&dot), &value));
    }
}
