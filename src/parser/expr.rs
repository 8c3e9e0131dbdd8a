// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! Value-expression parsing: a small precedence-climbing core plus one
//! parse function per special form (`CASE`, `CAST`, `EXTRACT`, `POSITION`,
//! `SUBSTRING`, `OVERLAY`, `TRIM`, `ARRAY`, `ROW`, `EXISTS`).

use super::query;
use super::Parser;
use crate::ast::*;
use crate::error::SyntaxError;
use crate::lexer::LexemeKind;
use text_size::TextRange;

fn cover(a: TextRange, b: TextRange) -> TextRange {
    TextRange::new(a.start().min(b.start()), a.end().max(b.end()))
}

/// The crate's single public expression entry point: full boolean
/// expression grammar (`OR`/`AND`/`NOT`/predicates down to primaries).
pub fn parse_expr(p: &mut Parser) -> Result<Expr, SyntaxError> {
    parse_or_expr(p)
}

/// Non-boolean value-expression entry, used only where a trailing `IN`
/// keyword would otherwise be ambiguous with the `IN` predicate (namely
/// `POSITION(substr IN string)`).
fn parse_value_expr(p: &mut Parser) -> Result<Expr, SyntaxError> {
    parse_comparison_expr(p)
}

/// Same restricted level as [`parse_value_expr`], reused by frame-bound
/// parsing in `query.rs` (`ROWS n PRECEDING`) where a bare `AND`/`OR`
/// would otherwise be ambiguous with a `BETWEEN ... AND ...` frame.
pub(super) fn parse_bound_value(p: &mut Parser) -> Result<Expr, SyntaxError> {
    parse_comparison_expr(p)
}

fn parse_or_expr(p: &mut Parser) -> Result<Expr, SyntaxError> {
    let mut left = parse_and_expr(p)?;
    while p.eat_command("or") {
        let right = parse_and_expr(p)?;
        let span = cover(left.span(), right.span());
        left = Expr::BinaryOp {
            left: Box::new(left),
            op: BinaryOperator::Or,
            right: Box::new(right),
            span,
        };
    }
    Ok(left)
}

fn parse_and_expr(p: &mut Parser) -> Result<Expr, SyntaxError> {
    let mut left = parse_predicate(p)?;
    while p.eat_command("and") {
        let right = parse_predicate(p)?;
        let span = cover(left.span(), right.span());
        left = Expr::BinaryOp {
            left: Box::new(left),
            op: BinaryOperator::And,
            right: Box::new(right),
            span,
        };
    }
    Ok(left)
}

fn parse_predicate(p: &mut Parser) -> Result<Expr, SyntaxError> {
    if p.at_command("not") {
        let start = p.start_offset();
        p.bump();
        let inner = parse_predicate(p)?;
        return Ok(Expr::UnaryOp {
            op: UnaryOperator::Not,
            expr: Box::new(inner),
            span: p.span_from(start),
        });
    }

    let mut left = parse_comparison_expr(p)?;

    loop {
        let start = u32::from(left.span().start());

        if p.eat_command("is not distinct from") {
            let right = parse_comparison_expr(p)?;
            left = Expr::IsDistinctFrom {
                left: Box::new(left),
                right: Box::new(right),
                negated: true,
                span: p.span_from(start),
            };
        } else if p.eat_command("is distinct from") {
            let right = parse_comparison_expr(p)?;
            left = Expr::IsDistinctFrom {
                left: Box::new(left),
                right: Box::new(right),
                negated: false,
                span: p.span_from(start),
            };
        } else if p.eat_command("is not") {
            p.expect_command("null")?;
            left = Expr::IsNull {
                expr: Box::new(left),
                negated: true,
                span: p.span_from(start),
            };
        } else if p.eat_command("is") {
            p.expect_command("null")?;
            left = Expr::IsNull {
                expr: Box::new(left),
                negated: false,
                span: p.span_from(start),
            };
        } else if p.eat_command("not between") {
            let low = parse_comparison_expr(p)?;
            p.expect_command("and")?;
            let high = parse_comparison_expr(p)?;
            left = Expr::Between {
                expr: Box::new(left),
                negated: true,
                low: Box::new(low),
                high: Box::new(high),
                span: p.span_from(start),
            };
        } else if p.eat_command("between") {
            let low = parse_comparison_expr(p)?;
            p.expect_command("and")?;
            let high = parse_comparison_expr(p)?;
            left = Expr::Between {
                expr: Box::new(left),
                negated: false,
                low: Box::new(low),
                high: Box::new(high),
                span: p.span_from(start),
            };
        } else if p.at_command("not in") || p.at_command("in") {
            let negated = p.current().text == "not in";
            p.bump();
            left = parse_in_tail(p, left, negated, start)?;
        } else if p.at_command("not like") || p.at_command("like") {
            let negated = p.current().text == "not like";
            p.bump();
            left = parse_like_tail(p, left, negated, false, start)?;
        } else if p.at_command("not ilike") || p.at_command("ilike") {
            let negated = p.current().text == "not ilike";
            p.bump();
            left = parse_like_tail(p, left, negated, true, start)?;
        } else if p.at_command("not similar to") || p.at_command("similar to") {
            let negated = p.current().text == "not similar to";
            p.bump();
            let pattern = parse_comparison_expr(p)?;
            let escape = if p.eat_command("escape") {
                Some(Box::new(parse_comparison_expr(p)?))
            } else {
                None
            };
            left = Expr::SimilarTo {
                expr: Box::new(left),
                pattern: Box::new(pattern),
                escape,
                negated,
                span: p.span_from(start),
            };
        } else {
            break;
        }
    }

    Ok(left)
}

fn parse_in_tail(p: &mut Parser, left: Expr, negated: bool, start: u32) -> Result<Expr, SyntaxError> {
    p.expect_kind(LexemeKind::OpenParen)?;
    if p.at_command("select") || p.at_command("with") || p.at_command("values") {
        let subquery = query::parse_query(p)?;
        p.expect_kind(LexemeKind::CloseParen)?;
        Ok(Expr::InSubquery {
            expr: Box::new(left),
            subquery: Box::new(subquery),
            negated,
            span: p.span_from(start),
        })
    } else {
        let mut list = Vec::new();
        if !p.at_kind(LexemeKind::CloseParen) {
            loop {
                list.push(parse_expr(p)?);
                if !p.eat_kind(LexemeKind::Comma) {
                    break;
                }
            }
        }
        p.expect_kind(LexemeKind::CloseParen)?;
        Ok(Expr::InList {
            expr: Box::new(left),
            list,
            negated,
            span: p.span_from(start),
        })
    }
}

fn parse_like_tail(
    p: &mut Parser,
    left: Expr,
    negated: bool,
    case_insensitive: bool,
    start: u32,
) -> Result<Expr, SyntaxError> {
    let pattern = parse_comparison_expr(p)?;
    let escape = if p.eat_command("escape") {
        Some(Box::new(parse_comparison_expr(p)?))
    } else {
        None
    };
    Ok(Expr::Like {
        expr: Box::new(left),
        pattern: Box::new(pattern),
        escape,
        negated,
        case_insensitive,
        span: p.span_from(start),
    })
}

fn comparison_operator(p: &Parser) -> Option<BinaryOperator> {
    if p.current_kind() != LexemeKind::Operator {
        return None;
    }
    match p.current().text.as_str() {
        "=" => Some(BinaryOperator::Eq),
        "<>" | "!=" => Some(BinaryOperator::NotEq),
        "<" => Some(BinaryOperator::Lt),
        "<=" => Some(BinaryOperator::LtEq),
        ">" => Some(BinaryOperator::Gt),
        ">=" => Some(BinaryOperator::GtEq),
        _ => None,
    }
}

fn parse_comparison_expr(p: &mut Parser) -> Result<Expr, SyntaxError> {
    let left = parse_binary_chain(p, 0)?;
    if let Some(op) = comparison_operator(p) {
        p.bump();
        let right = parse_binary_chain(p, 0)?;
        let span = cover(left.span(), right.span());
        return Ok(Expr::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
            span,
        });
    }
    Ok(left)
}

fn binary_op_info(text: &str) -> Option<(u8, BinaryOperator)> {
    match text {
        "||" => Some((3, BinaryOperator::Concat)),
        "|" => Some((4, BinaryOperator::BitwiseOr)),
        "#" => Some((5, BinaryOperator::BitwiseXor)),
        "&" => Some((6, BinaryOperator::BitwiseAnd)),
        "+" => Some((7, BinaryOperator::Add)),
        "-" => Some((7, BinaryOperator::Subtract)),
        "*" => Some((8, BinaryOperator::Multiply)),
        "/" => Some((8, BinaryOperator::Divide)),
        "%" => Some((8, BinaryOperator::Modulo)),
        "->" => Some((9, BinaryOperator::JsonGet)),
        "->>" => Some((9, BinaryOperator::JsonGetText)),
        "#>" => Some((9, BinaryOperator::JsonPathGet)),
        "#>>" => Some((9, BinaryOperator::JsonPathGetText)),
        _ => None,
    }
}

fn parse_binary_chain(p: &mut Parser, min_prec: u8) -> Result<Expr, SyntaxError> {
    let mut left = parse_unary_expr(p)?;
    loop {
        if p.current_kind() != LexemeKind::Operator {
            break;
        }
        let Some((prec, op)) = binary_op_info(&p.current().text) else {
            break;
        };
        if prec < min_prec {
            break;
        }
        p.bump();
        let right = parse_binary_chain(p, prec + 1)?;
        let span = cover(left.span(), right.span());
        left = Expr::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
            span,
        };
    }
    Ok(left)
}

fn parse_unary_expr(p: &mut Parser) -> Result<Expr, SyntaxError> {
    if p.current_kind() == LexemeKind::Operator && matches!(p.current().text.as_str(), "+" | "-" | "~") {
        let start = p.start_offset();
        let op = match p.current().text.as_str() {
            "+" => UnaryOperator::Plus,
            "-" => UnaryOperator::Minus,
            _ => UnaryOperator::BitwiseNot,
        };
        p.bump();
        let inner = parse_unary_expr(p)?;
        return Ok(Expr::UnaryOp {
            op,
            expr: Box::new(inner),
            span: p.span_from(start),
        });
    }
    parse_postfix_expr(p)
}

fn parse_postfix_expr(p: &mut Parser) -> Result<Expr, SyntaxError> {
    let mut expr = parse_primary_expr(p)?;
    loop {
        let start = u32::from(expr.span().start());
        if p.eat_operator("::") {
            let data_type = parse_data_type(p)?;
            expr = Expr::Cast {
                expr: Box::new(expr),
                data_type,
                span: p.span_from(start),
            };
        } else if p.eat_command("collate") {
            let collation = parse_qualified_name(p)?;
            expr = Expr::Collate {
                expr: Box::new(expr),
                collation,
                span: p.span_from(start),
            };
        } else if p.at_command("at") && {
            let mark = p.mark();
            let matched = p.eat_command("at") && p.eat_word("time") && p.eat_word("zone");
            if !matched {
                p.reset(mark);
            }
            matched
        } {
            let zone = parse_comparison_expr(p)?;
            expr = Expr::AtTimeZone {
                expr: Box::new(expr),
                zone: Box::new(zone),
                span: p.span_from(start),
            };
        } else {
            break;
        }
    }
    Ok(expr)
}

fn parse_primary_expr(p: &mut Parser) -> Result<Expr, SyntaxError> {
    match p.current_kind() {
        LexemeKind::Literal => {
            let tok = p.bump();
            Ok(Expr::Literal(Literal {
                value: literal_value_from_token(&tok.text),
                span: tok.span,
            }))
        }
        LexemeKind::Parameter => {
            let tok = p.bump();
            Ok(Expr::Parameter(Parameter {
                token: parameter_token_from_text(&tok.text),
                span: tok.span,
            }))
        }
        LexemeKind::OpenParen => parse_parenthesized(p),
        LexemeKind::Command => parse_command_primary(p),
        LexemeKind::Identifier | LexemeKind::Function | LexemeKind::Type => parse_name_or_call(p),
        _ => Err(p.error("an expression")),
    }
}

fn literal_value_from_token(text: &str) -> LiteralValue {
    if text.starts_with('E') && text.len() > 1 && text.as_bytes()[1] == b'\'' {
        LiteralValue::EscapeString(text.to_owned())
    } else if text.starts_with("U&'") {
        LiteralValue::UnicodeString(text.to_owned())
    } else if text.starts_with('\'') {
        LiteralValue::String(text.to_owned())
    } else if text.starts_with('$') {
        LiteralValue::DollarQuoted(text.to_owned())
    } else {
        LiteralValue::Number(text.to_owned())
    }
}

fn parameter_token_from_text(text: &str) -> ParameterToken {
    if text == "?" {
        ParameterToken::Anonymous
    } else if let Some(rest) = text.strip_prefix('$') {
        match rest.parse::<u32>() {
            Ok(n) => ParameterToken::Positional(n),
            Err(_) => ParameterToken::Named(text.to_owned()),
        }
    } else {
        ParameterToken::Named(text.to_owned())
    }
}

fn parse_command_primary(p: &mut Parser) -> Result<Expr, SyntaxError> {
    let start = p.start_offset();
    if p.eat_command("true") {
        return Ok(Expr::Literal(Literal {
            value: LiteralValue::Boolean(true),
            span: p.span_from(start),
        }));
    }
    if p.eat_command("false") {
        return Ok(Expr::Literal(Literal {
            value: LiteralValue::Boolean(false),
            span: p.span_from(start),
        }));
    }
    if p.eat_command("null") {
        return Ok(Expr::Literal(Literal {
            value: LiteralValue::Null,
            span: p.span_from(start),
        }));
    }
    if p.at_command("case") {
        return parse_case_expr(p);
    }
    if p.at_command("cast") {
        return parse_cast_expr(p);
    }
    if p.at_command("extract") {
        return parse_extract_expr(p);
    }
    if p.at_command("position") {
        return parse_position_expr(p);
    }
    if p.at_command("substring") {
        return parse_substring_expr(p);
    }
    if p.at_command("overlay") {
        return parse_overlay_expr(p);
    }
    if p.at_command("trim") {
        return parse_trim_expr(p);
    }
    if p.at_command("array") {
        return parse_array_expr(p);
    }
    if p.at_command("row") {
        return parse_row_expr(p);
    }
    if p.at_command("exists") {
        return parse_exists_expr(p);
    }
    parse_name_or_call(p)
}

fn parse_exists_expr(p: &mut Parser) -> Result<Expr, SyntaxError> {
    let start = p.start_offset();
    p.expect_command("exists")?;
    p.expect_kind(LexemeKind::OpenParen)?;
    let subquery = query::parse_query(p)?;
    p.expect_kind(LexemeKind::CloseParen)?;
    Ok(Expr::Exists {
        subquery: Box::new(subquery),
        negated: false,
        span: p.span_from(start),
    })
}

fn parse_case_expr(p: &mut Parser) -> Result<Expr, SyntaxError> {
    let start = p.start_offset();
    p.expect_command("case")?;
    let operand = if p.at_command("when") {
        None
    } else {
        Some(Box::new(parse_expr(p)?))
    };
    let mut branches = Vec::new();
    while p.eat_command("when") {
        let when = parse_expr(p)?;
        p.expect_command("then")?;
        let then = parse_expr(p)?;
        branches.push((when, then));
    }
    let else_result = if p.eat_command("else") {
        Some(Box::new(parse_expr(p)?))
    } else {
        None
    };
    p.expect_command("end")?;
    Ok(Expr::Case(CaseExpr {
        operand,
        branches,
        else_result,
        span: p.span_from(start),
    }))
}

fn parse_cast_expr(p: &mut Parser) -> Result<Expr, SyntaxError> {
    let start = p.start_offset();
    p.expect_command("cast")?;
    p.expect_kind(LexemeKind::OpenParen)?;
    let inner = parse_expr(p)?;
    p.expect_command("as")?;
    let data_type = parse_data_type(p)?;
    p.expect_kind(LexemeKind::CloseParen)?;
    Ok(Expr::Cast {
        expr: Box::new(inner),
        data_type,
        span: p.span_from(start),
    })
}

fn parse_extract_expr(p: &mut Parser) -> Result<Expr, SyntaxError> {
    let start = p.start_offset();
    p.expect_command("extract")?;
    p.expect_kind(LexemeKind::OpenParen)?;
    let field_tok = match p.current_kind() {
        LexemeKind::Identifier | LexemeKind::Command | LexemeKind::Type => p.bump(),
        _ => return Err(p.error("a datetime field name")),
    };
    p.expect_command("from")?;
    let inner = parse_expr(p)?;
    p.expect_kind(LexemeKind::CloseParen)?;
    Ok(Expr::Extract {
        field: field_tok.text.to_lowercase(),
        expr: Box::new(inner),
        span: p.span_from(start),
    })
}

fn parse_position_expr(p: &mut Parser) -> Result<Expr, SyntaxError> {
    let start = p.start_offset();
    p.expect_command("position")?;
    p.expect_kind(LexemeKind::OpenParen)?;
    let substring = parse_value_expr(p)?;
    p.expect_command("in")?;
    let string = parse_value_expr(p)?;
    p.expect_kind(LexemeKind::CloseParen)?;
    Ok(Expr::Position {
        substring: Box::new(substring),
        string: Box::new(string),
        span: p.span_from(start),
    })
}

fn parse_substring_expr(p: &mut Parser) -> Result<Expr, SyntaxError> {
    let start = p.start_offset();
    p.expect_command("substring")?;
    p.expect_kind(LexemeKind::OpenParen)?;
    let inner = parse_expr(p)?;
    let mut from = None;
    let mut for_len = None;
    if p.eat_command("from") {
        from = Some(Box::new(parse_expr(p)?));
    } else if p.eat_kind(LexemeKind::Comma) {
        from = Some(Box::new(parse_expr(p)?));
        if p.eat_kind(LexemeKind::Comma) {
            for_len = Some(Box::new(parse_expr(p)?));
        }
    }
    if for_len.is_none() && p.eat_command("for") {
        for_len = Some(Box::new(parse_expr(p)?));
    }
    p.expect_kind(LexemeKind::CloseParen)?;
    Ok(Expr::Substring {
        expr: Box::new(inner),
        from,
        for_len,
        span: p.span_from(start),
    })
}

fn parse_overlay_expr(p: &mut Parser) -> Result<Expr, SyntaxError> {
    let start = p.start_offset();
    p.expect_command("overlay")?;
    p.expect_kind(LexemeKind::OpenParen)?;
    let inner = parse_expr(p)?;
    p.expect_command("placing")?;
    let placing = parse_expr(p)?;
    p.expect_command("from")?;
    let from = parse_expr(p)?;
    let for_len = if p.eat_command("for") {
        Some(Box::new(parse_expr(p)?))
    } else {
        None
    };
    p.expect_kind(LexemeKind::CloseParen)?;
    Ok(Expr::Overlay {
        expr: Box::new(inner),
        placing: Box::new(placing),
        from: Box::new(from),
        for_len,
        span: p.span_from(start),
    })
}

fn parse_trim_expr(p: &mut Parser) -> Result<Expr, SyntaxError> {
    let start = p.start_offset();
    p.expect_command("trim")?;
    p.expect_kind(LexemeKind::OpenParen)?;
    let spec = if p.eat_command("leading") {
        TrimSpec::Leading
    } else if p.eat_command("trailing") {
        TrimSpec::Trailing
    } else {
        p.eat_command("both");
        TrimSpec::Both
    };
    let mut removal = None;
    let expr_arg = if p.at_command("from") {
        p.bump();
        parse_expr(p)?
    } else {
        let first = parse_expr(p)?;
        if p.eat_command("from") {
            removal = Some(Box::new(first));
            parse_expr(p)?
        } else {
            first
        }
    };
    p.expect_kind(LexemeKind::CloseParen)?;
    Ok(Expr::Trim {
        spec,
        removal,
        expr: Box::new(expr_arg),
        span: p.span_from(start),
    })
}

fn parse_array_expr(p: &mut Parser) -> Result<Expr, SyntaxError> {
    let start = p.start_offset();
    p.expect_command("array")?;
    p.expect_kind(LexemeKind::OpenParen)?;
    let mut elements = Vec::new();
    if !p.at_kind(LexemeKind::CloseParen) {
        loop {
            elements.push(parse_expr(p)?);
            if !p.eat_kind(LexemeKind::Comma) {
                break;
            }
        }
    }
    p.expect_kind(LexemeKind::CloseParen)?;
    Ok(Expr::Array {
        elements,
        span: p.span_from(start),
    })
}

fn parse_row_expr(p: &mut Parser) -> Result<Expr, SyntaxError> {
    let start = p.start_offset();
    p.expect_command("row")?;
    p.expect_kind(LexemeKind::OpenParen)?;
    let mut elements = Vec::new();
    if !p.at_kind(LexemeKind::CloseParen) {
        loop {
            elements.push(parse_expr(p)?);
            if !p.eat_kind(LexemeKind::Comma) {
                break;
            }
        }
    }
    p.expect_kind(LexemeKind::CloseParen)?;
    Ok(Expr::Row {
        elements,
        span: p.span_from(start),
    })
}

fn parse_parenthesized(p: &mut Parser) -> Result<Expr, SyntaxError> {
    let start = p.start_offset();
    p.expect_kind(LexemeKind::OpenParen)?;
    if p.at_command("select") || p.at_command("with") || p.at_command("values") {
        let subquery = query::parse_query(p)?;
        p.expect_kind(LexemeKind::CloseParen)?;
        return Ok(Expr::Subquery(Box::new(subquery)));
    }
    let first = parse_expr(p)?;
    if p.eat_kind(LexemeKind::Comma) {
        let mut elements = vec![first];
        loop {
            elements.push(parse_expr(p)?);
            if !p.eat_kind(LexemeKind::Comma) {
                break;
            }
        }
        p.expect_kind(LexemeKind::CloseParen)?;
        return Ok(Expr::Row {
            elements,
            span: p.span_from(start),
        });
    }
    p.expect_kind(LexemeKind::CloseParen)?;
    Ok(Expr::Nested(Box::new(first), p.span_from(start)))
}

pub(super) fn parse_name_or_call(p: &mut Parser) -> Result<Expr, SyntaxError> {
    let name = parse_qualified_name(p)?;
    if p.at_kind(LexemeKind::OpenParen) {
        Ok(Expr::Function(parse_function_call(p, name)?))
    } else if name.parts.len() == 1 {
        Ok(Expr::Identifier(name.parts.into_iter().next().unwrap()))
    } else {
        Ok(Expr::CompoundIdentifier(name))
    }
}

pub(super) fn parse_qualified_name(p: &mut Parser) -> Result<QualifiedName, SyntaxError> {
    let start = p.start_offset();
    let mut parts = vec![parse_ident_node(p)?];
    while p.eat_kind(LexemeKind::Dot) {
        parts.push(parse_ident_node(p)?);
    }
    Ok(QualifiedName {
        parts,
        span: p.span_from(start),
    })
}

pub(super) fn parse_ident_node(p: &mut Parser) -> Result<IdentNode, SyntaxError> {
    let tok = match p.current_kind() {
        LexemeKind::Identifier | LexemeKind::Type | LexemeKind::Command | LexemeKind::Function => p.bump(),
        _ => return Err(p.error("an identifier")),
    };
    let quoted = tok.text.starts_with('"') || tok.text.starts_with('`') || tok.text.starts_with('[');
    Ok(IdentNode::new(strip_ident_delimiters(&tok.text), quoted, tok.span))
}

fn strip_ident_delimiters(text: &str) -> String {
    if text.starts_with('"') && text.ends_with('"') && text.len() >= 2 {
        text[1..text.len() - 1].replace("\"\"", "\"")
    } else if text.starts_with('`') && text.ends_with('`') && text.len() >= 2 {
        text[1..text.len() - 1].replace("``", "`")
    } else if text.starts_with('[') && text.ends_with(']') && text.len() >= 2 {
        text[1..text.len() - 1].replace("]]", "]")
    } else {
        text.to_owned()
    }
}

pub(super) fn parse_function_call(p: &mut Parser, name: QualifiedName) -> Result<FunctionCall, SyntaxError> {
    let start = u32::from(name.span.start());
    p.expect_kind(LexemeKind::OpenParen)?;
    let distinct = p.eat_command("distinct");
    let mut args = Vec::new();
    if p.at_operator("*") {
        p.bump();
        args.push(FunctionArg::Star);
    } else if !p.at_kind(LexemeKind::CloseParen) {
        loop {
            args.push(FunctionArg::Unnamed(parse_expr(p)?));
            if !p.eat_kind(LexemeKind::Comma) {
                break;
            }
        }
    }
    let order_by = if p.eat_command("order by") {
        query::parse_order_by_items(p)?
    } else {
        Vec::new()
    };
    p.expect_kind(LexemeKind::CloseParen)?;
    let filter = if p.eat_command("filter") {
        p.expect_kind(LexemeKind::OpenParen)?;
        p.expect_command("where")?;
        let f = parse_expr(p)?;
        p.expect_kind(LexemeKind::CloseParen)?;
        Some(Box::new(f))
    } else {
        None
    };
    let over = if p.eat_command("over") {
        Some(query::parse_window_spec(p)?)
    } else {
        None
    };
    Ok(FunctionCall {
        name,
        args,
        distinct,
        order_by,
        filter,
        over,
        span: p.span_from(start),
    })
}

pub(super) fn parse_data_type(p: &mut Parser) -> Result<DataType, SyntaxError> {
    let start = p.start_offset();
    let name_tok = match p.current_kind() {
        LexemeKind::Type | LexemeKind::Identifier | LexemeKind::Command | LexemeKind::Function => p.bump(),
        _ => return Err(p.error("a type name")),
    };
    let mut name = name_tok.text.to_lowercase();
    if name == "double" && p.eat_word("precision") {
        name = "double precision".to_owned();
    }
    if matches!(name.as_str(), "character" | "char" | "bit") && p.eat_word("varying") {
        name.push_str(" varying");
    }
    let mut args = Vec::new();
    if p.eat_kind(LexemeKind::OpenParen) {
        loop {
            let arg_tok = p.expect_kind(LexemeKind::Literal)?;
            args.push(arg_tok.text);
            if !p.eat_kind(LexemeKind::Comma) {
                break;
            }
        }
        p.expect_kind(LexemeKind::CloseParen)?;
    }
    let array = p.eat_command("array");
    Ok(DataType {
        name,
        args,
        array,
        span: p.span_from(start),
    })
}
