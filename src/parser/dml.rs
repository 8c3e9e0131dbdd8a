// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! `INSERT`/`UPDATE`/`DELETE`/`MERGE` grammar (spec.md §4.2).

use super::expr::{parse_expr, parse_ident_node, parse_qualified_name};
use super::query::{parse_query, parse_table_with_joins_list, parse_values_clause, parse_with_clause};
use super::Parser;
use crate::ast::*;
use crate::error::SyntaxError;
use crate::lexer::LexemeKind;

fn parse_with(p: &mut Parser) -> Result<Option<WithClause>, SyntaxError> {
    if p.at_command("with") {
        Some(parse_with_clause(p)).transpose()
    } else {
        Ok(None)
    }
}

fn parse_returning(p: &mut Parser) -> Result<Vec<SelectItem>, SyntaxError> {
    if !p.eat_command("returning") {
        return Ok(Vec::new());
    }
    let mut items = Vec::new();
    loop {
        items.push(parse_returning_item(p)?);
        if !p.eat_kind(LexemeKind::Comma) {
            break;
        }
    }
    Ok(items)
}

fn parse_returning_item(p: &mut Parser) -> Result<SelectItem, SyntaxError> {
    if p.at_operator("*") {
        let tok = p.bump();
        return Ok(SelectItem::Wildcard(tok.span));
    }
    let item_expr = parse_expr(p)?;
    if p.eat_command("as") {
        Ok(SelectItem::ExprWithAlias {
            expr: item_expr,
            alias: parse_ident_node(p)?,
        })
    } else if matches!(p.current_kind(), LexemeKind::Identifier) {
        Ok(SelectItem::ExprWithAlias {
            expr: item_expr,
            alias: parse_ident_node(p)?,
        })
    } else {
        Ok(SelectItem::UnnamedExpr(item_expr))
    }
}

fn parse_assignment_list(p: &mut Parser) -> Result<Vec<Assignment>, SyntaxError> {
    let mut assignments = Vec::new();
    loop {
        let target = parse_ident_node(p)?;
        p.expect_operator("=")?;
        let value = parse_expr(p)?;
        assignments.push(Assignment { target, value });
        if !p.eat_kind(LexemeKind::Comma) {
            break;
        }
    }
    Ok(assignments)
}

pub fn parse_insert(p: &mut Parser) -> Result<InsertStatement, SyntaxError> {
    let start = p.start_offset();
    let with = parse_with(p)?;
    p.expect_command("insert")?;
    p.expect_command("into")?;
    let table = parse_qualified_name(p)?;
    let columns = if p.eat_kind(LexemeKind::OpenParen) {
        let mut cols = Vec::new();
        loop {
            cols.push(parse_ident_node(p)?);
            if !p.eat_kind(LexemeKind::Comma) {
                break;
            }
        }
        p.expect_kind(LexemeKind::CloseParen)?;
        cols
    } else {
        Vec::new()
    };
    let source = if p.at_command("default") {
        p.bump();
        p.expect_command("values")?;
        InsertSource::DefaultValues
    } else if p.at_command("values") {
        InsertSource::Values(parse_values_clause(p)?)
    } else {
        InsertSource::Query(Box::new(parse_query(p)?))
    };
    let on_conflict = if p.eat_command("on") {
        p.expect_command("conflict")?;
        Some(parse_on_conflict(p)?)
    } else {
        None
    };
    let returning = parse_returning(p)?;
    Ok(InsertStatement {
        with,
        table,
        columns,
        source,
        on_conflict,
        returning,
        span: p.span_from(start),
    })
}

fn parse_on_conflict(p: &mut Parser) -> Result<OnConflict, SyntaxError> {
    let target = if p.at_command("on") {
        p.bump();
        p.expect_command("constraint")?;
        Some(ConflictTarget::OnConstraint(parse_ident_node(p)?))
    } else if p.eat_kind(LexemeKind::OpenParen) {
        let mut cols = Vec::new();
        loop {
            cols.push(parse_ident_node(p)?);
            if !p.eat_kind(LexemeKind::Comma) {
                break;
            }
        }
        p.expect_kind(LexemeKind::CloseParen)?;
        Some(ConflictTarget::Columns(cols))
    } else {
        None
    };
    let action = if p.eat_command("do nothing") {
        ConflictAction::DoNothing
    } else if p.eat_command("do update") {
        p.expect_command("set")?;
        let assignments = parse_assignment_list(p)?;
        let selection = if p.eat_command("where") { Some(parse_expr(p)?) } else { None };
        ConflictAction::DoUpdate { assignments, selection }
    } else {
        return Err(p.error("`DO NOTHING` or `DO UPDATE SET`"));
    };
    Ok(OnConflict { target, action })
}

pub fn parse_update(p: &mut Parser) -> Result<UpdateStatement, SyntaxError> {
    let start = p.start_offset();
    let with = parse_with(p)?;
    p.expect_command("update")?;
    let table = parse_qualified_name(p)?;
    let alias = if matches!(p.current_kind(), LexemeKind::Identifier) {
        Some(parse_ident_node(p)?)
    } else if p.eat_command("as") {
        Some(parse_ident_node(p)?)
    } else {
        None
    };
    p.expect_command("set")?;
    let assignments = parse_assignment_list(p)?;
    let from = if p.eat_command("from") {
        parse_table_with_joins_list(p)?
    } else {
        Vec::new()
    };
    let selection = if p.eat_command("where") { Some(parse_expr(p)?) } else { None };
    let returning = parse_returning(p)?;
    Ok(UpdateStatement {
        with,
        table,
        alias,
        assignments,
        from,
        selection,
        returning,
        span: p.span_from(start),
    })
}

pub fn parse_delete(p: &mut Parser) -> Result<DeleteStatement, SyntaxError> {
    let start = p.start_offset();
    let with = parse_with(p)?;
    p.expect_command("delete")?;
    p.expect_command("from")?;
    let table = parse_qualified_name(p)?;
    let alias = if matches!(p.current_kind(), LexemeKind::Identifier) {
        Some(parse_ident_node(p)?)
    } else if p.eat_command("as") {
        Some(parse_ident_node(p)?)
    } else {
        None
    };
    let using = if p.eat_command("using") {
        parse_table_with_joins_list(p)?
    } else {
        Vec::new()
    };
    let selection = if p.eat_command("where") { Some(parse_expr(p)?) } else { None };
    let returning = parse_returning(p)?;
    Ok(DeleteStatement {
        with,
        table,
        alias,
        using,
        selection,
        returning,
        span: p.span_from(start),
    })
}

pub fn parse_merge(p: &mut Parser) -> Result<MergeStatement, SyntaxError> {
    let start = p.start_offset();
    let with = parse_with(p)?;
    p.expect_command("merge")?;
    p.expect_command("into")?;
    let target = parse_qualified_name(p)?;
    let target_alias = parse_merge_alias(p)?;
    p.expect_command("using")?;
    let source = if p.at_kind(LexemeKind::OpenParen) {
        p.bump();
        let q = parse_query(p)?;
        p.expect_kind(LexemeKind::CloseParen)?;
        MergeSource::Query(Box::new(q))
    } else {
        MergeSource::Table(parse_qualified_name(p)?)
    };
    let source_alias = parse_merge_alias(p)?;
    p.expect_command("on")?;
    let on = parse_expr(p)?;
    let mut clauses = Vec::new();
    while p.eat_command("when") {
        let matched = if p.eat_command("matched") {
            true
        } else if p.at_command("not") {
            p.bump();
            p.expect_command("matched")?;
            false
        } else {
            return Err(p.error("`MATCHED` or `NOT MATCHED`"));
        };
        let condition = if p.eat_command("and") { Some(parse_expr(p)?) } else { None };
        p.expect_command("then")?;
        let action = parse_merge_action(p)?;
        clauses.push(MergeClause {
            matched,
            condition,
            action,
        });
    }
    Ok(MergeStatement {
        with,
        target,
        target_alias,
        source,
        source_alias,
        on,
        clauses,
        span: p.span_from(start),
    })
}

fn parse_merge_alias(p: &mut Parser) -> Result<Option<IdentNode>, SyntaxError> {
    if p.eat_command("as") {
        Ok(Some(parse_ident_node(p)?))
    } else if matches!(p.current_kind(), LexemeKind::Identifier) {
        Ok(Some(parse_ident_node(p)?))
    } else {
        Ok(None)
    }
}

fn parse_merge_action(p: &mut Parser) -> Result<MergeAction, SyntaxError> {
    if p.eat_command("update") {
        p.expect_command("set")?;
        Ok(MergeAction::Update(parse_assignment_list(p)?))
    } else if p.eat_command("delete") {
        Ok(MergeAction::Delete)
    } else if p.eat_command("insert") {
        let columns = if p.eat_kind(LexemeKind::OpenParen) {
            let mut cols = Vec::new();
            loop {
                cols.push(parse_ident_node(p)?);
                if !p.eat_kind(LexemeKind::Comma) {
                    break;
                }
            }
            p.expect_kind(LexemeKind::CloseParen)?;
            cols
        } else {
            Vec::new()
        };
        p.expect_command("values")?;
        p.expect_kind(LexemeKind::OpenParen)?;
        let mut values = Vec::new();
        if !p.at_kind(LexemeKind::CloseParen) {
            loop {
                values.push(parse_expr(p)?);
                if !p.eat_kind(LexemeKind::Comma) {
                    break;
                }
            }
        }
        p.expect_kind(LexemeKind::CloseParen)?;
        Ok(MergeAction::Insert { columns, values })
    } else if p.eat_command("do nothing") {
        Ok(MergeAction::DoNothing)
    } else {
        Err(p.error("an `UPDATE`/`DELETE`/`INSERT`/`DO NOTHING` merge action"))
    }
}
