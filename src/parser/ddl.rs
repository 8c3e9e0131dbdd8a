// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! `CREATE TABLE [AS SELECT]` grammar (spec.md §4.2).

use super::expr::{parse_data_type, parse_expr, parse_ident_node, parse_qualified_name};
use super::query::parse_query;
use super::Parser;
use crate::ast::*;
use crate::error::SyntaxError;
use crate::lexer::LexemeKind;

pub fn parse_create(p: &mut Parser) -> Result<Statement, SyntaxError> {
    let start = p.start_offset();
    p.expect_command("create")?;
    let temporary = p.eat_command("temporary") || p.eat_command("temp") || p.eat_command("global") || p.eat_command("local");
    p.expect_command("table")?;
    let if_not_exists = p.eat_command("if not exists");
    let name = parse_qualified_name(p)?;

    if p.eat_kind(LexemeKind::OpenParen) {
        let (columns, constraints) = parse_table_element_list(p)?;
        return Ok(Statement::CreateTable(CreateTableStatement {
            name,
            temporary,
            if_not_exists,
            columns,
            constraints,
            span: p.span_from(start),
        }));
    }

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
    p.expect_command("as")?;
    let query = parse_query(p)?;
    Ok(Statement::CreateTableAs(CreateTableAsStatement {
        name,
        columns,
        temporary,
        if_not_exists,
        query: Box::new(query),
        span: p.span_from(start),
    }))
}

fn parse_table_element_list(p: &mut Parser) -> Result<(Vec<ColumnDef>, Vec<TableConstraint>), SyntaxError> {
    let mut columns = Vec::new();
    let mut constraints = Vec::new();
    loop {
        if p.at_kind(LexemeKind::CloseParen) {
            break;
        }
        if is_table_constraint_start(p) {
            constraints.push(parse_table_constraint(p)?);
        } else {
            columns.push(parse_column_def(p)?);
        }
        if !p.eat_kind(LexemeKind::Comma) {
            break;
        }
    }
    p.expect_kind(LexemeKind::CloseParen)?;
    Ok((columns, constraints))
}

fn is_table_constraint_start(p: &Parser) -> bool {
    p.at_command("constraint")
        || p.at_word("primary")
        || p.at_command("unique")
        || p.at_command("check")
        || p.at_word("foreign")
}

fn parse_table_constraint(p: &mut Parser) -> Result<TableConstraint, SyntaxError> {
    if p.eat_command("constraint") {
        parse_ident_node(p)?;
    }
    if p.eat_command("primary key") || (p.eat_command("primary") && p.eat_command("key")) {
        Ok(TableConstraint::PrimaryKey(parse_ident_list_in_parens(p)?))
    } else if p.eat_command("unique") {
        Ok(TableConstraint::Unique(parse_ident_list_in_parens(p)?))
    } else if p.eat_command("check") {
        p.expect_kind(LexemeKind::OpenParen)?;
        let expr = parse_expr(p)?;
        p.expect_kind(LexemeKind::CloseParen)?;
        Ok(TableConstraint::Check(expr))
    } else if p.eat_command("foreign key") || (p.eat_command("foreign") && p.eat_command("key")) {
        let columns = parse_ident_list_in_parens(p)?;
        p.expect_command("references")?;
        let ref_table = parse_qualified_name(p)?;
        let ref_columns = if p.at_kind(LexemeKind::OpenParen) {
            parse_ident_list_in_parens(p)?
        } else {
            Vec::new()
        };
        Ok(TableConstraint::ForeignKey {
            columns,
            ref_table,
            ref_columns,
        })
    } else {
        Err(p.error("a table constraint"))
    }
}

fn parse_ident_list_in_parens(p: &mut Parser) -> Result<Vec<IdentNode>, SyntaxError> {
    p.expect_kind(LexemeKind::OpenParen)?;
    let mut idents = Vec::new();
    loop {
        idents.push(parse_ident_node(p)?);
        if !p.eat_kind(LexemeKind::Comma) {
            break;
        }
    }
    p.expect_kind(LexemeKind::CloseParen)?;
    Ok(idents)
}

fn parse_column_def(p: &mut Parser) -> Result<ColumnDef, SyntaxError> {
    let name = parse_ident_node(p)?;
    let data_type = parse_data_type(p)?;
    let mut constraints = Vec::new();
    loop {
        if p.eat_command("not null") || (p.eat_command("not") && p.eat_command("null")) {
            constraints.push(ColumnConstraint::NotNull);
        } else if p.eat_command("null") {
            constraints.push(ColumnConstraint::Null);
        } else if p.eat_command("primary key") || (p.eat_command("primary") && p.eat_command("key")) {
            constraints.push(ColumnConstraint::PrimaryKey);
        } else if p.eat_command("unique") {
            constraints.push(ColumnConstraint::Unique);
        } else if p.eat_command("default") {
            constraints.push(ColumnConstraint::Default(parse_expr(p)?));
        } else if p.eat_command("check") {
            p.expect_kind(LexemeKind::OpenParen)?;
            let expr = parse_expr(p)?;
            p.expect_kind(LexemeKind::CloseParen)?;
            constraints.push(ColumnConstraint::Check(expr));
        } else if p.eat_command("references") {
            let table = parse_qualified_name(p)?;
            let column = if p.at_kind(LexemeKind::OpenParen) {
                p.bump();
                let c = parse_ident_node(p)?;
                p.expect_kind(LexemeKind::CloseParen)?;
                Some(c)
            } else {
                None
            };
            constraints.push(ColumnConstraint::References { table, column });
        } else {
            break;
        }
    }
    Ok(ColumnDef {
        name,
        data_type,
        constraints,
    })
}
