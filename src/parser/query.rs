// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! `SELECT`/`VALUES`/set-operation query grammar: `FROM`, `JOIN`, `WHERE`,
//! `GROUP BY`, `HAVING`, `WINDOW`, `ORDER BY`, `LIMIT`/`OFFSET`/`FETCH`,
//! locking clauses, and `WITH` (spec.md §4.2, §4.4).

use super::expr::{self, parse_expr, parse_ident_node, parse_qualified_name};
use super::Parser;
use crate::ast::*;
use crate::error::SyntaxError;
use crate::lexer::LexemeKind;

pub fn parse_query(p: &mut Parser) -> Result<Query, SyntaxError> {
    let start = p.start_offset();
    let comments = p.leading_comments();
    let with = if p.at_command("with") {
        Some(parse_with_clause(p)?)
    } else {
        None
    };
    let body = parse_set_expr(p, 0)?;
    let order_by = if p.eat_command("order by") {
        parse_order_by_items(p)?
    } else {
        Vec::new()
    };
    let (limit, offset) = parse_limit_offset(p)?;
    let fetch = if p.at_command("fetch") {
        Some(parse_fetch_clause(p)?)
    } else {
        None
    };
    let locking = parse_locking_clauses(p)?;
    Ok(Query {
        with,
        body,
        order_by,
        limit,
        offset,
        fetch,
        locking,
        comments,
        span: p.span_from(start),
    })
}

/// `UNION ALL`/`INTERSECT ALL`/`EXCEPT ALL` are pre-merged by the lexer
/// into one phrase lexeme, so both the bare and `ALL`-suffixed forms are
/// checked here rather than via a separate `eat_command("all")` step.
fn set_operator(p: &Parser) -> Option<(SetOperator, bool)> {
    if p.at_command("union all") {
        Some((SetOperator::Union, true))
    } else if p.at_command("union") {
        Some((SetOperator::Union, false))
    } else if p.at_command("intersect all") {
        Some((SetOperator::Intersect, true))
    } else if p.at_command("intersect") {
        Some((SetOperator::Intersect, false))
    } else if p.at_command("except all") {
        Some((SetOperator::Except, true))
    } else if p.at_command("except") {
        Some((SetOperator::Except, false))
    } else {
        None
    }
}

fn parse_set_expr(p: &mut Parser, min_prec: u8) -> Result<SetExpr, SyntaxError> {
    let mut left = parse_set_operand(p)?;
    loop {
        let Some((op, all)) = set_operator(p) else { break };
        let prec = if op == SetOperator::Union || op == SetOperator::Except { 1 } else { 2 };
        if prec < min_prec {
            break;
        }
        p.bump();
        let all = all || p.eat_command("all");
        p.eat_command("distinct");
        let start = u32::from(set_expr_span(&left).start());
        let right = parse_set_expr(p, prec + 1)?;
        let span = p.span_from(start);
        left = SetExpr::SetOperation {
            left: Box::new(left),
            op,
            all,
            right: Box::new(right),
            span,
        };
    }
    Ok(left)
}

fn set_expr_span(expr: &SetExpr) -> text_size::TextRange {
    match expr {
        SetExpr::Select(s) => s.span,
        SetExpr::SetOperation { span, .. } => *span,
        SetExpr::Values(v) => v.span,
        SetExpr::Nested(q) => q.span,
    }
}

fn parse_set_operand(p: &mut Parser) -> Result<SetExpr, SyntaxError> {
    if p.at_command("values") {
        Ok(SetExpr::Values(parse_values_clause(p)?))
    } else if p.at_kind(LexemeKind::OpenParen) {
        p.bump();
        let inner = parse_query(p)?;
        p.expect_kind(LexemeKind::CloseParen)?;
        Ok(SetExpr::Nested(Box::new(inner)))
    } else {
        Ok(SetExpr::Select(Box::new(parse_select_statement(p)?)))
    }
}

pub(super) fn parse_values_clause(p: &mut Parser) -> Result<ValuesClause, SyntaxError> {
    let start = p.start_offset();
    p.expect_command("values")?;
    let mut rows = Vec::new();
    loop {
        p.expect_kind(LexemeKind::OpenParen)?;
        let mut row = Vec::new();
        if !p.at_kind(LexemeKind::CloseParen) {
            loop {
                row.push(parse_expr(p)?);
                if !p.eat_kind(LexemeKind::Comma) {
                    break;
                }
            }
        }
        p.expect_kind(LexemeKind::CloseParen)?;
        rows.push(row);
        if !p.eat_kind(LexemeKind::Comma) {
            break;
        }
    }
    Ok(ValuesClause {
        rows,
        span: p.span_from(start),
    })
}

fn parse_select_statement(p: &mut Parser) -> Result<SelectStatement, SyntaxError> {
    let start = p.start_offset();
    let comments = p.leading_comments();
    p.expect_command("select")?;
    let distinct = parse_distinct(p)?;
    let mut projection = Vec::new();
    loop {
        projection.push(parse_select_item(p)?);
        if !p.eat_kind(LexemeKind::Comma) {
            break;
        }
    }
    let from = if p.eat_command("from") {
        parse_table_with_joins_list(p)?
    } else {
        Vec::new()
    };
    let selection = if p.eat_command("where") { Some(parse_expr(p)?) } else { None };
    let group_by = if p.eat_command("group by") {
        Some(parse_group_by_clause(p)?)
    } else {
        None
    };
    let having = if p.eat_command("having") { Some(parse_expr(p)?) } else { None };
    let windows = if p.eat_command("window") {
        parse_named_windows(p)?
    } else {
        Vec::new()
    };
    Ok(SelectStatement {
        distinct,
        projection,
        from,
        selection,
        group_by,
        having,
        windows,
        comments,
        span: p.span_from(start),
    })
}

fn parse_distinct(p: &mut Parser) -> Result<Distinct, SyntaxError> {
    // `DISTINCT ON` is pre-merged by the lexer into one phrase lexeme.
    if p.eat_command("distinct on") {
        p.expect_kind(LexemeKind::OpenParen)?;
        let mut exprs = Vec::new();
        loop {
            exprs.push(parse_expr(p)?);
            if !p.eat_kind(LexemeKind::Comma) {
                break;
            }
        }
        p.expect_kind(LexemeKind::CloseParen)?;
        Ok(Distinct::DistinctOn(exprs))
    } else if p.eat_command("distinct") {
        Ok(Distinct::Distinct)
    } else if p.eat_command("all") {
        Ok(Distinct::All)
    } else {
        Ok(Distinct::None)
    }
}

fn parse_select_item(p: &mut Parser) -> Result<SelectItem, SyntaxError> {
    if p.at_operator("*") {
        let tok = p.bump();
        return Ok(SelectItem::Wildcard(tok.span));
    }
    // `t.*` needs one token of backtracking lookahead against a plain
    // qualified identifier, since both start the same way.
    if matches!(p.current_kind(), LexemeKind::Identifier | LexemeKind::Type | LexemeKind::Command) {
        let mark = p.mark();
        if let Ok(name) = parse_qualified_name(p) {
            if p.at_operator("*") {
                p.bump();
                return Ok(SelectItem::QualifiedWildcard(name));
            }
        }
        p.reset(mark);
    }
    let item_expr = parse_expr(p)?;
    if p.eat_command("as") {
        let alias = parse_ident_node(p)?;
        Ok(SelectItem::ExprWithAlias { expr: item_expr, alias })
    } else if matches!(p.current_kind(), LexemeKind::Identifier) {
        let alias = parse_ident_node(p)?;
        Ok(SelectItem::ExprWithAlias { expr: item_expr, alias })
    } else {
        Ok(SelectItem::UnnamedExpr(item_expr))
    }
}

pub(super) fn parse_table_with_joins_list(p: &mut Parser) -> Result<Vec<TableWithJoins>, SyntaxError> {
    let mut out = Vec::new();
    loop {
        out.push(parse_table_with_joins(p)?);
        if !p.eat_kind(LexemeKind::Comma) {
            break;
        }
    }
    Ok(out)
}

fn parse_table_with_joins(p: &mut Parser) -> Result<TableWithJoins, SyntaxError> {
    let relation = parse_table_factor(p)?;
    let mut joins = Vec::new();
    loop {
        let join_start = p.start_offset();
        if p.eat_command("cross join") {
            let join_relation = parse_table_factor(p)?;
            joins.push(Join {
                relation: join_relation,
                join_operator: JoinOperator::CrossJoin,
                span: p.span_from(join_start),
            });
            continue;
        }
        if p.current_kind() == LexemeKind::Command && p.current().text.starts_with("natural") {
            let text = p.bump().text;
            let join_relation = parse_table_factor(p)?;
            let join_operator = if text.contains("left") {
                JoinOperator::LeftOuter(JoinConstraint::Natural)
            } else if text.contains("right") {
                JoinOperator::RightOuter(JoinConstraint::Natural)
            } else if text.contains("full") {
                JoinOperator::FullOuter(JoinConstraint::Natural)
            } else {
                JoinOperator::Inner(JoinConstraint::Natural)
            };
            joins.push(Join {
                relation: join_relation,
                join_operator,
                span: p.span_from(join_start),
            });
            continue;
        }
        let ctor: Option<fn(JoinConstraint) -> JoinOperator> = if p.eat_command("join") || p.eat_command("inner join") {
            Some(JoinOperator::Inner)
        } else if p.eat_command("left join") || p.eat_command("left outer join") {
            Some(JoinOperator::LeftOuter)
        } else if p.eat_command("right join") || p.eat_command("right outer join") {
            Some(JoinOperator::RightOuter)
        } else if p.eat_command("full join") || p.eat_command("full outer join") {
            Some(JoinOperator::FullOuter)
        } else {
            None
        };
        let Some(ctor) = ctor else { break };
        let join_relation = parse_table_factor(p)?;
        let constraint = parse_join_constraint(p)?;
        joins.push(Join {
            relation: join_relation,
            join_operator: ctor(constraint),
            span: p.span_from(join_start),
        });
    }
    Ok(TableWithJoins { relation, joins })
}

fn parse_join_constraint(p: &mut Parser) -> Result<JoinConstraint, SyntaxError> {
    if p.eat_command("on") {
        Ok(JoinConstraint::On(parse_expr(p)?))
    } else if p.eat_command("using") {
        p.expect_kind(LexemeKind::OpenParen)?;
        let mut cols = Vec::new();
        loop {
            cols.push(parse_ident_node(p)?);
            if !p.eat_kind(LexemeKind::Comma) {
                break;
            }
        }
        p.expect_kind(LexemeKind::CloseParen)?;
        Ok(JoinConstraint::Using(cols))
    } else {
        Ok(JoinConstraint::None)
    }
}

fn parse_table_factor(p: &mut Parser) -> Result<TableFactor, SyntaxError> {
    let start = p.start_offset();
    let lateral = p.eat_command("lateral");
    if p.at_kind(LexemeKind::OpenParen) {
        p.bump();
        if p.at_command("select") || p.at_command("with") || p.at_command("values") {
            let subquery = parse_query(p)?;
            p.expect_kind(LexemeKind::CloseParen)?;
            let alias = parse_optional_alias(p)?;
            return Ok(TableFactor::Derived {
                subquery: Box::new(subquery),
                alias,
                lateral,
                span: p.span_from(start),
            });
        }
        let inner = parse_table_with_joins(p)?;
        p.expect_kind(LexemeKind::CloseParen)?;
        return Ok(TableFactor::NestedJoin(Box::new(inner), p.span_from(start)));
    }
    let name = parse_qualified_name(p)?;
    if p.at_kind(LexemeKind::OpenParen) {
        let call = parse_table_function_call(p, name)?;
        let with_ordinality = p.eat_command("with ordinality");
        let alias = parse_optional_alias(p)?;
        return Ok(TableFactor::Function {
            call,
            alias,
            with_ordinality,
            lateral,
            span: p.span_from(start),
        });
    }
    let alias = parse_optional_alias(p)?;
    Ok(TableFactor::Table {
        name,
        alias,
        lateral,
        span: p.span_from(start),
    })
}

fn parse_table_function_call(p: &mut Parser, name: QualifiedName) -> Result<FunctionCall, SyntaxError> {
    expr::parse_function_call(p, name)
}

fn parse_optional_alias(p: &mut Parser) -> Result<Option<TableAlias>, SyntaxError> {
    let as_seen = p.eat_command("as");
    if as_seen || matches!(p.current_kind(), LexemeKind::Identifier) {
        let name = parse_ident_node(p)?;
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
        Ok(Some(TableAlias { name, columns }))
    } else {
        Ok(None)
    }
}

fn parse_group_by_clause(p: &mut Parser) -> Result<GroupByClause, SyntaxError> {
    if p.eat_command("cube") {
        Ok(GroupByClause::Cube(parse_grouping_element_list(p)?))
    } else if p.eat_command("rollup") {
        Ok(GroupByClause::Rollup(parse_grouping_element_list(p)?))
    } else if p.eat_command("grouping sets") {
        Ok(GroupByClause::GroupingSets(parse_grouping_element_list(p)?))
    } else {
        let mut exprs = Vec::new();
        loop {
            exprs.push(parse_expr(p)?);
            if !p.eat_kind(LexemeKind::Comma) {
                break;
            }
        }
        Ok(GroupByClause::Simple(exprs))
    }
}

fn parse_grouping_element_list(p: &mut Parser) -> Result<Vec<Vec<Expr>>, SyntaxError> {
    p.expect_kind(LexemeKind::OpenParen)?;
    let mut groups = Vec::new();
    loop {
        if p.eat_kind(LexemeKind::OpenParen) {
            let mut inner = Vec::new();
            if !p.at_kind(LexemeKind::CloseParen) {
                loop {
                    inner.push(parse_expr(p)?);
                    if !p.eat_kind(LexemeKind::Comma) {
                        break;
                    }
                }
            }
            p.expect_kind(LexemeKind::CloseParen)?;
            groups.push(inner);
        } else {
            groups.push(vec![parse_expr(p)?]);
        }
        if !p.eat_kind(LexemeKind::Comma) {
            break;
        }
    }
    p.expect_kind(LexemeKind::CloseParen)?;
    Ok(groups)
}

fn parse_named_windows(p: &mut Parser) -> Result<Vec<NamedWindow>, SyntaxError> {
    let mut out = Vec::new();
    loop {
        let name = parse_ident_node(p)?;
        p.expect_command("as")?;
        let spec = parse_window_spec(p)?;
        out.push(NamedWindow { name, spec });
        if !p.eat_kind(LexemeKind::Comma) {
            break;
        }
    }
    Ok(out)
}

pub(super) fn parse_window_spec(p: &mut Parser) -> Result<WindowSpec, SyntaxError> {
    p.expect_kind(LexemeKind::OpenParen)?;
    let base_window = if matches!(p.current_kind(), LexemeKind::Identifier) {
        Some(parse_ident_node(p)?)
    } else {
        None
    };
    let partition_by = if p.eat_command("partition by") {
        let mut exprs = Vec::new();
        loop {
            exprs.push(parse_expr(p)?);
            if !p.eat_kind(LexemeKind::Comma) {
                break;
            }
        }
        exprs
    } else {
        Vec::new()
    };
    let order_by = if p.eat_command("order by") {
        parse_order_by_items(p)?
    } else {
        Vec::new()
    };
    let frame = if p.at_command("range") || p.at_command("rows") || p.at_command("groups") {
        Some(parse_frame_clause(p)?)
    } else {
        None
    };
    p.expect_kind(LexemeKind::CloseParen)?;
    Ok(WindowSpec {
        base_window,
        partition_by,
        order_by,
        frame,
    })
}

fn parse_frame_clause(p: &mut Parser) -> Result<FrameClause, SyntaxError> {
    let units = if p.eat_command("range") {
        FrameUnits::Range
    } else if p.eat_command("rows") {
        FrameUnits::Rows
    } else {
        p.expect_command("groups")?;
        FrameUnits::Groups
    };
    let (start_bound, end_bound) = if p.eat_command("between") {
        let start_bound = parse_frame_bound(p)?;
        p.expect_command("and")?;
        let end_bound = parse_frame_bound(p)?;
        (start_bound, Some(end_bound))
    } else {
        (parse_frame_bound(p)?, None)
    };
    let exclusion = if p.eat_command("exclude current row") {
        Some(FrameExclusion::CurrentRow)
    } else if p.eat_command("exclude group") {
        Some(FrameExclusion::Group)
    } else if p.eat_command("exclude ties") {
        Some(FrameExclusion::Ties)
    } else if p.eat_command("exclude no others") {
        Some(FrameExclusion::NoOthers)
    } else {
        None
    };
    Ok(FrameClause {
        units,
        start_bound,
        end_bound,
        exclusion,
    })
}

fn parse_frame_bound(p: &mut Parser) -> Result<FrameBound, SyntaxError> {
    if p.eat_command("current row") {
        Ok(FrameBound::CurrentRow)
    } else if p.eat_command("unbounded preceding") {
        Ok(FrameBound::Preceding(None))
    } else if p.eat_command("unbounded following") {
        Ok(FrameBound::Following(None))
    } else {
        let value = expr::parse_bound_value(p)?;
        if p.eat_command("preceding") {
            Ok(FrameBound::Preceding(Some(value)))
        } else if p.eat_command("following") {
            Ok(FrameBound::Following(Some(value)))
        } else {
            Err(p.error("`PRECEDING` or `FOLLOWING`"))
        }
    }
}

pub(super) fn parse_order_by_items(p: &mut Parser) -> Result<Vec<OrderByItem>, SyntaxError> {
    let mut out = Vec::new();
    loop {
        let item_expr = parse_expr(p)?;
        let asc = if p.eat_command("asc") {
            Some(true)
        } else if p.eat_command("desc") {
            Some(false)
        } else {
            None
        };
        let nulls_first = if p.eat_command("nulls first") {
            Some(true)
        } else if p.eat_command("nulls last") {
            Some(false)
        } else {
            None
        };
        out.push(OrderByItem {
            expr: item_expr,
            asc,
            nulls_first,
        });
        if !p.eat_kind(LexemeKind::Comma) {
            break;
        }
    }
    Ok(out)
}

fn parse_limit_offset(p: &mut Parser) -> Result<(Option<Expr>, Option<Expr>), SyntaxError> {
    let mut limit = None;
    let mut offset = None;
    loop {
        if limit.is_none() && p.eat_command("limit") {
            limit = if p.eat_command("all") { None } else { Some(parse_expr(p)?) };
        } else if offset.is_none() && p.eat_command("offset") {
            offset = Some(parse_expr(p)?);
            p.eat_command("rows");
            p.eat_command("row");
        } else {
            break;
        }
    }
    Ok((limit, offset))
}

fn parse_fetch_clause(p: &mut Parser) -> Result<FetchClause, SyntaxError> {
    p.expect_command("fetch")?;
    let _ = p.eat_command("first") || p.eat_command("next");
    let quantity = if p.at_command("row") || p.at_command("rows") {
        None
    } else {
        Some(parse_expr(p)?)
    };
    p.eat_command("percent");
    let _ = p.eat_command("row") || p.eat_command("rows");
    let with_ties = p.eat_command("with ties");
    if !with_ties {
        p.eat_command("only");
    }
    Ok(FetchClause { quantity, with_ties })
}

fn parse_locking_clauses(p: &mut Parser) -> Result<Vec<LockingClause>, SyntaxError> {
    let mut out = Vec::new();
    loop {
        // `FOR NO KEY UPDATE`/`FOR KEY SHARE` are pre-merged by the lexer
        // into one phrase lexeme (they'd otherwise be ambiguous prefixes of
        // each other mid-scan), so they're matched whole; plain `FOR UPDATE`
        // and `FOR SHARE` are not merged and so are matched as two lexemes.
        let strength = if p.eat_command("for no key update") {
            LockStrength::NoKeyUpdate
        } else if p.eat_command("for key share") {
            LockStrength::KeyShare
        } else if p.eat_command("for") {
            if p.eat_command("update") {
                LockStrength::Update
            } else if p.eat_command("share") {
                LockStrength::Share
            } else {
                return Err(p.error("a locking strength"));
            }
        } else {
            break;
        };
        let of = if p.eat_command("of") {
            let mut names = vec![parse_qualified_name(p)?];
            while p.eat_kind(LexemeKind::Comma) {
                names.push(parse_qualified_name(p)?);
            }
            names
        } else {
            Vec::new()
        };
        let wait = if p.eat_command("nowait") {
            LockWait::NoWait
        } else if p.eat_command("skip locked") {
            LockWait::SkipLocked
        } else {
            LockWait::None
        };
        out.push(LockingClause { strength, of, wait });
    }
    Ok(out)
}

pub(super) fn parse_with_clause(p: &mut Parser) -> Result<WithClause, SyntaxError> {
    let start = p.start_offset();
    p.expect_command("with")?;
    let recursive = p.eat_command("recursive");
    let mut ctes = Vec::new();
    loop {
        ctes.push(parse_cte_definition(p)?);
        if !p.eat_kind(LexemeKind::Comma) {
            break;
        }
    }
    Ok(WithClause {
        recursive,
        ctes,
        span: p.span_from(start),
    })
}

fn parse_cte_definition(p: &mut Parser) -> Result<CteDefinition, SyntaxError> {
    let start = p.start_offset();
    let name = parse_ident_node(p)?;
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
    let materialized = if p.eat_command("materialized") {
        Some(true)
    } else if p.eat_command("not materialized") {
        Some(false)
    } else {
        None
    };
    p.expect_kind(LexemeKind::OpenParen)?;
    let query = parse_query(p)?;
    p.expect_kind(LexemeKind::CloseParen)?;
    Ok(CteDefinition {
        name,
        columns,
        materialized,
        query: Box::new(query),
        span: p.span_from(start),
    })
}
