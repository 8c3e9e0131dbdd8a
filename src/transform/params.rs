// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! Parameter collection (spec.md §4.8): gathers every bound parameter in a
//! statement, in first-occurrence order — the same order the formatter's
//! `render` pass assigns parameter numbers in, so a caller can cross-
//! reference the two without re-walking the tree.

use crate::ast::{Expr, Parameter, Statement};
use crate::visit::{walk_expr, Visitor};

struct ParamCollector {
    params: Vec<Parameter>,
}

impl Visitor for ParamCollector {
    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Parameter(param) = expr {
            self.params.push(param.clone());
        }
        walk_expr(self, expr);
    }
}

/// Every `Expr::Parameter` in `stmt`, in document order.
pub fn collect_parameters(stmt: &Statement) -> Vec<Parameter> {
    let mut collector = ParamCollector { params: Vec::new() };
    collector.visit_statement(stmt);
    collector.params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ParameterToken;
    use crate::dialect::Dialect;
    use crate::parser::parse_statement;

    #[test]
    fn collects_named_parameters_in_order() {
        let stmt = parse_statement("select * from users where id = :id and name = :name", Dialect::Postgres).unwrap();
        let params = collect_parameters(&stmt);
        let names: Vec<_> = params
            .iter()
            .map(|p| match &p.token {
                ParameterToken::Named(n) => n.clone(),
                _ => panic!("expected named parameter"),
            })
            .collect();
        assert_eq!(names, vec!["id", "name"]);
    }

    #[test]
    fn collects_parameters_from_nested_subqueries() {
        let stmt = parse_statement(
            "select * from t where id in (select id from u where id = :id)",
            Dialect::Postgres,
        )
        .unwrap();
        assert_eq!(collect_parameters(&stmt).len(), 1);
    }
}
