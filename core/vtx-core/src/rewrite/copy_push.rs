//! 술어 복사 (copy-push)
//!
//! 뷰를 감싼 파생 테이블만 참조하는 바깥 WHERE 항을 파생 질의 안으로
//! 복사한다. 원래 항은 그대로 남는다.

use super::context::ViewTranslator;
use super::decision::only_references;
use super::lambda::Substitution;
use crate::config::RewriteFeature;
use crate::sql::ast::visit::{contains_unpushable, expr_contains};
use crate::sql::ast::*;

/// NULL을 참으로 만들 수 있는 항 (`IS NULL` 포함)
fn is_null_tolerant(term: &Expr) -> bool {
    expr_contains(term, |e| {
        matches!(
            e,
            Expr::Unary {
                op: UnaryOp::IsNull,
                ..
            }
        )
    })
}

fn has_subquery(term: &Expr) -> bool {
    expr_contains(term, Expr::is_query)
}

impl ViewTranslator<'_> {
    /// `query`의 `idx` 파생 스펙으로 항 복사
    pub(crate) fn copy_push_terms(&mut self, query: &mut Query, idx: usize) {
        if !self.feature(RewriteFeature::CopyPushTerms) {
            return;
        }
        let Some(select) = query.as_select_mut() else {
            return;
        };
        if select.is_hierarchical() || select.has_outer_join() {
            return;
        }
        let Some(spec) = select.from.get(idx) else {
            return;
        };
        let Some(body) = spec.derived.as_deref() else {
            return;
        };
        if !body.vspec_as_derived || body.orderby_for.is_some() || body.has_analytic() {
            return;
        }
        let Some(inner) = body.as_select() else {
            return;
        };
        let grouped = !inner.group_by.is_empty();
        if inner.has_aggregate() && !grouped {
            return;
        }

        let spec_id = spec.id;
        let names = spec.as_attr_list.clone();
        let replacements: Vec<Expr> = inner
            .list
            .iter()
            .filter(|c| !c.hidden)
            .map(|c| c.expr.clone())
            .collect();
        if names.len() != replacements.len() {
            return;
        }

        let mut copies = Vec::new();
        for term in &select.where_clause {
            if is_null_tolerant(term) || has_subquery(term) || !only_references(term, spec_id) {
                continue;
            }
            let mut copy = term.clone();
            Substitution::new(spec_id, names.clone(), replacements.clone(), &mut self.ids).apply(&mut copy);
            if contains_unpushable(&copy) || only_references(&copy, spec_id) {
                continue;
            }
            copies.push(copy);
        }
        if copies.is_empty() {
            return;
        }

        let Some(inner) = select.from[idx]
            .derived
            .as_deref_mut()
            .and_then(Query::as_select_mut)
        else {
            return;
        };
        let target = if grouped {
            &mut inner.having
        } else {
            &mut inner.where_clause
        };
        let mut pushed = 0;
        for copy in copies {
            if !target.contains(&copy) {
                target.push(copy);
                pushed += 1;
            }
        }
        tracing::trace!(spec = %spec_id, pushed, grouped, "terms copied into derived table");
    }
}
