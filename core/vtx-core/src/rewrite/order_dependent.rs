//! 순서 의존 표현식 분리 패스
//!
//! `@v := expr` 대입은 최종 정렬 순서대로 평가되어야 한다. 대입 컬럼이
//! ORDER BY 키가 아니면, 나머지 컬럼과 ORDER BY를 내부 파생 SELECT로
//! 내리고 대입 컬럼은 바깥 SELECT에서 `a_N` 컬럼을 참조하게 한다.

use super::aggregate::{DERIVED_RANGE_VAR, Hoist, spec_ids, star_of};
use super::correlation::bump_nested_queries;
use super::{PassContext, RewritePass};
use crate::error::VtxResult;
use crate::sql::ast::visit::expr_contains;
use crate::sql::ast::*;

fn is_order_dependent(expr: &Expr) -> bool {
    expr_contains(expr, |e| matches!(e, Expr::Assign { .. }))
}

/// 바깥 컬럼 이름: 별칭이 없으면 원래 출력 이름
fn column_name(expr: &Expr, alias: Option<String>) -> Option<String> {
    alias.or_else(|| Column::new(expr.clone()).output_name().map(str::to_string))
}

/// 대입 컬럼 중 ORDER BY 키가 아닌 것이 있는지
fn needs_split(query: &Query, select: &Select) -> bool {
    select.list.iter().enumerate().any(|(i, column)| {
        is_order_dependent(&column.expr)
            && !query.order_by.iter().any(|ob| match &ob.key {
                SortKey::Position(p) => *p == i + 1,
                SortKey::Expr(e) => *e == column.expr,
            })
    })
}

/// 순서 의존 표현식 분리 패스
pub struct OrderDependentPass;

impl RewritePass for OrderDependentPass {
    fn name(&self) -> &str {
        "order_dependent_hoist"
    }

    fn apply(&self, mut query: Query, cx: &mut PassContext<'_>) -> VtxResult<Query> {
        let split = match query.as_select() {
            Some(select) => needs_split(&query, select),
            None => false,
        };
        if !split {
            return Ok(query);
        }

        let level = query.correlation_level;
        let order_by = std::mem::take(&mut query.order_by);
        let orderby_for = query.orderby_for.take();
        let limit = query.limit.take();
        let Some(select) = query.as_select_mut() else {
            return Ok(query);
        };

        let derived_id = cx.ids.next_id();
        let mut hoist = Hoist::new(derived_id, spec_ids(&select.from), false);
        // 원래 위치 → 내부 위치 (순서 독립 컬럼만)
        let mut positions = vec![None; select.list.len()];
        let mut outer_list = Vec::with_capacity(select.list.len());
        for (i, column) in std::mem::take(&mut select.list).into_iter().enumerate() {
            let Column {
                mut expr,
                alias,
                hidden,
            } = column;
            if is_order_dependent(&expr) {
                hoist.rewrite(&mut expr);
                outer_list.push(Column { expr, alias, hidden });
                continue;
            }
            let name = column_name(&expr, alias);
            let reference = hoist.column_ref(&expr);
            positions[i] = hoist.columns.iter().position(|c| *c == expr);
            outer_list.push(Column {
                expr: reference,
                alias: name,
                hidden,
            });
        }

        let old_from = std::mem::take(&mut select.from);
        if hoist.columns.is_empty() {
            hoist.columns = star_of(&old_from, cx.schema);
        }
        let inner_select = Select {
            list: hoist.derived_list(),
            from: old_from,
            where_clause: std::mem::take(&mut select.where_clause),
            group_by: std::mem::take(&mut select.group_by),
            having: std::mem::take(&mut select.having),
            connect_by: std::mem::take(&mut select.connect_by),
            start_with: std::mem::take(&mut select.start_with),
            after_cb_filter: std::mem::take(&mut select.after_cb_filter),
            hints: std::mem::take(&mut select.hints),
            using_index: std::mem::take(&mut select.using_index),
            ..Default::default()
        };
        let mut inner = Query::from_select(inner_select);
        bump_nested_queries(&mut inner, 1, 2);
        inner.is_subquery = true;
        inner.correlation_level = level;
        inner.orderby_for = orderby_for;
        inner.limit = limit;
        inner.order_by = order_by
            .into_iter()
            .filter_map(|ob| match ob.key {
                SortKey::Position(p) => positions
                    .get(p.wrapping_sub(1))
                    .copied()
                    .flatten()
                    .map(|inner_pos| OrderBy {
                        key: SortKey::Position(inner_pos + 1),
                        asc: ob.asc,
                    }),
                SortKey::Expr(e) => Some(OrderBy {
                    key: SortKey::Expr(e),
                    asc: ob.asc,
                }),
            })
            .collect();

        let mut spec = EntitySpec::new_derived(derived_id, inner, DERIVED_RANGE_VAR);
        spec.as_attr_list = hoist.as_attr_list();
        select.list = outer_list;
        select.from = vec![spec];
        tracing::debug!(spec = %derived_id, "order-dependent expressions hoisted above sorted derived table");
        Ok(query)
    }
}
