//! 집계 분리 패스
//!
//! GROUP BY/집계와 클래스 메서드 호출 또는 1단계 상관 하위 질의가 한
//! SELECT 리스트에 섞이면, FROM/WHERE/GROUP BY를 파생 테이블로 내리고
//! 바깥에는 문제 표현식만 남긴다. 바깥 표현식은 파생 테이블의 `a_N`
//! 컬럼을 참조한다.

use super::correlation::bump_nested_queries;
use super::{PassContext, RewritePass};
use crate::catalog::SchemaProvider;
use crate::error::VtxResult;
use crate::sql::ast::visit::{VisitorMut, Walk, expr_contains, is_aggregate_node, walk_expr_mut};
use crate::sql::ast::*;
use ahash::AHashSet;

/// 파생 테이블 범위 변수
pub(super) const DERIVED_RANGE_VAR: &str = "dt";

/// 스펙과 그 경로 스펙의 식별자
pub(super) fn spec_ids(specs: &[EntitySpec]) -> AHashSet<SpecId> {
    let mut ids = AHashSet::new();
    let mut stack: Vec<&EntitySpec> = specs.iter().collect();
    while let Some(spec) = stack.pop() {
        ids.insert(spec.id);
        stack.extend(spec.path_entities.iter());
    }
    ids
}

/// 바깥 표현식을 파생 컬럼 참조로 바꾸며 파생 리스트를 모은다
pub(super) struct Hoist {
    pub(super) derived_id: SpecId,
    pub(super) old_ids: AHashSet<SpecId>,
    /// 파생 테이블 리스트 (`a_{i+1}`)
    pub(super) columns: Vec<Expr>,
    /// 집계 노드를 통째로 내릴지
    pub(super) push_aggregates: bool,
    query_depth: u32,
}

impl Hoist {
    pub(super) fn new(derived_id: SpecId, old_ids: AHashSet<SpecId>, push_aggregates: bool) -> Self {
        Self {
            derived_id,
            old_ids,
            columns: Vec::new(),
            push_aggregates,
            query_depth: 0,
        }
    }

    /// 파생 컬럼 참조 (같은 표현식은 한 컬럼)
    pub(super) fn column_ref(&mut self, expr: &Expr) -> Expr {
        let pos = match self.columns.iter().position(|c| c == expr) {
            Some(p) => p,
            None => {
                self.columns.push(expr.clone());
                self.columns.len() - 1
            }
        };
        Expr::Name(NameRef::bound(format!("a_{}", pos + 1), self.derived_id, DERIVED_RANGE_VAR))
    }

    pub(super) fn rewrite(&mut self, expr: &mut Expr) {
        let _ = walk_expr_mut(self, expr);
    }

    /// 파생 테이블 노출 컬럼
    pub(super) fn as_attr_list(&self) -> Vec<NameRef> {
        (1..=self.columns.len())
            .map(|i| NameRef::bound(format!("a_{i}"), self.derived_id, DERIVED_RANGE_VAR))
            .collect()
    }

    pub(super) fn derived_list(&self) -> Vec<Column> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, e)| Column::aliased(e.clone(), format!("a_{}", i + 1)))
            .collect()
    }

    fn references_old(&self, expr: &Expr) -> bool {
        expr_contains(expr, |e| {
            matches!(e, Expr::Name(n) if n.spec_id.is_some_and(|id| self.old_ids.contains(&id)))
        })
    }
}

impl VisitorMut for Hoist {
    fn enter_expr(&mut self, expr: &mut Expr) -> Walk {
        let pushed = match &*expr {
            Expr::Name(n) => n.spec_id.is_some_and(|id| self.old_ids.contains(&id)),
            // 경로 탐색은 통째로
            Expr::Dot { .. } => self.references_old(expr),
            e if self.push_aggregates && self.query_depth == 0 => is_aggregate_node(e),
            _ => false,
        };
        if pushed {
            *expr = self.column_ref(expr);
            return Walk::Skip;
        }
        Walk::Continue
    }

    fn enter_query(&mut self, query: &mut Query) -> Walk {
        self.query_depth += 1;
        if query.correlation_level == 0 {
            return Walk::Skip;
        }
        Walk::Continue
    }

    fn leave_query(&mut self, _query: &mut Query) {
        self.query_depth = self.query_depth.saturating_sub(1);
    }
}

/// 빈 파생 리스트: 옛 FROM의 `*`
pub(super) fn star_of(specs: &[EntitySpec], schema: &dyn SchemaProvider) -> Vec<Expr> {
    let mut out = Vec::new();
    for spec in specs {
        if spec.is_derived() {
            out.extend(spec.as_attr_list.iter().cloned().map(Expr::Name));
            continue;
        }
        let Some(info) = spec.first_entity().and_then(|c| schema.class(c)) else {
            continue;
        };
        out.extend(info.attributes.iter().filter(|a| !a.shared).map(|a| {
            Expr::Name(
                NameRef::bound(a.name.to_lowercase(), spec.id, spec.range_var.clone())
                    .with_type(a.domain.clone()),
            )
        }));
    }
    out
}

/// 집계와 섞이면 안 되는 표현식
fn offends(expr: &Expr) -> bool {
    expr_contains(expr, |e| match e {
        Expr::Method(m) => m.class_method,
        Expr::Subquery(q) | Expr::Exists(q) => q.correlation_level == 1,
        Expr::InSubquery { query, .. } => query.correlation_level == 1,
        _ => false,
    })
}

/// 집계 분리 패스
pub struct AggregateHoistPass;

impl RewritePass for AggregateHoistPass {
    fn name(&self) -> &str {
        "aggregate_hoist"
    }

    fn apply(&self, mut query: Query, cx: &mut PassContext<'_>) -> VtxResult<Query> {
        let level = query.correlation_level;
        let Some(select) = query.as_select_mut() else {
            return Ok(query);
        };
        if !select.has_aggregate() || !select.list.iter().any(|c| offends(&c.expr)) {
            return Ok(query);
        }

        let derived_id = cx.ids.next_id();
        let old_ids = spec_ids(&select.from);
        let mut hoist = Hoist::new(derived_id, old_ids, true);
        for column in &mut select.list {
            hoist.rewrite(&mut column.expr);
        }
        let mut outer_where = std::mem::take(&mut select.having);
        for term in &mut outer_where {
            hoist.rewrite(term);
        }
        for ob in &mut query.order_by {
            if let SortKey::Expr(e) = &mut ob.key {
                hoist.rewrite(e);
            }
        }

        // query.order_by 빌림이 끝난 뒤 다시 꺼낸다
        let Some(select) = query.as_select_mut() else {
            return Ok(query);
        };
        let old_from = std::mem::take(&mut select.from);
        if hoist.columns.is_empty() {
            hoist.columns = star_of(&old_from, cx.schema);
        }
        let mut inner = Select {
            list: hoist.derived_list(),
            from: old_from,
            where_clause: std::mem::take(&mut select.where_clause),
            group_by: std::mem::take(&mut select.group_by),
            hints: std::mem::take(&mut select.hints),
            using_index: std::mem::take(&mut select.using_index),
            ..Default::default()
        };
        bump_nested_queries(&mut inner, 1, 2);

        let mut derived = Query::from_select(inner);
        derived.is_subquery = true;
        derived.correlation_level = level;
        let mut spec = EntitySpec::new_derived(derived_id, derived, DERIVED_RANGE_VAR);
        spec.as_attr_list = hoist.as_attr_list();

        select.from = vec![spec];
        select.where_clause = outer_where;
        tracing::debug!(
            spec = %derived_id,
            columns = hoist.columns.len(),
            "aggregate select hoisted into derived table"
        );
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ClassBuilder, InMemoryCatalog};
    use crate::sql::{Binder, SqlParser};
    use crate::types::DataType;

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new()
            .with_class(
                ClassBuilder::real("emp")
                    .attr("id", DataType::Integer)
                    .attr("sal", DataType::Integer)
                    .attr("dept", DataType::Integer)
                    .class_method("bonus_rate"),
            )
            .with_class(ClassBuilder::real("dept").attr("id", DataType::Integer))
    }

    fn apply(cat: &InMemoryCatalog, sql: &str) -> Query {
        let mut ids = IdGenerator::new();
        let mut query = SqlParser::new().parse_query(sql).unwrap();
        Binder::new(cat, &mut ids).bind_query(&mut query).unwrap();
        let mut cx = PassContext {
            schema: cat,
            ids: &mut ids,
        };
        AggregateHoistPass.apply(query, &mut cx).unwrap()
    }

    #[test]
    fn test_plain_aggregate_untouched() {
        let cat = catalog();
        let q = apply(&cat, "SELECT dept, SUM(sal) FROM emp GROUP BY dept");
        let select = q.as_select().unwrap();
        assert!(!select.from[0].is_derived());
        assert_eq!(select.group_by.len(), 1);
    }

    #[test]
    fn test_correlated_subquery_hoisted() {
        let cat = catalog();
        let q = apply(
            &cat,
            "SELECT e.dept, SUM(e.sal), (SELECT COUNT(*) FROM dept d WHERE d.id = e.dept) \
             FROM emp e GROUP BY e.dept HAVING SUM(e.sal) > 10",
        );
        let select = q.as_select().unwrap();
        assert_eq!(select.from.len(), 1);
        let spec = &select.from[0];
        assert!(spec.is_derived());
        assert_eq!(spec.range_var, DERIVED_RANGE_VAR);

        let inner = spec.derived.as_ref().unwrap().as_select().unwrap();
        assert_eq!(inner.group_by.len(), 1);
        // e.dept, SUM(e.sal) 두 컬럼 (중복 제거)
        assert_eq!(inner.list.len(), 2);
        assert_eq!(spec.as_attr_list.len(), 2);

        assert!(select.group_by.is_empty());
        assert!(select.having.is_empty());
        assert_eq!(select.where_clause.len(), 1);
        assert_eq!(select.where_clause[0].to_string(), "dt.a_2 > 10");
        assert_eq!(select.list[0].expr.to_string(), "dt.a_1");
    }

    #[test]
    fn test_uncorrelated_subquery_untouched() {
        let cat = catalog();
        let q = apply(
            &cat,
            "SELECT dept, SUM(sal), (SELECT COUNT(*) FROM dept) FROM emp GROUP BY dept",
        );
        assert!(!q.as_select().unwrap().from[0].is_derived());
    }
}
