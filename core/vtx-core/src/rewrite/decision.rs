//! 인라인 치환 vs 파생 테이블 결정

use super::context::{ViewTranslator, into_query};
use super::translate::{empty_query, visit_child_queries};
use super::view_cache::ViewDefinition;
use crate::error::VtxResult;
use crate::sql::ast::visit::{contains_analytic, contains_unpushable, expr_contains, for_each_name};
use crate::sql::ast::*;
use crate::types::ClassId;

fn has_pseudo(expr: &Expr) -> bool {
    expr_contains(expr, |e| matches!(e, Expr::Pseudo(_)))
}

/// 메서드 호출 또는 바로 바깥을 참조하는 하위 질의
fn has_method_or_correlated(expr: &Expr) -> bool {
    expr_contains(expr, |e| match e {
        Expr::Method(_) => true,
        Expr::Subquery(q) | Expr::Exists(q) => q.correlation_level == 1,
        Expr::InSubquery { query, .. } => query.correlation_level == 1,
        _ => false,
    })
}

/// 항이 `spec_id` 스펙만 참조하는지 (상수 항 제외)
pub(crate) fn only_references(term: &Expr, spec_id: SpecId) -> bool {
    let mut mine = false;
    let mut other = false;
    for_each_name(term, |n| match n.spec_id {
        Some(id) if id == spec_id => mine = true,
        Some(_) => other = true,
        None => {}
    });
    mine && !other
}

/// 항이 정의에 하위 질의/메서드/의사 컬럼을 가진 뷰 컬럼을 참조하는지
fn references_unpushable(term: &Expr, spec_id: SpecId, def: &ViewDefinition, branch: &Query) -> bool {
    let mut found = false;
    for_each_name(term, |n| {
        if found || n.spec_id != Some(spec_id) {
            return;
        }
        let pos = if n.is_oid() {
            Some(0)
        } else {
            def.attribute_position(&n.name)
        };
        if let Some(expr) = pos.and_then(|p| ViewDefinition::column_of(branch, p)) {
            found = contains_unpushable(expr);
        }
    });
    found
}

/// 분기를 파생 테이블로 감싸야 하는지
///
/// 뷰 스펙 파생 질의 안에서는 항상 인라인한다.
pub(crate) fn needs_derived(query: &Query, idx: usize, branch: &Query, def: &ViewDefinition) -> bool {
    if query.vspec_as_derived {
        return false;
    }
    let (Some(select), Some(body)) = (query.as_select(), branch.as_select()) else {
        return false;
    };
    let Some(spec) = select.from.get(idx) else {
        return false;
    };

    if branch.distinct
        || body.has_aggregate()
        || branch.orderby_for.is_some()
        || branch.limit.is_some()
        || body.is_hierarchical()
    {
        return true;
    }
    if body
        .list
        .iter()
        .any(|c| contains_analytic(&c.expr) || has_pseudo(&c.expr))
        || body.where_clause.iter().any(has_pseudo)
    {
        return true;
    }

    // 외부 조인의 어느 쪽이든
    let next_outer = select.from.get(idx + 1).is_some_and(|n| n.join_type.is_outer());
    if spec.join_type.is_outer() || next_outer {
        return true;
    }
    if select.from.len() > 1 && spec.entities.len() > 1 {
        return true;
    }
    if select.has_aggregate()
        && select
            .list
            .iter()
            .map(|c| &c.expr)
            .chain(select.having.iter())
            .any(has_method_or_correlated)
    {
        return true;
    }

    select
        .where_clause
        .iter()
        .any(|term| only_references(term, spec.id) && references_unpushable(term, spec.id, def, branch))
}

impl ViewTranslator<'_> {
    /// 스펙이 여러 분기로 번역되는지 (클래스 계층 또는 다중/집합 연산 본문)
    pub(crate) fn is_union_translation(&mut self, spec: &EntitySpec) -> VtxResult<bool> {
        if spec.is_derived() {
            return Ok(false);
        }
        let virtuals: Vec<ClassId> = spec
            .entities
            .iter()
            .filter(|c| self.is_virtual(c))
            .cloned()
            .collect();
        let Some(first) = virtuals.first() else {
            return Ok(false);
        };
        if spec.entities.len() > 1 {
            return Ok(true);
        }
        let def = self.view_definition(first)?;
        Ok(def.for_select.len() > 1 || def.has_set_operation())
    }

    /// 전위 결정 패스: 다중 분기 스펙을 미리 파생 테이블로
    ///
    /// 조인/집계 질의, 또는 DISTINCT가 아닌 최상위 단일 스펙 질의가 대상이다.
    /// 이어서 파생 스펙마다 바깥 술어를 복사한다.
    pub(crate) fn check_rewrite_select(&mut self, query: &mut Query) -> VtxResult<()> {
        if query.vspec_as_derived {
            return Ok(());
        }
        if let Some(select) = query.as_select() {
            let aggregate = select.has_aggregate();
            let join_or_aggregate = select.from.len() > 1 || aggregate;
            let single_top = select.from.len() == 1
                && !aggregate
                && !query.is_subquery
                && !query.distinct
                && !query.is_view_spec;
            let count = select.from.len();

            if join_or_aggregate || single_top {
                let mut stmt = Statement::Query(std::mem::replace(query, empty_query()));
                let result = self.wrap_union_specs(&mut stmt, count);
                *query = into_query(stmt)?;
                result?;
            }
        }
        visit_child_queries(query, true, &mut |child| self.check_rewrite_select(child))
    }

    fn wrap_union_specs(&mut self, stmt: &mut Statement, count: usize) -> VtxResult<()> {
        for idx in 0..count {
            let wrap = match stmt.specs().get(idx) {
                Some(spec) => {
                    let spec = (*spec).clone();
                    self.is_union_translation(&spec)?
                }
                None => false,
            };
            if wrap {
                self.wrap_spec_as_derived(stmt, idx, None)?;
            } else if let Statement::Query(q) = stmt {
                if q.as_select().and_then(|s| s.from.get(idx)).is_some_and(EntitySpec::is_derived) {
                    self.copy_push_terms(q, idx);
                }
            }
        }
        Ok(())
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
                    .attr("dept", DataType::Integer),
            )
            .with_class(ClassBuilder::real("dept").attr("id", DataType::Integer))
    }

    fn bound(catalog: &InMemoryCatalog, ids: &mut IdGenerator, sql: &str) -> Query {
        let mut query = SqlParser::new().parse_query(sql).unwrap();
        Binder::new(catalog, ids).bind_query(&mut query).unwrap();
        query
    }

    fn definition(branch: &Query) -> ViewDefinition {
        ViewDefinition {
            class: ClassId::new("v"),
            owner: "dba".into(),
            attributes: vec![
                NameRef::new("").with_meta(NameMeta::Oid),
                NameRef::new("id"),
                NameRef::new("dept"),
            ],
            for_select: vec![branch.clone()],
            for_update: Vec::new(),
            for_partial_update: Vec::new(),
            inverted_for_update: Vec::new(),
            authorization: crate::catalog::Privilege::ALL,
            updatability: crate::rewrite::Updatability::NotUpdatable,
            check_option: crate::catalog::CheckOptionKind::None,
        }
    }

    // ── needs_derived ──

    #[test]
    fn test_plain_branch_inlines() {
        let cat = catalog();
        let mut ids = IdGenerator::new();
        let outer = bound(&cat, &mut ids, "SELECT e.id FROM emp e");
        let branch = bound(&cat, &mut ids, "SELECT emp, id, dept FROM emp");
        assert!(!needs_derived(&outer, 0, &branch, &definition(&branch)));
    }

    #[test]
    fn test_distinct_or_grouped_branch_needs_derived() {
        let cat = catalog();
        let mut ids = IdGenerator::new();
        let outer = bound(&cat, &mut ids, "SELECT e.id FROM emp e");
        let distinct = bound(&cat, &mut ids, "SELECT DISTINCT emp, id, dept FROM emp");
        assert!(needs_derived(&outer, 0, &distinct, &definition(&distinct)));

        let grouped = bound(&cat, &mut ids, "SELECT NULL, dept, COUNT(*) FROM emp GROUP BY dept");
        assert!(needs_derived(&outer, 0, &grouped, &definition(&grouped)));
    }

    #[test]
    fn test_outer_join_needs_derived() {
        let cat = catalog();
        let mut ids = IdGenerator::new();
        let outer = bound(&cat, &mut ids, "SELECT e.id FROM emp e LEFT OUTER JOIN dept d ON e.dept = d.id");
        let branch = bound(&cat, &mut ids, "SELECT emp, id, dept FROM emp");
        let def = definition(&branch);
        assert!(needs_derived(&outer, 0, &branch, &def));
        assert!(needs_derived(&outer, 1, &branch, &def));
    }

    #[test]
    fn test_vspec_derived_always_inlines() {
        let cat = catalog();
        let mut ids = IdGenerator::new();
        let mut outer = bound(&cat, &mut ids, "SELECT e.id FROM emp e");
        outer.vspec_as_derived = true;
        let grouped = bound(&cat, &mut ids, "SELECT NULL, dept, COUNT(*) FROM emp GROUP BY dept");
        assert!(!needs_derived(&outer, 0, &grouped, &definition(&grouped)));
    }

    #[test]
    fn test_unpushable_column_term_needs_derived() {
        let cat = catalog();
        let mut ids = IdGenerator::new();
        let outer = bound(&cat, &mut ids, "SELECT e.id FROM emp e WHERE e.dept = 3");
        let branch = bound(
            &cat,
            &mut ids,
            "SELECT emp, id, (SELECT MAX(d.id) FROM dept d) FROM emp",
        );
        assert!(needs_derived(&outer, 0, &branch, &definition(&branch)));
    }

    #[test]
    fn test_only_references() {
        let cat = catalog();
        let mut ids = IdGenerator::new();
        let q = bound(&cat, &mut ids, "SELECT e.id FROM emp e, dept d WHERE e.dept = 1 AND e.dept = d.id");
        let select = q.as_select().unwrap();
        let e = select.from[0].id;
        assert!(only_references(&select.where_clause[0], e));
        assert!(!only_references(&select.where_clause[1], e));
    }
}
